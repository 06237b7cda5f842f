use crate::model::options::SolveOptions;
use crate::model::result::RuleTag;
use crate::model::shift::{Schedule, ShiftKind};
use crate::model::staff::{Department, Role};
use crate::scheduler::eligibility::EligibilityOracle;
use crate::scheduler::tests::roster_mock::{assignment, azubi, check, date, intern, no_vacations, span_calendar, tfa};
use crate::scheduler::validator::{self, ValidationReport};
use chrono::Datelike;

fn has(report: &ValidationReport, tag: RuleTag) -> bool {
    report.violations.iter().any(|v| v.rule == tag)
}

#[test]
fn empty_schedule_reports_every_uncovered_slot() {
    let cal = span_calendar(7);
    let staff = vec![tfa("t").build()];
    let report = check(&Schedule::default(), &staff, &cal);
    let coverage = report.violations.iter().filter(|v| v.rule == RuleTag::Coverage).count();
    // 7 nights plus 3 Saturday and 3 Sunday daytime slots.
    assert_eq!(coverage, 13);
}

#[test]
fn weekend_isolation_next_to_a_night() {
    // Saturday daytime Apr 4 followed by the Sun→Mo night Apr 5: the
    // adjacency is a weekend-isolation violation, not a rest violation.
    let cal = span_calendar(7);
    let staff = vec![tfa("x").build()];
    let schedule = Schedule::new(vec![
        assignment("x", date(2026, 4, 4), ShiftKind::Sa10_21, false),
        assignment("x", date(2026, 4, 5), ShiftKind::NSoMo, false),
    ]);
    let report = check(&schedule, &staff, &cal);
    assert!(has(&report, RuleTag::WeekendIsolation));
    assert!(!has(&report, RuleTag::RestAfterNight));
}

#[test]
fn min_consecutive_nights_too_short() {
    let cal = span_calendar(14);
    let staff = vec![tfa("y").nd_min_consecutive(3).build()];
    // Apr 7 is a Tuesday.
    let schedule = Schedule::new(vec![
        assignment("y", date(2026, 4, 7), ShiftKind::NDiMi, false),
        assignment("y", date(2026, 4, 8), ShiftKind::NMiDo, false),
    ]);
    let report = check(&schedule, &staff, &cal);
    let v = report
        .violations
        .iter()
        .find(|v| v.rule == RuleTag::MinConsecNights)
        .expect("a two-night block violates a minimum of three");
    assert_eq!(v.staff, vec![Box::from("y")]);
    assert!(v.detail.contains("2<3"));
}

#[test]
fn min_consecutive_never_applies_to_azubis() {
    // H7 is scoped to non-Azubi staff, whatever the per-record override says.
    let cal = span_calendar(7);
    let staff = vec![
        azubi("a").nd_min_consecutive(3).build(),
        tfa("t").nd_min_consecutive(1).build(),
    ];
    let schedule = Schedule::new(vec![
        assignment("a", date(2026, 4, 1), ShiftKind::NMiDo, true),
        assignment("t", date(2026, 4, 1), ShiftKind::NMiDo, true),
    ]);
    assert!(!has(&check(&schedule, &staff, &cal), RuleTag::MinConsecNights));
}

#[test]
fn block_spacing_fourteen_days_is_accepted() {
    let cal = span_calendar(21);
    let staff = vec![tfa("z").nd_alone(true).build()];
    let schedule = Schedule::new(vec![
        assignment("z", date(2026, 4, 3), ShiftKind::NFrSa, false),
        assignment("z", date(2026, 4, 4), ShiftKind::NSaSo, false),
        assignment("z", date(2026, 4, 17), ShiftKind::NFrSa, false),
        assignment("z", date(2026, 4, 18), ShiftKind::NSaSo, false),
    ]);
    assert!(!has(&check(&schedule, &staff, &cal), RuleTag::BlockSpacing));
}

#[test]
fn block_spacing_thirteen_days_is_rejected() {
    let cal = span_calendar(21);
    let staff = vec![tfa("z").nd_alone(true).build()];
    let schedule = Schedule::new(vec![
        assignment("z", date(2026, 4, 3), ShiftKind::NFrSa, false),
        assignment("z", date(2026, 4, 4), ShiftKind::NSaSo, false),
        assignment("z", date(2026, 4, 16), ShiftKind::NDoFr, false),
        assignment("z", date(2026, 4, 17), ShiftKind::NFrSa, false),
    ]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::BlockSpacing));
}

#[test]
fn azubi_without_non_azubi_on_a_night() {
    let cal = span_calendar(7);
    let staff = vec![azubi("a").build(), azubi("b").build(), tfa("t").build()];
    let schedule = Schedule::new(vec![assignment("a", date(2026, 4, 1), ShiftKind::NMiDo, false)]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::AzubiNeedsPairing));

    let schedule = Schedule::new(vec![
        assignment("a", date(2026, 4, 1), ShiftKind::NMiDo, true),
        assignment("t", date(2026, 4, 1), ShiftKind::NMiDo, true),
    ]);
    assert!(!has(&check(&schedule, &staff, &cal), RuleTag::AzubiNeedsPairing));
}

#[test]
fn two_azubis_never_share_a_night() {
    let cal = span_calendar(7);
    let staff = vec![azubi("a").build(), azubi("b").build()];
    let schedule = Schedule::new(vec![
        assignment("a", date(2026, 4, 1), ShiftKind::NMiDo, true),
        assignment("b", date(2026, 4, 1), ShiftKind::NMiDo, true),
    ]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::AzubiPairForbidden));
}

#[test]
fn lone_worker_policies_on_regular_nights() {
    let cal = span_calendar(7);
    let staff = vec![tfa("solo").nd_alone(true).build(), tfa("pair").build()];

    // nd_alone staff sharing a regular night.
    let schedule = Schedule::new(vec![
        assignment("solo", date(2026, 4, 1), ShiftKind::NMiDo, true),
        assignment("pair", date(2026, 4, 1), ShiftKind::NMiDo, true),
    ]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::NightMustBeSolo));

    // nd_alone=false staff left solo on a regular night.
    let schedule = Schedule::new(vec![assignment("pair", date(2026, 4, 1), ShiftKind::NMiDo, false)]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::NightMustBePaired));

    // On a vet night the policies are not checked.
    let schedule = Schedule::new(vec![assignment("pair", date(2026, 4, 5), ShiftKind::NSoMo, false)]);
    let report = check(&schedule, &staff, &cal);
    assert!(!has(&report, RuleTag::NightMustBePaired));
    assert!(!has(&report, RuleTag::NightMustBeSolo));
}

#[test]
fn vet_night_capacity() {
    let cal = span_calendar(7);
    let staff = vec![tfa("t1").build(), tfa("t2").build(), azubi("a").build()];
    let schedule = Schedule::new(vec![
        assignment("t1", date(2026, 4, 5), ShiftKind::NSoMo, true),
        assignment("t2", date(2026, 4, 5), ShiftKind::NSoMo, true),
    ]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::SunMonCapacity));

    let schedule = Schedule::new(vec![
        assignment("t1", date(2026, 4, 5), ShiftKind::NSoMo, true),
        assignment("a", date(2026, 4, 5), ShiftKind::NSoMo, true),
    ]);
    assert!(!has(&check(&schedule, &staff, &cal), RuleTag::SunMonCapacity));
}

#[test]
fn double_booking_on_one_date() {
    let cal = span_calendar(7);
    let staff = vec![tfa("t").build()];
    let schedule = Schedule::new(vec![
        assignment("t", date(2026, 4, 4), ShiftKind::Sa10_21, false),
        assignment("t", date(2026, 4, 4), ShiftKind::NSaSo, false),
    ]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::DoubleBooking));
}

#[test]
fn rest_after_night_forbids_next_day_daytime() {
    let cal = span_calendar(7);
    let staff = vec![tfa("t").build()];
    let schedule = Schedule::new(vec![
        assignment("t", date(2026, 4, 3), ShiftKind::NFrSa, false),
        assignment("t", date(2026, 4, 4), ShiftKind::Sa10_21, false),
    ]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::RestAfterNight));
}

#[test]
fn consecutive_nights_are_not_a_rest_violation() {
    let cal = span_calendar(7);
    let staff = vec![tfa("t").nd_alone(true).build()];
    let schedule = Schedule::new(vec![
        assignment("t", date(2026, 4, 1), ShiftKind::NMiDo, false),
        assignment("t", date(2026, 4, 2), ShiftKind::NDoFr, false),
    ]);
    let report = check(&schedule, &staff, &cal);
    assert!(!has(&report, RuleTag::RestAfterNight));
    assert!(!has(&report, RuleTag::MinConsecNights));
}

#[test]
fn paired_flag_must_match_occupancy() {
    let cal = span_calendar(7);
    let staff = vec![tfa("t").build(), azubi("a").build()];
    let schedule = Schedule::new(vec![
        assignment("t", date(2026, 4, 1), ShiftKind::NMiDo, false),
        assignment("a", date(2026, 4, 1), ShiftKind::NMiDo, true),
    ]);
    let report = check(&schedule, &staff, &cal);
    let mismatches = report
        .violations
        .iter()
        .filter(|v| v.rule == RuleTag::PairedFlagMismatch)
        .count();
    assert_eq!(mismatches, 1);

    let schedule = Schedule::new(vec![assignment("t", date(2026, 4, 1), ShiftKind::NMiDo, true)]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::PairedFlagMismatch));
}

#[test]
fn department_rules() {
    let cal = span_calendar(7);
    let staff = vec![
        tfa("o1").department(Department::Op).build(),
        tfa("o2").department(Department::Op).build(),
        tfa("s1").department(Department::Station).build(),
    ];
    // Two op staff on one night.
    let schedule = Schedule::new(vec![
        assignment("o1", date(2026, 4, 1), ShiftKind::NMiDo, true),
        assignment("o2", date(2026, 4, 1), ShiftKind::NMiDo, true),
    ]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::DepartmentNightClash));

    // Distinct op staff on consecutive nights.
    let schedule = Schedule::new(vec![
        assignment("o1", date(2026, 4, 1), ShiftKind::NMiDo, false),
        assignment("o2", date(2026, 4, 2), ShiftKind::NDoFr, false),
    ]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::DepartmentConsecutiveClash));

    // One person's own block never clashes with itself.
    let schedule = Schedule::new(vec![
        assignment("o1", date(2026, 4, 1), ShiftKind::NMiDo, false),
        assignment("o1", date(2026, 4, 2), ShiftKind::NDoFr, false),
    ]);
    let report = check(&schedule, &staff, &cal);
    assert!(!has(&report, RuleTag::DepartmentConsecutiveClash));

    // Different departments never clash.
    let schedule = Schedule::new(vec![
        assignment("o1", date(2026, 4, 1), ShiftKind::NMiDo, false),
        assignment("s1", date(2026, 4, 2), ShiftKind::NDoFr, false),
    ]);
    assert!(!has(&check(&schedule, &staff, &cal), RuleTag::DepartmentConsecutiveClash));
}

#[test]
fn ineligible_assignment_is_reported() {
    let cal = span_calendar(7);
    let staff = vec![intern("i").build()];
    let schedule = Schedule::new(vec![assignment("i", date(2026, 4, 4), ShiftKind::Sa10_21, false)]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::Eligibility));
}

#[test]
fn unknown_staff_is_reported() {
    let cal = span_calendar(7);
    let staff = vec![tfa("t").build()];
    let schedule = Schedule::new(vec![assignment("ghost", date(2026, 4, 1), ShiftKind::NMiDo, false)]);
    assert!(has(&check(&schedule, &staff, &cal), RuleTag::Eligibility));
}

#[test]
fn max_consecutive_is_a_soft_penalty() {
    let cal = span_calendar(7);
    let staff = vec![tfa("t").nd_alone(true).nd_max_consecutive(2).build()];
    let schedule = Schedule::new(vec![
        assignment("t", date(2026, 4, 1), ShiftKind::NMiDo, false),
        assignment("t", date(2026, 4, 2), ShiftKind::NDoFr, false),
        assignment("t", date(2026, 4, 3), ShiftKind::NFrSa, false),
        assignment("t", date(2026, 4, 4), ShiftKind::NSaSo, false),
    ]);
    let report = check(&schedule, &staff, &cal);
    assert_eq!(report.penalty.max_consec_excess, 200);
}

#[test]
fn participation_rules_when_enforced() {
    let cal = span_calendar(7);
    let staff = vec![
        tfa("t").build(),
        // Six forbidden start weekdays leave one, below the minimum of two.
        tfa("restricted").nd_exceptions(&[1, 2, 3, 4, 5, 6]).build(),
    ];
    let oracle = EligibilityOracle::new(&staff, &cal, &no_vacations());
    let options = SolveOptions {
        enforce_min_participation: true,
        ..SolveOptions::default()
    };
    let report = validator::validate(&Schedule::default(), &staff, &cal, &oracle, &options);

    let weekend: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule == RuleTag::MinWeekendParticipation)
        .collect();
    assert_eq!(weekend.len(), 2);
    let night: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule == RuleTag::MinNightParticipation)
        .collect();
    assert_eq!(night.len(), 1);
    assert_eq!(night[0].staff, vec![Box::from("t")]);
}

#[test]
fn fairness_on_a_uniform_roster() {
    // Five identical TFAs over one fully paired week: every effective-night
    // share stays within half a night of the mean.
    let cal = span_calendar(7);
    let staff = vec![
        tfa("a").build(),
        tfa("b").build(),
        tfa("c").build(),
        tfa("d").build(),
        tfa("e").build(),
    ];
    let pairs = [
        ("a", "b"),
        ("a", "b"),
        ("c", "d"),
        ("c", "d"),
        ("e", "a"),
        ("e", "b"),
        ("c", "e"),
    ];
    let mut rows = Vec::new();
    for (i, (p, q)) in pairs.iter().enumerate() {
        let day = date(2026, 4, 1 + i as u32);
        let kind = ShiftKind::night_for(day.weekday());
        rows.push(assignment(p, day, kind, true));
        rows.push(assignment(q, day, kind, true));
    }
    let report = check(&Schedule::new(rows), &staff, &cal);
    let stats = report.penalty.groups.get(&Role::Tfa).expect("TFA group present");
    assert!((stats.range - 0.5).abs() < 1e-9, "range was {}", stats.range);
    for load in stats.loads.values() {
        assert!((load - stats.mean).abs() <= 0.5 + 1e-9);
    }
}
