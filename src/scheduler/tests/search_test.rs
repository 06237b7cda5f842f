use crate::model::options::SolveOptions;
use crate::model::result::{RuleTag, SolveError, SolverStatus};
use crate::model::shift::Schedule;
use crate::model::staff::{InputError, Role};
use crate::scheduler::tests::roster_mock::{
    apr_start, azubi, date, init_logger, no_vacations, span_calendar, test_options, tfa, week_roster,
};
use crate::scheduler::{solve, solve_on};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[test]
fn solves_one_week() {
    init_logger();
    let staff = week_roster();
    let cal = span_calendar(7);
    let result = solve_on(&staff, &cal, &no_vacations(), &test_options()).unwrap();

    assert!(result.feasible, "expected a feasible week");
    assert!(result.violations.is_empty());
    let schedule = result.schedule.expect("feasible results carry a schedule");

    // Every night covered, every weekend slot covered exactly once.
    let map = schedule.slot_map();
    assert_eq!(map.len(), 7);
    for (day, kinds) in &map {
        let nights: usize = kinds
            .iter()
            .filter(|(k, _)| k.is_night())
            .map(|(_, v)| v.len())
            .sum();
        assert!((1..=2).contains(&nights), "night of {} holds {}", day, nights);
    }
    let saturday = map.get(&date(2026, 4, 4)).unwrap();
    assert_eq!(saturday.iter().filter(|(k, _)| k.is_weekend_day()).count(), 3);
    let sunday = map.get(&date(2026, 4, 5)).unwrap();
    assert_eq!(sunday.iter().filter(|(k, _)| k.is_weekend_day()).count(), 3);
}

#[test]
fn nd_alone_staff_are_never_paired() {
    init_logger();
    let staff = week_roster();
    let cal = span_calendar(7);
    let result = solve_on(&staff, &cal, &no_vacations(), &test_options()).unwrap();
    let schedule = result.schedule.expect("feasible");

    let solo_ids = ["n1", "n2", "n3"];
    for (_, kinds) in schedule.slot_map() {
        for (kind, holders) in kinds {
            if kind.is_regular_night() && holders.iter().any(|h| solo_ids.contains(&h.as_ref())) {
                assert_eq!(holders.len(), 1, "nd_alone staff shared a {}", kind);
            }
        }
    }
}

#[test]
fn schedule_round_trips_through_serde() {
    let staff = week_roster();
    let cal = span_calendar(7);
    let result = solve_on(&staff, &cal, &no_vacations(), &test_options()).unwrap();
    let schedule = result.schedule.expect("feasible");

    let json = serde_json::to_string(&schedule).unwrap();
    let back: Schedule = serde_json::from_str(&json).unwrap();
    assert_eq!(schedule, back);
}

#[test]
fn same_seed_same_objective() {
    let staff = week_roster();
    let cal = span_calendar(7);
    let a = solve_on(&staff, &cal, &no_vacations(), &test_options()).unwrap();
    let b = solve_on(&staff, &cal, &no_vacations(), &test_options()).unwrap();
    assert_eq!(a.objective, b.objective);
    assert_eq!(a.schedule, b.schedule);
}

#[test]
fn cancellation_returns_the_incumbent() {
    let staff = week_roster();
    let cal = span_calendar(7);
    let flag = Arc::new(AtomicBool::new(false));
    flag.store(true, Ordering::Relaxed);
    let options = SolveOptions {
        cancel: Some(Arc::clone(&flag)),
        ..test_options()
    };
    let result = solve_on(&staff, &cal, &no_vacations(), &options).unwrap();
    assert!(result.cancelled);
}

#[test]
fn azubi_solo_roster_is_infeasible() {
    // One TFA refusing every start weekday plus two Azubis: infeasible with
    // the pairing rule named on the nights.
    init_logger();
    let staff = vec![
        tfa("t").nd_exceptions(&[1, 2, 3, 4, 5, 6, 7]).build(),
        azubi("a").build(),
        azubi("b").build(),
    ];
    let cal = span_calendar(7);
    let result = solve_on(&staff, &cal, &no_vacations(), &test_options()).unwrap();

    assert!(!result.feasible);
    assert_eq!(result.status, SolverStatus::Infeasible);
    assert!(result.schedule.is_none());
    assert!(!result.unsatisfiable.is_empty());
    assert!(
        result
            .violations
            .iter()
            .any(|v| v.rule == RuleTag::AzubiNeedsPairing)
    );
}

#[test]
fn input_validation_rejects_bad_rosters() {
    let vacations = no_vacations();
    let options = test_options();

    let dup = vec![tfa("x").build(), tfa("x").build()];
    assert!(matches!(
        solve(&dup, apr_start(), &vacations, &options),
        Err(SolveError::InvalidInput(InputError::DuplicateStaffId { .. }))
    ));

    let hours = vec![tfa("x").hours(0).build()];
    assert!(matches!(
        solve(&hours, apr_start(), &vacations, &options),
        Err(SolveError::InvalidInput(InputError::InvalidHours { .. }))
    ));

    let ordinal = vec![tfa("x").nd_exception(8).build()];
    assert!(matches!(
        solve(&ordinal, apr_start(), &vacations, &options),
        Err(SolveError::InvalidInput(InputError::InvalidWeekdayOrdinal { .. }))
    ));

    let birthday = vec![tfa("x").birthday(2, 30).build()];
    assert!(matches!(
        solve(&birthday, apr_start(), &vacations, &options),
        Err(SolveError::InvalidInput(InputError::InvalidBirthday { .. }))
    ));

    let mut unknown = no_vacations();
    unknown.insert("ghost".into(), BTreeSet::from([date(2026, 4, 2)]));
    assert!(matches!(
        solve(&[tfa("x").build()], apr_start(), &unknown, &options),
        Err(SolveError::InvalidInput(InputError::UnknownVacationStaff { .. }))
    ));

    assert!(matches!(
        solve(&[tfa("x").build()], date(2026, 2, 1), &vacations, &options),
        Err(SolveError::InvalidInput(InputError::InvalidQuarterStart { .. }))
    ));

    assert!(matches!(
        solve(&[], apr_start(), &vacations, &options),
        Err(SolveError::InvalidInput(InputError::EmptyRoster))
    ));
}

#[test]
fn vacations_are_respected() {
    init_logger();
    let staff = week_roster();
    let cal = span_calendar(7);
    let mut vacations: HashMap<Box<str>, BTreeSet<chrono::NaiveDate>> = HashMap::new();
    vacations.insert("n1".into(), BTreeSet::from([date(2026, 4, 1), date(2026, 4, 2)]));
    let result = solve_on(&staff, &cal, &vacations, &test_options()).unwrap();

    if let Some(schedule) = &result.schedule {
        assert!(
            schedule
                .staff_assignments("n1")
                .all(|a| a.date != date(2026, 4, 1) && a.date != date(2026, 4, 2))
        );
    }
}

#[test]
fn pairing_roster_pairs_every_regular_night() {
    // Two nd_alone=false TFAs must end up together on regular nights; the
    // Azubi can partner anywhere.
    init_logger();
    let staff = vec![
        tfa("p1").build(),
        tfa("p2").build(),
        tfa("p3").nd_alone(true).build(),
        tfa("w1").nd_possible(false).build(),
        tfa("w2").nd_possible(false).build(),
        tfa("w3").nd_possible(false).build(),
        tfa("w4").nd_possible(false).build(),
        azubi("a1").nd_possible(false).build(),
        azubi("a2").nd_possible(false).build(),
    ];
    let cal = span_calendar(7);
    let options = SolveOptions {
        max_iterations: Some(60_000),
        ..test_options()
    };
    let result = solve_on(&staff, &cal, &no_vacations(), &options).unwrap();

    if result.feasible {
        let schedule = result.schedule.unwrap();
        for (_, kinds) in schedule.slot_map() {
            for (kind, holders) in kinds {
                if kind.is_regular_night()
                    && holders.iter().any(|h| h.as_ref() == "p1" || h.as_ref() == "p2")
                {
                    assert_eq!(holders.len(), 2, "{} left a pairing TFA solo", kind);
                }
            }
        }
    }
}

#[test]
fn solver_roster_groups_report_loads() {
    let staff = week_roster();
    let cal = span_calendar(7);
    let result = solve_on(&staff, &cal, &no_vacations(), &test_options()).unwrap();
    let tfa_stats = result.penalty.groups.get(&Role::Tfa).expect("TFA group present");
    assert_eq!(tfa_stats.loads.len(), 7);
    let azubi_stats = result.penalty.groups.get(&Role::Azubi).expect("Azubi group present");
    assert_eq!(azubi_stats.loads.len(), 2);
}
