/*
 * Copyright (c) 2025 Clément GRENNERAT
 *
 * This program is free software: you can redistribute it and/or modify it under the terms of the
 * GNU General Public License as published by the Free Software Foundation, version 3.
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
 * even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 * See the GNU General Public License for more details.
 * You should have received a copy of the GNU General Public License along with this program.
 * If not, see https://www.gnu.org/licenses/.
 *
 */

//! Independent roster validation.
//!
//! The validator re-checks every hard rule directly on a [`Schedule`], without
//! touching the solver's model. It is exhaustive: all violations are reported,
//! nothing short-circuits. Any disagreement between this module and the search
//! is an engine defect, which is exactly why the redundancy exists.

use crate::model::options::SolveOptions;
use crate::model::result::{PenaltyBreakdown, RuleTag, Violation};
use crate::model::shift::{SATURDAY_KINDS, SUNDAY_KINDS, Schedule, ShiftKind};
use crate::model::staff::{Role, Staff};
use crate::scheduler::calendar::QuarterCalendar;
use crate::scheduler::eligibility::EligibilityOracle;
use crate::scheduler::fairness::{self, GroupLoadStats, StaffTally};
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub penalty: PenaltyBreakdown,
}

impl ValidationReport {
    /// A roster is feasible when no hard rule is broken.
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Per-day occupancy matrices shared by the rule checks.
struct Tables {
    day_count: u32,
    /// staff → day → kinds assigned that day.
    staff_day: Vec<Vec<Vec<ShiftKind>>>,
    /// day → staff on the night beginning that day.
    night_staff: Vec<Vec<usize>>,
    /// (day, kind) → staff, for coverage counting.
    slot_staff: HashMap<(u32, ShiftKind), Vec<usize>>,
}

pub fn validate(
    schedule: &Schedule,
    staff: &[Staff],
    calendar: &QuarterCalendar,
    oracle: &EligibilityOracle,
    options: &SolveOptions,
) -> ValidationReport {
    let mut violations = Vec::new();
    let index: HashMap<&str, usize> = staff.iter().enumerate().map(|(i, s)| (s.id.as_ref(), i)).collect();

    let day_count = calendar.day_count();
    let mut tables = Tables {
        day_count,
        staff_day: vec![vec![Vec::new(); day_count as usize]; staff.len()],
        night_staff: vec![Vec::new(); day_count as usize],
        slot_staff: HashMap::new(),
    };

    for a in schedule.assignments() {
        let Some(&s) = index.get(a.staff_id.as_ref()) else {
            violations.push(violation(
                RuleTag::Eligibility,
                vec![a.staff_id.clone()],
                vec![a.date],
                format!("unknown staff identifier on {}", a.kind),
            ));
            continue;
        };
        let Some(d) = calendar.day_index(a.date) else {
            violations.push(violation(
                RuleTag::Eligibility,
                vec![a.staff_id.clone()],
                vec![a.date],
                format!("{} assigned outside the quarter", a.kind),
            ));
            continue;
        };
        tables.staff_day[s][d as usize].push(a.kind);
        if a.kind.is_night() {
            tables.night_staff[d as usize].push(s);
        }
        tables.slot_staff.entry((d, a.kind)).or_default().push(s);
    }

    check_coverage(&tables, staff, calendar, &mut violations);
    check_eligibility(schedule, staff, calendar, oracle, &index, &mut violations);
    check_double_booking(&tables, staff, calendar, &mut violations);
    check_night_composition(&tables, staff, calendar, &mut violations);
    check_paired_flags(schedule, &tables, calendar, &index, &mut violations);
    check_min_consecutive(&tables, staff, calendar, &mut violations);
    check_block_spacing(&tables, staff, calendar, &mut violations);
    check_rest_after_night(&tables, staff, calendar, &mut violations);
    check_weekend_isolation(&tables, staff, calendar, &mut violations);
    check_departments(&tables, staff, calendar, &mut violations);
    if options.enforce_min_participation {
        check_participation(&tables, staff, calendar, oracle, &mut violations);
    }

    let mut penalty = PenaltyBreakdown::default();
    penalty.max_consec_excess = max_consecutive_excess(&tables, staff);
    score_fairness(&tables, staff, calendar, oracle, options, &mut penalty);

    ValidationReport { violations, penalty }
}

fn violation(rule: RuleTag, staff: Vec<Box<str>>, dates: Vec<chrono::NaiveDate>, detail: String) -> Violation {
    Violation { rule, staff, dates, detail }
}

fn ids(staff: &[Staff], idxs: &[usize]) -> Vec<Box<str>> {
    idxs.iter().map(|&i| staff[i].id.clone()).collect()
}

/// H11: every weekend daytime slot exactly once, every night one or two staff.
fn check_coverage(tables: &Tables, staff: &[Staff], calendar: &QuarterCalendar, out: &mut Vec<Violation>) {
    let empty = Vec::new();
    for (days, kinds) in [
        (calendar.saturdays(), SATURDAY_KINDS),
        (calendar.sundays(), SUNDAY_KINDS),
    ] {
        for &d in &days {
            for kind in kinds {
                let holders = tables.slot_staff.get(&(d, kind)).unwrap_or(&empty);
                if holders.len() != 1 {
                    out.push(violation(
                        RuleTag::Coverage,
                        ids(staff, holders),
                        vec![calendar.date(d)],
                        format!("{} holds {} staff, expected exactly 1", kind, holders.len()),
                    ));
                }
            }
        }
    }
    for d in 0..tables.day_count {
        let holders = &tables.night_staff[d as usize];
        if holders.is_empty() || holders.len() > 2 {
            out.push(violation(
                RuleTag::Coverage,
                ids(staff, holders),
                vec![calendar.date(d)],
                format!("night {} holds {} staff, expected 1 or 2", calendar.night_kind(d), holders.len()),
            ));
        }
    }
}

/// H1/H2/H10/H16: every assignment must pass the oracle.
fn check_eligibility(
    schedule: &Schedule,
    staff: &[Staff],
    calendar: &QuarterCalendar,
    oracle: &EligibilityOracle,
    index: &HashMap<&str, usize>,
    out: &mut Vec<Violation>,
) {
    for a in schedule.assignments() {
        let (Some(&s), Some(d)) = (index.get(a.staff_id.as_ref()), calendar.day_index(a.date)) else {
            continue; // already reported while building the tables
        };
        if !oracle.may_work(s, &staff[s], a.kind, d) {
            out.push(violation(
                RuleTag::Eligibility,
                vec![a.staff_id.clone()],
                vec![a.date],
                format!("not eligible for {}", a.kind),
            ));
        }
    }
}

/// H13: at most one slot per calendar date per staff.
fn check_double_booking(tables: &Tables, staff: &[Staff], calendar: &QuarterCalendar, out: &mut Vec<Violation>) {
    for (s, days) in tables.staff_day.iter().enumerate() {
        for (d, kinds) in days.iter().enumerate() {
            if kinds.len() > 1 {
                let labels: Vec<&str> = kinds.iter().map(|k| k.label()).collect();
                out.push(violation(
                    RuleTag::DoubleBooking,
                    vec![staff[s].id.clone()],
                    vec![calendar.date(d as u32)],
                    format!("{} slots on one date ({})", kinds.len(), labels.join(", ")),
                ));
            }
        }
    }
}

/// H3/H4 (Azubi pairing), H5/H6 (lone-worker policies), H14 (vet-night capacity).
fn check_night_composition(tables: &Tables, staff: &[Staff], calendar: &QuarterCalendar, out: &mut Vec<Violation>) {
    for d in 0..tables.day_count {
        let holders = &tables.night_staff[d as usize];
        if holders.is_empty() {
            continue;
        }
        let kind = calendar.night_kind(d);
        let date = calendar.date(d);
        let azubis: Vec<usize> = holders.iter().copied().filter(|&s| staff[s].role == Role::Azubi).collect();
        let others: Vec<usize> = holders.iter().copied().filter(|&s| staff[s].role != Role::Azubi).collect();

        if !azubis.is_empty() && others.is_empty() {
            out.push(violation(
                RuleTag::AzubiNeedsPairing,
                ids(staff, &azubis),
                vec![date],
                format!("Azubi on {} without a non-Azubi", kind),
            ));
        }
        if azubis.len() >= 2 {
            out.push(violation(
                RuleTag::AzubiPairForbidden,
                ids(staff, &azubis),
                vec![date],
                format!("{} Azubis share {}", azubis.len(), kind),
            ));
        }
        if kind.is_vet_night() && (others.len() != 1 || azubis.len() > 1) {
            out.push(violation(
                RuleTag::SunMonCapacity,
                ids(staff, holders),
                vec![date],
                format!("{} needs exactly one non-Azubi plus at most one Azubi", kind),
            ));
        }
        if kind.is_regular_night() {
            for &s in holders {
                if staff[s].nd_alone && holders.len() > 1 {
                    out.push(violation(
                        RuleTag::NightMustBeSolo,
                        vec![staff[s].id.clone()],
                        vec![date],
                        format!("works nights alone but {} is shared", kind),
                    ));
                }
                if !staff[s].nd_alone && holders.len() == 1 {
                    out.push(violation(
                        RuleTag::NightMustBePaired,
                        vec![staff[s].id.clone()],
                        vec![date],
                        format!("needs a partner but {} is solo", kind),
                    ));
                }
            }
        }
    }
}

/// Schedule invariant: `paired` is true exactly when the night holds two staff.
fn check_paired_flags(
    schedule: &Schedule,
    tables: &Tables,
    calendar: &QuarterCalendar,
    index: &HashMap<&str, usize>,
    out: &mut Vec<Violation>,
) {
    for a in schedule.assignments() {
        let (Some(_), Some(d)) = (index.get(a.staff_id.as_ref()), calendar.day_index(a.date)) else {
            continue;
        };
        let expected = a.kind.is_night() && tables.night_staff[d as usize].len() == 2;
        if a.paired != expected {
            out.push(violation(
                RuleTag::PairedFlagMismatch,
                vec![a.staff_id.clone()],
                vec![a.date],
                format!("paired flag is {} on {}, expected {}", a.paired, a.kind, expected),
            ));
        }
    }
}

/// Maximal runs of consecutive `true` days: (start, length).
fn runs(days: &[bool]) -> Vec<(u32, u32)> {
    let mut result = Vec::new();
    let mut start = None;
    for (d, &on) in days.iter().enumerate() {
        match (on, start) {
            (true, None) => start = Some(d as u32),
            (false, Some(s)) => {
                result.push((s, d as u32 - s));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        result.push((s, days.len() as u32 - s));
    }
    result
}

fn night_days(tables: &Tables, s: usize) -> Vec<bool> {
    tables.staff_day[s]
        .iter()
        .map(|kinds| kinds.iter().any(|k| k.is_night()))
        .collect()
}

fn any_days(tables: &Tables, s: usize) -> Vec<bool> {
    tables.staff_day[s].iter().map(|kinds| !kinds.is_empty()).collect()
}

/// H7: a night block must reach the person's minimum consecutive length,
/// quarter edge included. The rule never applies to Azubis.
fn check_min_consecutive(tables: &Tables, staff: &[Staff], calendar: &QuarterCalendar, out: &mut Vec<Violation>) {
    for (s, person) in staff.iter().enumerate() {
        if person.role == Role::Azubi {
            continue;
        }
        let min = person.nd_min_consecutive as u32;
        if min <= 1 {
            continue;
        }
        for (start, len) in runs(&night_days(tables, s)) {
            if len < min {
                out.push(violation(
                    RuleTag::MinConsecNights,
                    vec![person.id.clone()],
                    vec![calendar.date(start)],
                    format!("night block of {} nights, minimum is {} ({}<{})", len, min, len, min),
                ));
            }
        }
    }
}

/// H8: any two block starts of one person lie at least 14 days apart. Blocks
/// are maximal runs of consecutive assignments of any kind.
fn check_block_spacing(tables: &Tables, staff: &[Staff], calendar: &QuarterCalendar, out: &mut Vec<Violation>) {
    for (s, person) in staff.iter().enumerate() {
        let starts: Vec<u32> = runs(&any_days(tables, s)).iter().map(|&(start, _)| start).collect();
        for pair in starts.windows(2) {
            if pair[1] - pair[0] < 14 {
                out.push(violation(
                    RuleTag::BlockSpacing,
                    vec![person.id.clone()],
                    vec![calendar.date(pair[0]), calendar.date(pair[1])],
                    format!("blocks start {} days apart, minimum is 14", pair[1] - pair[0]),
                ));
            }
        }
    }
}

/// H9: after a night beginning on *d*, no daytime slot on *d* or *d*+1. The
/// following night is allowed; that is what blocks are made of.
fn check_rest_after_night(tables: &Tables, staff: &[Staff], calendar: &QuarterCalendar, out: &mut Vec<Violation>) {
    for (s, person) in staff.iter().enumerate() {
        for d in 0..tables.day_count {
            if !tables.staff_day[s][d as usize].iter().any(|k| k.is_night()) {
                continue;
            }
            for rest_day in [d, d + 1] {
                if rest_day >= tables.day_count {
                    continue;
                }
                if tables.staff_day[s][rest_day as usize].iter().any(|k| !k.is_night()) {
                    out.push(violation(
                        RuleTag::RestAfterNight,
                        vec![person.id.clone()],
                        vec![calendar.date(d), calendar.date(rest_day)],
                        format!("daytime slot within the rest window of the {} night", calendar.night_kind(d)),
                    ));
                }
            }
        }
    }
}

/// H15: weekend daytime slots are isolated; nothing on the day before or after.
fn check_weekend_isolation(tables: &Tables, staff: &[Staff], calendar: &QuarterCalendar, out: &mut Vec<Violation>) {
    for (s, person) in staff.iter().enumerate() {
        for d in 0..tables.day_count {
            if !tables.staff_day[s][d as usize].iter().any(|k| k.is_weekend_day()) {
                continue;
            }
            let mut adjacent = Vec::new();
            if d > 0 && !tables.staff_day[s][d as usize - 1].is_empty() {
                adjacent.push(d - 1);
            }
            if d + 1 < tables.day_count && !tables.staff_day[s][d as usize + 1].is_empty() {
                adjacent.push(d + 1);
            }
            for n in adjacent {
                out.push(violation(
                    RuleTag::WeekendIsolation,
                    vec![person.id.clone()],
                    vec![calendar.date(d), calendar.date(n)],
                    "weekend daytime slot adjacent to another assignment".to_string(),
                ));
            }
        }
    }
}

/// H17/H18: at most one station and one op person per night, and no two
/// distinct staff of the same department on consecutive nights.
fn check_departments(tables: &Tables, staff: &[Staff], calendar: &QuarterCalendar, out: &mut Vec<Violation>) {
    use crate::model::staff::Department;
    for dept in [Department::Station, Department::Op] {
        for d in 0..tables.day_count {
            let tonight: Vec<usize> = tables.night_staff[d as usize]
                .iter()
                .copied()
                .filter(|&s| staff[s].department == dept)
                .collect();
            if tonight.len() >= 2 {
                out.push(violation(
                    RuleTag::DepartmentNightClash,
                    ids(staff, &tonight),
                    vec![calendar.date(d)],
                    format!("{:?} department twice on one night", dept),
                ));
            }
            if d + 1 >= tables.day_count {
                continue;
            }
            let tomorrow: Vec<usize> = tables.night_staff[d as usize + 1]
                .iter()
                .copied()
                .filter(|&s| staff[s].department == dept)
                .collect();
            let clash: Vec<usize> = tonight
                .iter()
                .copied()
                .flat_map(|a| tomorrow.iter().copied().filter(move |&b| b != a).map(move |b| [a, b]))
                .flatten()
                .collect();
            if !clash.is_empty() {
                let mut involved = clash;
                involved.sort_unstable();
                involved.dedup();
                out.push(violation(
                    RuleTag::DepartmentConsecutiveClash,
                    ids(staff, &involved),
                    vec![calendar.date(d), calendar.date(d + 1)],
                    format!("{:?} department on consecutive nights", dept),
                ));
            }
        }
    }
}

/// H21/H22, applied on request.
fn check_participation(
    tables: &Tables,
    staff: &[Staff],
    calendar: &QuarterCalendar,
    oracle: &EligibilityOracle,
    out: &mut Vec<Violation>,
) {
    for (s, person) in staff.iter().enumerate() {
        if weekend_required(s, person, calendar, oracle)
            && !tables.staff_day[s].iter().flatten().any(|k| k.is_weekend_day())
        {
            out.push(violation(
                RuleTag::MinWeekendParticipation,
                vec![person.id.clone()],
                vec![],
                "no weekend slot in the quarter".to_string(),
            ));
        }
        if night_required(s, person, calendar, oracle)
            && !tables.staff_day[s].iter().flatten().any(|k| k.is_night())
        {
            out.push(violation(
                RuleTag::MinNightParticipation,
                vec![person.id.clone()],
                vec![],
                "no night in the quarter".to_string(),
            ));
        }
    }
}

pub(crate) fn weekend_required(s: usize, person: &Staff, calendar: &QuarterCalendar, oracle: &EligibilityOracle) -> bool {
    if !matches!(person.role, Role::Tfa | Role::Azubi) {
        return false;
    }
    let days_kinds = calendar
        .saturdays()
        .into_iter()
        .flat_map(|d| SATURDAY_KINDS.into_iter().map(move |k| (d, k)))
        .chain(
            calendar
                .sundays()
                .into_iter()
                .flat_map(|d| SUNDAY_KINDS.into_iter().map(move |k| (d, k))),
        );
    let mut any = false;
    for (d, k) in days_kinds {
        if oracle.may_work(s, person, k, d) {
            any = true;
            break;
        }
    }
    any
}

pub(crate) fn night_required(s: usize, person: &Staff, calendar: &QuarterCalendar, oracle: &EligibilityOracle) -> bool {
    if !person.nd_possible {
        return false;
    }
    // Staff who cannot start on enough distinct weekdays to form a legal
    // block are exempt.
    if (person.allowed_start_weekdays() as u32) < person.nd_min_consecutive as u32 {
        return false;
    }
    let eligible: u32 = (0..calendar.day_count())
        .filter(|&d| oracle.may_work(s, person, calendar.night_kind(d), d))
        .count() as u32;
    eligible >= person.nd_min_consecutive as u32 && eligible > 0
}

/// S4: 100 per night past a staff member's maximum consecutive limit.
fn max_consecutive_excess(tables: &Tables, staff: &[Staff]) -> i64 {
    let mut penalty = 0i64;
    for (s, person) in staff.iter().enumerate() {
        let Some(limit) = person.nd_max_consecutive else {
            continue;
        };
        for (_, len) in runs(&night_days(tables, s)) {
            penalty += 100 * len.saturating_sub(limit as u32) as i64;
        }
    }
    penalty
}

/// S1/S2: squared deviation from the role-group mean plus 10 × standard
/// deviation, on FTE- and presence-normalized loads.
fn score_fairness(
    tables: &Tables,
    staff: &[Staff],
    calendar: &QuarterCalendar,
    oracle: &EligibilityOracle,
    options: &SolveOptions,
    penalty: &mut PenaltyBreakdown,
) {
    let quarter_days = calendar.day_count();
    let mut groups: IndexMap<Role, IndexMap<Box<str>, f64>> = IndexMap::new();
    for role in [Role::Tfa, Role::Azubi, Role::Intern] {
        groups.insert(role, IndexMap::new());
    }

    for (s, person) in staff.iter().enumerate() {
        if !options.include_restricted_in_fairness
            && person.nd_possible
            && (person.allowed_start_weekdays() as u32) < person.nd_min_consecutive as u32
        {
            continue;
        }
        let mut tally = StaffTally::default();
        for d in 0..quarter_days {
            for kind in &tables.staff_day[s][d as usize] {
                if kind.is_weekend_day() {
                    tally.weekend += 1;
                } else if kind.is_night() {
                    if tables.night_staff[d as usize].len() == 2 {
                        tally.paired_nights += 1;
                    } else {
                        tally.solo_nights += 1;
                    }
                }
            }
        }
        let adjusted = fairness::adjusted_count(person.role, &tally);
        let load = fairness::normalized_load(adjusted, person.hours, quarter_days, oracle.available_days(s));
        groups.get_mut(&person.role).unwrap().insert(person.id.clone(), load);
    }

    let mut total = 0.0;
    for (role, loads) in groups {
        if loads.is_empty() {
            continue;
        }
        let stats = GroupLoadStats::from_loads(loads);
        total += stats.penalty();
        penalty.groups.insert(role, stats);
    }
    penalty.fairness = total.round() as i64;
}
