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

//! Top-level orchestration of one solve call:
//! input validation → calendar → eligibility → model → search → validation.

pub mod calendar;
pub mod eligibility;
pub mod fairness;
pub mod model_builder;
pub mod score;
pub mod search;
pub mod validator;


use crate::model::options::SolveOptions;
use crate::model::result::{PenaltyBreakdown, SolveError, SolveResult, SolverStatus};
use crate::model::shift::{Assignment, Schedule};
use crate::model::staff::{InputError, Staff};
use crate::scheduler::calendar::QuarterCalendar;
use crate::scheduler::eligibility::EligibilityOracle;
use crate::scheduler::model_builder::RosterModel;
use crate::scheduler::score::RosterState;
use chrono::NaiveDate;
use log::{error, info};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Produces the duty roster for the quarter starting at `quarter_start`.
///
/// Invalid caller input is rejected up front; every solver-level outcome,
/// infeasibility included, is reported inside the [`SolveResult`] envelope.
/// The only hard failure after input validation is an internal inconsistency
/// between the search and the independent validator.
pub fn solve(
    staff: &[Staff],
    quarter_start: NaiveDate,
    vacations: &HashMap<Box<str>, BTreeSet<NaiveDate>>,
    options: &SolveOptions,
) -> Result<SolveResult, SolveError> {
    validate_inputs(staff, vacations)?;
    let calendar = QuarterCalendar::new(quarter_start)?;
    solve_on(staff, &calendar, vacations, options)
}

/// Body of [`solve`], parameterized on the calendar so tests can run on
/// truncated horizons.
pub(crate) fn solve_on(
    staff: &[Staff],
    calendar: &QuarterCalendar,
    vacations: &HashMap<Box<str>, BTreeSet<NaiveDate>>,
    options: &SolveOptions,
) -> Result<SolveResult, SolveError> {
    let oracle = EligibilityOracle::new(staff, calendar, vacations);
    let model = match RosterModel::build(staff, calendar, &oracle, options) {
        Ok(model) => model,
        Err(report) => {
            return Ok(SolveResult::infeasible(report.unsatisfiable, report.violations));
        }
    };
    info!(
        "solving quarter starting {}: {} staff, {} days, {} decision variables",
        calendar.start(),
        staff.len(),
        calendar.day_count(),
        model.var_count
    );

    let outcome = search::run(&model, staff, options);
    let (state, best_score) = outcome.best.expect("the search always returns an incumbent");

    if !best_score.is_feasible() {
        // No feasible incumbent inside the budget: report where coverage is
        // tight instead of a roster.
        return Ok(SolveResult {
            feasible: false,
            schedule: None,
            violations: Vec::new(),
            penalty: PenaltyBreakdown::default(),
            status: SolverStatus::Unknown,
            unsatisfiable: model.thin_coverage(calendar),
            cancelled: outcome.cancelled,
            objective: Some(best_score.cost()),
        });
    }

    let schedule = to_schedule(&state, &model, staff, calendar);
    let report = validator::validate(&schedule, staff, calendar, &oracle, options);
    if !report.is_feasible() {
        error!(
            "internal inconsistency: the validator rejected a roster the search considered feasible\n{}",
            schedule.to_table()
        );
        for v in &report.violations {
            error!("  {}", v);
        }
        let first = report.violations[0].clone();
        return Err(SolveError::Internal {
            rule: first.rule,
            detail: first.detail,
        });
    }

    let status = if best_score.soft == 0 {
        SolverStatus::Optimal
    } else {
        SolverStatus::Feasible
    };
    Ok(SolveResult {
        feasible: true,
        schedule: Some(schedule),
        violations: report.violations,
        penalty: report.penalty,
        status,
        unsatisfiable: Vec::new(),
        cancelled: outcome.cancelled,
        objective: Some(best_score.cost()),
    })
}

/// Rejects malformed caller input before any model is built.
fn validate_inputs(
    staff: &[Staff],
    vacations: &HashMap<Box<str>, BTreeSet<NaiveDate>>,
) -> Result<(), InputError> {
    if staff.is_empty() {
        return Err(InputError::EmptyRoster);
    }
    let mut seen: HashSet<&str> = HashSet::new();
    for person in staff {
        if !seen.insert(person.id.as_ref()) {
            return Err(InputError::DuplicateStaffId { id: person.id.clone() });
        }
        if person.hours == 0 || person.hours > 40 {
            return Err(InputError::InvalidHours {
                id: person.id.clone(),
                hours: person.hours,
            });
        }
        if person.nd_min_consecutive == 0 {
            return Err(InputError::InvalidMinConsecutive { id: person.id.clone() });
        }
        for &ordinal in person.nd_exceptions.iter() {
            if !(1..=7).contains(&ordinal) {
                return Err(InputError::InvalidWeekdayOrdinal {
                    id: person.id.clone(),
                    ordinal,
                });
            }
        }
        if let Some((month, day)) = person.birthday {
            // Year 2000 is a leap year, so Feb 29 birthdays pass.
            if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
                return Err(InputError::InvalidBirthday {
                    id: person.id.clone(),
                    month,
                    day,
                });
            }
        }
    }
    for id in vacations.keys() {
        if !seen.contains(id.as_ref()) {
            return Err(InputError::UnknownVacationStaff { id: id.clone() });
        }
    }
    Ok(())
}

/// Turns the search state into the exported schedule, deriving the paired
/// flags from night occupancy.
fn to_schedule(state: &RosterState, model: &RosterModel, staff: &[Staff], calendar: &QuarterCalendar) -> Schedule {
    let mut rows = Vec::new();
    for d in 0..model.day_count as usize {
        let paired = state.night_occupancy(d) == 2;
        for s in state.night_members(d) {
            rows.push(Assignment {
                staff_id: staff[s].id.clone(),
                date: calendar.date(d as u32),
                kind: model.nights[d].kind,
                paired,
            });
        }
    }
    for (i, slot) in model.weekend_slots.iter().enumerate() {
        if let Some(s) = state.weekend[i] {
            rows.push(Assignment {
                staff_id: staff[s].id.clone(),
                date: calendar.date(slot.day),
                kind: slot.kind,
                paired: false,
            });
        }
    }
    Schedule::new(rows)
}
