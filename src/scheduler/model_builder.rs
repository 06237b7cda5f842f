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

//! Decision-model construction.
//!
//! The builder turns the roster inputs into pruned candidate tables: one
//! candidate list per weekend slot, one per night (split by role class), and
//! per-staff eligible-day sets. Combinations the eligibility oracle rejects or
//! that fall on an absence day are never materialized. Structural
//! infeasibility (a slot no one can cover, a night only Azubis could work)
//! is detected here, before any search runs.

use crate::model::options::SolveOptions;
use crate::model::result::{RuleTag, UnsatisfiableConstraint, Violation};
use crate::model::shift::{SATURDAY_KINDS, SUNDAY_KINDS, ShiftKind};
use crate::model::staff::{Role, Staff};
use crate::scheduler::calendar::QuarterCalendar;
use crate::scheduler::eligibility::{DaySet, EligibilityOracle};
use crate::scheduler::validator;
use log::{debug, info};

/// One weekend daytime slot and the staff who may hold it.
#[derive(Debug, Clone)]
pub struct WeekendSlot {
    pub day: u32,
    pub kind: ShiftKind,
    pub candidates: Vec<usize>,
}

/// The candidates of one night, split by the classes the night rules care about.
#[derive(Debug, Clone)]
pub struct NightInfo {
    pub kind: ShiftKind,
    pub non_azubi: Vec<usize>,
    pub azubi: Vec<usize>,
}

impl NightInfo {
    pub fn candidate_count(&self) -> usize {
        self.non_azubi.len() + self.azubi.len()
    }
}

/// The pruned decision model of one `solve` call.
#[derive(Debug)]
pub struct RosterModel {
    pub day_count: u32,
    pub weekend_slots: Vec<WeekendSlot>,
    /// Indexed by day.
    pub nights: Vec<NightInfo>,
    /// Per staff: days on which a night assignment is possible at all.
    pub night_days: Vec<DaySet>,
    /// Per staff: presence days, for fairness scaling.
    pub available_days: Vec<u32>,
    pub weekend_required: Vec<bool>,
    pub night_required: Vec<bool>,
    /// Number of materialized decision variables, for diagnostics.
    pub var_count: usize,
}

/// Structural infeasibility found while building the model.
#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    pub unsatisfiable: Vec<UnsatisfiableConstraint>,
    pub violations: Vec<Violation>,
}

impl RosterModel {
    pub fn build(
        staff: &[Staff],
        calendar: &QuarterCalendar,
        oracle: &EligibilityOracle,
        options: &SolveOptions,
    ) -> Result<RosterModel, CoverageReport> {
        let day_count = calendar.day_count();
        let mut report = CoverageReport::default();
        let mut var_count = 0usize;

        let mut weekend_slots = Vec::new();
        for (days, kinds) in [
            (calendar.saturdays(), SATURDAY_KINDS),
            (calendar.sundays(), SUNDAY_KINDS),
        ] {
            for &day in &days {
                for kind in kinds {
                    let candidates: Vec<usize> = (0..staff.len())
                        .filter(|&s| oracle.may_work(s, &staff[s], kind, day))
                        .collect();
                    var_count += candidates.len();
                    if candidates.is_empty() {
                        report.unsatisfiable.push(UnsatisfiableConstraint::UncoverableSlot {
                            date: calendar.date(day),
                            kind,
                            eligible: 0,
                        });
                        report.violations.push(Violation {
                            rule: RuleTag::Coverage,
                            staff: vec![],
                            dates: vec![calendar.date(day)],
                            detail: format!("no eligible staff for {}", kind),
                        });
                    }
                    weekend_slots.push(WeekendSlot { day, kind, candidates });
                }
            }
        }

        let mut nights = Vec::with_capacity(day_count as usize);
        for day in 0..day_count {
            let kind = calendar.night_kind(day);
            let mut non_azubi = Vec::new();
            let mut azubi = Vec::new();
            for (s, person) in staff.iter().enumerate() {
                if oracle.may_work(s, person, kind, day) {
                    if person.role == Role::Azubi {
                        azubi.push(s);
                    } else {
                        non_azubi.push(s);
                    }
                }
            }
            var_count += non_azubi.len() + azubi.len();
            let date = calendar.date(day);
            if non_azubi.is_empty() && azubi.is_empty() {
                report.unsatisfiable.push(UnsatisfiableConstraint::UncoverableSlot {
                    date,
                    kind,
                    eligible: 0,
                });
                report.violations.push(Violation {
                    rule: RuleTag::Coverage,
                    staff: vec![],
                    dates: vec![date],
                    detail: format!("no eligible staff for {}", kind),
                });
            } else if non_azubi.is_empty() {
                // An Azubi can never anchor a night by themselves.
                if kind.is_vet_night() {
                    report
                        .unsatisfiable
                        .push(UnsatisfiableConstraint::VetNightWithoutNonAzubi { date });
                    report.violations.push(Violation {
                        rule: RuleTag::SunMonCapacity,
                        staff: vec![],
                        dates: vec![date],
                        detail: format!("no eligible non-Azubi for {}", kind),
                    });
                } else {
                    report.unsatisfiable.push(UnsatisfiableConstraint::NightWithoutAnchor { date });
                    report.violations.push(Violation {
                        rule: RuleTag::AzubiNeedsPairing,
                        staff: azubi.iter().map(|&s| staff[s].id.clone()).collect(),
                        dates: vec![date],
                        detail: format!("only Azubis are eligible for {}", kind),
                    });
                }
            }
            nights.push(NightInfo { kind, non_azubi, azubi });
        }

        let night_days: Vec<DaySet> = (0..staff.len())
            .map(|s| {
                (0..day_count)
                    .filter(|&d| oracle.may_work(s, &staff[s], calendar.night_kind(d), d))
                    .collect()
            })
            .collect();
        let available_days: Vec<u32> = (0..staff.len()).map(|s| oracle.available_days(s)).collect();

        let weekend_required: Vec<bool> = staff
            .iter()
            .enumerate()
            .map(|(s, p)| options.enforce_min_participation && validator::weekend_required(s, p, calendar, oracle))
            .collect();
        let night_required: Vec<bool> = staff
            .iter()
            .enumerate()
            .map(|(s, p)| options.enforce_min_participation && validator::night_required(s, p, calendar, oracle))
            .collect();

        if options.enforce_min_participation {
            for (s, person) in staff.iter().enumerate() {
                // Staff without enough allowed start weekdays are exempt from
                // the participation rule; everyone else who can work some
                // nights but too few to form a legal block makes the
                // requirement unsatisfiable.
                if !person.nd_possible
                    || (person.allowed_start_weekdays() as u32) < person.nd_min_consecutive as u32
                {
                    continue;
                }
                let eligible = night_days[s].iter().count() as u32;
                if eligible > 0 && eligible < person.nd_min_consecutive as u32 {
                    report.unsatisfiable.push(UnsatisfiableConstraint::ParticipationImpossible {
                        staff_id: person.id.clone(),
                        rule: RuleTag::MinNightParticipation,
                    });
                    report.violations.push(Violation {
                        rule: RuleTag::MinNightParticipation,
                        staff: vec![person.id.clone()],
                        dates: vec![],
                        detail: format!(
                            "{} eligible nights cannot fit a block of {}",
                            eligible, person.nd_min_consecutive
                        ),
                    });
                }
            }
        }

        if !report.unsatisfiable.is_empty() {
            info!(
                "model building aborted: {} unsatisfiable coverage constraints",
                report.unsatisfiable.len()
            );
            return Err(report);
        }

        debug!(
            "model built: {} weekend slots, {} nights, {} decision variables",
            weekend_slots.len(),
            nights.len(),
            var_count
        );
        Ok(RosterModel {
            day_count,
            weekend_slots,
            nights,
            night_days,
            available_days,
            weekend_required,
            night_required,
            var_count,
        })
    }

    /// Dates whose night has a thin candidate pool; attached to `Unknown`
    /// outcomes so the caller can see where coverage is tight.
    pub fn thin_coverage(&self, calendar: &QuarterCalendar) -> Vec<UnsatisfiableConstraint> {
        let mut out = Vec::new();
        for (d, night) in self.nights.iter().enumerate() {
            if night.non_azubi.len() <= 1 {
                out.push(UnsatisfiableConstraint::UncoverableSlot {
                    date: calendar.date(d as u32),
                    kind: night.kind,
                    eligible: night.candidate_count(),
                });
            }
        }
        out
    }
}
