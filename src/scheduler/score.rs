//! Evaluation of a candidate roster state against the encoded rules.
//!
//! Every hard rule of the model is counted here; the fairness objective is the
//! integer-scaled sum of per-role-group load ranges, with the night/weekend
//! balance variance as a lower-order tie-break. The search only ever sees
//! costs produced by this module; the validator re-derives everything
//! independently from the emitted schedule.

use crate::model::staff::{Department, Role, Staff};
use crate::scheduler::fairness::{self, StaffTally};
use crate::scheduler::model_builder::RosterModel;

/// One hard violation outweighs any achievable soft cost.
pub const HARD_WEIGHT: i64 = 1_000_000;

/// Mutable assignment state the search works on: up to two staff per night,
/// one staff per weekend slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterState {
    pub nights: Vec<[Option<usize>; 2]>,
    pub weekend: Vec<Option<usize>>,
}

impl RosterState {
    pub fn empty(model: &RosterModel) -> Self {
        RosterState {
            nights: vec![[None, None]; model.day_count as usize],
            weekend: vec![None; model.weekend_slots.len()],
        }
    }

    pub fn night_occupancy(&self, day: usize) -> usize {
        self.nights[day].iter().filter(|c| c.is_some()).count()
    }

    pub fn night_members(&self, day: usize) -> impl Iterator<Item = usize> + '_ {
        self.nights[day].iter().filter_map(|c| *c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub hard: u32,
    pub soft: i64,
}

impl Score {
    pub fn cost(&self) -> i64 {
        self.hard as i64 * HARD_WEIGHT + self.soft
    }
    pub fn is_feasible(&self) -> bool {
        self.hard == 0
    }
}

/// Full evaluation of `state`. Eligibility and absences are enforced by
/// construction (moves only pick from the pruned candidate lists), so they are
/// not re-counted here.
pub fn evaluate(model: &RosterModel, staff: &[Staff], state: &RosterState) -> Score {
    let day_count = model.day_count as usize;
    let mut hard = 0u32;
    let mut soft = 0i64;

    // Per staff/day occupancy, plus raw counts for double-booking.
    let mut night_flag = vec![false; staff.len() * day_count];
    let mut day_flag = vec![false; staff.len() * day_count];
    let mut per_day_assignments = vec![0u8; staff.len() * day_count];
    let at = |s: usize, d: usize| s * day_count + d;

    // Weekend coverage and occupancy.
    for (i, slot) in model.weekend_slots.iter().enumerate() {
        match state.weekend[i] {
            None => hard += 1,
            Some(s) => {
                day_flag[at(s, slot.day as usize)] = true;
                per_day_assignments[at(s, slot.day as usize)] += 1;
            }
        }
    }

    // Night coverage and composition.
    for d in 0..day_count {
        let kind = model.nights[d].kind;
        let occupancy = state.night_occupancy(d);
        if occupancy == 0 {
            hard += 1;
            continue;
        }
        if let [Some(a), Some(b)] = state.nights[d] {
            if a == b {
                hard += 1;
            }
        }
        let mut azubi = 0u32;
        let mut non_azubi = 0u32;
        for s in state.night_members(d) {
            night_flag[at(s, d)] = true;
            per_day_assignments[at(s, d)] += 1;
            match staff[s].role {
                Role::Azubi => azubi += 1,
                _ => non_azubi += 1,
            }
        }
        if azubi > 0 && non_azubi == 0 {
            hard += 1;
        }
        if azubi >= 2 {
            hard += 1;
        }
        if kind.is_vet_night() && (non_azubi != 1 || azubi > 1) {
            hard += 1;
        }
        if kind.is_regular_night() {
            for s in state.night_members(d) {
                if staff[s].nd_alone && occupancy > 1 {
                    hard += 1;
                }
                if !staff[s].nd_alone && occupancy == 1 {
                    hard += 1;
                }
            }
        }
        // Departments: at most one station and one op person per night.
        for dept in [Department::Station, Department::Op] {
            let n = state.night_members(d).filter(|&s| staff[s].department == dept).count();
            if n >= 2 {
                hard += 1;
            }
        }
    }

    // Department adjacency: distinct staff of one restricted department on
    // consecutive nights.
    for d in 0..day_count.saturating_sub(1) {
        for dept in [Department::Station, Department::Op] {
            let clash = state
                .night_members(d)
                .filter(|&s| staff[s].department == dept)
                .any(|a| {
                    state
                        .night_members(d + 1)
                        .filter(|&s| staff[s].department == dept)
                        .any(|b| b != a)
                });
            if clash {
                hard += 1;
            }
        }
    }

    // Per staff: double booking, rest windows, weekend isolation, block rules.
    for s in 0..staff.len() {
        for d in 0..day_count {
            let extra = per_day_assignments[at(s, d)].saturating_sub(1);
            hard += extra as u32;

            if night_flag[at(s, d)] {
                if day_flag[at(s, d)] {
                    hard += 1;
                }
                if d + 1 < day_count && day_flag[at(s, d + 1)] {
                    hard += 1;
                }
            }
            if day_flag[at(s, d)] {
                if d > 0 && (day_flag[at(s, d - 1)] || night_flag[at(s, d - 1)]) {
                    hard += 1;
                }
                if d + 1 < day_count && (day_flag[at(s, d + 1)] || night_flag[at(s, d + 1)]) {
                    hard += 1;
                }
            }
        }

        let nights: Vec<bool> = (0..day_count).map(|d| night_flag[at(s, d)]).collect();
        let any: Vec<bool> = (0..day_count)
            .map(|d| night_flag[at(s, d)] || day_flag[at(s, d)])
            .collect();

        // The minimum-consecutive rule is scoped to non-Azubi staff.
        let min = staff[s].nd_min_consecutive as u32;
        for (_, len) in runs(&nights) {
            if staff[s].role != Role::Azubi && len < min {
                hard += 1;
            }
            if let Some(limit) = staff[s].nd_max_consecutive {
                soft += 100 * len.saturating_sub(limit as u32) as i64;
            }
        }
        let starts: Vec<u32> = runs(&any).iter().map(|&(start, _)| start).collect();
        for pair in starts.windows(2) {
            if pair[1] - pair[0] < 14 {
                hard += 1;
            }
        }
    }

    // Participation, when enforced.
    for s in 0..staff.len() {
        if model.weekend_required[s] && !(0..day_count).any(|d| day_flag[at(s, d)]) {
            hard += 1;
        }
        if model.night_required[s] && !(0..day_count).any(|d| night_flag[at(s, d)]) {
            hard += 1;
        }
    }

    soft += fairness_objective(model, staff, state, &day_flag);

    Score { hard, soft }
}

/// Integer fairness objective: sum over role groups of the scaled load range,
/// plus the night/weekend balance variance as a tie-break.
fn fairness_objective(model: &RosterModel, staff: &[Staff], state: &RosterState, day_flag: &[bool]) -> i64 {
    let day_count = model.day_count as usize;
    let at = |s: usize, d: usize| s * day_count + d;

    let mut tallies = vec![StaffTally::default(); staff.len()];
    for d in 0..day_count {
        let occupancy = state.night_occupancy(d);
        for s in state.night_members(d) {
            if occupancy == 2 {
                tallies[s].paired_nights += 1;
            } else {
                tallies[s].solo_nights += 1;
            }
        }
    }
    for s in 0..staff.len() {
        tallies[s].weekend = (0..day_count).filter(|&d| day_flag[at(s, d)]).count() as u32;
    }

    let mut objective = 0i64;
    for role in [Role::Tfa, Role::Azubi, Role::Intern] {
        let members: Vec<usize> = (0..staff.len()).filter(|&s| staff[s].role == role).collect();
        if members.len() < 2 {
            continue;
        }
        let loads: Vec<i64> = members
            .iter()
            .map(|&s| {
                fairness::scaled_load(
                    role,
                    &tallies[s],
                    staff[s].hours,
                    model.day_count,
                    model.available_days[s],
                )
            })
            .collect();
        let min = *loads.iter().min().unwrap();
        let max = *loads.iter().max().unwrap();
        objective += max - min;

        // Tie-break: keep the night/weekend split itself balanced.
        let n = members.len() as i64;
        for counts in [
            members.iter().map(|&s| tallies[s].nights() as i64).collect::<Vec<i64>>(),
            members.iter().map(|&s| tallies[s].weekend as i64).collect::<Vec<i64>>(),
        ] {
            let sum: i64 = counts.iter().sum();
            let sq: i64 = counts.iter().map(|c| (n * c - sum) * (n * c - sum)).sum();
            objective += sq / (n * n);
        }
    }
    objective
}

/// Maximal runs of consecutive `true` days: (start, length).
pub fn runs(days: &[bool]) -> Vec<(u32, u32)> {
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
