//! Workload accounting: adjusted counts, FTE- and presence-normalized loads,
//! and the per-role-group statistics behind the fairness penalty.
//!
//! A paired night counts half for TFA and interns; an Azubi night always
//! counts full. Loads are scaled by contracted hours (40 / hours) and by
//! presence (quarter days / available days).

use crate::model::staff::Role;
use indexmap::IndexMap;
use serde::Serialize;

/// Integer scale used by the search objective so the fairness range stays in
/// pure integers.
pub const FAIRNESS_SCALE: i64 = 1000;

/// Raw per-staff slot tallies of one roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaffTally {
    pub weekend: u32,
    pub solo_nights: u32,
    pub paired_nights: u32,
}

impl StaffTally {
    pub fn nights(&self) -> u32 {
        self.solo_nights + self.paired_nights
    }
}

/// Fractional night mass of one person: 0.5 per paired night for TFA and
/// interns, 1.0 otherwise.
pub fn effective_nights(role: Role, tally: &StaffTally) -> f64 {
    match role {
        Role::Azubi => tally.nights() as f64,
        Role::Tfa | Role::Intern => tally.solo_nights as f64 + 0.5 * tally.paired_nights as f64,
    }
}

/// Weekend slots plus effective nights.
pub fn adjusted_count(role: Role, tally: &StaffTally) -> f64 {
    tally.weekend as f64 + effective_nights(role, tally)
}

/// Adjusted count normalized to a full-time, fully-present quarter.
pub fn normalized_load(adjusted: f64, hours: u8, quarter_days: u32, available_days: u32) -> f64 {
    if hours == 0 || available_days == 0 {
        return 0.0;
    }
    adjusted * (40.0 / hours as f64) * (quarter_days as f64 / available_days as f64)
}

/// Integer variant of [`normalized_load`] for the search objective. Halves are
/// kept exact by doubling the adjusted count before scaling.
pub fn scaled_load(role: Role, tally: &StaffTally, hours: u8, quarter_days: u32, available_days: u32) -> i64 {
    if hours == 0 || available_days == 0 {
        return 0;
    }
    let adjusted_x2 = match role {
        Role::Azubi => 2 * (tally.weekend + tally.nights()) as i64,
        Role::Tfa | Role::Intern => {
            2 * (tally.weekend + tally.solo_nights) as i64 + tally.paired_nights as i64
        }
    };
    adjusted_x2 * FAIRNESS_SCALE * 40 * quarter_days as i64 / (2 * hours as i64 * available_days as i64)
}

/// Load statistics of one role group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupLoadStats {
    pub loads: IndexMap<Box<str>, f64>,
    pub mean: f64,
    pub std_dev: f64,
    pub range: f64,
}

impl GroupLoadStats {
    pub fn from_loads(loads: IndexMap<Box<str>, f64>) -> Self {
        if loads.is_empty() {
            return GroupLoadStats::default();
        }
        let n = loads.len() as f64;
        let mean = loads.values().sum::<f64>() / n;
        let variance = loads.values().map(|l| (l - mean) * (l - mean)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        let min = loads.values().cloned().fold(f64::INFINITY, f64::min);
        let max = loads.values().cloned().fold(f64::NEG_INFINITY, f64::max);
        GroupLoadStats {
            loads,
            mean,
            std_dev,
            range: max - min,
        }
    }

    /// Squared deviation from the group mean summed over members, plus
    /// 10 × standard deviation.
    pub fn penalty(&self) -> f64 {
        let sq_dev: f64 = self.loads.values().map(|l| (l - self.mean) * (l - self.mean)).sum();
        sq_dev + 10.0 * self.std_dev
    }
}
