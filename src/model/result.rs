use crate::model::shift::{Schedule, ShiftKind};
use crate::model::staff::{InputError, Role};
use crate::scheduler::fairness::GroupLoadStats;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of the search outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

/// Identifier of a hard or participation rule, used both by the validator and
/// in infeasibility diagnostics. Serialized snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTag {
    Coverage,
    Eligibility,
    DoubleBooking,
    AzubiNeedsPairing,
    AzubiPairForbidden,
    NightMustBePaired,
    NightMustBeSolo,
    MinConsecNights,
    BlockSpacing,
    RestAfterNight,
    SunMonCapacity,
    WeekendIsolation,
    DepartmentNightClash,
    DepartmentConsecutiveClash,
    PairedFlagMismatch,
    MinWeekendParticipation,
    MinNightParticipation,
}

impl RuleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTag::Coverage => "coverage",
            RuleTag::Eligibility => "eligibility",
            RuleTag::DoubleBooking => "double_booking",
            RuleTag::AzubiNeedsPairing => "azubi_needs_pairing",
            RuleTag::AzubiPairForbidden => "azubi_pair_forbidden",
            RuleTag::NightMustBePaired => "night_must_be_paired",
            RuleTag::NightMustBeSolo => "night_must_be_solo",
            RuleTag::MinConsecNights => "min_consec_nights",
            RuleTag::BlockSpacing => "block_spacing",
            RuleTag::RestAfterNight => "rest_after_night",
            RuleTag::SunMonCapacity => "sun_mon_capacity",
            RuleTag::WeekendIsolation => "weekend_isolation",
            RuleTag::DepartmentNightClash => "department_night_clash",
            RuleTag::DepartmentConsecutiveClash => "department_consecutive_clash",
            RuleTag::PairedFlagMismatch => "paired_flag_mismatch",
            RuleTag::MinWeekendParticipation => "min_weekend_participation",
            RuleTag::MinNightParticipation => "min_night_participation",
        }
    }
}

impl fmt::Display for RuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken hard rule with the staff and dates involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: RuleTag,
    pub staff: Vec<Box<str>>,
    pub dates: Vec<NaiveDate>,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule, self.detail)?;
        if !self.staff.is_empty() {
            write!(f, " [staff: {}]", self.staff.join(", "))?;
        }
        if !self.dates.is_empty() {
            let dates: Vec<String> = self.dates.iter().map(|d| d.to_string()).collect();
            write!(f, " [dates: {}]", dates.join(", "))?;
        }
        Ok(())
    }
}

/// Soft-penalty breakdown by category, plus the per-group fairness statistics
/// behind the fairness term.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PenaltyBreakdown {
    /// 100 per night past a staff member's maximum consecutive limit.
    pub max_consec_excess: i64,
    /// Rounded sum over role groups of squared deviation + 10 × std deviation.
    pub fairness: i64,
    pub groups: IndexMap<Role, GroupLoadStats>,
}

impl PenaltyBreakdown {
    pub fn total(&self) -> i64 {
        self.max_consec_excess + self.fairness
    }
}

/// Reasons the model builder or the solver can know a quarter is unsatisfiable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsatisfiableConstraint {
    /// A mandatory slot with too few eligible staff.
    UncoverableSlot {
        date: NaiveDate,
        kind: ShiftKind,
        eligible: usize,
    },
    /// A night whose only candidates are Azubis, who may never work unpaired.
    NightWithoutAnchor { date: NaiveDate },
    /// A Sun→Mon or Mon→Tue night without a single eligible non-Azubi.
    VetNightWithoutNonAzubi { date: NaiveDate },
    /// A participation requirement that no roster can meet for this person.
    ParticipationImpossible { staff_id: Box<str>, rule: RuleTag },
    Generic,
}

/// The envelope every successful `solve` call returns.
#[derive(Debug, Clone, Serialize)]
pub struct SolveResult {
    pub feasible: bool,
    pub schedule: Option<Schedule>,
    pub violations: Vec<Violation>,
    pub penalty: PenaltyBreakdown,
    pub status: SolverStatus,
    pub unsatisfiable: Vec<UnsatisfiableConstraint>,
    pub cancelled: bool,
    /// Internal objective value of the incumbent, for reproducibility checks.
    pub objective: Option<i64>,
}

impl SolveResult {
    pub(crate) fn infeasible(
        unsatisfiable: Vec<UnsatisfiableConstraint>,
        violations: Vec<Violation>,
    ) -> Self {
        SolveResult {
            feasible: false,
            schedule: None,
            violations,
            penalty: PenaltyBreakdown::default(),
            status: SolverStatus::Infeasible,
            unsatisfiable,
            cancelled: false,
            objective: None,
        }
    }
}

/// Failures of the engine itself. Invalid input is rejected before any model
/// is built; an internal inconsistency means the independent validator
/// disagreed with the search and is never a user error.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),
    #[error("internal inconsistency: validator rejected a solver roster ({rule}: {detail})")]
    Internal { rule: RuleTag, detail: String },
}
