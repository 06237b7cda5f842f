use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Caller-facing knobs of a single `solve` call.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Wall-clock budget of the search.
    pub time_limit: Duration,
    /// Seed of the search; a fixed default keeps unseeded runs reproducible
    /// on the same platform.
    pub seed: Option<u64>,
    /// Enforce that every weekend-eligible TFA/Azubi works at least one
    /// weekend slot and every night-eligible staff at least one night.
    pub enforce_min_participation: bool,
    /// Whether staff exempt from the night-participation rule still count
    /// toward the fairness range of their role group.
    pub include_restricted_in_fairness: bool,
    /// Cooperative cancellation: when set to true the search stops at the
    /// next poll and the best incumbent so far is returned.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Hard cap on search iterations, mainly for deterministic tests.
    pub max_iterations: Option<u64>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            time_limit: Duration::from_secs(120),
            seed: None,
            enforce_min_participation: false,
            include_restricted_in_fairness: true,
            cancel: None,
            max_iterations: None,
        }
    }
}

impl SolveOptions {
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|c| c.load(std::sync::atomic::Ordering::Relaxed))
            .unwrap_or(false)
    }
}
