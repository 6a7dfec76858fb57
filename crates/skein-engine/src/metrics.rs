//! Per-run counters collected by the driver.

use skein_core::TimePeriod;

/// Counters accumulated over one simulation run.
///
/// Populated by [`Simulator::simulate`](crate::Simulator::simulate) and
/// readable afterwards via
/// [`Simulator::last_metrics`](crate::Simulator::last_metrics).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Number of periods the driver opened for servicing.
    pub periods_run: u64,
    /// Instructions whose effects were applied.
    pub instructions_completed: u64,
    /// Blocked polls that deferred an instruction to a later period.
    pub instructions_deferred: u64,
    /// Polls skipped entirely because a recheck hint lay in the future.
    pub polls_skipped: u64,
    /// Processes whose sequences ran to exhaustion.
    pub processes_completed: u64,
    /// The period the clock showed when the run ended.
    pub final_period: TimePeriod,
}
