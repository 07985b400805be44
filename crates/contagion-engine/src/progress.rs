//! Step callback that logs run progress.

use contagion_core::{StepCallback, StepSummary};
use tracing::{debug, info};

/// Logs every step at debug level and every `interval`-th step at info.
pub struct ProgressCallback {
    interval: u64,
}

impl ProgressCallback {
    /// Create a callback reporting at info level every `interval` steps.
    ///
    /// An interval of zero disables the info-level reports.
    pub const fn new(interval: u64) -> Self {
        Self { interval }
    }

    /// Whether the step that produced `summary` gets an info-level report.
    const fn is_milestone(&self, summary: &StepSummary) -> bool {
        matches!(summary.counts.step.checked_rem(self.interval), Some(0))
    }
}

impl StepCallback for ProgressCallback {
    fn on_step(&mut self, summary: &StepSummary) {
        debug!(
            step = summary.step,
            moved = summary.moved,
            newly_infected = summary.infected,
            recovered = summary.recovered,
            "Step complete"
        );
        if self.is_milestone(summary) {
            info!(
                step = summary.counts.step,
                healthy = summary.counts.healthy,
                infected = summary.counts.infected,
                recovered = summary.counts.recovered,
                "Progress"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use contagion_types::StateCounts;

    use super::*;

    fn summary(step: u64) -> StepSummary {
        StepSummary {
            step,
            moved: 0,
            recovered: 0,
            infected: 0,
            counts: StateCounts::new(step.saturating_add(1)),
        }
    }

    #[test]
    fn milestones_follow_completed_step_count() {
        let progress = ProgressCallback::new(50);
        assert!(!progress.is_milestone(&summary(0)));
        assert!(progress.is_milestone(&summary(49)));
        assert!(!progress.is_milestone(&summary(50)));
        assert!(progress.is_milestone(&summary(99)));
    }

    #[test]
    fn zero_interval_is_silent() {
        let progress = ProgressCallback::new(0);
        assert!(!progress.is_milestone(&summary(0)));
        assert!(!progress.is_milestone(&summary(99)));
    }
}
