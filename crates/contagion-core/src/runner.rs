//! Bounded simulation runs.
//!
//! [`run_model`] builds one engine from a [`ModelConfig`], steps it a fixed
//! number of times against a sink, and reports the outcome. A
//! [`RunRequest`] is the queued form of the same call: the parameters plus
//! a job id and submission time, serialized as JSON on the run queue.

use chrono::{DateTime, Utc};
use contagion_types::{JobId, StateCounts};
use contagion_world::SpatialIndex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ModelConfig;
use crate::engine::{EngineError, SimulationEngine, StepSummary};
use crate::sink::SnapshotSink;

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Engine construction or a step failed.
    #[error("engine error at step {step}: {source}")]
    Engine {
        /// Step the engine was at when it failed.
        step: u64,
        /// The underlying engine error.
        source: EngineError,
    },
}

/// Callback invoked after each step completes.
pub trait StepCallback {
    /// Called after a step completes successfully.
    fn on_step(&mut self, summary: &StepSummary);
}

/// A no-op step callback.
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _summary: &StepSummary) {}
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Stream the snapshots were appended to.
    pub stream_key: String,
    /// Number of steps executed.
    pub steps: u64,
    /// Census after the last step.
    pub final_counts: StateCounts,
    /// Census at the step with the most infected agents (earliest on ties).
    pub peak: StateCounts,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// A queued simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Job identifier (UUID v7).
    #[serde(default)]
    pub job_id: JobId,
    /// Model parameters.
    #[serde(default)]
    pub model: ModelConfig,
    /// Number of steps to run.
    pub steps: u64,
    /// Submission time.
    #[serde(default = "Utc::now")]
    pub enqueued_at: DateTime<Utc>,
}

impl RunRequest {
    /// Create a request stamped with a fresh job id and the current time.
    pub fn new(model: ModelConfig, steps: u64) -> Self {
        Self {
            job_id: JobId::new(),
            model,
            steps,
            enqueued_at: Utc::now(),
        }
    }

    /// Execute the request against `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the engine cannot be built or a step fails.
    pub fn run(&self, sink: &mut dyn SnapshotSink) -> Result<RunReport, RunnerError> {
        info!(job_id = %self.job_id, steps = self.steps, "Running queued job");
        run_model(self.model.clone(), self.steps, sink)
    }
}

/// Build one engine from `config` and step it exactly `steps` times.
///
/// # Errors
///
/// Returns [`RunnerError::Engine`] if the configuration is invalid or a step
/// fails; snapshots appended before the failure stay in the sink.
pub fn run_model(
    config: ModelConfig,
    steps: u64,
    sink: &mut dyn SnapshotSink,
) -> Result<RunReport, RunnerError> {
    let engine =
        SimulationEngine::new(config).map_err(|source| RunnerError::Engine { step: 0, source })?;
    run_with_callback(engine, steps, sink, &mut NoOpCallback)
}

/// Step an existing engine `steps` times, reporting each step to `callback`.
///
/// # Errors
///
/// Returns [`RunnerError::Engine`] if a step fails.
pub fn run_with_callback<S: SpatialIndex>(
    mut engine: SimulationEngine<S>,
    steps: u64,
    sink: &mut dyn SnapshotSink,
    callback: &mut dyn StepCallback,
) -> Result<RunReport, RunnerError> {
    let started_at = Utc::now();
    let mut peak = engine.census();

    info!(
        stream_key = %engine.stream_key(),
        steps,
        "Simulation starting"
    );

    for _ in 0..steps {
        let summary = engine.step(sink).map_err(|source| RunnerError::Engine {
            step: engine.current_step(),
            source,
        })?;
        if summary.counts.infected > peak.infected {
            peak = summary.counts;
        }
        callback.on_step(&summary);
    }

    let final_counts = engine.census();
    let finished_at = Utc::now();

    info!(
        stream_key = %engine.stream_key(),
        steps = engine.current_step(),
        healthy = final_counts.healthy,
        infected = final_counts.infected,
        recovered = final_counts.recovered,
        peak_step = peak.step,
        peak_infected = peak.infected,
        "Simulation complete"
    );

    Ok(RunReport {
        stream_key: engine.stream_key().to_owned(),
        steps: engine.current_step(),
        final_counts,
        peak,
        started_at,
        finished_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::census::census_by_step;
    use crate::sink::MemorySink;

    struct Counter(u64);

    impl StepCallback for Counter {
        fn on_step(&mut self, summary: &StepSummary) {
            assert_eq!(summary.step, self.0);
            self.0 = self.0.saturating_add(1);
        }
    }

    fn config() -> ModelConfig {
        ModelConfig {
            num_agents: 30,
            width: 100.0,
            height: 100.0,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn runs_exactly_the_requested_steps() {
        let mut sink = MemorySink::new();
        let report = run_model(config(), 12, &mut sink).unwrap();
        assert_eq!(report.steps, 12);
        assert_eq!(report.final_counts.step, 12);
        assert_eq!(report.final_counts.total(), 30);
        assert_eq!(sink.append_count(), 12);
        assert_eq!(sink.records(&report.stream_key).len(), 12 * 30);
        assert!(report.peak.infected >= 1);
    }

    #[test]
    fn zero_steps_writes_nothing() {
        let mut sink = MemorySink::new();
        let report = run_model(config(), 0, &mut sink).unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(sink.append_count(), 0);
    }

    #[test]
    fn invalid_config_fails_before_writing() {
        let mut sink = MemorySink::new();
        let bad = ModelConfig {
            recovery_threshold: 0,
            ..config()
        };
        let err = run_model(bad, 5, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Engine {
                step: 0,
                source: EngineError::InvalidConfig { .. }
            }
        ));
        assert_eq!(sink.append_count(), 0);
    }

    #[test]
    fn callback_sees_every_step_in_order() {
        let engine = SimulationEngine::new(config()).unwrap();
        let mut sink = MemorySink::new();
        let mut counter = Counter(0);
        run_with_callback(engine, 7, &mut sink, &mut counter).unwrap();
        assert_eq!(counter.0, 7);
    }

    #[test]
    fn peak_matches_the_stream_census() {
        let mut sink = MemorySink::new();
        let report = run_model(config(), 40, &mut sink).unwrap();
        let census = census_by_step(sink.records(&report.stream_key));
        let stream_peak = census.iter().map(|c| c.infected).max().unwrap_or(0);
        // The stream ends one step before the final census.
        assert!(report.peak.infected >= stream_peak);
    }

    #[test]
    fn request_json_round_trips() {
        let request = RunRequest::new(config(), 25);
        let json = serde_json::to_string(&request).unwrap();
        let back: RunRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn request_defaults_missing_fields() {
        let back: RunRequest = serde_json::from_str(r#"{"steps": 3, "model": {"N": 10}}"#).unwrap();
        assert_eq!(back.steps, 3);
        assert_eq!(back.model.num_agents, 10);
        assert_eq!(back.model.width, ModelConfig::default().width);
    }

    #[test]
    fn request_run_uses_its_model() {
        let mut sink = MemorySink::new();
        let report = RunRequest::new(config(), 2).run(&mut sink).unwrap();
        assert!(report.stream_key.starts_with("num_agents=30,"));
    }
}
