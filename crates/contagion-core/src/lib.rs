//! Configuration, scheduling, and the step engine for the Contagion simulation.
//!
//! This crate drives a population of [`contagion_agents::Agent`]s on a
//! [`contagion_world::SpatialIndex`] one step at a time and reports every
//! step's starting state to a [`SnapshotSink`].
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration, the [`ModelConfig`] model parameters,
//!   and stream key formatting
//! - [`population`] -- Seeded creation of the initial population
//! - [`scheduler`] -- [`RandomActivation`], the per-step activation order
//! - [`sink`] -- The [`SnapshotSink`] append interface and [`MemorySink`]
//! - [`engine`] -- [`SimulationEngine`] and the phased step
//! - [`census`] -- Per-step state counts over a snapshot stream
//! - [`runner`] -- [`run_model`], the bounded run loop, and [`RunRequest`]

pub mod census;
pub mod config;
pub mod engine;
pub mod population;
pub mod runner;
pub mod scheduler;
pub mod sink;

// Re-export primary types at crate root.
pub use census::{census_by_step, peak_infected};
pub use config::{
    ConfigError, DEFAULT_STREAM_KEY_FIELDS, InfrastructureConfig, LoggingConfig, ModelConfig,
    RunConfig, SimulationConfig, StreamKeyField,
};
pub use engine::{EngineError, SimulationEngine, StepSummary};
pub use population::spawn_population;
pub use runner::{
    NoOpCallback, RunReport, RunRequest, RunnerError, StepCallback, run_model, run_with_callback,
};
pub use scheduler::RandomActivation;
pub use sink::{MemorySink, SinkError, SnapshotSink};
