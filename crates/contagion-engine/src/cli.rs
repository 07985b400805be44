//! Command-line interface.
//!
//! Every model flag is optional; a flag that is given overrides the value
//! loaded from `contagion-config.yaml`, which in turn overrides the built-in
//! defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use contagion_core::ModelConfig;

/// Contagion simulation engine.
#[derive(Debug, Parser)]
#[command(name = "contagion-engine", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(
        short,
        long,
        global = true,
        env = "CONTAGION_CONFIG",
        default_value = "contagion-config.yaml"
    )]
    pub config: PathBuf,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one simulation now, appending snapshots to Dragonfly.
    Run {
        /// Model overrides.
        #[command(flatten)]
        model: ModelArgs,

        /// Keep snapshots in memory instead of writing them to Dragonfly.
        #[arg(long)]
        dry_run: bool,

        /// Log a census line every this many steps (0 disables).
        #[arg(long, default_value_t = 50)]
        progress_every: u64,
    },

    /// Push a run request onto the run queue and print its job id.
    Enqueue {
        /// Model overrides.
        #[command(flatten)]
        model: ModelArgs,

        /// Number of identical requests to enqueue.
        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// Consume run requests from the run queue and execute them.
    Worker {
        /// Exit after one request has been processed.
        #[arg(long)]
        once: bool,

        /// Seconds each blocking pop waits before polling again.
        #[arg(long, default_value_t = 5.0)]
        poll_secs: f64,

        /// Log a census line every this many steps (0 disables).
        #[arg(long, default_value_t = 50)]
        progress_every: u64,
    },

    /// Print the per-step state census of a stored stream as JSON lines.
    Census {
        /// Model overrides used to derive the stream key.
        #[command(flatten)]
        model: ModelArgs,

        /// Read this stream instead of the one derived from the model.
        #[arg(long)]
        stream_key: Option<String>,
    },
}

/// Per-invocation overrides of [`ModelConfig`] fields and the run length.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct ModelArgs {
    /// Population size.
    #[arg(short = 'n', long)]
    pub num_agents: Option<u32>,

    /// Width of the plane.
    #[arg(long)]
    pub width: Option<f64>,

    /// Height of the plane.
    #[arg(long)]
    pub height: Option<f64>,

    /// Probability that an agent is stationary.
    #[arg(long)]
    pub p_stationary: Option<f64>,

    /// Distance a mobile agent covers per step.
    #[arg(long)]
    pub speed: Option<f64>,

    /// Contact distance for infection.
    #[arg(long)]
    pub infection_radius: Option<f64>,

    /// Steps an agent stays infected.
    #[arg(long)]
    pub recovery_threshold: Option<u32>,

    /// Random seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of steps to run.
    #[arg(long)]
    pub steps: Option<u64>,
}

impl ModelArgs {
    /// Overwrite every field of `model` that was given on the command line.
    pub fn apply(&self, model: &mut ModelConfig) {
        if let Some(v) = self.num_agents {
            model.num_agents = v;
        }
        if let Some(v) = self.width {
            model.width = v;
        }
        if let Some(v) = self.height {
            model.height = v;
        }
        if let Some(v) = self.p_stationary {
            model.p_stationary = v;
        }
        if let Some(v) = self.speed {
            model.speed = v;
        }
        if let Some(v) = self.infection_radius {
            model.infection_radius = v;
        }
        if let Some(v) = self.recovery_threshold {
            model.recovery_threshold = v;
        }
        if let Some(v) = self.seed {
            model.seed = v;
        }
    }
}
