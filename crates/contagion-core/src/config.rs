//! Configuration loading and typed config structures for the Contagion simulation.
//!
//! The canonical configuration lives in `contagion-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, a loader
//! that reads the file, and [`ModelConfig::validate`], which enforces the
//! parameter ranges the engine relies on.
//!
//! Every field has a default matching the reference run (200 agents on an
//! 800 x 400 plane for 300 steps), so an empty file is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable overriding `infrastructure.dragonfly_url`.
pub const ENV_DRAGONFLY_URL: &str = "DRAGONFLY_URL";

/// Environment variable overriding `infrastructure.queue_key`.
pub const ENV_QUEUE_KEY: &str = "CONTAGION_QUEUE";

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A model parameter is outside its valid range.
    #[error("invalid model parameter `{field}`: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `contagion-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Model parameters.
    #[serde(default)]
    pub model: ModelConfig,

    /// Run length.
    #[serde(default)]
    pub run: RunConfig,

    /// Infrastructure connection settings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for infrastructure:
    /// - `DRAGONFLY_URL` overrides `infrastructure.dragonfly_url`
    /// - `CONTAGION_QUEUE` overrides `infrastructure.queue_key`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Model parameters
// ---------------------------------------------------------------------------

/// Immutable parameters of one simulation.
///
/// Also the payload of a queued run request, so it serializes as well as
/// deserializes. `num_agents` accepts the short alias `N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Population size.
    #[serde(default = "default_num_agents", alias = "N")]
    pub num_agents: u32,

    /// Width of the toroidal plane.
    #[serde(default = "default_width")]
    pub width: f64,

    /// Height of the toroidal plane.
    #[serde(default = "default_height")]
    pub height: f64,

    /// Probability that an agent (other than the seed carrier) is stationary.
    #[serde(default = "default_p_stationary")]
    pub p_stationary: f64,

    /// Distance a mobile agent covers per step.
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Contact distance within which an infected agent infects others.
    #[serde(default = "default_infection_radius")]
    pub infection_radius: f64,

    /// Steps an agent stays infected before recovering.
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u32,

    /// Seed for the simulation's single random source.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_agents: default_num_agents(),
            width: default_width(),
            height: default_height(),
            p_stationary: default_p_stationary(),
            speed: default_speed(),
            infection_radius: default_infection_radius(),
            recovery_threshold: default_recovery_threshold(),
            seed: default_seed(),
        }
    }
}

impl ModelConfig {
    /// Check every parameter against the range the engine supports.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_agents == 0 {
            return Err(invalid("num_agents", "population must not be empty"));
        }
        for (field, value) in [("width", self.width), ("height", self.height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("{value} is not a positive finite number")));
            }
        }
        if !(0.0..=1.0).contains(&self.p_stationary) {
            return Err(invalid(
                "p_stationary",
                format!("{} is not a probability in [0, 1]", self.p_stationary),
            ));
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(invalid(
                "speed",
                format!("{} is not a non-negative finite number", self.speed),
            ));
        }
        if !self.infection_radius.is_finite() || self.infection_radius <= 0.0 {
            return Err(invalid(
                "infection_radius",
                format!("{} is not a positive finite number", self.infection_radius),
            ));
        }
        if self.recovery_threshold == 0 {
            return Err(invalid("recovery_threshold", "must be at least 1 step"));
        }
        Ok(())
    }

    /// Comma-joined `field=value` pairs over `fields`, in the given order.
    ///
    /// With [`DEFAULT_STREAM_KEY_FIELDS`] and default parameters this yields
    /// `num_agents=200,width=800,height=400,p_stationary=0.75,speed=5`.
    pub fn stream_key(&self, fields: &[StreamKeyField]) -> String {
        fields
            .iter()
            .map(|field| format!("{}={}", field.name(), self.field_value(*field)))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn field_value(&self, field: StreamKeyField) -> String {
        match field {
            StreamKeyField::NumAgents => self.num_agents.to_string(),
            StreamKeyField::Width => self.width.to_string(),
            StreamKeyField::Height => self.height.to_string(),
            StreamKeyField::PStationary => self.p_stationary.to_string(),
            StreamKeyField::Speed => self.speed.to_string(),
            StreamKeyField::InfectionRadius => self.infection_radius.to_string(),
            StreamKeyField::RecoveryThreshold => self.recovery_threshold.to_string(),
            StreamKeyField::Seed => self.seed.to_string(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// A model parameter that can appear in a stream key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKeyField {
    /// `num_agents`
    NumAgents,
    /// `width`
    Width,
    /// `height`
    Height,
    /// `p_stationary`
    PStationary,
    /// `speed`
    Speed,
    /// `infection_radius`
    InfectionRadius,
    /// `recovery_threshold`
    RecoveryThreshold,
    /// `seed`
    Seed,
}

impl StreamKeyField {
    /// Name used on the left of `=` in the key.
    pub const fn name(self) -> &'static str {
        match self {
            Self::NumAgents => "num_agents",
            Self::Width => "width",
            Self::Height => "height",
            Self::PStationary => "p_stationary",
            Self::Speed => "speed",
            Self::InfectionRadius => "infection_radius",
            Self::RecoveryThreshold => "recovery_threshold",
            Self::Seed => "seed",
        }
    }
}

/// Fields identifying a run's stream unless configured otherwise.
pub const DEFAULT_STREAM_KEY_FIELDS: [StreamKeyField; 5] = [
    StreamKeyField::NumAgents,
    StreamKeyField::Width,
    StreamKeyField::Height,
    StreamKeyField::PStationary,
    StreamKeyField::Speed,
];

// ---------------------------------------------------------------------------
// Run, infrastructure, logging
// ---------------------------------------------------------------------------

/// Run-length configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of steps to execute.
    #[serde(default = "default_steps")]
    pub steps: u64,

    /// Parameters included in the stream key, in order.
    #[serde(default = "default_stream_key_fields")]
    pub stream_key_fields: Vec<StreamKeyField>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            stream_key_fields: default_stream_key_fields(),
        }
    }
}

/// Infrastructure connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Dragonfly (Redis-compatible) connection URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// List key holding queued run requests.
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
}

impl InfrastructureConfig {
    /// Apply environment variable overrides to infrastructure settings.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(ENV_DRAGONFLY_URL) {
            self.dragonfly_url = val;
        }
        if let Ok(val) = std::env::var(ENV_QUEUE_KEY) {
            self.queue_key = val;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: default_dragonfly_url(),
            queue_key: default_queue_key(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_num_agents() -> u32 {
    200
}

const fn default_width() -> f64 {
    800.0
}

const fn default_height() -> f64 {
    400.0
}

const fn default_p_stationary() -> f64 {
    0.75
}

const fn default_speed() -> f64 {
    5.0
}

const fn default_infection_radius() -> f64 {
    10.0
}

const fn default_recovery_threshold() -> u32 {
    100
}

const fn default_seed() -> u64 {
    42
}

const fn default_steps() -> u64 {
    300
}

fn default_stream_key_fields() -> Vec<StreamKeyField> {
    DEFAULT_STREAM_KEY_FIELDS.to_vec()
}

fn default_dragonfly_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_queue_key() -> String {
    String::from("contagion:runs")
}

fn default_log_level() -> String {
    String::from("info")
}
