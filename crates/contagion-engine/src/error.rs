//! Error types for the engine binary.
//!
//! [`AppError`] is the top-level error type that wraps every failure mode of
//! the subcommands. `main` attaches `anyhow` context on top of it.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that the subcommands can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: contagion_core::ConfigError,
    },

    /// A simulation run failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: contagion_core::RunnerError,
    },

    /// Dragonfly connection, stream, or queue operation failed.
    #[error("storage error: {source}")]
    Db {
        /// The underlying storage error.
        #[from]
        source: contagion_db::DbError,
    },

    /// The blocking simulation task panicked or was cancelled.
    #[error("simulation task failed: {source}")]
    Task {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// A queued payload or an output line was not valid JSON.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
