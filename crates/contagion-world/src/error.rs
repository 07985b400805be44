//! Error types for the `contagion-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use contagion_types::AgentId;

/// Errors that can occur during spatial index operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The plane dimensions are not positive finite numbers.
    #[error("invalid bounds {width} x {height}: dimensions must be positive and finite")]
    InvalidBounds {
        /// Requested width.
        width: f64,
        /// Requested height.
        height: f64,
    },

    /// The grid cell size is unusable for the given bounds.
    #[error("invalid grid cell size {cell_size}: {reason}")]
    InvalidCellSize {
        /// Requested cell size.
        cell_size: f64,
        /// Why it was rejected.
        reason: String,
    },

    /// The agent is already registered in the index.
    #[error("agent {0} is already placed")]
    DuplicateAgent(AgentId),

    /// The agent was never registered in the index.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// A position with a NaN or infinite coordinate was supplied.
    #[error("non-finite position for agent {0}")]
    NonFinitePosition(AgentId),
}
