//! Error types for the contagion-agents crate.
//!
//! Agent operations never panic. Transitions that would break the one-way
//! state progression and failures reported by the spatial index are returned
//! as typed errors.

use contagion_types::{AgentId, HealthState};
use contagion_world::WorldError;

/// Errors that can occur during agent state operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A state change that does not follow `Healthy -> Infected -> Recovered`.
    #[error("illegal transition for agent {agent}: {from} -> {to}")]
    IllegalTransition {
        /// The agent whose state change was rejected.
        agent: AgentId,
        /// State before the attempted change.
        from: HealthState,
        /// Requested state.
        to: HealthState,
    },

    /// An arithmetic overflow occurred while updating a counter.
    #[error("arithmetic overflow for agent {agent}: {context}")]
    ArithmeticOverflow {
        /// The agent being updated.
        agent: AgentId,
        /// Description of what was being computed.
        context: String,
    },

    /// The spatial index rejected an operation.
    #[error("spatial index error: {source}")]
    World {
        /// The underlying index error.
        #[from]
        source: WorldError,
    },
}
