//! Agent state and per-step behavior for the Contagion simulation.
//!
//! This crate contains the logic layer for agents -- everything that operates
//! on a single agent without owning the population or deciding the order of
//! activation. It sits between `contagion-types`/`contagion-world` (data and
//! geometry) and `contagion-core` (scheduling and the step loop).
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] record: movement, recovery, contact lookup,
//!   and the guarded `Healthy -> Infected -> Recovered` transitions.
//! - [`error`] -- Error types for all agent operations ([`AgentError`])

pub mod agent;
pub mod error;

// Re-export primary types at crate root for convenience.
pub use agent::Agent;
pub use error::AgentError;
