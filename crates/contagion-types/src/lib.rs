//! Shared type definitions for the Contagion simulation.
//!
//! This crate is the single source of truth for the values exchanged between
//! the engine, the persistence layer, and external consumers of the snapshot
//! stream. Record types are exported to `TypeScript` via `ts-rs` for the
//! analysis dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Agent and job identifiers
//! - [`enums`] -- [`HealthState`], the epidemiological state machine's states
//! - [`structs`] -- Geometry values, the [`AgentSnapshot`] record, and the
//!   per-step [`StateCounts`] census

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::HealthState;
pub use ids::{AgentId, JobId};
pub use structs::{AgentSnapshot, Heading, Position, StateCounts};
