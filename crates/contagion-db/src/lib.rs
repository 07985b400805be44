//! Data layer for the Contagion simulation (`Dragonfly`).
//!
//! Every run appends one batch of agent snapshots per step to a Redis stream
//! named by the run's stream key; queued run requests wait on a Redis list.
//! This crate provides the typed interface to both.
//!
//! ```text
//! Engine step
//!     |
//!     +-- append batch --> stream `<stream key>`  (XADD x N in MULTI/EXEC)
//!
//! Enqueue --> list `<queue key>` --> Worker   (RPUSH / BLPOP, JSON)
//! ```
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) connection and commands
//! - [`record`] -- Stream entry field encoding for [`AgentSnapshot`]
//! - [`error`] -- Shared error types
//!
//! [`AgentSnapshot`]: contagion_types::AgentSnapshot

pub mod dragonfly;
pub mod error;
pub mod record;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyPool;
pub use error::DbError;
pub use record::{decode_snapshot, encode_snapshot};
