//! Toroidal geometry and spatial indexing for the Contagion simulation.
//!
//! The simulated area is a `width x height` rectangle whose opposite edges
//! are adjacent. This crate owns the geometry of that torus and the
//! [`SpatialIndex`] capability the engine injects into every agent step.
//!
//! # Modules
//!
//! - [`bounds`] -- [`Bounds`]: wraparound reduction and toroidal distance.
//! - [`error`] -- Error types for index operations.
//! - [`space`] -- The [`SpatialIndex`] trait and [`ToroidalSpace`], the
//!   scan-everything reference implementation.
//! - [`grid`] -- [`GridSpace`], a bucket-grid index with identical answers.

pub mod bounds;
pub mod error;
pub mod grid;
pub mod space;

// Re-export primary types at crate root.
pub use bounds::Bounds;
pub use error::WorldError;
pub use grid::GridSpace;
pub use space::{SpatialIndex, ToroidalSpace};
