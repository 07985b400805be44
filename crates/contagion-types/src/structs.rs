//! Core value types: geometry, the per-agent snapshot record, and the
//! per-step census.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::HealthState;
use crate::ids::AgentId;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point on the simulated plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a position from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return this position displaced by `heading * distance`.
    ///
    /// The result is not wrapped; reduce it through the space's bounds.
    pub fn advanced(self, heading: Heading, distance: f64) -> Self {
        Self {
            x: heading.x().mul_add(distance, self.x),
            y: heading.y().mul_add(distance, self.y),
        }
    }

    /// Whether both coordinates are finite.
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A unit direction vector.
///
/// Only constructible through [`Heading::from_components`] (which normalizes)
/// or [`Heading::EAST`], so the magnitude is always 1 up to rounding. The
/// vector is never renormalized after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heading {
    x: f64,
    y: f64,
}

impl Heading {
    /// The unit vector `(1, 0)`.
    pub const EAST: Self = Self { x: 1.0, y: 0.0 };

    /// Normalize a raw direction into a unit heading.
    ///
    /// Returns `None` when the raw vector has zero or non-finite magnitude
    /// and therefore has no direction.
    pub fn from_components(x: f64, y: f64) -> Option<Self> {
        let magnitude = x.hypot(y);
        if !magnitude.is_finite() || magnitude <= 0.0 {
            return None;
        }
        Some(Self {
            x: x / magnitude,
            y: y / magnitude,
        })
    }

    /// Horizontal component.
    pub const fn x(self) -> f64 {
        self.x
    }

    /// Vertical component.
    pub const fn y(self) -> f64 {
        self.y
    }

    /// Euclidean length (1 up to rounding).
    pub fn magnitude(self) -> f64 {
        self.x.hypot(self.y)
    }
}

// ---------------------------------------------------------------------------
// Snapshot record
// ---------------------------------------------------------------------------

/// One agent's observable state at the start of a step.
///
/// Field names and order are a contract with the downstream analysis
/// tooling; do not rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// The agent's id.
    pub unique_id: AgentId,
    /// Step at which the snapshot was taken (before the step's updates).
    pub step: u64,
    /// Epidemiological state.
    pub state: HealthState,
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// `1` if the agent is stationary, else `0`.
    pub social_distancing: u8,
    /// Steps spent infected so far.
    pub recovery_time: u32,
}

impl AgentSnapshot {
    /// Record field names, in serialization order.
    pub const FIELD_NAMES: [&'static str; 7] = [
        "unique_id",
        "step",
        "state",
        "x",
        "y",
        "social_distancing",
        "recovery_time",
    ];

    /// Whether the snapshotted agent was stationary.
    pub const fn is_stationary(&self) -> bool {
        self.social_distancing != 0
    }
}

// ---------------------------------------------------------------------------
// Census
// ---------------------------------------------------------------------------

/// Per-step counts of agents in each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateCounts {
    /// The step these counts describe.
    pub step: u64,
    /// Agents in [`HealthState::Healthy`].
    pub healthy: u32,
    /// Agents in [`HealthState::Infected`].
    pub infected: u32,
    /// Agents in [`HealthState::Recovered`].
    pub recovered: u32,
}

impl StateCounts {
    /// Empty counts for `step`.
    pub const fn new(step: u64) -> Self {
        Self {
            step,
            healthy: 0,
            infected: 0,
            recovered: 0,
        }
    }

    /// Count one more agent in `state`.
    pub const fn add(&mut self, state: HealthState) {
        match state {
            HealthState::Healthy => self.healthy = self.healthy.saturating_add(1),
            HealthState::Infected => self.infected = self.infected.saturating_add(1),
            HealthState::Recovered => self.recovered = self.recovered.saturating_add(1),
        }
    }

    /// Count of agents in `state`.
    pub const fn get(&self, state: HealthState) -> u32 {
        match state {
            HealthState::Healthy => self.healthy,
            HealthState::Infected => self.infected,
            HealthState::Recovered => self.recovered,
        }
    }

    /// Sum over all states.
    pub const fn total(&self) -> u32 {
        self.healthy
            .saturating_add(self.infected)
            .saturating_add(self.recovered)
    }
}
