//! Enumeration types for the Contagion simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Epidemiological state of an agent.
///
/// Transitions are monotonic: `Healthy -> Infected -> Recovered`. The
/// serialized form is the lowercase variant name, which is the three-valued
/// `state` encoding consumed by the analysis tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum HealthState {
    /// Susceptible; never infected.
    Healthy,
    /// Carrying the contagion and able to spread it.
    Infected,
    /// Terminal: immune and no longer contagious.
    Recovered,
}

impl HealthState {
    /// All states in transition order.
    pub const ALL: [Self; 3] = [Self::Healthy, Self::Infected, Self::Recovered];

    /// Stable string encoding used in stream records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Infected => "infected",
            Self::Recovered => "recovered",
        }
    }

    /// Parse the string encoding produced by [`HealthState::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "healthy" => Some(Self::Healthy),
            "infected" => Some(Self::Infected),
            "recovered" => Some(Self::Recovered),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` follows the one-way progression.
    ///
    /// Only single forward steps are legal; staying put is not a transition.
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Healthy, Self::Infected) | (Self::Infected, Self::Recovered)
        )
    }
}

impl core::fmt::Display for HealthState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
