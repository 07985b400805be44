//! Identifier types.
//!
//! Agents are identified by a dense index (`0..N`) assigned at population
//! creation; the index doubles as the position of the agent in the engine's
//! population vector. Run jobs use UUID v7 (time-ordered) so that queued
//! requests sort by submission time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique identifier for an agent in the simulation.
///
/// Immutable for the lifetime of the agent. Serializes as a bare integer,
/// matching the `unique_id` field of the snapshot record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct AgentId(pub u32);

impl AgentId {
    /// Return the inner integer value.
    pub const fn into_inner(self) -> u32 {
        self.0
    }

    /// Return the id as a population index.
    pub fn index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_uuid_id! {
    /// Unique identifier for a queued simulation run.
    JobId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_serializes_as_integer() {
        let json = serde_json::to_string(&AgentId(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
    }

    #[test]
    fn agent_id_index_matches_value() {
        assert_eq!(AgentId(12).index(), 12);
    }

    #[test]
    fn job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }
}
