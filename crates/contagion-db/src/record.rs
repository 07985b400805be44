//! Stream entry encoding for agent snapshots.
//!
//! Redis stream entries are flat string maps, so each [`AgentSnapshot`] is
//! stored as one entry whose fields are the record's field names and whose
//! values are the plain-text renderings:
//!
//! | Field | Example |
//! |-------|---------|
//! | `unique_id` | `17` |
//! | `step` | `42` |
//! | `state` | `infected` |
//! | `x`, `y` | `313.0625` |
//! | `social_distancing` | `0` or `1` |
//! | `recovery_time` | `12` |
//!
//! Coordinates use Rust's shortest round-trip float formatting, so decoding
//! restores the exact value that was written.

use std::collections::HashMap;
use std::str::FromStr;

use contagion_types::{AgentId, AgentSnapshot, HealthState};

use crate::error::DbError;

/// Field/value pairs for one stream entry, in record field order.
pub fn encode_snapshot(snapshot: &AgentSnapshot) -> Vec<(&'static str, String)> {
    vec![
        ("unique_id", snapshot.unique_id.to_string()),
        ("step", snapshot.step.to_string()),
        ("state", snapshot.state.as_str().to_owned()),
        ("x", snapshot.x.to_string()),
        ("y", snapshot.y.to_string()),
        ("social_distancing", snapshot.social_distancing.to_string()),
        ("recovery_time", snapshot.recovery_time.to_string()),
    ]
}

/// Rebuild a snapshot from the fields of stream entry `entry_id`.
///
/// # Errors
///
/// Returns [`DbError::Decode`] if a field is missing or unparseable.
pub fn decode_snapshot(
    entry_id: &str,
    fields: &HashMap<String, String>,
) -> Result<AgentSnapshot, DbError> {
    let state_raw = field(entry_id, fields, "state")?;
    let state = HealthState::parse(state_raw).ok_or_else(|| DbError::Decode {
        entry_id: entry_id.to_owned(),
        field: "state",
        reason: format!("has unknown value {state_raw:?}"),
    })?;
    let social_distancing: u8 = parsed(entry_id, fields, "social_distancing")?;
    if social_distancing > 1 {
        return Err(DbError::Decode {
            entry_id: entry_id.to_owned(),
            field: "social_distancing",
            reason: format!("must be 0 or 1, got {social_distancing}"),
        });
    }

    Ok(AgentSnapshot {
        unique_id: AgentId(parsed(entry_id, fields, "unique_id")?),
        step: parsed(entry_id, fields, "step")?,
        state,
        x: parsed(entry_id, fields, "x")?,
        y: parsed(entry_id, fields, "y")?,
        social_distancing,
        recovery_time: parsed(entry_id, fields, "recovery_time")?,
    })
}

fn field<'a>(
    entry_id: &str,
    fields: &'a HashMap<String, String>,
    name: &'static str,
) -> Result<&'a str, DbError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| DbError::Decode {
            entry_id: entry_id.to_owned(),
            field: name,
            reason: String::from("is missing"),
        })
}

fn parsed<T>(
    entry_id: &str,
    fields: &HashMap<String, String>,
    name: &'static str,
) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = field(entry_id, fields, name)?;
    raw.parse().map_err(|e: T::Err| DbError::Decode {
        entry_id: entry_id.to_owned(),
        field: name,
        reason: format!("{raw:?} does not parse: {e}"),
    })
}
