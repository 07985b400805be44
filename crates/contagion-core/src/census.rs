//! Per-step state counts over a snapshot stream.
//!
//! A persisted stream holds one record per agent per step. Grouping it by
//! step and counting each [`HealthState`] yields the epidemic curve; for a
//! complete stream every step's counts sum to the population size.
//!
//! [`HealthState`]: contagion_types::HealthState

use std::collections::BTreeMap;

use contagion_types::{AgentSnapshot, StateCounts};

/// Count records by state for every step present in `records`.
///
/// The result is ordered by ascending step regardless of record order.
pub fn census_by_step<'a, I>(records: I) -> Vec<StateCounts>
where
    I: IntoIterator<Item = &'a AgentSnapshot>,
{
    let mut by_step: BTreeMap<u64, StateCounts> = BTreeMap::new();
    for record in records {
        by_step
            .entry(record.step)
            .or_insert_with(|| StateCounts::new(record.step))
            .add(record.state);
    }
    by_step.into_values().collect()
}

/// The step with the most infected agents, earliest on ties.
pub fn peak_infected(census: &[StateCounts]) -> Option<StateCounts> {
    census
        .iter()
        .copied()
        .reduce(|best, c| if c.infected > best.infected { c } else { best })
}
