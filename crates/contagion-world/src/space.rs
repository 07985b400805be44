//! The [`SpatialIndex`] capability and its reference implementation.
//!
//! An index records one wrapped position per agent id and answers radius
//! queries under toroidal distance. It never owns agents: the population
//! lives in the engine, and the index only mirrors positions for lookup.

use std::collections::BTreeMap;

use contagion_types::{AgentId, Position};

use crate::bounds::Bounds;
use crate::error::WorldError;

/// Position bookkeeping and neighbor lookup on a torus.
///
/// Implementations must agree exactly on query results; they differ only in
/// how much of the plane a query has to scan.
pub trait SpatialIndex {
    /// Dimensions of the indexed plane.
    fn bounds(&self) -> Bounds;

    /// Number of registered agents.
    fn len(&self) -> usize;

    /// Whether no agent is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded position of `id`, if registered.
    fn position(&self, id: AgentId) -> Option<Position>;

    /// Register `id` at `position` (wrapped into bounds).
    ///
    /// Returns the position actually stored.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateAgent`] if `id` is already registered,
    /// or [`WorldError::NonFinitePosition`] for NaN/infinite coordinates.
    fn place_agent(&mut self, id: AgentId, position: Position) -> Result<Position, WorldError>;

    /// Move a registered agent to `position` (wrapped into bounds).
    ///
    /// Returns the position actually stored.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AgentNotFound`] if `id` was never placed, or
    /// [`WorldError::NonFinitePosition`] for NaN/infinite coordinates.
    fn move_agent(&mut self, id: AgentId, position: Position) -> Result<Position, WorldError>;

    /// Every registered agent within toroidal distance `radius` of `position`.
    ///
    /// The boundary is inclusive. An agent sitting at `position` itself is
    /// included; callers filter self-matches. Results are in ascending id
    /// order. A negative or NaN radius matches nothing.
    fn neighbors_within(&self, position: Position, radius: f64) -> Vec<AgentId>;
}

/// Naive spatial index: every query scans all registered agents.
#[derive(Debug, Clone)]
pub struct ToroidalSpace {
    bounds: Bounds,
    positions: BTreeMap<AgentId, Position>,
}

impl ToroidalSpace {
    /// Create an empty space with the given bounds.
    pub const fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            positions: BTreeMap::new(),
        }
    }
}

impl SpatialIndex for ToroidalSpace {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    fn position(&self, id: AgentId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    fn place_agent(&mut self, id: AgentId, position: Position) -> Result<Position, WorldError> {
        if self.positions.contains_key(&id) {
            return Err(WorldError::DuplicateAgent(id));
        }
        if !position.is_finite() {
            return Err(WorldError::NonFinitePosition(id));
        }
        let wrapped = self.bounds.wrap(position);
        self.positions.insert(id, wrapped);
        Ok(wrapped)
    }

    fn move_agent(&mut self, id: AgentId, position: Position) -> Result<Position, WorldError> {
        if !position.is_finite() {
            return Err(WorldError::NonFinitePosition(id));
        }
        let wrapped = self.bounds.wrap(position);
        let slot = self
            .positions
            .get_mut(&id)
            .ok_or(WorldError::AgentNotFound(id))?;
        *slot = wrapped;
        Ok(wrapped)
    }

    fn neighbors_within(&self, position: Position, radius: f64) -> Vec<AgentId> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let center = self.bounds.wrap(position);
        self.positions
            .iter()
            .filter(|(_, p)| self.bounds.distance(center, **p) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn space() -> ToroidalSpace {
        ToroidalSpace::new(Bounds::new(100.0, 100.0).unwrap())
    }

    #[test]
    fn place_rejects_duplicates() {
        let mut s = space();
        s.place_agent(AgentId(0), Position::new(1.0, 1.0)).unwrap();
        let err = s.place_agent(AgentId(0), Position::new(2.0, 2.0));
        assert!(matches!(err, Err(WorldError::DuplicateAgent(AgentId(0)))));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn move_requires_registration() {
        let mut s = space();
        let err = s.move_agent(AgentId(4), Position::new(1.0, 1.0));
        assert!(matches!(err, Err(WorldError::AgentNotFound(AgentId(4)))));
    }

    #[test]
    fn move_wraps_the_stored_position() {
        let mut s = space();
        s.place_agent(AgentId(0), Position::new(98.0, 50.0)).unwrap();
        let stored = s.move_agent(AgentId(0), Position::new(103.0, -2.0)).unwrap();
        assert!((stored.x - 3.0).abs() < 1e-12);
        assert!((stored.y - 98.0).abs() < 1e-12);
        assert_eq!(s.position(AgentId(0)), Some(stored));
    }

    #[test]
    fn rejects_non_finite_positions() {
        let mut s = space();
        let err = s.place_agent(AgentId(0), Position::new(f64::NAN, 0.0));
        assert!(matches!(err, Err(WorldError::NonFinitePosition(_))));
    }

    #[test]
    fn neighbors_include_self_and_boundary() {
        let mut s = space();
        s.place_agent(AgentId(0), Position::new(0.0, 0.0)).unwrap();
        s.place_agent(AgentId(1), Position::new(0.0, 10.0)).unwrap();
        s.place_agent(AgentId(2), Position::new(50.0, 50.0)).unwrap();
        let found = s.neighbors_within(Position::new(0.0, 0.0), 10.0);
        assert_eq!(found, vec![AgentId(0), AgentId(1)]);
    }

    #[test]
    fn neighbors_wrap_across_edges() {
        let mut s = space();
        s.place_agent(AgentId(0), Position::new(1.0, 1.0)).unwrap();
        s.place_agent(AgentId(1), Position::new(97.0, 98.0)).unwrap();
        let found = s.neighbors_within(Position::new(1.0, 1.0), 5.5);
        assert_eq!(found, vec![AgentId(0), AgentId(1)]);
    }

    #[test]
    fn negative_radius_matches_nothing() {
        let mut s = space();
        s.place_agent(AgentId(0), Position::new(1.0, 1.0)).unwrap();
        assert!(s.neighbors_within(Position::new(1.0, 1.0), -1.0).is_empty());
        assert!(s.neighbors_within(Position::new(1.0, 1.0), f64::NAN).is_empty());
    }
}
