//! Toroidal bounds: wraparound reduction and wrapped distance.
//!
//! The simulated rectangle `[0, width) x [0, height)` has its opposite edges
//! glued together. Every coordinate stored anywhere in the simulation has
//! passed through [`Bounds::wrap`].

use contagion_types::Position;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Dimensions of the toroidal plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    width: f64,
    height: f64,
}

impl Bounds {
    /// Create bounds for a `width x height` torus.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidBounds`] unless both dimensions are
    /// positive and finite.
    pub fn new(width: f64, height: f64) -> Result<Self, WorldError> {
        let valid = |d: f64| d.is_finite() && d > 0.0;
        if !valid(width) || !valid(height) {
            return Err(WorldError::InvalidBounds { width, height });
        }
        Ok(Self { width, height })
    }

    /// Width of the plane.
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Height of the plane.
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Reduce `position` into `[0, width) x [0, height)`.
    pub fn wrap(&self, position: Position) -> Position {
        Position::new(
            wrap_axis(position.x, self.width),
            wrap_axis(position.y, self.height),
        )
    }

    /// Whether `position` already lies inside the half-open rectangle.
    pub fn contains(&self, position: Position) -> bool {
        (0.0..self.width).contains(&position.x) && (0.0..self.height).contains(&position.y)
    }

    /// Toroidal Euclidean distance between two wrapped positions.
    ///
    /// Each axis contributes `min(|d|, extent - |d|)`.
    pub fn distance(&self, a: Position, b: Position) -> f64 {
        let dx = axis_distance(a.x, b.x, self.width);
        let dy = axis_distance(a.y, b.y, self.height);
        dx.hypot(dy)
    }
}

/// Reduce a single coordinate modulo `extent`.
///
/// `rem_euclid` can round a tiny negative input up to exactly `extent`; that
/// case is folded back to `0.0` so the result is always strictly below the
/// extent.
fn wrap_axis(value: f64, extent: f64) -> f64 {
    let wrapped = value.rem_euclid(extent);
    if wrapped >= extent { 0.0 } else { wrapped }
}

fn axis_distance(a: f64, b: f64, extent: f64) -> f64 {
    let direct = (a - b).abs().rem_euclid(extent);
    direct.min(extent - direct)
}
