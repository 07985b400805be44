//! Bucket-grid spatial index.
//!
//! [`GridSpace`] partitions the torus into a uniform grid of cells no smaller
//! than a configured size (normally the infection radius) and answers radius
//! queries by scanning only the cells the query disc can touch, wrapping
//! around the edges. Results are identical to [`ToroidalSpace`]; only the
//! number of candidates examined differs.
//!
//! [`ToroidalSpace`]: crate::space::ToroidalSpace

use std::collections::BTreeMap;

use contagion_types::{AgentId, Position};

use crate::bounds::Bounds;
use crate::error::WorldError;
use crate::space::SpatialIndex;

/// Upper bound on the number of grid cells, to keep memory proportional to
/// the population rather than to a pathological cell size.
pub const MAX_GRID_CELLS: usize = 1 << 20;

/// Uniform-grid spatial index over a torus.
#[derive(Debug, Clone)]
pub struct GridSpace {
    bounds: Bounds,
    cols: usize,
    rows: usize,
    cell_width: f64,
    cell_height: f64,
    /// Agent ids per cell, row-major.
    cells: Vec<Vec<AgentId>>,
    /// Stored position and owning cell per agent.
    entries: BTreeMap<AgentId, (Position, usize)>,
}

impl GridSpace {
    /// Create an empty grid whose cells are at least `cell_size` on each side.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCellSize`] if `cell_size` is not a
    /// positive finite number or would produce more than [`MAX_GRID_CELLS`]
    /// cells.
    pub fn new(bounds: Bounds, cell_size: f64) -> Result<Self, WorldError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(WorldError::InvalidCellSize {
                cell_size,
                reason: "must be positive and finite".to_owned(),
            });
        }
        let cols = cells_along(bounds.width(), cell_size);
        let rows = cells_along(bounds.height(), cell_size);
        let total = cols
            .checked_mul(rows)
            .filter(|n| *n <= MAX_GRID_CELLS)
            .ok_or_else(|| WorldError::InvalidCellSize {
                cell_size,
                reason: format!("grid would exceed {MAX_GRID_CELLS} cells"),
            })?;

        tracing::debug!(cols, rows, cell_size, "Grid space created");

        Ok(Self {
            bounds,
            cols,
            rows,
            cell_width: bounds.width() / count_as_f64(cols),
            cell_height: bounds.height() / count_as_f64(rows),
            cells: vec![Vec::new(); total],
            entries: BTreeMap::new(),
        })
    }

    /// Grid dimensions as `(columns, rows)`.
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    fn cell_of(&self, position: Position) -> usize {
        let col = axis_cell(position.x, self.cell_width, self.cols);
        let row = axis_cell(position.y, self.cell_height, self.rows);
        row.saturating_mul(self.cols).saturating_add(col)
    }

    fn insert_into_cell(&mut self, cell: usize, id: AgentId) {
        if let Some(bucket) = self.cells.get_mut(cell) {
            bucket.push(id);
        }
    }

    fn remove_from_cell(&mut self, cell: usize, id: AgentId) {
        if let Some(bucket) = self.cells.get_mut(cell) {
            bucket.retain(|other| *other != id);
        }
    }
}

impl SpatialIndex for GridSpace {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, id: AgentId) -> Option<Position> {
        self.entries.get(&id).map(|(position, _)| *position)
    }

    fn place_agent(&mut self, id: AgentId, position: Position) -> Result<Position, WorldError> {
        if self.entries.contains_key(&id) {
            return Err(WorldError::DuplicateAgent(id));
        }
        if !position.is_finite() {
            return Err(WorldError::NonFinitePosition(id));
        }
        let wrapped = self.bounds.wrap(position);
        let cell = self.cell_of(wrapped);
        self.insert_into_cell(cell, id);
        self.entries.insert(id, (wrapped, cell));
        Ok(wrapped)
    }

    fn move_agent(&mut self, id: AgentId, position: Position) -> Result<Position, WorldError> {
        if !position.is_finite() {
            return Err(WorldError::NonFinitePosition(id));
        }
        let old_cell = self
            .entries
            .get(&id)
            .map(|(_, cell)| *cell)
            .ok_or(WorldError::AgentNotFound(id))?;
        let wrapped = self.bounds.wrap(position);
        let new_cell = self.cell_of(wrapped);
        if new_cell != old_cell {
            self.remove_from_cell(old_cell, id);
            self.insert_into_cell(new_cell, id);
        }
        self.entries.insert(id, (wrapped, new_cell));
        Ok(wrapped)
    }

    fn neighbors_within(&self, position: Position, radius: f64) -> Vec<AgentId> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let center = self.bounds.wrap(position);
        let cols = wrapped_span(center.x, radius, self.cell_width, self.cols);
        let rows = wrapped_span(center.y, radius, self.cell_height, self.rows);

        let mut found: Vec<AgentId> = Vec::new();
        for row in &rows {
            for col in &cols {
                let cell = row.saturating_mul(self.cols).saturating_add(*col);
                let Some(bucket) = self.cells.get(cell) else {
                    continue;
                };
                for id in bucket {
                    let within = self
                        .entries
                        .get(id)
                        .is_some_and(|(p, _)| self.bounds.distance(center, *p) <= radius);
                    if within {
                        found.push(*id);
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }
}

/// Number of cells of at least `cell_size` that fit along `extent` (>= 1).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cells_along(extent: f64, cell_size: f64) -> usize {
    let n = (extent / cell_size).floor();
    if n < 1.0 { 1 } else { n as usize }
}

#[allow(clippy::cast_precision_loss)]
const fn count_as_f64(n: usize) -> f64 {
    n as f64
}

/// Cell index of a wrapped coordinate, clamped into `0..count`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_cell(value: f64, cell_extent: f64, count: usize) -> usize {
    let raw = (value / cell_extent).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(count.saturating_sub(1))
    }
}

/// Distinct cell indices along one axis that a disc of `radius` around
/// `center` can touch, wrapping around the torus.
///
/// One extra cell is taken on each side so that rounding at cell borders can
/// never drop a candidate.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn wrapped_span(center: f64, radius: f64, cell_extent: f64, count: usize) -> Vec<usize> {
    let first = ((center - radius) / cell_extent).floor() as i64;
    let last = ((center + radius) / cell_extent).floor() as i64;
    let first = first.saturating_sub(1);
    let last = last.saturating_add(1);
    let count_i = i64::try_from(count).unwrap_or(i64::MAX);

    if last.saturating_sub(first) >= count_i.saturating_sub(1) {
        return (0..count).collect();
    }
    (first..=last)
        .filter_map(|c| usize::try_from(c.rem_euclid(count_i)).ok())
        .collect()
}
