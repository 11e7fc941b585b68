// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid over a fixed layout area.
//!
//! The grid divides its bounds into `cols × rows` equal cells and buckets every
//! node into exactly one of them. A coordinate maps to a cell by
//! floor-division of its offset from the origin, clamped into the grid, so a
//! cell is half-open `[lo, hi)` on each axis except along the outermost edges,
//! which also own everything beyond them. That clamping is what lets nodes that
//! drift outside the layout area stay indexed.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::error::SpatialError;
use crate::positions::NodePositions;

/// A `cols × rows` bucket grid of nodes.
pub struct SpatialGrid<N> {
    bounds: Rect,
    cols: usize,
    rows: usize,
    cell_w: f64,
    cell_h: f64,
    cells: Vec<Vec<N>>,
    locations: HashMap<N, usize>,
}

impl<N: Clone + Eq + Hash> SpatialGrid<N> {
    /// Create an empty grid with `cols × rows` cells covering `bounds`.
    pub fn new(bounds: Rect, cols: usize, rows: usize) -> Result<Self, SpatialError> {
        let bounds = bounds.abs();
        if !(bounds.width() > 0.0 && bounds.height() > 0.0) {
            return Err(SpatialError::InvalidArgument {
                what: "grid bounds must have a positive width and height",
            });
        }
        if cols == 0 || rows == 0 {
            return Err(SpatialError::InvalidArgument {
                what: "grid must have at least one column and one row",
            });
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "Cell counts are far below 2^52."
        )]
        let (cell_w, cell_h) = (bounds.width() / cols as f64, bounds.height() / rows as f64);
        Ok(Self {
            bounds,
            cols,
            rows,
            cell_w,
            cell_h,
            cells: vec![Vec::new(); cols * rows],
            locations: HashMap::new(),
        })
    }

    /// Create a grid whose cells are (at most) `cell_w × cell_h`.
    ///
    /// The number of cells along each axis is rounded up so the whole of
    /// `bounds` is covered; cells are then sized to divide `bounds` evenly.
    pub fn with_cell_size(bounds: Rect, cell_w: f64, cell_h: f64) -> Result<Self, SpatialError> {
        if !(cell_w > 0.0 && cell_h > 0.0) {
            return Err(SpatialError::InvalidArgument {
                what: "grid cell size must be positive",
            });
        }
        let bounds = bounds.abs();
        let cols = cells_along(bounds.width(), cell_w);
        let rows = cells_along(bounds.height(), cell_h);
        Self::new(bounds, cols, rows)
    }

    /// Area covered by the grid.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the grid holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Remove every node, keeping the cell layout.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.locations.clear();
    }

    /// Rebuild from scratch: clear all cells and re-bucket every node by its
    /// current position. A node reported twice ends up where it was last seen.
    pub fn build<S: NodePositions<N> + ?Sized>(&mut self, positions: &S) {
        self.clear();
        positions.for_each_position(&mut |node, p| {
            self.relocate(node.clone(), p);
        });
        tracing::debug!(
            nodes = self.locations.len(),
            cols = self.cols,
            rows = self.rows,
            "rebuilt spatial grid"
        );
    }

    /// Map a coordinate to its `(col, row)` cell.
    ///
    /// This is the same mapping [`build`](Self::build) uses, so a node at
    /// `(x, y)` is always found in `cell_indices(x, y)` after a build.
    pub fn cell_indices(&self, x: f64, y: f64) -> (usize, usize) {
        (
            axis_index(x, self.bounds.x0, self.cell_w, self.cols),
            axis_index(y, self.bounds.y0, self.cell_h, self.rows),
        )
    }

    /// All cells that intersect `rect`, row-major.
    ///
    /// Never omits an intersecting cell. Because edge cells own everything
    /// beyond the grid, a rectangle outside the bounds reports the nearest
    /// edge cells rather than nothing.
    pub fn visible_cells(&self, rect: Rect) -> Vec<(usize, usize)> {
        let rect = rect.abs();
        let (c0, r0) = self.cell_indices(rect.x0, rect.y0);
        let (c1, r1) = self.cell_indices(rect.x1, rect.y1);
        let mut out = Vec::with_capacity((c1 - c0 + 1) * (r1 - r0 + 1));
        for row in r0..=r1 {
            for col in c0..=c1 {
                out.push((col, row));
            }
        }
        out
    }

    /// Nodes bucketed in `(col, row)`; empty when out of range.
    pub fn cell(&self, col: usize, row: usize) -> &[N] {
        if col >= self.cols || row >= self.rows {
            return &[];
        }
        &self.cells[row * self.cols + col]
    }

    /// Nominal area of a cell (edge cells also own what lies beyond the grid).
    pub fn cell_bounds(&self, col: usize, row: usize) -> Rect {
        #[allow(
            clippy::cast_precision_loss,
            reason = "Cell counts are far below 2^52."
        )]
        let (x0, y0) = (
            self.bounds.x0 + col as f64 * self.cell_w,
            self.bounds.y0 + row as f64 * self.cell_h,
        );
        Rect::new(x0, y0, x0 + self.cell_w, y0 + self.cell_h)
    }

    /// The cell a node is currently bucketed in.
    pub fn cell_of(&self, node: &N) -> Option<(usize, usize)> {
        self.locations
            .get(node)
            .map(|&slot| (slot % self.cols, slot / self.cols))
    }

    /// Candidate nodes for a region query: everything in the visible cells.
    ///
    /// Conservative: callers that need exact containment filter by position.
    pub fn nodes_in(&self, rect: Rect) -> impl Iterator<Item = &N> + '_ {
        self.visible_cells(rect)
            .into_iter()
            .flat_map(move |(col, row)| self.cell(col, row).iter())
    }

    /// Bucket a node at `p`, moving it if it was already present.
    pub fn insert(&mut self, node: N, p: Point) {
        self.relocate(node, p);
    }

    /// Incrementally move a node to the cell for `p`.
    ///
    /// Returns `true` when the node changed cells (or was newly added).
    pub fn relocate(&mut self, node: N, p: Point) -> bool {
        let slot = self.slot_for(p);
        match self.locations.get(&node).copied() {
            Some(old) if old == slot => false,
            Some(old) => {
                Self::take_from(&mut self.cells[old], &node);
                self.cells[slot].push(node.clone());
                self.locations.insert(node, slot);
                true
            }
            None => {
                self.cells[slot].push(node.clone());
                self.locations.insert(node, slot);
                true
            }
        }
    }

    /// Remove a node. Returns `false` if it was not indexed.
    pub fn remove(&mut self, node: &N) -> bool {
        let Some(slot) = self.locations.remove(node) else {
            return false;
        };
        Self::take_from(&mut self.cells[slot], node);
        true
    }

    fn slot_for(&self, p: Point) -> usize {
        let (col, row) = self.cell_indices(p.x, p.y);
        row * self.cols + col
    }

    fn take_from(cell: &mut Vec<N>, node: &N) {
        if let Some(pos) = cell.iter().position(|n| n == node) {
            cell.swap_remove(pos);
        }
    }
}

/// Floor of `(coord - origin) / cell`, clamped to `[0, count - 1]`.
///
/// NaN and everything left of the origin land in cell 0.
#[inline]
fn axis_index(coord: f64, origin: f64, cell: f64, count: usize) -> usize {
    let v = (coord - origin) / cell;
    if !(v > 0.0) {
        return 0;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Truncation of a positive value is floor; the cast saturates."
    )]
    let i = v as usize;
    i.min(count - 1)
}

/// Number of `cell`-sized steps needed to cover `extent` (at least one).
fn cells_along(extent: f64, cell: f64) -> usize {
    let q = extent / cell;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "The quotient is positive; the cast saturates."
    )]
    let n = q as usize;
    #[allow(clippy::cast_precision_loss, reason = "Cell counts are far below 2^52.")]
    let n = if (n as f64) < q { n + 1 } else { n };
    n.max(1)
}

impl<N: Debug> Debug for SpatialGrid<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let occupied = self.cells.iter().filter(|c| !c.is_empty()).count();
        f.debug_struct("SpatialGrid")
            .field("bounds", &self.bounds)
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("cell_w", &self.cell_w)
            .field("cell_h", &self.cell_h)
            .field("nodes", &self.locations.len())
            .field("occupied_cells", &occupied)
            .finish_non_exhaustive()
    }
}
