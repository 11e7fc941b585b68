// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Picking through a point index rebuilt from layout snapshots.

use core::hash::Hash;

use kurbo::{Point, Rect};
use tracing::debug;
use understory_layout::{Graph, LayoutError, LayoutModel, PointModel};
use understory_spatial::geom::{contains_point, distance_sq_to_rect};
use understory_spatial::{QuadTree, QuadTreeConfig, SpatialGrid};

use crate::accessor::{GraphElementAccessor, improves, nearest_edge, radius_sq};
use crate::cache::{IndexCache, Positions};
use crate::radius::RadiusAccessor;

/// Picks through a [`SpatialGrid`] over the layout bounds.
///
/// The grid is rebuilt from a snapshot whenever the model version changes.
/// Nearest-node queries visit rings of cells outward from the query cell and
/// stop once no farther ring can hold a closer node.
#[derive(Debug)]
pub struct GridAccessor<N> {
    cols: usize,
    rows: usize,
    cache: IndexCache<SpatialGrid<N>, N>,
}

impl<N: Clone + Eq + Hash> GridAccessor<N> {
    /// Accessor over a `cols` x `rows` grid.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cache: IndexCache::default(),
        }
    }

    /// Grid dimensions as `(cols, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Model version the grid was last built at.
    pub fn built_version(&self) -> Option<u64> {
        self.cache.version()
    }

    /// Force a rebuild on the next query.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    fn query<G, P, R>(
        &self,
        model: &LayoutModel<G, P>,
        f: impl FnOnce(&SpatialGrid<N>, &Positions<N>) -> R,
    ) -> Result<R, LayoutError>
    where
        G: Graph<Node = N>,
        P: PointModel,
    {
        self.cache.query(
            model,
            |bounds, positions| {
                let mut grid = SpatialGrid::new(bounds, self.cols, self.rows)?;
                grid.build(positions);
                Ok(grid)
            },
            f,
        )
    }
}

/// Nominal cell rectangle, with edge cells reaching out to infinity since
/// they also own everything beyond the grid.
fn cell_reach<N: Clone + Eq + Hash>(grid: &SpatialGrid<N>, col: usize, row: usize) -> Rect {
    let r = grid.cell_bounds(col, row);
    Rect::new(
        if col == 0 { f64::NEG_INFINITY } else { r.x0 },
        if row == 0 { f64::NEG_INFINITY } else { r.y0 },
        if col + 1 == grid.cols() { f64::INFINITY } else { r.x1 },
        if row + 1 == grid.rows() { f64::INFINITY } else { r.y1 },
    )
}

/// Cells at Chebyshev distance `k` from `(col, row)`, clipped to the grid.
fn ring(col: usize, row: usize, k: usize, cols: usize, rows: usize) -> Vec<(usize, usize)> {
    if k == 0 {
        return vec![(col, row)];
    }
    let mut out = Vec::new();
    let span = col.saturating_sub(k)..=(col + k).min(cols - 1);
    for r in [row.checked_sub(k), Some(row + k)].into_iter().flatten() {
        if r < rows {
            out.extend(span.clone().map(|c| (c, r)));
        }
    }
    let sides = row.saturating_sub(k - 1)..=(row + k - 1).min(rows - 1);
    for c in [col.checked_sub(k), Some(col + k)].into_iter().flatten() {
        if c < cols {
            out.extend(sides.clone().map(|r| (c, r)));
        }
    }
    out
}

fn ring_search<'a, N: Clone + Eq + Hash>(
    grid: &'a SpatialGrid<N>,
    positions: &Positions<N>,
    point: Point,
    mut bound: f64,
    mut accept: impl FnMut(&N) -> bool,
) -> Option<&'a N> {
    let (col, row) = grid.cell_indices(point.x, point.y);
    let cell = grid.cell_bounds(0, 0);
    let step = cell.width().min(cell.height());
    // Ring distance bounds only hold when the query cell really contains the point.
    let inside = contains_point(&grid.bounds(), point);
    let mut best: Option<&N> = None;
    for k in 0..grid.cols().max(grid.rows()) {
        if inside && k > 0 {
            #[allow(clippy::cast_precision_loss, reason = "Ring counts are far below 2^52.")]
            let gap = (k - 1) as f64 * step;
            if gap * gap > bound {
                break;
            }
        }
        for (c, r) in ring(col, row, k, grid.cols(), grid.rows()) {
            if distance_sq_to_rect(&cell_reach(grid, c, r), point) > bound {
                continue;
            }
            for node in grid.cell(c, r) {
                let Some(p) = positions.get(node) else {
                    continue;
                };
                let d2 = (*p - point).hypot2();
                if improves(d2, bound, best.is_some()) && accept(node) {
                    bound = d2;
                    best = Some(node);
                }
            }
        }
    }
    best
}

impl<G, P> GraphElementAccessor<G, P> for GridAccessor<G::Node>
where
    G: Graph,
    P: PointModel,
{
    fn node_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Node> {
        let bound = radius_sq(max_distance)?;
        self.query(model, |grid, positions| {
            ring_search(grid, positions, point, bound, |n| model.is_pickable(n)).cloned()
        })
        .unwrap_or_else(|error| {
            debug!(%error, "grid unavailable, scanning");
            RadiusAccessor::default().node_at(model, point, max_distance)
        })
    }

    fn nodes_in(&self, model: &LayoutModel<G, P>, rect: Rect) -> Vec<G::Node> {
        let rect = rect.abs();
        self.query(model, |grid, positions| {
            grid.nodes_in(rect)
                .filter(|n| positions.get(*n).is_some_and(|p| contains_point(&rect, *p)))
                .filter(|n| model.is_pickable(n))
                .cloned()
                .collect()
        })
        .unwrap_or_else(|error| {
            debug!(%error, "grid unavailable, scanning");
            RadiusAccessor::default().nodes_in(model, rect)
        })
    }

    fn edge_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Edge> {
        let bound = radius_sq(max_distance)?;
        let graph = model.graph();
        self.query(model, |_, positions| {
            nearest_edge(&**graph, graph.edges(), |n| positions.get(n).copied(), point, bound)
        })
        .and_then(|found| found)
        .unwrap_or_else(|error| {
            debug!(%error, "grid unavailable, scanning");
            RadiusAccessor::default().edge_at(model, point, max_distance)
        })
    }
}

/// Picks through a [`QuadTree`] over the layout bounds.
///
/// The tree is rebuilt from a snapshot whenever the model version changes.
/// Nearest-node queries are best first: quadrants are visited closest first
/// and skipped once they cannot beat the best candidate.
#[derive(Debug)]
pub struct QuadTreeAccessor<N> {
    config: QuadTreeConfig,
    cache: IndexCache<QuadTree<N>, N>,
}

impl<N: Clone + Eq + Hash> Default for QuadTreeAccessor<N> {
    fn default() -> Self {
        Self::new(QuadTreeConfig::default())
    }
}

impl<N: Clone + Eq + Hash> QuadTreeAccessor<N> {
    /// Accessor splitting leaves per `config`.
    pub fn new(config: QuadTreeConfig) -> Self {
        Self {
            config,
            cache: IndexCache::default(),
        }
    }

    /// Split policy of the tree.
    pub fn config(&self) -> QuadTreeConfig {
        self.config
    }

    /// Model version the tree was last built at.
    pub fn built_version(&self) -> Option<u64> {
        self.cache.version()
    }

    /// Force a rebuild on the next query.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    fn query<G, P, R>(
        &self,
        model: &LayoutModel<G, P>,
        f: impl FnOnce(&QuadTree<N>, &Positions<N>) -> R,
    ) -> Result<R, LayoutError>
    where
        G: Graph<Node = N>,
        P: PointModel,
    {
        self.cache.query(
            model,
            |bounds, positions| {
                let mut tree = QuadTree::new(bounds, self.config)?;
                tree.build(positions);
                Ok(tree)
            },
            f,
        )
    }
}

impl<G, P> GraphElementAccessor<G, P> for QuadTreeAccessor<G::Node>
where
    G: Graph,
    P: PointModel,
{
    fn node_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Node> {
        radius_sq(max_distance)?;
        self.query(model, |tree, _| {
            tree.nearest_matching(point, max_distance, |n| model.is_pickable(n))
                .map(|(n, _)| n.clone())
        })
        .unwrap_or_else(|error| {
            debug!(%error, "quad tree unavailable, scanning");
            RadiusAccessor::default().node_at(model, point, max_distance)
        })
    }

    fn nodes_in(&self, model: &LayoutModel<G, P>, rect: Rect) -> Vec<G::Node> {
        let rect = rect.abs();
        self.query(model, |tree, _| {
            tree.visible_leaves(rect)
                .into_iter()
                .flat_map(|leaf| tree.leaf_members(leaf))
                .filter(|(n, p)| contains_point(&rect, *p) && model.is_pickable(n))
                .map(|(n, _)| n.clone())
                .collect()
        })
        .unwrap_or_else(|error| {
            debug!(%error, "quad tree unavailable, scanning");
            RadiusAccessor::default().nodes_in(model, rect)
        })
    }

    fn edge_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Edge> {
        let bound = radius_sq(max_distance)?;
        let graph = model.graph();
        self.query(model, |_, positions| {
            nearest_edge(&**graph, graph.edges(), |n| positions.get(n).copied(), point, bound)
        })
        .and_then(|found| found)
        .unwrap_or_else(|error| {
            debug!(%error, "quad tree unavailable, scanning");
            RadiusAccessor::default().edge_at(model, point, max_distance)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_cover_every_cell_once() {
        let (cols, rows) = (5, 3);
        for (col, row) in [(0, 0), (2, 1), (4, 2), (1, 0)] {
            let mut seen: Vec<_> = (0..cols.max(rows))
                .flat_map(|k| ring(col, row, k, cols, rows))
                .collect();
            let total = seen.len();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), total, "duplicate cell around {col},{row}");
            assert_eq!(total, cols * rows, "missing cells around {col},{row}");
        }
    }

    #[test]
    fn first_ring_is_the_neighbourhood() {
        let mut r = ring(1, 1, 1, 3, 3);
        r.sort_unstable();
        assert_eq!(
            r,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1), (2, 2)]
        );
    }

    #[test]
    fn ring_search_finds_a_node_beyond_the_grid() {
        let mut grid = SpatialGrid::new(Rect::new(0.0, 0.0, 100.0, 100.0), 10, 10).unwrap();
        let mut positions = Positions::new();
        positions.insert(1_u32, Point::new(150.0, 50.0));
        positions.insert(2, Point::new(5.0, 5.0));
        grid.build(&positions);
        let hit = ring_search(&grid, &positions, Point::new(95.0, 50.0), f64::INFINITY, |_| true);
        assert_eq!(hit, Some(&1));
        let hit = ring_search(&grid, &positions, Point::new(-50.0, -50.0), f64::INFINITY, |_| true);
        assert_eq!(hit, Some(&2));
    }
}
