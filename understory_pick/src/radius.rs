// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index-free picking by scanning every node.

use kurbo::{Point, Rect};
use tracing::{debug, trace};
use understory_layout::{Graph, LayoutError, LayoutModel, PointModel};
use understory_spatial::geom::contains_point;

use crate::accessor::{GraphElementAccessor, improves, nearest_edge, place_all, radius_sq};

/// Attempts a scan gets before a query gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Picks by visiting every node and edge of the graph.
///
/// Reads live positions without taking a snapshot, so a relaxer keeps
/// running while the scan is in progress. If the positions are reset halfway
/// through, the scan starts over, up to [`max_attempts`](Self::max_attempts)
/// times, and then reports nothing found.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RadiusAccessor {
    max_attempts: usize,
}

impl Default for RadiusAccessor {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RadiusAccessor {
    /// Accessor that retries a disturbed scan up to `max_attempts` times in total.
    ///
    /// Zero is treated as one.
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Scans attempted per query.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    fn retrying<T>(&self, query: &'static str, mut scan: impl FnMut() -> Result<T, LayoutError>) -> Option<T> {
        for attempt in 1..=self.max_attempts {
            match scan() {
                Ok(found) => return Some(found),
                Err(LayoutError::ConcurrentMutation) => {
                    trace!(query, attempt, "positions changed during scan, retrying");
                }
                Err(error) => {
                    debug!(query, %error, "scan failed");
                    return None;
                }
            }
        }
        trace!(query, attempts = self.max_attempts, "giving up on a moving layout");
        None
    }
}

fn live_position<G: Graph, P: PointModel>(
    model: &LayoutModel<G, P>,
    node: &G::Node,
) -> Result<Point, LayoutError> {
    model
        .peek(node)
        .map(|p| p.to_2d())
        .ok_or(LayoutError::ConcurrentMutation)
}

fn scan_nearest<G: Graph, P: PointModel>(
    model: &LayoutModel<G, P>,
    point: Point,
    mut bound: f64,
) -> Result<Option<G::Node>, LayoutError> {
    place_all(model);
    let mut best = None;
    for node in model.graph().nodes() {
        if !model.is_pickable(&node) {
            continue;
        }
        let d2 = (live_position(model, &node)? - point).hypot2();
        if improves(d2, bound, best.is_some()) {
            bound = d2;
            best = Some(node);
        }
    }
    Ok(best)
}

fn scan_rect<G: Graph, P: PointModel>(
    model: &LayoutModel<G, P>,
    rect: Rect,
) -> Result<Vec<G::Node>, LayoutError> {
    place_all(model);
    let rect = rect.abs();
    let mut out = Vec::new();
    for node in model.graph().nodes() {
        if model.is_pickable(&node) && contains_point(&rect, live_position(model, &node)?) {
            out.push(node);
        }
    }
    Ok(out)
}

impl<G: Graph, P: PointModel> GraphElementAccessor<G, P> for RadiusAccessor {
    fn node_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Node> {
        let bound = radius_sq(max_distance)?;
        self.retrying("node_at", || scan_nearest(model, point, bound))
            .flatten()
    }

    fn nodes_in(&self, model: &LayoutModel<G, P>, rect: Rect) -> Vec<G::Node> {
        self.retrying("nodes_in", || scan_rect(model, rect))
            .unwrap_or_default()
    }

    fn edge_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Edge> {
        let bound = radius_sq(max_distance)?;
        self.retrying("edge_at", || {
            place_all(model);
            let graph = model.graph();
            nearest_edge(
                &**graph,
                graph.edges(),
                |n| model.peek(n).map(|p| p.to_2d()),
                point,
                bound,
            )
        })
        .flatten()
    }
}
