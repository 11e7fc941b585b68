// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The picking contract and the pieces every accessor shares.

use kurbo::{Point, Rect};
use understory_layout::{Graph, LayoutError, LayoutModel, PointModel};
use understory_spatial::geom::distance_sq_to_segment;

/// Search radius used by [`GraphElementAccessor::node`].
///
/// `sqrt(f64::MAX - f64::EPSILON)`: the largest radius whose square is still
/// finite, so every node at a finite position is in range.
pub const DEFAULT_MAX_DISTANCE: f64 = 1.340_780_792_994_259_6e154;

/// Answers "which node or edge is near this point" against a layout model.
///
/// Queries never fail. A point far from everything, an unusable radius, or a
/// layout that keeps changing underneath the search all come back as "nothing
/// found". Nodes that are not pickable are skipped by every method.
pub trait GraphElementAccessor<G: Graph, P: PointModel> {
    /// Closest pickable node to `point` no farther than `max_distance`.
    ///
    /// The distance is measured in the `z = 0` plane. A negative or NaN
    /// `max_distance` finds nothing.
    fn node_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Node>;

    /// Closest pickable node to `point` at any distance.
    fn node(&self, model: &LayoutModel<G, P>, point: Point) -> Option<G::Node> {
        self.node_at(model, point, DEFAULT_MAX_DISTANCE)
    }

    /// Pickable nodes that fall in `rect`, boundary included.
    fn nodes_in(&self, model: &LayoutModel<G, P>, rect: Rect) -> Vec<G::Node>;

    /// Closest edge to `point` no farther than `max_distance`, measured to the
    /// segment between its endpoints.
    fn edge_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Edge>;
}

/// Square of a usable search radius; `None` for negative or NaN radii.
pub(crate) fn radius_sq(max_distance: f64) -> Option<f64> {
    (max_distance >= 0.0).then(|| max_distance * max_distance)
}

/// Whether a candidate at `d2` replaces the current best under `bound`.
///
/// The first candidate may sit exactly on the radius; later ones must be
/// strictly closer, so ties keep the earliest.
#[inline]
pub(crate) fn improves(d2: f64, bound: f64, have_best: bool) -> bool {
    if have_best { d2 < bound } else { d2 <= bound }
}

/// Give every node a position, so a scan never meets an unplaced node.
pub(crate) fn place_all<G: Graph, P: PointModel>(model: &LayoutModel<G, P>) {
    if model.len() < model.graph().node_count() {
        model.snapshot();
    }
}

/// Closest of `edges` to `point` within `bound` (squared).
///
/// `position` looks up an endpoint; a missing endpoint means the positions
/// moved under the scan and is reported as [`LayoutError::ConcurrentMutation`].
/// Edges the graph does not know are skipped.
pub(crate) fn nearest_edge<G: Graph>(
    graph: &G,
    edges: impl IntoIterator<Item = G::Edge>,
    mut position: impl FnMut(&G::Node) -> Option<Point>,
    point: Point,
    mut bound: f64,
) -> Result<Option<G::Edge>, LayoutError> {
    let mut best = None;
    for edge in edges {
        let Some((a, b)) = graph.endpoints(&edge) else {
            continue;
        };
        let a = position(&a).ok_or(LayoutError::ConcurrentMutation)?;
        let b = position(&b).ok_or(LayoutError::ConcurrentMutation)?;
        let d2 = distance_sq_to_segment(a, b, point);
        if improves(d2, bound, best.is_some()) {
            bound = d2;
            best = Some(edge);
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_radius_is_the_largest_finite_one() {
        assert_eq!(DEFAULT_MAX_DISTANCE, (f64::MAX - f64::EPSILON).sqrt());
        assert!(radius_sq(DEFAULT_MAX_DISTANCE).is_some_and(f64::is_finite));
    }

    #[test]
    fn unusable_radii_find_nothing() {
        assert_eq!(radius_sq(-1.0), None);
        assert_eq!(radius_sq(f64::NAN), None);
        assert_eq!(radius_sq(0.0), Some(0.0));
        assert_eq!(radius_sq(3.0), Some(9.0));
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        assert!(improves(4.0, 4.0, false));
        assert!(!improves(4.0, 4.0, true));
        assert!(improves(3.0, 4.0, true));
    }
}
