// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Picking against node shapes and edge segments stored in R-trees.

use core::hash::Hash;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};
use understory_layout::{Graph, LayoutError, LayoutModel, PointModel};
use understory_spatial::geom::{distance_sq_to_rect, distance_sq_to_segment};
use understory_spatial::{RTree, RTreeContext};

use crate::accessor::{GraphElementAccessor, improves, radius_sq};
use crate::cache::{IndexCache, Positions};

/// Default node shape: a 10 x 10 box centred on the node.
pub const DEFAULT_NODE_EXTENT: Size = Size::new(10.0, 10.0);

/// Node boxes and edge segments as of one model version.
#[derive(Debug)]
struct Shapes<N, E> {
    nodes: RTree<N>,
    edges: RTree<E>,
    segments: HashMap<E, (Point, Point)>,
}

/// Picks nodes by their drawn box and edges by their drawn segment.
///
/// A point inside one or more node boxes picks the first of them in R-tree
/// order, so overlapping shapes resolve the same way until the layout moves.
/// A point outside every box picks the box nearest to it within the radius.
///
/// Boxes are inserted in graph order, which makes that R-tree order
/// reproducible for a given layout.
#[derive(Debug)]
pub struct ShapeAccessor<N, E> {
    extent: Size,
    context: RTreeContext,
    cache: IndexCache<Shapes<N, E>, N>,
}

impl<N: Clone + Eq + Hash, E: Clone + Eq + Hash> Default for ShapeAccessor<N, E> {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_EXTENT, RTreeContext::default())
    }
}

impl<N: Clone + Eq + Hash, E: Clone + Eq + Hash> ShapeAccessor<N, E> {
    /// Accessor drawing nodes as `extent`-sized boxes, indexed with `context`.
    pub fn new(extent: Size, context: RTreeContext) -> Self {
        Self {
            extent,
            context,
            cache: IndexCache::default(),
        }
    }

    /// Size of a node's box.
    pub fn node_extent(&self) -> Size {
        self.extent
    }

    /// R-tree parameters used for both trees.
    pub fn context(&self) -> &RTreeContext {
        &self.context
    }

    /// Model version the shapes were last built at.
    pub fn built_version(&self) -> Option<u64> {
        self.cache.version()
    }

    /// Force a rebuild on the next query.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    fn build<G>(&self, graph: &G, positions: &Positions<N>) -> Shapes<N, E>
    where
        G: Graph<Node = N, Edge = E> + ?Sized,
    {
        let mut nodes = RTree::new();
        for n in graph.nodes() {
            if let Some(&p) = positions.get(&n) {
                nodes = nodes.add(&self.context, n, Rect::from_center_size(p, self.extent));
            }
        }
        let mut edges = RTree::new();
        let mut segments = HashMap::new();
        for e in graph.edges() {
            let Some((a, b)) = graph.endpoints(&e) else {
                continue;
            };
            let (Some(&a), Some(&b)) = (positions.get(&a), positions.get(&b)) else {
                continue;
            };
            edges = edges.add(&self.context, e.clone(), Rect::from_points(a, b));
            segments.insert(e, (a, b));
        }
        Shapes {
            nodes,
            edges,
            segments,
        }
    }

    fn query<G, P, R>(
        &self,
        model: &LayoutModel<G, P>,
        f: impl FnOnce(&Shapes<N, E>) -> R,
    ) -> Result<R, LayoutError>
    where
        G: Graph<Node = N, Edge = E>,
        P: PointModel,
    {
        let graph = model.graph();
        self.cache.query(
            model,
            |_, positions| Ok(self.build(&**graph, positions)),
            |shapes, _| f(shapes),
        )
    }
}

/// `point` grown by `radius` on every side.
fn search_box(point: Point, radius: f64) -> Rect {
    Rect::new(point.x - radius, point.y - radius, point.x + radius, point.y + radius)
}

fn pick_node<'a, N, E>(
    shapes: &'a Shapes<N, E>,
    point: Point,
    max_distance: f64,
    mut bound: f64,
    mut accept: impl FnMut(&N) -> bool,
) -> Option<&'a N> {
    if let Some(hit) = shapes.nodes.get_picked_object(point) {
        if accept(hit) {
            return Some(hit);
        }
        // The first box is excluded; look at the rest of the stack.
        if let Some((n, _)) = shapes
            .nodes
            .query_point(point)
            .into_iter()
            .find(|(n, _)| accept(*n))
        {
            return Some(n);
        }
    }
    let mut best = None;
    for (n, b) in shapes.nodes.query_rect(search_box(point, max_distance)) {
        let d2 = distance_sq_to_rect(&b, point);
        if improves(d2, bound, best.is_some()) && accept(n) {
            bound = d2;
            best = Some(n);
        }
    }
    best
}

impl<G, P> GraphElementAccessor<G, P> for ShapeAccessor<G::Node, G::Edge>
where
    G: Graph,
    P: PointModel,
{
    fn node_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Node> {
        let bound = radius_sq(max_distance)?;
        self.query(model, |shapes| {
            pick_node(shapes, point, max_distance, bound, |n| model.is_pickable(n)).cloned()
        })
        .ok()
        .flatten()
    }

    /// Pickable nodes whose box touches `rect`.
    fn nodes_in(&self, model: &LayoutModel<G, P>, rect: Rect) -> Vec<G::Node> {
        let rect = rect.abs();
        self.query(model, |shapes| {
            shapes
                .nodes
                .query_rect(rect)
                .into_iter()
                .map(|(n, _)| n)
                .filter(|n| model.is_pickable(n))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }

    fn edge_at(&self, model: &LayoutModel<G, P>, point: Point, max_distance: f64) -> Option<G::Edge> {
        let mut bound = radius_sq(max_distance)?;
        self.query(model, |shapes| {
            let mut best = None;
            for (e, _) in shapes.edges.query_rect(search_box(point, max_distance)) {
                let Some(&(a, b)) = shapes.segments.get(e) else {
                    continue;
                };
                let d2 = distance_sq_to_segment(a, b, point);
                if improves(d2, bound, best.is_some()) {
                    bound = d2;
                    best = Some(e);
                }
            }
            best.cloned()
        })
        .ok()
        .flatten()
    }
}
