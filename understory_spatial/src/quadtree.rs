// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point quad tree over node positions.
//!
//! Every inner node splits its rectangle at the centre into four quadrants,
//! numbered 0 top-left, 1 top-right, 2 bottom-left, 3 bottom-right (y grows
//! downward). A point lying exactly on a split line belongs to the
//! lower-numbered quadrant, so the quadrants partition the parent without
//! overlap and the descent for any point is unique.
//!
//! Points outside the root rectangle are routed by the same comparisons and end
//! up in the nearest edge leaf; queries treat edge leaves as extending to
//! infinity so such nodes are never lost.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::error::SpatialError;
use crate::geom::{area, cmp_f64, distance_sq_to_rect, overlaps};
use crate::positions::NodePositions;

/// Split parameters for a [`QuadTree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QuadTreeConfig {
    /// A leaf splits once it holds more than this many nodes.
    pub split_threshold: usize,
    /// Leaves at this depth never split, however full.
    pub max_depth: u8,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            split_threshold: 8,
            max_depth: 12,
        }
    }
}

impl QuadTreeConfig {
    /// Check that the configuration can build a tree.
    pub fn validate(&self) -> Result<(), SpatialError> {
        if self.split_threshold == 0 {
            return Err(SpatialError::InvalidArgument {
                what: "quad-tree split threshold must be at least 1",
            });
        }
        Ok(())
    }
}

/// Handle to a quad-tree leaf.
///
/// Two queries that land in the same leaf return equal handles. A handle goes
/// stale when its leaf splits; stale handles report no members.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LeafId(usize);

impl LeafId {
    /// Arena position of the leaf, useful for debugging output.
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
enum Slot<N> {
    Leaf(Vec<(N, Point)>),
    Inner([usize; 4]),
}

#[derive(Clone, Debug)]
struct QuadNode<N> {
    rect: Rect,
    depth: u8,
    slot: Slot<N>,
}

impl<N> QuadNode<N> {
    fn leaf(rect: Rect, depth: u8) -> Self {
        Self {
            rect,
            depth,
            slot: Slot::Leaf(Vec::new()),
        }
    }
}

/// A deterministic point quad tree keyed by node.
///
/// The tree records the position each node had when it was inserted; use
/// [`relocate`](Self::relocate) or [`build`](Self::build) to catch up with a
/// moving layout.
pub struct QuadTree<N> {
    config: QuadTreeConfig,
    arena: Vec<QuadNode<N>>,
    locations: HashMap<N, usize>,
}

impl<N: Clone + Eq + Hash> QuadTree<N> {
    /// Create an empty tree over `bounds`.
    pub fn new(bounds: Rect, config: QuadTreeConfig) -> Result<Self, SpatialError> {
        config.validate()?;
        let bounds = bounds.abs();
        if !(bounds.width() > 0.0 && bounds.height() > 0.0) {
            return Err(SpatialError::InvalidArgument {
                what: "quad-tree bounds must have a positive width and height",
            });
        }
        Ok(Self {
            config,
            arena: vec![QuadNode::leaf(bounds, 0)],
            locations: HashMap::new(),
        })
    }

    /// Root rectangle.
    pub fn bounds(&self) -> Rect {
        self.arena[0].rect
    }

    /// Split parameters.
    pub fn config(&self) -> QuadTreeConfig {
        self.config
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.arena
            .iter()
            .filter(|n| matches!(n.slot, Slot::Leaf(_)))
            .count()
    }

    /// Depth of the deepest leaf (a lone root leaf has depth 0).
    pub fn depth(&self) -> u8 {
        self.arena.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Drop every node and collapse back to a single root leaf.
    pub fn clear(&mut self) {
        let bounds = self.bounds();
        self.arena.clear();
        self.arena.push(QuadNode::leaf(bounds, 0));
        self.locations.clear();
    }

    /// Rebuild from scratch using the current positions.
    pub fn build<S: NodePositions<N> + ?Sized>(&mut self, positions: &S) {
        self.clear();
        positions.for_each_position(&mut |node, p| self.insert(node.clone(), p));
        tracing::debug!(
            nodes = self.locations.len(),
            leaves = self.leaf_count(),
            depth = self.depth(),
            "rebuilt quad tree"
        );
    }

    /// Insert `node` at `p`, splitting the receiving leaf if it overflows.
    ///
    /// A node that is already present is moved instead.
    pub fn insert(&mut self, node: N, p: Point) {
        if self.locations.contains_key(&node) {
            self.remove(&node);
        }
        let leaf = self.descend(p);
        if let Slot::Leaf(members) = &mut self.arena[leaf].slot {
            members.push((node.clone(), p));
        }
        self.locations.insert(node, leaf);
        self.split_overflowing(leaf);
    }

    /// Insert `node` at the position `positions` reports for it.
    ///
    /// Returns the leaf it landed in, or `None` if the position is unknown.
    pub fn insert_from<S: NodePositions<N> + ?Sized>(
        &mut self,
        node: N,
        positions: &S,
    ) -> Option<LeafId> {
        let p = positions.position_of(&node)?;
        self.insert(node.clone(), p);
        self.leaf_of(&node)
    }

    /// Remove a node. Returns `false` if it was not indexed.
    ///
    /// Leaves are not merged back; an emptied subtree stays until the next
    /// [`clear`](Self::clear) or [`build`](Self::build).
    pub fn remove(&mut self, node: &N) -> bool {
        let Some(leaf) = self.locations.remove(node) else {
            return false;
        };
        if let Slot::Leaf(members) = &mut self.arena[leaf].slot
            && let Some(pos) = members.iter().position(|(n, _)| n == node)
        {
            members.swap_remove(pos);
        }
        true
    }

    /// Move a node to `p`, updating the recorded point in place when it stays
    /// in the same leaf.
    pub fn relocate(&mut self, node: N, p: Point) {
        let target = self.descend(p);
        if self.locations.get(&node) == Some(&target)
            && let Slot::Leaf(members) = &mut self.arena[target].slot
            && let Some(entry) = members.iter_mut().find(|(n, _)| *n == node)
        {
            entry.1 = p;
            return;
        }
        self.insert(node, p);
    }

    /// The leaf whose quadrant contains `p`.
    pub fn containing_leaf(&self, p: Point) -> LeafId {
        LeafId(self.descend(p))
    }

    /// The leaf whose quadrant contains the node's current position.
    ///
    /// For a node whose position is `p`, this is always
    /// `containing_leaf(p)`; the node does not even have to be indexed.
    pub fn containing_leaf_of<S: NodePositions<N> + ?Sized>(
        &self,
        node: &N,
        positions: &S,
    ) -> Option<LeafId> {
        positions
            .position_of(node)
            .map(|p| self.containing_leaf(p))
    }

    /// The leaf the node was filed under when last inserted or relocated.
    pub fn leaf_of(&self, node: &N) -> Option<LeafId> {
        self.locations.get(node).copied().map(LeafId)
    }

    /// Nodes stored in a leaf with their recorded positions.
    pub fn leaf_members(&self, leaf: LeafId) -> &[(N, Point)] {
        match self.arena.get(leaf.0).map(|n| &n.slot) {
            Some(Slot::Leaf(members)) => members,
            _ => &[],
        }
    }

    /// Quadrant rectangle of a leaf.
    pub fn leaf_bounds(&self, leaf: LeafId) -> Option<Rect> {
        self.arena.get(leaf.0).map(|n| n.rect)
    }

    /// Leaves whose region intersects `rect`, in depth-first quadrant order.
    pub fn visible_leaves(&self, rect: Rect) -> Vec<LeafId> {
        let rect = rect.abs();
        let mut out = Vec::new();
        let mut stack = vec![0_usize];
        while let Some(i) = stack.pop() {
            let node = &self.arena[i];
            if !overlaps(&self.reach(node.rect), &rect) {
                continue;
            }
            match &node.slot {
                Slot::Leaf(_) => out.push(LeafId(i)),
                Slot::Inner(children) => stack.extend(children.iter().rev().copied()),
            }
        }
        out
    }

    /// Closest indexed node to `p` within `max_distance`.
    pub fn nearest(&self, p: Point, max_distance: f64) -> Option<(&N, Point)> {
        self.nearest_matching(p, max_distance, |_| true)
    }

    /// Closest indexed node to `p` within `max_distance` that `accept` admits.
    ///
    /// Subtrees are visited nearest-first and skipped once they cannot beat
    /// the best candidate. Ties keep the first node found. A negative or NaN
    /// `max_distance` finds nothing.
    pub fn nearest_matching(
        &self,
        p: Point,
        max_distance: f64,
        mut accept: impl FnMut(&N) -> bool,
    ) -> Option<(&N, Point)> {
        if max_distance.is_nan() || max_distance < 0.0 {
            return None;
        }
        let mut bound = max_distance * max_distance;
        let mut best: Option<(&N, Point)> = None;
        let mut stack = vec![0_usize];
        while let Some(i) = stack.pop() {
            let node = &self.arena[i];
            if distance_sq_to_rect(&self.reach(node.rect), p) > bound {
                continue;
            }
            match &node.slot {
                Slot::Leaf(members) => {
                    for (n, q) in members {
                        let d2 = (*q - p).hypot2();
                        let better = match best {
                            Some(_) => d2 < bound,
                            None => d2 <= bound,
                        };
                        if better && accept(n) {
                            bound = d2;
                            best = Some((n, *q));
                        }
                    }
                }
                Slot::Inner(children) => {
                    let mut order = *children;
                    // Farthest first on the stack so the nearest pops next.
                    order.sort_by(|&a, &b| {
                        cmp_f64(
                            distance_sq_to_rect(&self.reach(self.arena[b].rect), p),
                            distance_sq_to_rect(&self.reach(self.arena[a].rect), p),
                        )
                    });
                    stack.extend(order);
                }
            }
        }
        best
    }

    /// Verify that every inner node is exactly partitioned by its children and
    /// that every node is filed in the leaf recorded for it.
    pub fn check_invariants(&self) -> Result<(), SpatialError> {
        for node in &self.arena {
            let Slot::Inner(children) = &node.slot else {
                continue;
            };
            let parent = node.rect;
            let quads = children.map(|c| self.arena[c].rect);
            if !partitions(&parent, &quads) {
                return Err(SpatialError::QuadrantPartition {
                    depth: usize::from(node.depth),
                    parent,
                });
            }
        }
        for (node, &leaf) in &self.locations {
            let filed = match &self.arena[leaf].slot {
                Slot::Leaf(members) => members.iter().any(|(n, _)| n == node),
                Slot::Inner(_) => false,
            };
            if !filed {
                return Err(SpatialError::InvalidArgument {
                    what: "node is not filed in its recorded leaf",
                });
            }
        }
        Ok(())
    }

    fn descend(&self, p: Point) -> usize {
        let mut i = 0;
        loop {
            let node = &self.arena[i];
            match &node.slot {
                Slot::Leaf(_) => return i,
                Slot::Inner(children) => i = children[quadrant(&node.rect, p)],
            }
        }
    }

    /// Node rectangle with every edge shared with the root pushed to infinity.
    fn reach(&self, r: Rect) -> Rect {
        let root = self.arena[0].rect;
        Rect::new(
            if r.x0 <= root.x0 { f64::NEG_INFINITY } else { r.x0 },
            if r.y0 <= root.y0 { f64::NEG_INFINITY } else { r.y0 },
            if r.x1 >= root.x1 { f64::INFINITY } else { r.x1 },
            if r.y1 >= root.y1 { f64::INFINITY } else { r.y1 },
        )
    }

    /// Split `start` if it overflows, then re-check each new quadrant, one level
    /// at a time, until nothing overflows or the depth limit is hit.
    fn split_overflowing(&mut self, start: usize) {
        let mut pending = vec![start];
        while let Some(i) = pending.pop() {
            let (rect, depth) = (self.arena[i].rect, self.arena[i].depth);
            let overflowing = match &self.arena[i].slot {
                Slot::Leaf(members) => members.len() > self.config.split_threshold,
                Slot::Inner(_) => false,
            };
            if !overflowing || depth >= self.config.max_depth {
                continue;
            }
            let members = match core::mem::replace(&mut self.arena[i].slot, Slot::Inner([0; 4])) {
                Slot::Leaf(members) => members,
                inner => {
                    self.arena[i].slot = inner;
                    continue;
                }
            };
            let quads = quadrants(&rect);
            debug_assert!(
                partitions(&rect, &quads),
                "quadrants must partition their parent"
            );
            let base = self.arena.len();
            for q in quads {
                self.arena.push(QuadNode::leaf(q, depth + 1));
            }
            for (node, p) in members {
                let child = base + quadrant(&rect, p);
                self.locations.insert(node.clone(), child);
                if let Slot::Leaf(m) = &mut self.arena[child].slot {
                    m.push((node, p));
                }
            }
            self.arena[i].slot = Slot::Inner([base, base + 1, base + 2, base + 3]);
            tracing::trace!(depth, leaf = i, "split quad-tree leaf");
            pending.extend(base..base + 4);
        }
    }
}

/// Quadrant of `rect` that owns `p`; split lines go to the lower index.
#[inline]
fn quadrant(rect: &Rect, p: Point) -> usize {
    let c = rect.center();
    usize::from(p.x > c.x) + 2 * usize::from(p.y > c.y)
}

fn quadrants(r: &Rect) -> [Rect; 4] {
    let c = r.center();
    [
        Rect::new(r.x0, r.y0, c.x, c.y),
        Rect::new(c.x, r.y0, r.x1, c.y),
        Rect::new(r.x0, c.y, c.x, r.y1),
        Rect::new(c.x, c.y, r.x1, r.y1),
    ]
}

/// Child areas sum to the parent's, no two children overlap with positive
/// area, and together they span the parent.
fn partitions(parent: &Rect, quads: &[Rect; 4]) -> bool {
    let eps = 1e-9 * area(parent).max(1.0);
    let sum: f64 = quads.iter().map(area).sum();
    if sum - area(parent) > eps || area(parent) - sum > eps {
        return false;
    }
    for (i, a) in quads.iter().enumerate() {
        for b in &quads[i + 1..] {
            if area(&a.intersect(*b)) > eps {
                return false;
            }
        }
    }
    let span = quads[1..].iter().fold(quads[0], |acc, q| acc.union(*q));
    crate::geom::approx_eq(&span, parent, eps)
}

impl<N: Debug> Debug for QuadTree<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let leaves = self
            .arena
            .iter()
            .filter(|n| matches!(n.slot, Slot::Leaf(_)))
            .count();
        f.debug_struct("QuadTree")
            .field("bounds", &self.arena[0].rect)
            .field("config", &self.config)
            .field("nodes", &self.locations.len())
            .field("arena_nodes", &self.arena.len())
            .field("leaves", &leaves)
            .finish_non_exhaustive()
    }
}
