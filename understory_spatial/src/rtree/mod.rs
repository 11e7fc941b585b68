// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persistent R-tree over `(key, bounding box)` pairs.
//!
//! Every mutation returns a new [`RTree`] and leaves the receiver untouched.
//! Nodes are shared through [`Arc`], so `add` and `remove` only copy the path
//! from the root to the touched leaf; everything else is shared with the
//! previous version. Old versions stay valid and can be queried from other
//! threads while a new one is being built.
//!
//! Leaves hold up to `M` entries and inner nodes up to `M` children, where `M`
//! comes from the [`RTreeContext`] passed to [`RTree::add`]. An overflowing
//! node is split by the context's [`Splitter`]; a split root grows the tree by
//! one level. Every node stores the exact union of its children, which is what
//! [`RTree::get_picked_object`] prunes on.
//!
//! Removal prunes emptied nodes and collapses an inner root with a single
//! child. Sparse nodes are not merged: the tree stays balanced and its bounds
//! stay tight, which is all queries rely on.

mod split;

pub use split::{SplitStrategy, Splitter};

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::{Point, Rect};

use crate::error::SpatialError;
use crate::geom::{approx_eq, area, contains_point, contains_rect, enlargement, overlaps, union_all};

/// Tolerance used by [`RTree::check_invariants`] when comparing stored bounds
/// to the union of a node's children.
pub const BOUNDS_EPSILON: f64 = 0.001;

/// Capacity and splitting policy for [`RTree`] mutations.
///
/// The context is passed to each [`RTree::add`] rather than stored in the tree,
/// so one tree value can be grown under different policies.
#[derive(Clone, Debug, PartialEq)]
pub struct RTreeContext<L = SplitStrategy, I = SplitStrategy> {
    max_entries: usize,
    min_entries: usize,
    leaf_splitter: L,
    inner_splitter: I,
}

impl Default for RTreeContext {
    fn default() -> Self {
        Self {
            max_entries: 8,
            min_entries: 3,
            leaf_splitter: SplitStrategy::default(),
            inner_splitter: SplitStrategy::default(),
        }
    }
}

impl RTreeContext {
    /// Capacity `M = max_entries` and minimum fill `m = min_entries` with the
    /// default quadratic split at both levels.
    ///
    /// Requires `M >= 2` and `1 <= m <= M / 2`.
    pub fn new(max_entries: usize, min_entries: usize) -> Result<Self, SpatialError> {
        Self::with_splitters(
            max_entries,
            min_entries,
            SplitStrategy::default(),
            SplitStrategy::default(),
        )
    }

    /// Default capacities with `strategy` used for leaves and inner nodes.
    pub fn with_strategy(strategy: SplitStrategy) -> Self {
        Self {
            leaf_splitter: strategy,
            inner_splitter: strategy,
            ..Self::default()
        }
    }
}

impl<L: Splitter, I: Splitter> RTreeContext<L, I> {
    /// Fully custom context.
    pub fn with_splitters(
        max_entries: usize,
        min_entries: usize,
        leaf_splitter: L,
        inner_splitter: I,
    ) -> Result<Self, SpatialError> {
        if max_entries < 2 {
            return Err(SpatialError::InvalidArgument {
                what: "R-tree capacity must be at least 2",
            });
        }
        if min_entries == 0 || min_entries > max_entries / 2 {
            return Err(SpatialError::InvalidArgument {
                what: "R-tree minimum fill must lie in 1..=capacity/2",
            });
        }
        Ok(Self {
            max_entries,
            min_entries,
            leaf_splitter,
            inner_splitter,
        })
    }

    /// Node capacity `M`.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Minimum fill `m` of each half after a split.
    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    /// Splitter applied to overflowing leaves.
    pub fn leaf_splitter(&self) -> &L {
        &self.leaf_splitter
    }

    /// Splitter applied to overflowing inner nodes.
    pub fn inner_splitter(&self) -> &I {
        &self.inner_splitter
    }
}

enum RNode<K> {
    Leaf {
        bounds: Rect,
        entries: Vec<(K, Rect)>,
    },
    Inner {
        bounds: Rect,
        children: Vec<Arc<RNode<K>>>,
    },
}

impl<K> RNode<K> {
    fn leaf(entries: Vec<(K, Rect)>) -> Arc<Self> {
        let bounds = union_all(entries.iter().map(|(_, b)| *b)).unwrap_or(Rect::ZERO);
        Arc::new(Self::Leaf { bounds, entries })
    }

    fn inner(children: Vec<Arc<Self>>) -> Arc<Self> {
        let bounds = union_all(children.iter().map(|c| c.bounds())).unwrap_or(Rect::ZERO);
        Arc::new(Self::Inner { bounds, children })
    }

    fn bounds(&self) -> Rect {
        match self {
            Self::Leaf { bounds, .. } | Self::Inner { bounds, .. } => *bounds,
        }
    }
}

enum Inserted<K> {
    One(Arc<RNode<K>>),
    Split(Arc<RNode<K>>, Arc<RNode<K>>),
}

enum Removed<K> {
    NotFound,
    Emptied,
    Shrunk(Arc<RNode<K>>),
}

/// A persistent R-tree. Cloning is O(1).
pub struct RTree<K> {
    root: Option<Arc<RNode<K>>>,
    len: usize,
}

impl<K> Clone for RTree<K> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            len: self.len,
        }
    }
}

impl<K> Default for RTree<K> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<K: Debug> Debug for RTree<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RTree")
            .field("len", &self.len)
            .field("height", &self.height())
            .field("bounds", &self.bounds())
            .finish_non_exhaustive()
    }
}

impl<K> RTree<K> {
    /// The empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, maintained incrementally.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of entries, counted by walking every leaf.
    ///
    /// Always equal to [`RTree::len`]; kept for callers that want the count
    /// derived from structure.
    pub fn count(&self) -> usize {
        let mut total = 0;
        let mut stack: Vec<&RNode<K>> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            match node {
                RNode::Leaf { entries, .. } => total += entries.len(),
                RNode::Inner { children, .. } => stack.extend(children.iter().map(|c| &**c)),
            }
        }
        total
    }

    /// Union of every entry's box, or `None` when empty.
    pub fn bounds(&self) -> Option<Rect> {
        self.root.as_ref().map(|r| r.bounds())
    }

    /// Number of levels; 0 for the empty tree, 1 for a single leaf.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self.root.as_deref();
        while let Some(n) = node {
            height += 1;
            node = match n {
                RNode::Leaf { .. } => None,
                RNode::Inner { children, .. } => children.first().map(|c| &**c),
            };
        }
        height
    }

    /// Key of the first entry whose box contains `point` (closed on all sides).
    ///
    /// Children are visited depth first in stored order and entries within a
    /// leaf in stored order; the first hit wins. Stored order follows insertion
    /// and split history, so overlapping entries resolve the same way for the
    /// same tree value.
    pub fn get_picked_object(&self, point: Point) -> Option<&K> {
        let mut stack: Vec<&RNode<K>> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            if !contains_point(&node.bounds(), point) {
                continue;
            }
            match node {
                RNode::Leaf { entries, .. } => {
                    if let Some((k, _)) = entries.iter().find(|(_, b)| contains_point(b, point)) {
                        return Some(k);
                    }
                }
                // Reversed so the first child is popped first.
                RNode::Inner { children, .. } => stack.extend(children.iter().rev().map(|c| &**c)),
            }
        }
        None
    }

    /// Every entry whose box contains `point`, in pick order.
    pub fn query_point(&self, point: Point) -> Vec<(&K, Rect)> {
        self.collect_where(|b| contains_point(b, point))
    }

    /// Every entry whose box overlaps `rect` (closed), for render culling.
    pub fn query_rect(&self, rect: Rect) -> Vec<(&K, Rect)> {
        self.collect_where(|b| overlaps(b, &rect))
    }

    fn collect_where(&self, hit: impl Fn(&Rect) -> bool) -> Vec<(&K, Rect)> {
        let mut out = Vec::new();
        let mut stack: Vec<&RNode<K>> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            if !hit(&node.bounds()) {
                continue;
            }
            match node {
                RNode::Leaf { entries, .. } => {
                    out.extend(entries.iter().filter(|(_, b)| hit(b)).map(|(k, b)| (k, *b)));
                }
                RNode::Inner { children, .. } => stack.extend(children.iter().rev().map(|c| &**c)),
            }
        }
        out
    }

    /// All entries in depth-first order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            stack: self.root.as_deref().into_iter().collect(),
            leaf: [].iter(),
        }
    }

    /// Verify the structural invariants under `ctx`:
    /// every node's bounds equal the union of its children within
    /// [`BOUNDS_EPSILON`], all leaves sit at the same depth, and no node holds
    /// more than `M` items.
    pub fn check_invariants<L, I>(&self, ctx: &RTreeContext<L, I>) -> Result<(), SpatialError> {
        let Some(root) = self.root.as_deref() else {
            return Ok(());
        };
        let mut leaf_depth = None;
        let mut stack = vec![(root, 0_usize)];
        while let Some((node, depth)) = stack.pop() {
            let (expected, len) = match node {
                RNode::Leaf { entries, .. } => {
                    match leaf_depth {
                        None => leaf_depth = Some(depth),
                        Some(expected) if expected != depth => {
                            return Err(SpatialError::Unbalanced {
                                expected,
                                found: depth,
                            });
                        }
                        Some(_) => {}
                    }
                    (union_all(entries.iter().map(|(_, b)| *b)), entries.len())
                }
                RNode::Inner { children, .. } => {
                    stack.extend(children.iter().map(|c| (&**c, depth + 1)));
                    (union_all(children.iter().map(|c| c.bounds())), children.len())
                }
            };
            if len > ctx.max_entries {
                return Err(SpatialError::Overfull {
                    depth,
                    len,
                    capacity: ctx.max_entries,
                });
            }
            let expected = expected.unwrap_or(Rect::ZERO);
            if len == 0 || !approx_eq(&expected, &node.bounds(), BOUNDS_EPSILON) {
                return Err(SpatialError::BoundsMismatch {
                    depth,
                    expected,
                    actual: node.bounds(),
                });
            }
        }
        Ok(())
    }
}

impl<K: Clone> RTree<K> {
    /// A new tree with `(key, bbox)` added.
    ///
    /// Keys are not deduplicated: adding a key twice stores two entries.
    #[must_use]
    pub fn add<L: Splitter, I: Splitter>(&self, ctx: &RTreeContext<L, I>, key: K, bbox: Rect) -> Self {
        let root = match self.root.as_deref() {
            None => RNode::leaf(vec![(key, bbox)]),
            Some(root) => match insert(root, ctx, key, bbox) {
                Inserted::One(node) => node,
                Inserted::Split(a, b) => RNode::inner(vec![a, b]),
            },
        };
        Self {
            root: Some(root),
            len: self.len + 1,
        }
    }
}

impl<K: Clone + PartialEq> RTree<K> {
    /// A new tree without the first entry stored under `key`.
    ///
    /// Searches every subtree; use [`RTree::remove_with_bounds`] when the
    /// entry's box is known. Returns an unchanged clone when `key` is absent.
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        self.remove_impl(key, None)
    }

    /// Like [`RTree::remove`], descending only into nodes whose bounds contain
    /// `bbox`.
    #[must_use]
    pub fn remove_with_bounds(&self, key: &K, bbox: Rect) -> Self {
        self.remove_impl(key, Some(&bbox))
    }

    /// Whether an entry is stored under `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.iter().any(|(k, _)| k == key)
    }

    fn remove_impl(&self, key: &K, hint: Option<&Rect>) -> Self {
        let Some(root) = self.root.as_deref() else {
            return self.clone();
        };
        match remove_from(root, key, hint) {
            Removed::NotFound => self.clone(),
            Removed::Emptied => Self::default(),
            Removed::Shrunk(mut node) => {
                // Collapse inner roots with a single child.
                while let RNode::Inner { children, .. } = &*node {
                    if children.len() != 1 {
                        break;
                    }
                    let only = children[0].clone();
                    node = only;
                }
                Self {
                    root: Some(node),
                    len: self.len - 1,
                }
            }
        }
    }
}

/// Least enlargement, then smaller resulting area, then lowest index.
fn choose_subtree<K>(children: &[Arc<RNode<K>>], bbox: &Rect) -> usize {
    let mut best = 0;
    let mut best_cost = (f64::INFINITY, f64::INFINITY);
    for (i, child) in children.iter().enumerate() {
        let b = child.bounds();
        let cost = (enlargement(&b, bbox), area(&b.union(*bbox)));
        if cost.0 < best_cost.0 || (cost.0 == best_cost.0 && cost.1 < best_cost.1) {
            best = i;
            best_cost = cost;
        }
    }
    best
}

fn insert<K: Clone, L: Splitter, I: Splitter>(
    node: &RNode<K>,
    ctx: &RTreeContext<L, I>,
    key: K,
    bbox: Rect,
) -> Inserted<K> {
    match node {
        RNode::Leaf { bounds, entries } => {
            let mut entries = entries.clone();
            entries.push((key, bbox));
            if entries.len() <= ctx.max_entries {
                return Inserted::One(Arc::new(RNode::Leaf {
                    bounds: bounds.union(bbox),
                    entries,
                }));
            }
            let (a, b) = ctx
                .leaf_splitter
                .split(entries, ctx.min_entries, &|e: &(K, Rect)| e.1);
            Inserted::Split(RNode::leaf(a), RNode::leaf(b))
        }
        RNode::Inner { children, .. } => {
            let idx = choose_subtree(children, &bbox);
            let mut children = children.clone();
            match insert(&children[idx], ctx, key, bbox) {
                Inserted::One(child) => children[idx] = child,
                Inserted::Split(a, b) => {
                    children[idx] = a;
                    children.insert(idx + 1, b);
                }
            }
            if children.len() <= ctx.max_entries {
                return Inserted::One(RNode::inner(children));
            }
            let (a, b) = ctx
                .inner_splitter
                .split(children, ctx.min_entries, &|c: &Arc<RNode<K>>| c.bounds());
            Inserted::Split(RNode::inner(a), RNode::inner(b))
        }
    }
}

fn remove_from<K: Clone + PartialEq>(node: &RNode<K>, key: &K, hint: Option<&Rect>) -> Removed<K> {
    match node {
        RNode::Leaf { entries, .. } => {
            let Some(pos) = entries
                .iter()
                .position(|(k, b)| k == key && hint.is_none_or(|h| contains_rect(b, h)))
            else {
                return Removed::NotFound;
            };
            if entries.len() == 1 {
                return Removed::Emptied;
            }
            let mut entries = entries.clone();
            entries.remove(pos);
            Removed::Shrunk(RNode::leaf(entries))
        }
        RNode::Inner { children, .. } => {
            for (i, child) in children.iter().enumerate() {
                if hint.is_some_and(|h| !contains_rect(&child.bounds(), h)) {
                    continue;
                }
                match remove_from(child, key, hint) {
                    Removed::NotFound => {}
                    Removed::Emptied if children.len() == 1 => return Removed::Emptied,
                    Removed::Emptied => {
                        let mut children = children.clone();
                        children.remove(i);
                        return Removed::Shrunk(RNode::inner(children));
                    }
                    Removed::Shrunk(replacement) => {
                        let mut children = children.clone();
                        children[i] = replacement;
                        return Removed::Shrunk(RNode::inner(children));
                    }
                }
            }
            Removed::NotFound
        }
    }
}

/// Depth-first iterator over the entries of an [`RTree`].
pub struct Iter<'a, K> {
    stack: Vec<&'a RNode<K>>,
    leaf: core::slice::Iter<'a, (K, Rect)>,
}

impl<K> Debug for Iter<'_, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Iter")
            .field("pending_nodes", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = (&'a K, Rect);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((k, b)) = self.leaf.next() {
                return Some((k, *b));
            }
            match self.stack.pop()? {
                RNode::Leaf { entries, .. } => self.leaf = entries.iter(),
                RNode::Inner { children, .. } => {
                    self.stack.extend(children.iter().rev().map(|c| &**c));
                }
            }
        }
    }
}

impl<'a, K> IntoIterator for &'a RTree<K> {
    type Item = (&'a K, Rect);
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn xywh(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, x + w, y + h)
    }

    /// Deterministic boxes scattered over a 1000x1000 area.
    #[allow(clippy::cast_precision_loss, reason = "Small test values.")]
    fn scattered(n: usize) -> Vec<(usize, Rect)> {
        let mut state = 0x9e37_79b9_u32;
        (0..n)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let x = f64::from(state % 1000);
                let y = f64::from((state / 1000) % 1000);
                let w = 1.0 + (i % 7) as f64;
                (i, xywh(x, y, w, w))
            })
            .collect()
    }

    #[test]
    fn picks_the_box_under_the_point() {
        let ctx = RTreeContext::default();
        let tree = RTree::new()
            .add(&ctx, String::from("A"), xywh(100.0, 100.0, 100.0, 100.0))
            .add(&ctx, String::from("B"), xywh(200.0, 200.0, 100.0, 100.0))
            .add(&ctx, String::from("C"), xywh(300.0, 300.0, 100.0, 100.0));
        assert_eq!(tree.get_picked_object(Point::new(150.0, 150.0)).map(String::as_str), Some("A"));
        assert_eq!(tree.get_picked_object(Point::new(250.0, 250.0)).map(String::as_str), Some("B"));
        assert_eq!(tree.get_picked_object(Point::new(350.0, 350.0)).map(String::as_str), Some("C"));
        assert_eq!(tree.get_picked_object(Point::new(50.0, 50.0)), None);
        assert_eq!(tree.count(), 3);
    }

    #[test]
    fn add_leaves_the_original_untouched() {
        let ctx = RTreeContext::default();
        let before = RTree::new().add(&ctx, 1_u32, xywh(0.0, 0.0, 10.0, 10.0));
        let after = before.add(&ctx, 2, xywh(20.0, 20.0, 10.0, 10.0));
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert_eq!(before.get_picked_object(Point::new(25.0, 25.0)), None);
        assert_eq!(after.get_picked_object(Point::new(25.0, 25.0)), Some(&2));

        let removed = after.remove(&1);
        assert!(after.contains_key(&1));
        assert!(!removed.contains_key(&1));
    }

    #[test]
    fn bounds_stay_tight_through_adds_and_removes() {
        for strategy in [
            SplitStrategy::Quadratic,
            SplitStrategy::Linear,
            SplitStrategy::SurfaceArea,
        ] {
            let ctx = RTreeContext::with_splitters(4, 2, strategy, strategy).unwrap();
            let items = scattered(300);
            let mut tree = RTree::new();
            for (k, b) in &items {
                tree = tree.add(&ctx, *k, *b);
                tree.check_invariants(&ctx).unwrap();
            }
            assert!(tree.height() > 2, "{strategy:?} never grew");
            for (k, b) in items.iter().step_by(3) {
                tree = tree.remove_with_bounds(k, *b);
                tree.check_invariants(&ctx).unwrap();
            }
            assert_eq!(tree.len(), 200);
            assert_eq!(tree.count(), 200);
        }
    }

    #[test]
    fn picks_every_unobstructed_center() {
        let ctx = RTreeContext::default();
        // Non-overlapping grid of boxes.
        let mut tree = RTree::new();
        let mut items = Vec::new();
        for row in 0..12 {
            for col in 0..12 {
                let r = xywh(f64::from(col) * 20.0, f64::from(row) * 20.0, 15.0, 15.0);
                items.push(((row, col), r));
                tree = tree.add(&ctx, (row, col), r);
            }
        }
        for (k, r) in &items {
            assert_eq!(tree.get_picked_object(r.center()), Some(k));
        }
        assert_eq!(tree.get_picked_object(Point::new(17.0, 17.0)), None);
    }

    #[test]
    fn removing_everything_empties_the_tree() {
        let ctx = RTreeContext::new(4, 2).unwrap();
        let items = scattered(64);
        let mut tree = RTree::new();
        for (k, b) in &items {
            tree = tree.add(&ctx, *k, *b);
        }
        for (k, _) in &items {
            tree = tree.remove(k);
            tree.check_invariants(&ctx).unwrap();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.count(), 0);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.bounds(), None);
    }

    #[test]
    fn removing_an_absent_key_changes_nothing() {
        let ctx = RTreeContext::default();
        let tree = RTree::new().add(&ctx, 1_u8, xywh(0.0, 0.0, 1.0, 1.0));
        let same = tree.remove(&9);
        assert_eq!(same.len(), 1);
        let missed = tree.remove_with_bounds(&1, xywh(50.0, 50.0, 1.0, 1.0));
        assert_eq!(missed.len(), 1, "bounds hint outside the entry should not find it");
    }

    #[test]
    fn query_rect_matches_brute_force() {
        let ctx = RTreeContext::default();
        let items = scattered(200);
        let tree = items.iter().fold(RTree::new(), |t, (k, b)| t.add(&ctx, *k, *b));
        let view = Rect::new(200.0, 300.0, 600.0, 500.0);
        let mut got: Vec<usize> = tree.query_rect(view).into_iter().map(|(k, _)| *k).collect();
        let mut want: Vec<usize> = items
            .iter()
            .filter(|(_, b)| overlaps(b, &view))
            .map(|(k, _)| *k)
            .collect();
        got.sort_unstable();
        want.sort_unstable();
        assert_eq!(got, want);
        assert_eq!(tree.iter().count(), 200);
    }

    #[test]
    fn overlapping_picks_are_stable() {
        let ctx = RTreeContext::default();
        let tree = RTree::new()
            .add(&ctx, 'a', xywh(0.0, 0.0, 10.0, 10.0))
            .add(&ctx, 'b', xywh(5.0, 5.0, 10.0, 10.0));
        let p = Point::new(7.0, 7.0);
        assert_eq!(tree.query_point(p).len(), 2);
        let first = tree.get_picked_object(p).copied();
        assert_eq!(first, Some('a'));
        assert_eq!(tree.clone().get_picked_object(p).copied(), first);
    }

    #[test]
    fn rejects_bad_capacities() {
        assert!(RTreeContext::new(1, 1).is_err());
        assert!(RTreeContext::new(8, 0).is_err());
        assert!(RTreeContext::new(8, 5).is_err());
        assert!(RTreeContext::new(8, 4).is_ok());
    }
}
