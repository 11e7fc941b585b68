// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only access to node positions, the seam between a layout and its indexes.

use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};

use hashbrown::HashMap;
use kurbo::Point;

/// A source of node positions that an index can be built from.
///
/// Layout models implement this so the grid and quad tree can re-bucket nodes
/// without knowing how positions are stored. Implementations may hand out
/// positions that change between calls; indexes only promise to reflect what
/// they read.
pub trait NodePositions<N> {
    /// Current position of `node`, or `None` if the source does not know it.
    fn position_of(&self, node: &N) -> Option<Point>;

    /// Visit every known `(node, position)` pair.
    fn for_each_position(&self, f: &mut dyn FnMut(&N, Point));
}

impl<N: PartialEq> NodePositions<N> for [(N, Point)] {
    fn position_of(&self, node: &N) -> Option<Point> {
        self.iter().find(|(n, _)| n == node).map(|(_, p)| *p)
    }

    fn for_each_position(&self, f: &mut dyn FnMut(&N, Point)) {
        for (n, p) in self {
            f(n, *p);
        }
    }
}

impl<N: PartialEq> NodePositions<N> for Vec<(N, Point)> {
    fn position_of(&self, node: &N) -> Option<Point> {
        self.as_slice().position_of(node)
    }

    fn for_each_position(&self, f: &mut dyn FnMut(&N, Point)) {
        self.as_slice().for_each_position(f);
    }
}

impl<N: Eq + Hash, S: BuildHasher> NodePositions<N> for HashMap<N, Point, S> {
    fn position_of(&self, node: &N) -> Option<Point> {
        self.get(node).copied()
    }

    fn for_each_position(&self, f: &mut dyn FnMut(&N, Point)) {
        for (n, p) in self {
            f(n, *p);
        }
    }
}
