// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type shared by the spatial indexes.

use kurbo::Rect;

/// Errors reported by constructors and invariant checks.
///
/// Query methods never fail: a point outside every indexed region simply yields
/// no result.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SpatialError {
    /// A constructor argument was out of range.
    #[error("invalid argument: {what}")]
    InvalidArgument {
        /// Which argument was rejected and why.
        what: &'static str,
    },
    /// An R-tree node's stored bounds differ from the union of its children.
    #[error("node at depth {depth} stores {actual:?} but its children cover {expected:?}")]
    BoundsMismatch {
        /// Depth of the offending node (root is 0).
        depth: usize,
        /// Union of the children's bounds.
        expected: Rect,
        /// Bounds stored on the node.
        actual: Rect,
    },
    /// R-tree leaves were found at different depths.
    #[error("leaves found at depths {expected} and {found}")]
    Unbalanced {
        /// Depth of the first leaf reached.
        expected: usize,
        /// Depth of a leaf that disagrees.
        found: usize,
    },
    /// An R-tree node holds more entries than the context allows.
    #[error("node at depth {depth} holds {len} entries, capacity is {capacity}")]
    Overfull {
        /// Depth of the offending node.
        depth: usize,
        /// Number of entries or children.
        len: usize,
        /// Configured capacity `M`.
        capacity: usize,
    },
    /// Quad-tree children do not exactly partition their parent.
    #[error("quadrants at depth {depth} do not partition {parent:?}")]
    QuadrantPartition {
        /// Depth of the parent node.
        depth: usize,
        /// The parent rectangle.
        parent: Rect,
    },
}
