// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_spatial --heading-base-level=0

//! Understory Spatial: indexes that accelerate picking and culling over a graph layout.
//!
//! Three structures share one geometry vocabulary ([`kurbo::Point`] and [`kurbo::Rect`]):
//!
//! - [`SpatialGrid`]: a fixed `cols × rows` bucketing of node positions. Cheap to rebuild
//!   every frame; answers "which cells does this viewport touch" and "which cell is this
//!   point in".
//! - [`QuadTree`]: an adaptive subdivision that splits a leaf once it holds more than
//!   [`QuadTreeConfig::split_threshold`] nodes. Supports nearest-node search with
//!   rectangle-distance pruning.
//! - [`RTree`]: a persistent tree of `(key, bounding box)` pairs. Every `add` or `remove`
//!   returns a new tree that shares unchanged nodes with the old one, so readers can keep
//!   querying a version while a writer builds the next.
//!
//! The grid and quad tree read positions through [`NodePositions`], which layout models
//! implement; plain `Vec<(N, Point)>` and `HashMap<N, Point>` work too.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_spatial::{QuadTree, QuadTreeConfig, RTree, RTreeContext, SpatialGrid};
//!
//! let positions = vec![
//!     ("a", Point::new(10.0, 10.0)),
//!     ("b", Point::new(99.0, 1.0)),
//!     ("c", Point::new(60.0, 70.0)),
//! ];
//!
//! // Uniform 4×4 grid over a 100×100 area.
//! let mut grid = SpatialGrid::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 4).unwrap();
//! grid.build(&positions);
//! assert_eq!(grid.cell_indices(10.0, 10.0), (0, 0));
//! assert_eq!(grid.cell_of(&"b"), Some((3, 0)));
//!
//! // Adaptive quad tree with nearest-node search.
//! let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0), QuadTreeConfig::default()).unwrap();
//! tree.build(&positions);
//! let (nearest, _) = tree.nearest(Point::new(55.0, 65.0), 20.0).unwrap();
//! assert_eq!(*nearest, "c");
//!
//! // Persistent R-tree for box picking.
//! let ctx = RTreeContext::default();
//! let boxes = RTree::new()
//!     .add(&ctx, "A", Rect::new(100.0, 100.0, 200.0, 200.0))
//!     .add(&ctx, "B", Rect::new(200.0, 200.0, 300.0, 300.0));
//! assert_eq!(boxes.get_picked_object(Point::new(150.0, 150.0)), Some(&"A"));
//! ```
//!
//! ## Choosing an index
//!
//! - [`SpatialGrid`] when positions change every frame and queries are mostly viewport
//!   culling; rebuilding is a single pass.
//! - [`QuadTree`] when nodes cluster unevenly and nearest-node picking matters.
//! - [`RTree`] when elements have extent (node shapes, edge segments) and versions must be
//!   shared across threads.
//!
//! ### Float semantics
//!
//! Rectangles are closed for containment. Non-finite coordinates are clamped into the
//! first cell of the grid and are never picked by the trees.

#![no_std]

extern crate alloc;

pub mod error;
pub mod geom;
pub mod grid;
pub mod positions;
pub mod quadtree;
pub mod rtree;

pub use error::SpatialError;
pub use grid::SpatialGrid;
pub use positions::NodePositions;
pub use quadtree::{LeafId, QuadTree, QuadTreeConfig};
pub use rtree::{RTree, RTreeContext, SplitStrategy, Splitter};
