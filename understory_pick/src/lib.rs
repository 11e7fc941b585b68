// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_pick --heading-base-level=0

//! Understory Pick: find the node or edge under the pointer in a graph layout.
//!
//! Every accessor implements [`GraphElementAccessor`] against a
//! [`LayoutModel`](understory_layout::LayoutModel):
//!
//! - [`RadiusAccessor`] scans every node. No index, no snapshot, retries when the
//!   layout is reset underneath it.
//! - [`GridAccessor`] and [`QuadTreeAccessor`] search a point index rebuilt
//!   whenever the model's version changes.
//! - [`ShapeAccessor`] hit-tests node boxes and edge segments held in R-trees.
//!
//! All of them skip nodes marked not pickable, and none of them fail: an empty
//! neighbourhood, an unusable radius or a layout that will not hold still all
//! read as "nothing here".
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kurbo::Point;
//! use understory_layout::{LayoutModel, LayoutSize, SimpleGraph};
//! use understory_pick::{GraphElementAccessor, QuadTreeAccessor, RadiusAccessor};
//!
//! let graph = SimpleGraph::from_edges([], [("a", "b"), ("b", "c")]);
//! let model: LayoutModel<_> = LayoutModel::new(Arc::new(graph), LayoutSize::new(100.0, 100.0)).unwrap();
//! model.set(&"a", Point::new(10.0, 10.0)).unwrap();
//! model.set(&"b", Point::new(50.0, 50.0)).unwrap();
//! model.set(&"c", Point::new(90.0, 10.0)).unwrap();
//!
//! let tree = QuadTreeAccessor::<&str>::default();
//! assert_eq!(tree.node_at(&model, Point::new(48.0, 47.0), 5.0), Some("b"));
//! assert_eq!(tree.node_at(&model, Point::new(30.0, 70.0), 5.0), None);
//!
//! // Nearest edge: the segment from b to c passes close to (72, 31).
//! assert_eq!(RadiusAccessor::default().edge_at(&model, Point::new(72.0, 31.0), 3.0), Some(1));
//! ```

mod accessor;
mod cache;
mod indexed;
mod radius;
mod shapes;

pub use accessor::{DEFAULT_MAX_DISTANCE, GraphElementAccessor};
pub use indexed::{GridAccessor, QuadTreeAccessor};
pub use radius::{DEFAULT_MAX_ATTEMPTS, RadiusAccessor};
pub use shapes::{DEFAULT_NODE_EXTENT, ShapeAccessor};
