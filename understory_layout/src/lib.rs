// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_layout --heading-base-level=0

//! Understory Layout: the shared position model behind a graph visualization.
//!
//! - [`LayoutModel`] maps every node of a [`Graph`] to a point, placing nodes lazily
//!   through an [`Initializer`], honoring per-node locks and notifying listeners.
//! - [`PointModel`] abstracts over 2D ([`kurbo::Point`]) and 3D ([`Point3`]) coordinates.
//! - [`LayoutAlgorithm`] is the contract an iterative layout implements;
//!   [`LayoutProcess`] binds one to a shared model.
//! - [`Relaxer`] steps a process on a background thread with pause, resume and stop.
//! - [`VisualizationConfig`] gathers every tunable and builds indexes and relaxers from it.
//!
//! The model implements [`understory_spatial::NodePositions`], so grids and quad trees
//! can be rebuilt straight from it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use kurbo::Point;
//! use understory_layout::{
//!     LayoutAlgorithm, LayoutError, LayoutModel, LayoutProcess, LayoutSize, Relaxer, SimpleGraph,
//! };
//!
//! // Moves every node halfway to the centre, ten times.
//! struct Gather(usize);
//!
//! impl LayoutAlgorithm<SimpleGraph<&'static str>, Point> for Gather {
//!     fn step(&mut self, model: &LayoutModel<SimpleGraph<&'static str>>) -> Result<(), LayoutError> {
//!         let centre = model.size().to_rect().center();
//!         for (node, p) in model.snapshot() {
//!             model.set(&node, p.lerp(centre, 0.5))?;
//!         }
//!         self.0 += 1;
//!         Ok(())
//!     }
//!
//!     fn done(&self) -> bool {
//!         self.0 >= 10
//!     }
//! }
//!
//! let graph = Arc::new(SimpleGraph::from_edges([], [("a", "b"), ("b", "c")]));
//! let model: Arc<LayoutModel<_>> = Arc::new(LayoutModel::new(graph, LayoutSize::new(100.0, 100.0)).unwrap());
//! model.lock(&"a", true).unwrap();
//! let pinned = model.get(&"a").unwrap();
//!
//! let relaxer = Relaxer::new(LayoutProcess::new(Gather(0), Arc::clone(&model)));
//! relaxer.set_sleep_time(Duration::from_millis(1)).unwrap();
//! relaxer.relax().unwrap();
//! assert!(relaxer.wait_until_stopped(Duration::from_secs(10)));
//!
//! assert_eq!(model.get(&"a").unwrap(), pinned);
//! assert!((model.get(&"b").unwrap() - Point::new(50.0, 50.0)).hypot() < 1.0);
//! ```

pub mod algorithm;
pub mod config;
pub mod error;
pub mod graph;
pub mod init;
pub mod model;
pub mod point;
pub mod relaxer;
pub mod types;

pub use algorithm::{IterativeProcess, LayoutAlgorithm, LayoutProcess};
pub use config::VisualizationConfig;
pub use error::LayoutError;
pub use graph::{Graph, SimpleGraph};
pub use init::Initializer;
pub use model::LayoutModel;
pub use point::{Point3, PointModel};
pub use relaxer::{Relaxer, RelaxerState};
pub use types::{LayoutEvent, LayoutSize, NodeFlags};
