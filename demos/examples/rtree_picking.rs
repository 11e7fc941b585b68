// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persistent R-tree versions and shape picking.
//!
//! Two versions of the same tree share structure: the old one still answers
//! queries after the new one has removed an entry. Then the same idea drives
//! node and edge picking over a small layout.
//!
//! Run:
//! - `cargo run -p understory_graph_demos --example rtree_picking`

use std::sync::Arc;

use kurbo::{Point, Rect, Size};
use tracing_subscriber::EnvFilter;
use understory_layout::{LayoutError, LayoutModel, LayoutSize, SimpleGraph};
use understory_pick::{GraphElementAccessor, ShapeAccessor};
use understory_spatial::{RTree, RTreeContext, SplitStrategy};

fn main() -> Result<(), LayoutError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ctx = RTreeContext::with_splitters(4, 2, SplitStrategy::SurfaceArea, SplitStrategy::SurfaceArea)?;
    let mut v1 = RTree::new();
    for i in 0..20_u32 {
        let x = f64::from(i % 5) * 30.0;
        let y = f64::from(i / 5) * 30.0;
        v1 = v1.add(&ctx, i, Rect::new(x, y, x + 25.0, y + 25.0));
    }
    v1.check_invariants(&ctx)?;
    let v2 = v1.remove(&6);
    println!(
        "v1: {} entries, height {}; v2: {} entries",
        v1.len(),
        v1.height(),
        v2.len()
    );
    let probe = Point::new(40.0, 40.0);
    println!(
        "pick at {probe:?}: v1 {:?}, v2 {:?}",
        v1.get_picked_object(probe),
        v2.get_picked_object(probe)
    );

    // Shapes over a layout: a triangle with a tail.
    let graph = SimpleGraph::from_edges(['a', 'b', 'c', 'd'], [('a', 'b'), ('b', 'c'), ('c', 'a'), ('c', 'd')]);
    let model: LayoutModel<_> = LayoutModel::new(Arc::new(graph), LayoutSize::new(200.0, 200.0))?;
    model.set(&'a', Point::new(20.0, 20.0))?;
    model.set(&'b', Point::new(180.0, 20.0))?;
    model.set(&'c', Point::new(100.0, 150.0))?;
    model.set(&'d', Point::new(100.0, 190.0))?;

    let shapes = ShapeAccessor::<char, usize>::new(Size::new(16.0, 16.0), RTreeContext::default());
    for p in [Point::new(25.0, 14.0), Point::new(100.0, 22.0), Point::new(103.0, 170.0)] {
        println!(
            "at {p:?}: node {:?}, edge {:?}",
            shapes.node_at(&model, p, 0.0),
            shapes.edge_at(&model, p, 5.0)
        );
    }
    Ok(())
}

