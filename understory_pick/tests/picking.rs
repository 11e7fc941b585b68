// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Every accessor against the same layouts.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kurbo::{Point, Rect, Size};
use understory_layout::{
    Graph, LayoutAlgorithm, LayoutError, LayoutModel, LayoutProcess, LayoutSize, Relaxer, SimpleGraph,
};
use understory_pick::{
    GraphElementAccessor, GridAccessor, QuadTreeAccessor, RadiusAccessor, ShapeAccessor,
};
use understory_spatial::geom::distance_sq_to_segment;
use understory_spatial::{QuadTreeConfig, RTreeContext};

type Model = LayoutModel<SimpleGraph<u32>>;

/// Deterministic scatter over `[0, side)^2`.
fn scatter(n: u32, side: f64) -> Arc<Model> {
    let g = SimpleGraph::from_edges(0..n, (1..n).map(|i| (i - 1, i)));
    let model = Arc::new(LayoutModel::new(Arc::new(g), LayoutSize::new(side, side)).unwrap());
    let mut s = 0x2545_f491_4f6c_dd1d_u64;
    let mut next = || {
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        (s >> 11) as f64 / (1_u64 << 53) as f64 * side
    };
    for i in 0..n {
        let p = Point::new(next(), next());
        model.set(&i, p).unwrap();
    }
    model
}

fn probes(side: f64) -> Vec<Point> {
    let mut out = Vec::new();
    for i in 0..9 {
        for j in 0..9 {
            out.push(Point::new(f64::from(i) * side / 8.0 + 0.3, f64::from(j) * side / 8.0 + 0.7));
        }
    }
    // A few outside the layout.
    out.extend([Point::new(-40.0, 10.0), Point::new(side + 25.0, side + 5.0)]);
    out
}

#[test]
fn point_indexes_agree_with_a_linear_scan() {
    let model = scatter(300, 400.0);
    let radius = RadiusAccessor::default();
    let grid = GridAccessor::<u32>::new(16, 16);
    let tree = QuadTreeAccessor::<u32>::new(QuadTreeConfig {
        split_threshold: 4,
        max_depth: 10,
    });
    for p in probes(400.0) {
        for max in [5.0, 20.0, understory_pick::DEFAULT_MAX_DISTANCE] {
            let expected = radius.node_at(&model, p, max);
            assert_eq!(grid.node_at(&model, p, max), expected, "grid at {p:?} within {max}");
            assert_eq!(tree.node_at(&model, p, max), expected, "quad tree at {p:?} within {max}");
        }
    }
}

#[test]
fn region_queries_agree() {
    let model = scatter(200, 300.0);
    let radius = RadiusAccessor::default();
    let grid = GridAccessor::<u32>::new(7, 5);
    let tree = QuadTreeAccessor::<u32>::default();
    for rect in [
        Rect::new(0.0, 0.0, 300.0, 300.0),
        Rect::new(40.0, 60.0, 120.0, 90.0),
        Rect::new(250.0, 250.0, 500.0, 500.0),
        Rect::new(-10.0, -10.0, -5.0, -5.0),
    ] {
        let mut expected = radius.nodes_in(&model, rect);
        expected.sort_unstable();
        let mut from_grid = grid.nodes_in(&model, rect);
        from_grid.sort_unstable();
        let mut from_tree = tree.nodes_in(&model, rect);
        from_tree.sort_unstable();
        assert_eq!(from_grid, expected, "grid over {rect:?}");
        assert_eq!(from_tree, expected, "quad tree over {rect:?}");
    }
}

fn edge_distance_sq(model: &Model, edge: usize, p: Point) -> f64 {
    let (a, b) = model.graph().endpoints(&edge).unwrap();
    distance_sq_to_segment(model.get(&a).unwrap(), model.get(&b).unwrap(), p)
}

#[test]
fn edge_picks_agree() {
    let model = scatter(60, 200.0);
    let radius = RadiusAccessor::default();
    let grid = GridAccessor::<u32>::new(4, 4);
    let tree = QuadTreeAccessor::<u32>::default();
    let shapes = ShapeAccessor::<u32, usize>::default();
    for p in probes(200.0) {
        let expected = radius.edge_at(&model, p, 6.0);
        assert_eq!(grid.edge_at(&model, p, 6.0), expected, "grid at {p:?}");
        assert_eq!(tree.edge_at(&model, p, 6.0), expected, "quad tree at {p:?}");
        // Edges meeting at a node tie near it; the R-tree may pick either.
        let from_shapes = shapes.edge_at(&model, p, 6.0);
        assert_eq!(from_shapes.is_some(), expected.is_some(), "shapes at {p:?}");
        if let (Some(got), Some(want)) = (from_shapes, expected) {
            let (got, want) = (edge_distance_sq(&model, got, p), edge_distance_sq(&model, want, p));
            assert!((got - want).abs() < 1e-9, "shapes at {p:?}: {got} vs {want}");
        }
    }
}

#[test]
fn shapes_hit_where_nodes_are_drawn() {
    let model = scatter(50, 500.0);
    let shapes = ShapeAccessor::<u32, usize>::new(Size::new(4.0, 4.0), RTreeContext::new(4, 2).unwrap());
    for (n, p) in model.snapshot() {
        let hit = shapes.node_at(&model, p, 0.0);
        // Boxes may overlap; whatever is hit must be drawn over the point.
        let hit = hit.unwrap_or_else(|| panic!("nothing under node {n}"));
        let q = model.get(&hit).unwrap();
        assert!((q.x - p.x).abs() <= 2.0 && (q.y - p.y).abs() <= 2.0, "{hit} is not under {n}");
    }
}

#[test]
fn indexes_follow_the_layout() {
    let model = scatter(40, 100.0);
    let grid = GridAccessor::<u32>::new(5, 5);
    let tree = QuadTreeAccessor::<u32>::default();
    let far = Point::new(99.5, 0.5);
    model.set(&7, far).unwrap();
    assert_eq!(grid.node_at(&model, far, 0.1), Some(7));
    assert_eq!(tree.node_at(&model, far, 0.1), Some(7));
    assert_eq!(grid.built_version(), Some(model.version()));

    model.set(&7, Point::new(0.5, 99.5)).unwrap();
    assert_ne!(grid.node_at(&model, far, 0.1), Some(7));
    assert_eq!(grid.node_at(&model, Point::new(0.5, 99.5), 0.1), Some(7));
    assert_eq!(tree.node_at(&model, Point::new(0.5, 99.5), 0.1), Some(7));

    // Resizing rebuilds over the new bounds.
    model.set_size(1000.0, 1000.0).unwrap();
    model.set(&7, Point::new(900.0, 900.0)).unwrap();
    assert_eq!(grid.node(&model, Point::new(1000.0, 1000.0)), Some(7));
    assert_eq!(tree.node(&model, Point::new(1000.0, 1000.0)), Some(7));
}

#[test]
fn unpickable_nodes_are_invisible_to_every_accessor() {
    let model = scatter(30, 100.0);
    let target = Point::new(50.0, 50.0);
    model.set(&3, target).unwrap();
    model.set_pickable(&3, false).unwrap();

    let accessors: Vec<Box<dyn GraphElementAccessor<SimpleGraph<u32>, Point>>> = vec![
        Box::new(RadiusAccessor::default()),
        Box::new(GridAccessor::<u32>::new(4, 4)),
        Box::new(QuadTreeAccessor::<u32>::default()),
        Box::new(ShapeAccessor::<u32, usize>::new(Size::new(0.5, 0.5), RTreeContext::default())),
    ];
    for acc in &accessors {
        assert_ne!(acc.node(&model, target), Some(3));
        assert!(!acc.nodes_in(&model, Rect::new(0.0, 0.0, 100.0, 100.0)).contains(&3));
    }
    model.set_pickable(&3, true).unwrap();
    for acc in &accessors {
        assert_eq!(acc.node(&model, target), Some(3));
    }
}

#[test]
fn empty_and_degenerate_layouts_find_nothing() {
    let empty: Model =
        LayoutModel::new(Arc::new(SimpleGraph::new()), LayoutSize::new(10.0, 10.0)).unwrap();
    let grid = GridAccessor::<u32>::new(4, 4);
    let tree = QuadTreeAccessor::<u32>::default();
    assert_eq!(RadiusAccessor::default().node(&empty, Point::ZERO), None);
    assert_eq!(grid.node(&empty, Point::ZERO), None);
    assert_eq!(tree.node(&empty, Point::ZERO), None);
    assert!(grid.nodes_in(&empty, Rect::new(0.0, 0.0, 10.0, 10.0)).is_empty());

    // A zero-area layout cannot hold an index; the accessors fall back to scanning.
    let flat: Model = LayoutModel::new(
        Arc::new(SimpleGraph::from_edges([1_u32, 2], [])),
        LayoutSize::new(0.0, 0.0),
    )
    .unwrap();
    flat.set(&1, Point::new(3.0, 4.0)).unwrap();
    flat.set(&2, Point::new(30.0, 40.0)).unwrap();
    assert_eq!(grid.node(&flat, Point::ZERO), Some(1));
    assert_eq!(tree.node_at(&flat, Point::new(29.0, 40.0), 2.0), Some(2));
}

#[test]
fn indexes_are_not_shared_between_models() {
    let grid = GridAccessor::<u32>::new(4, 4);
    let tree = QuadTreeAccessor::<u32>::default();
    let mut seen = Vec::new();
    // Each model is dropped before the next is made, so the allocator is free
    // to hand out the same address, and every model sits at version 1.
    for i in 0..8_u32 {
        let at = Point::new(10.0 + f64::from(i) * 10.0, 90.0 - f64::from(i) * 10.0);
        let model: Box<Model> = Box::new(
            LayoutModel::new(
                Arc::new(SimpleGraph::from_edges([0_u32], [])),
                LayoutSize::new(100.0, 100.0),
            )
            .unwrap(),
        );
        model.set(&0, at).unwrap();
        assert_eq!(model.version(), 1);
        assert!(!seen.contains(&model.id()));
        seen.push(model.id());

        assert_eq!(RadiusAccessor::default().node_at(&model, at, 0.5), Some(0));
        assert_eq!(grid.node_at(&model, at, 0.5), Some(0), "grid, model {i}");
        assert_eq!(tree.node_at(&model, at, 0.5), Some(0), "quad tree, model {i}");
        if i > 0 {
            let before = Point::new(at.x - 10.0, at.y + 10.0);
            assert_eq!(grid.node_at(&model, before, 0.5), None, "grid, model {i}");
            assert_eq!(tree.node_at(&model, before, 0.5), None, "quad tree, model {i}");
        }
    }
}

#[test]
fn reset_layouts_are_picked_again_after_placement() {
    let model = scatter(20, 100.0);
    let grid = GridAccessor::<u32>::new(4, 4);
    assert!(grid.node(&model, Point::new(50.0, 50.0)).is_some());
    model.reset();
    assert!(model.is_empty());
    // The rebuild snapshot places every node again.
    assert!(grid.node(&model, Point::new(50.0, 50.0)).is_some());
    assert_eq!(model.len(), 20);
}

/// Random walk that keeps every node inside its bounds.
struct Jitter(u64);

impl LayoutAlgorithm<SimpleGraph<u32>, Point> for Jitter {
    fn step(&mut self, model: &Model) -> Result<(), LayoutError> {
        let size = model.size();
        for (n, p) in model.snapshot() {
            self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let dx = ((self.0 >> 33) % 7) as f64 - 3.0;
            let dy = ((self.0 >> 40) % 7) as f64 - 3.0;
            let q = Point::new(
                (p.x + dx).clamp(0.0, size.width),
                (p.y + dy).clamp(0.0, size.height),
            );
            model.set(&n, q)?;
        }
        Ok(())
    }

    fn done(&self) -> bool {
        false
    }
}

#[test]
fn picking_during_relaxation_never_fails() {
    let model = scatter(100, 200.0);
    let relaxer = Relaxer::new(LayoutProcess::new(Jitter(1), Arc::clone(&model)));
    relaxer.set_sleep_time(Duration::from_millis(1)).unwrap();
    relaxer.relax().unwrap();

    let pickers: Vec<_> = (0..3)
        .map(|k| {
            let model = Arc::clone(&model);
            thread::spawn(move || {
                let grid = GridAccessor::<u32>::new(8, 8);
                let tree = QuadTreeAccessor::<u32>::default();
                let radius = RadiusAccessor::default();
                for i in 0..200 {
                    let p = Point::new(f64::from((i * 7 + k) % 200), f64::from((i * 13) % 200));
                    for found in [
                        grid.node(&model, p),
                        tree.node(&model, p),
                        radius.node(&model, p),
                    ] {
                        let n = found.unwrap_or_else(|| panic!("nothing found near {p:?}"));
                        assert!(n < 100);
                    }
                }
            })
        })
        .collect();
    for picker in pickers {
        picker.join().unwrap();
    }
    relaxer.stop();
    assert!(relaxer.take_error().is_none());
}
