// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Understory Spatial: bucket points, cull a viewport, pick a box.

use kurbo::{Point, Rect};
use understory_spatial::{QuadTree, QuadTreeConfig, RTree, RTreeContext, SpatialGrid};

fn main() {
    let area = Rect::new(0.0, 0.0, 100.0, 100.0);
    let positions = vec![
        (1_u32, Point::new(5.0, 5.0)),
        (2, Point::new(12.0, 48.0)),
        (3, Point::new(51.0, 52.0)),
        (4, Point::new(95.0, 90.0)),
    ];

    let mut grid = SpatialGrid::new(area, 4, 4).unwrap();
    grid.build(&positions);
    let viewport = Rect::new(0.0, 40.0, 60.0, 60.0);
    println!("cells under {viewport:?}: {:?}", grid.visible_cells(viewport));
    let near: Vec<_> = grid.nodes_in(viewport).collect();
    println!("candidates: {near:?}");

    // Move node 3 across a cell border.
    let changed = grid.relocate(3, Point::new(80.0, 52.0));
    println!("node 3 changed cell: {changed} -> {:?}", grid.cell_of(&3));

    let mut tree = QuadTree::new(area, QuadTreeConfig::default()).unwrap();
    tree.build(&positions);
    println!("nearest to (50, 50): {:?}", tree.nearest(Point::new(50.0, 50.0), 10.0));

    let ctx = RTreeContext::default();
    let boxes = RTree::new()
        .add(&ctx, "left", Rect::new(0.0, 0.0, 50.0, 100.0))
        .add(&ctx, "right", Rect::new(50.0, 0.0, 100.0, 100.0));
    // The shared edge belongs to both; the first stored wins.
    println!("pick on the seam: {:?}", boxes.get_picked_object(Point::new(50.0, 10.0)));
}
