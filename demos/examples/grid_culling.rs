// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport culling with the grid and the quad tree.
//!
//! Scatter a few hundred nodes, index them straight from the layout model, and
//! report which cells and leaves a viewport touches as it pans.
//!
//! Run:
//! - `cargo run -p understory_graph_demos --example grid_culling`

use std::sync::Arc;

use kurbo::{Rect, Vec2};
use tracing_subscriber::EnvFilter;
use understory_layout::{Initializer, LayoutError, LayoutModel, SimpleGraph, VisualizationConfig};

fn main() -> Result<(), LayoutError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = VisualizationConfig::default();
    config.grid_cols = 12;
    config.grid_rows = 12;
    config.validate()?;

    let graph = SimpleGraph::from_edges(0..400_u32, (1..400).map(|i| (i / 2, i)));
    let model: LayoutModel<SimpleGraph<u32>> = LayoutModel::new(Arc::new(graph), config.size)?
        .with_initializer(Initializer::Random { seed: 42 });

    let mut grid = config.grid::<u32>()?;
    grid.build(&model);
    let mut tree = config.quad_tree::<u32>()?;
    tree.build(&model);
    println!(
        "{} nodes: {}x{} grid, quad tree with {} leaves at depth {}",
        model.len(),
        grid.cols(),
        grid.rows(),
        tree.leaf_count(),
        tree.depth()
    );

    let mut viewport = Rect::new(0.0, 0.0, 160.0, 120.0);
    for _ in 0..5 {
        let cells = grid.visible_cells(viewport);
        let candidates = grid.nodes_in(viewport).count();
        let leaves = tree.visible_leaves(viewport);
        let drawn: usize = leaves
            .iter()
            .map(|leaf| {
                tree.leaf_members(*leaf)
                    .iter()
                    .filter(|(_, p)| understory_spatial::geom::contains_point(&viewport, *p))
                    .count()
            })
            .sum();
        println!(
            "viewport {viewport:?}: {} cells ({candidates} candidates), {} leaves, {drawn} visible",
            cells.len(),
            leaves.len()
        );
        viewport = viewport + Vec2::new(110.0, 90.0);
    }

    // Incremental maintenance: move one node and re-bucket it without a rebuild.
    let moved = 7;
    model.set(&moved, kurbo::Point::new(590.0, 590.0))?;
    let changed = grid.relocate(moved, model.get(&moved)?);
    tree.relocate(moved, model.get(&moved)?);
    println!(
        "node {moved} changed cell: {changed}, now in {:?}; quad-tree leaf {:?}",
        grid.cell_of(&moved),
        tree.leaf_of(&moved)
    );
    tree.check_invariants()?;
    Ok(())
}
