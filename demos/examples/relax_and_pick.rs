// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Relax a ring in the background and pick nodes while it moves.
//!
//! A toy spring step pulls neighbours to a fixed distance. The relaxer runs it
//! on its own thread; the main thread pauses, picks, resumes and stops.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_graph_demos --example relax_and_pick`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kurbo::{Point, Vec2};
use tracing::info;
use tracing_subscriber::EnvFilter;
use understory_layout::{
    Graph, LayoutAlgorithm, LayoutError, LayoutModel, LayoutProcess, SimpleGraph,
    VisualizationConfig,
};
use understory_pick::{GraphElementAccessor, QuadTreeAccessor};

type Ring = SimpleGraph<u32>;

/// Moves each node a fraction of the way to where its springs want it.
struct Springs {
    rest: f64,
    steps: usize,
    limit: usize,
}

impl LayoutAlgorithm<Ring, Point> for Springs {
    fn step(&mut self, model: &LayoutModel<Ring>) -> Result<(), LayoutError> {
        let graph = Arc::clone(model.graph());
        for (node, p) in model.snapshot() {
            let mut pull = Vec2::ZERO;
            for other in graph.neighbors(&node) {
                let q = model.get(&other)?;
                let d = q - p;
                let len = d.hypot().max(1e-6);
                pull += d * ((len - self.rest) / len);
            }
            model.offset(&node, pull.x * 0.1, pull.y * 0.1, 0.0)?;
        }
        self.steps += 1;
        Ok(())
    }

    fn done(&self) -> bool {
        self.steps >= self.limit
    }
}

fn main() -> Result<(), LayoutError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = VisualizationConfig::default();
    config.validate()?;

    let n = 24;
    let ring = SimpleGraph::from_edges(0..n, (0..n).map(|i| (i, (i + 1) % n)));
    let model: Arc<LayoutModel<Ring>> = Arc::new(LayoutModel::new(Arc::new(ring), config.size)?);

    // Pin one node to the centre; the rest hang off it.
    let centre = config.size.to_rect().center();
    model.set(&0, centre)?;
    model.lock(&0, true)?;

    let springs = Springs {
        rest: 40.0,
        steps: 0,
        limit: 400,
    };
    let relaxer = config.relaxer(LayoutProcess::new(springs, Arc::clone(&model)))?;
    relaxer.set_sleep_time(Duration::from_millis(5))?;
    relaxer.relax()?;

    let picker = QuadTreeAccessor::<u32>::new(config.quadtree);
    for round in 0..3 {
        thread::sleep(Duration::from_millis(100));
        relaxer.pause();
        let probe = centre + Vec2::new(40.0, 0.0);
        let hit = picker.node(&model, probe);
        let edge = picker.edge_at(&model, probe, 15.0);
        info!(round, ?hit, ?edge, version = model.version(), "picked while paused");
        relaxer.resume()?;
    }

    relaxer.stop();
    if let Some(error) = relaxer.take_error() {
        return Err(error);
    }
    assert_eq!(model.get(&0)?, centre, "locked node must not move");
    info!(
        state = ?relaxer.state(),
        nodes = model.len(),
        "finished"
    );
    for (node, p) in model.snapshot().into_iter().take(4) {
        println!("node {node}: ({:.1}, {:.1})", p.x, p.y);
    }
    Ok(())
}
