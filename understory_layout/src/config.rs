// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Every tunable of a visualization session in one place.
//!
//! Nothing here is global: build a [`VisualizationConfig`], validate it, and
//! hand the pieces to the components that need them.

use std::time::Duration;

use understory_spatial::{QuadTree, QuadTreeConfig, RTreeContext, SpatialGrid, SplitStrategy};

use crate::algorithm::IterativeProcess;
use crate::error::LayoutError;
use crate::relaxer::{DEFAULT_PRERELAX_BUDGET, DEFAULT_SLEEP, DEFAULT_STOP_TIMEOUT, Relaxer};
use crate::types::LayoutSize;

/// Options recognized by the layout, index and relaxer components.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualizationConfig {
    /// Layout bounds.
    pub size: LayoutSize,
    /// Grid columns.
    pub grid_cols: usize,
    /// Grid rows.
    pub grid_rows: usize,
    /// Quad-tree split policy.
    pub quadtree: QuadTreeConfig,
    /// R-tree node capacity `M`; the minimum fill is `max(1, 3M/8)`.
    pub rtree_capacity: usize,
    /// R-tree splitter for leaves and inner nodes.
    pub splitter: SplitStrategy,
    /// Pause between relaxer steps.
    pub relax_sleep: Duration,
    /// Budget of a synchronous prerelax.
    pub prerelax_budget: Duration,
    /// How long stopping waits for the relaxer thread.
    pub stop_timeout: Duration,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            size: LayoutSize::new(600.0, 600.0),
            grid_cols: 8,
            grid_rows: 8,
            quadtree: QuadTreeConfig::default(),
            rtree_capacity: 8,
            splitter: SplitStrategy::default(),
            relax_sleep: DEFAULT_SLEEP,
            prerelax_budget: DEFAULT_PRERELAX_BUDGET,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl VisualizationConfig {
    /// Defaults over `size`.
    pub fn with_size(size: LayoutSize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Check every option; the first problem found is reported.
    pub fn validate(&self) -> Result<(), LayoutError> {
        self.size.validate()?;
        if !(self.size.width > 0.0 && self.size.height > 0.0) {
            return Err(LayoutError::invalid("layout area must be non-empty"));
        }
        if self.grid_cols == 0 || self.grid_rows == 0 {
            return Err(LayoutError::invalid("grid needs at least one column and one row"));
        }
        self.quadtree.validate()?;
        self.rtree_context()?;
        if self.relax_sleep.is_zero() {
            return Err(LayoutError::invalid("relaxer sleep must be positive"));
        }
        Ok(())
    }

    /// Empty grid over the layout area.
    pub fn grid<N: Clone + Eq + core::hash::Hash>(&self) -> Result<SpatialGrid<N>, LayoutError> {
        Ok(SpatialGrid::new(self.size.to_rect(), self.grid_cols, self.grid_rows)?)
    }

    /// Empty quad tree over the layout area.
    pub fn quad_tree<N: Clone + Eq + core::hash::Hash>(&self) -> Result<QuadTree<N>, LayoutError> {
        Ok(QuadTree::new(self.size.to_rect(), self.quadtree)?)
    }

    /// R-tree context for the configured capacity and splitter.
    pub fn rtree_context(&self) -> Result<RTreeContext, LayoutError> {
        let min = (self.rtree_capacity * 3 / 8).max(1);
        Ok(RTreeContext::with_splitters(
            self.rtree_capacity,
            min,
            self.splitter,
            self.splitter,
        )?)
    }

    /// Idle relaxer around `process` with the configured timings.
    pub fn relaxer<T: IterativeProcess + 'static>(&self, process: T) -> Result<Relaxer<T>, LayoutError> {
        let relaxer = Relaxer::new(process)
            .with_prerelax_budget(self.prerelax_budget)
            .with_stop_timeout(self.stop_timeout);
        relaxer.set_sleep_time(self.relax_sleep)?;
        Ok(relaxer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_spatial::SpatialError;

    #[test]
    fn defaults_are_valid() {
        let cfg = VisualizationConfig::default();
        cfg.validate().unwrap();
        let ctx = cfg.rtree_context().unwrap();
        assert_eq!((ctx.max_entries(), ctx.min_entries()), (8, 3));
        assert_eq!(cfg.relax_sleep, Duration::from_millis(100));
    }

    #[test]
    fn bad_values_are_reported() {
        let mut cfg = VisualizationConfig::with_size(LayoutSize::new(100.0, 100.0));
        cfg.grid_cols = 0;
        assert!(matches!(cfg.validate(), Err(LayoutError::InvalidArgument(_))));

        let mut cfg = VisualizationConfig::default();
        cfg.rtree_capacity = 1;
        assert!(matches!(
            cfg.validate(),
            Err(LayoutError::Spatial(SpatialError::InvalidArgument { .. }))
        ));

        let mut cfg = VisualizationConfig::default();
        cfg.relax_sleep = Duration::ZERO;
        assert!(cfg.validate().is_err());

        let cfg = VisualizationConfig::with_size(LayoutSize::new(0.0, 10.0));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn builds_indexes_over_the_layout_area() {
        let cfg = VisualizationConfig::with_size(LayoutSize::new(100.0, 100.0));
        let grid = cfg.grid::<u32>().unwrap();
        assert_eq!(grid.bounds(), cfg.size.to_rect());
        let tree = cfg.quad_tree::<u32>().unwrap();
        assert_eq!(tree.bounds(), cfg.size.to_rect());
    }
}
