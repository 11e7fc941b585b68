// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The contract between layout algorithms, the model and the relaxer.

use std::sync::Arc;

use crate::error::LayoutError;
use crate::graph::Graph;
use crate::model::LayoutModel;
use crate::point::PointModel;

/// An iterative layout algorithm.
///
/// Algorithms read and write positions exclusively through the model, so
/// locked nodes and change notification work without their cooperation.
pub trait LayoutAlgorithm<G: Graph, P: PointModel>: Send {
    /// Prepare for a run. Called once before the first step.
    fn initialize(&mut self, model: &LayoutModel<G, P>) -> Result<(), LayoutError> {
        let _ = model;
        Ok(())
    }

    /// Advance one iteration.
    fn step(&mut self, model: &LayoutModel<G, P>) -> Result<(), LayoutError>;

    /// Whether the layout has converged.
    fn done(&self) -> bool;
}

/// Anything a [`Relaxer`](crate::Relaxer) can drive.
pub trait IterativeProcess: Send {
    /// Advance one iteration.
    fn step(&mut self) -> Result<(), LayoutError>;

    /// Whether further steps are pointless.
    fn done(&self) -> bool;

    /// Hook used by [`Relaxer::prerelax`](crate::Relaxer::prerelax) to
    /// silence change notifications while it runs.
    fn set_notifications(&mut self, enabled: bool) {
        let _ = enabled;
    }
}

/// Binds an algorithm to a shared model so a relaxer can drive it.
///
/// The algorithm is initialized lazily on the first step.
pub struct LayoutProcess<A, G: Graph, P: PointModel> {
    algorithm: A,
    model: Arc<LayoutModel<G, P>>,
    initialized: bool,
}

impl<A, G: Graph, P: PointModel> core::fmt::Debug for LayoutProcess<A, G, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutProcess")
            .field("model", &self.model)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl<A, G, P> LayoutProcess<A, G, P>
where
    A: LayoutAlgorithm<G, P>,
    G: Graph,
    P: PointModel,
{
    /// Pair `algorithm` with `model`.
    pub fn new(algorithm: A, model: Arc<LayoutModel<G, P>>) -> Self {
        Self {
            algorithm,
            model,
            initialized: false,
        }
    }

    /// The driven model.
    pub fn model(&self) -> &Arc<LayoutModel<G, P>> {
        &self.model
    }

    /// The driven algorithm.
    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// Take the algorithm back.
    pub fn into_algorithm(self) -> A {
        self.algorithm
    }
}

impl<A, G, P> IterativeProcess for LayoutProcess<A, G, P>
where
    A: LayoutAlgorithm<G, P>,
    G: Graph,
    P: PointModel,
{
    fn step(&mut self) -> Result<(), LayoutError> {
        if !self.initialized {
            self.algorithm.initialize(&self.model)?;
            self.initialized = true;
        }
        self.algorithm.step(&self.model)
    }

    fn done(&self) -> bool {
        self.algorithm.done()
    }

    fn set_notifications(&mut self, enabled: bool) {
        self.model.set_notifications(enabled);
    }
}
