// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the layout model and the relaxer.

use understory_spatial::SpatialError;

/// Everything that can go wrong while reading, writing or relaxing a layout.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// A size, point or interval was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The node is not part of the graph behind the model.
    #[error("node {0} is not part of the graph")]
    UnknownNode(String),
    /// Positions changed underneath a traversal.
    ///
    /// Read-only traversals retry when they see this; it does not reach
    /// callers of the picking API.
    #[error("positions changed during traversal")]
    ConcurrentMutation,
    /// A layout step failed.
    #[error("layout step failed: {0}")]
    Algorithm(String),
    /// The background thread could not be started.
    #[error("could not start relaxer thread: {0}")]
    Spawn(String),
    /// An index could not be built from the current configuration.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

impl LayoutError {
    pub(crate) fn unknown(node: &impl core::fmt::Debug) -> Self {
        Self::UnknownNode(format!("{node:?}"))
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }
}
