// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An index rebuilt whenever the layout model's version moves.

use core::hash::Hash;

use hashbrown::HashMap;
use kurbo::{Point, Rect};
use parking_lot::Mutex;
use tracing::debug;
use understory_layout::{Graph, LayoutError, LayoutModel, PointModel};

/// Positions as of the last rebuild, projected to 2D.
pub(crate) type Positions<N> = HashMap<N, Point>;

struct Built<I, N> {
    model: u64,
    version: u64,
    index: I,
    positions: Positions<N>,
}

/// Lazily built index keyed by [`LayoutModel::id`] and [`LayoutModel::version`].
///
/// Switching to another model forces a rebuild, even one that happens to live
/// where a dropped model used to.
pub(crate) struct IndexCache<I, N> {
    slot: Mutex<Option<Built<I, N>>>,
}

impl<I, N> Default for IndexCache<I, N> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<I, N: Clone + Eq + Hash> IndexCache<I, N> {
    /// Run `query` against an index that reflects at least the model version
    /// current on entry, rebuilding it with `build` first if needed.
    ///
    /// `build` receives the layout bounds and a fresh snapshot.
    pub(crate) fn query<G, P, R>(
        &self,
        model: &LayoutModel<G, P>,
        build: impl FnOnce(Rect, &Positions<N>) -> Result<I, LayoutError>,
        query: impl FnOnce(&I, &Positions<N>) -> R,
    ) -> Result<R, LayoutError>
    where
        G: Graph<Node = N>,
        P: PointModel,
    {
        let mut slot = self.slot.lock();
        let id = model.id();
        // Read before the snapshot: a write racing the rebuild leaves the
        // stored version behind, which forces another rebuild next time.
        let version = model.version();
        if slot.as_ref().is_none_or(|b| b.model != id || b.version != version) {
            let positions: Positions<N> = model
                .snapshot()
                .into_iter()
                .map(|(n, p)| (n, p.to_2d()))
                .collect();
            let index = build(model.size().to_rect(), &positions)?;
            debug!(model = id, version, nodes = positions.len(), "rebuilt pick index");
            *slot = Some(Built {
                model: id,
                version,
                index,
                positions,
            });
        }
        let Some(built) = slot.as_ref() else {
            return Err(LayoutError::ConcurrentMutation);
        };
        Ok(query(&built.index, &built.positions))
    }

    /// Model version the cached index reflects, if one is built.
    pub(crate) fn version(&self) -> Option<u64> {
        self.slot.lock().as_ref().map(|b| b.version)
    }

    /// Drop the cached index.
    pub(crate) fn clear(&self) {
        *self.slot.lock() = None;
    }
}

impl<I, N> core::fmt::Debug for IndexCache<I, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let version = self.slot.try_lock().and_then(|s| s.as_ref().map(|b| b.version));
        f.debug_struct("IndexCache")
            .field("version", &version)
            .finish_non_exhaustive()
    }
}
