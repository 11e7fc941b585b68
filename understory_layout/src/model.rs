// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The authoritative node → position map.
//!
//! [`LayoutModel`] is shared between one writer (a relaxer thread, or the
//! caller when idle) and any number of readers (renderers, index rebuilds,
//! pick queries). Every operation takes `&self`; the map sits behind a
//! `parking_lot::RwLock` and no lock is held while user code runs, so a
//! listener or layout step may call back into the model freely.
//!
//! ## Laziness
//!
//! A node gets a position the first time it is read through [`LayoutModel::get`]
//! (or written, locked, or included in a [`LayoutModel::snapshot`]). The
//! model's [`Initializer`] decides where; changing the bounds afterwards does
//! not move existing nodes.
//!
//! ## Locking
//!
//! A locked node keeps its position: [`LayoutModel::set`] and
//! [`LayoutModel::offset`] silently ignore it, so algorithms need not check.
//! Reads are unaffected.
//!
//! ## Versions
//!
//! [`LayoutModel::version`] increases on every effective position write,
//! reset and resize. It starts at zero for every model, so indexes that may
//! see more than one model compare [`LayoutModel::id`] as well before reusing
//! what they built.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use kurbo::Point;
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::trace;
use understory_spatial::NodePositions;

use crate::algorithm::LayoutAlgorithm;
use crate::error::LayoutError;
use crate::graph::Graph;
use crate::init::Initializer;
use crate::point::PointModel;
use crate::types::{LayoutEvent, LayoutSize, NodeFlags};

/// Source of [`LayoutModel::id`]. Zero is never handed out.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Change listener signature.
pub type Listener<N> = dyn Fn(&LayoutEvent<N>) + Send + Sync;

struct State<N, P> {
    size: LayoutSize,
    positions: HashMap<N, P>,
    flags: HashMap<N, NodeFlags>,
    placed: u64,
}

/// Positions of every node of a graph, safe to share across threads.
pub struct LayoutModel<G: Graph, P: PointModel = Point> {
    id: u64,
    graph: Arc<G>,
    state: RwLock<State<G::Node, P>>,
    initializer: Initializer<G::Node, P>,
    version: AtomicU64,
    listeners: RwLock<Vec<Arc<Listener<G::Node>>>>,
    notifications: AtomicBool,
}

impl<G: Graph, P: PointModel> core::fmt::Debug for LayoutModel<G, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.read();
        f.debug_struct("LayoutModel")
            .field("id", &self.id)
            .field("size", &state.size)
            .field("placed", &state.positions.len())
            .field("nodes", &self.graph.node_count())
            .field("version", &self.version())
            .field("initializer", &self.initializer)
            .finish_non_exhaustive()
    }
}

impl<G: Graph, P: PointModel> LayoutModel<G, P> {
    /// Model over `graph` with bounds `size` and the default random initializer.
    pub fn new(graph: Arc<G>, size: LayoutSize) -> Result<Self, LayoutError> {
        size.validate()?;
        Ok(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            graph,
            state: RwLock::new(State {
                size,
                positions: HashMap::new(),
                flags: HashMap::new(),
                placed: 0,
            }),
            initializer: Initializer::default(),
            version: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
            notifications: AtomicBool::new(true),
        })
    }

    /// Replace the initializer used for nodes that have no position yet.
    #[must_use]
    pub fn with_initializer(mut self, initializer: Initializer<G::Node, P>) -> Self {
        self.initializer = initializer;
        self
    }

    /// Identifier unique among all models created by this process.
    ///
    /// Unlike the model's address it is never reused after the model is
    /// dropped.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The graph being laid out.
    pub fn graph(&self) -> &Arc<G> {
        &self.graph
    }

    /// Current bounds.
    pub fn size(&self) -> LayoutSize {
        self.state.read().size
    }

    /// Change the 2D bounds, keeping the current depth.
    ///
    /// Existing positions are not rescaled; only nodes placed afterwards use
    /// the new bounds.
    pub fn set_size(&self, width: f64, height: f64) -> Result<(), LayoutError> {
        let depth = self.size().depth;
        self.set_size_3d(width, height, depth)
    }

    /// Change all three extents. See [`LayoutModel::set_size`].
    pub fn set_size_3d(&self, width: f64, height: f64, depth: f64) -> Result<(), LayoutError> {
        let size = LayoutSize::new_3d(width, height, depth);
        size.validate()?;
        {
            let mut state = self.state.write();
            if state.size == size {
                return Ok(());
            }
            state.size = size;
        }
        self.bump();
        self.notify(&LayoutEvent::Resized(size));
        Ok(())
    }

    /// Position of `node`, placing it first if it has none.
    pub fn get(&self, node: &G::Node) -> Result<P, LayoutError> {
        self.check_known(node)?;
        if let Some(p) = self.state.read().positions.get(node) {
            return Ok(*p);
        }
        let mut state = self.write_placed(core::slice::from_ref(node));
        Ok(self.position_or_place(&mut state, node))
    }

    /// Position of `node` if it has one; never places.
    pub fn peek(&self, node: &G::Node) -> Option<P> {
        self.state.read().positions.get(node).copied()
    }

    /// Move `node` to `point`. Ignored for locked nodes.
    pub fn set(&self, node: &G::Node, point: P) -> Result<(), LayoutError> {
        if !point.is_finite() {
            return Err(LayoutError::invalid(format!(
                "position of {node:?} must be finite, got {point:?}"
            )));
        }
        self.write_with(node, |_| point)
    }

    /// Move `node` by a delta. Ignored for locked nodes.
    pub fn offset(&self, node: &G::Node, dx: f64, dy: f64, dz: f64) -> Result<(), LayoutError> {
        if !(dx.is_finite() && dy.is_finite() && dz.is_finite()) {
            return Err(LayoutError::invalid(format!(
                "offset of {node:?} must be finite, got ({dx}, {dy}, {dz})"
            )));
        }
        self.write_with(node, |mut p| {
            p.offset(dx, dy, dz);
            p
        })
    }

    fn write_with(&self, node: &G::Node, f: impl FnOnce(P) -> P) -> Result<(), LayoutError> {
        self.check_known(node)?;
        {
            let mut state = self.write_placed(core::slice::from_ref(node));
            if Self::flags_in(&state, node).contains(NodeFlags::LOCKED) {
                trace!(?node, "ignoring write to locked node");
                return Ok(());
            }
            let current = self.position_or_place(&mut state, node);
            state.positions.insert(node.clone(), f(current));
        }
        self.bump();
        self.notify(&LayoutEvent::Moved(node.clone()));
        Ok(())
    }

    /// Lock or unlock `node`. Locking places the node first, so the position
    /// it is frozen at is well defined.
    pub fn lock(&self, node: &G::Node, locked: bool) -> Result<(), LayoutError> {
        self.check_known(node)?;
        let mut state = self.write_placed(core::slice::from_ref(node));
        self.position_or_place(&mut state, node);
        Self::update_flags(&mut state, node, NodeFlags::LOCKED, locked);
        Ok(())
    }

    /// Lock or unlock every node of the graph.
    pub fn lock_all(&self, locked: bool) {
        let nodes: Vec<_> = self.graph.nodes().collect();
        let mut state = self.write_placed(&nodes);
        for node in nodes {
            self.position_or_place(&mut state, &node);
            Self::update_flags(&mut state, &node, NodeFlags::LOCKED, locked);
        }
    }

    /// Whether `node` is locked. Unknown nodes are not.
    pub fn is_locked(&self, node: &G::Node) -> bool {
        self.flags(node).contains(NodeFlags::LOCKED)
    }

    /// Include or exclude `node` from picking.
    pub fn set_pickable(&self, node: &G::Node, pickable: bool) -> Result<(), LayoutError> {
        self.check_known(node)?;
        let mut state = self.state.write();
        Self::update_flags(&mut state, node, NodeFlags::PICKABLE, pickable);
        Ok(())
    }

    /// Whether `node` takes part in picking. Unknown nodes do not.
    pub fn is_pickable(&self, node: &G::Node) -> bool {
        self.graph.contains_node(node) && self.flags(node).contains(NodeFlags::PICKABLE)
    }

    /// Current flags of `node`; defaults for nodes never flagged.
    pub fn flags(&self, node: &G::Node) -> NodeFlags {
        Self::flags_in(&self.state.read(), node)
    }

    /// Forget every position. Flags are kept; nodes are placed again on next access.
    pub fn reset(&self) {
        {
            let mut state = self.state.write();
            state.positions.clear();
            state.placed = 0;
        }
        self.bump();
        self.notify(&LayoutEvent::Reset);
    }

    /// Run `algorithm` from initialization until it reports done or
    /// `max_steps` steps have run. Returns the number of steps taken.
    pub fn accept<A>(&self, algorithm: &mut A, max_steps: usize) -> Result<usize, LayoutError>
    where
        A: LayoutAlgorithm<G, P> + ?Sized,
    {
        algorithm.initialize(self)?;
        let mut steps = 0;
        while steps < max_steps && !algorithm.done() {
            algorithm.step(self)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Whether `node` has a position.
    pub fn contains(&self, node: &G::Node) -> bool {
        self.state.read().positions.contains_key(node)
    }

    /// Number of placed nodes.
    pub fn len(&self) -> usize {
        self.state.read().positions.len()
    }

    /// Whether no node has been placed yet.
    pub fn is_empty(&self) -> bool {
        self.state.read().positions.is_empty()
    }

    /// Monotonic change counter.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Consistent copy of every node's position, in graph order. Places
    /// nodes that have no position yet.
    pub fn snapshot(&self) -> Vec<(G::Node, P)> {
        let nodes: Vec<_> = self.graph.nodes().collect();
        let mut state = self.write_placed(&nodes);
        nodes
            .into_iter()
            .map(|n| {
                let p = self.position_or_place(&mut state, &n);
                (n, p)
            })
            .collect()
    }

    /// Register a change listener. Listeners run on the writing thread, after
    /// the write, with no model lock held.
    pub fn add_listener(&self, listener: impl Fn(&LayoutEvent<G::Node>) + Send + Sync + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Mute or unmute listeners. Writes still bump the version while muted.
    pub fn set_notifications(&self, enabled: bool) {
        self.notifications.store(enabled, Ordering::Release);
    }

    /// Whether listeners are currently called.
    pub fn notifications_enabled(&self) -> bool {
        self.notifications.load(Ordering::Acquire)
    }

    fn check_known(&self, node: &G::Node) -> Result<(), LayoutError> {
        if self.graph.contains_node(node) {
            Ok(())
        } else {
            Err(LayoutError::unknown(node))
        }
    }

    /// Write lock with every node of `nodes` placed.
    ///
    /// An [`Initializer::Custom`] closure is user code, so it runs here before
    /// the lock is taken; it may read the model but must not ask for the
    /// position of a node it is placing. The built-in strategies are placed
    /// under the lock by [`Self::position_or_place`].
    fn write_placed(&self, nodes: &[G::Node]) -> RwLockWriteGuard<'_, State<G::Node, P>> {
        let Initializer::Custom(place) = &self.initializer else {
            return self.state.write();
        };
        loop {
            let (size, missing): (LayoutSize, Vec<&G::Node>) = {
                let state = self.state.read();
                let missing = nodes
                    .iter()
                    .filter(|n| !state.positions.contains_key(*n))
                    .collect();
                (state.size, missing)
            };
            let fresh: Vec<(&G::Node, P)> = missing.into_iter().map(|n| (n, place(n, size))).collect();
            let mut guard = self.state.write();
            let state = &mut *guard;
            for (n, p) in fresh {
                if let Entry::Vacant(e) = state.positions.entry(n.clone()) {
                    e.insert(p);
                    state.placed += 1;
                }
            }
            // A reset between the two locks forgets what was just placed.
            if nodes.iter().all(|n| state.positions.contains_key(n)) {
                return guard;
            }
            trace!("positions reset while placing; placing again");
        }
    }

    fn position_or_place(&self, state: &mut State<G::Node, P>, node: &G::Node) -> P {
        let size = state.size;
        let ordinal = state.placed;
        match state.positions.entry(node.clone()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let p = self.initializer.place(node, size, ordinal);
                state.placed += 1;
                *e.insert(p)
            }
        }
    }

    fn flags_in(state: &State<G::Node, P>, node: &G::Node) -> NodeFlags {
        state.flags.get(node).copied().unwrap_or_default()
    }

    fn update_flags(state: &mut State<G::Node, P>, node: &G::Node, flag: NodeFlags, on: bool) {
        state
            .flags
            .entry(node.clone())
            .or_default()
            .set(flag, on);
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    fn notify(&self, event: &LayoutEvent<G::Node>) {
        if !self.notifications_enabled() {
            return;
        }
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl<G: Graph, P: PointModel> NodePositions<G::Node> for LayoutModel<G, P> {
    fn position_of(&self, node: &G::Node) -> Option<Point> {
        self.get(node).ok().map(|p| p.to_2d())
    }

    fn for_each_position(&self, f: &mut dyn FnMut(&G::Node, Point)) {
        for (n, p) in self.snapshot() {
            f(&n, p.to_2d());
        }
    }
}
