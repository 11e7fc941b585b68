// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The narrow view of a graph that layouts and pickers need.

use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashMap;

/// Read-only graph capability: nodes, edges and adjacency.
///
/// Layout code never mutates the graph; during a relaxation pass it is treated
/// as frozen.
pub trait Graph: Send + Sync {
    /// Node identity.
    type Node: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    /// Edge identity.
    type Edge: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Every node.
    fn nodes(&self) -> Box<dyn Iterator<Item = Self::Node> + '_>;

    /// Every edge.
    fn edges(&self) -> Box<dyn Iterator<Item = Self::Edge> + '_>;

    /// Whether `node` belongs to the graph.
    fn contains_node(&self, node: &Self::Node) -> bool;

    /// The two ends of `edge`, or `None` if it is not part of the graph.
    fn endpoints(&self, edge: &Self::Edge) -> Option<(Self::Node, Self::Node)>;

    /// Nodes adjacent to `node`, ignoring direction.
    fn neighbors(&self, node: &Self::Node) -> Box<dyn Iterator<Item = Self::Node> + '_>;

    /// Number of incident edge ends.
    fn degree(&self, node: &Self::Node) -> usize {
        self.neighbors(node).count()
    }

    /// Number of nodes.
    fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Number of edges.
    fn edge_count(&self) -> usize {
        self.edges().count()
    }
}

/// A small undirected adjacency-list graph with `usize` edge ids.
///
/// Good enough to drive layouts in tests and demos; not a graph library.
#[derive(Clone, Debug)]
pub struct SimpleGraph<N> {
    nodes: Vec<N>,
    index: HashMap<N, usize>,
    edges: Vec<(usize, usize)>,
    incident: Vec<Vec<usize>>,
}

impl<N> Default for SimpleGraph<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            incident: Vec::new(),
        }
    }
}

impl<N: Clone + Eq + Hash> SimpleGraph<N> {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph with the given nodes and `(a, b)` edges; edge ends are added as
    /// nodes when missing.
    pub fn from_edges(
        nodes: impl IntoIterator<Item = N>,
        edges: impl IntoIterator<Item = (N, N)>,
    ) -> Self {
        let mut g = Self::new();
        for n in nodes {
            g.add_node(n);
        }
        for (a, b) in edges {
            g.add_edge(a, b);
        }
        g
    }

    /// Add a node; returns `false` if it was already present.
    pub fn add_node(&mut self, node: N) -> bool {
        if self.index.contains_key(&node) {
            return false;
        }
        self.index.insert(node.clone(), self.nodes.len());
        self.nodes.push(node);
        self.incident.push(Vec::new());
        true
    }

    /// Connect `a` and `b`, adding either as a node if needed. Returns the edge id.
    pub fn add_edge(&mut self, a: N, b: N) -> usize {
        self.add_node(a.clone());
        self.add_node(b.clone());
        let (ia, ib) = (self.index[&a], self.index[&b]);
        let id = self.edges.len();
        self.edges.push((ia, ib));
        self.incident[ia].push(id);
        if ia != ib {
            self.incident[ib].push(id);
        }
        id
    }
}

impl<N> Graph for SimpleGraph<N>
where
    N: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    type Node = N;
    type Edge = usize;

    fn nodes(&self) -> Box<dyn Iterator<Item = N> + '_> {
        Box::new(self.nodes.iter().cloned())
    }

    fn edges(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(0..self.edges.len())
    }

    fn contains_node(&self, node: &N) -> bool {
        self.index.contains_key(node)
    }

    fn endpoints(&self, edge: &usize) -> Option<(N, N)> {
        let &(a, b) = self.edges.get(*edge)?;
        Some((self.nodes[a].clone(), self.nodes[b].clone()))
    }

    fn neighbors(&self, node: &N) -> Box<dyn Iterator<Item = N> + '_> {
        let Some(&i) = self.index.get(node) else {
            return Box::new(core::iter::empty());
        };
        Box::new(self.incident[i].iter().map(move |&e| {
            let (a, b) = self.edges[e];
            self.nodes[if a == i { b } else { a }].clone()
        }))
    }

    fn degree(&self, node: &N) -> usize {
        self.index.get(node).map_or(0, |&i| self.incident[i].len())
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacency_is_undirected() {
        let g = SimpleGraph::from_edges(["d"], [("a", "b"), ("b", "c")]);
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 2);
        let mut around_b: Vec<_> = g.neighbors(&"b").collect();
        around_b.sort_unstable();
        assert_eq!(around_b, ["a", "c"]);
        assert_eq!(g.degree(&"d"), 0);
        assert_eq!(g.endpoints(&1), Some(("b", "c")));
        assert_eq!(g.endpoints(&7), None);
    }

    #[test]
    fn self_loops_count_once() {
        let mut g = SimpleGraph::new();
        g.add_edge(1_u8, 1);
        assert_eq!(g.degree(&1), 1);
        assert_eq!(g.neighbors(&1).collect::<Vec<_>>(), [1]);
        assert!(!g.add_node(1));
    }
}
