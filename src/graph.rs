use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use petgraph::Undirected;
use petgraph::algo::is_isomorphic;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::graphmap::UnGraphMap;

use crate::error::{Error, Result};

/// Largest vertex count the bitset representation can hold.
pub const MAX_VERTICES: usize = 64;

/// A simple undirected graph over arbitrary `usize` vertex labels.
#[derive(Clone)]
pub struct SimpleGraph {
    inner: UnGraphMap<usize, ()>,
}

impl SimpleGraph {
    pub fn new() -> Self {
        SimpleGraph {
            inner: UnGraphMap::new(),
        }
    }

    pub fn from_edges<I>(edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut graph = SimpleGraph::new();
        for (u, v) in edges {
            graph.add_edge(u, v)?;
        }
        Ok(graph)
    }

    pub fn add_node(&mut self, v: usize) {
        self.inner.add_node(v);
    }

    pub fn add_edge(&mut self, u: usize, v: usize) -> Result<()> {
        if u == v {
            return Err(Error::SelfLoop(u));
        }
        self.inner.add_edge(u, v, ());
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Vertices in ascending order.
    pub fn nodes(&self) -> Vec<usize> {
        self.inner.nodes().sorted().collect()
    }

    /// Edges as `(min, max)` pairs in ascending order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.inner
            .all_edges()
            .map(|(u, v, _)| if u < v { (u, v) } else { (v, u) })
            .sorted()
            .collect()
    }

    /// The edge-induced subgraph on `edges`: exactly the vertices those edges touch.
    /// Pairs that are not edges of `self` are ignored.
    pub fn edge_subgraph(&self, edges: &[(usize, usize)]) -> SimpleGraph {
        let mut sub = SimpleGraph::new();
        for &(u, v) in edges {
            if self.inner.contains_edge(u, v) {
                sub.inner.add_edge(u, v, ());
            }
        }
        sub
    }

    pub fn without_isolated(&self) -> SimpleGraph {
        let mut cleaned = self.clone();
        let isolated: Vec<usize> = cleaned
            .inner
            .nodes()
            .filter(|&v| cleaned.inner.neighbors(v).next().is_none())
            .collect();
        for v in isolated {
            cleaned.inner.remove_node(v);
        }
        cleaned
    }

    /// Relabels vertices through `mapping`; vertices missing from it keep their label.
    pub fn relabel(&self, mapping: &HashMap<usize, usize>) -> Result<SimpleGraph> {
        let image = |v: usize| mapping.get(&v).copied().unwrap_or(v);
        let mut out = SimpleGraph::new();
        for v in self.inner.nodes() {
            out.add_node(image(v));
        }
        for (u, v) in self.edges() {
            out.add_edge(image(u), image(v))?;
        }
        Ok(out)
    }

    /// Dense bitset form, with `labels[i]` naming the vertex stored at index `i`.
    pub fn to_dense(&self) -> Result<(DenseGraph, Vec<usize>)> {
        let labels = self.nodes();
        let index: HashMap<usize, usize> =
            labels.iter().copied().enumerate().map(|(i, v)| (v, i)).collect();
        let mut dense = DenseGraph::new(labels.len())?;
        for (u, v) in self.edges() {
            dense.add_edge(index[&u], index[&v]);
        }
        Ok((dense, labels))
    }

    /// Compact petgraph form for the algorithms that need indexable graphs.
    pub fn to_indexed(&self) -> Graph<(), (), Undirected> {
        let labels = self.nodes();
        let mut graph = Graph::<(), (), Undirected>::with_capacity(labels.len(), self.edge_count());
        let index: HashMap<usize, NodeIndex> =
            labels.iter().map(|&v| (v, graph.add_node(()))).collect();
        for (u, v) in self.edges() {
            graph.add_edge(index[&u], index[&v], ());
        }
        graph
    }

    /// VF2 isomorphism test, independent of the canonical labeling.
    pub fn is_isomorphic(&self, other: &SimpleGraph) -> bool {
        if self.node_count() != other.node_count() || self.edge_count() != other.edge_count() {
            return false;
        }
        is_isomorphic(&self.to_indexed(), &other.to_indexed())
    }
}

impl Default for SimpleGraph {
    fn default() -> Self {
        SimpleGraph::new()
    }
}

/// Labeled equality: same vertex labels and same edges.
impl PartialEq for SimpleGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes() == other.nodes() && self.edges() == other.edges()
    }
}

impl Eq for SimpleGraph {}

impl fmt::Debug for SimpleGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleGraph")
            .field("nodes", &self.nodes())
            .field("edges", &self.edges())
            .finish()
    }
}

/// Adjacency bitsets over vertices `0..n`, `n <= 64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DenseGraph {
    n: usize,
    adj: Vec<u64>,
}

impl DenseGraph {
    pub fn new(n: usize) -> Result<Self> {
        if n > MAX_VERTICES {
            return Err(Error::TooManyVertices {
                found: n,
                max: MAX_VERTICES,
            });
        }
        Ok(DenseGraph { n, adj: vec![0; n] })
    }

    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut dense = DenseGraph::new(n)?;
        for &(u, v) in edges {
            if u == v {
                return Err(Error::SelfLoop(u));
            }
            dense.add_edge(u, v);
        }
        Ok(dense)
    }

    pub fn order(&self) -> usize {
        self.n
    }

    pub fn size(&self) -> usize {
        self.adj.iter().map(|row| row.count_ones() as usize).sum::<usize>() / 2
    }

    pub fn add_edge(&mut self, u: usize, v: usize) {
        debug_assert!(u < self.n && v < self.n && u != v);
        self.adj[u] |= 1 << v;
        self.adj[v] |= 1 << u;
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.adj[u] >> v & 1 == 1
    }

    pub fn neighbors(&self, v: usize) -> u64 {
        self.adj[v]
    }

    pub fn degree(&self, v: usize) -> usize {
        self.adj[v].count_ones() as usize
    }

    /// Degrees in descending order.
    pub fn degree_sequence(&self) -> Vec<usize> {
        (0..self.n)
            .map(|v| self.degree(v))
            .sorted_by(|a, b| b.cmp(a))
            .collect()
    }

    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(self.size());
        for u in 0..self.n {
            for v in (u + 1)..self.n {
                if self.has_edge(u, v) {
                    out.push((u, v));
                }
            }
        }
        out
    }

    /// Relabels so that old vertex `order[i]` becomes vertex `i`.
    pub fn permuted(&self, order: &[usize]) -> DenseGraph {
        debug_assert_eq!(order.len(), self.n);
        let mut position = vec![0; self.n];
        for (new, &old) in order.iter().enumerate() {
            position[old] = new;
        }
        let mut out = DenseGraph {
            n: self.n,
            adj: vec![0; self.n],
        };
        for (u, v) in self.edges() {
            out.add_edge(position[u], position[v]);
        }
        out
    }

    pub fn to_simple(&self) -> SimpleGraph {
        let mut graph = SimpleGraph::new();
        for v in 0..self.n {
            graph.add_node(v);
        }
        for (u, v) in self.edges() {
            graph.inner.add_edge(u, v, ());
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize) -> SimpleGraph {
        SimpleGraph::from_edges((0..n - 1).map(|i| (i, i + 1))).unwrap()
    }

    #[test]
    fn edges_are_normalized_and_sorted() {
        let g = SimpleGraph::from_edges([(3, 1), (2, 0), (1, 2)]).unwrap();
        assert_eq!(g.edges(), vec![(0, 2), (1, 2), (1, 3)]);
        assert_eq!(g.nodes(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn self_loops_are_rejected() {
        assert!(matches!(
            SimpleGraph::from_edges([(1, 1)]),
            Err(Error::SelfLoop(1))
        ));
    }

    #[test]
    fn edge_subgraph_drops_untouched_vertices() {
        let g = path(5);
        let sub = g.edge_subgraph(&[(0, 1), (3, 4)]);
        assert_eq!(sub.nodes(), vec![0, 1, 3, 4]);
        assert_eq!(sub.edge_count(), 2);
        // (0, 4) is not an edge of the path.
        assert_eq!(g.edge_subgraph(&[(0, 4)]).node_count(), 0);
    }

    #[test]
    fn without_isolated_removes_only_degree_zero() {
        let mut g = path(3);
        g.add_node(10);
        let cleaned = g.without_isolated();
        assert_eq!(cleaned.nodes(), vec![0, 1, 2]);
    }

    #[test]
    fn dense_round_trip_keeps_structure() {
        let g = SimpleGraph::from_edges([(10, 20), (20, 30)]).unwrap();
        let (dense, labels) = g.to_dense().unwrap();
        assert_eq!(labels, vec![10, 20, 30]);
        assert_eq!(dense.size(), 2);
        assert!(dense.has_edge(0, 1) && dense.has_edge(1, 2) && !dense.has_edge(0, 2));
        assert_eq!(dense.degree_sequence(), vec![2, 1, 1]);
        assert!(dense.to_simple().is_isomorphic(&g));
    }

    #[test]
    fn permuted_moves_edges() {
        let dense = DenseGraph::from_edges(3, &[(0, 1)]).unwrap();
        let moved = dense.permuted(&[2, 0, 1]);
        assert_eq!(moved.edges(), vec![(1, 2)]);
    }

    #[test]
    fn too_many_vertices() {
        assert!(matches!(
            DenseGraph::new(MAX_VERTICES + 1),
            Err(Error::TooManyVertices { .. })
        ));
    }

    #[test]
    fn vf2_distinguishes_path_from_star() {
        let p4 = path(4);
        let star = SimpleGraph::from_edges([(0, 1), (0, 2), (0, 3)]).unwrap();
        assert!(!p4.is_isomorphic(&star));
        let relabeled = SimpleGraph::from_edges([(7, 5), (5, 9), (9, 8)]).unwrap();
        assert!(p4.is_isomorphic(&relabeled));
    }
}
