//! Distinct edge-induced subgraphs of a host, one per isomorphism class.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::debug;

use crate::canonical::{CanonicalGraph, Signature};
use crate::error::Result;
use crate::graph::{DenseGraph, SimpleGraph};
use crate::partition::{WorkerPool, assigned_combinations};
use crate::progress;

/// Frozen arena of canonical graphs, referenced by index everywhere downstream.
#[derive(Debug, Clone, Default)]
pub struct Population {
    graphs: Vec<CanonicalGraph>,
    index: HashMap<Signature, usize>,
}

impl Population {
    /// Builds a population, keeping the first of any repeated class.
    pub fn from_graphs(graphs: impl IntoIterator<Item = CanonicalGraph>) -> Self {
        let mut population = Population::default();
        for graph in graphs {
            population.insert(graph);
        }
        population
    }

    fn insert(&mut self, graph: CanonicalGraph) -> bool {
        if self.index.contains_key(graph.signature()) {
            return false;
        }
        self.index.insert(graph.signature().clone(), self.graphs.len());
        self.graphs.push(graph);
        true
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn get(&self, index: usize) -> &CanonicalGraph {
        &self.graphs[index]
    }

    pub fn index_of(&self, signature: &Signature) -> Option<usize> {
        self.index.get(signature).copied()
    }

    /// Finds the class of an arbitrary graph, if the population has it.
    pub fn lookup(&self, graph: &SimpleGraph) -> Result<Option<usize>> {
        let canonical = CanonicalGraph::new(graph)?;
        Ok(self.index_of(canonical.signature()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalGraph> {
        self.graphs.iter()
    }

    pub fn signatures(&self) -> Vec<Signature> {
        self.graphs.iter().map(|g| g.signature().clone()).collect()
    }
}

/// The subgraph formed by `edges` and exactly the vertices they touch.
pub(crate) fn edge_induced(edges: &[(usize, usize)]) -> Result<DenseGraph> {
    let touched: Vec<usize> = edges
        .iter()
        .flat_map(|&(u, v)| [u, v])
        .sorted()
        .dedup()
        .collect();
    let position: HashMap<usize, usize> =
        touched.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let compact: Vec<(usize, usize)> = edges
        .iter()
        .map(|(u, v)| (position[u], position[v]))
        .collect();
    DenseGraph::from_edges(touched.len(), &compact)
}

/// Every isomorphism class of edge-induced subgraph of `host`, in order of
/// edge count and then of first occurrence among the edge subsets. The empty
/// graph and the single edge are always present exactly once.
pub fn enumerate_distinct_edge_subgraphs(
    host: &SimpleGraph,
    pool: &WorkerPool,
    show_progress: bool,
) -> Result<Population> {
    let (dense_host, _) = host.to_dense()?;
    let edges = dense_host.edges();
    let workers = pool.workers();
    let mut population = Population::default();

    let pb = progress::bar(edges.len() as u64 + 1, "subgraphs", show_progress);
    for k in 0..=edges.len() {
        pb.set_message(format!("{k} edges"));
        // Graphs with different edge counts are never isomorphic, so each level
        // is deduplicated on its own.
        let parts = pool.run(|worker| -> Result<Vec<(usize, CanonicalGraph)>> {
            let mut seen: HashSet<Signature> = HashSet::new();
            let mut found = Vec::new();
            for (global, subset) in assigned_combinations(&edges, k, worker, workers) {
                let graph = CanonicalGraph::from_dense(&edge_induced(&subset)?);
                if seen.insert(graph.signature().clone()) {
                    found.push((global, graph));
                }
            }
            Ok(found)
        });

        let mut level = Vec::new();
        for part in parts {
            level.extend(part?);
        }
        level.sort_by_key(|(global, _)| *global);
        let before = population.len();
        for (_, graph) in level {
            population.insert(graph);
        }
        debug!(k, classes = population.len() - before, "enumerated subgraph level");
        pb.inc(1);
    }
    pb.finish_with_message("done");

    for sentinel in [DenseGraph::new(0)?, DenseGraph::from_edges(2, &[(0, 1)])?] {
        if population.insert(CanonicalGraph::from_dense(&sentinel)) {
            debug!("appended sentinel subgraph missing from the host");
        }
    }
    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::{complete_graph, cycle_graph, path_graph};

    fn population_of(host: &SimpleGraph, workers: usize) -> Population {
        let pool = WorkerPool::new(workers).unwrap();
        enumerate_distinct_edge_subgraphs(host, &pool, false).unwrap()
    }

    fn sig(edges: &[(usize, usize)]) -> Signature {
        CanonicalGraph::new(&SimpleGraph::from_edges(edges.iter().copied()).unwrap())
            .unwrap()
            .signature()
            .clone()
    }

    #[test]
    fn triangle_has_four_classes() {
        let population = population_of(&complete_graph(3).unwrap(), 2);
        assert_eq!(population.len(), 4);
        let expected = [
            sig(&[]),
            sig(&[(0, 1)]),
            sig(&[(0, 1), (1, 2)]),
            sig(&[(0, 1), (1, 2), (2, 0)]),
        ];
        assert_eq!(population.signatures(), expected);
    }

    #[test]
    fn k4_has_eleven_classes() {
        // Graphs without isolated vertices on at most 4 vertices, by edge count:
        // 1 + 1 + 2 + 3 + 2 + 1 + 1.
        let population = population_of(&complete_graph(4).unwrap(), 3);
        assert_eq!(population.len(), 11);
    }

    #[test]
    fn result_does_not_depend_on_worker_count() {
        let host = cycle_graph(6).unwrap();
        let one = population_of(&host, 1).signatures();
        let four = population_of(&host, 4).signatures();
        assert_eq!(one, four);
    }

    #[test]
    fn subgraphs_have_no_isolated_vertices() {
        let population = population_of(&path_graph(5).unwrap(), 2);
        for graph in population.iter() {
            let dense = graph.dense();
            assert!((0..dense.order()).all(|v| dense.degree(v) > 0));
        }
    }

    #[test]
    fn edgeless_host_gets_both_sentinels() {
        let mut host = SimpleGraph::new();
        host.add_node(0);
        host.add_node(1);
        let population = population_of(&host, 1);
        assert_eq!(population.signatures(), vec![sig(&[]), sig(&[(0, 1)])]);
    }

    #[test]
    fn lookup_finds_relabeled_members() {
        let population = population_of(&complete_graph(4).unwrap(), 2);
        let star = SimpleGraph::from_edges([(9, 3), (9, 4), (9, 5)]).unwrap();
        assert!(population.lookup(&star).unwrap().is_some());
        let k5 = complete_graph(5).unwrap();
        assert_eq!(population.lookup(&k5).unwrap(), None);
    }
}
