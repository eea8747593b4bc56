//! Canonical identity for graphs up to isomorphism.
//!
//! The canonical form is found by individualization-refinement: vertices are
//! split into an ordered partition by iterated neighbour counting, a vertex of
//! the first non-trivial cell is individualized, and the search recurses until
//! every cell is a singleton. Each leaf orders the vertices; the signature is
//! the smallest graph6 string over all leaves. The tree is built from
//! structure alone, so the minimum depends only on the isomorphism class.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{DenseGraph, SimpleGraph};
use crate::graph6;

/// graph6 string of a canonically labeled graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn canonicalize(graph: &SimpleGraph) -> Result<Signature> {
    let (dense, _) = graph.to_dense()?;
    Ok(canonical_form(&dense).0)
}

/// Returns the signature together with the graph relabeled into canonical order.
pub fn canonical_form(graph: &DenseGraph) -> (Signature, DenseGraph) {
    let initial = if graph.order() == 0 {
        Vec::new()
    } else {
        vec![(0..graph.order()).collect()]
    };
    let mut best: Option<(String, DenseGraph)> = None;
    search(graph, initial, &mut best);
    match best {
        Some((code, labeled)) => (Signature(code), labeled),
        // The search always reaches at least one leaf.
        None => (Signature(graph6::encode(graph)), graph.clone()),
    }
}

type Partition = Vec<Vec<usize>>;

fn search(graph: &DenseGraph, cells: Partition, best: &mut Option<(String, DenseGraph)>) {
    let cells = refine(graph, cells);
    let Some(target) = cells.iter().position(|cell| cell.len() > 1) else {
        let order: Vec<usize> = cells.iter().map(|cell| cell[0]).collect();
        let labeled = graph.permuted(&order);
        let code = graph6::encode(&labeled);
        if best.as_ref().is_none_or(|(current, _)| code < *current) {
            *best = Some((code, labeled));
        }
        return;
    };

    let mut explored: Vec<usize> = Vec::new();
    for &v in &cells[target] {
        // Swapping twins is an automorphism fixing the partition, so their subtrees coincide.
        if explored.iter().any(|&w| are_twins(graph, v, w)) {
            continue;
        }
        explored.push(v);

        let mut next = Vec::with_capacity(cells.len() + 1);
        next.extend_from_slice(&cells[..target]);
        next.push(vec![v]);
        next.push(cells[target].iter().copied().filter(|&u| u != v).collect());
        next.extend_from_slice(&cells[target + 1..]);
        search(graph, next, best);
    }
}

fn are_twins(graph: &DenseGraph, u: usize, v: usize) -> bool {
    let mask = !((1u64 << u) | (1u64 << v));
    graph.neighbors(u) & mask == graph.neighbors(v) & mask
}

/// Splits cells by how many neighbours each vertex has in every cell, until stable.
fn refine(graph: &DenseGraph, mut cells: Partition) -> Partition {
    loop {
        let masks: Vec<u64> = cells
            .iter()
            .map(|cell| cell.iter().fold(0u64, |mask, &v| mask | 1 << v))
            .collect();
        let mut refined: Partition = Vec::with_capacity(cells.len());
        for cell in &cells {
            if cell.len() == 1 {
                refined.push(cell.clone());
                continue;
            }
            let mut keyed: Vec<(Vec<u32>, usize)> = cell
                .iter()
                .map(|&v| {
                    let counts = masks
                        .iter()
                        .map(|mask| (graph.neighbors(v) & mask).count_ones())
                        .collect();
                    (counts, v)
                })
                .collect();
            keyed.sort();
            let mut start = 0;
            for i in 1..=keyed.len() {
                if i == keyed.len() || keyed[i].0 != keyed[start].0 {
                    refined.push(keyed[start..i].iter().map(|(_, v)| *v).collect());
                    start = i;
                }
            }
        }
        if refined.len() == cells.len() {
            return refined;
        }
        cells = refined;
    }
}

/// A graph held in canonical labeling, identified by its signature.
#[derive(Debug, Clone)]
pub struct CanonicalGraph {
    signature: Signature,
    dense: DenseGraph,
    graph: SimpleGraph,
}

impl CanonicalGraph {
    pub fn new(graph: &SimpleGraph) -> Result<Self> {
        let (dense, _) = graph.to_dense()?;
        Ok(Self::from_dense(&dense))
    }

    pub fn from_dense(dense: &DenseGraph) -> Self {
        let (signature, labeled) = canonical_form(dense);
        CanonicalGraph {
            signature,
            graph: labeled.to_simple(),
            dense: labeled,
        }
    }

    /// Decodes a stored signature, which must already be in canonical form.
    pub fn from_signature(signature: &Signature) -> Result<Self> {
        let dense = graph6::decode(signature.as_str())?;
        let graph = Self::from_dense(&dense);
        if graph.signature != *signature {
            return Err(Error::InvalidGraph6 {
                input: signature.to_string(),
                reason: format!("not in canonical form, expected {}", graph.signature),
            });
        }
        Ok(graph)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn graph(&self) -> &SimpleGraph {
        &self.graph
    }

    pub fn dense(&self) -> &DenseGraph {
        &self.dense
    }

    pub fn node_count(&self) -> usize {
        self.dense.order()
    }

    pub fn edge_count(&self) -> usize {
        self.dense.size()
    }
}

impl PartialEq for CanonicalGraph {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

impl Eq for CanonicalGraph {}

impl Hash for CanonicalGraph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn sig(edges: &[(usize, usize)]) -> Signature {
        canonicalize(&SimpleGraph::from_edges(edges.iter().copied()).unwrap()).unwrap()
    }

    #[test]
    fn relabeling_keeps_the_signature() {
        let g = SimpleGraph::from_edges([(0, 1), (1, 2), (2, 3), (3, 0), (0, 2), (3, 4)]).unwrap();
        let mapping: HashMap<usize, usize> =
            [(0, 40), (1, 12), (2, 7), (3, 99), (4, 3)].into_iter().collect();
        let relabeled = g.relabel(&mapping).unwrap();
        assert_eq!(canonicalize(&g).unwrap(), canonicalize(&relabeled).unwrap());
    }

    #[test]
    fn small_non_isomorphic_graphs_differ() {
        let graphs = [
            sig(&[]),
            sig(&[(0, 1)]),
            sig(&[(0, 1), (1, 2)]),
            sig(&[(0, 1), (2, 3)]),
            sig(&[(0, 1), (1, 2), (2, 0)]),
            sig(&[(0, 1), (1, 2), (2, 3)]),
            sig(&[(0, 1), (0, 2), (0, 3)]),
            sig(&[(0, 1), (1, 2), (2, 3), (3, 0)]),
            sig(&[(0, 1), (1, 2), (2, 0), (2, 3)]),
            // Both 3-regular on 6 vertices: the prism and K_3,3.
            sig(&[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (0, 3), (1, 4), (2, 5)]),
            sig(&[(0, 3), (0, 4), (0, 5), (1, 3), (1, 4), (1, 5), (2, 3), (2, 4), (2, 5)]),
        ];
        for (i, a) in graphs.iter().enumerate() {
            for b in &graphs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn regular_graphs_with_equal_refinement() {
        // C_6 and two disjoint triangles are both 2-regular on 6 vertices;
        // refinement alone cannot separate them.
        let c6 = sig(&[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0)]);
        let two_triangles = sig(&[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)]);
        assert_ne!(c6, two_triangles);
        let c6_shuffled = sig(&[(3, 0), (0, 5), (5, 2), (2, 1), (1, 4), (4, 3)]);
        assert_eq!(c6, c6_shuffled);
    }

    #[test]
    fn canonical_graph_is_labeled_by_its_signature() {
        let g = SimpleGraph::from_edges([(5, 9), (9, 2)]).unwrap();
        let canonical = CanonicalGraph::new(&g).unwrap();
        assert_eq!(canonical.graph().nodes(), vec![0, 1, 2]);
        assert_eq!(graph6::encode(canonical.dense()), canonical.signature().as_str());
        let decoded = CanonicalGraph::from_signature(canonical.signature()).unwrap();
        assert_eq!(decoded, canonical);
        assert_eq!(decoded.dense(), canonical.dense());
    }

    #[test]
    fn empty_graph_signature() {
        assert_eq!(sig(&[]).as_str(), "?");
        let empty = CanonicalGraph::from_signature(&Signature("?".to_string())).unwrap();
        assert_eq!(empty.node_count(), 0);
    }

    #[test]
    fn non_canonical_strings_are_rejected() {
        // P_3 with the middle vertex first; the canonical labeling differs.
        let g = DenseGraph::from_edges(3, &[(0, 1), (0, 2)]).unwrap();
        let raw = Signature(graph6::encode(&g));
        let canonical = canonical_form(&g).0;
        if raw != canonical {
            assert!(CanonicalGraph::from_signature(&raw).is_err());
        }
        assert_eq!(CanonicalGraph::from_signature(&canonical).unwrap().signature(), &canonical);
    }

    #[test]
    fn complete_graph_needs_one_leaf() {
        let dense = DenseGraph::from_edges(
            10,
            &(0..10)
                .flat_map(|u| ((u + 1)..10).map(move |v| (u, v)))
                .collect::<Vec<_>>(),
        )
        .unwrap();
        let (signature, labeled) = canonical_form(&dense);
        assert_eq!(labeled, dense);
        assert_eq!(signature.as_str(), graph6::encode(&dense));
    }
}
