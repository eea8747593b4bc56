//! The subgraph order over a population: `s -> t` when `s` embeds in `t`.

use std::collections::BTreeSet;

use indicatif::ProgressBar;
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::canonical::Signature;
use crate::enumerate::Population;
use crate::error::{Error, Result};
use crate::monomorphism::{could_embed, is_monomorphic};
use crate::partition::{WorkerPool, assigned};
use crate::progress;

/// Strict order relation over population indices, kept transitively closed.
#[derive(Debug, Clone)]
pub struct PosetRelation {
    graph: DiGraphMap<usize, ()>,
}

impl PosetRelation {
    /// One node per population entry and no relations yet.
    pub fn seeded(len: usize) -> Self {
        let mut graph = DiGraphMap::with_capacity(len, 0);
        for i in 0..len {
            graph.add_node(i);
        }
        PosetRelation { graph }
    }

    pub fn from_edges(len: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut relation = PosetRelation::seeded(len);
        for (s, t) in edges {
            relation.add(s, t);
        }
        relation
    }

    /// Records `s < t`. Self pairs are ignored.
    pub fn add(&mut self, s: usize, t: usize) {
        if s != t {
            self.graph.add_edge(s, t, ());
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> Vec<usize> {
        let mut nodes: Vec<usize> = self.graph.nodes().collect();
        nodes.sort_unstable();
        nodes
    }

    pub fn contains(&self, s: usize, t: usize) -> bool {
        self.graph.contains_edge(s, t)
    }

    /// Sorted `(s, t)` pairs.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self.graph.all_edges().map(|(s, t, _)| (s, t)).collect();
        edges.sort_unstable();
        edges
    }

    /// Members strictly below `x`.
    pub fn below(&self, x: usize) -> BTreeSet<usize> {
        self.graph.neighbors_directed(x, Direction::Incoming).collect()
    }

    /// Members strictly above `x`.
    pub fn above(&self, x: usize) -> BTreeSet<usize> {
        self.graph.neighbors_directed(x, Direction::Outgoing).collect()
    }

    pub fn out_degree(&self, x: usize) -> usize {
        self.graph.neighbors_directed(x, Direction::Outgoing).count()
    }

    /// The order ideal generated by `x`: `x` and everything below it.
    pub fn ideal(&self, x: usize) -> BTreeSet<usize> {
        let mut ideal = self.below(x);
        ideal.insert(x);
        ideal
    }

    /// Adds every implied pair; returns how many were missing.
    pub fn close(&mut self) -> usize {
        let mut added = 0;
        for k in self.nodes() {
            let below: Vec<usize> = self.below(k).into_iter().collect();
            let above: Vec<usize> = self.above(k).into_iter().collect();
            for &s in &below {
                for &t in &above {
                    if s != t && !self.graph.contains_edge(s, t) {
                        self.graph.add_edge(s, t, ());
                        added += 1;
                    }
                }
            }
        }
        added
    }

    pub fn is_transitively_closed(&self) -> bool {
        self.nodes().into_iter().all(|k| {
            let above = self.above(k);
            self.below(k)
                .into_iter()
                .all(|s| above.iter().all(|&t| s == t || self.contains(s, t)))
        })
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    /// The relation induced on `members`.
    pub fn restrict(&self, members: &BTreeSet<usize>) -> PosetRelation {
        let mut graph = DiGraphMap::with_capacity(members.len(), 0);
        for &m in members {
            graph.add_node(m);
        }
        for (s, t, _) in self.graph.all_edges() {
            if members.contains(&s) && members.contains(&t) {
                graph.add_edge(s, t, ());
            }
        }
        PosetRelation { graph }
    }
}

/// All pairs `(s, t)` whose target `t` is owned by `worker`.
pub fn discover(
    population: &Population,
    worker: usize,
    workers: usize,
    pb: &ProgressBar,
) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for t in (0..population.len()).filter(|&t| assigned(t, worker, workers)) {
        let target = population.get(t).dense();
        for s in 0..population.len() {
            if s == t {
                continue;
            }
            let source = population.get(s).dense();
            if could_embed(source, target) && is_monomorphic(source, target) {
                edges.push((s, t));
            }
        }
        pb.inc(1);
    }
    debug!(worker, relations = edges.len(), "poset worker finished");
    edges
}

/// Unions worker partials into the closed relation.
pub fn merge(len: usize, parts: impl IntoIterator<Item = Vec<(usize, usize)>>) -> PosetRelation {
    let mut relation = PosetRelation::seeded(len);
    for part in parts {
        for (s, t) in part {
            relation.add(s, t);
        }
    }
    let added = relation.close();
    if added > 0 {
        debug!(added, "closure pass added implied relations");
    }
    relation
}

/// The relation over `population`, built in memory.
pub fn build_poset(population: &Population, pool: &WorkerPool, show_progress: bool) -> Result<PosetRelation> {
    build_poset_with(
        population,
        pool,
        show_progress,
        |worker, pb| Ok(discover(population, worker, pool.workers(), pb)),
        |_, edges| Ok(edges),
    )
}

/// Runs `produce` once per worker, joins, then merges the share `collect`
/// hands back for each worker in order. A worker may return its share
/// directly or only a handle for `collect` to read it back through.
pub fn build_poset_with<W, P, C>(
    population: &Population,
    pool: &WorkerPool,
    show_progress: bool,
    produce: P,
    mut collect: C,
) -> Result<PosetRelation>
where
    W: Send,
    P: Fn(usize, &ProgressBar) -> Result<W> + Sync,
    C: FnMut(usize, W) -> Result<Vec<(usize, usize)>>,
{
    let pb = progress::bar(population.len() as u64, "poset", show_progress);
    let produced = pool.run(|worker| produce(worker, &pb));
    pb.finish_with_message("done");
    let produced = produced.into_iter().collect::<Result<Vec<W>>>()?;

    let mut parts = Vec::with_capacity(produced.len());
    for (worker, share) in produced.into_iter().enumerate() {
        parts.push(collect(worker, share)?);
    }
    let relation = merge(population.len(), parts);
    debug!(
        classes = relation.len(),
        relations = relation.edge_count(),
        "built subgraph poset"
    );
    Ok(relation)
}

/// `below` embeds in `above`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationRecord {
    pub below: Signature,
    pub above: Signature,
}

/// One worker's share of the relation, persisted before the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosetPart {
    pub worker: usize,
    pub workers: usize,
    /// Population size the part was computed against.
    pub classes: usize,
    pub relations: Vec<RelationRecord>,
}

pub fn to_records(relation: &PosetRelation, population: &Population) -> Vec<RelationRecord> {
    edges_to_records(&relation.edges(), population)
}

pub fn edges_to_records(edges: &[(usize, usize)], population: &Population) -> Vec<RelationRecord> {
    edges
        .iter()
        .map(|&(s, t)| RelationRecord {
            below: population.get(s).signature().clone(),
            above: population.get(t).signature().clone(),
        })
        .collect()
}

/// Resolves stored records against `population`; `context` names the artifact for errors.
pub fn records_to_edges(
    records: &[RelationRecord],
    population: &Population,
    context: (&str, &str),
) -> Result<Vec<(usize, usize)>> {
    let resolve = |signature: &Signature| {
        population
            .index_of(signature)
            .ok_or_else(|| Error::PartialArtifactCorrupt {
                phase: context.0.to_string(),
                part: context.1.to_string(),
                reason: format!("{signature} is not in the population"),
            })
    };
    records
        .iter()
        .map(|record| Ok((resolve(&record.below)?, resolve(&record.above)?)))
        .collect()
}
