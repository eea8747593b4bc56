//! Red/blue colorings of the host and the ideal union each one induces.

use std::collections::{BTreeSet, HashSet};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::canonical::{CanonicalGraph, Signature};
use crate::enumerate::{Population, edge_induced};
use crate::error::{Error, Result};
use crate::graph::DenseGraph;
use crate::monomorphism::find_embedding;
use crate::partition::{WorkerPool, assigned_combinations};
use crate::poset::PosetRelation;

/// Population indices that embed in the red or the blue half of one coloring.
pub type IdealUnion = BTreeSet<usize>;

/// How colorings are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ColoringStrategy {
    /// One coloring per population class taken as red, blue found through an embedding.
    #[default]
    Representative,
    /// Every red edge subset of the host, deduplicated by the pair of classes.
    Exhaustive,
}

/// A coloring up to isomorphism of its halves, as population indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coloring {
    pub red: usize,
    pub blue: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColoringRecord {
    pub red: Signature,
    pub blue: Signature,
}

impl Coloring {
    pub fn to_record(self, population: &Population) -> ColoringRecord {
        ColoringRecord {
            red: population.get(self.red).signature().clone(),
            blue: population.get(self.blue).signature().clone(),
        }
    }

    pub fn from_record(record: &ColoringRecord, population: &Population) -> Option<Coloring> {
        Some(Coloring {
            red: population.index_of(&record.red)?,
            blue: population.index_of(&record.blue)?,
        })
    }
}

/// Everything a coloring computation needs about one host.
pub struct ColoringContext<'a> {
    pub host_name: &'a str,
    pub host: &'a DenseGraph,
    pub population: &'a Population,
}

impl ColoringContext<'_> {
    /// Looks up the `side` half of the coloring `red` / `blue`.
    fn resolve(&self, side: &'static str, red: &CanonicalGraph, blue: &CanonicalGraph) -> Result<usize> {
        let graph = if side == "red" { red } else { blue };
        self.population.index_of(graph.signature()).ok_or_else(|| {
            error!(
                host = self.host_name,
                side,
                red = %red.signature(),
                blue = %blue.signature(),
                "coloring half has no match in the population"
            );
            Error::LookupFailure {
                host: self.host_name.to_string(),
                side,
                red: red.signature().clone(),
                blue: blue.signature().clone(),
            }
        })
    }

    /// Embeds `red` in the host, removes its edges and looks the remainder up.
    pub fn complement(&self, red: usize) -> Result<usize> {
        let red_graph = self.population.get(red);
        let mapping = find_embedding(red_graph.dense(), self.host).ok_or_else(|| {
            Error::NotEmbeddable {
                host: self.host_name.to_string(),
                graph: red_graph.signature().clone(),
            }
        })?;
        let used: HashSet<(usize, usize)> = red_graph
            .dense()
            .edges()
            .into_iter()
            .map(|(u, v)| {
                let (a, b) = (mapping[u], mapping[v]);
                if a < b { (a, b) } else { (b, a) }
            })
            .collect();
        let blue_edges: Vec<(usize, usize)> = self
            .host
            .edges()
            .into_iter()
            .filter(|edge| !used.contains(edge))
            .collect();
        let blue = CanonicalGraph::from_dense(&edge_induced(&blue_edges)?);
        self.resolve("blue", red_graph, &blue)
    }

    /// One coloring per red class, skipping any class already seen as red or blue.
    pub fn representative_colorings(&self) -> Result<Vec<Coloring>> {
        let mut visited: HashSet<&Signature> = HashSet::new();
        let mut colorings = Vec::new();
        for red in 0..self.population.len() {
            let signature = self.population.get(red).signature();
            if visited.contains(signature) {
                trace!(red = %signature, "already covered by an earlier coloring");
                continue;
            }
            if self.population.get(red).edge_count() > self.host.size() {
                // Only the single-edge sentinel of an edgeless host.
                debug!(red = %signature, "skipping sentinel larger than the host");
                continue;
            }
            let blue = self.complement(red)?;
            visited.insert(signature);
            visited.insert(self.population.get(blue).signature());
            colorings.push(Coloring { red, blue });
        }
        Ok(colorings)
    }

    /// Every coloring whose red half has at most half the host edges, deduplicated
    /// by the unordered pair of classes, in order of first occurrence.
    pub fn exhaustive_colorings(&self, pool: &WorkerPool) -> Result<Vec<Coloring>> {
        let edges = self.host.edges();
        let workers = pool.workers();
        let half = edges.len().div_ceil(2);

        let parts = pool.run(|worker| -> Result<Vec<((usize, usize), Coloring)>> {
            let mut seen = HashSet::new();
            let mut found = Vec::new();
            for k in 0..=half {
                for (position, red_edges) in assigned_combinations(&edges, k, worker, workers) {
                    let blue_edges: Vec<(usize, usize)> = edges
                        .iter()
                        .copied()
                        .filter(|edge| !red_edges.contains(edge))
                        .collect();
                    let red_graph = CanonicalGraph::from_dense(&edge_induced(&red_edges)?);
                    let blue_graph = CanonicalGraph::from_dense(&edge_induced(&blue_edges)?);
                    let red = self.resolve("red", &red_graph, &blue_graph)?;
                    let blue = self.resolve("blue", &red_graph, &blue_graph)?;
                    if seen.insert((red.min(blue), red.max(blue))) {
                        found.push(((k, position), Coloring { red, blue }));
                    }
                }
            }
            debug!(worker, colorings = found.len(), "coloring worker finished");
            Ok(found)
        });

        let mut candidates = Vec::new();
        for part in parts {
            candidates.extend(part?);
        }
        candidates.sort_by_key(|(order, _)| *order);
        let mut seen = HashSet::new();
        Ok(candidates
            .into_iter()
            .map(|(_, coloring)| coloring)
            .filter(|c| seen.insert((c.red.min(c.blue), c.red.max(c.blue))))
            .collect())
    }

    pub fn colorings(&self, strategy: ColoringStrategy, pool: &WorkerPool) -> Result<Vec<Coloring>> {
        match strategy {
            ColoringStrategy::Representative => self.representative_colorings(),
            ColoringStrategy::Exhaustive => self.exhaustive_colorings(pool),
        }
    }
}

/// Everything at or below the red half, together with everything at or below the blue half.
pub fn ideal_union(coloring: Coloring, poset: &PosetRelation) -> IdealUnion {
    let mut union = poset.ideal(coloring.red);
    union.extend(poset.ideal(coloring.blue));
    union
}
