//! Phase sequencing over an injected cache.
//!
//! Every phase first looks for its final artifact and loads it instead of
//! recomputing. Parallel phases write one partial artifact per worker, join,
//! and then read every partial back; a missing or unreadable partial stops
//! the phase. Partials are removed once the final artifact is written. A
//! retry after a failure reuses any partial that was written for the same
//! worker count, so only the lost work is redone.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::aggregate::{self, AggregatePart, PartialIntersection, aggregate_with};
use crate::cache::{ArtifactKey, GraphRecord, Phase, PhaseCache, load, store};
use crate::coloring::{Coloring, ColoringContext, ColoringRecord};
use crate::config::PipelineConfig;
use crate::enumerate::{Population, enumerate_distinct_edge_subgraphs};
use crate::error::{Error, Result};
use crate::graph::SimpleGraph;
use crate::hosts::host_from_name;
use crate::ideals::{is_order_ideal, maximal_elements};
use crate::partition::{WorkerPool, allocate_work, assigned};
use crate::poset::{
    self, PosetPart, PosetRelation, RelationRecord, build_poset_with, edges_to_records,
    records_to_edges, to_records,
};
use crate::report::Summary;

/// What one run did, phase by phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub host: String,
    pub computed: Vec<Phase>,
    pub loaded: Vec<Phase>,
    pub down_arrow: usize,
    pub ideals: Vec<GraphRecord>,
}

impl RunOutcome {
    /// Nothing was recomputed.
    pub fn fully_cached(&self) -> bool {
        self.computed.is_empty()
    }
}

fn annotate(host: &str, phase: Phase) -> impl FnOnce(Error) -> Error + '_ {
    move |source| Error::Phase {
        host: host.to_string(),
        phase: phase.name(),
        source: Box::new(source),
    }
}

fn part_label(key: &ArtifactKey) -> String {
    key.part.clone().unwrap_or_else(|| "result".to_string())
}

fn missing(key: &ArtifactKey, expected: usize) -> Error {
    Error::PartialArtifactMissing {
        phase: key.phase.to_string(),
        part: part_label(key),
        expected,
    }
}

fn corrupt(key: &ArtifactKey, reason: impl ToString) -> Error {
    Error::PartialArtifactCorrupt {
        phase: key.phase.to_string(),
        part: part_label(key),
        reason: reason.to_string(),
    }
}

fn worker_key(phase: Phase, worker: usize) -> ArtifactKey {
    ArtifactKey::part(phase, worker.to_string())
}

fn checkpoint_key(worker: usize, sequence: usize) -> ArtifactKey {
    ArtifactKey::part(Phase::DownArrowSet, format!("{worker}.{sequence}"))
}

pub struct Pipeline {
    config: PipelineConfig,
    cache: Arc<dyn PhaseCache>,
    pool: WorkerPool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, cache: Arc<dyn PhaseCache>) -> Result<Self> {
        let pool = WorkerPool::new(config.workers)?;
        Ok(Pipeline {
            config,
            cache,
            pool,
        })
    }

    /// Runs (or resumes) every phase for `host`.
    pub fn run(&self, host: &str) -> Result<RunOutcome> {
        info!(host, workers = self.pool.workers(), "starting pipeline");
        let started = Instant::now();
        let mut outcome = RunOutcome {
            host: host.to_string(),
            ..RunOutcome::default()
        };
        let graph = host_from_name(host).map_err(annotate(host, Phase::Subgraphs))?;
        let dense = graph.to_dense().map_err(annotate(host, Phase::Subgraphs))?.0;

        let population = self.stage(
            host,
            Phase::Subgraphs,
            &mut outcome,
            || self.load_population(host),
            || self.compute_population(host, &graph),
        )?;
        let population = &population;

        let poset = self.stage(
            host,
            Phase::Poset,
            &mut outcome,
            || self.load_poset(host, population),
            || self.compute_poset(host, population),
        )?;

        let context = ColoringContext {
            host_name: host,
            host: &dense,
            population,
        };
        let colorings = self.stage(
            host,
            Phase::Colorings,
            &mut outcome,
            || self.load_colorings(host, population),
            || self.compute_colorings(host, &context),
        )?;

        let down_arrow = self.stage(
            host,
            Phase::DownArrowSet,
            &mut outcome,
            || self.load_down_arrow(host, population, &poset),
            || self.compute_down_arrow(host, population, &poset, &colorings),
        )?;

        let ideals = self.stage(
            host,
            Phase::Ideals,
            &mut outcome,
            || self.load_ideals(host),
            || self.compute_ideals(host, population, &poset, &down_arrow),
        )?;

        outcome.down_arrow = down_arrow.len();
        outcome.ideals = ideals;
        info!(
            host,
            down_arrow = outcome.down_arrow,
            ideals = outcome.ideals.len(),
            computed = outcome.computed.len(),
            elapsed = ?started.elapsed(),
            "pipeline finished"
        );
        Ok(outcome)
    }

    /// Runs hosts in order, stopping at the first failure.
    pub fn run_many<S: AsRef<str>>(&self, hosts: &[S]) -> Result<Vec<RunOutcome>> {
        hosts.iter().map(|host| self.run(host.as_ref())).collect()
    }

    /// Hosts whose ideals artifact exists.
    pub fn completed_hosts(&self) -> Result<Vec<String>> {
        let key = ArtifactKey::result(Phase::Ideals);
        let mut completed = Vec::new();
        for host in self.cache.hosts()? {
            if self.cache.contains(&host, &key)? {
                completed.push(host);
            }
        }
        Ok(completed)
    }

    pub fn clear(&self, host: &str) -> Result<()> {
        info!(host, "clearing cached artifacts");
        self.cache.clear(host)
    }

    /// The report of a completed host, or `None` when its ideals are not cached.
    pub fn summary(&self, host: &str) -> Result<Option<Summary>> {
        let Some(ideals) = self.load_artifact::<Vec<GraphRecord>>(host, &ArtifactKey::result(Phase::Ideals))?
        else {
            return Ok(None);
        };
        let subgraphs = self
            .load_artifact::<Vec<GraphRecord>>(host, &ArtifactKey::result(Phase::Subgraphs))?
            .map(|records| records.len());
        let relations = self
            .load_artifact::<Vec<RelationRecord>>(host, &ArtifactKey::result(Phase::Poset))?
            .map(|records| records.len());
        let colorings = self
            .load_artifact::<Vec<ColoringRecord>>(host, &ArtifactKey::result(Phase::Colorings))?
            .map(|records| records.len());
        let down_arrow = self
            .load_artifact::<Vec<GraphRecord>>(host, &ArtifactKey::result(Phase::DownArrowSet))?
            .unwrap_or_default();
        Ok(Some(Summary {
            host: host.to_string(),
            subgraphs,
            relations,
            colorings,
            down_arrow,
            ideals,
        }))
    }

    fn stage<T>(
        &self,
        host: &str,
        phase: Phase,
        outcome: &mut RunOutcome,
        load: impl FnOnce() -> Result<Option<T>>,
        compute: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        if let Some(value) = load().map_err(annotate(host, phase))? {
            info!(host, %phase, "loaded cached artifact");
            outcome.loaded.push(phase);
            return Ok(value);
        }
        info!(host, %phase, "computing phase");
        let started = Instant::now();
        let value = compute().map_err(annotate(host, phase))?;
        info!(host, %phase, elapsed = ?started.elapsed(), "phase complete");
        outcome.computed.push(phase);
        Ok(value)
    }

    /// Parse failures surface as corruption of that artifact.
    fn load_artifact<T: DeserializeOwned>(&self, host: &str, key: &ArtifactKey) -> Result<Option<T>> {
        load(self.cache.as_ref(), host, key).map_err(|e| match e {
            Error::Json(e) => corrupt(key, e),
            other => other,
        })
    }

    fn store_result<T: Serialize>(&self, host: &str, phase: Phase, value: &T) -> Result<()> {
        store(self.cache.as_ref(), host, &ArtifactKey::result(phase), value)
    }

    fn remove_parts(&self, host: &str, phase: Phase) -> Result<()> {
        for key in self.cache.keys(host)? {
            if key.phase == phase && key.is_part() {
                self.cache.remove(host, &key)?;
            }
        }
        Ok(())
    }

    fn load_population(&self, host: &str) -> Result<Option<Population>> {
        let key = ArtifactKey::result(Phase::Subgraphs);
        let Some(records) = self.load_artifact::<Vec<GraphRecord>>(host, &key)? else {
            return Ok(None);
        };
        let graphs = records
            .iter()
            .map(GraphRecord::to_canonical)
            .collect::<Result<Vec<_>>>()?;
        let population = Population::from_graphs(graphs);
        if population.len() != records.len() {
            return Err(corrupt(&key, "population repeats an isomorphism class"));
        }
        Ok(Some(population))
    }

    fn compute_population(&self, host: &str, graph: &SimpleGraph) -> Result<Population> {
        let population = enumerate_distinct_edge_subgraphs(graph, &self.pool, self.config.progress)?;
        info!(host, classes = population.len(), "enumerated distinct edge subgraphs");
        let records: Vec<GraphRecord> = population.iter().map(GraphRecord::from_canonical).collect();
        self.store_result(host, Phase::Subgraphs, &records)?;
        Ok(population)
    }

    fn load_poset(&self, host: &str, population: &Population) -> Result<Option<PosetRelation>> {
        let key = ArtifactKey::result(Phase::Poset);
        let Some(records) = self.load_artifact::<Vec<RelationRecord>>(host, &key)? else {
            return Ok(None);
        };
        let edges = records_to_edges(&records, population, (Phase::Poset.name(), "result"))?;
        let relation = PosetRelation::from_edges(population.len(), edges);
        if !relation.is_acyclic() || !relation.is_transitively_closed() {
            return Err(corrupt(&key, "stored relation is not a closed strict order"));
        }
        Ok(Some(relation))
    }

    /// The share of `worker`, checked against the current run and resolved.
    fn read_poset_part(
        &self,
        host: &str,
        population: &Population,
        worker: usize,
        workers: usize,
    ) -> Result<Vec<(usize, usize)>> {
        let key = worker_key(Phase::Poset, worker);
        let part: PosetPart = self
            .load_artifact(host, &key)?
            .ok_or_else(|| missing(&key, workers))?;
        if part.worker != worker || part.workers != workers || part.classes != population.len() {
            return Err(corrupt(
                &key,
                format!(
                    "written by worker {}/{} over {} classes",
                    part.worker, part.workers, part.classes
                ),
            ));
        }
        let label = part_label(&key);
        records_to_edges(&part.relations, population, (Phase::Poset.name(), label.as_str()))
    }

    fn poset_worker(
        &self,
        host: &str,
        population: &Population,
        worker: usize,
        workers: usize,
        pb: &ProgressBar,
    ) -> Result<()> {
        let key = worker_key(Phase::Poset, worker);
        if self.cache.contains(host, &key)? {
            match self.read_poset_part(host, population, worker, workers) {
                Ok(_) => {
                    debug!(worker, "reusing poset partial");
                    let targets = (0..population.len())
                        .filter(|&t| assigned(t, worker, workers))
                        .count();
                    pb.inc(targets as u64);
                    return Ok(());
                }
                Err(e) => warn!(worker, error = %e, "discarding unusable poset partial"),
            }
        }
        let edges = poset::discover(population, worker, workers, pb);
        let part = PosetPart {
            worker,
            workers,
            classes: population.len(),
            relations: edges_to_records(&edges, population),
        };
        store(self.cache.as_ref(), host, &key, &part)
    }

    fn compute_poset(&self, host: &str, population: &Population) -> Result<PosetRelation> {
        let workers = self.pool.workers();
        let relation = build_poset_with(
            population,
            &self.pool,
            self.config.progress,
            |worker, pb| self.poset_worker(host, population, worker, workers, pb),
            |worker, ()| self.read_poset_part(host, population, worker, workers),
        )?;
        info!(host, relations = relation.edge_count(), "built subgraph poset");
        self.store_result(host, Phase::Poset, &to_records(&relation, population))?;
        self.remove_parts(host, Phase::Poset)?;
        Ok(relation)
    }

    fn load_colorings(&self, host: &str, population: &Population) -> Result<Option<Vec<Coloring>>> {
        let key = ArtifactKey::result(Phase::Colorings);
        let Some(records) = self.load_artifact::<Vec<ColoringRecord>>(host, &key)? else {
            return Ok(None);
        };
        records
            .iter()
            .map(|record| {
                Coloring::from_record(record, population).ok_or_else(|| {
                    corrupt(
                        &key,
                        format!("coloring {} / {} is not in the population", record.red, record.blue),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn compute_colorings(&self, host: &str, context: &ColoringContext<'_>) -> Result<Vec<Coloring>> {
        let colorings = context.colorings(self.config.coloring_strategy, &self.pool)?;
        info!(
            host,
            strategy = ?self.config.coloring_strategy,
            colorings = colorings.len(),
            "generated colorings"
        );
        let records: Vec<ColoringRecord> = colorings
            .iter()
            .map(|c| c.to_record(context.population))
            .collect();
        self.store_result(host, Phase::Colorings, &records)?;
        Ok(colorings)
    }

    fn load_down_arrow(
        &self,
        host: &str,
        population: &Population,
        poset: &PosetRelation,
    ) -> Result<Option<BTreeSet<usize>>> {
        let key = ArtifactKey::result(Phase::DownArrowSet);
        let Some(records) = self.load_artifact::<Vec<GraphRecord>>(host, &key)? else {
            return Ok(None);
        };
        let members = records
            .iter()
            .map(|record| {
                population
                    .index_of(&record.signature)
                    .ok_or_else(|| corrupt(&key, format!("{} is not in the population", record.signature)))
            })
            .collect::<Result<BTreeSet<usize>>>()?;
        if !is_order_ideal(&members, poset) {
            return Err(corrupt(&key, "stored set is not closed under subgraphs"));
        }
        Ok(Some(members))
    }

    #[allow(clippy::too_many_arguments)]
    fn aggregate_worker(
        &self,
        host: &str,
        population: &Population,
        poset: &PosetRelation,
        colorings: &[Coloring],
        worker: usize,
        workers: usize,
        pb: &ProgressBar,
    ) -> Result<()> {
        let key = worker_key(Phase::DownArrowSet, worker);
        if self.cache.contains(host, &key)? {
            // Reused only when the summary and every checkpoint it names read back.
            match self.read_aggregate_parts(host, population, colorings, worker, workers) {
                Ok(_) => {
                    debug!(worker, "reusing aggregation partial");
                    pb.inc(allocate_work(colorings, worker, workers).count() as u64);
                    return Ok(());
                }
                Err(e) => warn!(worker, error = %e, "discarding unusable aggregation partial"),
            }
        }

        let every = self.config.checkpoint_every.filter(|&c| c > 0);
        let output = aggregate::run_worker(colorings, poset, worker, workers, every, pb, |sequence, partial| {
            debug!(worker, sequence, "writing aggregation checkpoint");
            let checkpoint = AggregatePart {
                worker,
                workers,
                colorings: every.unwrap_or_default(),
                checkpoints: 0,
                members: partial.to_stored(population),
            };
            store(self.cache.as_ref(), host, &checkpoint_key(worker, sequence), &checkpoint)
        })?;
        let part = AggregatePart {
            worker,
            workers,
            colorings: output.colorings,
            checkpoints: output.checkpoints.len(),
            members: output.residual.to_stored(population),
        };
        store(self.cache.as_ref(), host, &key, &part)
    }

    fn read_aggregate_part(
        &self,
        host: &str,
        key: &ArtifactKey,
        expected: usize,
        worker: usize,
        workers: usize,
        population: &Population,
    ) -> Result<(AggregatePart, PartialIntersection)> {
        let part: AggregatePart = self
            .load_artifact(host, key)?
            .ok_or_else(|| missing(key, expected))?;
        if part.worker != worker || part.workers != workers {
            return Err(corrupt(
                key,
                format!("written by worker {}/{}", part.worker, part.workers),
            ));
        }
        let partial = PartialIntersection::from_stored(part.members.as_deref(), population)
            .map_err(|signature| corrupt(key, format!("{signature} is not in the population")))?;
        Ok((part, partial))
    }

    /// The summary of `worker` met with each of its checkpoints.
    fn read_aggregate_parts(
        &self,
        host: &str,
        population: &Population,
        colorings: &[Coloring],
        worker: usize,
        workers: usize,
    ) -> Result<PartialIntersection> {
        let key = worker_key(Phase::DownArrowSet, worker);
        let (part, mut partial) = self.read_aggregate_part(host, &key, workers, worker, workers, population)?;
        let expected = allocate_work(colorings, worker, workers).count();
        if part.colorings != expected {
            return Err(corrupt(
                &key,
                format!("covers {} colorings, expected {expected}", part.colorings),
            ));
        }
        for sequence in 0..part.checkpoints {
            let flushed = checkpoint_key(worker, sequence);
            let (_, checkpoint) =
                self.read_aggregate_part(host, &flushed, part.checkpoints, worker, workers, population)?;
            partial = partial.meet(checkpoint);
        }
        Ok(partial)
    }

    fn compute_down_arrow(
        &self,
        host: &str,
        population: &Population,
        poset: &PosetRelation,
        colorings: &[Coloring],
    ) -> Result<BTreeSet<usize>> {
        let workers = self.pool.workers();
        let members = aggregate_with(
            colorings.len(),
            &self.pool,
            self.config.progress,
            |worker, pb| self.aggregate_worker(host, population, poset, colorings, worker, workers, pb),
            |worker, ()| self.read_aggregate_parts(host, population, colorings, worker, workers),
        )?;
        info!(host, members = members.len(), "intersected ideal unions");
        let records: Vec<GraphRecord> = members
            .iter()
            .map(|&m| GraphRecord::from_canonical(population.get(m)))
            .collect();
        self.store_result(host, Phase::DownArrowSet, &records)?;
        self.remove_parts(host, Phase::DownArrowSet)?;
        Ok(members)
    }

    fn load_ideals(&self, host: &str) -> Result<Option<Vec<GraphRecord>>> {
        let Some(records) =
            self.load_artifact::<Vec<GraphRecord>>(host, &ArtifactKey::result(Phase::Ideals))?
        else {
            return Ok(None);
        };
        for record in &records {
            record.to_canonical()?;
        }
        Ok(Some(records))
    }

    fn compute_ideals(
        &self,
        host: &str,
        population: &Population,
        poset: &PosetRelation,
        down_arrow: &BTreeSet<usize>,
    ) -> Result<Vec<GraphRecord>> {
        let records: Vec<GraphRecord> = maximal_elements(down_arrow, poset)
            .into_iter()
            .map(|m| GraphRecord::from_canonical(population.get(m)))
            .collect();
        info!(host, ideals = records.len(), "extracted down-arrow ideals");
        self.store_result(host, Phase::Ideals, &records)?;
        Ok(records)
    }
}
