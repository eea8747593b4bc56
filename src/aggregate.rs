//! Intersection of ideal unions across colorings.
//!
//! A partial result is either `Unconstrained` (a worker that saw no coloring,
//! or an accumulator that was just flushed) or `Constrained` by a concrete
//! set. `Unconstrained` is the identity of `meet`; an empty `Constrained` set
//! absorbs everything. Keeping them apart is what lets an idle worker take
//! part in the merge without wiping out the result.

use std::collections::BTreeSet;

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::canonical::Signature;
use crate::coloring::{Coloring, IdealUnion, ideal_union};
use crate::enumerate::Population;
use crate::error::{Error, Result};
use crate::partition::{WorkerPool, allocate_work};
use crate::poset::PosetRelation;
use crate::progress;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PartialIntersection {
    #[default]
    Unconstrained,
    Constrained(BTreeSet<usize>),
}

impl PartialIntersection {
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, PartialIntersection::Unconstrained)
    }

    pub fn meet(self, other: PartialIntersection) -> PartialIntersection {
        match (self, other) {
            (PartialIntersection::Unconstrained, other) => other,
            (this, PartialIntersection::Unconstrained) => this,
            (PartialIntersection::Constrained(a), PartialIntersection::Constrained(b)) => {
                PartialIntersection::Constrained(a.intersection(&b).copied().collect())
            }
        }
    }

    /// Intersects in place with one ideal union.
    pub fn constrain(&mut self, union: &IdealUnion) {
        match self {
            PartialIntersection::Unconstrained => {
                *self = PartialIntersection::Constrained(union.clone());
            }
            PartialIntersection::Constrained(members) => members.retain(|m| union.contains(m)),
        }
    }

    /// The final down-arrow set. Failing here means no coloring was ever folded in.
    pub fn into_result(self) -> Result<BTreeSet<usize>> {
        match self {
            PartialIntersection::Constrained(members) => Ok(members),
            PartialIntersection::Unconstrained => Err(Error::AggregationAmbiguity(
                "no coloring constrained the down-arrow set".to_string(),
            )),
        }
    }

    /// Stored form: `None` is the no-op sentinel, never an empty list.
    pub fn to_stored(&self, population: &Population) -> Option<Vec<Signature>> {
        match self {
            PartialIntersection::Unconstrained => None,
            PartialIntersection::Constrained(members) => Some(
                members
                    .iter()
                    .map(|&m| population.get(m).signature().clone())
                    .collect(),
            ),
        }
    }

    pub fn from_stored(
        stored: Option<&[Signature]>,
        population: &Population,
    ) -> std::result::Result<PartialIntersection, Signature> {
        match stored {
            None => Ok(PartialIntersection::Unconstrained),
            Some(signatures) => signatures
                .iter()
                .map(|s| population.index_of(s).ok_or_else(|| s.clone()))
                .collect::<std::result::Result<BTreeSet<usize>, Signature>>()
                .map(PartialIntersection::Constrained),
        }
    }
}

pub fn intersect_all(unions: impl IntoIterator<Item = IdealUnion>) -> PartialIntersection {
    unions
        .into_iter()
        .fold(PartialIntersection::Unconstrained, |acc, union| {
            acc.meet(PartialIntersection::Constrained(union))
        })
}

/// A worker's running intersection, optionally flushed every `checkpoint_every` colorings.
#[derive(Debug)]
pub struct Accumulator {
    running: PartialIntersection,
    since_flush: usize,
    checkpoint_every: Option<usize>,
    processed: usize,
}

impl Accumulator {
    pub fn new(checkpoint_every: Option<usize>) -> Self {
        Accumulator {
            running: PartialIntersection::Unconstrained,
            since_flush: 0,
            checkpoint_every: checkpoint_every.filter(|&c| c > 0),
            processed: 0,
        }
    }

    /// Folds in one ideal union. Returns a checkpoint to persist when one is due;
    /// the accumulator then restarts from `Unconstrained`.
    pub fn absorb(&mut self, union: &IdealUnion) -> Option<PartialIntersection> {
        self.running.constrain(union);
        self.processed += 1;
        self.since_flush += 1;
        match self.checkpoint_every {
            Some(every) if self.since_flush >= every => {
                self.since_flush = 0;
                Some(std::mem::take(&mut self.running))
            }
            _ => None,
        }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn finish(self) -> PartialIntersection {
        self.running
    }
}

/// Everything one worker produced: flushed checkpoints in order, then the residual.
#[derive(Debug, Default)]
pub struct WorkerOutput {
    pub checkpoints: Vec<PartialIntersection>,
    pub residual: PartialIntersection,
    pub colorings: usize,
}

/// Folds the colorings owned by `worker`, handing each checkpoint to `flush` as it is cut.
pub fn run_worker(
    colorings: &[Coloring],
    poset: &PosetRelation,
    worker: usize,
    workers: usize,
    checkpoint_every: Option<usize>,
    pb: &ProgressBar,
    mut flush: impl FnMut(usize, &PartialIntersection) -> Result<()>,
) -> Result<WorkerOutput> {
    let mut accumulator = Accumulator::new(checkpoint_every);
    let mut output = WorkerOutput::default();
    for coloring in allocate_work(colorings, worker, workers) {
        let union = ideal_union(*coloring, poset);
        trace!(worker, red = coloring.red, blue = coloring.blue, size = union.len(), "ideal union");
        if let Some(checkpoint) = accumulator.absorb(&union) {
            flush(output.checkpoints.len(), &checkpoint)?;
            output.checkpoints.push(checkpoint);
        }
        pb.inc(1);
    }
    output.colorings = accumulator.processed();
    output.residual = accumulator.finish();
    debug!(
        worker,
        colorings = output.colorings,
        checkpoints = output.checkpoints.len(),
        "aggregation worker finished"
    );
    Ok(output)
}

/// Merges worker outputs pairwise with `meet`.
pub fn merge(outputs: impl IntoIterator<Item = WorkerOutput>) -> PartialIntersection {
    outputs
        .into_iter()
        .flat_map(|output| output.checkpoints.into_iter().chain([output.residual]))
        .fold(PartialIntersection::Unconstrained, PartialIntersection::meet)
}

/// The down-arrow set over `colorings`, without persistence.
pub fn aggregate(
    colorings: &[Coloring],
    poset: &PosetRelation,
    pool: &WorkerPool,
    checkpoint_every: Option<usize>,
    show_progress: bool,
) -> Result<BTreeSet<usize>> {
    aggregate_with(
        colorings.len(),
        pool,
        show_progress,
        |worker, pb| {
            run_worker(colorings, poset, worker, pool.workers(), checkpoint_every, pb, |_, _| Ok(()))
        },
        |_, output| Ok(merge([output])),
    )
}

/// Runs `produce` once per worker, joins, then meets the partial `collect`
/// hands back for each worker in order. An idle worker's partial is
/// `Unconstrained` and leaves the result alone.
pub fn aggregate_with<W, P, C>(
    colorings: usize,
    pool: &WorkerPool,
    show_progress: bool,
    produce: P,
    mut collect: C,
) -> Result<BTreeSet<usize>>
where
    W: Send,
    P: Fn(usize, &ProgressBar) -> Result<W> + Sync,
    C: FnMut(usize, W) -> Result<PartialIntersection>,
{
    let pb = progress::bar(colorings as u64, "aggregate", show_progress);
    let produced = pool.run(|worker| produce(worker, &pb));
    pb.finish_with_message("done");
    let produced = produced.into_iter().collect::<Result<Vec<W>>>()?;

    let mut total = PartialIntersection::Unconstrained;
    for (worker, share) in produced.into_iter().enumerate() {
        total = total.meet(collect(worker, share)?);
    }
    total.into_result()
}

/// A worker's persisted summary, or one of its checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatePart {
    pub worker: usize,
    pub workers: usize,
    /// Colorings folded into `members` (for a summary, into all its checkpoints too).
    pub colorings: usize,
    /// Number of checkpoint artifacts the worker wrote; zero on checkpoints themselves.
    pub checkpoints: usize,
    pub members: Option<Vec<Signature>>,
}
