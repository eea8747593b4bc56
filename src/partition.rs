//! Fork/join over a fixed set of workers with static round-robin assignment.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

/// Default worker count: every core but one, and never fewer than one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Whether job `index` belongs to `worker` out of `workers`.
pub fn assigned(index: usize, worker: usize, workers: usize) -> bool {
    index % workers == worker
}

/// Yields the items of `iter` owned by `worker`.
pub fn allocate_work<I>(iter: I, worker: usize, workers: usize) -> impl Iterator<Item = I::Item>
where
    I: IntoIterator,
{
    iter.into_iter()
        .enumerate()
        .filter(move |(index, _)| assigned(*index, worker, workers))
        .map(|(_, item)| item)
}

/// The `k`-subsets of `items` owned by `worker`, each with its global index, in
/// the order `itertools::combinations` yields them. Subsets owned by other
/// workers are stepped over without being built.
pub fn assigned_combinations<T: Copy>(
    items: &[T],
    k: usize,
    worker: usize,
    workers: usize,
) -> AssignedCombinations<'_, T> {
    AssignedCombinations {
        items,
        indices: (0..k).collect(),
        position: 0,
        worker,
        workers,
        exhausted: k > items.len(),
    }
}

#[derive(Debug)]
pub struct AssignedCombinations<'a, T> {
    items: &'a [T],
    indices: Vec<usize>,
    position: usize,
    worker: usize,
    workers: usize,
    exhausted: bool,
}

impl<T> AssignedCombinations<'_, T> {
    /// Moves `indices` to the next subset in lexicographic order.
    fn advance(&mut self) {
        self.position += 1;
        let (n, k) = (self.items.len(), self.indices.len());
        match (0..k).rev().find(|&i| self.indices[i] < n - k + i) {
            Some(i) => {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
            }
            None => self.exhausted = true,
        }
    }
}

impl<T: Copy> Iterator for AssignedCombinations<'_, T> {
    type Item = (usize, Vec<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let position = self.position;
            let subset = assigned(position, self.worker, self.workers)
                .then(|| self.indices.iter().map(|&i| self.items[i]).collect());
            self.advance();
            if let Some(subset) = subset {
                return Some((position, subset));
            }
        }
        None
    }
}

pub struct WorkerPool {
    workers: usize,
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("down-arrow-worker-{i}"))
            .build()?;
        Ok(WorkerPool { workers, pool })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `job` once per worker id and waits for all of them; results are in worker order.
    pub fn run<R, F>(&self, job: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync + Send,
    {
        self.pool
            .install(|| (0..self.workers).into_par_iter().map(&job).collect())
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn round_robin_covers_every_job_once() {
        let workers = 3;
        let mut seen: Vec<usize> = (0..workers)
            .flat_map(|w| allocate_work(0..10, w, workers).collect::<Vec<_>>())
            .collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(allocate_work(0..10, 1, 3).collect::<Vec<_>>(), vec![1, 4, 7]);
    }

    #[test]
    fn assigned_combinations_follow_itertools_order() {
        let items = ['a', 'b', 'c', 'd', 'e'];
        for k in 0..=6 {
            let expected: Vec<(usize, Vec<char>)> =
                items.iter().copied().combinations(k).enumerate().collect();
            for workers in 1..4 {
                let mut shared: Vec<(usize, Vec<char>)> = (0..workers)
                    .flat_map(|w| assigned_combinations(&items, k, w, workers))
                    .collect();
                shared.sort_by_key(|(position, _)| *position);
                assert_eq!(shared, expected);
            }
            let second: Vec<usize> = assigned_combinations(&items, k, 1, 3)
                .map(|(position, _)| position)
                .collect();
            assert_eq!(second, (1..expected.len()).step_by(3).collect::<Vec<_>>());
        }
    }

    #[test]
    fn results_come_back_in_worker_order() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.run(|id| id * 10), vec![0, 10, 20, 30]);
    }

    #[test]
    fn zero_workers_means_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.workers(), 1);
        assert!(default_workers() >= 1);
    }
}
