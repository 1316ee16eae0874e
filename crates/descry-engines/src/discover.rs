//! The lattice search driver.
//!
//! A breadth-first/best-first hybrid: the current layer is ordered by a
//! priority key and drained in batches. Each batch is scored in parallel
//! against an immutable model snapshot; between batches the main thread
//! reports eligible candidates in score order (mutating model and testing
//! state), expands survivors into the next layer, and checks budgets. The
//! ordering makes runs reproducible for a fixed dataset and parameters.

use crate::budget::{Budget, StopReason};
use descry_core::{Candidate, Executor, Lattice, ScoreJob, WorkerScratch};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Candidates drained per batch, per worker.
const BATCH_PER_WORKER: usize = 16;

/// Default expansion priority: candidate support.
pub fn support_priority(candidate: &Candidate) -> f64 {
    candidate.support() as f64
}

/// Counters for a finished run.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    pub expansions: usize,
    pub discoveries: usize,
    pub elapsed: Duration,
    pub stop: StopReason,
}

/// Drives the search over `lattice`.
///
/// `score_fn` runs on the executor's workers against a read-only model
/// snapshot and returns the candidate's score (0 = ineligible).
/// `forbidden_fn` gates subtree expansion: forbiddenness is monotone in set
/// inclusion, so a forbidden candidate's subtree is pruned outright.
/// `report_fn` runs only on this thread, re-validates the candidate against
/// the current model and returns whether the pattern was accepted
/// (inserted). The driving thread checks its own scratch context out of the
/// executor's pool.
///
/// Candidates below `min_support` are never generated (support is
/// anti-monotone); budgets are enforced between batches.
#[allow(clippy::too_many_arguments)]
pub fn discover_patterns<S, F, R, P>(
    lattice: &Lattice<'_>,
    executor: &Executor,
    min_support: usize,
    budget: &Budget,
    score_fn: Arc<S>,
    mut forbidden_fn: F,
    mut report_fn: R,
    priority_fn: P,
) -> DiscoveryOutcome
where
    S: Fn(&Candidate, &mut WorkerScratch) -> f64 + Send + Sync + 'static,
    F: FnMut(&Candidate, &mut WorkerScratch) -> bool,
    R: FnMut(&Candidate, &mut WorkerScratch) -> bool,
    P: Fn(&Candidate) -> f64,
{
    let start = Instant::now();
    let mut expansions = 0usize;
    let mut discoveries = 0usize;
    let mut stop = StopReason::Exhausted;

    let mut main_scratch = executor.scratch().checkout();
    let batch_len = (executor.num_workers() * BATCH_PER_WORKER).max(1);

    let mut layer = lattice.singletons(min_support);
    let mut depth = 1usize;

    'outer: while !layer.is_empty() {
        sort_by_priority(&mut layer, &priority_fn);
        trace!(depth, candidates = layer.len(), "entering lattice layer");

        let mut next_layer = Vec::new();
        let mut pending = layer.into_iter();

        loop {
            if let Some(reason) = budget.check(expansions, discoveries, start.elapsed()) {
                stop = reason;
                break 'outer;
            }

            let batch: Vec<Candidate> = pending.by_ref().take(batch_len).collect();
            if batch.is_empty() {
                break;
            }
            expansions += batch.len();

            let mut scored = score_batch(executor, &score_fn, batch);
            sort_by_score(&mut scored);

            for candidate in scored.iter() {
                if candidate.score() <= 0.0 {
                    break;
                }
                if report_fn(candidate, &mut main_scratch) {
                    discoveries += 1;
                    debug!(
                        pattern = %candidate.items(),
                        support = candidate.support(),
                        score = candidate.score(),
                        "accepted pattern"
                    );
                    if budget.discoveries_reached(discoveries) {
                        stop = StopReason::Discoveries;
                        break 'outer;
                    }
                }
            }

            for candidate in scored.iter() {
                if forbidden_fn(candidate, &mut main_scratch) {
                    continue;
                }
                next_layer.extend(lattice.extend(candidate, min_support, &mut main_scratch));
            }
        }

        layer = next_layer;
        depth += 1;
    }

    executor.scratch().restore(main_scratch);
    DiscoveryOutcome {
        expansions,
        discoveries,
        elapsed: start.elapsed(),
        stop,
    }
}

/// Splits the batch into one chunk job per worker; each job scores its
/// chunk with the worker-owned scratch. The executor returns chunks in
/// submission order, so scoring is deterministic for a fixed worker count.
fn score_batch<S>(executor: &Executor, score_fn: &Arc<S>, mut batch: Vec<Candidate>) -> Vec<Candidate>
where
    S: Fn(&Candidate, &mut WorkerScratch) -> f64 + Send + Sync + 'static,
{
    let workers = executor.num_workers().max(1);
    let chunk_len = batch.len().div_ceil(workers).max(1);

    let mut jobs: Vec<ScoreJob> = Vec::with_capacity(workers);
    while !batch.is_empty() {
        let take = batch.len().min(chunk_len);
        let chunk: Vec<Candidate> = batch.drain(..take).collect();
        let score_fn = Arc::clone(score_fn);
        jobs.push(Box::new(move |scratch: &mut WorkerScratch| {
            chunk
                .into_iter()
                .map(|mut candidate| {
                    let score = score_fn(&candidate, scratch);
                    candidate.set_score(score);
                    candidate
                })
                .collect()
        }));
    }

    executor.execute_batch(jobs).into_iter().flatten().collect()
}

fn sort_by_priority<P: Fn(&Candidate) -> f64>(layer: &mut [Candidate], priority_fn: &P) {
    layer.sort_by(|a, b| {
        priority_fn(b)
            .partial_cmp(&priority_fn(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.items().cmp(b.items()))
    });
}

fn sort_by_score(batch: &mut [Candidate]) {
    batch.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.items().cmp(b.items()))
    });
}
