//! The scoring worker pool.
//!
//! Scoring is the only parallel workload in this crate: the discoverer
//! hands each batch of candidates over as chunk jobs and blocks until every
//! chunk is back. That narrow shape drives the design here. Workers are
//! long-lived and each holds one [WorkerScratch] checked out of the shared
//! pool for its entire lifetime, so the hot path never touches the pool
//! lock. Every worker has its own job channel (jobs are dealt round-robin,
//! there is no contended queue), and results carry their chunk index so a
//! batch reassembles in submission order no matter which worker finishes
//! first. Runs are therefore reproducible for a fixed worker count.

use crate::lattice::Candidate;
use crate::maxent::scratch::{ScratchPool, WorkerScratch};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

/// One unit of scoring work: consume a chunk of candidates and return them
/// scored, using the worker's own scratch context.
pub type ScoreJob = Box<dyn FnOnce(&mut WorkerScratch) -> Vec<Candidate> + Send + 'static>;

struct IndexedJob {
    index: usize,
    job: ScoreJob,
}

/// Runs scoring batches, inline or on a fixed set of worker threads.
///
/// The executor owns the [ScratchPool] its workers draw from; the
/// discoverer checks its own context out of the same pool via
/// [Executor::scratch].
pub struct Executor {
    scratch: Arc<ScratchPool>,
    pool: Option<WorkerPool>,
}

struct WorkerPool {
    senders: Vec<mpsc::Sender<IndexedJob>>,
    results: mpsc::Receiver<(usize, Vec<Candidate>)>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Executor {
    /// Everything runs inline on the caller's thread.
    pub fn serial(scratch: Arc<ScratchPool>) -> Self {
        Executor {
            scratch,
            pool: None,
        }
    }

    /// Spawns `num_workers` long-lived scoring threads (at least one).
    pub fn worker_pool(num_workers: usize, scratch: Arc<ScratchPool>) -> Self {
        let num_workers = num_workers.max(1);
        let (results_tx, results) = mpsc::channel();
        let mut senders = Vec::with_capacity(num_workers);
        let mut handles = Vec::with_capacity(num_workers);

        for _ in 0..num_workers {
            let (jobs_tx, jobs_rx) = mpsc::channel::<IndexedJob>();
            let results_tx = results_tx.clone();
            let pool = Arc::clone(&scratch);
            handles.push(thread::spawn(move || {
                let mut context = pool.checkout();
                // The worker exits when the executor drops its sender.
                while let Ok(IndexedJob { index, job }) = jobs_rx.recv() {
                    let scored = job(&mut context);
                    if results_tx.send((index, scored)).is_err() {
                        break;
                    }
                }
                pool.restore(context);
            }));
            senders.push(jobs_tx);
        }

        Executor {
            scratch,
            pool: Some(WorkerPool {
                senders,
                results,
                handles,
            }),
        }
    }

    /// A pool sized to the machine's available parallelism.
    pub fn hardware(scratch: Arc<ScratchPool>) -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Executor::worker_pool(workers, scratch)
    }

    pub fn num_workers(&self) -> usize {
        match &self.pool {
            None => 1,
            Some(pool) => pool.senders.len(),
        }
    }

    /// The scratch pool shared with the scoring workers.
    pub fn scratch(&self) -> &Arc<ScratchPool> {
        &self.scratch
    }

    /// Runs every chunk job, returning results in submission order.
    pub fn execute_batch(&self, jobs: Vec<ScoreJob>) -> Vec<Vec<Candidate>> {
        match &self.pool {
            None => {
                let mut context = self.scratch.checkout();
                let results = jobs.into_iter().map(|job| job(&mut context)).collect();
                self.scratch.restore(context);
                results
            }
            Some(pool) => pool.run(jobs),
        }
    }
}

impl WorkerPool {
    /// Deals jobs round-robin across the workers, then reassembles the
    /// results by chunk index.
    fn run(&self, jobs: Vec<ScoreJob>) -> Vec<Vec<Candidate>> {
        let count = jobs.len();
        for (index, job) in jobs.into_iter().enumerate() {
            self.senders[index % self.senders.len()]
                .send(IndexedJob { index, job })
                .unwrap();
        }

        let mut slots: Vec<Option<Vec<Candidate>>> = (0..count).map(|_| None).collect();
        for _ in 0..count {
            let (index, scored) = self.results.recv().unwrap();
            slots[index] = Some(scored);
        }
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_default())
            .collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the job channels lets every worker drain, give its
        // scratch back and exit.
        self.senders.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
