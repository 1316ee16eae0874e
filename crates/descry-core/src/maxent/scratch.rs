use crate::rowset::RowSet;
use std::sync::Mutex;

/// Reusable buffers for model inference: the per-factor accumulation built
/// while resolving an itemset against the model's factors.
#[derive(Debug, Default)]
pub struct InferScratch {
    /// (factor index, required position mask) pairs for the factors an
    /// itemset touches.
    pub(crate) factors: Vec<(usize, u128)>,
}

impl InferScratch {
    pub fn with_capacity(width_hint: usize) -> Self {
        InferScratch {
            factors: Vec::with_capacity(width_hint),
        }
    }
}

/// Everything one scoring worker needs between suspension points: two row
/// buffers for set operations and one inference context. Buffers are reused
/// across calls and never shared between workers.
#[derive(Debug)]
pub struct WorkerScratch {
    /// Intersection buffer for candidate expansion.
    pub rows_a: RowSet,
    /// Intersection buffer for group-restricted supports.
    pub rows_b: RowSet,
    pub infer: InferScratch,
}

impl WorkerScratch {
    pub fn new(num_rows: usize, width_hint: usize) -> Self {
        WorkerScratch {
            rows_a: RowSet::empty(num_rows),
            rows_b: RowSet::empty(num_rows),
            infer: InferScratch::with_capacity(width_hint),
        }
    }
}

/// Checkout pool of [WorkerScratch] contexts shared between the scoring
/// workers and the discoverer's driving thread.
///
/// Contexts are created lazily. A scoring worker holds one for its whole
/// lifetime and gives it back on shutdown; the driving thread checks one
/// out per run.
#[derive(Debug)]
pub struct ScratchPool {
    num_rows: usize,
    width_hint: usize,
    pool: Mutex<Vec<WorkerScratch>>,
}

impl ScratchPool {
    /// `width_hint` sizes the inference context; callers pass the factor
    /// width cap plus one.
    pub fn new(num_rows: usize, width_hint: usize) -> Self {
        ScratchPool {
            num_rows,
            width_hint,
            pool: Mutex::new(Vec::new()),
        }
    }

    pub fn checkout(&self) -> WorkerScratch {
        self.pool
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| WorkerScratch::new(self.num_rows, self.width_hint))
    }

    pub fn restore(&self, scratch: WorkerScratch) {
        self.pool.lock().unwrap().push(scratch);
    }

    /// Contexts currently sitting in the pool.
    pub fn available(&self) -> usize {
        self.pool.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_reuses_restored_contexts() {
        let pool = ScratchPool::new(10, 4);
        let mut first = pool.checkout();
        first.rows_a.insert(3);
        pool.restore(first);

        let second = pool.checkout();
        // Same buffer back; contents are the caller's responsibility.
        assert!(second.rows_a.contains(3));
        assert_eq!(second.rows_a.universe(), 10);
    }

    #[test]
    fn pool_grows_on_demand() {
        let pool = ScratchPool::new(5, 2);
        let a = pool.checkout();
        let b = pool.checkout();
        assert_eq!(a.rows_b.universe(), 5);
        pool.restore(a);
        pool.restore(b);
        assert_eq!(pool.available(), 2);
    }
}
