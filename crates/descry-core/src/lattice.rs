use crate::dataset::Dataset;
use crate::items::{Item, ItemSet};
use crate::maxent::scratch::WorkerScratch;
use crate::rowset::RowSet;

/// A tentative pattern on the discoverer's worklist: an itemset, the rows
/// containing it, and the score assigned by the last scoring pass.
///
/// Scores are non-negative log p-values; 0 means ineligible (below minimum
/// support, forbidden, or not significant).
#[derive(Clone, Debug)]
pub struct Candidate {
    items: ItemSet,
    rows: RowSet,
    support: usize,
    score: f64,
}

impl Candidate {
    pub fn new(items: ItemSet, rows: RowSet) -> Self {
        let support = rows.len();
        Candidate {
            items,
            rows,
            support,
            score: 0.0,
        }
    }

    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn support(&self) -> usize {
        self.support
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        debug_assert!(score >= 0.0);
        self.score = score;
    }
}

/// The itemset search space as a prefix lattice over the dataset's columns.
///
/// Children of `S` append a singleton with index strictly greater than all
/// of `S`, so every itemset is generated exactly once.
pub struct Lattice<'d> {
    dataset: &'d Dataset,
}

impl<'d> Lattice<'d> {
    pub fn new(dataset: &'d Dataset) -> Self {
        Lattice { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    pub fn num_singletons(&self) -> usize {
        self.dataset.num_columns()
    }

    /// The first lattice layer: one candidate per column with at least
    /// `min_support` rows.
    pub fn singletons(&self, min_support: usize) -> Vec<Candidate> {
        (0..self.dataset.num_columns() as Item)
            .filter(|&j| self.dataset.support(j) >= min_support)
            .map(|j| Candidate::new(ItemSet::singleton(j), self.dataset.column(j).clone()))
            .collect()
    }

    /// Expands `parent` by every greater singleton, keeping children with at
    /// least `min_support` rows (support is anti-monotone, so the rest can
    /// never recover).
    ///
    /// Intersections land in the caller's scratch buffer first; only
    /// surviving children allocate.
    pub fn extend(
        &self,
        parent: &Candidate,
        min_support: usize,
        scratch: &mut WorkerScratch,
    ) -> Vec<Candidate> {
        let first = match parent.items().last() {
            Some(last) => last + 1,
            None => 0,
        };
        let mut children = Vec::new();
        for j in first..self.dataset.num_columns() as Item {
            parent
                .rows()
                .intersect_into(self.dataset.column(j), &mut scratch.rows_a);
            if scratch.rows_a.len() >= min_support {
                children.push(Candidate::new(
                    parent.items().extended(j),
                    scratch.rows_a.clone(),
                ));
            }
        }
        children
    }
}
