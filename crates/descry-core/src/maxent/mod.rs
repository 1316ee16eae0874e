//! The maximum-entropy null model: a product of local factors over disjoint
//! singleton sets.
//!
//! The model starts as the independence distribution (one width-1 factor per
//! singleton) and grows monotonically: every accepted pattern merges the
//! factors it spans into one and becomes a constraint of the merged factor.
//! Factors are never split, and insertions that would blow a factor past its
//! size or width cap are refused instead.

mod factor;
pub mod scratch;

pub use factor::{Factor, FactorPattern};

use crate::dataset::{Dataset, GroupMask};
use crate::items::ItemSet;
use factor::clamp_frequency;
use scratch::InferScratch;

/// Hard cap on patterns per factor; configured caps are clamped to this.
/// Inference enumerates pattern subsets, so this bounds it at `2^12` terms.
pub const MAX_FACTOR_SIZE: usize = 12;

/// Hard cap on singletons per factor: item positions are bits of a `u128`.
pub const MAX_FACTOR_WIDTH: usize = 128;

/// An accepted pattern as reported to callers.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pattern {
    pub items: ItemSet,
    pub frequency: f64,
}

/// Factorized maximum-entropy distribution over the dataset's columns.
#[derive(Clone, Debug)]
pub struct MaxEnt {
    num_rows: usize,
    max_factor_size: usize,
    max_factor_width: usize,
    /// Factor storage; merged-away entries stay behind as empty tombstones.
    factors: Vec<Factor>,
    /// Owning factor index per singleton.
    owner: Vec<usize>,
}

impl MaxEnt {
    /// Independence model over explicit singleton frequencies.
    pub fn new(
        frequencies: &[f64],
        num_rows: usize,
        max_factor_size: usize,
        max_factor_width: usize,
    ) -> Self {
        MaxEnt {
            num_rows,
            max_factor_size: max_factor_size.min(MAX_FACTOR_SIZE),
            max_factor_width,
            factors: frequencies
                .iter()
                .enumerate()
                .map(|(item, &f)| Factor::singleton(item as u32, clamp_frequency(f)))
                .collect(),
            owner: (0..frequencies.len()).collect(),
        }
    }

    /// Independence model from a dataset's empirical column frequencies.
    pub fn from_dataset(data: &Dataset, max_factor_size: usize, max_factor_width: usize) -> Self {
        let frequencies: Vec<f64> = (0..data.num_columns() as u32)
            .map(|j| data.frequency(j))
            .collect();
        MaxEnt::new(&frequencies, data.num_rows(), max_factor_size, max_factor_width)
    }

    /// Independence model restricted to one group's rows.
    pub fn from_masked(
        data: &Dataset,
        mask: &GroupMask,
        max_factor_size: usize,
        max_factor_width: usize,
    ) -> Self {
        let rows = mask.len();
        let frequencies: Vec<f64> = (0..data.num_columns() as u32)
            .map(|j| {
                if rows == 0 {
                    0.0
                } else {
                    data.column(j).intersection_len(mask.rows()) as f64 / rows as f64
                }
            })
            .collect();
        MaxEnt::new(&frequencies, rows, max_factor_size, max_factor_width)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_singletons(&self) -> usize {
        self.owner.len()
    }

    pub fn max_factor_size(&self) -> usize {
        self.max_factor_size
    }

    pub fn max_factor_width(&self) -> usize {
        self.max_factor_width
    }

    /// Number of live (non-tombstone) factors.
    pub fn factor_count(&self) -> usize {
        self.factors.iter().filter(|f| !f.is_empty()).count()
    }

    pub fn factor_of(&self, item: u32) -> &Factor {
        &self.factors[self.owner[item as usize]]
    }

    /// Probability that every column of `items` is set in a random row.
    ///
    /// Factors disjoint from `items` marginalize to 1 and drop out; the rest
    /// contribute the marginal of the covered positions, multiplied.
    pub fn expectation(&self, items: &ItemSet, scratch: &mut InferScratch) -> f64 {
        self.resolve_factors(items, scratch);
        scratch
            .factors
            .iter()
            .map(|&(fid, mask)| self.factors[fid].marginal(mask))
            .product()
    }

    /// Whether inserting `items` would violate the factor caps. Side-effect
    /// free.
    pub fn is_forbidden(&self, items: &ItemSet, scratch: &mut InferScratch) -> bool {
        self.resolve_factors(items, scratch);
        let mut merged_size = 1; // the pattern itself
        let mut merged_width = 0;
        for &(fid, _) in &scratch.factors {
            merged_size += self.factors[fid].size();
            merged_width += self.factors[fid].width();
        }
        merged_size > self.max_factor_size || merged_width > self.max_factor_width
    }

    /// Inserts `items` with empirical frequency `frequency`, merging the
    /// factors it spans and refitting the merged factor. Returns false (and
    /// leaves the model untouched) when the merge would violate the caps.
    pub fn insert_pattern(&mut self, frequency: f64, items: &ItemSet) -> bool {
        if items.is_empty() {
            return false;
        }
        let mut scratch = InferScratch::default();
        if self.is_forbidden(items, &mut scratch) {
            return false;
        }

        let mut ids: Vec<usize> = scratch.factors.iter().map(|&(fid, _)| fid).collect();
        ids.sort_unstable();
        let target = ids[0];

        let parts: Vec<Factor> = ids
            .iter()
            .map(|&fid| std::mem::take(&mut self.factors[fid]))
            .collect();
        let merged = Factor::merge(parts, items, frequency);
        for item in merged.items().iter() {
            self.owner[item as usize] = target;
        }
        self.factors[target] = merged;
        true
    }

    /// All accepted patterns with their inserted empirical frequencies.
    pub fn patterns(&self) -> Vec<Pattern> {
        self.factors
            .iter()
            .filter(|f| !f.is_empty())
            .flat_map(|f| f.patterns())
            .map(|p| Pattern {
                items: p.items().clone(),
                frequency: p.frequency(),
            })
            .collect()
    }

    /// Groups `items` by owning factor into `scratch.factors`, accumulating
    /// the local position mask per factor.
    fn resolve_factors(&self, items: &ItemSet, scratch: &mut InferScratch) {
        scratch.factors.clear();
        for item in items.iter() {
            let fid = self.owner[item as usize];
            let bit = 1u128 << self.factors[fid]
                .items()
                .position(item)
                .unwrap_or_else(|| unreachable!("owner map points into the factor"));
            match scratch.factors.iter_mut().find(|(id, _)| *id == fid) {
                Some((_, mask)) => *mask |= bit,
                None => scratch.factors.push((fid, bit)),
            }
        }
    }
}
