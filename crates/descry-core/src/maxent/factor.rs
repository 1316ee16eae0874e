use crate::items::{Item, ItemSet};

/// Marginal-matching tolerance for factor fitting.
pub(crate) const FIT_TOL: f64 = 1e-9;
pub(crate) const MAX_FIT_SWEEPS: usize = 128;

/// Frequencies are pinned away from 0 and 1 so the multiplicative updates
/// stay finite.
pub(crate) const FREQ_FLOOR: f64 = 1e-12;

pub(crate) fn clamp_frequency(f: f64) -> f64 {
    f.clamp(FREQ_FLOOR, 1.0 - FREQ_FLOOR)
}

/// A pattern constraint inside a factor.
#[derive(Clone, Debug)]
pub struct FactorPattern {
    /// Global column ids of the pattern.
    items: ItemSet,
    /// The same items as positions within the owning factor.
    mask: u128,
    /// Empirical frequency the fitted marginal must reproduce.
    target: f64,
    /// Multiplicative coefficient, 1.0 = no interaction.
    weight: f64,
}

impl FactorPattern {
    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    pub fn frequency(&self) -> f64 {
        self.target
    }
}

/// One local component of the maximum-entropy null model.
///
/// A factor covers a bounded set of singletons and the patterns inserted
/// over them. The fitted distribution over its columns is
///
/// ```text
/// p(x) ∝ ∏_j q_j^{x_j} (1-q_j)^{1-x_j} · ∏_k u_k^{[P_k ⊆ x]}
/// ```
///
/// and is constrained so that every singleton marginal matches `targets[j]`
/// and every pattern marginal matches its empirical frequency.
///
/// Marginal queries expand `∏_k u_k^{[P_k ⊆ x]}` by inclusion–exclusion
/// over subsets of the inserted patterns: `2^size` signed terms, each a
/// product of singleton probabilities over a union mask. The pattern-count
/// cap keeps this enumeration small no matter how wide the factor grows;
/// item positions are `u128` bits, bounding the width at 128.
#[derive(Clone, Debug, Default)]
pub struct Factor {
    items: ItemSet,
    /// Fitted per-singleton Bernoulli probabilities, aligned with `items`.
    probs: Vec<f64>,
    /// Empirical singleton frequencies, aligned with `items`.
    targets: Vec<f64>,
    patterns: Vec<FactorPattern>,
}

impl Factor {
    /// The initial model: one factor per singleton, no interactions.
    pub fn singleton(item: Item, frequency: f64) -> Self {
        let frequency = clamp_frequency(frequency);
        Factor {
            items: ItemSet::singleton(item),
            probs: vec![frequency],
            targets: vec![frequency],
            patterns: Vec::new(),
        }
    }

    /// Number of singletons covered.
    pub fn width(&self) -> usize {
        self.items.len()
    }

    /// Number of inserted patterns.
    pub fn size(&self) -> usize {
        self.patterns.len()
    }

    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    pub fn patterns(&self) -> &[FactorPattern] {
        &self.patterns
    }

    /// Tombstone check: merged-away factors are left empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Positions of the covered subset of `items` as a bit mask. Items not
    /// covered by this factor are ignored.
    pub(crate) fn mask_of(&self, items: &ItemSet) -> u128 {
        let mut mask = 0u128;
        for item in items.iter() {
            if let Some(pos) = self.items.position(item) {
                mask |= 1u128 << pos;
            }
        }
        mask
    }

    /// Marginal probability that all positions in `required` are set.
    pub fn marginal(&self, required: u128) -> f64 {
        let normalizer = self.mass(0);
        if normalizer <= 0.0 {
            return 0.0;
        }
        (self.mass(required) / normalizer).clamp(0.0, 1.0)
    }

    /// Unnormalized measure of `{x : required ⊆ x}`:
    /// `Σ_{T ⊆ patterns} ∏_{k∈T} (u_k - 1) · ∏_{j ∈ U_T ∪ required} q_j`.
    fn mass(&self, required: u128) -> f64 {
        self.mass_rec(0, required, self.prob_of_mask(required))
    }

    fn mass_rec(&self, idx: usize, union: u128, weight: f64) -> f64 {
        if weight == 0.0 {
            return 0.0;
        }
        if idx == self.patterns.len() {
            return weight;
        }
        let pattern = &self.patterns[idx];
        let mut total = self.mass_rec(idx + 1, union, weight);
        let added = pattern.mask & !union;
        let with = weight * (pattern.weight - 1.0) * self.prob_of_mask(added);
        total += self.mass_rec(idx + 1, union | pattern.mask, with);
        total
    }

    fn prob_of_mask(&self, mask: u128) -> f64 {
        let mut prob = 1.0;
        let mut rest = mask;
        while rest != 0 {
            let pos = rest.trailing_zeros() as usize;
            prob *= self.probs[pos];
            rest &= rest - 1;
        }
        prob
    }

    /// Merges `parts` (pairwise disjoint) into one factor holding all their
    /// singletons and patterns plus the newly accepted pattern, then refits.
    pub(crate) fn merge(parts: Vec<Factor>, new_items: &ItemSet, frequency: f64) -> Factor {
        let mut items = ItemSet::new();
        for part in &parts {
            items = items.union(&part.items);
        }
        debug_assert!(new_items.is_subset_of(&items));

        let mut targets = vec![0.0; items.len()];
        for part in &parts {
            for (local, item) in part.items.iter().enumerate() {
                let pos = items.position(item).unwrap_or_else(|| {
                    unreachable!("merged factor covers every part's singletons")
                });
                targets[pos] = part.targets[local];
            }
        }

        let mut merged = Factor {
            probs: targets.clone(),
            targets,
            patterns: Vec::new(),
            items,
        };
        for part in parts {
            for mut pattern in part.patterns {
                pattern.mask = merged.mask_of(&pattern.items);
                pattern.weight = 1.0;
                merged.patterns.push(pattern);
            }
        }
        merged.patterns.push(FactorPattern {
            mask: merged.mask_of(new_items),
            items: new_items.clone(),
            target: clamp_frequency(frequency),
            weight: 1.0,
        });

        merged.refit();
        merged
    }

    /// Iterative proportional scaling: sweeps every singleton and pattern
    /// constraint, rescaling its coefficient so the marginal hits the
    /// target, until the worst residual is below [FIT_TOL].
    fn refit(&mut self) {
        for _ in 0..MAX_FIT_SWEEPS {
            let mut worst = 0.0f64;

            for j in 0..self.items.len() {
                let bit = 1u128 << j;
                let current = self.marginal(bit);
                let target = self.targets[j];
                worst = worst.max((current - target).abs());

                let current = clamp_frequency(current);
                let q = clamp_frequency(self.probs[j]);
                let odds =
                    q / (1.0 - q) * (target * (1.0 - current)) / (current * (1.0 - target));
                self.probs[j] = odds / (1.0 + odds);
            }

            for k in 0..self.patterns.len() {
                let current = self.marginal(self.patterns[k].mask);
                let target = self.patterns[k].target;
                worst = worst.max((current - target).abs());

                let current = clamp_frequency(current);
                self.patterns[k].weight *=
                    (target * (1.0 - current)) / (current * (1.0 - target));
            }

            if worst <= FIT_TOL {
                break;
            }
        }
    }
}
