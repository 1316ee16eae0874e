//! Per-group scoring for labeled datasets.
//!
//! Group mode keeps one model per label; the group's rows act as the
//! population and the candidate's rows are restricted to the mask before
//! testing. The shared significance state (threshold or LORD wealth) lives
//! with the caller.

use descry_core::{Candidate, GroupMask, MaxEnt, WorkerScratch, log_binomial_tail};

/// One group's view of a candidate.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GroupScore {
    /// Rows of the candidate inside the group.
    pub support: usize,
    /// `-log P(X >= support)` under the group's model.
    pub surprise: f64,
}

/// Candidate surprise against a single (unmasked) model.
pub(crate) fn surprise(candidate: &Candidate, model: &MaxEnt, scratch: &mut WorkerScratch) -> f64 {
    let expected = model.expectation(candidate.items(), &mut scratch.infer);
    -log_binomial_tail(
        candidate.support() as u64,
        expected,
        model.num_rows() as u64,
    )
}

/// Candidate surprise restricted to one group's rows.
pub(crate) fn group_score(
    candidate: &Candidate,
    mask: &GroupMask,
    model: &MaxEnt,
    scratch: &mut WorkerScratch,
) -> GroupScore {
    candidate.rows().intersect_into(mask.rows(), &mut scratch.rows_b);
    let support = scratch.rows_b.len();
    let expected = model.expectation(candidate.items(), &mut scratch.infer);
    GroupScore {
        support,
        surprise: -log_binomial_tail(support as u64, expected, mask.len() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use descry_core::{Dataset, ItemSet, Lattice};

    #[test]
    fn group_support_is_masked() {
        let data = Dataset::from_rows(
            2,
            &[vec![0, 1], vec![0, 1], vec![0], vec![0, 1]],
        )
        .unwrap();
        let masks = GroupMask::split(4, &[0, 0, 1, 1]).unwrap();
        let model = MaxEnt::from_masked(&data, &masks[0], 8, 50);
        let mut scratch = WorkerScratch::new(4, 8);

        let items = ItemSet::from_sorted(&[0, 1]);
        let candidate = Lattice::new(&data)
            .singletons(1)
            .into_iter()
            .find(|c| c.items().items() == [0])
            .map(|parent| {
                Lattice::new(&data)
                    .extend(&parent, 1, &mut scratch)
                    .remove(0)
            })
            .unwrap();
        assert_eq!(candidate.items(), &items);

        let score = group_score(&candidate, &masks[0], &model, &mut scratch);
        assert_eq!(score.support, 2);
        let score = group_score(&candidate, &masks[1], &model, &mut scratch);
        assert_eq!(score.support, 1);
    }

    #[test]
    fn single_full_group_matches_unmasked_surprise() {
        let data = Dataset::from_rows(2, &[vec![0, 1], vec![0, 1], vec![0]]).unwrap();
        let masks = GroupMask::split(3, &[7, 7, 7]).unwrap();
        let model = MaxEnt::from_dataset(&data, 8, 50);
        let masked = MaxEnt::from_masked(&data, &masks[0], 8, 50);
        let mut scratch = WorkerScratch::new(3, 8);

        let parent = Lattice::new(&data).singletons(1).remove(0);
        let candidate = Lattice::new(&data).extend(&parent, 1, &mut scratch).remove(0);

        let plain = surprise(&candidate, &model, &mut scratch);
        let grouped = group_score(&candidate, &masks[0], &masked, &mut scratch);
        assert_eq!(grouped.support, candidate.support());
        assert!((plain - grouped.surprise).abs() <= 1e-12);
    }
}
