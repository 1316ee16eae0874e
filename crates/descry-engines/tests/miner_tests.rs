use descry_engines::{Adjustment, Dataset, ItemSet, Miner};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 20x20 block-diagonal data: rows 0..10 carry columns 0..10, rows 10..20
/// carry columns 10..20.
fn block_dataset() -> Dataset {
    let rows: Vec<Vec<u32>> = (0..20)
        .map(|r| {
            if r < 10 {
                (0..10).collect()
            } else {
                (10..20).collect()
            }
        })
        .collect();
    Dataset::from_rows(20, &rows).unwrap()
}

fn noise_dataset(rows: usize, columns: usize, density: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<u32>> = (0..rows)
        .map(|_| {
            (0..columns as u32)
                .filter(|_| rng.random_bool(density))
                .collect()
        })
        .collect();
    Dataset::from_rows(columns, &rows).unwrap()
}

fn within_block(items: &ItemSet) -> bool {
    items.iter().all(|j| j < 10) || items.iter().all(|j| j >= 10)
}

#[test]
fn fwer_blocks_stay_within_blocks() {
    let data = block_dataset();
    let model = Miner::builder()
        .adjustment(Adjustment::Fwer)
        .alpha(0.05)
        .min_support(2)
        .build()
        .unwrap()
        .fit(&data)
        .unwrap();

    let patterns = model.patterns();
    assert!(!patterns.is_empty());
    // The blocks are independent, so no discovered pattern crosses them.
    assert!(patterns.iter().all(|p| within_block(&p.items)));
    // Both blocks carry signal.
    assert!(patterns.iter().any(|p| p.items.iter().all(|j| j < 10)));
    assert!(patterns.iter().any(|p| p.items.iter().all(|j| j >= 10)));
    // Every block pattern holds in every block row.
    for p in &patterns {
        assert_eq!(data.itemset_support(&p.items), 10);
        assert!((p.frequency - 0.5).abs() < 1e-9);
    }
}

#[test]
fn fdr_blocks_stay_within_blocks() {
    let data = block_dataset();
    let model = Miner::builder()
        .adjustment(Adjustment::Fdr)
        .alpha(0.05)
        .build()
        .unwrap()
        .fit(&data)
        .unwrap();

    let patterns = model.patterns();
    assert!(!patterns.is_empty());
    assert!(patterns.iter().all(|p| within_block(&p.items)));
    assert!(patterns.iter().any(|p| p.items.iter().all(|j| j < 10)));
    assert!(patterns.iter().any(|p| p.items.iter().all(|j| j >= 10)));
}

#[test]
fn accepted_patterns_respect_min_support_and_caps() {
    let data = block_dataset();
    for adjustment in [Adjustment::Fwer, Adjustment::Fdr] {
        let min_support = 3;
        let model = Miner::builder()
            .adjustment(adjustment)
            .min_support(min_support)
            .build()
            .unwrap()
            .fit(&data)
            .unwrap();

        for pattern in model.patterns() {
            assert!(data.itemset_support(&pattern.items) >= min_support);
        }
        for item in 0..data.num_columns() as u32 {
            let factor = model.factor_of(item);
            assert!(factor.size() <= model.max_factor_size());
            assert!(factor.width() <= model.max_factor_width());
        }
    }
}

#[test]
fn vanishing_alpha_accepts_nothing() {
    let data = block_dataset();
    for adjustment in [Adjustment::Fwer, Adjustment::Fdr] {
        let model = Miner::builder()
            .adjustment(adjustment)
            .alpha(1e-30)
            .build()
            .unwrap()
            .fit(&data)
            .unwrap();
        assert!(model.patterns().is_empty(), "{adjustment:?}");
    }
}

#[test]
fn fwer_noise_is_quiet() {
    let data = noise_dataset(100, 50, 0.2, 42);
    let model = Miner::builder()
        .adjustment(Adjustment::Fwer)
        .alpha(0.01)
        .build()
        .unwrap()
        .fit(&data)
        .unwrap();
    assert!(model.patterns().len() <= 1);
}

#[test]
fn fdr_noise_stays_sparse() {
    let data = noise_dataset(100, 50, 0.2, 42);
    let model = Miner::builder()
        .adjustment(Adjustment::Fdr)
        .alpha(0.01)
        .build()
        .unwrap()
        .fit(&data)
        .unwrap();
    assert!(model.patterns().len() <= 5);
}

#[test]
fn discovery_budget_is_honored() {
    let data = block_dataset();
    let model = Miner::builder()
        .adjustment(Adjustment::Fwer)
        .max_discoveries(1)
        .build()
        .unwrap()
        .fit(&data)
        .unwrap();
    assert_eq!(model.patterns().len(), 1);
}

#[test]
fn zero_time_budget_returns_the_empty_model() {
    let data = block_dataset();
    let model = Miner::builder()
        .adjustment(Adjustment::Fwer)
        .max_seconds(0.0)
        .build()
        .unwrap()
        .fit(&data)
        .unwrap();
    assert!(model.patterns().is_empty());
}

#[test]
fn expansion_budget_limits_the_search() {
    let data = block_dataset();
    // Two expansions cover at most the first scoring batch of singletons.
    let model = Miner::builder()
        .adjustment(Adjustment::Fwer)
        .max_expansions(2)
        .workers(1)
        .build()
        .unwrap()
        .fit(&data)
        .unwrap();
    assert!(model.patterns().is_empty());
}

#[test]
fn grouped_signals_land_in_their_groups() {
    // Columns 0 and 1 co-occur only in group 0, columns 2 and 3 only in
    // group 1.
    let rows: Vec<Vec<u32>> = (0..40)
        .map(|r| match r {
            0..10 => vec![0, 1],
            20..30 => vec![2, 3],
            _ => vec![],
        })
        .collect();
    let data = Dataset::from_rows(4, &rows).unwrap();
    let labels: Vec<i64> = (0..40).map(|r| if r < 20 { 0 } else { 1 }).collect();

    let models = Miner::builder()
        .adjustment(Adjustment::Fdr)
        .alpha(0.05)
        .build()
        .unwrap()
        .fit_grouped(&data, &labels)
        .unwrap();
    assert_eq!(models.len(), 2);

    let pair01 = ItemSet::from_sorted(&[0, 1]);
    let pair23 = ItemSet::from_sorted(&[2, 3]);

    let group0: Vec<ItemSet> = models[0].patterns().into_iter().map(|p| p.items).collect();
    let group1: Vec<ItemSet> = models[1].patterns().into_iter().map(|p| p.items).collect();

    assert!(group0.contains(&pair01));
    assert!(!group0.contains(&pair23));
    assert!(group1.contains(&pair23));
    assert!(!group1.contains(&pair01));
}

#[test]
fn one_label_matches_single_group_mode() {
    let data = block_dataset();
    let labels = vec![7i64; data.num_rows()];

    for adjustment in [Adjustment::Fwer, Adjustment::Fdr] {
        let build = || {
            Miner::builder()
                .adjustment(adjustment)
                .workers(2)
                .build()
                .unwrap()
        };
        let single = build().fit(&data).unwrap();
        let grouped = build().fit_grouped(&data, &labels).unwrap();

        assert_eq!(grouped.len(), 1);
        assert_eq!(single.patterns(), grouped[0].patterns(), "{adjustment:?}");
    }
}

#[test]
fn factor_size_one_keeps_patterns_disjoint() {
    let data = block_dataset();
    let model = Miner::builder()
        .adjustment(Adjustment::Fwer)
        .max_factor_size(1)
        .build()
        .unwrap()
        .fit(&data)
        .unwrap();

    let patterns = model.patterns();
    assert!(!patterns.is_empty());
    for item in 0..data.num_columns() as u32 {
        assert!(model.factor_of(item).size() <= 1);
    }
    // One pattern per factor and factors partition the columns, so no two
    // patterns may share an item.
    for (i, a) in patterns.iter().enumerate() {
        for b in patterns.iter().skip(i + 1) {
            assert!(a.items.iter().all(|item| !b.items.contains(item)));
        }
    }
}

#[test]
fn identical_runs_are_identical() {
    let data = block_dataset();
    for adjustment in [Adjustment::Fwer, Adjustment::Fdr] {
        let run = || {
            Miner::builder()
                .adjustment(adjustment)
                .workers(4)
                .build()
                .unwrap()
                .fit(&data)
                .unwrap()
                .patterns()
        };
        assert_eq!(run(), run(), "{adjustment:?}");
    }
}

#[test]
fn grouped_runs_are_deterministic() {
    let data = noise_dataset(60, 12, 0.4, 9);
    let labels: Vec<i64> = (0..60).map(|r| (r % 3) as i64).collect();
    let run = || {
        Miner::builder()
            .adjustment(Adjustment::Fdr)
            .alpha(0.2)
            .workers(3)
            .build()
            .unwrap()
            .fit_grouped(&data, &labels)
            .unwrap()
            .into_iter()
            .map(|m| m.patterns())
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}
