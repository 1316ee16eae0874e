//! The fit entry point.
//!
//! A [Miner] owns the validated run configuration; [Miner::fit] and
//! [Miner::fit_grouped] wire the model, the significance control and the
//! discoverer together and return the fitted model(s). All shared state is
//! mutated only from the report step, between scoring batches.

use crate::budget::Budget;
use crate::discover::{DiscoveryOutcome, discover_patterns, support_priority};
use crate::groups::{group_score, surprise};
use crate::significance::{FwerControl, LordControl};
use descry_core::{
    Candidate, Dataset, Executor, GroupMask, Lattice, MAX_FACTOR_SIZE, MAX_FACTOR_WIDTH, MaxEnt,
    ScratchPool, WorkerScratch,
};
use descry_error::{DescryError, DescryResult, ErrorCode};
use std::sync::{Arc, RwLock};
use tracing::info;

/// Which multiple-testing regime governs acceptance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
    /// Family-wise error rate: layer-adjusted log threshold.
    Fwer,
    /// False discovery rate: sequential LORD alpha-investing.
    Fdr,
}

/// Fluent configuration for a mining run.
///
/// Invalid settings are collected rather than panicking; [MinerBuilder::build]
/// fails with everything that was wrong.
#[derive(Clone, Debug)]
pub struct MinerBuilder {
    adjustment: Adjustment,
    alpha: f64,
    min_support: usize,
    max_factor_size: usize,
    max_factor_width: usize,
    lord_factor: f64,
    workers: Option<usize>,
    budget: Budget,
    errors: Vec<String>,
}

impl Default for MinerBuilder {
    fn default() -> Self {
        MinerBuilder {
            adjustment: Adjustment::Fwer,
            alpha: 0.05,
            min_support: 2,
            max_factor_size: 8,
            max_factor_width: 50,
            lord_factor: 0.5,
            workers: None,
            budget: Budget::unbounded(),
            errors: Vec::new(),
        }
    }
}

impl MinerBuilder {
    pub fn adjustment(mut self, adjustment: Adjustment) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Target error rate (FWER level or FDR target). Default 0.05.
    pub fn alpha(mut self, alpha: f64) -> Self {
        if !(alpha > 0.0 && alpha <= 1.0) {
            self.errors
                .push(format!("alpha must be in (0, 1], got {alpha}"));
        }
        self.alpha = alpha;
        self
    }

    /// Minimum absolute row count per pattern. Default 2.
    pub fn min_support(mut self, min_support: usize) -> Self {
        self.min_support = min_support;
        self
    }

    /// Cap on patterns per factor. Default 8, hard cap 12.
    pub fn max_factor_size(mut self, max_factor_size: usize) -> Self {
        if max_factor_size == 0 || max_factor_size > MAX_FACTOR_SIZE {
            self.errors.push(format!(
                "max_factor_size must be in 1..={MAX_FACTOR_SIZE}, got {max_factor_size}"
            ));
        }
        self.max_factor_size = max_factor_size;
        self
    }

    /// Cap on singletons per factor. Default 50, hard cap 128.
    pub fn max_factor_width(mut self, max_factor_width: usize) -> Self {
        if max_factor_width == 0 || max_factor_width > MAX_FACTOR_WIDTH {
            self.errors.push(format!(
                "max_factor_width must be in 1..={MAX_FACTOR_WIDTH}, got {max_factor_width}"
            ));
        }
        self.max_factor_width = max_factor_width;
        self
    }

    /// Fraction of the FDR budget spent up front by LORD. Default 0.5.
    pub fn lord_factor(mut self, factor: f64) -> Self {
        if !(factor > 0.0 && factor < 1.0) {
            self.errors
                .push(format!("lord_factor must be in (0, 1), got {factor}"));
        }
        self.lord_factor = factor;
        self
    }

    /// Node-expansion budget. Unbounded by default.
    pub fn max_expansions(mut self, max_expansions: usize) -> Self {
        self.budget = self.budget.with_max_expansions(max_expansions);
        self
    }

    /// Accepted-pattern budget. Unbounded by default.
    pub fn max_discoveries(mut self, max_discoveries: usize) -> Self {
        self.budget = self.budget.with_max_discoveries(max_discoveries);
        self
    }

    /// Wall-clock budget in seconds. Unbounded by default.
    pub fn max_seconds(mut self, max_seconds: f64) -> Self {
        if !(max_seconds >= 0.0) {
            self.errors
                .push(format!("max_seconds must be non-negative, got {max_seconds}"));
        }
        self.budget = self.budget.with_max_seconds(max_seconds);
        self
    }

    /// Scoring worker count. Defaults to the machine's parallelism.
    pub fn workers(mut self, workers: usize) -> Self {
        if workers == 0 {
            self.errors.push("workers must be at least 1".to_string());
        }
        self.workers = Some(workers);
        self
    }

    pub fn build(mut self) -> DescryResult<Miner> {
        if self.errors.is_empty() {
            return Ok(Miner {
                adjustment: self.adjustment,
                alpha: self.alpha,
                min_support: self.min_support,
                max_factor_size: self.max_factor_size,
                max_factor_width: self.max_factor_width,
                lord_factor: self.lord_factor,
                workers: self.workers,
                budget: self.budget,
            });
        }
        let errors: Vec<DescryError> = self
            .errors
            .drain(..)
            .map(|message| DescryError::new(ErrorCode::InvalidParameter, message))
            .collect();
        Err(DescryError::aggregate(errors))
    }
}

/// A validated mining configuration.
#[derive(Clone, Debug)]
pub struct Miner {
    adjustment: Adjustment,
    alpha: f64,
    min_support: usize,
    max_factor_size: usize,
    max_factor_width: usize,
    lord_factor: f64,
    workers: Option<usize>,
    budget: Budget,
}

impl Miner {
    pub fn builder() -> MinerBuilder {
        MinerBuilder::default()
    }

    pub fn adjustment(&self) -> Adjustment {
        self.adjustment
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn executor(&self, num_rows: usize) -> Executor {
        let scratch = Arc::new(ScratchPool::new(num_rows, self.max_factor_width + 1));
        match self.workers {
            Some(1) => Executor::serial(scratch),
            Some(n) => Executor::worker_pool(n, scratch),
            None => Executor::hardware(scratch),
        }
    }

    /// Mines one model over the whole dataset.
    pub fn fit(&self, dataset: &Dataset) -> DescryResult<MaxEnt> {
        let model = MaxEnt::from_dataset(dataset, self.max_factor_size, self.max_factor_width);
        if dataset.num_rows() == 0 || dataset.num_columns() == 0 {
            return Ok(model);
        }

        let lattice = Lattice::new(dataset);
        let executor = self.executor(dataset.num_rows());
        let model = Arc::new(RwLock::new(model));

        let outcome = match self.adjustment {
            Adjustment::Fwer => self.run_fwer(&lattice, &executor, &model),
            Adjustment::Fdr => self.run_fdr(&lattice, &executor, &model),
        };
        let model = unwrap_shared(model);
        info!(
            adjustment = ?self.adjustment,
            patterns = model.patterns().len(),
            expansions = outcome.expansions,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            stop = ?outcome.stop,
            "discovery finished"
        );
        Ok(model)
    }

    /// Mines one model per group label, sharing a single adjusted threshold
    /// (FWER) or LORD state (FDR) across groups.
    pub fn fit_grouped(&self, dataset: &Dataset, labels: &[i64]) -> DescryResult<Vec<MaxEnt>> {
        let masks = GroupMask::split(dataset.num_rows(), labels)?;
        let models: Vec<MaxEnt> = masks
            .iter()
            .map(|mask| {
                MaxEnt::from_masked(dataset, mask, self.max_factor_size, self.max_factor_width)
            })
            .collect();
        if dataset.num_rows() == 0 || dataset.num_columns() == 0 {
            return Ok(models);
        }

        let lattice = Lattice::new(dataset);
        let executor = self.executor(dataset.num_rows());
        let masks = Arc::new(masks);
        let models = Arc::new(RwLock::new(models));

        let outcome = match self.adjustment {
            Adjustment::Fwer => self.run_fwer_grouped(&lattice, &executor, &masks, &models),
            Adjustment::Fdr => self.run_fdr_grouped(&lattice, &executor, &masks, &models),
        };
        let models = unwrap_shared(models);
        info!(
            adjustment = ?self.adjustment,
            groups = models.len(),
            patterns = models.iter().map(|m| m.patterns().len()).sum::<usize>(),
            expansions = outcome.expansions,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            stop = ?outcome.stop,
            "grouped discovery finished"
        );
        Ok(models)
    }

    fn run_fwer(
        &self,
        lattice: &Lattice<'_>,
        executor: &Executor,
        model: &Arc<RwLock<MaxEnt>>,
    ) -> DiscoveryOutcome {
        let control = Arc::new(FwerControl::new(self.alpha, lattice.num_singletons()));
        let min_support = self.min_support;

        let score_model = Arc::clone(model);
        let score_control = Arc::clone(&control);
        let score_fn = Arc::new(move |cand: &Candidate, scratch: &mut WorkerScratch| {
            if cand.support() < min_support {
                return 0.0;
            }
            let model = score_model.read().unwrap();
            if model.is_forbidden(cand.items(), &mut scratch.infer) {
                return 0.0;
            }
            let pv = surprise(cand, &model, scratch);
            if score_control.admits(pv, cand.len()) { pv } else { 0.0 }
        });

        let forbidden_model = Arc::clone(model);
        let forbidden_fn = move |cand: &Candidate, scratch: &mut WorkerScratch| {
            forbidden_model
                .read()
                .unwrap()
                .is_forbidden(cand.items(), &mut scratch.infer)
        };

        let report_model = Arc::clone(model);
        let report_control = Arc::clone(&control);
        let report_fn = move |cand: &Candidate, scratch: &mut WorkerScratch| {
            let mut model = report_model.write().unwrap();
            // Earlier acceptances in this batch may have changed the model;
            // the acceptance test must hold against the current state.
            let pv = surprise(cand, &model, scratch);
            if !report_control.admits(pv, cand.len()) {
                return false;
            }
            let frequency = cand.support() as f64 / model.num_rows() as f64;
            if model.insert_pattern(frequency, cand.items()) {
                report_control.observe_accepted(cand.len());
                true
            } else {
                false
            }
        };

        discover_patterns(
            lattice,
            executor,
            min_support,
            &self.budget,
            score_fn,
            forbidden_fn,
            report_fn,
            support_priority,
        )
    }

    fn run_fdr(
        &self,
        lattice: &Lattice<'_>,
        executor: &Executor,
        model: &Arc<RwLock<MaxEnt>>,
    ) -> DiscoveryOutcome {
        let mut lord = LordControl::with_factor(self.alpha, self.lord_factor);
        let prune = lord.prune_level();
        let min_support = self.min_support;

        let score_model = Arc::clone(model);
        let score_fn = Arc::new(move |cand: &Candidate, scratch: &mut WorkerScratch| {
            if cand.support() < min_support {
                return 0.0;
            }
            let model = score_model.read().unwrap();
            if model.is_forbidden(cand.items(), &mut scratch.infer) {
                return 0.0;
            }
            let pv = surprise(cand, &model, scratch);
            if pv > prune { pv } else { 0.0 }
        });

        let forbidden_model = Arc::clone(model);
        let forbidden_fn = move |cand: &Candidate, scratch: &mut WorkerScratch| {
            forbidden_model
                .read()
                .unwrap()
                .is_forbidden(cand.items(), &mut scratch.infer)
        };

        let report_model = Arc::clone(model);
        let report_fn = move |cand: &Candidate, scratch: &mut WorkerScratch| {
            let mut model = report_model.write().unwrap();
            let pv = surprise(cand, &model, scratch);
            if pv <= prune {
                return false;
            }
            if !lord.test((-pv).exp()) {
                return false;
            }
            let frequency = cand.support() as f64 / model.num_rows() as f64;
            model.insert_pattern(frequency, cand.items())
        };

        discover_patterns(
            lattice,
            executor,
            min_support,
            &self.budget,
            score_fn,
            forbidden_fn,
            report_fn,
            support_priority,
        )
    }

    fn run_fwer_grouped(
        &self,
        lattice: &Lattice<'_>,
        executor: &Executor,
        masks: &Arc<Vec<GroupMask>>,
        models: &Arc<RwLock<Vec<MaxEnt>>>,
    ) -> DiscoveryOutcome {
        let control = Arc::new(FwerControl::new(self.alpha, lattice.num_singletons()));
        let min_support = self.min_support;

        let score_masks = Arc::clone(masks);
        let score_models = Arc::clone(models);
        let score_control = Arc::clone(&control);
        let score_fn = Arc::new(move |cand: &Candidate, scratch: &mut WorkerScratch| {
            if cand.support() < min_support {
                return 0.0;
            }
            let models = score_models.read().unwrap();
            let gate = -score_control.threshold(cand.len());
            let mut total = 0.0;
            for (mask, model) in score_masks.iter().zip(models.iter()) {
                if model.is_forbidden(cand.items(), &mut scratch.infer) {
                    continue;
                }
                let score = group_score(cand, mask, model, scratch);
                if score.surprise >= gate {
                    total += score.surprise - gate;
                }
            }
            total
        });

        let forbidden_models = Arc::clone(models);
        let forbidden_fn = move |cand: &Candidate, scratch: &mut WorkerScratch| {
            let models = forbidden_models.read().unwrap();
            models
                .iter()
                .all(|model| model.is_forbidden(cand.items(), &mut scratch.infer))
        };

        let report_masks = Arc::clone(masks);
        let report_models = Arc::clone(models);
        let report_control = Arc::clone(&control);
        let report_fn = move |cand: &Candidate, scratch: &mut WorkerScratch| {
            let mut models = report_models.write().unwrap();
            let gate = -report_control.threshold(cand.len());
            let mut accepted = false;
            for (mask, model) in report_masks.iter().zip(models.iter_mut()) {
                let score = group_score(cand, mask, model, scratch);
                if score.surprise < gate {
                    continue;
                }
                let frequency = score.support as f64 / mask.len() as f64;
                if model.insert_pattern(frequency, cand.items()) {
                    accepted = true;
                }
            }
            if accepted {
                report_control.observe_accepted(cand.len());
            }
            accepted
        };

        discover_patterns(
            lattice,
            executor,
            min_support,
            &self.budget,
            score_fn,
            forbidden_fn,
            report_fn,
            support_priority,
        )
    }

    fn run_fdr_grouped(
        &self,
        lattice: &Lattice<'_>,
        executor: &Executor,
        masks: &Arc<Vec<GroupMask>>,
        models: &Arc<RwLock<Vec<MaxEnt>>>,
    ) -> DiscoveryOutcome {
        let mut lord = LordControl::with_factor(self.alpha, self.lord_factor);
        let prune = lord.prune_level();
        let min_support = self.min_support;

        let score_masks = Arc::clone(masks);
        let score_models = Arc::clone(models);
        let score_fn = Arc::new(move |cand: &Candidate, scratch: &mut WorkerScratch| {
            if cand.support() < min_support {
                return 0.0;
            }
            let models = score_models.read().unwrap();
            let mut total = 0.0;
            for (mask, model) in score_masks.iter().zip(models.iter()) {
                if model.is_forbidden(cand.items(), &mut scratch.infer) {
                    continue;
                }
                let score = group_score(cand, mask, model, scratch);
                if score.surprise > prune {
                    total += score.surprise - prune;
                }
            }
            total
        });

        let forbidden_models = Arc::clone(models);
        let forbidden_fn = move |cand: &Candidate, scratch: &mut WorkerScratch| {
            let models = forbidden_models.read().unwrap();
            models
                .iter()
                .all(|model| model.is_forbidden(cand.items(), &mut scratch.infer))
        };

        let report_masks = Arc::clone(masks);
        let report_models = Arc::clone(models);
        let report_fn = move |cand: &Candidate, scratch: &mut WorkerScratch| {
            let mut models = report_models.write().unwrap();
            let mut accepted = false;
            // One shared LORD state governs admissions; groups are tested
            // in ascending label order.
            for (mask, model) in report_masks.iter().zip(models.iter_mut()) {
                let score = group_score(cand, mask, model, scratch);
                if score.surprise <= prune {
                    continue;
                }
                if !lord.test((-score.surprise).exp()) {
                    continue;
                }
                let frequency = score.support as f64 / mask.len() as f64;
                if model.insert_pattern(frequency, cand.items()) {
                    accepted = true;
                }
            }
            accepted
        };

        discover_patterns(
            lattice,
            executor,
            min_support,
            &self.budget,
            score_fn,
            forbidden_fn,
            report_fn,
            support_priority,
        )
    }
}

fn unwrap_shared<T: Clone>(shared: Arc<RwLock<T>>) -> T {
    match Arc::try_unwrap(shared) {
        Ok(lock) => lock.into_inner().unwrap(),
        Err(shared) => shared.read().unwrap().clone(),
    }
}

/// One-call entry point with default options.
pub fn fit(adjustment: Adjustment, dataset: &Dataset) -> DescryResult<MaxEnt> {
    Miner::builder().adjustment(adjustment).build()?.fit(dataset)
}

/// One-call grouped entry point with default options.
pub fn fit_grouped(
    adjustment: Adjustment,
    dataset: &Dataset,
    labels: &[i64],
) -> DescryResult<Vec<MaxEnt>> {
    Miner::builder()
        .adjustment(adjustment)
        .build()?
        .fit_grouped(dataset, labels)
}
