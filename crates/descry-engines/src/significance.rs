//! Multiple-testing control for the discoverer.
//!
//! Two regimes share the candidate pipeline: a family-wise (FWER) threshold
//! adjusted per itemset length, and sequential false-discovery control via
//! the LORD alpha-investing procedure.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Log-space testing threshold for an itemset of length `k` among `m`
/// singletons at level `alpha`:
///
/// ```text
/// log alpha - k * (1 + log m - log k)
/// ```
///
/// A Stirling bound on `log binom(m, k)`, i.e. a Bonferroni-style correction
/// over the hypotheses at layer `k`. Always `<= 0` for `alpha <= 1`; a
/// candidate passes when its surprise `-log p` reaches the threshold's
/// magnitude.
pub fn log_fwer_adjustment(alpha: f64, k: usize, m: usize) -> f64 {
    let k = k.max(1) as f64;
    let m = m.max(1) as f64;
    alpha.ln() - k * (1.0 + m.ln() - k.ln())
}

/// Family-wise error control with the monotone testing layer.
///
/// The layer is the length of the longest accepted pattern so far and only
/// grows; candidates are always tested against the threshold of
/// `max(len, layer)`. Scoring workers read it concurrently, but it is
/// advanced only from the report step between scoring batches.
#[derive(Debug)]
pub struct FwerControl {
    alpha: f64,
    num_singletons: usize,
    layer: AtomicUsize,
}

impl FwerControl {
    pub fn new(alpha: f64, num_singletons: usize) -> Self {
        FwerControl {
            alpha,
            num_singletons,
            layer: AtomicUsize::new(1),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn layer(&self) -> usize {
        self.layer.load(Ordering::Acquire)
    }

    /// Raises the layer to an accepted pattern's length. Report-step only.
    pub fn observe_accepted(&self, len: usize) {
        self.layer.fetch_max(len, Ordering::AcqRel);
    }

    /// Threshold for a candidate of length `len`, `<= 0`.
    pub fn threshold(&self, len: usize) -> f64 {
        log_fwer_adjustment(self.alpha, len.max(self.layer()), self.num_singletons)
    }

    /// Whether surprise `pv = -log p` clears the adjusted threshold.
    pub fn admits(&self, pv: f64, len: usize) -> bool {
        pv >= -self.threshold(len)
    }
}

/// Sequential FDR control: LORD ("levels based on recent discovery").
///
/// Wealth starts at `alpha * factor` and is spent on every test; a
/// rejection resets the spend schedule to the wealth held at that rejection
/// and earns back `b0 = alpha - w0`. Wealth may go negative between
/// rejections; the acceptance rule is strictly `p < level`.
#[derive(Debug, Clone)]
pub struct LordControl {
    alpha: f64,
    b0: f64,
    wealth: f64,
    wealth_at_rejection: f64,
    step: usize,
    last_rejection: usize,
    level: f64,
}

impl LordControl {
    /// Default spend split: half the budget up front.
    pub fn new(alpha: f64) -> Self {
        LordControl::with_factor(alpha, 0.5)
    }

    pub fn with_factor(alpha: f64, factor: f64) -> Self {
        let w0 = alpha * factor;
        let b0 = alpha - w0;
        let mut control = LordControl {
            alpha,
            b0,
            wealth: w0,
            wealth_at_rejection: w0,
            step: 1,
            last_rejection: 0,
            level: 0.0,
        };
        control.level = control.spend(1);
        control
    }

    /// Per-test level `xi(i - tau) * w_tau` with
    /// `xi(k) = 6 / (pi^2 k^2) * (alpha / b0) / (1 + log k)`.
    fn spend(&self, gap: usize) -> f64 {
        let k = gap as f64;
        (6.0 / (PI * PI * k * k)) * (self.alpha / self.b0) / (1.0 + k.ln())
            * self.wealth_at_rejection
    }

    /// Current per-test significance level.
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn wealth(&self) -> f64 {
        self.wealth
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Tests one p-value, advancing the procedure's state.
    pub fn test(&mut self, p: f64) -> bool {
        let reject = p < self.level;
        if reject {
            self.last_rejection = self.step;
            self.wealth_at_rejection = self.wealth;
        }
        self.step += 1;
        self.level = self.spend(self.step - self.last_rejection);
        self.wealth -= self.level;
        if reject {
            self.wealth += self.b0;
        }
        reject
    }

    /// Surprise floor below which candidates are hopeless for this run:
    /// `-log alpha`. Anything with `pv <=` this can never be rejected.
    pub fn prune_level(&self) -> f64 {
        -self.alpha.ln()
    }
}
