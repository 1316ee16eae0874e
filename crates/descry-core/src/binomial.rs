//! Upper tail of the binomial distribution in log space.
//!
//! Candidate surprise is `-log P(X >= s)` for `X ~ Binomial(n, p)` with `p`
//! the model's expected frequency. Small populations are summed exactly;
//! large ones use the Chernoff bound `-n * KL(s/n || p)`, which is an upper
//! bound on the log tail and therefore conservative for testing.

use smallvec::SmallVec;

/// Stand-in for `log 0`: finite, so downstream threshold comparisons stay
/// ordinary f64 comparisons.
pub const LOG_ZERO: f64 = -1.0e300;

/// Populations below this are summed exactly; at or above it the Chernoff
/// bound takes over.
const EXACT_LIMIT: u64 = 50;

/// `log P(X >= s)` for `X ~ Binomial(n, p)`. Always `<= 0`.
///
/// `p` is clamped into `[0, 1]`; `s > n` and the `p = 0` / `p = 1` corners
/// return the analytic limits ([LOG_ZERO] for impossible tails).
pub fn log_binomial_tail(s: u64, p: f64, n: u64) -> f64 {
    if s == 0 {
        return 0.0;
    }
    if s > n {
        return LOG_ZERO;
    }
    let p = p.clamp(0.0, 1.0);
    if p <= 0.0 {
        return LOG_ZERO;
    }
    if p >= 1.0 {
        return 0.0;
    }

    if n < EXACT_LIMIT {
        log_tail_exact(s, p, n)
    } else {
        log_tail_chernoff(s, p, n)
    }
}

/// Exact tail via log-space summation of PMF terms.
///
/// The sum always runs over the tail on the far side of the mean: above the
/// mean the upper tail is summed directly, below it the mirrored tail of
/// `n - X ~ Binomial(n, 1 - p)` is summed and complemented, which keeps the
/// summed terms small in both cases.
fn log_tail_exact(s: u64, p: f64, n: u64) -> f64 {
    if s as f64 > n as f64 * p {
        log_pmf_sum(s, p, n)
    } else {
        // P(X >= s) = 1 - P(n - X >= n - s + 1; 1 - p)
        let far = log_pmf_sum(n - s + 1, 1.0 - p, n).exp();
        if far >= 1.0 {
            LOG_ZERO
        } else {
            (-far).ln_1p()
        }
    }
}

/// `log sum_{k=from}^{n} C(n, k) p^k (1-p)^{n-k}`, `n < EXACT_LIMIT`.
fn log_pmf_sum(from: u64, p: f64, n: u64) -> f64 {
    let lp = p.ln();
    let lq = (1.0 - p).ln();

    // log C(n, from), accumulated term by term
    let mut log_coeff = 0.0;
    for i in 0..from {
        log_coeff += ((n - i) as f64).ln() - ((i + 1) as f64).ln();
    }

    let mut term = log_coeff + from as f64 * lp + (n - from) as f64 * lq;
    let mut terms: SmallVec<[f64; 64]> = SmallVec::new();
    let mut max = term;
    terms.push(term);
    for k in from..n {
        // C(n, k+1) = C(n, k) * (n - k) / (k + 1)
        term += ((n - k) as f64).ln() - ((k + 1) as f64).ln() + lp - lq;
        terms.push(term);
        if term > max {
            max = term;
        }
    }

    if max <= LOG_ZERO {
        return LOG_ZERO;
    }
    let sum: f64 = terms.iter().map(|t| (t - max).exp()).sum();
    (max + sum.ln()).min(0.0)
}

/// `-n * KL(s/n || p)` on the surprising side of the mean, `0` otherwise.
fn log_tail_chernoff(s: u64, p: f64, n: u64) -> f64 {
    let q = s as f64 / n as f64;
    if q <= p {
        return 0.0;
    }
    (-(n as f64) * kl_bernoulli(q, p)).max(LOG_ZERO)
}

/// `KL(q || p)` between Bernoulli distributions, with `0 log 0 = 0`.
fn kl_bernoulli(q: f64, p: f64) -> f64 {
    let mut kl = 0.0;
    if q > 0.0 {
        kl += q * (q / p).ln();
    }
    if q < 1.0 {
        kl += (1.0 - q) * ((1.0 - q) / (1.0 - p)).ln();
    }
    kl
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct reference: tail summed with f64 binomial coefficients.
    fn naive_tail(s: u64, p: f64, n: u64) -> f64 {
        let mut total = 0.0;
        for k in s..=n {
            let mut coeff = 1.0;
            for i in 0..k {
                coeff *= (n - i) as f64 / (i + 1) as f64;
            }
            total += coeff * p.powi(k as i32) * (1.0 - p).powi((n - k) as i32);
        }
        total
    }

    #[test]
    fn exact_matches_naive_summation() {
        for n in [1u64, 5, 10, 20, 30] {
            for &p in &[0.1, 0.3, 0.5, 0.7, 0.9] {
                for s in 0..=n {
                    let got = log_binomial_tail(s, p, n).exp();
                    let want = naive_tail(s, p, n).min(1.0);
                    assert!(
                        (got - want).abs() <= 1e-6,
                        "n={n} p={p} s={s}: got {got}, want {want}"
                    );
                }
            }
        }
    }

    #[test]
    fn tails_complement_across_the_mean() {
        for n in [10u64, 24, 40] {
            for &p in &[0.2, 0.5, 0.8] {
                let mean = (n as f64 * p).round() as u64;
                for s in [mean.saturating_sub(1), mean + 1] {
                    if s == 0 || s > n {
                        continue;
                    }
                    let upper = log_binomial_tail(s, p, n).exp();
                    let mirrored = log_binomial_tail(n - s + 1, 1.0 - p, n).exp();
                    assert!(
                        (upper + mirrored - 1.0).abs() <= 1e-9,
                        "n={n} p={p} s={s}"
                    );
                }
            }
        }
    }

    #[test]
    fn chernoff_upper_bounds_the_exact_tail() {
        let n = 200u64;
        for &p in &[0.1, 0.3, 0.5] {
            for s in ((n as f64 * p) as u64 + 1..=n).step_by(13) {
                let bound = log_binomial_tail(s, p, n);
                let exact = naive_tail(s, p, n);
                assert!(bound <= 0.0);
                if exact > 0.0 {
                    assert!(
                        bound >= exact.ln() - 1e-9,
                        "n={n} p={p} s={s}: bound {bound} below exact {}",
                        exact.ln()
                    );
                }
            }
        }
    }

    #[test]
    fn chernoff_is_flat_below_the_mean() {
        assert_eq!(log_binomial_tail(10, 0.5, 100), 0.0);
        assert!(log_binomial_tail(80, 0.5, 100) < -10.0);
    }

    #[test]
    fn corners() {
        assert_eq!(log_binomial_tail(0, 0.3, 10), 0.0);
        assert_eq!(log_binomial_tail(11, 0.3, 10), LOG_ZERO);
        assert_eq!(log_binomial_tail(3, 0.0, 10), LOG_ZERO);
        assert_eq!(log_binomial_tail(3, 1.0, 10), 0.0);
        assert_eq!(log_binomial_tail(3, -0.5, 10), LOG_ZERO);
        assert_eq!(log_binomial_tail(3, 1.5, 10), 0.0);
    }

    #[test]
    fn monotone_decreasing_in_s() {
        for n in [20u64, 100] {
            let mut prev = 0.0;
            for s in 1..=n {
                let tail = log_binomial_tail(s, 0.4, n);
                assert!(tail <= prev + 1e-12, "n={n} s={s}");
                prev = tail;
            }
        }
    }
}
