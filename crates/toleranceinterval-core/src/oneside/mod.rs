// =============================================================================
// One-Sided Distribution-Free Bounds
// =============================================================================
//
// Bounds that hold for any continuous population, computed from order
// statistics only.
//
// NON-PARAMETRIC
// --------------
// The r-th order statistic lies below the p-th quantile exactly when at least
// r + 1 observations do, which is a binomial event. So the lower bound is
// x[r] for the largest r with P(Binom(n, p) > r) ≥ g, and the upper bound
// is x[r] for the smallest r with P(Binom(n, p) ≤ r) ≥ g. Small samples may
// have no such r; the bound is then NaN.
//
// HANSON-KOOPMANS
// ---------------
// When the sample is too small for the order statistics alone, Hanson and
// Koopmans (1964) extrapolate below x[0] along the line through x[0] and
// x[j]. This needs the mild assumption of a log-concave-ish left tail and a
// root solve for the extrapolation factor b (see solvers::hanson_koopmans).
//
//     lower:  x[j] - b·(x[j] - x[0])
//     upper:  x[n-j-1] + b·(x[n-1] - x[n-j-1])      (solved with 1 - p)
//
// The CMH-17 variant extrapolates in log space instead:
//
//     lower:  x[j] · (x[0] / x[j])^b
//
// and is only defined for lower tails.
//
// FAILURE POLICY
// --------------
// Bad parameters are errors. A solve that does not converge is not: its
// rows are NaN and a warning is logged, so a batch of sample sets never
// aborts because one of them is awkward.
//
// =============================================================================

use ndarray::Array1;
use tracing::warn;

use crate::error::{invalid, Result};
use crate::quadrature::QuadratureConfig;
use crate::samples::SortedSamples;
use crate::solvers::coverage::HKParameters;
use crate::solvers::hanson_koopmans::{HansonKoopmans, HansonKoopmansSolution};
use crate::solvers::root_finding::RootFinderConfig;
use crate::special::{binomial_cdf, binomial_sf};

// =============================================================================
// Options
// =============================================================================

/// Options shared by `hanson_koopmans` and `hanson_koopmans_cmh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HansonKoopmansOptions {
    /// Secondary order-statistic index; None means n - 1.
    pub j: Option<usize>,

    /// Root-finding method and controls.
    pub root: RootFinderConfig,

    /// Quadrature settings for the coverage integrals.
    pub quadrature: QuadratureConfig,
}

impl HansonKoopmansOptions {
    pub fn with_j(mut self, j: usize) -> Self {
        self.j = Some(j);
        self
    }

    pub fn with_root(mut self, root: RootFinderConfig) -> Self {
        self.root = root;
        self
    }

    fn resolve_j(&self, n: usize) -> Result<usize> {
        let j = self.j.unwrap_or(n.saturating_sub(1));
        if j >= n {
            return Err(invalid("j", j as f64, "must be smaller than the sample size"));
        }
        Ok(j)
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(invalid(name, value, "must lie in (0, 1)"));
    }
    Ok(())
}

// =============================================================================
// Non-parametric
// =============================================================================

/// Order-statistic bound for the p-th percentile with confidence g.
///
/// Lower bound for p < 0.5, upper bound otherwise. One value per sample set.
pub fn non_parametric(samples: &SortedSamples, p: f64, g: f64) -> Result<Array1<f64>> {
    check_probability("p", p)?;
    check_probability("g", g)?;

    let n = samples.sample_size();
    let rank = if p < 0.5 {
        (0..n).rev().find(|&r| binomial_sf(r, n, p) >= g)
    } else {
        (0..n).find(|&r| binomial_cdf(r, n, p) >= g)
    };

    Ok(match rank {
        Some(r) => samples.column(r).to_owned(),
        None => Array1::from_elem(samples.n_sets(), f64::NAN),
    })
}

// =============================================================================
// Hanson-Koopmans
// =============================================================================

/// Run the solver for lower-tail percentile `p`.
fn solve_lower_tail(
    p: f64,
    g: f64,
    n: usize,
    j: usize,
    options: &HansonKoopmansOptions,
) -> Result<HansonKoopmansSolution> {
    let params = HKParameters::new(p, g, n, j)?;
    HansonKoopmans::new(params, options.root, options.quadrature)?.solve()
}

fn non_converged_rows(samples: &SortedSamples, solution: &HansonKoopmansSolution) -> Array1<f64> {
    warn!(
        diagnostic = solution.diagnostic.as_deref().unwrap_or(""),
        "returning NaN bounds"
    );
    Array1::from_elem(samples.n_sets(), f64::NAN)
}

/// Hanson-Koopmans bound for the p-th percentile with confidence g.
///
/// Lower bound for p < 0.5; for p ≥ 0.5 the solve runs with 1 - p and the
/// result is an upper bound. Falls back to `non_parametric` when the order
/// statistics already suffice.
pub fn hanson_koopmans(
    samples: &SortedSamples,
    p: f64,
    g: f64,
    options: &HansonKoopmansOptions,
) -> Result<Array1<f64>> {
    check_probability("p", p)?;
    let n = samples.sample_size();
    let j = options.resolve_j(n)?;

    let lower_tail = p < 0.5;
    let tail_p = if lower_tail { p } else { 1.0 - p };
    let solution = solve_lower_tail(tail_p, g, n, j, options)?;

    if solution.fall_back {
        return non_parametric(samples, p, g);
    }
    if !solution.converged {
        return Ok(non_converged_rows(samples, &solution));
    }

    let b = solution.b;
    let bounds = if lower_tail {
        let first = samples.column(0);
        let anchor = samples.column(j);
        &anchor - &((&anchor - &first) * b)
    } else {
        let last = samples.column(n - 1);
        let anchor = samples.column(n - j - 1);
        (&last - &anchor) * b + &anchor
    };
    Ok(bounds)
}

/// CMH-17 variant of the Hanson-Koopmans lower bound, extrapolating in log
/// space: x[j]·(x[0]/x[j])^b. Only lower tails (p < 0.5) are supported.
pub fn hanson_koopmans_cmh(
    samples: &SortedSamples,
    p: f64,
    g: f64,
    options: &HansonKoopmansOptions,
) -> Result<Array1<f64>> {
    if !(p > 0.0 && p < 0.5) {
        return Err(invalid("p", p, "the CMH variant only supports lower tails, p < 0.5"));
    }
    let n = samples.sample_size();
    let j = options.resolve_j(n)?;

    let solution = solve_lower_tail(p, g, n, j, options)?;
    if solution.fall_back {
        return non_parametric(samples, p, g);
    }
    if !solution.converged {
        return Ok(non_converged_rows(samples, &solution));
    }

    let b = solution.b;
    let first = samples.column(0);
    let anchor = samples.column(j);
    Ok(ndarray::Zip::from(&first)
        .and(&anchor)
        .map_collect(|&x0, &xj| xj * (x0 / xj).powf(b)))
}
