// =============================================================================
// Two-Sided Normal Tolerance Intervals
// =============================================================================
//
// An interval [x̄ - k·s, x̄ + k·s] that contains at least a fraction p of a
// normal population with confidence g. The work is all in the factor k:
//
//   - Exact:    solve the confidence integral (solvers::exact_factor)
//   - Howe:     closed-form approximation
//   - Guenther: Howe with a small-sample correction
//
// The method is picked once, as a `FactorMethod`, and dispatched here.
// Lognormal intervals are normal intervals on ln(x), mapped back with exp.
//
// =============================================================================

mod approximations;

pub use approximations::{guenther_factor, howe_factor};

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::error::{Result, ToleranceError};
use crate::samples::SortedSamples;
use crate::solvers::exact_factor::{
    exact_tolerance_factor, ExactFactorConfig, ToleranceFactorParameters,
};

/// How to compute the two-sided factor k.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactorMethod {
    #[default]
    Exact,
    Howe,
    Guenther,
}

impl FromStr for FactorMethod {
    type Err = ToleranceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(FactorMethod::Exact),
            "howe" => Ok(FactorMethod::Howe),
            "guenther" => Ok(FactorMethod::Guenther),
            _ => Err(ToleranceError::UnknownMethod {
                kind: "tolerance factor",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FactorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FactorMethod::Exact => "exact",
            FactorMethod::Howe => "howe",
            FactorMethod::Guenther => "guenther",
        };
        f.write_str(name)
    }
}

/// Two-sided tolerance factor k.
///
/// Validation, boundary values and the ν = ∞ limit are shared by all three
/// methods; only the general case differs.
pub fn normal_factor(
    params: &ToleranceFactorParameters,
    method: FactorMethod,
    config: &ExactFactorConfig,
) -> Result<f64> {
    params.validate()?;
    if let Some(k) = params.closed_form() {
        return Ok(k);
    }

    let (tail_coverage, tail_confidence) = params.tails();
    let (coverage, confidence) = (1.0 - tail_coverage, 1.0 - tail_confidence);
    let n = params.n as f64;
    let nu = params.degrees_of_freedom();
    match method {
        FactorMethod::Exact => exact_tolerance_factor(params, config),
        FactorMethod::Howe => Ok(howe_factor(n, coverage, confidence, nu)),
        FactorMethod::Guenther => Ok(guenther_factor(n, coverage, confidence, nu)),
    }
}

/// Two-sided normal tolerance intervals, one `[lower, upper]` row per
/// sample set.
///
/// With `pool_variance`, the factor accounts for all m sets sharing one
/// variance (ν = m·(n - 1)); each row still uses its own standard deviation.
pub fn normal(
    samples: &SortedSamples,
    p: f64,
    g: f64,
    method: FactorMethod,
    pool_variance: bool,
) -> Result<Array2<f64>> {
    let m = if pool_variance { samples.n_sets() } else { 1 };
    let params = ToleranceFactorParameters::new(samples.sample_size(), p, g).with_pooled_samples(m);
    let k = normal_factor(&params, method, &ExactFactorConfig::default())?;

    let (mean, std) = samples.mean_and_std();
    let half_width = std * k;
    let lower = &mean - &half_width;
    let upper = &mean + &half_width;

    let mut bounds = Array2::<f64>::zeros((samples.n_sets(), 2));
    bounds.column_mut(0).assign(&lower);
    bounds.column_mut(1).assign(&upper);
    Ok(bounds)
}

/// Two-sided lognormal tolerance intervals: `exp(normal(ln x))`.
pub fn lognormal(
    samples: &SortedSamples,
    p: f64,
    g: f64,
    method: FactorMethod,
    pool_variance: bool,
) -> Result<Array2<f64>> {
    Ok(normal(&samples.ln(), p, g, method, pool_variance)?.mapv(f64::exp))
}
