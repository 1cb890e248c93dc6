// =============================================================================
// Special Functions
// =============================================================================
//
// The solvers need a handful of classical functions:
//
//   - the standard normal CDF, density and quantile
//   - erfc and its inverse (tail-accurate normal probabilities)
//   - the regularized lower incomplete gamma function P(a, x)
//   - the regularized incomplete beta function I_x(a, b) and its inverse
//   - chi-square quantiles
//   - binomial tail probabilities
//
// statrs supplies the kernels. This module wraps them so that:
//
//   1. Out-of-domain arguments give NaN (or the obvious limit) instead of a
//      panic deep inside an integrand.
//   2. Quantiles are accurate to the last few bits. statrs' generic
//      `inverse_cdf` is a short bisection, which is fine as a bracket but not
//      as a final answer, so every quantile here is polished with a
//      safeguarded Newton iteration on the CDF.
//
// =============================================================================

use statrs::distribution::{Beta, ChiSquared, Continuous, ContinuousCDF};
use statrs::function::beta::beta_reg;
use statrs::function::gamma::gamma_lr;

pub use statrs::function::erf::{erfc, erfc_inv};
pub use statrs::function::gamma::ln_gamma;

use crate::constants::{SQRT_2, SQRT_2PI};

/// Newton polishing steps allowed per quantile.
const QUANTILE_POLISH_ITERATIONS: usize = 100;

// =============================================================================
// Normal distribution
// =============================================================================

/// Standard normal CDF, Φ(x) = erfc(-x/√2) / 2.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal density φ(x).
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

/// Standard normal quantile Φ⁻¹(p).
pub fn normal_quantile(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

// =============================================================================
// Gamma / Beta
// =============================================================================

/// Regularized lower incomplete gamma function P(a, x).
pub fn regularized_lower_gamma(a: f64, x: f64) -> f64 {
    if a.is_nan() || x.is_nan() || a <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x.is_infinite() {
        return 1.0;
    }
    gamma_lr(a, x)
}

/// Regularized incomplete beta function I_x(a, b).
pub fn regularized_beta(a: f64, b: f64, x: f64) -> f64 {
    if a.is_nan() || b.is_nan() || x.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    beta_reg(a, b, x)
}

/// Inverse of the regularized incomplete beta function: the `x` with
/// I_x(a, b) = y.
pub fn inverse_regularized_beta(y: f64, a: f64, b: f64) -> f64 {
    if y.is_nan() || !(0.0..=1.0).contains(&y) {
        return f64::NAN;
    }
    if y == 0.0 {
        return 0.0;
    }
    if y == 1.0 {
        return 1.0;
    }
    match Beta::new(a, b) {
        Ok(dist) => polish_quantile(&dist, y, 0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

// =============================================================================
// Chi-square
// =============================================================================

/// Chi-square quantile with `nu` degrees of freedom.
pub fn chi_squared_quantile(p: f64, nu: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return 0.0;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    match ChiSquared::new(nu) {
        Ok(dist) => polish_quantile(&dist, p, 0.0, f64::INFINITY),
        Err(_) => f64::NAN,
    }
}

/// Refine statrs' bisection quantile with Newton steps on `cdf(x) - p`.
///
/// The iteration keeps a bracket `[lower, upper]` that is tightened on every
/// evaluation; a Newton step leaving the bracket is replaced by bisection
/// (or by doubling while the upper end is still unbounded).
fn polish_quantile<D>(dist: &D, p: f64, lower: f64, upper: f64) -> f64
where
    D: ContinuousCDF<f64, f64> + Continuous<f64, f64>,
{
    let mut lo = lower;
    let mut hi = upper;

    let mut x = dist.inverse_cdf(p);
    if !(x > lo && x < hi) {
        x = if hi.is_finite() { 0.5 * (lo + hi) } else { lo + 1.0 };
    }

    for _ in 0..QUANTILE_POLISH_ITERATIONS {
        let err = dist.cdf(x) - p;
        if err == 0.0 {
            return x;
        }
        if err > 0.0 {
            hi = x;
        } else {
            lo = x;
        }

        let mut next = x - err / dist.pdf(x);
        if !(next.is_finite() && next > lo && next < hi) {
            next = if hi.is_finite() { 0.5 * (lo + hi) } else { 2.0 * x };
        }

        if (next - x).abs() <= 4.0 * f64::EPSILON * x.abs() {
            return next;
        }
        x = next;
    }
    x
}

// =============================================================================
// Binomial tails
// =============================================================================

/// P(X > r) for X ~ Binomial(n, p).
pub fn binomial_sf(r: usize, n: usize, p: f64) -> f64 {
    if r >= n {
        return 0.0;
    }
    regularized_beta((r + 1) as f64, (n - r) as f64, p)
}

/// P(X ≤ r) for X ~ Binomial(n, p).
pub fn binomial_cdf(r: usize, n: usize, p: f64) -> f64 {
    if r >= n {
        return 1.0;
    }
    regularized_beta((n - r) as f64, (r + 1) as f64, 1.0 - p)
}

// =============================================================================
// Floating point
// =============================================================================

/// Distance from `x` to the next representable double above it.
pub fn spacing(x: f64) -> f64 {
    if !x.is_finite() {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    let next = if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    };
    next - x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_normal_quantile_known_values() {
        assert_abs_diff_eq!(normal_quantile(0.975), 1.959963984540054, epsilon = 1e-12);
        assert_abs_diff_eq!(normal_quantile(0.5), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(normal_quantile(0.05), -1.6448536269514722, epsilon = 1e-12);
    }

    #[test]
    fn test_normal_quantile_inverts_cdf() {
        for &x in &[-3.0, -1.2, 0.3, 2.5] {
            assert_abs_diff_eq!(normal_quantile(normal_cdf(x)), x, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_normal_quantile_edges() {
        assert_eq!(normal_quantile(0.0), f64::NEG_INFINITY);
        assert_eq!(normal_quantile(1.0), f64::INFINITY);
        assert!(normal_quantile(1.5).is_nan());
    }

    #[test]
    fn test_lower_gamma_limits() {
        assert_eq!(regularized_lower_gamma(2.0, 0.0), 0.0);
        assert_eq!(regularized_lower_gamma(2.0, f64::INFINITY), 1.0);
        // P(1, x) = 1 - exp(-x)
        assert_abs_diff_eq!(
            regularized_lower_gamma(1.0, 0.7),
            1.0 - (-0.7f64).exp(),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_regularized_beta_power_case() {
        // I_x(a, 1) = x^a
        assert_abs_diff_eq!(regularized_beta(3.0, 1.0, 0.4), 0.064, epsilon = 1e-14);
        assert!(regularized_beta(0.0, 1.0, 0.4).is_nan());
    }

    #[test]
    fn test_inverse_beta_closed_form() {
        // I_x(1, b) = 1 - (1 - x)^b
        let (y, b) = (0.37, 4.0);
        let expected = 1.0 - (1.0f64 - y).powf(1.0 / b);
        assert_relative_eq!(inverse_regularized_beta(y, 1.0, b), expected, max_relative = 1e-10);
    }

    #[test]
    fn test_chi_squared_quantile_known_values() {
        let cases = [
            (0.95, 1.0, 3.841458820694124),
            (0.1, 34.0, 23.95225327089932),
            (0.05, 2.0, -2.0 * (0.95f64).ln()),
        ];
        for (tail, nu, expected) in cases {
            assert_relative_eq!(chi_squared_quantile(tail, nu), expected, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_chi_squared_quantile_edges() {
        assert_eq!(chi_squared_quantile(0.0, 3.0), 0.0);
        assert_eq!(chi_squared_quantile(1.0, 3.0), f64::INFINITY);
        assert!(chi_squared_quantile(0.5, -1.0).is_nan());
    }

    #[test]
    fn test_binomial_tails_complement() {
        for r in 0..10 {
            let total = binomial_sf(r, 10, 0.3) + binomial_cdf(r, 10, 0.3);
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-13);
        }
        // P(X > 0) = 1 - (1 - p)^n
        assert_abs_diff_eq!(binomial_sf(0, 300, 0.01), 1.0 - 0.99f64.powi(300), epsilon = 1e-12);
    }

    #[test]
    fn test_spacing_matches_epsilon() {
        assert_eq!(spacing(1.0), f64::EPSILON);
        assert_eq!(spacing(0.5), f64::EPSILON / 2.0);
        assert!(spacing(0.05) < f64::EPSILON);
    }
}
