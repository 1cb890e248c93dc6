// =============================================================================
// Hanson-Koopmans Coverage Function
// =============================================================================
//
// For a sorted sample x[0] ≤ ... ≤ x[n-1] from any continuous distribution
// with a decreasing density in the left tail, Hanson & Koopmans (1964) show
// that the bound
//
//     L = x[j] - b·(x[j] - x[0])
//
// lies below the p-th population quantile with probability at least π(b).
// We want the b with π(b) = g.
//
// THE INTEGRAL
// ------------
// Working in the shifted variable B = b - 1 (so the root sits near zero),
//
//     π(B) = I_p(j+1, n-j)                                      (left term)
//          + A/j · ∫_p^1 (1-v)^(n-j-1) · [v^j - u(v)^j] dv       (right term)
//
// with
//
//     A    = n! / ((n-j-1)! · (j-1)!)
//     u(v) = v - p^(1/(B+1)) · v^(B/(B+1))
//
// The left term is (A/j)·∫_0^p v^j (1-v)^(n-j-1) dv. The factorials cancel
// against the beta function, leaving exactly the regularized incomplete beta
// I_p(j+1, n-j), so it is computed once in closed form.
//
// DERIVATIVES
// -----------
// Only u depends on B. With c = 1/(B+1), w = p^c · v^(1-c), L = ln(v/p):
//
//     u'  = -w · c² · L
//     u'' = -w · c³ · L · (c·L - 2)
//
//     dπ/dB   = -A ∫ (1-v)^(n-j-1) · u^(j-1) · u' dv
//     d²π/dB² = -A ∫ (1-v)^(n-j-1) · [(j-1)·u^(j-2)·u'² + u^(j-1)·u''] dv
//
// Every evaluation costs one adaptive quadrature over [p, 1].
//
// =============================================================================

use crate::error::{invalid, Result};
use crate::quadrature::{integrate, QuadratureConfig};
use crate::special::{ln_gamma, regularized_beta};
use crate::solvers::root_finding::Residual;

// =============================================================================
// Parameters
// =============================================================================

/// Validated inputs of a Hanson-Koopmans solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HKParameters {
    /// Percentile, in (0, 0.5)
    pub p: f64,
    /// Confidence, in (0, 1)
    pub g: f64,
    /// Sample size, at least 2
    pub n: usize,
    /// Secondary order-statistic index, 0 ≤ j < n
    pub j: usize,
}

impl HKParameters {
    /// Validate and build. Checks run in the order p, g, j, n.
    pub fn new(p: f64, g: f64, n: usize, j: usize) -> Result<Self> {
        if !(p > 0.0 && p < 0.5) {
            return Err(invalid("p", p, "must lie in (0, 0.5)"));
        }
        if !(g > 0.0 && g < 1.0) {
            return Err(invalid("g", g, "must lie in (0, 1)"));
        }
        if j >= n {
            return Err(invalid("j", j as f64, "must be smaller than the sample size"));
        }
        if n < 2 {
            return Err(invalid("n", n as f64, "must be at least 2"));
        }
        Ok(Self { p, g, n, j })
    }

    /// n - j - 1, the exponent of (1 - v).
    pub fn upper_count(&self) -> usize {
        self.n - self.j - 1
    }
}

// =============================================================================
// Cached state
// =============================================================================

/// Quantities of the coverage function that do not depend on B.
#[derive(Debug, Clone, Copy)]
pub struct CoverageState {
    /// A = n! / ((n-j-1)! (j-1)!), zero when j = 0
    pub a_coefficient: f64,
    /// A / j, the weight of the right-term integrand
    pub integrand_scale: f64,
    /// I_p(j+1, n-j)
    pub left_term: f64,
    /// ln p
    pub ln_p: f64,
}

impl CoverageState {
    fn new(params: &HKParameters) -> Self {
        let n = params.n as f64;
        let j = params.j as f64;
        let nj = params.upper_count() as f64;

        let a_coefficient = if params.j == 0 {
            0.0
        } else {
            (ln_gamma(n + 1.0) - ln_gamma(nj + 1.0) - ln_gamma(j)).exp()
        };

        // n! / ((n-j-1)! j!), equal to A/j for j ≥ 1
        let integrand_scale = (ln_gamma(n + 1.0) - ln_gamma(nj + 1.0) - ln_gamma(j + 1.0)).exp();

        Self {
            a_coefficient,
            integrand_scale,
            left_term: regularized_beta(j + 1.0, n - j, params.p),
            ln_p: params.p.ln(),
        }
    }
}

// =============================================================================
// Coverage function
// =============================================================================

/// π(B) and its first two derivatives for one `HKParameters`.
#[derive(Debug, Clone)]
pub struct CoverageFunction {
    params: HKParameters,
    state: CoverageState,
    quadrature: QuadratureConfig,
}

/// u, u' and u'' at one v.
struct Gap {
    u: f64,
    du: f64,
    d2u: f64,
}

impl CoverageFunction {
    pub fn new(params: HKParameters, quadrature: QuadratureConfig) -> Self {
        Self {
            state: CoverageState::new(&params),
            params,
            quadrature,
        }
    }

    pub fn params(&self) -> &HKParameters {
        &self.params
    }

    pub fn state(&self) -> &CoverageState {
        &self.state
    }

    /// π(B). NaN for B ≤ -1.
    pub fn pi_b(&self, b: f64) -> f64 {
        if !(b > -1.0) {
            return f64::NAN;
        }
        let j = self.params.j as i32;
        let nj = self.params.upper_count() as i32;
        let scale = self.state.integrand_scale;

        let right = integrate(
            |v| {
                let gap = self.gap(b, v);
                scale * (1.0 - v).powi(nj) * (v.powi(j) - gap.u.powi(j))
            },
            self.params.p,
            1.0,
            &self.quadrature,
        );
        self.state.left_term + right.value
    }

    /// dπ/dB. NaN for B ≤ -1.
    pub fn dpi_b(&self, b: f64) -> f64 {
        if !(b > -1.0) {
            return f64::NAN;
        }
        let j = self.params.j;
        if j == 0 {
            return 0.0;
        }
        let nj = self.params.upper_count() as i32;

        let integral = integrate(
            |v| {
                let gap = self.gap(b, v);
                (1.0 - v).powi(nj) * gap.u.powi(j as i32 - 1) * gap.du
            },
            self.params.p,
            1.0,
            &self.quadrature,
        );
        -self.state.a_coefficient * integral.value
    }

    /// d²π/dB². NaN for B ≤ -1.
    pub fn d2pi_b2(&self, b: f64) -> f64 {
        if !(b > -1.0) {
            return f64::NAN;
        }
        let j = self.params.j;
        if j == 0 {
            return 0.0;
        }
        let nj = self.params.upper_count() as i32;

        let integral = integrate(
            |v| {
                let gap = self.gap(b, v);
                let mut bracket = gap.u.powi(j as i32 - 1) * gap.d2u;
                if j > 1 {
                    bracket += (j - 1) as f64 * gap.u.powi(j as i32 - 2) * gap.du * gap.du;
                }
                (1.0 - v).powi(nj) * bracket
            },
            self.params.p,
            1.0,
            &self.quadrature,
        );
        -self.state.a_coefficient * integral.value
    }

    fn gap(&self, b: f64, v: f64) -> Gap {
        let c = 1.0 / (b + 1.0);
        let ln_v = v.ln();
        let w = (c * self.state.ln_p + (1.0 - c) * ln_v).exp();
        let l = ln_v - self.state.ln_p;
        Gap {
            u: v - w,
            du: -w * c * c * l,
            d2u: -w * c * c * c * l * (c * l - 2.0),
        }
    }
}

/// The root-finding residual π(B) - g.
impl Residual for CoverageFunction {
    fn value(&self, b: f64) -> f64 {
        self.pi_b(b) - self.params.g
    }

    fn derivative(&self, b: f64) -> f64 {
        self.dpi_b(b)
    }

    fn second_derivative(&self, b: f64) -> f64 {
        self.d2pi_b2(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn coverage(p: f64, g: f64, n: usize, j: usize) -> CoverageFunction {
        CoverageFunction::new(HKParameters::new(p, g, n, j).unwrap(), QuadratureConfig::default())
    }

    #[test]
    fn test_parameter_validation_order() {
        let err = HKParameters::new(0.7, 1.5, 5, 9).unwrap_err();
        assert!(err.to_string().contains("for p"));
        let err = HKParameters::new(0.1, 1.5, 5, 9).unwrap_err();
        assert!(err.to_string().contains("for g"));
        let err = HKParameters::new(0.1, 0.9, 5, 9).unwrap_err();
        assert!(err.to_string().contains("for j"));
        let err = HKParameters::new(0.1, 0.9, 1, 0).unwrap_err();
        assert!(err.to_string().contains("for n"));
    }

    #[test]
    fn test_left_term_matches_numerical_integral() {
        let f = coverage(0.1, 0.95, 12, 4);
        let (j, nj) = (4, 7);
        let scale = f.state().integrand_scale;
        let numerical = integrate(
            |v| scale * v.powi(j) * (1.0 - v).powi(nj),
            0.0,
            0.1,
            &QuadratureConfig::default(),
        );
        assert_relative_eq!(f.state().left_term, numerical.value, max_relative = 1e-9);
    }

    #[test]
    fn test_coefficient_a() {
        // n = 10, j = 9: A = 10! / (0! · 8!) = 90
        let f = coverage(0.1, 0.95, 10, 9);
        assert_relative_eq!(f.state().a_coefficient, 90.0, max_relative = 1e-12);
        assert_relative_eq!(f.state().integrand_scale, 10.0, max_relative = 1e-12);
    }

    #[test]
    fn test_pi_b_limits() {
        let f = coverage(0.1, 0.95, 10, 5);
        // B → -1 leaves only the left term, B → ∞ covers everything
        assert_abs_diff_eq!(f.pi_b(-1.0 + 1e-9), f.state().left_term, epsilon = 1e-6);
        assert_abs_diff_eq!(f.pi_b(1e7), 1.0, epsilon = 1e-4);
        assert!(f.pi_b(-1.0).is_nan());
    }

    #[test]
    fn test_pi_b_is_increasing() {
        let f = coverage(0.25, 0.9, 6, 3);
        let mut previous = f.pi_b(-0.5);
        for k in 0..20 {
            let current = f.pi_b(k as f64 * 0.5);
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn test_pi_b_at_known_root() {
        // Hanson-Koopmans (1964): n = 2, p = 0.25, g = 0.90 gives b = 8.61789
        let f = coverage(0.25, 0.9, 2, 1);
        assert_abs_diff_eq!(f.pi_b(8.61789 - 1.0), 0.9, epsilon = 1e-5);
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        for &(p, n, j) in &[(0.1, 10, 9), (0.25, 2, 1), (0.05, 20, 3)] {
            let f = coverage(p, 0.9, n, j);
            for &b in &[0.0, 0.7, 2.5] {
                let h = 1e-3;
                let fd1 = (f.pi_b(b + h) - f.pi_b(b - h)) / (2.0 * h);
                let fd2 = (f.dpi_b(b + h) - f.dpi_b(b - h)) / (2.0 * h);
                assert_relative_eq!(f.dpi_b(b), fd1, epsilon = 1e-6, max_relative = 1e-4);
                assert_relative_eq!(f.d2pi_b2(b), fd2, epsilon = 1e-6, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_j_zero_has_flat_coverage() {
        let f = coverage(0.1, 0.9, 5, 0);
        let expected = 1.0 - 0.9f64.powi(5);
        assert_abs_diff_eq!(f.pi_b(0.0), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(f.pi_b(3.0), expected, epsilon = 1e-12);
        assert_eq!(f.dpi_b(3.0), 0.0);
    }
}
