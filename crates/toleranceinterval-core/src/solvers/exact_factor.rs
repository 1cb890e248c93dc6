// =============================================================================
// Exact Two-Sided Normal Tolerance Factor
// =============================================================================
//
// Finds k such that the interval [x̄ - k·s, x̄ + k·s] contains at least a
// fraction `coverage` of a normal population with probability `confidence`.
//
// THE CONFIDENCE INTEGRAL
// -----------------------
// Krishnamoorthy & Mathew (2009), eqs. (1.2.4) and (2.5.8), with
// Witkovsky's (2014) erfc formulation:
//
//     G(k) = 2 ∫_0^10 P(ν/2, ν·r(√d2·z)² / (2k²)) · φ(z) · w(z) dz
//
// where
//   - r(x) solves 1 - (Φ(x + r) - Φ(x - r)) = tail coverage (content_root)
//   - P is the regularized lower incomplete gamma function
//   - w(z) = m·(1 - erfc(z/√2))^(m-1) for simultaneous intervals, else 1
//
// G decreases from 1 to 0 as k grows; we solve G(k) = tail confidence.
//
// THE STEPS
// ---------
//   1. Short-circuit the boundaries (confidence or coverage equal to 0 or 1)
//      and ν = ∞, where k is the two-sided normal quantile.
//   2. Convert to tail probabilities, rounded to 1e-16 so that inputs like
//      0.9999999 do not carry the representation error of 1 - x.
//   3. Starting value: Wald-Wolfowitz (m = 1) or Witkovsky's expectation
//      approximation (m > 1). Both scale a content radius r by
//      √(ν / χ²_{tail confidence, ν}).
//   4. Secant iteration on G(k) - tail confidence.
//
// Every G evaluation is an adaptive quadrature whose integrand runs an inner
// Halley solve, so the whole computation nests three iterations deep.
//
// =============================================================================

use tracing::debug;

use crate::constants::{
    FACTOR_MAX_ITERATIONS, FACTOR_STEP_SIZE, FACTOR_TOLERANCE, SQRT_2, TAIL_ROUNDING_SCALE,
    Z_INTEGRATION_LIMIT,
};
use crate::error::{invalid, Result, ToleranceError};
use crate::quadrature::{integrate, QuadratureConfig};
use crate::special::{chi_squared_quantile, erfc, erfc_inv, normal_pdf, regularized_lower_gamma};
use crate::solvers::content_root::ComplementaryContent;
use crate::solvers::root_finding::{FnResidual, RootFinder, RootFinderConfig, RootMethod};

// =============================================================================
// Parameters
// =============================================================================

/// Inputs of a two-sided tolerance factor computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceFactorParameters {
    /// Sample size
    pub n: usize,

    /// Coverage p (or 1 - p when `tailprob` is set)
    pub coverage: f64,

    /// Confidence g (or 1 - g when `tailprob` is set)
    pub confidence: f64,

    /// Number of pooled samples, at least 1
    pub m: usize,

    /// Degrees of freedom of the variance estimate; None means m·(n - 1)
    pub nu: Option<f64>,

    /// Normalizing constant; None means 1/n
    pub d2: Option<f64>,

    /// Factor for simultaneous intervals over the m samples
    pub simultaneous: bool,

    /// `coverage` and `confidence` are already tail probabilities
    pub tailprob: bool,
}

impl ToleranceFactorParameters {
    /// Single-sample, non-simultaneous parameters.
    pub fn new(n: usize, coverage: f64, confidence: f64) -> Self {
        Self {
            n,
            coverage,
            confidence,
            m: 1,
            nu: None,
            d2: None,
            simultaneous: false,
            tailprob: false,
        }
    }

    pub fn with_pooled_samples(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_degrees_of_freedom(mut self, nu: f64) -> Self {
        self.nu = Some(nu);
        self
    }

    pub fn with_normalizing_constant(mut self, d2: f64) -> Self {
        self.d2 = Some(d2);
        self
    }

    pub fn simultaneous(mut self, simultaneous: bool) -> Self {
        self.simultaneous = simultaneous;
        self
    }

    pub fn tail_probabilities(mut self, tailprob: bool) -> Self {
        self.tailprob = tailprob;
        self
    }

    /// ν, defaulting to m·(n - 1).
    pub fn degrees_of_freedom(&self) -> f64 {
        self.nu
            .unwrap_or_else(|| (self.m as f64) * (self.n as f64 - 1.0))
    }

    /// d2, defaulting to 1/n.
    pub fn normalizing_constant(&self) -> f64 {
        self.d2.unwrap_or_else(|| 1.0 / self.n as f64)
    }

    /// Check every input domain.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.coverage) {
            return Err(invalid("coverage", self.coverage, "must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(invalid("confidence", self.confidence, "must lie in [0, 1]"));
        }
        if self.n == 0 {
            return Err(invalid("n", 0.0, "must be at least 1"));
        }
        if self.m == 0 {
            return Err(invalid("m", 0.0, "must be at least 1"));
        }
        let nu = self.degrees_of_freedom();
        if nu.is_nan() || nu <= 0.0 {
            return Err(invalid("nu", nu, "degrees of freedom must be positive"));
        }
        let d2 = self.normalizing_constant();
        if !(d2.is_finite() && d2 >= 0.0) {
            return Err(invalid("d2", d2, "must be finite and non-negative"));
        }
        Ok(())
    }

    /// (tail coverage, tail confidence).
    pub fn tails(&self) -> (f64, f64) {
        if self.tailprob {
            (self.coverage, self.confidence)
        } else {
            (round_tail(1.0 - self.coverage), round_tail(1.0 - self.confidence))
        }
    }

    /// The factor when it follows from the inputs without any solve.
    ///
    /// Boundaries are tested on the tail probabilities, so with `tailprob` set
    /// a confidence of 0 means certainty and gives +∞, and a coverage of 0
    /// means full content and also gives +∞. Checking the raw inputs instead
    /// would swap these cases.
    pub fn closed_form(&self) -> Option<f64> {
        let (tail_coverage, tail_confidence) = self.tails();
        if tail_confidence == 1.0 {
            return Some(f64::NAN);
        }
        if tail_confidence == 0.0 || tail_coverage == 0.0 {
            return Some(f64::INFINITY);
        }
        if tail_coverage == 1.0 {
            return Some(0.0);
        }
        if self.degrees_of_freedom().is_infinite() {
            return Some(SQRT_2 * erfc_inv(tail_coverage));
        }
        None
    }
}

fn round_tail(tail: f64) -> f64 {
    (TAIL_ROUNDING_SCALE * tail).round_ties_even() / TAIL_ROUNDING_SCALE
}

// =============================================================================
// Configuration
// =============================================================================

/// Controls for the outer solve and its integrals.
#[derive(Debug, Clone, Copy)]
pub struct ExactFactorConfig {
    /// Maximum secant iterations.
    /// Default: 50
    pub max_iterations: usize,

    /// Convergence tolerance on successive k.
    /// Default: 1.48e-8
    pub tolerance: f64,

    /// Forward-difference step for the secant slope.
    /// Default: 1e-6
    pub step_size: f64,

    /// Quadrature settings for the z-integrals.
    pub quadrature: QuadratureConfig,
}

impl Default for ExactFactorConfig {
    fn default() -> Self {
        Self {
            max_iterations: FACTOR_MAX_ITERATIONS,
            tolerance: FACTOR_TOLERANCE,
            step_size: FACTOR_STEP_SIZE,
            quadrature: QuadratureConfig {
                abs_tolerance: 1e-13,
                rel_tolerance: 1e-11,
                ..QuadratureConfig::default()
            },
        }
    }
}

// =============================================================================
// Solver
// =============================================================================

/// Computes the exact factor for inputs that need a numerical solve.
#[derive(Debug, Clone)]
pub struct ExactFactorSolver {
    tail_coverage: f64,
    tail_confidence: f64,
    closed_form: Option<f64>,
    nu: f64,
    sqrt_d2: f64,
    m: usize,
    simultaneous: bool,
    content: ComplementaryContent,
    config: ExactFactorConfig,
}

impl ExactFactorSolver {
    /// Build a solver. Fails if the parameters are invalid. Inputs with a
    /// closed form (see `ToleranceFactorParameters::closed_form`) are
    /// accepted and `solve` returns that value directly.
    pub fn new(params: &ToleranceFactorParameters, config: ExactFactorConfig) -> Result<Self> {
        params.validate()?;
        let (tail_coverage, tail_confidence) = params.tails();
        Ok(Self {
            tail_coverage,
            tail_confidence,
            closed_form: params.closed_form(),
            nu: params.degrees_of_freedom(),
            sqrt_d2: params.normalizing_constant().sqrt(),
            m: params.m,
            simultaneous: params.simultaneous,
            content: ComplementaryContent::new(tail_coverage),
            config,
        })
    }

    /// √(ν / χ²_{tail confidence, ν}), the variance-estimate scaling shared
    /// by both approximations.
    fn chi_squared_scale(&self) -> f64 {
        (self.nu / chi_squared_quantile(self.tail_confidence, self.nu)).sqrt()
    }

    /// m·(1 - erfc(z/√2))^(m-1), the density weight of the largest of m
    /// standardized means.
    fn order_weight(&self, z: f64) -> f64 {
        let m = self.m as f64;
        m * (1.0 - erfc(z / SQRT_2)).powi(self.m as i32 - 1)
    }

    /// Wald-Wolfowitz: k ≈ r(√d2) · √(ν / χ²).
    pub fn wald_wolfowitz_approximation(&self) -> f64 {
        self.content.root(self.sqrt_d2) * self.chi_squared_scale()
    }

    /// Witkovsky: k ≈ √(2 E[r(√d2·Z)²]) · √(ν / χ²), the expectation taken
    /// over the largest of m standardized means.
    pub fn witkovsky_approximation(&self) -> f64 {
        let expectation = integrate(
            |z| {
                let r = self.content.root(self.sqrt_d2 * z);
                let mut f = r * r * normal_pdf(z);
                if self.m > 1 {
                    f *= self.order_weight(z);
                }
                f
            },
            0.0,
            Z_INTEGRATION_LIMIT,
            &self.config.quadrature,
        );
        (2.0 * expectation.value).sqrt() * self.chi_squared_scale()
    }

    /// Starting value of the outer solve.
    pub fn initial_guess(&self) -> f64 {
        if self.m > 1 {
            self.witkovsky_approximation()
        } else {
            self.wald_wolfowitz_approximation()
        }
    }

    /// G(k), the tail confidence achieved by factor k.
    pub fn confidence_integral(&self, k: f64) -> f64 {
        let half_nu = 0.5 * self.nu;
        let k2 = k * k;
        let integral = integrate(
            |z| {
                let r = self.content.root(self.sqrt_d2 * z);
                let mut factor = normal_pdf(z);
                if self.simultaneous {
                    factor *= self.order_weight(z);
                }
                regularized_lower_gamma(half_nu, half_nu * r * r / k2) * factor
            },
            0.0,
            Z_INTEGRATION_LIMIT,
            &self.config.quadrature,
        );
        2.0 * integral.value
    }

    /// Solve G(k) = tail confidence.
    pub fn solve(&self) -> Result<f64> {
        if let Some(k) = self.closed_form {
            debug!(k, "tolerance factor resolved without a solve");
            return Ok(k);
        }
        let k0 = self.initial_guess();
        debug!(
            k0,
            tail_coverage = self.tail_coverage,
            tail_confidence = self.tail_confidence,
            nu = self.nu,
            m = self.m,
            "exact tolerance factor starting value"
        );

        let finder = RootFinder::new(RootFinderConfig {
            method: RootMethod::Secant,
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
            step_size: self.config.step_size,
        })?;
        let residual = FnResidual(|k: f64| self.confidence_integral(k) - self.tail_confidence);
        let result = finder.solve(&residual, k0);

        if !result.converged {
            return Err(ToleranceError::NonConvergence {
                solver: "exact tolerance factor",
                iterations: result.iterations,
                last_estimate: result.root,
            });
        }
        Ok(result.root.abs())
    }
}

/// Exact two-sided tolerance factor, boundaries and closed forms included.
pub fn exact_tolerance_factor(
    params: &ToleranceFactorParameters,
    config: &ExactFactorConfig,
) -> Result<f64> {
    ExactFactorSolver::new(params, *config)?.solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn exact(params: ToleranceFactorParameters) -> f64 {
        exact_tolerance_factor(&params, &ExactFactorConfig::default()).unwrap()
    }

    #[test]
    fn test_boundaries() {
        assert!(exact(ToleranceFactorParameters::new(10, 0.9, 0.0)).is_nan());
        assert_eq!(exact(ToleranceFactorParameters::new(10, 0.9, 1.0)), f64::INFINITY);
        assert_eq!(exact(ToleranceFactorParameters::new(10, 1.0, 0.9)), f64::INFINITY);
        assert_eq!(exact(ToleranceFactorParameters::new(10, 0.0, 0.9)), 0.0);
    }

    #[test]
    fn test_tail_probability_boundaries() {
        let tails = |coverage, confidence| {
            exact(ToleranceFactorParameters::new(10, coverage, confidence).tail_probabilities(true))
        };
        assert_eq!(tails(0.1, 0.0), f64::INFINITY);
        assert!(tails(0.1, 1.0).is_nan());
        assert_eq!(tails(0.0, 0.1), f64::INFINITY);
        assert_eq!(tails(1.0, 0.1), 0.0);
    }

    #[test]
    fn test_infinite_degrees_of_freedom() {
        let params =
            ToleranceFactorParameters::new(10, 0.9, 0.95).with_degrees_of_freedom(f64::INFINITY);
        let expected = SQRT_2 * erfc_inv(0.1);
        assert_eq!(exact(params), expected);
        assert_abs_diff_eq!(expected, 1.6448536269514722, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        let config = ExactFactorConfig::default();
        let err = exact_tolerance_factor(&ToleranceFactorParameters::new(10, 1.2, 0.9), &config);
        assert!(matches!(err, Err(ToleranceError::InvalidParameter { name: "coverage", .. })));
        let err = exact_tolerance_factor(&ToleranceFactorParameters::new(1, 0.9, 0.9), &config);
        assert!(matches!(err, Err(ToleranceError::InvalidParameter { name: "nu", .. })));
    }

    #[test]
    fn test_tail_rounding() {
        let params = ToleranceFactorParameters::new(10, 0.9, 0.95);
        let (tail_coverage, tail_confidence) = params.tails();
        assert_eq!(tail_coverage, 0.1);
        assert_eq!(tail_confidence, 0.05);
    }

    #[test]
    fn test_tail_probability_inputs() {
        let direct = exact(ToleranceFactorParameters::new(8, 0.9, 0.9));
        let tails = exact(ToleranceFactorParameters::new(8, 0.1, 0.1).tail_probabilities(true));
        assert_abs_diff_eq!(direct, tails, epsilon = 1e-12);
    }

    #[test]
    fn test_wald_wolfowitz_starting_value() {
        let params = ToleranceFactorParameters::new(35, 0.9, 0.9);
        let solver = ExactFactorSolver::new(&params, ExactFactorConfig::default()).unwrap();
        assert_abs_diff_eq!(solver.initial_guess(), 1.98755, epsilon = 1e-4);
    }

    #[test]
    fn test_witkovsky_starting_value() {
        let params = ToleranceFactorParameters::new(8, 0.9, 0.9).with_pooled_samples(2);
        let solver = ExactFactorSolver::new(&params, ExactFactorConfig::default()).unwrap();
        assert_abs_diff_eq!(solver.initial_guess(), 2.41651, epsilon = 1e-4);
    }

    #[test]
    fn test_known_factors() {
        let cases = [
            (ToleranceFactorParameters::new(35, 0.9, 0.9), 1.990532),
            (ToleranceFactorParameters::new(8, 0.9, 0.9), 2.754144),
            (ToleranceFactorParameters::new(2, 0.9, 0.9), 15.512326),
            (ToleranceFactorParameters::new(5, 0.5, 0.5), 0.808262),
            (ToleranceFactorParameters::new(8, 0.9, 0.9).with_pooled_samples(2), 2.359981),
        ];
        for (params, expected) in cases {
            assert_abs_diff_eq!(exact(params), expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_simultaneous_factor() {
        let params = ToleranceFactorParameters::new(8, 0.9, 0.9)
            .with_pooled_samples(3)
            .simultaneous(true);
        assert_abs_diff_eq!(exact(params), 2.364918, epsilon = 1e-4);
    }

    #[test]
    fn test_solution_satisfies_confidence_integral() {
        let params = ToleranceFactorParameters::new(12, 0.95, 0.99);
        let solver = ExactFactorSolver::new(&params, ExactFactorConfig::default()).unwrap();
        let k = solver.solve().unwrap();
        assert_abs_diff_eq!(solver.confidence_integral(k), 0.01, epsilon = 1e-8);
    }

    #[test]
    fn test_solver_returns_closed_form() {
        let params = ToleranceFactorParameters::new(10, 0.0, 0.9);
        let solver = ExactFactorSolver::new(&params, ExactFactorConfig::default()).unwrap();
        assert_eq!(solver.solve().unwrap(), 0.0);
        let params = ToleranceFactorParameters::new(10, 1.2, 0.9);
        assert!(matches!(
            ExactFactorSolver::new(&params, ExactFactorConfig::default()),
            Err(ToleranceError::InvalidParameter { name: "coverage", .. })
        ));
    }

    #[test]
    fn test_repeat_is_bit_identical() {
        let params = ToleranceFactorParameters::new(6, 0.99, 0.9)
            .with_pooled_samples(3)
            .simultaneous(true);
        assert_eq!(exact(params).to_bits(), exact(params).to_bits());
    }
}
