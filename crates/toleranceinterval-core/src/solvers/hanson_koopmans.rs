// =============================================================================
// Hanson-Koopmans Solver
// =============================================================================
//
// Finds the factor b of the distribution-free lower bound
//
//     L = x[j] - b·(x[j] - x[0])
//
// such that the coverage function π reaches the requested confidence g.
//
// THE STEPS
// ---------
//   1. Build the coverage function (caches A and the closed-form left term).
//   2. Fall back if π(B = 0), i.e. b = 1, already reaches g. Then L = x[0]
//      is conservative and the plain order-statistic bound should be used.
//   3. Start from Vangel's (1994) closed-form approximation of b.
//   4. Solve π(B) = g for B = b - 1 with the configured root finder.
//   5. Report b = B + 1 together with the convergence flag.
//
// A solve that runs out of iterations is not an error. It produces a
// solution with `converged = false` and a diagnostic message, and the
// one-sided bound functions turn that row into NaN.
//
// =============================================================================

use tracing::{debug, warn};

use crate::constants::MIN_INITIAL_GUESS;
use crate::error::{Result, ToleranceError};
use crate::quadrature::QuadratureConfig;
use crate::special::{inverse_regularized_beta, regularized_beta};
use crate::solvers::coverage::{CoverageFunction, HKParameters};
use crate::solvers::root_finding::{RootFinder, RootFinderConfig};

// =============================================================================
// Result Structure
// =============================================================================

/// Outcome of a Hanson-Koopmans solve.
#[derive(Debug, Clone, PartialEq)]
pub struct HansonKoopmansSolution {
    /// The factor b; NaN when falling back
    pub b: f64,

    /// Vangel's starting value for b; NaN when falling back
    pub initial_guess: f64,

    /// Did the root finder converge? True when falling back.
    pub converged: bool,

    /// Root-finder iterations
    pub iterations: usize,

    /// π(b = 1) already reaches g; use the order-statistic bound instead
    pub fall_back: bool,

    /// Human-readable reason when `converged` is false
    pub diagnostic: Option<String>,
}

// =============================================================================
// Solver
// =============================================================================

/// Drives the root finder over the coverage function.
#[derive(Debug, Clone)]
pub struct HansonKoopmans {
    coverage: CoverageFunction,
    finder: RootFinder,
}

impl HansonKoopmans {
    pub fn new(
        params: HKParameters,
        root: RootFinderConfig,
        quadrature: QuadratureConfig,
    ) -> Result<Self> {
        Ok(Self {
            coverage: CoverageFunction::new(params, quadrature),
            finder: RootFinder::new(root)?,
        })
    }

    pub fn coverage(&self) -> &CoverageFunction {
        &self.coverage
    }

    /// Run the full solve.
    pub fn solve(&self) -> Result<HansonKoopmansSolution> {
        let params = *self.coverage.params();

        // Step 1: fall back when b = 1 is already enough
        let pi_at_one = self.coverage.pi_b(0.0);
        if pi_at_one >= params.g {
            debug!(
                p = params.p,
                g = params.g,
                n = params.n,
                j = params.j,
                coverage = pi_at_one,
                "coverage at b = 1 meets the confidence, falling back to order statistic"
            );
            return Ok(HansonKoopmansSolution {
                b: f64::NAN,
                initial_guess: f64::NAN,
                converged: true,
                iterations: 0,
                fall_back: true,
                diagnostic: None,
            });
        }

        // Step 2: starting value
        let mut guess = vangel_approximation(&params);
        if guess.is_nan() {
            return Err(ToleranceError::DegenerateApproximation(format!(
                "Vangel approximation is NaN for p={}, g={}, n={}, j={}",
                params.p, params.g, params.n, params.j
            )));
        }
        if guess <= 0.0 {
            guess = MIN_INITIAL_GUESS;
        }
        debug!(guess, method = %self.finder.config().method, "Hanson-Koopmans starting value");

        // Step 3: solve in the shifted variable B = b - 1
        let result = self.finder.solve(&self.coverage, guess - 1.0);
        let b = result.root + 1.0;

        let diagnostic = if result.converged {
            None
        } else {
            let message = format!(
                "{} did not converge after {} iterations (last b = {})",
                self.finder.config().method,
                result.iterations,
                b
            );
            warn!(
                p = params.p,
                g = params.g,
                n = params.n,
                j = params.j,
                iterations = result.iterations,
                last_estimate = b,
                "Hanson-Koopmans solve did not converge"
            );
            Some(message)
        };

        Ok(HansonKoopmansSolution {
            b,
            initial_guess: guess,
            converged: result.converged,
            iterations: result.iterations,
            fall_back: false,
            diagnostic,
        })
    }
}

/// Vangel's (1994) closed-form approximation of b.
///
/// Uses the order statistics i = 1 and j + 1 (one-based). With
/// β = I_p(j+1, n-j), y = (g - β)/(1 - β) and q the y-quantile of
/// Beta(1, j), the approximation is
///
/// ```text
/// b ≈ ln(p·(n+1)/(j+1)) / ln(q)
/// ```
///
/// NaN when j = 0 (the Beta(1, j) shape vanishes) or when g ≤ β.
pub fn vangel_approximation(params: &HKParameters) -> f64 {
    let n = params.n as f64;
    let jv = params.j as f64 + 1.0;

    let beta = regularized_beta(jv, n - jv + 1.0, params.p);
    let y = (params.g - beta) / (1.0 - beta);
    if !(y > 0.0 && y < 1.0) || params.j == 0 {
        return f64::NAN;
    }

    let q = inverse_regularized_beta(y, 1.0, jv - 1.0);
    (params.p * (n + 1.0) / jv).ln() / q.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::root_finding::RootMethod;
    use approx::assert_abs_diff_eq;

    fn solve(p: f64, g: f64, n: usize, j: usize, method: RootMethod) -> HansonKoopmansSolution {
        let params = HKParameters::new(p, g, n, j).unwrap();
        let root = RootFinderConfig::default().with_method(method);
        HansonKoopmans::new(params, root, QuadratureConfig::default())
            .unwrap()
            .solve()
            .unwrap()
    }

    #[test]
    fn test_vangel_guess_values() {
        let cases = [
            (0.1, 0.95, 10, 9, 1.74923),
            (0.25, 0.9, 2, 1, 8.69564),
            (0.1, 0.95, 10, 5, 2.12869),
        ];
        for (p, g, n, j, expected) in cases {
            let params = HKParameters::new(p, g, n, j).unwrap();
            assert_abs_diff_eq!(vangel_approximation(&params), expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_vangel_nan_for_j_zero() {
        let params = HKParameters::new(0.1, 0.9, 5, 0).unwrap();
        assert!(vangel_approximation(&params).is_nan());
    }

    #[test]
    fn test_ten_samples_last_order_statistic() {
        let solution = solve(0.1, 0.95, 10, 9, RootMethod::Secant);
        assert!(solution.converged);
        assert!(!solution.fall_back);
        assert!(solution.diagnostic.is_none());
        assert_abs_diff_eq!(solution.b, 1.7503373, epsilon = 1e-4);
    }

    #[test]
    fn test_methods_agree() {
        for &(p, g, n, j) in &[(0.25, 0.9, 2, 1), (0.1, 0.95, 10, 9), (0.05, 0.99, 20, 1)] {
            let secant = solve(p, g, n, j, RootMethod::Secant);
            let newton = solve(p, g, n, j, RootMethod::NewtonRaphson);
            let halley = solve(p, g, n, j, RootMethod::Halley);
            assert!(secant.converged && newton.converged && halley.converged);
            assert_abs_diff_eq!(secant.b, newton.b, epsilon = 1e-4);
            assert_abs_diff_eq!(secant.b, halley.b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_fall_back_large_sample() {
        // 1 - 0.99^300 ≈ 0.951 ≥ 0.95, so x[0] alone is enough
        let solution = solve(0.01, 0.95, 300, 299, RootMethod::Secant);
        assert!(solution.fall_back);
        assert!(solution.b.is_nan());
    }

    #[test]
    fn test_j_zero_is_degenerate() {
        let params = HKParameters::new(0.1, 0.9, 5, 0).unwrap();
        let solver =
            HansonKoopmans::new(params, RootFinderConfig::default(), QuadratureConfig::default())
                .unwrap();
        assert!(matches!(solver.solve(), Err(ToleranceError::DegenerateApproximation(_))));
    }

    #[test]
    fn test_iteration_cap_gives_diagnostic() {
        let params = HKParameters::new(0.05, 0.99, 20, 1).unwrap();
        let root = RootFinderConfig {
            max_iterations: 0,
            tolerance: 1e-14,
            ..RootFinderConfig::default()
        };
        let solution = HansonKoopmans::new(params, root, QuadratureConfig::default())
            .unwrap()
            .solve()
            .unwrap();
        assert!(!solution.converged);
        assert!(solution.diagnostic.is_some());
    }

    #[test]
    fn test_repeat_solve_is_bit_identical() {
        let first = solve(0.1, 0.95, 9, 1, RootMethod::Halley);
        let second = solve(0.1, 0.95, 9, 1, RootMethod::Halley);
        assert_eq!(first.b.to_bits(), second.b.to_bits());
        assert_eq!(first.iterations, second.iterations);
    }
}
