// =============================================================================
// Scalar Root Finding
// =============================================================================
//
// Every solver in this crate ends with the same question: for which x is
// f(x) = 0? This module answers it with three classic one-point iterations.
//
// THE UPDATES
// -----------
//     Secant (forward difference):  f' ≈ (f(x + h) - f(x)) / h
//                                    x ← x - f / f'
//     Newton-Raphson:                x ← x - f / f'
//     Halley:                        x ← x - 2·f·f' / (2·f'² - f·f'')
//
// Halley converges cubically when f'' is accurate; Newton quadratically; the
// forward-difference secant roughly quadratically for small h, at the price
// of an extra function evaluation per step.
//
// CONVERGENCE
// -----------
// We stop when two successive iterates are within `tolerance` of each other,
// or when the iteration cap is reached. Running out of iterations is NOT an
// error: the result carries `converged = false` and the caller decides what
// to do. A vanishing derivative produces a non-finite iterate; that also ends
// the solve with `converged = false`.
//
// =============================================================================

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_STEP_SIZE, DEFAULT_TOLERANCE};
use crate::error::{invalid, Result, ToleranceError};

/// Relative step for the default central-difference derivatives.
const DERIVATIVE_STEP: f64 = 1e-6;
const SECOND_DERIVATIVE_STEP: f64 = 1e-4;

// =============================================================================
// Method selection
// =============================================================================

/// Iteration used by `RootFinder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootMethod {
    /// Forward-difference secant; needs only f.
    #[default]
    Secant,
    /// Newton-Raphson; needs f and f'.
    NewtonRaphson,
    /// Halley; needs f, f' and f''.
    Halley,
}

impl FromStr for RootMethod {
    type Err = ToleranceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "secant" => Ok(RootMethod::Secant),
            "newton-raphson" => Ok(RootMethod::NewtonRaphson),
            "halley" => Ok(RootMethod::Halley),
            _ => Err(ToleranceError::UnknownMethod {
                kind: "root-finding",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RootMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RootMethod::Secant => "secant",
            RootMethod::NewtonRaphson => "newton-raphson",
            RootMethod::Halley => "halley",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration options for `RootFinder`.
#[derive(Debug, Clone, Copy)]
pub struct RootFinderConfig {
    /// Which update rule to apply.
    /// Default: secant
    pub method: RootMethod,

    /// Maximum number of iterations after the first step.
    /// Default: 200
    pub max_iterations: usize,

    /// Convergence tolerance on |x_next - x|.
    /// Default: 1e-5
    pub tolerance: f64,

    /// Forward-difference step for the secant method.
    /// Default: 1e-4
    pub step_size: f64,
}

impl Default for RootFinderConfig {
    fn default() -> Self {
        Self {
            method: RootMethod::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            step_size: DEFAULT_STEP_SIZE,
        }
    }
}

impl RootFinderConfig {
    /// Same settings with a different update rule.
    pub fn with_method(mut self, method: RootMethod) -> Self {
        self.method = method;
        self
    }
}

// =============================================================================
// Residual
// =============================================================================

/// A scalar function whose root we want.
///
/// Implementors with closed-form derivatives should override `derivative`
/// and `second_derivative`; the defaults are central differences.
pub trait Residual {
    fn value(&self, x: f64) -> f64;

    fn derivative(&self, x: f64) -> f64 {
        let h = DERIVATIVE_STEP * x.abs().max(1.0);
        (self.value(x + h) - self.value(x - h)) / (2.0 * h)
    }

    fn second_derivative(&self, x: f64) -> f64 {
        let h = SECOND_DERIVATIVE_STEP * x.abs().max(1.0);
        (self.value(x + h) - 2.0 * self.value(x) + self.value(x - h)) / (h * h)
    }
}

/// Adapter turning a closure into a `Residual`.
pub struct FnResidual<F>(pub F);

impl<F> Residual for FnResidual<F>
where
    F: Fn(f64) -> f64,
{
    fn value(&self, x: f64) -> f64 {
        (self.0)(x)
    }
}

// =============================================================================
// Solver
// =============================================================================

/// Outcome of a root solve.
#[derive(Debug, Clone, Copy)]
pub struct RootResult {
    /// Last iterate
    pub root: f64,

    /// Did successive iterates agree within tolerance?
    pub converged: bool,

    /// Iterations taken after the first step
    pub iterations: usize,
}

/// Bounded-iteration scalar root finder.
#[derive(Debug, Clone, Copy)]
pub struct RootFinder {
    config: RootFinderConfig,
}

impl RootFinder {
    /// Validate `config` and build a solver.
    pub fn new(config: RootFinderConfig) -> Result<Self> {
        if !(config.tolerance.is_finite() && config.tolerance > 0.0) {
            return Err(invalid("tol", config.tolerance, "must be positive and finite"));
        }
        let step_ok = config.step_size.is_finite() && config.step_size > 0.0;
        if config.method == RootMethod::Secant && !step_ok {
            return Err(invalid("step_size", config.step_size, "must be positive and finite"));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &RootFinderConfig {
        &self.config
    }

    /// One update from `x`.
    pub fn step(&self, residual: &dyn Residual, x: f64) -> f64 {
        let f = residual.value(x);
        match self.config.method {
            RootMethod::Secant => {
                let h = self.config.step_size;
                let slope = (residual.value(x + h) - f) / h;
                x - f / slope
            }
            RootMethod::NewtonRaphson => x - f / residual.derivative(x),
            RootMethod::Halley => {
                let d1 = residual.derivative(x);
                let d2 = residual.second_derivative(x);
                x - 2.0 * f * d1 / (2.0 * d1 * d1 - f * d2)
            }
        }
    }

    /// Iterate from `initial` until successive iterates agree or the cap is hit.
    pub fn solve(&self, residual: &dyn Residual, initial: f64) -> RootResult {
        let tolerance = self.config.tolerance;

        let mut current = initial;
        let mut next = self.step(residual, current);
        let mut iterations = 0;

        while next.is_finite()
            && (next - current).abs() > tolerance
            && iterations < self.config.max_iterations
        {
            current = next;
            next = self.step(residual, current);
            iterations += 1;
            debug!(
                method = %self.config.method,
                iteration = iterations,
                estimate = next,
                "root finder step"
            );
        }

        RootResult {
            root: next,
            converged: next.is_finite() && (next - current).abs() <= tolerance,
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    /// f(x) = x² - 2 with exact derivatives.
    struct SquareMinusTwo;

    impl Residual for SquareMinusTwo {
        fn value(&self, x: f64) -> f64 {
            x * x - 2.0
        }
        fn derivative(&self, x: f64) -> f64 {
            2.0 * x
        }
        fn second_derivative(&self, _x: f64) -> f64 {
            2.0
        }
    }

    fn finder(method: RootMethod) -> RootFinder {
        let config = RootFinderConfig {
            tolerance: 1e-12,
            ..RootFinderConfig::default()
        }
        .with_method(method);
        RootFinder::new(config).unwrap()
    }

    #[test]
    fn test_all_methods_find_sqrt_two() {
        for method in [RootMethod::Secant, RootMethod::NewtonRaphson, RootMethod::Halley] {
            let result = finder(method).solve(&SquareMinusTwo, 1.0);
            assert!(result.converged, "{method} did not converge");
            assert_abs_diff_eq!(result.root, std::f64::consts::SQRT_2, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_halley_needs_fewer_iterations_than_newton() {
        let newton = finder(RootMethod::NewtonRaphson).solve(&SquareMinusTwo, 3.0);
        let halley = finder(RootMethod::Halley).solve(&SquareMinusTwo, 3.0);
        assert!(halley.iterations <= newton.iterations);
    }

    #[test]
    fn test_closure_residual_uses_numerical_derivatives() {
        let residual = FnResidual(|x: f64| x.exp() - 3.0);
        for method in [RootMethod::NewtonRaphson, RootMethod::Halley] {
            let result = finder(method).solve(&residual, 0.0);
            assert!(result.converged);
            assert_abs_diff_eq!(result.root, 3.0f64.ln(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let config = RootFinderConfig {
            method: RootMethod::NewtonRaphson,
            max_iterations: 2,
            tolerance: 1e-14,
            ..RootFinderConfig::default()
        };
        let result = RootFinder::new(config).unwrap().solve(&SquareMinusTwo, 100.0);
        assert!(!result.converged);
        assert_eq!(result.iterations, 2);
    }

    #[test]
    fn test_zero_derivative_is_non_convergence() {
        let residual = FnResidual(|x: f64| x * x + 1.0);
        let config = RootFinderConfig::default().with_method(RootMethod::NewtonRaphson);
        let result = RootFinder::new(config).unwrap().solve(&residual, 0.0);
        assert!(!result.converged);
        assert!(!result.root.is_finite());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("secant".parse::<RootMethod>().unwrap(), RootMethod::Secant);
        assert_eq!("Newton-Raphson".parse::<RootMethod>().unwrap(), RootMethod::NewtonRaphson);
        assert_eq!("halley".parse::<RootMethod>().unwrap(), RootMethod::Halley);
        assert!(matches!(
            "bisection".parse::<RootMethod>(),
            Err(ToleranceError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RootFinderConfig {
            tolerance: 0.0,
            ..RootFinderConfig::default()
        };
        assert!(RootFinder::new(config).is_err());

        let config = RootFinderConfig {
            step_size: -1.0,
            ..RootFinderConfig::default()
        };
        assert!(RootFinder::new(config).is_err());
    }

    proptest! {
        #[test]
        fn prop_newton_finds_cube_root(c in 0.5f64..50.0) {
            let residual = FnResidual(move |x: f64| x * x * x - c);
            let result = finder(RootMethod::NewtonRaphson).solve(&residual, c.max(1.0));
            prop_assert!(result.converged);
            prop_assert!((result.root - c.cbrt()).abs() < 1e-8);
        }
    }
}
