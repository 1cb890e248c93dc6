// =============================================================================
// Numerical Constants
// =============================================================================
//
// Shared constants and solver defaults. Everything tunable at runtime lives in
// a config struct instead; these are the values those structs default to.
//
// =============================================================================

/// √2
pub const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// √(2π), the standard normal density normaliser.
pub const SQRT_2PI: f64 = 2.506_628_274_631_000_7;

// -----------------------------------------------------------------------------
// Root finding (Hanson-Koopmans)
// -----------------------------------------------------------------------------

/// Default iteration cap for the Hanson-Koopmans root solve.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Default convergence tolerance on successive iterates.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Default forward-difference step for the secant method.
pub const DEFAULT_STEP_SIZE: f64 = 1e-4;

/// Replacement for a non-positive Vangel starting guess.
pub const MIN_INITIAL_GUESS: f64 = 0.01;

// -----------------------------------------------------------------------------
// Exact two-sided factor
// -----------------------------------------------------------------------------

/// Iteration cap of the inner Halley solve for the complementary content root.
pub const CONTENT_ROOT_MAX_ITERATIONS: usize = 100;

/// Upper limit of the z-integrals. The integrands carry a φ(z) factor, so
/// nothing beyond 10 contributes at double precision.
pub const Z_INTEGRATION_LIMIT: f64 = 10.0;

/// Tail probabilities are rounded to this many parts to absorb the
/// representation error of `1 - x` when `x` is close to one.
pub const TAIL_ROUNDING_SCALE: f64 = 1e16;

/// Outer secant solve defaults for the exact factor.
pub const FACTOR_MAX_ITERATIONS: usize = 50;
pub const FACTOR_TOLERANCE: f64 = 1.48e-8;
pub const FACTOR_STEP_SIZE: f64 = 1e-6;

// -----------------------------------------------------------------------------
// Quadrature
// -----------------------------------------------------------------------------

pub const QUAD_ABS_TOLERANCE: f64 = 1e-12;
pub const QUAD_REL_TOLERANCE: f64 = 1e-10;
pub const QUAD_MAX_SUBDIVISIONS: usize = 100;
