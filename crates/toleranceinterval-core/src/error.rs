// =============================================================================
// Error Types
// =============================================================================
//
// Every fallible operation in the library returns `Result<T>`, which is
// `std::result::Result<T, ToleranceError>`.
//
// WHAT IS (AND IS NOT) AN ERROR
// -----------------------------
// Bad inputs fail fast: a percentile outside (0, 1), an order-statistic index
// past the end of the sample, an unknown method name. Nothing numerical runs
// after one of these.
//
// A Hanson-Koopmans solve that runs out of iterations is NOT an error. The
// solver reports `converged = false` and the one-sided bound functions turn
// that row into NaN, so one bad row never aborts a batch.
//
// The exact two-sided factor is a single scalar with no row to blank out,
// so its outer solve reports non-convergence as `NonConvergence`.
//
// =============================================================================

use thiserror::Error;

/// Errors raised by the tolerance-bound routines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToleranceError {
    /// A scalar input is outside its documented domain.
    #[error("{value} was not a valid value for {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A method name did not match any known strategy.
    #[error("Unknown {kind} method '{name}'")]
    UnknownMethod { kind: &'static str, name: String },

    /// An iterative solve exhausted its iteration cap.
    #[error(
        "{solver} did not converge after {iterations} iterations (last estimate {last_estimate})"
    )]
    NonConvergence {
        solver: &'static str,
        iterations: usize,
        last_estimate: f64,
    },

    /// A closed-form starting guess evaluated to NaN.
    #[error("Degenerate approximation: {0}")]
    DegenerateApproximation(String),

    /// Input arrays have no rows or no columns.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Input arrays do not have the expected shape.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Result type for tolerance-bound operations.
pub type Result<T> = std::result::Result<T, ToleranceError>;

/// Build an `InvalidParameter` error.
pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> ToleranceError {
    ToleranceError::InvalidParameter { name, value, reason }
}
