// =============================================================================
// Numerical Solvers
// =============================================================================
//
// The two hard problems of the crate, and the machinery they share.
//
// HANSON-KOOPMANS (distribution-free one-sided bounds)
// ----------------------------------------------------
//
//     coverage          π(B), dπ/dB, d²π/dB²: closed form plus one integral each
//     hanson_koopmans   fallback check, Vangel start, root solve for B
//
// EXACT TWO-SIDED NORMAL FACTOR
// -----------------------------
//
//     content_root      inner Halley solve for r(x), once per quadrature node
//     exact_factor      outer secant solve over k of a z-integral
//
// SHARED
// ------
//
//     root_finding      secant / Newton-Raphson / Halley with convergence flag
//
// All solver state is built fresh per call and owned by the call, so
// concurrent computations never interact.
//
// =============================================================================

pub mod content_root;
pub mod coverage;
pub mod exact_factor;
pub mod hanson_koopmans;
pub mod root_finding;

pub use content_root::ComplementaryContent;
pub use coverage::{CoverageFunction, CoverageState, HKParameters};
pub use exact_factor::{
    exact_tolerance_factor, ExactFactorConfig, ExactFactorSolver, ToleranceFactorParameters,
};
pub use hanson_koopmans::{vangel_approximation, HansonKoopmans, HansonKoopmansSolution};
pub use root_finding::{FnResidual, Residual, RootFinder, RootFinderConfig, RootMethod, RootResult};
