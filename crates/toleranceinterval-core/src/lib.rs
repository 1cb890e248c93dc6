// =============================================================================
// Tolerance Interval Core Library
// =============================================================================
//
// Statistical tolerance bounds: values that, with confidence g, lie beyond
// (or bracket) a proportion p of the sampled population.
//
// STRUCTURE:
// ----------
// The library is organized into modules, each handling a specific concern:
//
//   - oneside:     distribution-free one-sided bounds (order statistic,
//                  Hanson-Koopmans, CMH-17 variant)
//   - twoside:     two-sided normal and lognormal intervals (exact, Howe,
//                  Guenther factors)
//   - solvers:     the iterative engines behind both (root finding, the
//                  Hanson-Koopmans coverage function, the exact factor)
//   - quadrature:  adaptive Gauss-Kronrod integration
//   - special:     normal, gamma, beta and chi-square functions (statrs)
//   - samples:     sorted sample-set container
//   - error:       error types used throughout the library
//
// FOR MAINTAINERS:
// ----------------
// When adding new functionality:
//   1. Add it to the appropriate module (or create a new one)
//   2. Write tests in that module (see existing tests for examples)
//   3. Re-export public items here so users can access them easily
//
// =============================================================================

pub mod constants;
pub mod error;
pub mod oneside;
pub mod quadrature;
pub mod samples;
pub mod solvers;
pub mod special;
pub mod twoside;

pub use error::{Result, ToleranceError};
pub use oneside::{hanson_koopmans, hanson_koopmans_cmh, non_parametric, HansonKoopmansOptions};
pub use quadrature::{integrate, QuadratureConfig, QuadratureResult};
pub use samples::SortedSamples;
pub use solvers::{
    exact_tolerance_factor, ExactFactorConfig, HKParameters, HansonKoopmans, HansonKoopmansSolution,
    RootFinderConfig, RootMethod, ToleranceFactorParameters,
};
pub use twoside::{lognormal, normal, normal_factor, FactorMethod};
