// =============================================================================
// Closed-Form Two-Sided Factor Approximations
// =============================================================================
//
// Howe (1969):
//
//     k = z_{(1+p)/2} · √(1 + 1/n) · √(ν / χ²_{1-g, ν})
//
// Guenther (1977) corrects Howe's factor for small samples:
//
//     k = k_Howe · √(1 + (n - 3 - χ²_{1-g, ν}) / (2·(n + 1)²))
//
// Both are accurate to a few units in the third decimal for moderate n and
// are orders of magnitude cheaper than the exact integral.
//
// =============================================================================

use crate::special::{chi_squared_quantile, normal_quantile};

/// Howe's approximation.
pub fn howe_factor(n: f64, coverage: f64, confidence: f64, nu: f64) -> f64 {
    let z = normal_quantile(0.5 * (1.0 + coverage));
    let chi2 = chi_squared_quantile(1.0 - confidence, nu);
    z * (1.0 + 1.0 / n).sqrt() * (nu / chi2).sqrt()
}

/// Guenther's small-sample correction of Howe's approximation.
pub fn guenther_factor(n: f64, coverage: f64, confidence: f64, nu: f64) -> f64 {
    let chi2 = chi_squared_quantile(1.0 - confidence, nu);
    let w = (1.0 + (n - 3.0 - chi2) / (2.0 * (n + 1.0).powi(2))).sqrt();
    howe_factor(n, coverage, confidence, nu) * w
}
