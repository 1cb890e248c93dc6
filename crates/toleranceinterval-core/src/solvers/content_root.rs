// =============================================================================
// Complementary Content Root
// =============================================================================
//
// For an offset x and a target tail probability τ, find r > 0 with
//
//     1 - (Φ(x + r) - Φ(x - r)) = τ
//
// i.e. the half-width of an interval centred at x that leaves probability τ
// of a standard normal outside it. Written with erfc so that tiny τ stays
// accurate:
//
//     f(r)   = ½·[erfc((x + r)/√2) + erfc((r - x)/√2)] - τ
//     f'(r)  = -(φ(x + r) + φ(x - r))
//     f''(r) = (x + r)·φ(x + r) - (x - r)·φ(x - r)
//
// Halley's method from r₀ = x + Φ⁻¹(1 - τ) converges in a handful of steps.
//
// TOLERANCE
// ---------
// The stopping test is |f| < min(10·spacing(τ), ε): the residual must be
// within a few ulps of τ itself, never coarser than machine epsilon. This
// tracks the representable precision of τ, which matters when τ is tiny.
//
// The exact tolerance factor calls `root` at every quadrature node, so this
// function must stay allocation-free and stateless.
//
// =============================================================================

use crate::constants::{CONTENT_ROOT_MAX_ITERATIONS, SQRT_2, SQRT_2PI};
use crate::special::{erfc, erfc_inv, spacing};

/// Inner solver for r(x) at a fixed tail probability.
#[derive(Debug, Clone, Copy)]
pub struct ComplementaryContent {
    tail: f64,
    tolerance: f64,
}

impl ComplementaryContent {
    /// Solver for tail probability `tail` ∈ (0, 1).
    pub fn new(tail: f64) -> Self {
        Self {
            tail,
            tolerance: (10.0 * spacing(tail)).min(f64::EPSILON),
        }
    }

    pub fn tail(&self) -> f64 {
        self.tail
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// f(r), f'(r) and f''(r) at offset `x`.
    pub fn residual(&self, r: f64, x: f64) -> (f64, f64, f64) {
        let upper = x + r;
        let lower = x - r;
        let aux1 = (-0.5 * upper * upper).exp();
        let aux2 = (-0.5 * lower * lower).exp();

        let f = 0.5 * (erfc(upper / SQRT_2) + erfc(-lower / SQRT_2)) - self.tail;
        let d1 = -(aux1 + aux2) / SQRT_2PI;
        let d2 = (upper * aux1 - lower * aux2) / SQRT_2PI;
        (f, d1, d2)
    }

    /// r(x) by Halley iteration.
    pub fn root(&self, x: f64) -> f64 {
        let mut r = x + SQRT_2 * erfc_inv(2.0 * self.tail);

        for _ in 0..=CONTENT_ROOT_MAX_ITERATIONS {
            let (f, d1, d2) = self.residual(r, x);
            r -= 2.0 * f * d1 / (2.0 * d1 * d1 - f * d2);
            if f.abs() < self.tolerance {
                break;
            }
        }
        r
    }
}
