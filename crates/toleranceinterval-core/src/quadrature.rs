// =============================================================================
// Adaptive Gauss-Kronrod Quadrature
// =============================================================================
//
// Both solvers spend nearly all their time inside definite integrals:
//
//   - the Hanson-Koopmans coverage integral over v ∈ [p, 1]
//   - the exact-factor confidence integral over z ∈ [0, 10]
//
// THE RULE
// --------
// On each segment we evaluate the 15-point Kronrod rule and the 7-point Gauss
// rule embedded in it (the Gauss nodes are every other Kronrod node, so the
// pair costs 15 evaluations). Their difference estimates the error. The raw
// difference is pessimistic for smooth integrands, so it is rescaled the way
// QUADPACK's QK15 does:
//
//     err = resasc · min(1, (200·|K - G| / resasc)^1.5)
//
// where resasc is the integral of |f - mean(f)| over the segment.
//
// ADAPTIVITY
// ----------
// Global bisection: keep a list of segments, repeatedly split the one with the
// largest error estimate, and stop when
//
//     Σ err ≤ max(abs_tolerance, rel_tolerance · |Σ value|)
//
// or when the subdivision budget runs out (reported through `converged`).
//
// REENTRANCY
// ----------
// `integrate` owns all of its state, so the integrand is free to call
// `integrate` again.
//
// =============================================================================

use tracing::warn;

use crate::constants::{QUAD_ABS_TOLERANCE, QUAD_MAX_SUBDIVISIONS, QUAD_REL_TOLERANCE};

/// Kronrod abscissae on [-1, 1], positive half, outermost first.
/// XGK[1], XGK[3], XGK[5] and XGK[7] are the Gauss points.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.0,
];

/// Kronrod weights matching `XGK`.
const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

/// Gauss weights for XGK[1], XGK[3], XGK[5], XGK[7].
const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

// =============================================================================
// Configuration and Result
// =============================================================================

/// Tolerances and budget for `integrate`.
#[derive(Debug, Clone, Copy)]
pub struct QuadratureConfig {
    /// Absolute error target.
    /// Default: 1e-12
    pub abs_tolerance: f64,

    /// Relative error target.
    /// Default: 1e-10
    pub rel_tolerance: f64,

    /// Maximum number of bisections.
    /// Default: 100
    pub max_subdivisions: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            abs_tolerance: QUAD_ABS_TOLERANCE,
            rel_tolerance: QUAD_REL_TOLERANCE,
            max_subdivisions: QUAD_MAX_SUBDIVISIONS,
        }
    }
}

/// Outcome of an adaptive integration.
#[derive(Debug, Clone, Copy)]
pub struct QuadratureResult {
    /// Estimated integral
    pub value: f64,

    /// Estimated absolute error
    pub abs_error: f64,

    /// Number of bisections performed
    pub subdivisions: usize,

    /// Number of integrand evaluations
    pub evaluations: usize,

    /// Did the error estimate meet the requested tolerance?
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

// =============================================================================
// Integration
// =============================================================================

/// Integrate `f` over `[a, b]`.
///
/// A NaN anywhere in the integrand makes the result NaN with
/// `converged = false`; the caller decides what that means.
pub fn integrate<F>(f: F, a: f64, b: f64, config: &QuadratureConfig) -> QuadratureResult
where
    F: Fn(f64) -> f64,
{
    if a == b {
        return QuadratureResult {
            value: 0.0,
            abs_error: 0.0,
            subdivisions: 0,
            evaluations: 0,
            converged: true,
        };
    }

    let mut segments = vec![kronrod_segment(&f, a, b)];
    let mut evaluations = 15;
    let mut subdivisions = 0;

    loop {
        let total: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();

        if !total.is_finite() || !error.is_finite() {
            return QuadratureResult {
                value: if total.is_nan() || error.is_nan() { f64::NAN } else { total },
                abs_error: error,
                subdivisions,
                evaluations,
                converged: false,
            };
        }

        let target = config.abs_tolerance.max(config.rel_tolerance * total.abs());
        if error <= target {
            return QuadratureResult {
                value: total,
                abs_error: error,
                subdivisions,
                evaluations,
                converged: true,
            };
        }

        if subdivisions >= config.max_subdivisions {
            warn!(
                value = total,
                abs_error = error,
                subdivisions,
                "adaptive quadrature reached its subdivision limit"
            );
            return QuadratureResult {
                value: total,
                abs_error: error,
                subdivisions,
                evaluations,
                converged: false,
            };
        }

        // Split the worst segment
        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.error.total_cmp(&y.error))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);

        // Interval can no longer be halved in floating point
        if mid <= seg.a.min(seg.b) || mid >= seg.a.max(seg.b) {
            return QuadratureResult {
                value: total,
                abs_error: error,
                subdivisions,
                evaluations,
                converged: false,
            };
        }

        segments.push(kronrod_segment(&f, seg.a, mid));
        segments.push(kronrod_segment(&f, mid, seg.b));
        evaluations += 30;
        subdivisions += 1;
    }
}

/// Apply the G7/K15 pair on `[a, b]`.
fn kronrod_segment<F>(f: &F, a: f64, b: f64) -> Segment
where
    F: Fn(f64) -> f64,
{
    let center = 0.5 * (a + b);
    let half_length = 0.5 * (b - a);

    let f_center = f(center);
    let mut kronrod = WGK[7] * f_center;
    let mut gauss = WG[3] * f_center;
    let mut abs_sum = WGK[7] * f_center.abs();

    let mut f_lo = [0.0; 7];
    let mut f_hi = [0.0; 7];
    for i in 0..7 {
        let dx = half_length * XGK[i];
        let lo = f(center - dx);
        let hi = f(center + dx);
        f_lo[i] = lo;
        f_hi[i] = hi;

        kronrod += WGK[i] * (lo + hi);
        abs_sum += WGK[i] * (lo.abs() + hi.abs());
        if i % 2 == 1 {
            gauss += WG[i / 2] * (lo + hi);
        }
    }

    // Mean of f over the segment, for the resasc estimate
    let mean = 0.5 * kronrod;
    let mut asc = WGK[7] * (f_center - mean).abs();
    for i in 0..7 {
        asc += WGK[i] * ((f_lo[i] - mean).abs() + (f_hi[i] - mean).abs());
    }

    let value = kronrod * half_length;
    let resabs = abs_sum * half_length.abs();
    let resasc = asc * half_length.abs();
    let mut error = ((kronrod - gauss) * half_length).abs();

    if resasc != 0.0 && error != 0.0 {
        error = resasc * (1.0f64).min((200.0 * error / resasc).powf(1.5));
    }
    if resabs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = error.max(50.0 * f64::EPSILON * resabs);
    }

    Segment { a, b, value, error }
}
