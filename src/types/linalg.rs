//! Linear algebra type aliases for the preintegration pipeline
//!
//! Everything runs on `f64` 3-vectors; the helpers below are the only
//! combinations the integrators need beyond nalgebra's operators.

use nalgebra::Vector3;

pub type Vec3 = Vector3<f64>;

// ===== Bortz coefficient series =====
pub const BORTZ_K0: f64 = 1.0 / 12.0;
pub const BORTZ_K2: f64 = 1.0 / 720.0;
pub const BORTZ_K4: f64 = 1.0 / 30240.0;
pub const BORTZ_K6: f64 = 1.0 / 1209600.0;

/// Truncated Taylor series of the Bortz second-order coefficient.
///
/// Takes `|theta|²` rather than `|theta|` so the hot path never needs a sqrt.
pub fn bortz_coefficient(mag2: f64) -> f64 {
    let mag4 = mag2 * mag2;
    BORTZ_K0 + mag2 * BORTZ_K2 + mag4 * BORTZ_K4 + mag4 * mag2 * BORTZ_K6
}

/// Componentwise "all axes below threshold" check
pub fn all_below(v: &Vec3, threshold: f64) -> bool {
    v.iter().all(|c| c.abs() < threshold)
}
