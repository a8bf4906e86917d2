//! Acceptance curves mapping normalized intensity to an acceptance probability.
//!
//! The placer accepts an admissible candidate with probability `curve.probability(t)`, where
//! `t` is the normalized intensity at the candidate. Curves are swappable through
//! [`crate::placement::ParticlePlacer::with_acceptance`].
use crate::params::Parameters;

/// Trait for acceptance curves. Results are clamped to `[0, 1]` by the caller.
pub trait AcceptanceCurve: Send + Sync {
    fn probability(&self, intensity: f64) -> f64;
}

/// Blend of two power laws:
/// `p(t) = clamp(alpha_1 * t^beta_1 + alpha_2 * t^beta_2, 0, 1)`.
///
/// With the default coefficients (all `0.5`) this reduces to `p(t) = sqrt(t)`.
/// `beta = 0` turns a term into the constant `alpha`, `beta = 1` into a linear ramp.
///
/// The threshold and the curve act separately. `threshold = 0` makes every pixel admissible,
/// but with positive exponents a zero-intensity pixel still has `p(0) = 0`, so an all-black
/// image cannot be filled. Use [`ConstantCurve::ALWAYS`] to accept every admissible candidate
/// regardless of intensity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerBlendCurve {
    pub alpha_1: f64,
    pub alpha_2: f64,
    pub beta_1: f64,
    pub beta_2: f64,
}

impl PowerBlendCurve {
    pub fn new(alpha_1: f64, alpha_2: f64, beta_1: f64, beta_2: f64) -> Self {
        Self {
            alpha_1,
            alpha_2,
            beta_1,
            beta_2,
        }
    }
}

impl Default for PowerBlendCurve {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.5, 0.5)
    }
}

impl From<&Parameters> for PowerBlendCurve {
    fn from(p: &Parameters) -> Self {
        Self::new(p.alpha_1, p.alpha_2, p.beta_1, p.beta_2)
    }
}

impl AcceptanceCurve for PowerBlendCurve {
    #[inline]
    fn probability(&self, intensity: f64) -> f64 {
        let t = intensity.clamp(0.0, 1.0);
        (self.alpha_1 * t.powf(self.beta_1) + self.alpha_2 * t.powf(self.beta_2)).clamp(0.0, 1.0)
    }
}

/// Accepts every admissible candidate with a fixed probability, ignoring intensity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantCurve(pub f64);

impl ConstantCurve {
    /// Accept every admissible candidate.
    pub const ALWAYS: Self = Self(1.0);
}

impl AcceptanceCurve for ConstantCurve {
    #[inline]
    fn probability(&self, _intensity: f64) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_curve_is_square_root() {
        let c = PowerBlendCurve::default();
        for t in [0.0, 0.04, 0.25, 0.81, 1.0] {
            assert!((c.probability(t) - f64::sqrt(t)).abs() < 1e-12);
        }
    }

    #[test]
    fn curve_is_clamped_to_unit_interval() {
        let c = PowerBlendCurve::new(2.0, 2.0, 1.0, 1.0);
        assert_eq!(c.probability(1.0), 1.0);
        let c = PowerBlendCurve::new(-1.0, 0.0, 1.0, 1.0);
        assert_eq!(c.probability(0.5), 0.0);
    }

    #[test]
    fn zero_exponent_gives_constant_term() {
        let c = PowerBlendCurve::new(0.3, 0.0, 0.0, 1.0);
        assert!((c.probability(0.0) - 0.3).abs() < 1e-12);
        assert!((c.probability(1.0) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn curve_reads_coefficients_from_parameters() {
        let p = Parameters::new(10).with_shaping(1.0, 0.0, 1.0, 3.0);
        let c = PowerBlendCurve::from(&p);
        assert!((c.probability(0.4) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn constant_curve_ignores_intensity() {
        assert_eq!(ConstantCurve::ALWAYS.probability(0.0), 1.0);
        assert_eq!(ConstantCurve(0.25).probability(0.9), 0.25);
        assert_eq!(ConstantCurve(4.0).probability(0.9), 1.0);
    }
}
