//! Density fields and acceptance curves driving stochastic placement.
//!
//! A [`DensityField`] answers two questions for a domain position: how bright the underlying
//! field is (normalized to `[0, 1]`) and whether the position is admissible at all. An
//! [`AcceptanceCurve`] turns that intensity into an acceptance probability.
use glam::DVec2;

pub mod acceptance;
pub mod raster;

pub use acceptance::{AcceptanceCurve, ConstantCurve, PowerBlendCurve};
pub use raster::ImageDensityField;

/// Result of sampling a [`DensityField`] at one position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensitySample {
    /// Normalized intensity in `[0, 1]`.
    pub intensity: f64,
    /// Whether the position belongs to the admissible region.
    pub admissible: bool,
}

impl DensitySample {
    /// Sample returned for positions outside the field.
    pub const VOID: Self = Self {
        intensity: 0.0,
        admissible: false,
    };

    pub fn new(intensity: f64, admissible: bool) -> Self {
        Self {
            intensity,
            admissible,
        }
    }
}

/// Trait for scalar density fields sampled at a position in domain coordinates.
/// Implementors map the domain position to their own storage as needed.
pub trait DensityField: Send + Sync {
    fn sample(&self, p: DVec2) -> DensitySample;

    /// Raw threshold separating admissible from void positions, if the field has one.
    fn admissibility_threshold(&self) -> Option<f64> {
        None
    }
}
