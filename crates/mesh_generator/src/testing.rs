//! Shared fixtures for unit tests.
use std::sync::Arc;

use glam::DVec2;

use crate::density::{DensityField, DensitySample, ImageDensityField};
use crate::geometry::Domain;

/// Field with the same raw intensity everywhere.
pub(crate) fn flat_field(domain: Domain, value: u8, threshold: f64) -> Arc<dyn DensityField> {
    Arc::new(ImageDensityField::from_luma8(1, 1, &[value], threshold, domain).unwrap())
}

/// Left half at `left`, right half at `right`.
pub(crate) fn split_field(domain: Domain, left: u8, right: u8) -> Arc<dyn DensityField> {
    Arc::new(ImageDensityField::from_luma8(2, 1, &[left, right], 0.0, domain).unwrap())
}

/// Admissible only inside a disk.
pub(crate) struct DiskField {
    pub center: DVec2,
    pub radius: f64,
}

impl DensityField for DiskField {
    fn sample(&self, p: DVec2) -> DensitySample {
        if (p - self.center).length_squared() <= self.radius * self.radius {
            DensitySample::new(1.0, true)
        } else {
            DensitySample::VOID
        }
    }
}

/// Runs `f` inside a dedicated pool with `threads` workers.
pub(crate) fn with_threads<T: Send>(threads: usize, f: impl FnOnce() -> T + Send) -> T {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .unwrap()
        .install(f)
}
