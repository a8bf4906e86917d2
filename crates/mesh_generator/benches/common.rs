use std::time::Duration;

use criterion::{Criterion, Throughput};
use glam::DVec2;
use mesh_generator::prelude::{Domain, ImageDensityField};

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// Radial gradient image, brightest in the center, over the unit square.
#[allow(dead_code)]
pub fn gradient_field(size: usize) -> ImageDensityField {
    let center = DVec2::splat((size as f64 - 1.0) * 0.5);
    let max = center.length();
    let pixels: Vec<u8> = (0..size * size)
        .map(|i| {
            let p = DVec2::new((i % size) as f64, (i / size) as f64);
            (255.0 * (1.0 - (p - center).length() / max)).round() as u8
        })
        .collect();
    ImageDensityField::from_luma8(size, size, &pixels, 1.0, Domain::unit())
        .expect("valid benchmark image")
}
