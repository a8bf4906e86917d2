//! Random number helpers shared by placement, redistribution and relaxation.
//!
//! Reproducibility contract: every run owns one [`rand::rngs::StdRng`] seeded from
//! [`crate::params::Parameters::seed`]. Parallel tasks never share a generator; each task seeds
//! its own from [`derive_seed`] applied to a value drawn by the owner and the task index, so the
//! output depends on the seed and the configuration but not on the worker count.
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::Domain;

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn Rng) -> f64 {
    // 53 high bits give every representable step of the unit interval
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Draw a point uniformly from `[X_0, X_1) × [Y_0, Y_1)`.
#[inline]
pub(crate) fn uniform_point(domain: &Domain, rng: &mut dyn Rng) -> DVec2 {
    let e = domain.extent();
    let u = rand01(rng);
    let v = rand01(rng);
    domain.min + DVec2::new(u * e.x, v * e.y)
}

/// Deterministically mixes a base seed with a stream index.
pub fn derive_seed(base_seed: u64, stream: u64) -> u64 {
    mix_u64(base_seed ^ stream.wrapping_mul(0x9E3779B97F4A7C15))
}

/// Generator for one parallel task.
#[inline]
pub(crate) fn task_rng(base_seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(derive_seed(base_seed, stream))
}

#[inline]
fn mix_u64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}
