//! Radial distribution function of a particle configuration.
//!
//! g(r) is binned at discrete radii over `[0, r_max)`. Unique pairs are enumerated with
//! minimum-image distances and each bin is normalized by the number of pairs a uniform 2-D
//! configuration with the same particle count and area would place in that annulus.
use std::f64::consts::PI;

use glam::DVec2;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::geometry::Domain;
use crate::params::Parameters;

/// g(r) binned at discrete r values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadialDistribution {
    /// Bin centers.
    pub r_values: Vec<f64>,
    /// Radial distribution function g(r).
    pub g_values: Vec<f64>,
    /// Raw pair count per bin.
    pub histogram: Vec<u64>,
    /// Bin width.
    pub dr: f64,
}

impl RadialDistribution {
    /// Computes g(r) with `bins` bins over `[0, r_max)`.
    ///
    /// Rows of the pair matrix are distributed across the pool; every task fills its own
    /// integer histogram and the histograms are summed, so the result is identical for any
    /// worker count.
    pub fn compute(positions: &[DVec2], domain: &Domain, bins: usize, r_max: f64) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidConfig("rdf bins must be > 0".into()));
        }
        if !r_max.is_finite() || r_max <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "rdf radius must be > 0, got {r_max}"
            )));
        }
        let dr = r_max / bins as f64;
        let n = positions.len();

        let histogram = (0..n)
            .into_par_iter()
            .fold(
                || vec![0u64; bins],
                |mut hist, i| {
                    let a = positions[i];
                    for &b in &positions[i + 1..] {
                        let bin = (domain.distance(a, b) / dr) as usize;
                        if bin < bins {
                            hist[bin] += 1;
                        }
                    }
                    hist
                },
            )
            .reduce(
                || vec![0u64; bins],
                |mut acc, hist| {
                    for (a, h) in acc.iter_mut().zip(hist) {
                        *a += h;
                    }
                    acc
                },
            );

        // expected pairs per unit area for a uniform configuration
        let pair_density = 0.5 * n as f64 * n.saturating_sub(1) as f64 / domain.area();
        let r_values: Vec<f64> = (0..bins).map(|k| (k as f64 + 0.5) * dr).collect();
        let g_values = histogram
            .iter()
            .enumerate()
            .map(|(k, &count)| {
                let r = k as f64 * dr;
                let shell = PI * ((r + dr) * (r + dr) - r * r);
                let expected = pair_density * shell;
                if expected > 0.0 {
                    count as f64 / expected
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Self {
            r_values,
            g_values,
            histogram,
            dr,
        })
    }

    /// Computes g(r) with the bin count and radius from `params`. The radius defaults to half
    /// the shorter domain side.
    pub fn from_params(params: &Parameters, positions: &[DVec2], domain: &Domain) -> Result<Self> {
        let r_max = params
            .rdf_max_radius
            .unwrap_or_else(|| 0.5 * domain.extent().min_element());
        Self::compute(positions, domain, params.rdf_bins, r_max)
    }

    pub fn len(&self) -> usize {
        self.g_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.g_values.is_empty()
    }

    /// Upper edge of the binned range.
    pub fn r_max(&self) -> f64 {
        self.dr * self.len() as f64
    }

    /// `(r, g)` pairs in bin order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.r_values.iter().copied().zip(self.g_values.iter().copied())
    }

    /// Bin with the highest g; the first one wins on ties.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.iter()
            .fold(None, |best: Option<(f64, f64)>, (r, g)| match best {
                Some((_, bg)) if bg >= g => best,
                _ => Some((r, g)),
            })
    }
}
