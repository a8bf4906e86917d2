//! Immutable run parameters.
//!
//! [`Parameters`] is validated once and then passed by reference into every component
//! constructor. With the `serde` feature it deserializes from a configuration record; missing
//! keys take the documented defaults and the camel-case keys of older configuration files are
//! accepted as aliases.
use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Domain;

/// Configuration consumed by the placer, grid, redistributor, relaxer and RDF calculator.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Parameters {
    /// Number of particles in the generated mesh.
    #[cfg_attr(feature = "serde", serde(alias = "nParticles"))]
    pub n_particles: usize,
    /// Candidate batch size per placement round, as a multiple of `n_particles`.
    #[cfg_attr(feature = "serde", serde(alias = "multiplicationFactor", alias = "q"))]
    pub multiplication_factor: usize,
    /// Pixels with a raw intensity below this value are void.
    pub threshold: f64,
    pub alpha_1: f64,
    pub alpha_2: f64,
    pub beta_1: f64,
    pub beta_2: f64,
    /// `[X_0, X_1]`; derived from the image aspect ratio when absent.
    #[cfg_attr(
        feature = "serde",
        serde(alias = "X", skip_serializing_if = "Option::is_none")
    )]
    pub x_bounds: Option<[f64; 2]>,
    /// `[Y_0, Y_1]`; derived from the image aspect ratio when absent.
    #[cfg_attr(
        feature = "serde",
        serde(alias = "Y", skip_serializing_if = "Option::is_none")
    )]
    pub y_bounds: Option<[f64; 2]>,
    pub periodic_x: bool,
    pub periodic_y: bool,
    /// Number of redistribution passes.
    #[cfg_attr(feature = "serde", serde(alias = "redistributionFrequency"))]
    pub redistribution_passes: usize,
    /// Particles resampled per redistribution pass.
    #[cfg_attr(feature = "serde", serde(alias = "nRedistributedPoints"))]
    pub redistributed_points: usize,
    /// Centroidal relaxation iterations run before redistribution.
    pub relaxation_iterations: usize,
    /// Steps between [`crate::events::MeshEvent::Snapshot`] events.
    #[cfg_attr(feature = "serde", serde(alias = "testSaveFreq"))]
    pub snapshot_interval: usize,
    /// Worker threads; `0` lets the pool pick one per core.
    #[cfg_attr(feature = "serde", serde(alias = "openmp_threads"))]
    pub threads: usize,
    pub seed: u64,
    /// Attempt budget for placement and for each resampled particle. Defaults to `100 × q`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub max_placement_attempts: Option<u64>,
    /// Grid cell size. Defaults to the mean inter-particle spacing `sqrt(area / n)`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub grid_spacing: Option<f64>,
    pub rdf_bins: usize,
    /// Histogram range. Defaults to half the shorter domain side.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub rdf_max_radius: Option<f64>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            n_particles: 128,
            multiplication_factor: 20,
            threshold: 0.0,
            alpha_1: 0.5,
            alpha_2: 0.5,
            beta_1: 0.5,
            beta_2: 0.5,
            x_bounds: None,
            y_bounds: None,
            periodic_x: false,
            periodic_y: false,
            redistribution_passes: 100,
            redistributed_points: 0,
            relaxation_iterations: 0,
            snapshot_interval: 100,
            threads: 2,
            seed: 1,
            max_placement_attempts: None,
            grid_spacing: None,
            rdf_bins: 100,
            rdf_max_radius: None,
        }
    }
}

impl Parameters {
    /// Creates parameters for `n_particles` with all other fields at their defaults.
    pub fn new(n_particles: usize) -> Self {
        Self {
            n_particles,
            ..Default::default()
        }
    }

    /// Sets explicit domain bounds.
    pub fn with_bounds(mut self, x: [f64; 2], y: [f64; 2]) -> Self {
        self.x_bounds = Some(x);
        self.y_bounds = Some(y);
        self
    }

    /// Sets the periodic axes.
    pub fn with_periodic(mut self, periodic_x: bool, periodic_y: bool) -> Self {
        self.periodic_x = periodic_x;
        self.periodic_y = periodic_y;
        self
    }

    /// Sets the admissibility threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the four acceptance-curve coefficients.
    pub fn with_shaping(mut self, alpha_1: f64, alpha_2: f64, beta_1: f64, beta_2: f64) -> Self {
        self.alpha_1 = alpha_1;
        self.alpha_2 = alpha_2;
        self.beta_1 = beta_1;
        self.beta_2 = beta_2;
        self
    }

    /// Sets the candidate batch multiplier.
    pub fn with_multiplication_factor(mut self, factor: usize) -> Self {
        self.multiplication_factor = factor;
        self
    }

    /// Sets the redistribution pass count and the particles replaced per pass.
    pub fn with_redistribution(mut self, passes: usize, points: usize) -> Self {
        self.redistribution_passes = passes;
        self.redistributed_points = points;
        self
    }

    /// Sets the number of centroidal relaxation iterations.
    pub fn with_relaxation_iterations(mut self, iterations: usize) -> Self {
        self.relaxation_iterations = iterations;
        self
    }

    /// Sets the steps between snapshot events.
    pub fn with_snapshot_interval(mut self, interval: usize) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Sets the worker count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the seed of the run generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the attempt budget.
    pub fn with_max_placement_attempts(mut self, attempts: u64) -> Self {
        self.max_placement_attempts = Some(attempts);
        self
    }

    /// Overrides the grid cell size.
    pub fn with_grid_spacing(mut self, spacing: f64) -> Self {
        self.grid_spacing = Some(spacing);
        self
    }

    /// Sets the RDF histogram layout.
    pub fn with_rdf(mut self, bins: usize, max_radius: Option<f64>) -> Self {
        self.rdf_bins = bins;
        self.rdf_max_radius = max_radius;
        self
    }

    /// Candidate batch size `q = n_particles × multiplication_factor`.
    pub fn batch_size(&self) -> usize {
        self.n_particles.saturating_mul(self.multiplication_factor)
    }

    /// Effective attempt budget.
    pub fn attempt_budget(&self) -> u64 {
        self.max_placement_attempts
            .unwrap_or_else(|| (self.batch_size() as u64).saturating_mul(100))
    }

    /// Resolves the domain: explicit bounds when both are set, otherwise the image aspect.
    pub fn domain(&self, image_width: usize, image_height: usize) -> Result<Domain> {
        match (self.x_bounds, self.y_bounds) {
            (Some(x), Some(y)) => Domain::try_new(
                DVec2::new(x[0], y[0]),
                DVec2::new(x[1], y[1]),
                self.periodic_x,
                self.periodic_y,
            ),
            (None, None) => Domain::from_image_aspect(
                image_width,
                image_height,
                self.periodic_x,
                self.periodic_y,
            ),
            _ => Err(Error::InvalidConfig(
                "x_bounds and y_bounds must be given together".into(),
            )),
        }
    }

    /// Checks that `domain` agrees with the configured periodicity and, when set, the explicit
    /// bounds.
    pub fn check_domain(&self, domain: &Domain) -> Result<()> {
        if domain.periodic_x != self.periodic_x || domain.periodic_y != self.periodic_y {
            return Err(Error::InvalidConfig(format!(
                "domain periodicity ({}, {}) differs from periodic_x/periodic_y ({}, {})",
                domain.periodic_x, domain.periodic_y, self.periodic_x, self.periodic_y
            )));
        }
        let bounds = [
            ("x_bounds", self.x_bounds, [domain.min.x, domain.max.x]),
            ("y_bounds", self.y_bounds, [domain.min.y, domain.max.y]),
        ];
        for (name, configured, actual) in bounds {
            if let Some(expected) = configured {
                if expected != actual {
                    return Err(Error::InvalidConfig(format!(
                        "domain {actual:?} differs from {name} {expected:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Grid cell size for `domain`.
    pub fn resolved_grid_spacing(&self, domain: &Domain) -> f64 {
        self.grid_spacing
            .unwrap_or_else(|| (domain.area() / self.n_particles.max(1) as f64).sqrt())
    }

    /// Validates ranges, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.n_particles == 0 {
            return Err(Error::InvalidConfig("n_particles must be > 0".into()));
        }
        if self.multiplication_factor == 0 {
            return Err(Error::InvalidConfig(
                "multiplication_factor must be > 0".into(),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(Error::InvalidConfig("threshold must be finite".into()));
        }
        let coefficients = [
            ("alpha_1", self.alpha_1),
            ("alpha_2", self.alpha_2),
            ("beta_1", self.beta_1),
            ("beta_2", self.beta_2),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{name} must be finite")));
            }
        }
        if self.beta_1 < 0.0 || self.beta_2 < 0.0 {
            return Err(Error::InvalidConfig(
                "beta_1 and beta_2 must be >= 0".into(),
            ));
        }
        for (name, bounds) in [("x_bounds", self.x_bounds), ("y_bounds", self.y_bounds)] {
            if let Some([lo, hi]) = bounds {
                if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                    return Err(Error::InvalidConfig(format!(
                        "{name} must be finite with lower < upper, got [{lo}, {hi}]"
                    )));
                }
            }
        }
        if self.x_bounds.is_some() != self.y_bounds.is_some() {
            return Err(Error::InvalidConfig(
                "x_bounds and y_bounds must be given together".into(),
            ));
        }
        if self.snapshot_interval == 0 {
            return Err(Error::InvalidConfig("snapshot_interval must be > 0".into()));
        }
        if self.attempt_budget() == 0 {
            return Err(Error::InvalidConfig(
                "max_placement_attempts must be > 0".into(),
            ));
        }
        if let Some(spacing) = self.grid_spacing {
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(Error::InvalidConfig("grid_spacing must be > 0".into()));
            }
        }
        if self.rdf_bins == 0 {
            return Err(Error::InvalidConfig("rdf_bins must be > 0".into()));
        }
        if let Some(radius) = self.rdf_max_radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(Error::InvalidConfig("rdf_max_radius must be > 0".into()));
            }
        }
        Ok(())
    }
}
