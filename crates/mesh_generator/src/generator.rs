//! High-level driver running placement, relaxation, redistribution and RDF evaluation.
use std::sync::Arc;

use glam::DVec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::density::{AcceptanceCurve, DensityField, ImageDensityField};
use crate::error::{Error, Result};
use crate::events::{EventSink, MeshEvent, MeshEventKind, Stage};
use crate::geometry::Domain;
use crate::grid::DomainGrid;
use crate::params::Parameters;
use crate::placement::{ParticlePlacer, PlacementStats};
use crate::rdf::RadialDistribution;
use crate::redistribution::Redistributor;
use crate::relaxation::CentroidalRelaxer;

/// A finished particle mesh.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Exactly `n_particles` positions inside the domain.
    pub positions: Vec<DVec2>,
    /// Domain the positions live in.
    pub domain: Domain,
    /// Radial distribution of the final configuration.
    pub rdf: RadialDistribution,
    /// Counters of the initial placement.
    pub placement: PlacementStats,
}

impl Mesh {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Generates meshes for one parameter set and density field.
pub struct MeshGenerator {
    params: Parameters,
    domain: Domain,
    grid_spacing: f64,
    placer: ParticlePlacer,
    pool: ThreadPool,
}

impl MeshGenerator {
    /// Validates `params`, checks that the grid fits and builds the worker pool.
    ///
    /// `domain` must agree with the periodicity and explicit bounds of `params`, and a field that
    /// reports its own threshold must use `params.threshold`.
    pub fn try_new(
        params: &Parameters,
        domain: Domain,
        field: Arc<dyn DensityField>,
    ) -> Result<Self> {
        params.validate()?;
        params.check_domain(&domain)?;
        if let Some(threshold) = field.admissibility_threshold() {
            if threshold != params.threshold {
                return Err(Error::InvalidConfig(format!(
                    "field threshold {threshold} differs from configured threshold {}",
                    params.threshold
                )));
            }
        }
        let grid_spacing = params.resolved_grid_spacing(&domain);
        DomainGrid::build(domain, grid_spacing)?;
        let placer = ParticlePlacer::try_new(params, domain, field)?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(params.threads)
            .thread_name(|i| format!("mesh-worker-{i}"))
            .build()?;
        Ok(Self {
            params: params.clone(),
            domain,
            grid_spacing,
            placer,
            pool,
        })
    }

    /// Uses the image's own domain.
    pub fn from_image(params: &Parameters, field: ImageDensityField) -> Result<Self> {
        let domain = *field.domain();
        Self::try_new(params, domain, Arc::new(field))
    }

    /// Replaces the acceptance curve of the placer.
    pub fn with_acceptance(mut self, curve: impl AcceptanceCurve + 'static) -> Self {
        self.placer = self.placer.with_acceptance(curve);
        self
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Worker threads in the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs the whole pipeline without observing events.
    pub fn run(&self) -> Result<Mesh> {
        self.run_with_events(&mut ())
    }

    /// Runs the whole pipeline, reporting progress to `sink`. Any error aborts the run and
    /// discards the partial mesh.
    pub fn run_with_events(&self, sink: &mut dyn EventSink) -> Result<Mesh> {
        self.pool.install(|| self.run_in_pool(sink))
    }

    fn run_in_pool(&self, sink: &mut dyn EventSink) -> Result<Mesh> {
        let params = &self.params;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let grid = DomainGrid::build(self.domain, self.grid_spacing)?;

        info!(
            "Run started: {} particles, domain [{}, {}] x [{}, {}], {}x{} cells, {} threads.",
            params.n_particles,
            self.domain.min.x,
            self.domain.max.x,
            self.domain.min.y,
            self.domain.max.y,
            grid.dims().0,
            grid.dims().1,
            self.threads()
        );
        if sink.wants(MeshEventKind::RunStarted) {
            sink.send(MeshEvent::RunStarted {
                n_particles: params.n_particles,
                domain: self.domain,
                grid_dims: grid.dims(),
                threads: self.threads(),
            });
        }

        if params.redistributed_points > params.n_particles && sink.wants(MeshEventKind::Warning) {
            sink.send(MeshEvent::Warning {
                context: Stage::Redistribution.label().into(),
                message: format!(
                    "redistributed_points ({}) clamped to n_particles ({})",
                    params.redistributed_points, params.n_particles
                ),
            });
        }

        let (mut positions, placement) = self.placer.place(&mut rng)?;
        if sink.wants(MeshEventKind::PlacementFinished) {
            sink.send(MeshEvent::PlacementFinished { stats: placement });
        }
        if sink.wants(MeshEventKind::Snapshot) {
            sink.send(MeshEvent::Snapshot {
                stage: Stage::Placement,
                step: 0,
                positions: positions.clone(),
            });
        }

        let mut relaxer = CentroidalRelaxer::try_new(params, grid, self.placer.clone())?;
        relaxer.run(&mut positions, &mut rng, sink)?;

        let mut redistributor =
            Redistributor::try_new(params, relaxer.into_grid(), self.placer.clone())?;
        redistributor.run(&mut positions, &mut rng, sink)?;

        let rdf = RadialDistribution::from_params(params, &positions, &self.domain)?;
        if let Some((peak_r, peak_g)) = rdf.peak() {
            info!("Radial distribution peak g = {:.4} at r = {:.4e}.", peak_g, peak_r);
            if sink.wants(MeshEventKind::RdfComputed) {
                sink.send(MeshEvent::RdfComputed { peak_r, peak_g });
            }
        }

        if sink.wants(MeshEventKind::RunFinished) {
            sink.send(MeshEvent::RunFinished {
                n_particles: positions.len(),
            });
        }
        Ok(Mesh {
            positions,
            domain: self.domain,
            rdf,
            placement,
        })
    }
}
