//! Probabilistic centroidal relaxation.
//!
//! Every iteration draws `q` density-distributed samples, attributes each one to the nearest
//! particle found in the sample's cell and the adjacent cells, and moves every particle toward
//! the mean of its samples. The step weight is `c_i / (j_i + c_i)`, where `c_i` is the number of
//! samples the particle received this iteration and `j_i` the running total of earlier
//! iterations, so particles settle as they accumulate samples.
use glam::DVec2;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::Result;
use crate::events::{EventSink, MeshEvent, MeshEventKind, Stage};
use crate::grid::DomainGrid;
use crate::params::Parameters;
use crate::placement::ParticlePlacer;

/// Samples attributed by one parallel task.
const CHUNK_SIZE: usize = 1024;

/// Outcome of one relaxation iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RelaxationReport {
    /// Samples that found a particle in their neighbourhood.
    pub samples_used: usize,
    /// Mean displacement of the particles that moved.
    pub mean_shift: f64,
}

/// Lloyd-style relaxer driven by rejection-sampled density points.
pub struct CentroidalRelaxer {
    grid: DomainGrid,
    placer: ParticlePlacer,
    iterations: usize,
    snapshot_interval: usize,
    weights: Vec<u64>,
}

impl CentroidalRelaxer {
    pub fn try_new(params: &Parameters, grid: DomainGrid, placer: ParticlePlacer) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            grid,
            placer,
            iterations: params.relaxation_iterations,
            snapshot_interval: params.snapshot_interval,
            weights: vec![1; params.n_particles],
        })
    }

    pub fn grid(&self) -> &DomainGrid {
        &self.grid
    }

    pub fn into_grid(self) -> DomainGrid {
        self.grid
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Running per-particle sample counts `j_i`.
    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    /// Runs one iteration in place.
    pub fn iterate(
        &mut self,
        positions: &mut [DVec2],
        rng: &mut dyn Rng,
    ) -> Result<RelaxationReport> {
        if self.weights.len() != positions.len() {
            self.weights.resize(positions.len(), 1);
        }
        self.grid.map_particles_to_grid(positions);
        let (samples, _) = self.placer.sample_exact(
            self.placer.batch_size(),
            self.placer.attempt_budget(),
            rng,
        )?;

        let grid = &self.grid;
        let domain = *grid.domain();
        let current: &[DVec2] = positions;
        let attributed: Vec<Vec<(usize, DVec2)>> = samples
            .par_chunks(CHUNK_SIZE)
            .map(|chunk| {
                chunk
                    .iter()
                    .filter_map(|&s| {
                        grid.nearest_particle(s, current)
                            .map(|i| (i, domain.separation(current[i], s)))
                    })
                    .collect()
            })
            .collect();

        // merged in chunk order so the sums do not depend on the worker count
        let mut sums = vec![DVec2::ZERO; positions.len()];
        let mut counts = vec![0u64; positions.len()];
        let mut samples_used = 0;
        for (i, delta) in attributed.into_iter().flatten() {
            sums[i] += delta;
            counts[i] += 1;
            samples_used += 1;
        }

        let shifts: Vec<Option<f64>> = positions
            .par_iter_mut()
            .zip(self.weights.par_iter_mut())
            .zip(sums.par_iter().zip(counts.par_iter()))
            .map(|((x, j), (&sum, &c))| {
                if c == 0 {
                    return None;
                }
                let cf = c as f64;
                let step = sum / cf * (cf / (*j as f64 + cf));
                let moved = domain.check_boundaries(*x + step);
                let shift = domain.distance(*x, moved);
                *x = moved;
                *j += c;
                Some(shift)
            })
            .collect();

        let (total, moved) = shifts
            .into_iter()
            .flatten()
            .fold((0.0, 0usize), |(t, m), s| (t + s, m + 1));
        Ok(RelaxationReport {
            samples_used,
            mean_shift: if moved == 0 { 0.0 } else { total / moved as f64 },
        })
    }

    /// Runs all configured iterations.
    pub fn run(
        &mut self,
        positions: &mut [DVec2],
        rng: &mut dyn Rng,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        if self.iterations == 0 {
            return Ok(());
        }
        info!(
            "Relaxing {} particles over {} iterations.",
            positions.len(),
            self.iterations
        );
        for iteration in 0..self.iterations {
            let report = self.iterate(positions, rng)?;
            debug!(
                "Relaxation iteration {}: {} samples used, mean shift {:.3e}.",
                iteration, report.samples_used, report.mean_shift
            );
            if sink.wants(MeshEventKind::RelaxationStep) {
                sink.send(MeshEvent::RelaxationStep {
                    iteration,
                    samples_used: report.samples_used,
                    mean_shift: report.mean_shift,
                });
            }
            let snapshot_due = (iteration + 1) % self.snapshot_interval == 0;
            if snapshot_due && sink.wants(MeshEventKind::Snapshot) {
                sink.send(MeshEvent::Snapshot {
                    stage: Stage::Relaxation,
                    step: iteration + 1,
                    positions: positions.to_vec(),
                });
            }
        }
        Ok(())
    }
}
