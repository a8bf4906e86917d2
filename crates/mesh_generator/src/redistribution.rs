//! Iterative redistribution of the most crowded particles.
//!
//! One pass rebuilds the grid, scores every particle by the number of other particles in its
//! cell and the adjacent cells, and resamples the `redistributed_points` highest-scoring
//! particles with the placer's acceptance procedure. Replacement positions are computed by
//! per-slot tasks with their own generators and merged in a single-threaded step.
use glam::DVec2;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{EventSink, MeshEvent, MeshEventKind, Stage};
use crate::grid::DomainGrid;
use crate::params::Parameters;
use crate::placement::ParticlePlacer;
use crate::sampling::task_rng;

/// Summary of one redistribution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PassReport {
    /// Particles resampled.
    pub replaced: usize,
    /// Highest crowding score before resampling.
    pub max_crowding: usize,
    /// Mean crowding score before resampling.
    pub mean_crowding: f64,
}

/// Runs redistribution passes over a particle set.
pub struct Redistributor {
    grid: DomainGrid,
    placer: ParticlePlacer,
    passes: usize,
    points_per_pass: usize,
    snapshot_interval: usize,
}

impl Redistributor {
    /// Creates a redistributor. A per-pass count above `n_particles` is clamped.
    pub fn try_new(params: &Parameters, grid: DomainGrid, placer: ParticlePlacer) -> Result<Self> {
        params.validate()?;
        let mut points_per_pass = params.redistributed_points;
        if points_per_pass > params.n_particles {
            warn!(
                "redistributed_points ({}) exceeds n_particles ({}); clamping.",
                points_per_pass, params.n_particles
            );
            points_per_pass = params.n_particles;
        }
        Ok(Self {
            grid,
            placer,
            passes: params.redistribution_passes,
            points_per_pass,
            snapshot_interval: params.snapshot_interval,
        })
    }

    /// The grid as of the last rebuild.
    pub fn grid(&self) -> &DomainGrid {
        &self.grid
    }

    pub fn into_grid(self) -> DomainGrid {
        self.grid
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn points_per_pass(&self) -> usize {
        self.points_per_pass
    }

    /// Crowding score of every particle: the number of other particles in its cell and the
    /// adjacent cells. Rebuilds the grid first.
    pub fn crowding_scores(&mut self, positions: &[DVec2]) -> Vec<usize> {
        self.grid.map_particles_to_grid(positions);
        let counts = self.grid.neighbourhood_counts();
        let grid = &self.grid;
        positions
            .par_iter()
            .map(|&p| counts[grid.find_grid_id(p)].saturating_sub(1))
            .collect()
    }

    /// One redistribution pass. `seed` feeds the per-slot generators.
    pub fn pass(&mut self, positions: &mut [DVec2], seed: u64) -> Result<PassReport> {
        let scores = self.crowding_scores(positions);
        let max_crowding = scores.iter().copied().max().unwrap_or(0);
        let mean_crowding = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<usize>() as f64 / scores.len() as f64
        };

        let selected = select_most_crowded(&scores, self.points_per_pass);
        let placer = &self.placer;
        let replacements: Vec<(usize, DVec2)> = selected
            .par_iter()
            .enumerate()
            .map(|(slot, &i)| {
                let mut rng = task_rng(seed, slot as u64);
                let p = placer.sample_one(&mut rng)?;
                Ok((i, placer.domain().check_boundaries(p)))
            })
            .collect::<Result<_>>()?;

        for &(i, p) in &replacements {
            positions[i] = p;
        }

        Ok(PassReport {
            replaced: replacements.len(),
            max_crowding,
            mean_crowding,
        })
    }

    /// Runs all configured passes, then leaves the grid mapped to the final positions.
    pub fn run(
        &mut self,
        positions: &mut [DVec2],
        rng: &mut dyn Rng,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        if self.passes == 0 || self.points_per_pass == 0 {
            info!("Redistribution disabled.");
            self.grid.map_particles_to_grid(positions);
            return Ok(());
        }

        info!(
            "Redistributing {} particles per pass over {} passes.",
            self.points_per_pass, self.passes
        );
        for pass in 0..self.passes {
            let report = self.pass(positions, rng.next_u64())?;
            debug!(
                "Redistribution pass {}: replaced {}, crowding max {} mean {:.3}.",
                pass, report.replaced, report.max_crowding, report.mean_crowding
            );
            if sink.wants(MeshEventKind::RedistributionPass) {
                sink.send(MeshEvent::RedistributionPass {
                    pass,
                    replaced: report.replaced,
                    max_crowding: report.max_crowding,
                    mean_crowding: report.mean_crowding,
                });
            }
            if (pass + 1) % self.snapshot_interval == 0 && sink.wants(MeshEventKind::Snapshot) {
                sink.send(MeshEvent::Snapshot {
                    stage: Stage::Redistribution,
                    step: pass + 1,
                    positions: positions.to_vec(),
                });
            }
        }
        self.grid.map_particles_to_grid(positions);
        Ok(())
    }
}

/// Indices of the `k` highest scores, ties broken by lower index, returned in ascending index
/// order.
pub fn select_most_crowded(scores: &[usize], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].cmp(&scores[a]).then(a.cmp(&b)));
    order.truncate(k);
    order.sort_unstable();
    order
}
