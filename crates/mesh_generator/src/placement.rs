//! Stochastic particle placement by rejection sampling against a density field.
//!
//! Candidates are drawn uniformly over the domain in batches of `q` and tested in parallel.
//! A batch is split into fixed-size tasks; each task owns a generator seeded from the round
//! seed and its task index and writes accepted candidates into its own buffer. Buffers are
//! concatenated in task order, so the accepted sequence depends only on the run seed.
use std::sync::Arc;

use glam::DVec2;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::density::{AcceptanceCurve, DensityField, PowerBlendCurve};
use crate::error::{Error, Result};
use crate::geometry::Domain;
use crate::params::Parameters;
use crate::sampling::{rand01, task_rng, uniform_point};

/// Candidates tested by one parallel task.
const TASK_SIZE: usize = 1024;

/// Counters describing a placement run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlacementStats {
    /// Particles accepted.
    pub accepted: usize,
    /// Candidates drawn.
    pub attempts: u64,
    /// Batches drawn.
    pub rounds: usize,
}

impl PlacementStats {
    /// Accepted over drawn candidates, counting every candidate of the last batch.
    pub fn acceptance_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempts as f64
        }
    }
}

/// Rejection sampler for particle positions.
#[derive(Clone)]
pub struct ParticlePlacer {
    domain: Domain,
    field: Arc<dyn DensityField>,
    curve: Arc<dyn AcceptanceCurve>,
    n_particles: usize,
    batch_size: usize,
    attempt_budget: u64,
}

impl ParticlePlacer {
    /// Creates a placer using [`PowerBlendCurve`] built from the shaping coefficients.
    pub fn try_new(
        params: &Parameters,
        domain: Domain,
        field: Arc<dyn DensityField>,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            domain,
            field,
            curve: Arc::new(PowerBlendCurve::from(params)),
            n_particles: params.n_particles,
            batch_size: params.batch_size(),
            attempt_budget: params.attempt_budget(),
        })
    }

    /// Replaces the acceptance curve.
    pub fn with_acceptance(mut self, curve: impl AcceptanceCurve + 'static) -> Self {
        self.curve = Arc::new(curve);
        self
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn attempt_budget(&self) -> u64 {
        self.attempt_budget
    }

    /// Acceptance test for one candidate: it must be admissible, then it passes with
    /// the curve's probability at its intensity.
    #[inline]
    pub fn accepts(&self, p: DVec2, rng: &mut dyn Rng) -> bool {
        let sample = self.field.sample(p);
        if !sample.admissible {
            return false;
        }
        let prob = self.curve.probability(sample.intensity).clamp(0.0, 1.0);
        prob > 0.0 && rand01(rng) < prob
    }

    /// Draws candidates until one is accepted. This is the resampling primitive shared with
    /// the redistributor.
    pub fn sample_one(&self, rng: &mut dyn Rng) -> Result<DVec2> {
        for _ in 0..self.attempt_budget {
            let candidate = uniform_point(&self.domain, rng);
            if self.accepts(candidate, rng) {
                return Ok(candidate);
            }
        }
        Err(Error::PlacementExhausted {
            placed: 0,
            target: 1,
            attempts: self.attempt_budget,
        })
    }

    /// Tests `count` candidates in parallel and returns the accepted ones in draw order.
    pub fn sample_batch(&self, count: usize, seed: u64) -> Vec<DVec2> {
        let tasks = count.div_ceil(TASK_SIZE);
        let accepted: Vec<Vec<DVec2>> = (0..tasks)
            .into_par_iter()
            .map(|task| {
                let mut rng = task_rng(seed, task as u64);
                let len = TASK_SIZE.min(count - task * TASK_SIZE);
                let mut out = Vec::new();
                for _ in 0..len {
                    let candidate = uniform_point(&self.domain, &mut rng);
                    if self.accepts(candidate, &mut rng) {
                        out.push(candidate);
                    }
                }
                out
            })
            .collect();
        accepted.into_iter().flatten().collect()
    }

    /// Collects exactly `target` accepted samples, drawing batches of `q` candidates until the
    /// target is met or `budget` candidates have been drawn.
    pub fn sample_exact(
        &self,
        target: usize,
        budget: u64,
        rng: &mut dyn Rng,
    ) -> Result<(Vec<DVec2>, PlacementStats)> {
        let mut points = Vec::with_capacity(target);
        let mut stats = PlacementStats::default();
        while points.len() < target {
            let remaining = budget.saturating_sub(stats.attempts);
            if remaining == 0 {
                return Err(Error::PlacementExhausted {
                    placed: points.len(),
                    target,
                    attempts: stats.attempts,
                });
            }
            let count = (self.batch_size as u64).min(remaining) as usize;
            let batch = self.sample_batch(count, rng.next_u64());
            stats.attempts += count as u64;
            stats.rounds += 1;
            let take = (target - points.len()).min(batch.len());
            points.extend_from_slice(&batch[..take]);
            debug!(
                "Placement round {}: {} of {} candidates accepted, {}/{} placed.",
                stats.rounds,
                batch.len(),
                count,
                points.len(),
                target
            );
        }
        stats.accepted = points.len();
        Ok((points, stats))
    }

    /// Generates the initial particle set of exactly `n_particles` positions.
    pub fn place(&self, rng: &mut dyn Rng) -> Result<(Vec<DVec2>, PlacementStats)> {
        let (points, stats) = self.sample_exact(self.n_particles, self.attempt_budget, rng)?;
        info!(
            "Placed {} particles in {} rounds ({} candidates, acceptance {:.4}).",
            stats.accepted,
            stats.rounds,
            stats.attempts,
            stats.acceptance_rate()
        );
        Ok((points, stats))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::density::ConstantCurve;
    use crate::testing::{flat_field, split_field, with_threads, DiskField};

    fn params(n: usize) -> Parameters {
        Parameters::new(n).with_bounds([0.0, 1.0], [0.0, 1.0])
    }

    fn placer(p: &Parameters, field: Arc<dyn DensityField>) -> ParticlePlacer {
        let domain = p.domain(1, 1).unwrap();
        ParticlePlacer::try_new(p, domain, field).unwrap()
    }

    #[test]
    fn place_returns_exact_count_inside_domain() {
        let p = params(100);
        let pl = placer(&p, flat_field(Domain::unit(), 255, 0.0));
        let mut rng = StdRng::seed_from_u64(1);
        let (points, stats) = pl.place(&mut rng).unwrap();
        assert_eq!(points.len(), 100);
        assert_eq!(stats.accepted, 100);
        assert!(points.iter().all(|&q| Domain::unit().contains(q)));
    }

    #[test]
    fn accept_all_field_is_roughly_uniform() {
        let p = params(400);
        let pl = placer(&p, flat_field(Domain::unit(), 255, 0.0));
        let mut rng = StdRng::seed_from_u64(3);
        let (points, _) = pl.place(&mut rng).unwrap();
        let mut quadrants = [0usize; 4];
        for q in &points {
            let i = (q.x >= 0.5) as usize + 2 * (q.y >= 0.5) as usize;
            quadrants[i] += 1;
        }
        for count in quadrants {
            assert!((60..=140).contains(&count), "quadrants {quadrants:?}");
        }
    }

    #[test]
    fn same_seed_reproduces_and_different_seed_differs() {
        let p = params(64);
        let pl = placer(&p, split_field(Domain::unit(), 40, 255));
        let a = pl.place(&mut StdRng::seed_from_u64(7)).unwrap().0;
        let b = pl.place(&mut StdRng::seed_from_u64(7)).unwrap().0;
        let c = pl.place(&mut StdRng::seed_from_u64(8)).unwrap().0;
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn result_does_not_depend_on_worker_count() {
        let p = params(300).with_multiplication_factor(10);
        let pl = placer(&p, split_field(Domain::unit(), 10, 200));
        let one = with_threads(1, || pl.place(&mut StdRng::seed_from_u64(21)).unwrap().0);
        let four = with_threads(4, || pl.place(&mut StdRng::seed_from_u64(21)).unwrap().0);
        assert_eq!(one, four);
    }

    #[test]
    fn brighter_regions_receive_more_particles() {
        let p = params(1000);
        // intensity 10/255 accepts with ~0.2, 255 with 1.0
        let pl = placer(&p, split_field(Domain::unit(), 10, 255));
        let (points, _) = pl.place(&mut StdRng::seed_from_u64(5)).unwrap();
        let right = points.iter().filter(|q| q.x >= 0.5).count();
        assert!(right > 750, "right half got {right} of 1000");
    }

    #[test]
    fn void_field_exhausts_placement() {
        let p = params(100).with_threshold(200.0);
        let pl = placer(&p, flat_field(Domain::unit(), 50, 200.0));
        let err = pl.place(&mut StdRng::seed_from_u64(1)).unwrap_err();
        match err {
            Error::PlacementExhausted {
                placed,
                target,
                attempts,
            } => {
                assert_eq!(placed, 0);
                assert_eq!(target, 100);
                assert_eq!(attempts, p.attempt_budget());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn sparse_field_never_returns_undersized_mesh() {
        let p = params(50).with_max_placement_attempts(500);
        let field = Arc::new(DiskField {
            center: DVec2::splat(0.5),
            radius: 0.05,
        });
        let pl = placer(&p, field);
        let err = pl.place(&mut StdRng::seed_from_u64(2)).unwrap_err();
        assert!(matches!(err, Error::PlacementExhausted { placed, .. } if placed < 50));
    }

    #[test]
    fn zero_probability_curve_exhausts() {
        let p = params(5).with_max_placement_attempts(1000);
        let pl =
            placer(&p, flat_field(Domain::unit(), 255, 0.0)).with_acceptance(ConstantCurve(0.0));
        assert!(pl.place(&mut StdRng::seed_from_u64(4)).is_err());
        assert!(pl.sample_one(&mut StdRng::seed_from_u64(4)).is_err());
    }

    #[test]
    fn sample_one_stays_in_admissible_region() {
        let p = params(10);
        let field = Arc::new(DiskField {
            center: DVec2::new(0.25, 0.75),
            radius: 0.2,
        });
        let pl = placer(&p, field);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let q = pl.sample_one(&mut rng).unwrap();
            assert!((q - DVec2::new(0.25, 0.75)).length() <= 0.2);
        }
    }

    #[test]
    fn stats_count_whole_batches() {
        let p = params(10).with_multiplication_factor(3);
        let pl = placer(&p, flat_field(Domain::unit(), 255, 0.0));
        let (_, stats) = pl.place(&mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(stats.rounds, 1);
        assert_eq!(stats.attempts, 30);
        assert!((stats.acceptance_rate() - 10.0 / 30.0).abs() < 1e-12);
    }
}
