//! Uniform cell grid over the domain for neighbour queries.
//!
//! [`DomainGrid`] partitions the domain into `nx × ny` cells of at least the requested
//! spacing. Each cell stores the indices of the particles it currently holds and a precomputed
//! list of its 8-connected neighbours, wrapped across periodic axes and truncated at
//! non-periodic ones.
use glam::DVec2;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::geometry::Domain;

/// Upper bound on the number of cells a grid may allocate.
pub const MAX_CELLS: usize = 1 << 24;

/// Cell grid with per-cell particle lists.
#[derive(Clone, Debug)]
pub struct DomainGrid {
    domain: Domain,
    nx: usize,
    ny: usize,
    cell_size: DVec2,
    neighbours: Vec<Vec<usize>>,
    cells: Vec<Vec<usize>>,
}

impl DomainGrid {
    /// Builds an empty grid whose cells are at least `spacing` wide on both axes.
    pub fn build(domain: Domain, spacing: f64) -> Result<Self> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "grid spacing must be > 0, got {spacing}"
            )));
        }
        let extent = domain.extent();
        let nx = ((extent.x / spacing).floor() as usize).max(1);
        let ny = ((extent.y / spacing).floor() as usize).max(1);
        if nx.saturating_mul(ny) > MAX_CELLS {
            return Err(Error::InvalidConfig(format!(
                "grid spacing {spacing} yields {nx}x{ny} cells, more than {MAX_CELLS}"
            )));
        }
        let cell_size = DVec2::new(extent.x / nx as f64, extent.y / ny as f64);

        let mut neighbours = Vec::with_capacity(nx * ny);
        for iy in 0..ny {
            for ix in 0..nx {
                neighbours.push(cell_neighbours(ix, iy, nx, ny, &domain));
            }
        }

        Ok(Self {
            domain,
            nx,
            ny,
            cell_size,
            neighbours,
            cells: vec![Vec::new(); nx * ny],
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Number of cells along `(x, y)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Actual cell size `(gridSpacing_x, gridSpacing_y)`.
    pub fn cell_size(&self) -> DVec2 {
        self.cell_size
    }

    /// Cell coordinates for a position.
    ///
    /// Floor division of the offset from `(X_0, Y_0)`. A position exactly on a boundary between
    /// two cells belongs to the lower-indexed one, so the upper domain edge resolves to the last
    /// cell. Positions outside the domain clamp to the nearest border cell.
    #[inline]
    pub fn cell_coords(&self, p: DVec2) -> (usize, usize) {
        let rel = (p - self.domain.min) / self.cell_size;
        (axis_cell(rel.x, self.nx), axis_cell(rel.y, self.ny))
    }

    /// Row-major cell id for a position.
    #[inline]
    pub fn find_grid_id(&self, p: DVec2) -> usize {
        let (ix, iy) = self.cell_coords(p);
        iy * self.nx + ix
    }

    /// 8-connected neighbours of a cell, without the cell itself and without duplicates.
    #[inline]
    pub fn neighbours(&self, cell: usize) -> &[usize] {
        &self.neighbours[cell]
    }

    /// The cell followed by its neighbours.
    pub fn neighbourhood(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(cell).chain(self.neighbours[cell].iter().copied())
    }

    /// Particle indices currently mapped to a cell.
    #[inline]
    pub fn particles_in_cell(&self, cell: usize) -> &[usize] {
        &self.cells[cell]
    }

    /// Per-cell particle lists, indexed by cell id.
    pub fn cells(&self) -> &[Vec<usize>] {
        &self.cells
    }

    /// Rebuilds every cell list from scratch.
    ///
    /// Cell ids are computed in parallel; the lists are then filled in index order, so each
    /// list is sorted and the lists partition `0..positions.len()`.
    pub fn map_particles_to_grid(&mut self, positions: &[DVec2]) {
        let ids: Vec<usize> = positions
            .par_iter()
            .map(|&p| self.find_grid_id(p))
            .collect();
        for cell in &mut self.cells {
            cell.clear();
        }
        for (i, id) in ids.into_iter().enumerate() {
            self.cells[id].push(i);
        }
    }

    /// Number of particles in each cell's 3×3 neighbourhood, indexed by cell id.
    pub fn neighbourhood_counts(&self) -> Vec<usize> {
        (0..self.cells.len())
            .into_par_iter()
            .map(|c| self.neighbourhood(c).map(|n| self.cells[n].len()).sum())
            .collect()
    }

    /// Nearest mapped particle to `p` within the 3×3 neighbourhood of its cell, using
    /// minimum-image distances. Ties resolve to the lower particle index.
    pub fn nearest_particle(&self, p: DVec2, positions: &[DVec2]) -> Option<usize> {
        let cell = self.find_grid_id(p);
        let mut best: Option<(f64, usize)> = None;
        for n in self.neighbourhood(cell) {
            for &i in &self.cells[n] {
                let d2 = self.domain.distance_squared(p, positions[i]);
                let closer = match best {
                    None => true,
                    Some((bd, bi)) => d2 < bd || (d2 == bd && i < bi),
                };
                if closer {
                    best = Some((d2, i));
                }
            }
        }
        best.map(|(_, i)| i)
    }
}

fn cell_neighbours(ix: usize, iy: usize, nx: usize, ny: usize, domain: &Domain) -> Vec<usize> {
    let own = iy * nx + ix;
    let mut out = Vec::with_capacity(8);
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let Some(jx) = wrap_index(ix as isize + dx, nx, domain.periodic_x) else {
                continue;
            };
            let Some(jy) = wrap_index(iy as isize + dy, ny, domain.periodic_y) else {
                continue;
            };
            let id = jy * nx + jx;
            if id != own {
                out.push(id);
            }
        }
    }
    // narrow periodic grids reach the same cell from both sides
    out.sort_unstable();
    out.dedup();
    out
}

#[inline]
fn wrap_index(i: isize, n: usize, periodic: bool) -> Option<usize> {
    if (0..n as isize).contains(&i) {
        Some(i as usize)
    } else if periodic {
        Some(i.rem_euclid(n as isize) as usize)
    } else {
        None
    }
}

fn axis_cell(rel: f64, n: usize) -> usize {
    let floor = rel.floor();
    let cell = if floor == rel { floor - 1.0 } else { floor };
    (cell.max(0.0) as usize).min(n - 1)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::sampling::uniform_point;

    fn domain(periodic_x: bool, periodic_y: bool) -> Domain {
        Domain::try_new(DVec2::ZERO, DVec2::new(2.0, 1.0), periodic_x, periodic_y).unwrap()
    }

    #[test]
    fn build_sizes_cells_to_at_least_spacing() {
        let g = DomainGrid::build(domain(false, false), 0.3).unwrap();
        assert_eq!(g.dims(), (6, 3));
        assert!(g.cell_size().x >= 0.3 && g.cell_size().y >= 0.3);
        assert_eq!(g.cell_count(), 18);

        let coarse = DomainGrid::build(domain(false, false), 5.0).unwrap();
        assert_eq!(coarse.dims(), (1, 1));
        assert!(coarse.neighbours(0).is_empty());
    }

    #[test]
    fn build_rejects_invalid_spacing() {
        assert!(DomainGrid::build(domain(false, false), 0.0).is_err());
        assert!(DomainGrid::build(domain(false, false), f64::NAN).is_err());
        assert!(DomainGrid::build(domain(false, false), 1e-9).is_err());
    }

    #[test]
    fn neighbours_are_truncated_on_open_axes() {
        let g = DomainGrid::build(domain(false, false), 0.25).unwrap();
        let (nx, _) = g.dims();
        assert_eq!(g.neighbours(0).len(), 3);
        assert_eq!(g.neighbours(nx + 1).len(), 8);
        assert_eq!(g.neighbours(1).len(), 5);
    }

    #[test]
    fn neighbours_wrap_on_periodic_axes() {
        let g = DomainGrid::build(domain(true, true), 0.25).unwrap();
        let (nx, ny) = g.dims();
        let corner = g.neighbours(0);
        assert_eq!(corner.len(), 8);
        assert!(corner.contains(&(nx - 1)));
        assert!(corner.contains(&((ny - 1) * nx)));
        assert!(corner.contains(&(ny * nx - 1)));

        let half = DomainGrid::build(domain(true, false), 0.25).unwrap();
        assert_eq!(half.neighbours(0).len(), 5);
    }

    #[test]
    fn narrow_periodic_grid_has_no_duplicate_neighbours() {
        let g = DomainGrid::build(domain(true, true), 0.9).unwrap();
        assert_eq!(g.dims(), (2, 1));
        assert_eq!(g.neighbours(0), &[1]);
        assert_eq!(g.neighbours(1), &[0]);
    }

    #[test]
    fn find_grid_id_resolves_boundary_ties_to_lower_cell() {
        let g = DomainGrid::build(domain(false, false), 0.5).unwrap();
        assert_eq!(g.dims(), (4, 2));
        assert_eq!(g.find_grid_id(DVec2::new(0.0, 0.0)), 0);
        assert_eq!(g.find_grid_id(DVec2::new(0.49, 0.2)), 0);
        assert_eq!(g.find_grid_id(DVec2::new(0.5, 0.2)), 0);
        assert_eq!(g.find_grid_id(DVec2::new(0.51, 0.2)), 1);
        assert_eq!(g.find_grid_id(DVec2::new(0.7, 0.5)), 1);
        assert_eq!(g.find_grid_id(DVec2::new(2.0, 1.0)), 7);
        assert_eq!(g.find_grid_id(DVec2::new(1.2, 0.7)), 6);
    }

    #[test]
    fn rebuild_partitions_index_set() {
        let d = domain(true, false);
        let mut g = DomainGrid::build(d, 0.1).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for round in 0..3 {
            let positions: Vec<DVec2> = (0..500 + round * 50)
                .map(|_| uniform_point(&d, &mut rng))
                .collect();
            g.map_particles_to_grid(&positions);

            let mut seen: Vec<usize> = g.cells().iter().flatten().copied().collect();
            seen.sort_unstable();
            let expected: Vec<usize> = (0..positions.len()).collect();
            assert_eq!(seen, expected);

            for (cell, members) in g.cells().iter().enumerate() {
                for &i in members {
                    assert_eq!(g.find_grid_id(positions[i]), cell);
                }
            }
        }
    }

    #[test]
    fn neighbourhood_counts_sum_cell_and_neighbours() {
        let d = domain(false, false);
        let mut g = DomainGrid::build(d, 0.5).unwrap();
        let positions = vec![
            DVec2::new(0.1, 0.1),
            DVec2::new(0.2, 0.1),
            DVec2::new(0.6, 0.1),
            DVec2::new(1.9, 0.9),
        ];
        g.map_particles_to_grid(&positions);
        let counts = g.neighbourhood_counts();
        assert_eq!(counts[0], 3);
        assert_eq!(counts[1], 3);
        assert_eq!(counts[2], 2);
        assert_eq!(counts[7], 1);
        assert_eq!(counts[3], 1);
    }

    #[test]
    fn nearest_particle_honours_minimum_image() {
        let d = domain(true, false);
        let mut g = DomainGrid::build(d, 0.5).unwrap();
        let positions = vec![DVec2::new(1.95, 0.5), DVec2::new(0.6, 0.5)];
        g.map_particles_to_grid(&positions);
        assert_eq!(g.nearest_particle(DVec2::new(0.05, 0.5), &positions), Some(0));
        assert_eq!(g.nearest_particle(DVec2::new(0.55, 0.5), &positions), Some(1));
        // column 2 spans x in (1.0, 1.5]; columns 1 to 3 hold no particle
        let empty = vec![DVec2::new(0.1, 0.5)];
        g.map_particles_to_grid(&empty);
        assert_eq!(g.nearest_particle(DVec2::new(1.25, 0.5), &empty), None);
    }
}
