//! Rectangular simulation domain with optional periodic axes.
//!
//! [`Domain`] owns the bounds `[X_0, X_1] × [Y_0, Y_1]` and the scalar helpers every other
//! component relies on: boundary repair ([`Domain::check_boundaries`]) and minimum-image
//! separation ([`Domain::minimum_image`]).
use glam::DVec2;

use crate::error::{Error, Result};

/// Axis-aligned domain with per-axis periodicity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    /// Lower-left corner `(X_0, Y_0)`.
    pub min: DVec2,
    /// Upper-right corner `(X_1, Y_1)`.
    pub max: DVec2,
    /// Wrap coordinates and distances along x.
    pub periodic_x: bool,
    /// Wrap coordinates and distances along y.
    pub periodic_y: bool,
}

impl Domain {
    /// Creates a validated domain. Bounds must be finite with `min < max` on both axes.
    pub fn try_new(min: DVec2, max: DVec2, periodic_x: bool, periodic_y: bool) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(Error::InvalidConfig("domain bounds must be finite".into()));
        }
        if min.x >= max.x || min.y >= max.y {
            return Err(Error::InvalidConfig(format!(
                "domain bounds must satisfy X_0 < X_1 and Y_0 < Y_1, got [{}, {}] x [{}, {}]",
                min.x, max.x, min.y, max.y
            )));
        }
        Ok(Self {
            min,
            max,
            periodic_x,
            periodic_y,
        })
    }

    /// Non-periodic unit square `[0, 1] × [0, 1]`.
    pub fn unit() -> Self {
        Self {
            min: DVec2::ZERO,
            max: DVec2::ONE,
            periodic_x: false,
            periodic_y: false,
        }
    }

    /// Domain anchored at the origin whose longer side spans `[0, 1]` and whose shorter side
    /// keeps the aspect ratio of a `width × height` image.
    pub fn from_image_aspect(
        width: usize,
        height: usize,
        periodic_x: bool,
        periodic_y: bool,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(format!(
                "image must not be empty, got {width}x{height}"
            )));
        }
        let longest = width.max(height) as f64;
        Self::try_new(
            DVec2::ZERO,
            DVec2::new(width as f64 / longest, height as f64 / longest),
            periodic_x,
            periodic_y,
        )
    }

    /// Side lengths `(X_1 - X_0, Y_1 - Y_0)`.
    #[inline]
    pub fn extent(&self) -> DVec2 {
        self.max - self.min
    }

    #[inline]
    pub fn area(&self) -> f64 {
        let e = self.extent();
        e.x * e.y
    }

    /// Half the length of the domain diagonal; the upper bound of any minimum-image distance.
    #[inline]
    pub fn half_diagonal(&self) -> f64 {
        0.5 * self.extent().length()
    }

    /// Returns `true` when `p` lies inside the closed domain rectangle.
    #[inline]
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Repairs a coordinate that left the domain.
    ///
    /// Periodic axes wrap modulo the extent into `[X_0, X_1)`; non-periodic axes clamp into
    /// `[X_0, X_1]`.
    #[inline]
    pub fn check_boundaries(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            wrap_or_clamp(p.x, self.min.x, self.max.x, self.periodic_x),
            wrap_or_clamp(p.y, self.min.y, self.max.y, self.periodic_y),
        )
    }

    /// Reduces a separation vector to its shortest periodic image on periodic axes.
    #[inline]
    pub fn minimum_image(&self, mut delta: DVec2) -> DVec2 {
        let e = self.extent();
        if self.periodic_x {
            delta.x -= e.x * (delta.x / e.x).round();
        }
        if self.periodic_y {
            delta.y -= e.y * (delta.y / e.y).round();
        }
        delta
    }

    /// Minimum-image separation vector pointing from `a` to `b`.
    #[inline]
    pub fn separation(&self, a: DVec2, b: DVec2) -> DVec2 {
        self.minimum_image(b - a)
    }

    #[inline]
    pub fn distance_squared(&self, a: DVec2, b: DVec2) -> f64 {
        self.separation(a, b).length_squared()
    }

    #[inline]
    pub fn distance(&self, a: DVec2, b: DVec2) -> f64 {
        self.separation(a, b).length()
    }
}

#[inline]
fn wrap_or_clamp(v: f64, lo: f64, hi: f64, periodic: bool) -> f64 {
    if periodic {
        let wrapped = lo + (v - lo).rem_euclid(hi - lo);
        // rem_euclid may round up to the full extent for tiny negative offsets
        if wrapped >= hi {
            lo
        } else {
            wrapped
        }
    } else {
        v.clamp(lo, hi)
    }
}
