//! Density field backed by decoded grayscale pixel data.
//!
//! Pixels are stored row-major with row 0 at the top of the image. The domain maps linearly
//! onto the pixel grid: `X_0` is the left edge and `Y_1` the top edge, so a mesh plotted with
//! y pointing up looks like the source image.
use glam::DVec2;

use super::{DensityField, DensitySample};
use crate::error::{Error, Result};
use crate::geometry::Domain;

/// A `width × height` intensity raster mapped onto a [`Domain`].
#[derive(Clone, Debug)]
pub struct ImageDensityField {
    width: usize,
    height: usize,
    /// Raw intensities in the decoder's native range.
    data: Vec<f64>,
    /// Raw value that maps to a normalized intensity of `1.0`.
    full_scale: f64,
    threshold: f64,
    domain: Domain,
}

impl ImageDensityField {
    /// Creates a field from raw intensities.
    ///
    /// `full_scale` is the largest value of the decoder's range (255 for 8-bit, 65535 for
    /// 16-bit, 1 for normalized input). `threshold` is expressed in the same raw units.
    pub fn try_new(
        width: usize,
        height: usize,
        data: Vec<f64>,
        full_scale: f64,
        threshold: f64,
        domain: Domain,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(format!(
                "density image must not be empty, got {width}x{height}"
            )));
        }
        if data.len() != width * height {
            return Err(Error::InvalidConfig(format!(
                "density image has {} values, expected {}x{} = {}",
                data.len(),
                width,
                height,
                width * height
            )));
        }
        if !full_scale.is_finite() || full_scale <= 0.0 {
            return Err(Error::InvalidConfig(
                "density image full scale must be > 0".into(),
            ));
        }
        if !threshold.is_finite() {
            return Err(Error::InvalidConfig("threshold must be finite".into()));
        }
        Ok(Self {
            width,
            height,
            data,
            full_scale,
            threshold,
            domain,
        })
    }

    /// Creates a field from 8-bit luminance pixels.
    pub fn from_luma8(
        width: usize,
        height: usize,
        pixels: &[u8],
        threshold: f64,
        domain: Domain,
    ) -> Result<Self> {
        let data = pixels.iter().map(|&v| v as f64).collect();
        Self::try_new(width, height, data, u8::MAX as f64, threshold, domain)
    }

    /// Creates a field from 16-bit luminance pixels.
    pub fn from_luma16(
        width: usize,
        height: usize,
        pixels: &[u16],
        threshold: f64,
        domain: Domain,
    ) -> Result<Self> {
        let data = pixels.iter().map(|&v| v as f64).collect();
        Self::try_new(width, height, data, u16::MAX as f64, threshold, domain)
    }

    /// Get the size of the raster as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Maps a domain position to `(column, row)`, or `None` outside the domain.
    ///
    /// Positions on the right or top edge resolve to the last column or first row.
    pub fn pixel_for(&self, p: DVec2) -> Option<(usize, usize)> {
        if !self.domain.contains(p) {
            return None;
        }
        let e = self.domain.extent();
        let u = (p.x - self.domain.min.x) / e.x;
        let v = (self.domain.max.y - p.y) / e.y;
        let col = ((u * self.width as f64).floor() as usize).min(self.width - 1);
        let row = ((v * self.height as f64).floor() as usize).min(self.height - 1);
        Some((col, row))
    }

    /// Raw intensity at a pixel, `None` outside the raster.
    pub fn raw(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// Sample a pixel directly.
    pub fn sample_pixel(&self, col: usize, row: usize) -> DensitySample {
        match self.raw(col, row) {
            Some(raw) => DensitySample::new(
                (raw / self.full_scale).clamp(0.0, 1.0),
                raw >= self.threshold,
            ),
            None => DensitySample::VOID,
        }
    }

    /// Fraction of pixels at or above the threshold.
    pub fn admissible_fraction(&self) -> f64 {
        let admissible = self.data.iter().filter(|&&v| v >= self.threshold).count();
        admissible as f64 / self.data.len() as f64
    }
}

impl DensityField for ImageDensityField {
    fn sample(&self, p: DVec2) -> DensitySample {
        match self.pixel_for(p) {
            Some((col, row)) => self.sample_pixel(col, row),
            None => DensitySample::VOID,
        }
    }

    fn admissibility_threshold(&self) -> Option<f64> {
        Some(self.threshold)
    }
}
