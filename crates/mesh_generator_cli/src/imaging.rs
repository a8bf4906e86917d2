//! Density image decoding and mesh rendering.
use std::path::Path;

use anyhow::{Context, Result};
use glam::DVec2;
use image::{DynamicImage, Rgb, RgbImage};
use mesh_generator::prelude::{DensityField, Domain, ImageDensityField, Parameters};

const DOT_COLOR: Rgb<u8> = Rgb([220, 32, 32]);

/// Decodes the density image and maps it onto the configured domain.
///
/// 16-bit images keep their full range; everything else is reduced to 8-bit luminance. The
/// threshold is interpreted in the same units as the decoded pixels.
pub fn load_density_field(path: &Path, params: &Parameters) -> Result<ImageDensityField> {
    let img = image::open(path)
        .with_context(|| format!("failed to read density image '{}'", path.display()))?;
    field_from_image(&img, params)
}

pub fn field_from_image(img: &DynamicImage, params: &Parameters) -> Result<ImageDensityField> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let domain = params.domain(width, height)?;
    let field = match img {
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => {
            let luma = img.to_luma16();
            ImageDensityField::from_luma16(width, height, luma.as_raw(), params.threshold, domain)?
        }
        _ => {
            let luma = img.to_luma8();
            ImageDensityField::from_luma8(width, height, luma.as_raw(), params.threshold, domain)?
        }
    };
    Ok(field)
}

/// Output image size with `resolution` pixels along the longer domain side.
pub fn render_size(domain: &Domain, resolution: u32) -> (u32, u32) {
    let extent = domain.extent();
    let scale = resolution as f64 / extent.max_element();
    let w = ((extent.x * scale).round() as u32).max(1);
    let h = ((extent.y * scale).round() as u32).max(1);
    (w, h)
}

/// Renders the density field in grayscale with every particle stamped as a dot.
pub fn render_mesh(field: &ImageDensityField, positions: &[DVec2], resolution: u32) -> RgbImage {
    let domain = *field.domain();
    let (w, h) = render_size(&domain, resolution);
    let extent = domain.extent();
    let to_domain = |x: u32, y: u32| {
        DVec2::new(
            domain.min.x + (x as f64 + 0.5) / w as f64 * extent.x,
            domain.max.y - (y as f64 + 0.5) / h as f64 * extent.y,
        )
    };

    let mut img = RgbImage::from_fn(w, h, |x, y| {
        let v = (field.sample(to_domain(x, y)).intensity * 255.0).round() as u8;
        Rgb([v, v, v])
    });

    let radius = (resolution / 1000).max(1) as i64;
    for p in positions {
        let cx = ((p.x - domain.min.x) / extent.x * w as f64) as i64;
        let cy = ((domain.max.y - p.y) / extent.y * h as f64) as i64;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let (x, y) = (cx + dx, cy + dy);
                if (0..w as i64).contains(&x) && (0..h as i64).contains(&y) {
                    img.put_pixel(x as u32, y as u32, DOT_COLOR);
                }
            }
        }
    }
    img
}

/// Renders and writes a PNG.
pub fn save_mesh_png(
    field: &ImageDensityField,
    positions: &[DVec2],
    resolution: u32,
    path: &Path,
) -> Result<()> {
    render_mesh(field, positions, resolution)
        .save(path)
        .with_context(|| format!("failed to write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, ImageBuffer, Luma};

    use super::*;

    #[test]
    fn eight_bit_image_uses_eight_bit_range() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 2, Luma([51u8])));
        let params = Parameters::new(10).with_threshold(50.0);
        let field = field_from_image(&img, &params).unwrap();
        assert_eq!(field.size(), (4, 2));
        assert_eq!(field.domain().max, DVec2::new(1.0, 0.5));
        let s = field.sample(DVec2::new(0.5, 0.25));
        assert!(s.admissible);
        assert!((s.intensity - 0.2).abs() < 1e-12);
    }

    #[test]
    fn sixteen_bit_image_keeps_full_range() {
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(2, 2, Luma([1000]));
        let img = DynamicImage::ImageLuma16(buf);
        let params = Parameters::new(10).with_threshold(999.0);
        let field = field_from_image(&img, &params).unwrap();
        let s = field.sample(DVec2::new(0.5, 0.5));
        assert!(s.admissible);
        assert!((s.intensity - 1000.0 / 65535.0).abs() < 1e-12);
    }

    #[test]
    fn render_size_follows_longer_side() {
        let d = Domain::from_image_aspect(300, 150, false, false).unwrap();
        assert_eq!(render_size(&d, 600), (600, 300));
        let tall = Domain::from_image_aspect(100, 400, false, false).unwrap();
        assert_eq!(render_size(&tall, 800), (200, 800));
    }

    #[test]
    fn particles_are_stamped_in_image_orientation() {
        let domain = Domain::unit();
        let field = ImageDensityField::from_luma8(1, 1, &[0], 0.0, domain).unwrap();
        let img = render_mesh(&field, &[DVec2::new(0.05, 0.95)], 100);
        assert_eq!(img.dimensions(), (100, 100));
        assert_eq!(*img.get_pixel(5, 5), DOT_COLOR);
        assert_eq!(*img.get_pixel(95, 95), Rgb([0, 0, 0]));
    }

    #[test]
    fn missing_image_is_an_error() {
        let err = load_density_field(Path::new("/nonexistent/img.png"), &Parameters::new(1));
        assert!(err.is_err());
    }
}
