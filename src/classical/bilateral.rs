//! Edge-preserving bilateral smoothing for RGB images.

use image::{Rgb, RgbImage};

use super::clahe::reflect_101;

/// Smooth `img` with a bilateral filter.
///
/// Each output pixel is the average of the pixels inside a disc of diameter
/// `diameter`, weighted by a spatial Gaussian (`sigma_space`) and by a range
/// Gaussian over the L1 color distance to the centre pixel (`sigma_color`).
/// Borders are mirrored.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
pub fn filter(img: &RgbImage, diameter: u32, sigma_color: f32, sigma_space: f32) -> RgbImage {
    let (width, height) = img.dimensions();
    let radius = (diameter / 2).max(1) as i64;

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    // Indexed by summed absolute channel difference (0..=765).
    let color_weight: Vec<f32> = (0..256 * 3)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    let mut taps = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r = ((dx * dx + dy * dy) as f32).sqrt();
            if r > radius as f32 {
                continue;
            }
            taps.push((dx, dy, (r * r * space_coeff).exp()));
        }
    }

    // Safe: coordinates stay within radius of the image, far below u32::MAX
    let sample = |x: i64, y: i64| -> Rgb<u8> {
        let sx = reflect_101(x.unsigned_abs() as u32, width);
        let sy = reflect_101(y.unsigned_abs() as u32, height);
        *img.get_pixel(sx, sy)
    };

    RgbImage::from_fn(width, height, |x, y| {
        let centre = img.get_pixel(x, y);
        let mut sum = [0.0f32; 3];
        let mut wsum = 0.0f32;

        for &(dx, dy, space_w) in &taps {
            let px = sample(i64::from(x) + dx, i64::from(y) + dy);
            let dist: usize = (0..3).map(|c| px[c].abs_diff(centre[c]) as usize).sum();
            let w = space_w * color_weight[dist];
            for (acc, &v) in sum.iter_mut().zip(px.0.iter()) {
                *acc = f32::from(v).mul_add(w, *acc);
            }
            wsum += w;
        }

        Rgb(sum.map(|s| (s / wsum).round().clamp(0.0, 255.0) as u8))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_image_stays_flat() {
        let img = RgbImage::from_pixel(20, 12, Rgb([90, 60, 30]));
        let out = filter(&img, 9, 75.0, 75.0);

        assert_eq!(out.dimensions(), (20, 12));
        assert!(out.pixels().all(|p| p.0 == [90, 60, 30]));
    }

    #[test]
    fn test_strong_edge_is_preserved() {
        let img = RgbImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let out = filter(&img, 9, 75.0, 75.0);

        // The L1 distance across the edge is 765, so its range weight is ~0.
        assert_eq!(out.get_pixel(9, 5).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(10, 5).0, [255, 255, 255]);
    }

    #[test]
    fn test_isolated_noise_is_reduced() {
        let mut img = RgbImage::from_pixel(15, 15, Rgb([100, 100, 100]));
        img.put_pixel(7, 7, Rgb([130, 130, 130]));
        let out = filter(&img, 9, 75.0, 75.0);

        let centre = out.get_pixel(7, 7)[0];
        assert!(centre < 130 && centre >= 100, "got {centre}");
    }

    #[test]
    fn test_tiny_images() {
        let img = RgbImage::from_pixel(1, 1, Rgb([7, 8, 9]));
        assert_eq!(filter(&img, 9, 75.0, 75.0).get_pixel(0, 0).0, [7, 8, 9]);

        let img = RgbImage::from_fn(2, 3, |x, y| Rgb([(x * 100) as u8, (y * 50) as u8, 0]));
        assert_eq!(filter(&img, 9, 75.0, 75.0).dimensions(), (2, 3));
    }
}
