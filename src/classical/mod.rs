//! Classical low-light enhancement.
//!
//! A fixed, deterministic filter chain:
//!
//! 1. RGB to 8-bit Lab
//! 2. CLAHE on the `L` plane only
//! 3. Lab back to RGB
//! 4. Global contrast/brightness: `|alpha * v + beta|`, saturated
//! 5. Bilateral filter for noise reduction
//!
//! [`enhance`] never fails. If the chain cannot run it returns the input
//! unchanged and logs a warning.

mod bilateral;
mod clahe;
mod lab;
mod tone;

pub use bilateral::filter as bilateral_filter;
pub use clahe::equalize as clahe_equalize;
pub use lab::{lab8_to_rgb, merge_lab, rgb_to_lab8, split_lab};
pub use tone::{scale_abs, scale_abs_value};

use image::RgbImage;

use crate::error::{Error, Result};

/// Constants governing the classical filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicalParams {
    /// CLAHE clip limit, relative to a uniform histogram.
    pub clip_limit: f32,

    /// CLAHE tile grid (columns, rows).
    pub tile_grid: (u32, u32),

    /// Contrast factor.
    pub alpha: f32,

    /// Brightness offset.
    pub beta: f32,

    /// Bilateral filter window diameter in pixels.
    pub bilateral_diameter: u32,

    /// Bilateral range sigma.
    pub sigma_color: f32,

    /// Bilateral spatial sigma.
    pub sigma_space: f32,
}

impl Default for ClassicalParams {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tile_grid: (8, 8),
            alpha: 1.2,
            beta: 20.0,
            bilateral_diameter: 9,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

impl ClassicalParams {
    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !(self.clip_limit.is_finite() && self.clip_limit > 0.0) {
            return Err(Error::InvalidParameter {
                name: "clip_limit".to_string(),
                reason: "must be a positive number".to_string(),
            });
        }

        if self.tile_grid.0 == 0 || self.tile_grid.1 == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_grid".to_string(),
                reason: "must have at least one tile in each direction".to_string(),
            });
        }

        if !(self.alpha.is_finite() && self.beta.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "alpha/beta".to_string(),
                reason: "must be finite".to_string(),
            });
        }

        if !(self.sigma_color > 0.0 && self.sigma_space > 0.0) {
            return Err(Error::InvalidParameter {
                name: "sigma".to_string(),
                reason: "bilateral sigmas must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// Enhance `image` with the default parameters.
///
/// Output dimensions always equal input dimensions.
#[must_use]
pub fn enhance(image: &RgbImage) -> RgbImage {
    enhance_with(image, &ClassicalParams::default())
}

/// Enhance `image` with explicit parameters, degrading to a copy of the
/// input if the filter chain cannot run.
#[must_use]
pub fn enhance_with(image: &RgbImage, params: &ClassicalParams) -> RgbImage {
    match try_enhance(image, params) {
        Ok(enhanced) => enhanced,
        Err(err) => {
            tracing::warn!("Classical enhancement failed, keeping original image: {err}");
            image.clone()
        }
    }
}

/// Run the classical filter chain.
///
/// # Errors
///
/// Returns an error for an empty image or invalid parameters.
pub fn try_enhance(image: &RgbImage, params: &ClassicalParams) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: "image has no pixels".to_string(),
        });
    }

    params.validate()?;

    tracing::debug!("Equalizing luminance ({width}x{height})");
    let [l, a, b] = split_lab(image);
    let l = clahe_equalize(&l, params.clip_limit, params.tile_grid);
    let equalized = merge_lab(&l, &a, &b);

    tracing::debug!("Adjusting contrast and brightness");
    let adjusted = scale_abs(&equalized, params.alpha, params.beta);

    tracing::debug!("Reducing noise");
    Ok(bilateral_filter(
        &adjusted,
        params.bilateral_diameter,
        params.sigma_color,
        params.sigma_space,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn dark_scene(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 3) % 40) as u8;
            Rgb([v, v / 2 + 5, v / 3])
        })
    }

    #[test]
    fn test_preserves_dimensions() {
        for (w, h) in [(64, 48), (33, 17), (1, 1), (400, 300)] {
            let out = enhance(&dark_scene(w, h));
            assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn test_brightens_dark_image() {
        let img = dark_scene(80, 60);
        let out = enhance(&img);

        let mean = |i: &RgbImage| i.iter().map(|&v| u64::from(v)).sum::<u64>() / i.len() as u64;
        assert!(mean(&out) > mean(&img));
    }

    #[test]
    fn test_is_deterministic() {
        let img = dark_scene(50, 40);
        assert_eq!(enhance(&img), enhance(&img));
    }

    #[test]
    fn test_empty_image_is_returned_unchanged() {
        let img = RgbImage::new(0, 0);
        assert!(try_enhance(&img, &ClassicalParams::default()).is_err());
        assert_eq!(enhance(&img), img);
    }

    #[test]
    fn test_invalid_params_degrade_to_input() {
        let img = dark_scene(16, 16);
        let params = ClassicalParams {
            tile_grid: (0, 8),
            ..ClassicalParams::default()
        };
        assert!(matches!(
            try_enhance(&img, &params),
            Err(Error::InvalidParameter { .. })
        ));
        assert_eq!(enhance_with(&img, &params), img);
    }
}
