//! Global contrast and brightness adjustment.

use image::RgbImage;

/// Apply `|alpha * v + beta|`, rounded and saturated to `u8`, to every sample.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn scale_abs(img: &RgbImage, alpha: f32, beta: f32) -> RgbImage {
    // Safe: v < 256
    let lut: [u8; 256] = std::array::from_fn(|v| scale_abs_value(v as u8, alpha, beta));

    let mut out = img.clone();
    for sample in out.iter_mut() {
        *sample = lut[*sample as usize];
    }
    out
}

/// The per-sample transform used by [`scale_abs`].
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scale_abs_value(value: u8, alpha: f32, beta: f32) -> u8 {
    alpha
        .mul_add(f32::from(value), beta)
        .abs()
        .round()
        .clamp(0.0, 255.0) as u8
}
