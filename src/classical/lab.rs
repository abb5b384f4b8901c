//! 8-bit CIE Lab conversion.
//!
//! Lab planes use the common 8-bit packing: `L` is scaled from [0, 100] to
//! [0, 255], `a` and `b` are offset by 128. Conversion goes through linear
//! sRGB with a D65 white point.

use image::{GrayImage, Luma, Rgb, RgbImage};
use palette::white_point::D65;
use palette::{IntoColor, Lab, LinSrgb, Srgb};

type LabD65 = Lab<D65, f32>;

/// Split an RGB image into 8-bit `L`, `a`, and `b` planes.
#[must_use]
pub fn split_lab(img: &RgbImage) -> [GrayImage; 3] {
    let (width, height) = img.dimensions();
    let mut planes = [
        GrayImage::new(width, height),
        GrayImage::new(width, height),
        GrayImage::new(width, height),
    ];

    for (x, y, pixel) in img.enumerate_pixels() {
        let lab = rgb_to_lab8(pixel.0);
        for (plane, value) in planes.iter_mut().zip(lab) {
            plane.put_pixel(x, y, Luma([value]));
        }
    }

    planes
}

/// Merge 8-bit `L`, `a`, and `b` planes back into an RGB image.
///
/// All three planes must share the same dimensions.
#[must_use]
pub fn merge_lab(l: &GrayImage, a: &GrayImage, b: &GrayImage) -> RgbImage {
    RgbImage::from_fn(l.width(), l.height(), |x, y| {
        Rgb(lab8_to_rgb([
            l.get_pixel(x, y)[0],
            a.get_pixel(x, y)[0],
            b.get_pixel(x, y)[0],
        ]))
    })
}

/// Convert one sRGB pixel to packed 8-bit Lab.
#[must_use]
pub fn rgb_to_lab8([r, g, b]: [u8; 3]) -> [u8; 3] {
    let srgb: Srgb<f32> = Srgb::new(r, g, b).into_format();
    let lin: LinSrgb<f32> = srgb.into_linear();
    let lab: LabD65 = lin.into_color();

    [
        quantize(lab.l * 255.0 / 100.0),
        quantize(lab.a + 128.0),
        quantize(lab.b + 128.0),
    ]
}

/// Convert one packed 8-bit Lab pixel back to sRGB.
#[must_use]
pub fn lab8_to_rgb([l, a, b]: [u8; 3]) -> [u8; 3] {
    let lab = LabD65::new(
        f32::from(l) * 100.0 / 255.0,
        f32::from(a) - 128.0,
        f32::from(b) - 128.0,
    );
    let lin: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(lin);

    [
        quantize(srgb.red * 255.0),
        quantize(srgb.green * 255.0),
        quantize(srgb.blue * 255.0),
    ]
}

#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
