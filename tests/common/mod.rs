//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use nightlift::model::{LayerSpec, TOPOLOGY};
use rand::{rngs::StdRng, Rng, SeedableRng};
use safetensors::tensor::TensorView;
use safetensors::Dtype;

/// A noisy, dark RGB image.
pub fn dark_image(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(width, height, |x, _| {
        let base = (x % 32) as u8;
        Rgb([
            base + rng.random_range(0..8),
            base + rng.random_range(0..8),
            base / 2 + rng.random_range(0..8),
        ])
    })
}

/// Write a weights file for `topology`, taking every value from
/// `fill(layer, "kernel" | "bias", flat_index)`.
pub fn write_weights_with(
    path: &Path,
    topology: &[LayerSpec],
    mut fill: impl FnMut(&LayerSpec, &str, usize) -> f32,
) {
    let mut buffers = Vec::new();
    for spec in topology {
        let kernel_len: usize = spec.kernel_shape().iter().product();
        let kernel: Vec<u8> = (0..kernel_len)
            .flat_map(|i| fill(spec, "kernel", i).to_le_bytes())
            .collect();
        let biases: Vec<u8> = (0..spec.out_channels)
            .flat_map(|i| fill(spec, "bias", i).to_le_bytes())
            .collect();
        buffers.push((spec.kernel_name(), spec.kernel_shape().to_vec(), kernel));
        buffers.push((spec.bias_name(), vec![spec.out_channels], biases));
    }

    let views: Vec<(String, TensorView<'_>)> = buffers
        .iter()
        .map(|(name, shape, data)| {
            let view = TensorView::new(Dtype::F32, shape.clone(), data).unwrap();
            (name.clone(), view)
        })
        .collect();

    let bytes = safetensors::serialize(views, &None).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// Write a weights file for `topology` where every kernel is zero and every
/// bias equals `bias`.
///
/// With the real topology and `bias = 0.0` the network outputs 0.5 for every
/// sample, which decodes to a uniform gray of 127.
pub fn write_weights(path: &Path, topology: &[LayerSpec], bias: f32) {
    write_weights_with(path, topology, |spec, kind, _| if kind == "bias" { bias } else { 0.0 });
}

/// Weights for the real network that carry each RGB channel straight
/// through the centre taps, so the output is `sigmoid(4 * v - 2)` per sample
/// and follows the input.
pub fn write_passthrough_weights(path: &Path) {
    write_weights_with(path, &TOPOLOGY, |spec, kind, i| {
        let c = spec.kernel / 2;
        let centre = |ch: usize| ((c * spec.kernel + c) * spec.in_channels + ch) * spec.out_channels + ch;
        match kind {
            "kernel" if (0..3).any(|ch| i == centre(ch)) => {
                if spec.name == "conv4" {
                    4.0
                } else {
                    1.0
                }
            }
            "bias" if spec.name == "conv4" => -2.0,
            _ => 0.0,
        }
    });
}

/// Weights for the real network.
pub fn write_valid_weights(path: &Path) {
    write_weights(path, &TOPOLOGY, 0.0);
}

/// JPEG bytes of `img` with an EXIF APP1 segment carrying `orientation`.
pub fn jpeg_with_orientation(img: &RgbImage, orientation: u8) -> Vec<u8> {
    let mut jpeg = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, 95))
        .unwrap();

    // Big-endian TIFF header, one IFD entry: Orientation (0x0112), SHORT, count 1.
    let mut tiff = b"MM\x00\x2a\x00\x00\x00\x08\x00\x01".to_vec();
    tiff.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    tiff.extend_from_slice(&[0x00, orientation, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let mut app1 = b"Exif\x00\x00".to_vec();
    app1.extend_from_slice(&tiff);
    let len = u16::try_from(app1.len() + 2).unwrap();

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xff, 0xe1]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}
