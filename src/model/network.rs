//! Fixed-topology convolutional enhancement network.
//!
//! Four "same"-padded convolutions over an NHWC tensor:
//!
//! | layer | kernel | channels | activation |
//! |-------|--------|----------|------------|
//! | conv1 | 3x3    | 3 -> 32  | ReLU       |
//! | conv2 | 3x3    | 32 -> 32 | ReLU       |
//! | conv3 | 5x5    | 32 -> 32 | ReLU       |
//! | conv4 | 3x3    | 32 -> 3  | sigmoid    |
//!
//! Weights are read from a safetensors file holding `<layer>.kernel` in
//! `(kh, kw, in, out)` layout and `<layer>.bias` of length `out`.

use std::path::Path;

use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{s, Array1, Array2, Array3, ArrayView3, Axis};
use safetensors::SafeTensors;

use crate::error::{Error, Result};
use crate::image::{
    image_to_tensor, restore_dimensions, tensor_to_image, ImageTensor, MODEL_IMAGE_SIZE,
    RGB_CHANNELS,
};

use super::loader::{f32_tensor, parse_weights, read_weights};

/// Nonlinearity applied after a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// `max(0, x)`
    Relu,
    /// `1 / (1 + e^-x)`
    Sigmoid,
}

impl Activation {
    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Self::Relu => x.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

/// Static description of one convolution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSpec {
    /// Tensor name prefix in the weights file.
    pub name: &'static str,
    /// Square kernel side length (odd).
    pub kernel: usize,
    /// Input channels.
    pub in_channels: usize,
    /// Output channels (filters).
    pub out_channels: usize,
    /// Activation applied to the output.
    pub activation: Activation,
}

impl LayerSpec {
    /// Expected shape of `<name>.kernel`.
    #[must_use]
    pub const fn kernel_shape(&self) -> [usize; 4] {
        [self.kernel, self.kernel, self.in_channels, self.out_channels]
    }

    /// Tensor name of the kernel.
    #[must_use]
    pub fn kernel_name(&self) -> String {
        format!("{}.kernel", self.name)
    }

    /// Tensor name of the bias.
    #[must_use]
    pub fn bias_name(&self) -> String {
        format!("{}.bias", self.name)
    }
}

/// The network topology, input to output.
pub const TOPOLOGY: [LayerSpec; 4] = [
    LayerSpec {
        name: "conv1",
        kernel: 3,
        in_channels: RGB_CHANNELS,
        out_channels: 32,
        activation: Activation::Relu,
    },
    LayerSpec {
        name: "conv2",
        kernel: 3,
        in_channels: 32,
        out_channels: 32,
        activation: Activation::Relu,
    },
    LayerSpec {
        name: "conv3",
        kernel: 5,
        in_channels: 32,
        out_channels: 32,
        activation: Activation::Relu,
    },
    LayerSpec {
        name: "conv4",
        kernel: 3,
        in_channels: 32,
        out_channels: RGB_CHANNELS,
        activation: Activation::Sigmoid,
    },
];

/// A convolution with loaded parameters.
#[derive(Debug, Clone)]
struct Conv2d {
    spec: LayerSpec,
    /// Kernel flattened to `(kh * kw * in, out)`, rows ordered `(dy, dx, c)`.
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl Conv2d {
    fn load(tensors: &SafeTensors<'_>, spec: LayerSpec) -> Result<Self> {
        let shape = spec.kernel_shape();
        let kernel = f32_tensor(tensors, &spec.kernel_name(), &shape)?;
        let bias = f32_tensor(tensors, &spec.bias_name(), &[spec.out_channels])?;

        let rows = spec.kernel * spec.kernel * spec.in_channels;
        let weights = Array2::from_shape_vec((rows, spec.out_channels), kernel).map_err(|_| {
            Error::ShapeMismatch {
                name: spec.kernel_name(),
                expected: format!("{shape:?}"),
                actual: "reshape failed".to_string(),
            }
        })?;

        Ok(Self {
            spec,
            weights,
            bias: Array1::from_vec(bias),
        })
    }

    /// Apply the layer to an `(h, w, in)` feature map with zero "same" padding.
    fn forward(&self, input: ArrayView3<'_, f32>) -> Array3<f32> {
        let (height, width, channels) = input.dim();
        let k = self.spec.kernel;
        let pad = k / 2;

        let input = input.as_standard_layout();
        let data = input.as_slice().expect("standard layout");

        let mut output = Array3::<f32>::zeros((height, width, self.spec.out_channels));
        let mut patches = Array2::<f32>::zeros((width, k * k * channels));

        for y in 0..height {
            patches.fill(0.0);
            for (x, mut row) in patches.axis_iter_mut(Axis(0)).enumerate() {
                let Some(row) = row.as_slice_mut() else {
                    continue;
                };
                for dy in 0..k {
                    let Some(sy) = (y + dy).checked_sub(pad).filter(|&sy| sy < height) else {
                        continue;
                    };
                    for dx in 0..k {
                        let Some(sx) = (x + dx).checked_sub(pad).filter(|&sx| sx < width) else {
                            continue;
                        };
                        let src = (sy * width + sx) * channels;
                        let dst = (dy * k + dx) * channels;
                        row[dst..dst + channels].copy_from_slice(&data[src..src + channels]);
                    }
                }
            }

            let mut out_row = patches.dot(&self.weights);
            out_row += &self.bias;
            out_row.mapv_inplace(|v| self.spec.activation.apply(v));
            output.slice_mut(s![y, .., ..]).assign(&out_row);
        }

        output
    }
}

/// A loaded enhancement model.
///
/// Construct once with [`Model::load`] and reuse for any number of images.
#[derive(Debug, Clone)]
pub struct Model {
    layers: Vec<Conv2d>,
}

impl Model {
    /// Build the network and load its weights from a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, or if any
    /// tensor is absent or does not match the fixed topology.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading model weights from {}", path.display());

        let bytes = read_weights(path)?;
        let tensors = parse_weights(&bytes, path)?;
        let model = Self::from_tensors(&tensors)?;

        tracing::info!("Model loaded successfully");
        Ok(model)
    }

    /// Build the network from an already parsed weights container.
    ///
    /// # Errors
    ///
    /// Returns an error if any tensor does not match the fixed topology.
    pub fn from_tensors(tensors: &SafeTensors<'_>) -> Result<Self> {
        let layers = TOPOLOGY
            .iter()
            .map(|&spec| Conv2d::load(tensors, spec))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { layers })
    }

    /// Run one forward pass over an NHWC batch of a single image.
    ///
    /// The network is fully convolutional, so any spatial size is accepted;
    /// the output has the same shape as the input with values in [0, 1].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] if the input is not a single 3-channel
    /// image or the output contains non-finite values.
    pub fn forward(&self, input: &ImageTensor) -> Result<ImageTensor> {
        self.forward_with(input, |_| {})
    }

    fn forward_with(
        &self,
        input: &ImageTensor,
        mut on_layer: impl FnMut(&LayerSpec),
    ) -> Result<ImageTensor> {
        let (batch, height, width, channels) = input.dim();
        if batch != 1 || channels != RGB_CHANNELS || height == 0 || width == 0 {
            return Err(Error::Inference {
                reason: format!(
                    "expected input of shape (1, h, w, {RGB_CHANNELS}), got {:?}",
                    input.shape()
                ),
            });
        }

        let mut features = input.index_axis(Axis(0), 0).to_owned();
        for layer in &self.layers {
            features = layer.forward(features.view());
            on_layer(&layer.spec);
        }

        if let Some(bad) = features.iter().find(|v| !v.is_finite()) {
            return Err(Error::Inference {
                reason: format!("network produced non-finite value {bad}"),
            });
        }

        Ok(features.insert_axis(Axis(0)))
    }

    /// Enhance one image.
    ///
    /// The image is resampled to the network resolution, passed through the
    /// network, and resampled back to its original dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn enhance(&self, img: &RgbImage) -> Result<RgbImage> {
        let original_dims = img.dimensions();
        let input = image_to_tensor(img, MODEL_IMAGE_SIZE);

        tracing::debug!("Running network on {:?}", input.shape());

        let pb = ProgressBar::new(self.layers.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Enhancing [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid template")
                .progress_chars("#>-"),
        );

        let output = self.forward_with(&input, |spec| {
            pb.set_message(spec.name);
            pb.inc(1);
        });
        pb.finish_and_clear();

        let enhanced = tensor_to_image(&output?);
        Ok(restore_dimensions(enhanced, original_dims))
    }
}
