//! Image loading, tensor conversion, and saving utilities.

mod load;
mod save;

pub use load::{image_to_tensor, load_image};
pub use save::{restore_dimensions, save_image, tensor_to_image};

use ndarray::Array4;

/// Image tensor in NHWC format (batch, height, width, channels).
/// Values are normalized to [0, 1] range, RGB channel order.
pub type ImageTensor = Array4<f32>;

/// Spatial resolution expected by the enhancement network.
pub const MODEL_IMAGE_SIZE: u32 = 512;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
