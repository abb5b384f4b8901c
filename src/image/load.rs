//! Image loading utilities.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, ImageDecoder, ImageError, ImageReader, RgbImage};
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Load an image from disk as an 8-bit RGB buffer.
///
/// Whatever the source pixel format, the result has three 8-bit channels in
/// RGB order. Alpha is discarded and 16-bit samples are narrowed. An EXIF
/// orientation tag is applied, so the buffer is upright as displayed.
///
/// # Errors
///
/// Returns [`Error::InputNotFound`] if the path does not exist and
/// [`Error::ImageLoad`] if the bytes cannot be decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let load_err = |source: ImageError| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    };

    let mut decoder = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|err| load_err(ImageError::IoError(err)))?
        .into_decoder()
        .map_err(load_err)?;
    let orientation = decoder.orientation().map_err(load_err)?;

    let mut img = DynamicImage::from_decoder(decoder).map_err(load_err)?;
    img.apply_orientation(orientation);

    tracing::debug!(
        "Decoded {} ({}x{}, {:?}, {orientation:?})",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );

    Ok(img.to_rgb8())
}

/// Convert an RGB image to a normalized NHWC tensor of shape `(1, size, size, 3)`.
///
/// The image is resampled bilinearly to `size`x`size` when its dimensions
/// differ, then each sample is scaled from [0, 255] to [0, 1].
#[must_use]
pub fn image_to_tensor(img: &RgbImage, size: u32) -> ImageTensor {
    let resized;
    let src = if img.dimensions() == (size, size) {
        img
    } else {
        resized = image::imageops::resize(img, size, size, FilterType::Triangle);
        &resized
    };

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, side, side, RGB_CHANNELS));

    for (x, y, pixel) in src.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..RGB_CHANNELS {
            tensor[[0, y, x, c]] = f32::from(pixel[c]) / 255.0;
        }
    }

    tensor
}
