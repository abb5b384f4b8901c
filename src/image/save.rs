//! Image saving utilities.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, ImageFormat, RgbImage};

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Convert a normalized NHWC tensor to an RGB image.
///
/// Only the first image of the batch is converted.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn tensor_to_image(tensor: &ImageTensor) -> RgbImage {
    let (_, height, width, _) = tensor.dim();

    // Safe: tensor spatial dims originate from u32 image dimensions
    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let mut px = [0u8; RGB_CHANNELS];
        for (c, out) in px.iter_mut().enumerate() {
            *out = denormalize(tensor[[0, y, x, c]]);
        }
        image::Rgb(px)
    })
}

/// Resample `img` to `(width, height)` unless it already has those dimensions.
#[must_use]
pub fn restore_dimensions(img: RgbImage, (width, height): (u32, u32)) -> RgbImage {
    if img.dimensions() == (width, height) {
        img
    } else {
        image::imageops::resize(&img, width, height, FilterType::Triangle)
    }
}

/// Save an RGB image to `path`.
///
/// The format is inferred from the extension (PNG when unknown). The image is
/// written to a sibling temporary file first and renamed into place, so a
/// failed encode never leaves a partial file at `path`.
///
/// # Arguments
///
/// * `img` - Image to encode
/// * `path` - Output file path
/// * `quality` - JPEG quality (1-100), ignored for other formats
///
/// # Errors
///
/// Returns an error if the image cannot be encoded or the file cannot be written.
pub fn save_image<P: AsRef<Path>>(img: &RgbImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    let temp_path = partial_path(path);

    if let Err(err) = write_encoded(img, &temp_path, path, format, quality) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    // Atomic rename
    fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })?;

    tracing::debug!("Wrote {} as {format:?}", path.display());
    Ok(())
}

fn write_encoded(
    img: &RgbImage,
    temp_path: &Path,
    path: &Path,
    format: ImageFormat,
    quality: u8,
) -> Result<()> {
    let mut output = BufWriter::new(fs::File::create(temp_path)?);

    let encoded = match format {
        ImageFormat::Jpeg => {
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            img.write_with_encoder(encoder)
        }
        _ => img.write_to(&mut output, format),
    };

    encoded.map_err(|source| Error::ImageSave {
        path: path.to_path_buf(),
        source,
    })?;

    output
        .into_inner()
        .map_err(std::io::IntoInnerError::into_error)?
        .sync_all()?;

    Ok(())
}

/// Hidden sibling path used while encoding `path`.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "output".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.partial"))
}

/// Denormalize a value from [0, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    (value * 255.0).clamp(0.0, 255.0) as u8
}
