//! Locating and reading model weight files.

use std::fs;
use std::path::{Path, PathBuf};

use safetensors::{Dtype, SafeTensors};

use crate::error::{Error, Result};

/// File name of the weights inside the default model directory.
pub const WEIGHTS_FILENAME: &str = "lowlight.safetensors";

/// Default location of the enhancement weights.
///
/// Uses the platform-appropriate data directory:
/// - Windows: `%APPDATA%\nightlift\models\lowlight.safetensors`
/// - Linux: `~/.local/share/nightlift/models/lowlight.safetensors`
/// - macOS: `~/Library/Application Support/nightlift/models/lowlight.safetensors`
#[must_use]
pub fn default_weights_path() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("nightlift").join("models").join(WEIGHTS_FILENAME)
}

/// Read the raw bytes of a weights file.
///
/// # Errors
///
/// Returns [`Error::WeightsNotFound`] if the file does not exist and
/// [`Error::WeightsRead`] if it cannot be read.
pub fn read_weights(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::WeightsNotFound {
            path: path.to_path_buf(),
        });
    }

    fs::read(path).map_err(|source| Error::WeightsRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a safetensors container.
///
/// # Errors
///
/// Returns [`Error::WeightsFormat`] if the header or layout is invalid.
pub(crate) fn parse_weights<'a>(bytes: &'a [u8], path: &Path) -> Result<SafeTensors<'a>> {
    SafeTensors::deserialize(bytes).map_err(|source| Error::WeightsFormat {
        path: path.to_path_buf(),
        source,
    })
}

/// Extract a little-endian `f32` tensor with exactly the `expected` shape.
///
/// # Errors
///
/// Fails if the tensor is absent, not `F32`, or shaped differently.
pub(crate) fn f32_tensor(
    tensors: &SafeTensors<'_>,
    name: &str,
    expected: &[usize],
) -> Result<Vec<f32>> {
    let view = tensors.tensor(name).map_err(|_| Error::MissingTensor {
        name: name.to_string(),
    })?;

    if view.dtype() != Dtype::F32 {
        return Err(Error::UnsupportedDType {
            name: name.to_string(),
            dtype: format!("{:?}", view.dtype()),
        });
    }

    if view.shape() != expected {
        return Err(Error::ShapeMismatch {
            name: name.to_string(),
            expected: format!("{expected:?}"),
            actual: format!("{:?}", view.shape()),
        });
    }

    Ok(view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::tensor::TensorView;

    fn container(name: &str, dtype: Dtype, shape: &[usize], data: &[u8]) -> Vec<u8> {
        let view = TensorView::new(dtype, shape.to_vec(), data).unwrap();
        safetensors::serialize(vec![(name, view)], &None).unwrap()
    }

    #[test]
    fn test_default_path_ends_with_filename() {
        let path = default_weights_path();
        assert!(path.ends_with(Path::new("nightlift/models").join(WEIGHTS_FILENAME)));
    }

    #[test]
    fn test_missing_file() {
        let err = read_weights(Path::new("no/such/weights.safetensors")).unwrap_err();
        assert!(matches!(err, Error::WeightsNotFound { .. }));
        assert!(err.is_model_unavailable());
    }

    #[test]
    fn test_garbage_is_a_format_error() {
        let err = parse_weights(b"\x01\x02garbage", Path::new("w.safetensors")).unwrap_err();
        assert!(matches!(err, Error::WeightsFormat { .. }));
    }

    #[test]
    fn test_extracts_f32_values() {
        let values = [1.5f32, -2.0, 0.25];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let file = container("bias", Dtype::F32, &[3], &bytes);
        let tensors = parse_weights(&file, Path::new("w")).unwrap();

        assert_eq!(f32_tensor(&tensors, "bias", &[3]).unwrap(), values);
    }

    #[test]
    fn test_rejects_wrong_shape_dtype_and_name() {
        let bytes = [0u8; 16];
        let file = container("bias", Dtype::F32, &[4], &bytes);
        let tensors = parse_weights(&file, Path::new("w")).unwrap();
        assert!(matches!(
            f32_tensor(&tensors, "bias", &[3]),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            f32_tensor(&tensors, "kernel", &[4]),
            Err(Error::MissingTensor { .. })
        ));

        let file = container("bias", Dtype::I32, &[4], &bytes);
        let tensors = parse_weights(&file, Path::new("w")).unwrap();
        assert!(matches!(
            f32_tensor(&tensors, "bias", &[4]),
            Err(Error::UnsupportedDType { .. })
        ));
    }
}
