//! Custom error types for nightlift.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the nightlift library.
#[derive(Error, Debug)]
pub enum Error {
    /// The source image path does not exist.
    #[error("input image not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Failed to load or decode an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Image dimensions are not supported.
    #[error("unsupported image dimensions {width}x{height}: {reason}")]
    UnsupportedDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    /// The weights file does not exist.
    #[error("model weights not found: {path}")]
    WeightsNotFound { path: PathBuf },

    /// The weights file exists but could not be read.
    #[error("failed to read model weights {path}: {source}")]
    WeightsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The weights file is not a readable safetensors container.
    #[error("failed to parse model weights {path}: {source}")]
    WeightsFormat {
        path: PathBuf,
        #[source]
        source: safetensors::SafeTensorError,
    },

    /// A tensor required by the network topology is absent from the weights file.
    #[error("model weights are missing tensor {name}")]
    MissingTensor { name: String },

    /// A weight tensor is stored with an element type other than `f32`.
    #[error("tensor {name} has dtype {dtype}, expected F32")]
    UnsupportedDType { name: String, dtype: String },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch for {name}: expected {expected}, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// Model inference failed.
    #[error("model inference failed: {reason}")]
    Inference { reason: String },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the model could not be constructed from its weights.
    #[must_use]
    pub const fn is_model_unavailable(&self) -> bool {
        matches!(
            self,
            Self::WeightsNotFound { .. }
                | Self::WeightsRead { .. }
                | Self::WeightsFormat { .. }
                | Self::MissingTensor { .. }
                | Self::UnsupportedDType { .. }
                | Self::ShapeMismatch { .. }
        )
    }

    /// Whether a failure in the neural stage should be answered by the
    /// classical enhancer instead of failing the whole operation.
    #[must_use]
    pub const fn triggers_fallback(&self) -> bool {
        self.is_model_unavailable() || matches!(self, Self::Inference { .. })
    }
}

/// Result type alias for nightlift operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_trigger_fallback() {
        let missing = Error::WeightsNotFound {
            path: PathBuf::from("nope.safetensors"),
        };
        assert!(missing.is_model_unavailable());
        assert!(missing.triggers_fallback());

        let inference = Error::Inference {
            reason: "non-finite output".to_string(),
        };
        assert!(!inference.is_model_unavailable());
        assert!(inference.triggers_fallback());
    }

    #[test]
    fn test_input_errors_are_fatal() {
        let err = Error::InputNotFound {
            path: PathBuf::from("missing.png"),
        };
        assert!(!err.triggers_fallback());
        assert!(err.to_string().contains("missing.png"));
    }
}
