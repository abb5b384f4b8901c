//! Neural-first enhancement with classical fallback.

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::classical::{self, ClassicalParams};
use crate::error::{Error, Result};
use crate::image::{load_image, save_image};
use crate::model::{default_weights_path, Model};

/// Configuration for the enhancement pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the safetensors weights of the enhancement network.
    pub weights_path: PathBuf,

    /// Skip the network and always use the classical enhancer.
    pub force_classical: bool,

    /// Parameters of the classical enhancer.
    pub classical: ClassicalParams,

    /// Output JPEG quality (1-100).
    pub output_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weights_path: default_weights_path(),
            force_classical: false,
            classical: ClassicalParams::default(),
            output_quality: 95,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.output_quality) {
            return Err(Error::InvalidParameter {
                name: "output_quality".to_string(),
                reason: "must be between 1 and 100".to_string(),
            });
        }

        self.classical.validate()
    }
}

/// Which enhancer produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// The convolutional network.
    Neural,
    /// The classical filter chain.
    Classical,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neural => f.write_str("neural"),
            Self::Classical => f.write_str("classical"),
        }
    }
}

/// An enhanced image tagged with the stage that produced it.
#[derive(Debug, Clone)]
pub struct Enhanced {
    /// The enhanced image, same dimensions as the input.
    pub image: RgbImage,
    /// The stage that produced `image`.
    pub method: Method,
    /// Why the neural stage was skipped or failed, if it was.
    pub fallback_reason: Option<String>,
}

/// Summary of a processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The stage that produced the saved image.
    pub method: Method,
    /// Width of the input and output, after orientation is applied.
    pub width: u32,
    /// Height of the input and output, after orientation is applied.
    pub height: u32,
    /// Why the neural stage was skipped or failed, if it was.
    pub fallback_reason: Option<String>,
}

#[derive(Debug)]
enum ModelState {
    Loaded(Model),
    Unavailable(String),
    Disabled,
}

/// Low-light enhancement pipeline.
///
/// The model is loaded once in [`Pipeline::new`] and reused for every image.
/// If it cannot be loaded, or fails on a particular image, the classical
/// enhancer is used instead.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    model: ModelState,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration.
    ///
    /// A missing or incompatible weights file is not an error here; it is
    /// logged and the pipeline runs classical-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::debug!("Initializing pipeline with config: {config:?}");

        let model = if config.force_classical {
            tracing::info!("Neural enhancement disabled");
            ModelState::Disabled
        } else {
            match Model::load(&config.weights_path) {
                Ok(model) => ModelState::Loaded(model),
                Err(err) if err.triggers_fallback() => {
                    tracing::warn!("Model unavailable, using classical enhancement: {err}");
                    ModelState::Unavailable(err.to_string())
                }
                Err(err) => return Err(err),
            }
        };

        Ok(Self { config, model })
    }

    /// Whether the neural stage will be attempted.
    #[must_use]
    pub const fn has_model(&self) -> bool {
        matches!(self.model, ModelState::Loaded(_))
    }

    /// Enhance an in-memory image.
    ///
    /// Never fails: the classical enhancer answers every neural failure.
    #[must_use]
    pub fn enhance_image(&self, image: &RgbImage) -> Enhanced {
        let reason = match &self.model {
            ModelState::Loaded(model) => match model.enhance(image) {
                Ok(enhanced) => {
                    return Enhanced {
                        image: enhanced,
                        method: Method::Neural,
                        fallback_reason: None,
                    }
                }
                Err(err) => {
                    tracing::warn!("Neural enhancement failed: {err}");
                    err.to_string()
                }
            },
            ModelState::Unavailable(reason) => reason.clone(),
            ModelState::Disabled => "neural enhancement disabled".to_string(),
        };

        tracing::info!("Using classical enhancement");
        Enhanced {
            image: classical::enhance_with(image, &self.config.classical),
            method: Method::Classical,
            fallback_reason: Some(reason),
        }
    }

    /// Enhance the image at `input_path` and write it to `output_path`.
    ///
    /// The output directory must already exist. Nothing is written unless
    /// the whole operation succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is missing or undecodable, or the
    /// output cannot be written.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<Report> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        tracing::info!("Processing image: {}", input_path.display());

        let image = load_image(input_path)?;
        let (width, height) = image.dimensions();
        tracing::info!("Image loaded: {width}x{height}");

        let enhanced = self.enhance_image(&image);

        tracing::info!("Saving output to: {}", output_path.display());
        save_image(&enhanced.image, output_path, self.config.output_quality)?;

        tracing::info!("Processing complete ({} path)", enhanced.method);
        Ok(Report {
            method: enhanced.method,
            width,
            height,
            fallback_reason: enhanced.fallback_reason,
        })
    }
}
