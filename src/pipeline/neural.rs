//! Single-shot neural enhancement of one file.

use std::path::Path;

use crate::error::Result;
use crate::image::{load_image, save_image};
use crate::model::Model;

/// JPEG quality used by [`enhance_with_model`].
const DEFAULT_QUALITY: u8 = 95;

/// Enhance `input_path` with the network and write the result to `output_path`.
///
/// Builds the network, loads `weights_path` into it, runs one forward pass
/// and discards the model. Each step must succeed before the next runs, and
/// `output_path` is only written when all of them did.
///
/// # Errors
///
/// Returns an error if the image cannot be loaded, the weights are missing or
/// do not fit the topology, inference fails, or the output cannot be saved.
pub fn enhance_with_model<P, Q, W>(input_path: P, output_path: Q, weights_path: W) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    W: AsRef<Path>,
{
    let image = load_image(input_path.as_ref())?;
    tracing::info!("Image loaded: {}x{}", image.width(), image.height());

    let model = Model::load(weights_path)?;
    let enhanced = model.enhance(&image)?;

    save_image(&enhanced, output_path.as_ref(), DEFAULT_QUALITY)?;
    tracing::info!(
        "Neural enhancement saved: {}",
        output_path.as_ref().display()
    );

    Ok(())
}
