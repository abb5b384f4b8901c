//! # nightlift
//!
//! Low-light image enhancement.
//!
//! Images are first passed through a small convolutional network whose
//! weights are loaded from a safetensors file. When the weights are missing,
//! do not fit the network, or inference fails, a classical filter chain
//! (Lab CLAHE, contrast/brightness lift, bilateral denoise) is used instead.
//!
//! ## Example
//!
//! ```no_run
//! use nightlift::{Config, Pipeline};
//!
//! # fn main() -> nightlift::Result<()> {
//! let config = Config {
//!     weights_path: "models/lowlight.safetensors".into(),
//!     ..Config::default()
//! };
//! let pipeline = Pipeline::new(config)?;
//!
//! let report = pipeline.process("dark.jpg", "bright.jpg")?;
//! println!("enhanced with the {} path", report.method);
//! # Ok(())
//! # }
//! ```

pub mod classical;
pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{enhance_with_model, Config, Enhanced, Method, Pipeline, Report};
