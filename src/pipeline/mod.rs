//! Enhancement pipeline: neural first, classical on failure.

mod enhance;
mod neural;

pub use enhance::{Config, Enhanced, Method, Pipeline, Report};
pub use neural::enhance_with_model;
