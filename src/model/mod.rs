//! The low-light enhancement network and its weights.

mod loader;
mod network;

pub use loader::{default_weights_path, read_weights, WEIGHTS_FILENAME};
pub use network::{Activation, LayerSpec, Model, TOPOLOGY};
