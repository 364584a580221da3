pub mod cli;
pub mod layers;

pub use layers::{config_layers, policy_dirs};
