//! # Configuration
//!
//! - `options`: command-line flags (`ControllerOptions`)
//! - `controller`: environment-driven runtime tuning (`ControllerConfig`)

pub mod controller;
pub mod options;

pub use controller::ControllerConfig;
pub use options::{ControllerOptions, OptionsError};
