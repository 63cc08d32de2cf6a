//! Parsing and validation of `strata.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a
//! strongly-typed [`ProjectConfig`], then resolves its human-written times
//! and frequencies into the femtosecond values the simulator works with.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_simulation, ResolvedClock, ResolvedSimulation};
pub use types::*;
