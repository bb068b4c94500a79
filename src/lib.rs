pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command, LogFormat};
pub use config::toml_config::TomlConfig;

pub use crate::core::service::{Collaborators, PerfumeService, ProcessingSettings};
pub use utils::error::{PipelineError, Result};
