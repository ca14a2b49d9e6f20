pub mod adapters;
pub mod broker;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::git::GitCli;
pub use config::{toml_config::TomlConfig, ReportSettings};
pub use crate::core::{etl::ReportEngine, pipeline::AttributionPipeline};
pub use utils::error::{LedgerError, Result};
