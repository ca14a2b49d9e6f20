pub mod settings;
pub mod toml_config;

pub use settings::ReportSettings;

#[cfg(feature = "cli")]
use crate::core::render::OutputFormat;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "contrib-ledger")]
#[command(about = "Count commits per author for a release window across sibling repositories")]
#[command(
    long_about = "Count commits per author for a release window of the primary repository.\n\n\
Secondary repositories are mapped onto the window through their latest release \
tag preceding each bound. Totals are additive: the report for A..B equals the \
per-author sum of the reports for A..C and C..B."
)]
pub struct CliConfig {
    /// Lower bound (exclusive), a tag or branch of the primary repository
    pub from: Option<String>,

    /// Upper bound (inclusive)
    pub to: Option<String>,

    /// Sort by ascending commit count
    #[arg(short, long)]
    pub ascending: bool,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the repository checkouts (defaults to the parent of the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Skip `git fetch` in every repository
    #[arg(long)]
    pub no_fetch: bool,

    /// Number of secondary repositories queried concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
