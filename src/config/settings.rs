use crate::config::toml_config::TomlConfig;
use crate::core::identity::AliasTable;
use crate::core::ConfigProvider;
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// First release of the primary repository.
pub const DEFAULT_FROM_VERSION: &str = "v0.1.0";
pub const DEFAULT_TO_VERSION: &str = "main";
pub const DEFAULT_SECONDARY_REPOSITORIES: &[&str] = &["plugins", "docs"];

/// Effective report settings after merging the config file and the invocation directory.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub workspace_root: PathBuf,
    pub primary: String,
    pub secondaries: Vec<String>,
    pub default_from: String,
    pub default_to: String,
    pub fetch: bool,
    pub jobs: usize,
    pub release_tag_pattern: Option<Regex>,
    pub aliases: HashMap<String, String>,
}

impl ReportSettings {
    /// The primary repository is the `checkout` top level; its siblings live under `checkout/..`.
    pub fn from_sources(file: Option<&TomlConfig>, checkout: &Path) -> Result<Self> {
        let report = file.and_then(|f| f.report.clone()).unwrap_or_default();

        let workspace_root = match &report.workspace_root {
            Some(root) => checkout.join(root),
            None => checkout
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| LedgerError::MissingConfigError {
                    field: "report.workspace_root".to_string(),
                })?,
        };

        let primary = match report.primary {
            Some(primary) => primary,
            None => checkout
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| LedgerError::MissingConfigError {
                    field: "report.primary".to_string(),
                })?,
        };

        let secondaries = file
            .and_then(|f| f.repositories.as_ref())
            .map(|r| r.secondary.clone())
            .unwrap_or_else(|| {
                DEFAULT_SECONDARY_REPOSITORIES
                    .iter()
                    .map(|name| name.to_string())
                    .collect()
            });

        let release_tag_pattern = report
            .release_tag_pattern
            .as_deref()
            .map(|pattern| validation::validate_pattern("report.release_tag_pattern", pattern))
            .transpose()?;

        let aliases = file
            .and_then(|f| f.identity.as_ref())
            .map(|identity| identity.aliases.clone())
            .unwrap_or_default();

        Ok(Self {
            workspace_root,
            primary,
            secondaries,
            default_from: report
                .default_from
                .unwrap_or_else(|| DEFAULT_FROM_VERSION.to_string()),
            default_to: report
                .default_to
                .unwrap_or_else(|| DEFAULT_TO_VERSION.to_string()),
            fetch: report.fetch.unwrap_or(true),
            jobs: report.jobs.unwrap_or(1),
            release_tag_pattern,
            aliases,
        })
    }

    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        if let Some(root) = root {
            self.workspace_root = root;
        }
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        if let Some(jobs) = jobs {
            self.jobs = jobs;
        }
        self
    }

    pub fn with_fetch(mut self, fetch: bool) -> Self {
        self.fetch = self.fetch && fetch;
        self
    }

    /// Missing positional versions fall back to the configured defaults.
    pub fn versions(&self, from: Option<String>, to: Option<String>) -> (String, String) {
        (
            from.unwrap_or_else(|| self.default_from.clone()),
            to.unwrap_or_else(|| self.default_to.clone()),
        )
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::new(self.aliases.clone())
    }
}

impl Validate for ReportSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_path(
            "report.workspace_root",
            &self.workspace_root.to_string_lossy(),
        )?;
        validation::validate_repository_name("report.primary", &self.primary)?;
        for name in &self.secondaries {
            validation::validate_repository_name("repositories.secondary", name)?;
        }
        validation::validate_positive_number("jobs", self.jobs, 1)?;
        Ok(())
    }
}

impl ConfigProvider for ReportSettings {
    fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn primary(&self) -> &str {
        &self.primary
    }

    fn secondaries(&self) -> &[String] {
        &self.secondaries
    }

    fn fetch_enabled(&self) -> bool {
        self.fetch
    }

    fn jobs(&self) -> usize {
        self.jobs
    }

    fn release_tag_pattern(&self) -> Option<&Regex> {
        self.release_tag_pattern.as_ref()
    }
}
