use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Optional `contrib-ledger.toml` shared by both binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub report: Option<ReportSection>,
    pub repositories: Option<RepositoriesSection>,
    pub identity: Option<IdentitySection>,
    pub broker: Option<BrokerSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSection {
    pub workspace_root: Option<String>,
    pub primary: Option<String>,
    pub default_from: Option<String>,
    pub default_to: Option<String>,
    pub fetch: Option<bool>,
    pub jobs: Option<usize>,
    pub release_tag_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoriesSection {
    #[serde(default)]
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySection {
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerSection {
    pub url: Option<String>,
    pub bootstrap_user: Option<String>,
    pub bootstrap_password: Option<String>,
    pub admin_user: Option<String>,
    pub vhost: Option<String>,
    pub delete_users: Option<Vec<String>>,
    pub ready_retries: Option<u32>,
    pub ready_interval_seconds: Option<u64>,
    pub password_length: Option<usize>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LedgerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LedgerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${NAME}` with the environment variable; unknown names stay verbatim.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LedgerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(report) = &self.report {
            if let Some(root) = &report.workspace_root {
                validation::validate_path("report.workspace_root", root)?;
            }
            if let Some(primary) = &report.primary {
                validation::validate_repository_name("report.primary", primary)?;
            }
            if let Some(jobs) = report.jobs {
                validation::validate_positive_number("report.jobs", jobs, 1)?;
            }
            if let Some(pattern) = &report.release_tag_pattern {
                validation::validate_pattern("report.release_tag_pattern", pattern)?;
            }
        }

        if let Some(repositories) = &self.repositories {
            for name in &repositories.secondary {
                validation::validate_repository_name("repositories.secondary", name)?;
            }
        }

        if let Some(broker) = &self.broker {
            if let Some(url) = &broker.url {
                validation::validate_url("broker.url", url)?;
            }
            if let Some(admin) = &broker.admin_user {
                validation::validate_non_empty_string("broker.admin_user", admin)?;
            }
            if let Some(length) = broker.password_length {
                validation::validate_range("broker.password_length", length, 16, 128)?;
            }
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
