use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Version '{reference}' doesn't exist in {repository}")]
    UnknownVersion { repository: String, reference: String },

    #[error("No release tag in {repository} predates {date}")]
    NoPrecedingTag { repository: String, date: String },

    #[error("Malformed shortlog line in {repository}: {line:?}")]
    LogParse { repository: String, line: String },

    #[error("failed to run `{command}`: {message}")]
    GitSpawn { command: String, message: String },

    #[error("`{command}` failed with code {code:?}: {stderr}")]
    GitCommand {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Broker request failed: {0}")]
    BrokerHttp(#[from] reqwest::Error),

    #[error("Broker rejected {operation}: HTTP {status}")]
    BrokerRejected { operation: String, status: u16 },

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Background task failed: {message}")]
    TaskError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Usage,
    History,
    VersionControl,
    Broker,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit status the binaries use for this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::UnknownVersion { .. } => ErrorCategory::Usage,
            LedgerError::NoPrecedingTag { .. } | LedgerError::LogParse { .. } => {
                ErrorCategory::History
            }
            LedgerError::GitSpawn { .. } | LedgerError::GitCommand { .. } => {
                ErrorCategory::VersionControl
            }
            LedgerError::BrokerHttp(_) | LedgerError::BrokerRejected { .. } => {
                ErrorCategory::Broker
            }
            LedgerError::ConfigValidationError { .. }
            | LedgerError::InvalidConfigValueError { .. }
            | LedgerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            LedgerError::CsvError(_)
            | LedgerError::IoError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::TaskError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LedgerError::UnknownVersion { .. } => ErrorSeverity::Low,
            LedgerError::BrokerHttp(_) | LedgerError::GitSpawn { .. } => ErrorSeverity::Medium,
            LedgerError::TaskError { .. } | LedgerError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            LedgerError::UnknownVersion { reference, .. } => {
                format!("Version '{}' doesn't exist", reference)
            }
            LedgerError::NoPrecedingTag { repository, date } => format!(
                "Could not map {} onto a release of {}: no earlier tag exists",
                date, repository
            ),
            LedgerError::LogParse { repository, .. } => {
                format!("Unexpected git shortlog output from {}", repository)
            }
            LedgerError::GitSpawn { .. } => "Could not start git".to_string(),
            LedgerError::GitCommand { command, .. } => format!("`{}` failed", command),
            LedgerError::BrokerHttp(_) => "Broker management API is unreachable".to_string(),
            LedgerError::BrokerRejected { operation, status } => {
                format!("Broker refused to {} (HTTP {})", operation, status)
            }
            LedgerError::ConfigValidationError { .. }
            | LedgerError::InvalidConfigValueError { .. }
            | LedgerError::MissingConfigError { .. } => format!("Invalid configuration: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Usage => "Check the tag or branch name with `git tag` / `git branch -a`",
            ErrorCategory::History => {
                "Pick a later lower bound, or restrict the release tag pattern"
            }
            ErrorCategory::VersionControl => {
                "Make sure git is installed and every repository is cloned next to the primary one"
            }
            ErrorCategory::Broker => {
                "Check that the broker management plugin is enabled and the bootstrap credentials are valid"
            }
            ErrorCategory::Configuration => "Fix the configuration file or command-line flags",
            ErrorCategory::System => "Re-run with --verbose for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
