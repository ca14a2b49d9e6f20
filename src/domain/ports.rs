use crate::domain::model::{RangeSummary, RepoDescriptor, Report};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;

/// Blocking queries against a repository's history.
pub trait VersionControl: Send + Sync {
    fn fetch(&self, repo: &RepoDescriptor) -> Result<()>;

    /// Tags ordered from oldest to newest creation.
    fn list_tags(&self, repo: &RepoDescriptor) -> Result<Vec<String>>;

    /// Commit date of `reference`, or `None` if the reference does not exist.
    fn commit_date(&self, repo: &RepoDescriptor, reference: &str) -> Result<Option<NaiveDate>>;

    /// `<count>\t<author>` lines for commits in `(lower, upper]`.
    fn shortlog(&self, repo: &RepoDescriptor, lower: &str, upper: &str) -> Result<String>;
}

/// Maps a raw author display name onto the key used in the ledger.
pub trait IdentityNormalizer: Send + Sync {
    fn canonical(&self, raw: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn workspace_root(&self) -> &Path;
    fn primary(&self) -> &str;
    fn secondaries(&self) -> &[String];
    fn fetch_enabled(&self) -> bool;
    fn jobs(&self) -> usize;
    fn release_tag_pattern(&self) -> Option<&Regex>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RangeSummary>>;
    async fn transform(&self, data: Vec<RangeSummary>) -> Result<Report>;
    async fn load(&self, report: Report) -> Result<String>;
}
