use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A repository checked out next to the primary one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl RepoDescriptor {
    /// Builds `<root>/<name>`.
    pub fn sibling(root: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: root.join(name),
        }
    }
}

/// The refs actually used for one repository's window, lower exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeResolution {
    pub repository: String,
    pub lower: String,
    pub upper: String,
}

impl RangeResolution {
    pub fn revision_range(&self) -> String {
        format!("{}..{}", self.lower, self.upper)
    }
}

/// Raw `git shortlog -s` output for one resolved range.
#[derive(Debug, Clone)]
pub struct RangeSummary {
    pub range: RangeResolution,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub commits: u64,
}

/// Parses one `<count>\t<author>` line. `None` means the line is malformed.
pub fn parse_shortlog_line(line: &str) -> Option<AuthorCount> {
    let (count, author) = line.trim().split_once('\t')?;
    let commits = count.trim().parse().ok()?;
    let author = author.trim();
    if author.is_empty() {
        return None;
    }
    Some(AuthorCount {
        author: author.to_string(),
        commits,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

/// Per-author commit totals across every included repository and range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    counts: HashMap<String, u64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, author: impl Into<String>, commits: u64) {
        *self.counts.entry(author.into()).or_insert(0) += commits;
    }

    pub fn merge(&mut self, other: Ledger) {
        for (author, commits) in other.counts {
            self.add(author, commits);
        }
    }

    pub fn get(&self, author: &str) -> u64 {
        self.counts.get(author).copied().unwrap_or(0)
    }

    /// Number of distinct contributors.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total_commits(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries ordered by commit count, ties broken by author name ascending.
    pub fn sorted(&self, order: SortOrder) -> Vec<AuthorCount> {
        let mut entries: Vec<AuthorCount> = self
            .counts
            .iter()
            .map(|(author, commits)| AuthorCount {
                author: author.clone(),
                commits: *commits,
            })
            .collect();

        entries.sort_by(|a, b| {
            let by_count = match order {
                SortOrder::Descending => b.commits.cmp(&a.commits),
                SortOrder::Ascending => a.commits.cmp(&b.commits),
            };
            by_count.then_with(|| a.author.cmp(&b.author))
        });
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub ranges: Vec<RangeResolution>,
    pub contributors: Vec<AuthorCount>,
    pub total_commits: u64,
}

impl Report {
    pub fn contributor_count(&self) -> usize {
        self.contributors.len()
    }
}
