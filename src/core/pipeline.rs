use crate::core::render::{render, OutputFormat};
use crate::core::resolve::preceding_release_tag;
use crate::domain::model::{
    parse_shortlog_line, Ledger, RangeResolution, RangeSummary, RepoDescriptor, Report, SortOrder,
};
use crate::domain::ports::{ConfigProvider, IdentityNormalizer, Pipeline, VersionControl};
use crate::utils::error::{LedgerError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Attributes commits from the primary repository and every secondary
/// repository to the primary's release window `(from, to]`.
///
/// Per-author totals are additive over adjacent windows: the report for
/// `A..B` equals the sum of the reports for `A..C` and `C..B`.
pub struct AttributionPipeline<V, C, N> {
    vcs: Arc<V>,
    config: C,
    normalizer: N,
    from: String,
    to: String,
    order: SortOrder,
    format: OutputFormat,
}

impl<V, C, N> AttributionPipeline<V, C, N>
where
    V: VersionControl + 'static,
    C: ConfigProvider,
    N: IdentityNormalizer,
{
    pub fn new(vcs: Arc<V>, config: C, normalizer: N, from: String, to: String) -> Self {
        Self {
            vcs,
            config,
            normalizer,
            from,
            to,
            order: SortOrder::default(),
            format: OutputFormat::default(),
        }
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    fn primary_repository(&self) -> RepoDescriptor {
        RepoDescriptor::sibling(self.config.workspace_root(), self.config.primary())
    }

    fn secondary_repositories(&self) -> Vec<RepoDescriptor> {
        self.config
            .secondaries()
            .iter()
            .map(|name| RepoDescriptor::sibling(self.config.workspace_root(), name))
            .collect()
    }

    fn resolve_primary_date(&self, repo: &RepoDescriptor, reference: &str) -> Result<NaiveDate> {
        self.vcs
            .commit_date(repo, reference)?
            .ok_or_else(|| LedgerError::UnknownVersion {
                repository: repo.name.clone(),
                reference: reference.to_string(),
            })
    }

    async fn secondary_summaries(
        &self,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<RangeSummary>> {
        let repos = self.secondary_repositories();
        let fetch = self.config.fetch_enabled();
        let jobs = self.config.jobs();

        if jobs <= 1 {
            let pattern = self.config.release_tag_pattern();
            return repos
                .iter()
                .map(|repo| {
                    secondary_summary(self.vcs.as_ref(), repo, from_date, to_date, pattern, fetch)
                })
                .collect();
        }

        tracing::debug!("Querying {} secondary repositories, {} at a time", repos.len(), jobs);
        let semaphore = Arc::new(Semaphore::new(jobs));
        let mut tasks = JoinSet::new();
        for (index, repo) in repos.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| LedgerError::TaskError {
                    message: e.to_string(),
                })?;
            let vcs = Arc::clone(&self.vcs);
            let pattern = self.config.release_tag_pattern().cloned();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let summary = secondary_summary(
                    vcs.as_ref(),
                    &repo,
                    from_date,
                    to_date,
                    pattern.as_ref(),
                    fetch,
                );
                (index, summary)
            });
        }

        let mut indexed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, summary) = joined.map_err(|e| LedgerError::TaskError {
                message: e.to_string(),
            })?;
            indexed.push((index, summary?));
        }
        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, summary)| summary).collect())
    }
}

fn secondary_summary<V: VersionControl + ?Sized>(
    vcs: &V,
    repo: &RepoDescriptor,
    from_date: NaiveDate,
    to_date: NaiveDate,
    pattern: Option<&Regex>,
    fetch: bool,
) -> Result<RangeSummary> {
    if fetch {
        vcs.fetch(repo)?;
    }
    let lower = preceding_release_tag(vcs, repo, from_date, pattern)?;
    let upper = preceding_release_tag(vcs, repo, to_date, pattern)?;
    let range = RangeResolution {
        repository: repo.name.clone(),
        lower,
        upper,
    };
    tracing::info!("{}: {}", range.repository, range.revision_range());

    let output = vcs.shortlog(repo, &range.lower, &range.upper)?;
    Ok(RangeSummary { range, output })
}

#[async_trait::async_trait]
impl<V, C, N> Pipeline for AttributionPipeline<V, C, N>
where
    V: VersionControl + 'static,
    C: ConfigProvider,
    N: IdentityNormalizer,
{
    async fn extract(&self) -> Result<Vec<RangeSummary>> {
        let primary = self.primary_repository();
        if self.config.fetch_enabled() {
            self.vcs.fetch(&primary)?;
        }

        let from_date = self.resolve_primary_date(&primary, &self.from)?;
        let to_date = self.resolve_primary_date(&primary, &self.to)?;
        tracing::debug!("Primary window {} .. {}", from_date, to_date);

        let range = RangeResolution {
            repository: primary.name.clone(),
            lower: self.from.clone(),
            upper: self.to.clone(),
        };
        tracing::info!("{}: {}", range.repository, range.revision_range());
        let output = self.vcs.shortlog(&primary, &range.lower, &range.upper)?;

        let mut summaries = vec![RangeSummary { range, output }];
        summaries.extend(self.secondary_summaries(from_date, to_date).await?);
        Ok(summaries)
    }

    async fn transform(&self, data: Vec<RangeSummary>) -> Result<Report> {
        let mut ledger = Ledger::new();
        let mut ranges = Vec::with_capacity(data.len());

        for summary in data {
            let mut range_ledger = Ledger::new();
            for line in summary.output.lines().filter(|line| !line.trim().is_empty()) {
                let entry =
                    parse_shortlog_line(line).ok_or_else(|| LedgerError::LogParse {
                        repository: summary.range.repository.clone(),
                        line: line.to_string(),
                    })?;
                range_ledger.add(self.normalizer.canonical(&entry.author), entry.commits);
            }
            tracing::debug!(
                "{}: {} commits by {} authors",
                summary.range.repository,
                range_ledger.total_commits(),
                range_ledger.len()
            );
            ledger.merge(range_ledger);
            ranges.push(summary.range);
        }

        Ok(Report {
            ranges,
            total_commits: ledger.total_commits(),
            contributors: ledger.sorted(self.order),
        })
    }

    async fn load(&self, report: Report) -> Result<String> {
        render(&report, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{AliasTable, RawName};
    use crate::domain::model::AuthorCount;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockVcs {
        dates: HashMap<(String, String), NaiveDate>,
        tags: HashMap<String, Vec<String>>,
        logs: HashMap<(String, String), String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockVcs {
        fn record(&self, call: String) {
            self.calls.lock().expect("calls lock poisoned").push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock poisoned").clone()
        }
    }

    impl VersionControl for MockVcs {
        fn fetch(&self, repo: &RepoDescriptor) -> Result<()> {
            self.record(format!("fetch {}", repo.name));
            Ok(())
        }

        fn list_tags(&self, repo: &RepoDescriptor) -> Result<Vec<String>> {
            Ok(self.tags.get(&repo.name).cloned().unwrap_or_default())
        }

        fn commit_date(&self, repo: &RepoDescriptor, reference: &str) -> Result<Option<NaiveDate>> {
            Ok(self
                .dates
                .get(&(repo.name.clone(), reference.to_string()))
                .copied())
        }

        fn shortlog(&self, repo: &RepoDescriptor, lower: &str, upper: &str) -> Result<String> {
            let range = format!("{}..{}", lower, upper);
            self.record(format!("shortlog {} {}", repo.name, range));
            Ok(self
                .logs
                .get(&(repo.name.clone(), range))
                .cloned()
                .unwrap_or_default())
        }
    }

    struct MockConfig {
        root: PathBuf,
        secondaries: Vec<String>,
        jobs: usize,
    }

    impl ConfigProvider for MockConfig {
        fn workspace_root(&self) -> &Path {
            &self.root
        }

        fn primary(&self) -> &str {
            "core"
        }

        fn secondaries(&self) -> &[String] {
            &self.secondaries
        }

        fn fetch_enabled(&self) -> bool {
            true
        }

        fn jobs(&self) -> usize {
            self.jobs
        }

        fn release_tag_pattern(&self) -> Option<&Regex> {
            None
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key(repo: &str, reference: &str) -> (String, String) {
        (repo.to_string(), reference.to_string())
    }

    fn mock_vcs() -> MockVcs {
        let mut vcs = MockVcs::default();
        vcs.dates.insert(key("core", "v1.0"), day(2022, 1, 1));
        vcs.dates.insert(key("core", "v2.0"), day(2023, 1, 1));
        vcs.dates.insert(key("docs", "d1"), day(2021, 12, 1));
        vcs.dates.insert(key("docs", "d2"), day(2022, 6, 1));
        vcs.tags
            .insert("docs".to_string(), vec!["d1".to_string(), "d2".to_string()]);
        vcs.logs
            .insert(key("core", "v1.0..v2.0"), "     3\tAlice\n     5\tBob\n".to_string());
        vcs.logs
            .insert(key("docs", "d1..d2"), "     2\tAlice\n     1\tbob\n".to_string());
        vcs
    }

    fn config(jobs: usize) -> MockConfig {
        MockConfig {
            root: PathBuf::from("/work"),
            secondaries: vec!["docs".to_string()],
            jobs,
        }
    }

    #[tokio::test]
    async fn test_extract_resolves_secondary_ranges() {
        let vcs = Arc::new(mock_vcs());
        let pipeline = AttributionPipeline::new(
            Arc::clone(&vcs),
            config(1),
            RawName,
            "v1.0".to_string(),
            "v2.0".to_string(),
        );

        let summaries = pipeline.extract().await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].range.revision_range(), "v1.0..v2.0");
        assert_eq!(summaries[1].range.repository, "docs");
        assert_eq!(summaries[1].range.revision_range(), "d1..d2");
        assert_eq!(
            vcs.calls(),
            [
                "fetch core",
                "shortlog core v1.0..v2.0",
                "fetch docs",
                "shortlog docs d1..d2"
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_upper_bound_stops_before_secondaries() {
        let vcs = Arc::new(mock_vcs());
        let pipeline = AttributionPipeline::new(
            Arc::clone(&vcs),
            config(1),
            RawName,
            "v1.0".to_string(),
            "v9.9".to_string(),
        );

        let err = pipeline.extract().await.unwrap_err();

        assert!(matches!(err, LedgerError::UnknownVersion { ref reference, .. } if reference == "v9.9"));
        assert_eq!(err.severity().exit_code(), 0);
        assert_eq!(vcs.calls(), ["fetch core"]);
    }

    #[tokio::test]
    async fn test_transform_aggregates_and_sorts() {
        let pipeline = AttributionPipeline::new(
            Arc::new(mock_vcs()),
            config(1),
            RawName,
            "v1.0".to_string(),
            "v2.0".to_string(),
        );
        let summaries = pipeline.extract().await.unwrap();

        let report = pipeline.transform(summaries).await.unwrap();

        let entries: Vec<(String, u64)> = report
            .contributors
            .iter()
            .map(|e| (e.author.clone(), e.commits))
            .collect();
        assert_eq!(
            entries,
            [
                ("Alice".to_string(), 5),
                ("Bob".to_string(), 5),
                ("bob".to_string(), 1)
            ]
        );
        assert_eq!(report.total_commits, 11);
    }

    #[tokio::test]
    async fn test_transform_applies_aliases() {
        let aliases = AliasTable::new(HashMap::from([("bob".to_string(), "Bob".to_string())]));
        let pipeline = AttributionPipeline::new(
            Arc::new(mock_vcs()),
            config(1),
            aliases,
            "v1.0".to_string(),
            "v2.0".to_string(),
        )
        .with_order(SortOrder::Ascending);
        let summaries = pipeline.extract().await.unwrap();

        let report = pipeline.transform(summaries).await.unwrap();

        assert_eq!(report.contributor_count(), 2);
        assert_eq!(report.contributors[0].author, "Alice");
        assert_eq!(report.contributors[1].author, "Bob");
        assert_eq!(report.contributors[1].commits, 6);
    }

    #[tokio::test]
    async fn test_transform_sums_repeated_authors_across_ranges() {
        let pipeline = AttributionPipeline::new(
            Arc::new(mock_vcs()),
            config(1),
            RawName,
            "v1.0".to_string(),
            "v2.0".to_string(),
        );
        let summary = |repository: &str, output: &str| RangeSummary {
            range: RangeResolution {
                repository: repository.to_string(),
                lower: "a".to_string(),
                upper: "b".to_string(),
            },
            output: output.to_string(),
        };
        let summaries = vec![
            summary("core", "3\tAlice\n5\tBob\n"),
            summary("docs", "2\tAlice\n"),
        ];

        let report = pipeline.transform(summaries).await.unwrap();

        assert_eq!(
            report.contributors,
            [
                AuthorCount {
                    author: "Alice".to_string(),
                    commits: 5
                },
                AuthorCount {
                    author: "Bob".to_string(),
                    commits: 5
                },
            ]
        );
        assert_eq!(report.total_commits, 10);
        assert_eq!(report.ranges.len(), 2);
    }

    #[tokio::test]
    async fn test_transform_rejects_malformed_lines() {
        let pipeline = AttributionPipeline::new(
            Arc::new(mock_vcs()),
            config(1),
            RawName,
            "v1.0".to_string(),
            "v2.0".to_string(),
        );
        let summaries = vec![RangeSummary {
            range: RangeResolution {
                repository: "core".to_string(),
                lower: "v1.0".to_string(),
                upper: "v2.0".to_string(),
            },
            output: "garbage without a tab\n".to_string(),
        }];

        let err = pipeline.transform(summaries).await.unwrap_err();
        assert!(matches!(err, LedgerError::LogParse { .. }));
    }

    #[tokio::test]
    async fn test_parallel_extract_keeps_configured_order() {
        let mut vcs = mock_vcs();
        vcs.dates.insert(key("site", "s1"), day(2021, 1, 1));
        vcs.dates.insert(key("site", "s2"), day(2022, 12, 1));
        vcs.tags
            .insert("site".to_string(), vec!["s1".to_string(), "s2".to_string()]);
        let config = MockConfig {
            root: PathBuf::from("/work"),
            secondaries: vec!["docs".to_string(), "site".to_string()],
            jobs: 4,
        };
        let pipeline = AttributionPipeline::new(
            Arc::new(vcs),
            config,
            RawName,
            "v1.0".to_string(),
            "v2.0".to_string(),
        );

        let summaries = pipeline.extract().await.unwrap();

        let repos: Vec<&str> = summaries
            .iter()
            .map(|s| s.range.repository.as_str())
            .collect();
        assert_eq!(repos, ["core", "docs", "site"]);
        assert_eq!(summaries[2].range.revision_range(), "s1..s2");
    }
}
