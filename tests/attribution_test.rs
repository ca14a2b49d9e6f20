use chrono::NaiveDate;
use contrib_ledger::core::identity::RawName;
use contrib_ledger::core::resolve::preceding_release_tag;
use contrib_ledger::core::{ConfigProvider, Pipeline, SortOrder, VersionControl};
use contrib_ledger::domain::model::{Report, RepoDescriptor};
use contrib_ledger::{AttributionPipeline, LedgerError, ReportEngine, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A linear history per repository: commits in order plus tags pointing at them.
#[derive(Default, Clone)]
struct History {
    commits: Vec<(NaiveDate, &'static str)>,
    tags: Vec<(&'static str, usize)>,
}

impl History {
    fn index_of(&self, reference: &str) -> Option<usize> {
        if reference == "main" {
            return self.commits.len().checked_sub(1);
        }
        self.tags
            .iter()
            .find(|(tag, _)| *tag == reference)
            .map(|(_, index)| *index)
    }
}

#[derive(Default)]
struct SimulatedGit {
    repos: HashMap<String, History>,
    fetched: Mutex<Vec<String>>,
}

impl SimulatedGit {
    fn history(&self, repo: &RepoDescriptor) -> &History {
        self.repos.get(&repo.name).expect("unknown repository")
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl VersionControl for SimulatedGit {
    fn fetch(&self, repo: &RepoDescriptor) -> Result<()> {
        self.fetched.lock().unwrap().push(repo.name.clone());
        Ok(())
    }

    fn list_tags(&self, repo: &RepoDescriptor) -> Result<Vec<String>> {
        Ok(self
            .history(repo)
            .tags
            .iter()
            .map(|(tag, _)| tag.to_string())
            .collect())
    }

    fn commit_date(&self, repo: &RepoDescriptor, reference: &str) -> Result<Option<NaiveDate>> {
        let history = self.history(repo);
        Ok(history
            .index_of(reference)
            .map(|index| history.commits[index].0))
    }

    fn shortlog(&self, repo: &RepoDescriptor, lower: &str, upper: &str) -> Result<String> {
        let history = self.history(repo);
        let lower = history.index_of(lower).expect("lower exists");
        let upper = history.index_of(upper).expect("upper exists");

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for (_, author) in history.commits.iter().take(upper + 1).skip(lower + 1) {
            *counts.entry(*author).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(author, count)| format!("{:>6}\t{}\n", count, author))
            .collect())
    }
}

struct Settings {
    root: PathBuf,
    secondaries: Vec<String>,
    jobs: usize,
}

impl ConfigProvider for Settings {
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

fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap() + chrono::Days::new(offset as u64)
}

fn simulated() -> Arc<SimulatedGit> {
    let authors = ["Alice", "Bob", "Carol", "Dan"];
    let mut git = SimulatedGit::default();

    // core: one commit every 3 days, tagged every 10 commits
    let mut core = History::default();
    for i in 0..60u32 {
        core.commits.push((day(i * 3), authors[(i % 3) as usize]));
    }
    core.tags = vec![("v1", 0), ("v2", 10), ("v3", 20), ("v4", 30), ("v5", 45), ("v6", 59)];
    git.repos.insert("core".to_string(), core);

    // docs: one commit a day, tagged weekly; starts before core's first release
    let mut docs = History::default();
    for i in 0..200u32 {
        docs.commits.push((day(i).pred_opt().unwrap(), authors[(i % 4) as usize]));
    }
    docs.tags = (0..200).step_by(7).map(|i| (leak_tag("d", i), i)).collect();
    git.repos.insert("docs".to_string(), docs);

    Arc::new(git)
}

fn leak_tag(prefix: &str, index: usize) -> &'static str {
    Box::leak(format!("{}{}", prefix, index).into_boxed_str())
}

fn settings(jobs: usize) -> Settings {
    Settings {
        root: PathBuf::from("/work"),
        secondaries: vec!["docs".to_string()],
        jobs,
    }
}

async fn report(git: &Arc<SimulatedGit>, from: &str, to: &str) -> Report {
    let pipeline = AttributionPipeline::new(
        Arc::clone(git),
        settings(1),
        RawName,
        from.to_string(),
        to.to_string(),
    );
    let summaries = pipeline.extract().await.unwrap();
    pipeline.transform(summaries).await.unwrap()
}

fn totals(report: &Report) -> HashMap<String, u64> {
    report
        .contributors
        .iter()
        .map(|entry| (entry.author.clone(), entry.commits))
        .collect()
}

#[tokio::test]
async fn ledger_is_additive_over_adjacent_windows() {
    let git = simulated();
    let whole = totals(&report(&git, "v2", "v6").await);

    for midpoint in ["v3", "v4", "v5"] {
        let left = totals(&report(&git, "v2", midpoint).await);
        let right = totals(&report(&git, midpoint, "v6").await);

        let mut summed: HashMap<String, u64> = left;
        for (author, commits) in right {
            *summed.entry(author).or_insert(0) += commits;
        }
        assert_eq!(summed, whole, "split at {}", midpoint);
    }
}

#[tokio::test]
async fn report_lists_primary_then_secondary_ranges() {
    let git = simulated();
    let report = report(&git, "v2", "v3").await;

    assert_eq!(report.ranges.len(), 2);
    assert_eq!(report.ranges[0].repository, "core");
    assert_eq!(report.ranges[0].revision_range(), "v2..v3");
    assert_eq!(report.ranges[1].repository, "docs");
    // core v2 is day 30, v3 is day 60; docs tags before those are d28 and d56
    assert_eq!(report.ranges[1].revision_range(), "d28..d56");
    assert_eq!(git.fetched(), ["core", "docs"]);
}

#[tokio::test]
async fn resolution_never_moves_backwards() {
    let git = simulated();
    let docs = RepoDescriptor::sibling(Path::new("/work"), "docs");
    let order = git.list_tags(&docs).unwrap();

    let mut previous = 0;
    for offset in 1..190 {
        let tag = preceding_release_tag(git.as_ref(), &docs, day(offset), None).unwrap();
        let position = order.iter().position(|t| *t == tag).unwrap();
        assert!(position >= previous);
        previous = position;
    }
}

#[tokio::test]
async fn missing_upper_bound_exits_cleanly_without_touching_secondaries() {
    let git = simulated();
    let pipeline = AttributionPipeline::new(
        Arc::clone(&git),
        settings(1),
        RawName,
        "v2".to_string(),
        "v99".to_string(),
    );

    let err = ReportEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(err, LedgerError::UnknownVersion { .. }));
    assert!(err.user_friendly_message().contains("doesn't exist"));
    assert_eq!(err.severity().exit_code(), 0);
    assert_eq!(git.fetched(), ["core"]);
}

#[tokio::test]
async fn window_before_first_secondary_release_is_fatal() {
    let git = simulated();
    // core v1 is day 0 while the only docs tag is dated day 5
    let mut early = SimulatedGit::default();
    let mut docs = History::default();
    docs.commits.push((day(5), "Alice"));
    docs.tags.push(("d0", 0));
    early.repos.insert("docs".to_string(), docs);
    early
        .repos
        .insert("core".to_string(), git.repos["core"].clone());

    let pipeline = AttributionPipeline::new(
        Arc::new(early),
        settings(1),
        RawName,
        "v1".to_string(),
        "v2".to_string(),
    );

    let err = pipeline.extract().await.unwrap_err();
    assert!(
        matches!(err, LedgerError::NoPrecedingTag { ref repository, .. } if repository == "docs")
    );
    assert_eq!(err.severity().exit_code(), 1);
}

#[tokio::test]
async fn concurrent_fan_out_matches_sequential_report() {
    let git = simulated();
    let secondaries = vec!["docs".to_string(), "core".to_string(), "docs".to_string()];

    let mut reports = Vec::new();
    for jobs in [1, 4] {
        let config = Settings {
            root: PathBuf::from("/work"),
            secondaries: secondaries.clone(),
            jobs,
        };
        let pipeline = AttributionPipeline::new(
            Arc::clone(&git),
            config,
            RawName,
            "v2".to_string(),
            "v5".to_string(),
        )
        .with_order(SortOrder::Ascending);
        let summaries = pipeline.extract().await.unwrap();
        reports.push(pipeline.transform(summaries).await.unwrap());
    }

    assert_eq!(reports[0], reports[1]);
    let repos: Vec<&str> = reports[1]
        .ranges
        .iter()
        .map(|range| range.repository.as_str())
        .collect();
    assert_eq!(repos, ["core", "docs", "core", "docs"]);
}
