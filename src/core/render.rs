use crate::domain::model::Report;
use crate::utils::error::{LedgerError, Result};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Csv => render_csv(report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

fn render_text(report: &Report) -> String {
    let mut out = String::new();
    for range in &report.ranges {
        let _ = writeln!(out, "{}: {}", range.repository, range.revision_range());
    }
    out.push('\n');

    let width = report
        .contributors
        .iter()
        .map(|entry| entry.commits.to_string().len())
        .max()
        .unwrap_or(1);
    for entry in &report.contributors {
        let _ = writeln!(out, "{:>width$}  {}", entry.commits, entry.author, width = width);
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "{} contributors, {} commits",
        report.contributor_count(),
        report.total_commits
    );
    out
}

fn render_csv(report: &Report) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["author", "commits"])?;
    for entry in &report.contributors {
        let commits = entry.commits.to_string();
        writer.write_record([entry.author.as_str(), commits.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| LedgerError::IoError(std::io::Error::other(e)))
}
