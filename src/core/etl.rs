use crate::core::Pipeline;
use crate::utils::error::Result;

/// Drives a pipeline through extract, transform and load.
pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Collecting history...");
        let summaries = self.pipeline.extract().await?;
        tracing::info!("Resolved {} repository ranges", summaries.len());

        let report = self.pipeline.transform(summaries).await?;
        tracing::info!(
            "Tallied {} contributors over {} commits",
            report.contributor_count(),
            report.total_commits
        );

        self.pipeline.load(report).await
    }
}
