use clap::Parser;
use contrib_ledger::core::SortOrder;
use contrib_ledger::utils::{logger, validation::Validate};
use contrib_ledger::{
    AttributionPipeline, CliConfig, GitCli, LedgerError, ReportEngine, ReportSettings, TomlConfig,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);
    tracing::debug!("CLI config: {:?}", config);

    let settings = match load_settings(&config) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code().max(1));
        }
    };

    let (from, to) = settings.versions(config.from.clone(), config.to.clone());
    let order = if config.ascending {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    };

    let normalizer = settings.alias_table();
    if !normalizer.is_empty() {
        tracing::debug!("Normalizing author names through {} aliases", settings.aliases.len());
    }
    let pipeline = AttributionPipeline::new(Arc::new(GitCli::new()), settings, normalizer, from, to)
        .with_order(order)
        .with_format(config.format);
    let engine = ReportEngine::new(pipeline);

    match engine.run().await {
        Ok(report) => {
            print!("{}", report);
        }
        Err(e) => {
            tracing::error!(
                "❌ Report failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );

            eprintln!("❌ {}", e.user_friendly_message());
            if !matches!(e, LedgerError::UnknownVersion { .. }) {
                eprintln!("💡 {}", e.recovery_suggestion());
            }

            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn load_settings(config: &CliConfig) -> contrib_ledger::Result<ReportSettings> {
    let file = match &config.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            let file = TomlConfig::from_file(path)?;
            file.validate()?;
            Some(file)
        }
        None => None,
    };

    let cwd = std::env::current_dir()?;
    let checkout = GitCli::new().toplevel(&cwd)?.unwrap_or(cwd);
    tracing::debug!("Primary checkout: {}", checkout.display());
    let settings = ReportSettings::from_sources(file.as_ref(), &checkout)?
        .with_root(config.root.clone())
        .with_jobs(config.jobs)
        .with_fetch(!config.no_fetch);
    settings.validate()?;
    Ok(settings)
}
