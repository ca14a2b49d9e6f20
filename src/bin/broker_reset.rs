use clap::Parser;
use contrib_ledger::broker::{BrokerSettings, CredentialReset};
use contrib_ledger::utils::{logger, validation::Validate};
use contrib_ledger::TomlConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "broker-reset")]
#[command(about = "Replace the broker's default accounts with a generated administrator")]
struct Args {
    /// Path to a TOML configuration file with a [broker] section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Management API base URL
    #[arg(long)]
    url: Option<String>,

    /// Name of the administrator to provision
    #[arg(long)]
    admin_user: Option<String>,

    /// Readiness probes before the final attempt
    #[arg(long)]
    retries: Option<u32>,

    /// Seconds between readiness probes
    #[arg(long)]
    interval: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Resetting broker credentials at {}", settings.url);
    let reset = CredentialReset::new(settings)?;

    match reset.run().await {
        Ok(admin) => {
            println!("username: {}", admin.username);
            println!("password: {}", admin.password);
        }
        Err(e) => {
            tracing::error!(
                "❌ Credential reset failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code().max(1));
        }
    }

    Ok(())
}

fn load_settings(args: &Args) -> contrib_ledger::Result<BrokerSettings> {
    let file = match &args.config {
        Some(path) => {
            let file = TomlConfig::from_file(path)?;
            file.validate()?;
            Some(file)
        }
        None => None,
    };

    let mut settings =
        BrokerSettings::from_section(file.as_ref().and_then(|f| f.broker.as_ref()));
    if let Some(url) = &args.url {
        settings.url = url.clone();
    }
    if let Some(admin) = &args.admin_user {
        settings.admin_user = admin.clone();
    }
    if let Some(retries) = args.retries {
        settings.ready_retries = retries;
    }
    if let Some(interval) = args.interval {
        settings.ready_interval = Duration::from_secs(interval);
    }
    settings.validate()?;
    Ok(settings)
}
