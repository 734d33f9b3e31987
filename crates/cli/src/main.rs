//! `browscap`: import the Browscap catalog and classify user agents from the
//! command line.

mod error;
mod trace;

use browscap_config::Config;
use browscap_service::{Browscap, ImportOutcome, Schedule, Trigger};
use browscap_source::{FixtureSource, HttpSource, SourceHandle};
use browscap_store::{CacheTable, Database, Marker, Repository};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use time::format_description::well_known::Rfc3339;

use crate::error::{ErrorKind, Result};

#[derive(Debug, Parser)]
#[command(name = "browscap", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true, env = "BROWSCAP_CONFIG")]
    config: Option<PathBuf>,
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import the newest catalog version, if there is one.
    Import {
        /// Import from a local file instead of the configured URLs.
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Only import when the refresh schedule says so, and only log.
        #[arg(long)]
        scheduled: bool,
    },
    /// Print the properties of a user agent as JSON.
    Classify {
        /// Omit to classify the "Default Browser" placeholder.
        user_agent: Option<String>,
    },
    /// Show which catalog version is stored.
    Status,
    /// Forget every cached classification.
    ClearCache,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    trace::init(cli.verbose);
    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            tracing::debug!(?error, "browscap failed");
            eprintln!("error: {}", &*error);
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let db = open_database(&config).await?;
    let ttl = time::Duration::try_from(StdDuration::from_secs(config.lookup.cache_ttl)).or_raise(|| ErrorKind::Config)?;
    let browscap =
        Browscap::new(Arc::new(Repository::from(&db)), Arc::new(CacheTable::from(&db))).with_cache_ttl(ttl);

    let code = match cli.command {
        Command::Import { fixture, scheduled } => import(&browscap, &config, fixture, scheduled).await?,
        Command::Classify { user_agent } => {
            let properties = browscap.classify(user_agent.as_deref()).await.or_raise(|| ErrorKind::Service)?;
            let json = serde_json::to_string_pretty(&properties).or_raise(|| ErrorKind::Output)?;
            writeln!(std::io::stdout(), "{json}").or_raise(|| ErrorKind::Output)?;
            ExitCode::SUCCESS
        },
        Command::Status => {
            let marker = browscap.status().await.or_raise(|| ErrorKind::Service)?;
            writeln!(std::io::stdout(), "{}", describe(marker.as_ref())).or_raise(|| ErrorKind::Output)?;
            ExitCode::SUCCESS
        },
        Command::ClearCache => {
            browscap.invalidate_cache().await.or_raise(|| ErrorKind::Service)?;
            ExitCode::SUCCESS
        },
    };
    db.close().await;
    Ok(code)
}

async fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
    }
    Database::connect(&config.database).await.or_raise(|| ErrorKind::Database)
}

async fn import(browscap: &Browscap, config: &Config, fixture: Option<PathBuf>, scheduled: bool) -> Result<ExitCode> {
    let source: SourceHandle = match fixture {
        Some(path) => {
            let local = browscap.status().await.or_raise(|| ErrorKind::Service)?.map(|m| m.version);
            Arc::new(FixtureSource::new(path).newer_than(local.as_deref()))
        },
        None => Arc::new(
            HttpSource::new(&config.source.version_url, &config.source.data_url)
                .or_raise(|| ErrorKind::Source)?
                .with_timeouts(
                    StdDuration::from_secs(config.source.version_timeout),
                    StdDuration::from_secs(config.source.data_timeout),
                ),
        ),
    };

    let (outcome, trigger) = if scheduled {
        let schedule = Schedule::new(config.updates.enabled, StdDuration::from_secs(config.updates.interval));
        match browscap.import_if_due(source.as_ref(), &schedule).await.or_raise(|| ErrorKind::Service)? {
            Some(outcome) => (outcome, Trigger::Scheduled),
            None => return Ok(ExitCode::SUCCESS),
        }
    } else {
        (browscap.import(source.as_ref(), Trigger::Manual).await, Trigger::Manual)
    };

    if let Some(message) = outcome.message(trigger) {
        writeln!(std::io::stdout(), "{message}").or_raise(|| ErrorKind::Output)?;
    }
    Ok(exit_code(&outcome))
}

fn exit_code(outcome: &ImportOutcome) -> ExitCode {
    if outcome.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn describe(marker: Option<&Marker>) -> String {
    match marker {
        None => "Never fetched".to_string(),
        Some(marker) => {
            let imported_at = marker
                .imported_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| marker.imported_at.unix_timestamp().to_string());
            format!("Version {} (imported {imported_at})", marker.version)
        },
    }
}
