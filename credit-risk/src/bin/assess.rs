//! Credit assessment binary
//!
//! Loads an account snapshot, runs one scoring and limit adjustment pass and
//! prints the assessment as JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use credit_ledger::Account;
use credit_risk::{config::CONFIG_PATH_ENV, Config, LimitAdjuster, Metrics};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "credit-assess")]
#[command(about = "Score a credit account and adjust its limit", long_about = None)]
#[command(version)]
struct Args {
    /// Account snapshot (JSON)
    account: PathBuf,

    /// Assessment time (RFC 3339); defaults to now
    #[arg(long)]
    as_of: Option<DateTime<Utc>>,

    /// Write the updated snapshot back to the account file
    #[arg(long)]
    write: bool,

    /// TOML configuration file
    #[arg(long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr after the run
    #[arg(long)]
    metrics: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env().context("loading config from environment")?,
    };

    let raw = std::fs::read_to_string(&args.account)
        .with_context(|| format!("reading {}", args.account.display()))?;
    let mut account = Account::from_json(&raw)
        .with_context(|| format!("restoring account from {}", args.account.display()))?;

    let metrics = Metrics::new().context("creating metrics")?;
    let adjuster = LimitAdjuster::from_config(&config)
        .context("building limit adjuster")?
        .with_metrics(metrics.clone());

    let as_of = args.as_of.unwrap_or_else(Utc::now);
    let assessment = adjuster
        .apply(&mut account, as_of)
        .with_context(|| format!("assessing account {}", account.id()))?;

    println!("{}", serde_json::to_string_pretty(&assessment)?);

    if args.write {
        let updated = account.to_json().context("serializing account")?;
        std::fs::write(&args.account, updated)
            .with_context(|| format!("writing {}", args.account.display()))?;
        tracing::info!(path = %args.account.display(), "Account snapshot written");
    }

    if args.metrics {
        eprint!("{}", metrics.render().context("rendering metrics")?);
    }

    Ok(())
}
