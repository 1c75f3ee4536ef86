//! Billing Worker Binary
//!
//! Runs one billing job and drops the resulting documents into the outbox.
//!
//! # Usage
//!
//! ```bash
//! billing-worker job.json
//! billing-worker --config worker.toml job.json
//! BILLING_OUTBOX_DIR=/var/spool/billing BILLING_DATABASE_URL=postgres://... billing-worker job.json
//! ```
//!
//! # Environment Variables
//!
//! * `BILLING_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `BILLING_OUTBOX_DIR` - Outbox directory (default: ./outbox)
//! * `BILLING_DATABASE_URL` - PostgreSQL connection string; in-memory ledger when unset
//! * `BILLING_BILLING__SENDER_CODE`, `BILLING_BILLING__PARTNER_CODE` - document envelope codes
//!
//! Exits non-zero when an entry aborts or any category fails; failed
//! categories are retried by the next run.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interface_worker::{build_generator, run_job, BillingJob, WorkerConfig};

/// Bills the entries of a job file and drops the documents into the outbox
#[derive(Debug, Parser)]
#[command(name = "billing-worker", version)]
struct Args {
    /// TOML configuration file, read before `BILLING_` environment variables
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON billing job
    #[arg(value_name = "JOB")]
    job: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = WorkerConfig::load(args.config.as_deref()).context("loading worker configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        job = %args.job.display(),
        outbox = %config.outbox_dir.display(),
        database = config.uses_database(),
        "Starting billing worker"
    );

    let job = BillingJob::load(&args.job).await?;
    let generator = build_generator(&config).await?;
    let summary = run_job(&generator, &job).await;

    for (entry_number, error) in &summary.aborted {
        tracing::error!(%entry_number, %error, "entry not billed");
    }

    if !summary.is_clean() {
        bail!(
            "billing incomplete: {} categories failed, {} entries aborted",
            summary.failed_count(),
            summary.aborted.len()
        );
    }

    tracing::info!(sent = summary.sent_count(), "Billing worker finished");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
