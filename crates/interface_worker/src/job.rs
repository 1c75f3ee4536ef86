//! Billing jobs
//!
//! A job file is JSON holding the snapshots to bill:
//!
//! ```json
//! { "entries": [ { "entry": { ... }, "broker_invoices": [ ... ], "manifests": [ ... ] } ] }
//! ```
//!
//! Entries are billed one after another. A failing entry is logged and
//! the job moves on; the summary says which entries did not complete.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use domain_billing::memory::{InMemoryDocumentArchive, InMemorySyncLedger};
use domain_billing::{BillingGenerator, BillingRunReport, DocumentArchivePort, SyncLedgerPort};
use domain_customs::EntrySnapshot;
use infra_db::{create_pool, health_check, run_migrations, DatabaseConfig, PgDocumentArchive, PgSyncLedger};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::transport::FileDropTransport;

/// Snapshots to bill in one invocation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingJob {
    pub entries: Vec<EntrySnapshot>,
}

impl BillingJob {
    /// Reads and decodes a job file
    pub async fn load(path: &Path) -> Result<Self, WorkerError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| WorkerError::JobRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&raw).map_err(|message| WorkerError::JobFormat {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }
}

/// Result of a whole job
#[derive(Debug, Default)]
pub struct JobSummary {
    pub reports: Vec<BillingRunReport>,
    /// Entry number and error for entries whose run aborted
    pub aborted: Vec<(String, String)>,
}

impl JobSummary {
    pub fn sent_count(&self) -> usize {
        self.reports.iter().map(BillingRunReport::sent_count).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.reports.iter().map(BillingRunReport::failed_count).sum()
    }

    /// True when every entry ran and no category failed
    pub fn is_clean(&self) -> bool {
        self.aborted.is_empty() && self.failed_count() == 0
    }
}

/// Builds the generator: PostgreSQL ledger and archive when a database is
/// configured, in-memory ones otherwise; documents go to the outbox
pub async fn build_generator(config: &WorkerConfig) -> Result<BillingGenerator, WorkerError> {
    let transport = FileDropTransport::new(&config.outbox_dir);
    transport.ensure_outbox().await?;

    let ledger: Arc<dyn SyncLedgerPort>;
    let archive: Arc<dyn DocumentArchivePort>;
    match config.database_url.as_deref().filter(|_| config.uses_database()) {
        Some(url) => {
            let pool = create_pool(DatabaseConfig::new(url)).await?;
            let latency = health_check(&pool).await?;
            info!(latency_ms = latency.as_millis() as u64, "database reachable");
            run_migrations(&pool).await?;
            ledger = Arc::new(PgSyncLedger::new(pool.clone()));
            archive = Arc::new(PgDocumentArchive::new(pool));
        }
        None => {
            warn!("no database configured; send ledger is kept in memory for this run only");
            ledger = Arc::new(InMemorySyncLedger::new());
            archive = Arc::new(InMemoryDocumentArchive::new());
        }
    }

    Ok(BillingGenerator::new(
        config.billing.clone(),
        ledger,
        archive,
        Arc::new(transport),
    ))
}

/// Bills every entry of the job
#[instrument(skip_all, fields(entries = job.entries.len()))]
pub async fn run_job(generator: &BillingGenerator, job: &BillingJob) -> JobSummary {
    let mut summary = JobSummary::default();

    for snapshot in &job.entries {
        let entry_number = snapshot.entry.entry_number.clone();
        match generator.run(snapshot).await {
            Ok(report) => summary.reports.push(report),
            Err(err) => {
                error!(entry_number = %entry_number, error = %err, "entry billing aborted");
                summary.aborted.push((entry_number, err.to_string()));
            }
        }
    }

    info!(
        sent = summary.sent_count(),
        failed = summary.failed_count(),
        aborted = summary.aborted.len(),
        "billing job finished"
    );
    summary
}
