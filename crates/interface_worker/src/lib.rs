//! Billing Worker
//!
//! Wires the billing generator to its adapters and runs billing jobs.
//!
//! # Modules
//!
//! - `config`: worker configuration (TOML file, `BILLING_` environment, `.env`)
//! - `transport`: outbox directory file drop
//! - `job`: billing job files and the job runner
//! - `error`: worker error type

pub mod config;
pub mod transport;
pub mod job;
pub mod error;

pub use config::WorkerConfig;
pub use transport::FileDropTransport;
pub use job::{build_generator, run_job, BillingJob, JobSummary};
pub use error::WorkerError;
