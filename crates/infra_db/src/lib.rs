//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the billing ports, built on SQLx.
//!
//! # Tables
//!
//! - `billing_sync_records`: the send ledger, unique per broker invoice and key
//! - `billing_documents`: every document handed off, as JSONB, for reversal replay
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, health_check, run_migrations, DatabaseConfig, PgSyncLedger, PgDocumentArchive};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/billing")).await?;
//! run_migrations(&pool).await?;
//! health_check(&pool).await?;
//! let ledger = PgSyncLedger::new(pool.clone());
//! let archive = PgDocumentArchive::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;

pub use pool::{create_pool, health_check, run_migrations, DatabaseConfig, DatabasePool, MIN_POOL_CONNECTIONS};
pub use error::DatabaseError;
pub use repositories::{PgDocumentArchive, PgEntryLease, PgSyncLedger};
