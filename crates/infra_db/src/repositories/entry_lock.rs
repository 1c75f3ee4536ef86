//! Per-entry advisory locks
//!
//! A billing run holds a transaction-scoped advisory lock keyed by the
//! entry number for its whole duration. Every worker sharing the database
//! waits on the same key, so one entry is billed by one run at a time.
//! Committing or dropping the transaction releases the lock; a crashed
//! worker releases it when its connection closes.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use core_kernel::PortError;
use domain_billing::EntryLease;

use crate::error::DatabaseError;

/// Advisory lock namespace of billing runs
const LOCK_NAMESPACE: &str = "billing_entry";

/// Lock statement: namespace and entry number hashed into the two-key form
const LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))";

/// Waits for the entry's advisory lock on a dedicated connection
pub async fn lock_entry(pool: &PgPool, entry_number: &str) -> Result<PgEntryLease, DatabaseError> {
    let mut tx = pool.begin().await.map_err(|e| DatabaseError::from(&e))?;

    debug!(entry_number, "waiting for entry advisory lock");
    sqlx::query(LOCK_SQL)
        .bind(LOCK_NAMESPACE)
        .bind(entry_number.trim())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

    Ok(PgEntryLease {
        tx,
        entry_number: entry_number.trim().to_string(),
    })
}

/// Held advisory lock of one entry
pub struct PgEntryLease {
    tx: Transaction<'static, Postgres>,
    entry_number: String,
}

impl PgEntryLease {
    pub fn entry_number(&self) -> &str {
        &self.entry_number
    }
}

#[async_trait]
impl EntryLease for PgEntryLease {
    async fn release(self: Box<Self>) -> Result<(), PortError> {
        let PgEntryLease { tx, entry_number } = *self;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        debug!(entry_number = %entry_number, "entry advisory lock released");
        Ok(())
    }
}
