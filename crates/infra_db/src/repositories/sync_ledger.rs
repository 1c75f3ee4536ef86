//! Send ledger repository
//!
//! Records are upserted on `(broker_invoice_id, sync_key)`, so a record
//! created by a failed attempt is updated in place when a later run sends.
//! Entry locks are PostgreSQL advisory locks (see [`super::entry_lock`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{BrokerInvoiceId, DocumentId, DomainPort, PortError, SyncRecordId};
use domain_billing::{DocumentRef, EntryLease, SyncKey, SyncLedgerPort, SyncRecord};

use crate::error::DatabaseError;
use crate::repositories::entry_lock;

const SELECT_COLUMNS: &str = "id, broker_invoice_id, sync_key, sent_at, confirmed_at, failure_message, \
     document_id, document_file_name, created_at, updated_at";

/// PostgreSQL-backed send ledger
#[derive(Debug, Clone)]
pub struct PgSyncLedger {
    pool: PgPool,
}

impl PgSyncLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one(
        &self,
        broker_invoice_id: BrokerInvoiceId,
        key: SyncKey,
    ) -> Result<Option<SyncRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM billing_sync_records WHERE broker_invoice_id = $1 AND sync_key = $2",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, SyncRecordRow>(&sql)
            .bind(Uuid::from(broker_invoice_id))
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from(&e))?;

        row.map(SyncRecord::try_from).transpose()
    }

    async fn fetch_for_invoice(&self, broker_invoice_id: BrokerInvoiceId) -> Result<Vec<SyncRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM billing_sync_records WHERE broker_invoice_id = $1 ORDER BY created_at",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, SyncRecordRow>(&sql)
            .bind(Uuid::from(broker_invoice_id))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from(&e))?;

        rows.into_iter().map(SyncRecord::try_from).collect()
    }

    async fn upsert(&self, record: &SyncRecord) -> Result<(), DatabaseError> {
        let row = SyncRecordRow::from(record);
        sqlx::query(
            r#"
            INSERT INTO billing_sync_records (
                id, broker_invoice_id, sync_key, sent_at, confirmed_at, failure_message,
                document_id, document_file_name, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (broker_invoice_id, sync_key) DO UPDATE SET
                sent_at = EXCLUDED.sent_at,
                confirmed_at = EXCLUDED.confirmed_at,
                failure_message = EXCLUDED.failure_message,
                document_id = EXCLUDED.document_id,
                document_file_name = EXCLUDED.document_file_name,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(row.id)
        .bind(row.broker_invoice_id)
        .bind(&row.sync_key)
        .bind(row.sent_at)
        .bind(row.confirmed_at)
        .bind(&row.failure_message)
        .bind(row.document_id)
        .bind(&row.document_file_name)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

        Ok(())
    }
}

impl DomainPort for PgSyncLedger {}

#[async_trait]
impl SyncLedgerPort for PgSyncLedger {
    #[instrument(skip(self))]
    async fn lock_entry(&self, entry_number: &str) -> Result<Box<dyn EntryLease>, PortError> {
        Ok(Box::new(entry_lock::lock_entry(&self.pool, entry_number).await?))
    }

    #[instrument(skip(self), fields(broker_invoice_id = %broker_invoice_id, key = %key))]
    async fn find(
        &self,
        broker_invoice_id: BrokerInvoiceId,
        key: SyncKey,
    ) -> Result<Option<SyncRecord>, PortError> {
        Ok(self.fetch_one(broker_invoice_id, key).await?)
    }

    async fn find_for_invoice(&self, broker_invoice_id: BrokerInvoiceId) -> Result<Vec<SyncRecord>, PortError> {
        Ok(self.fetch_for_invoice(broker_invoice_id).await?)
    }

    #[instrument(skip_all, fields(broker_invoice_id = %record.broker_invoice_id, key = %record.sync_key))]
    async fn save(&self, record: &SyncRecord) -> Result<(), PortError> {
        self.upsert(record).await?;
        debug!(sent = record.is_sent(), failed = record.is_failed(), "ledger record saved");
        Ok(())
    }
}

/// Database row for `billing_sync_records`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SyncRecordRow {
    pub id: Uuid,
    pub broker_invoice_id: Uuid,
    pub sync_key: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub failure_message: Option<String>,
    pub document_id: Option<Uuid>,
    pub document_file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SyncRecord> for SyncRecordRow {
    fn from(record: &SyncRecord) -> Self {
        Self {
            id: Uuid::from(record.id),
            broker_invoice_id: Uuid::from(record.broker_invoice_id),
            sync_key: record.sync_key.as_str().to_string(),
            sent_at: record.sent_at,
            confirmed_at: record.confirmed_at,
            failure_message: record.failure_message.clone(),
            document_id: record.document.as_ref().map(|d| Uuid::from(d.document_id)),
            document_file_name: record.document.as_ref().map(|d| d.file_name.clone()),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl TryFrom<SyncRecordRow> for SyncRecord {
    type Error = DatabaseError;

    fn try_from(row: SyncRecordRow) -> Result<Self, Self::Error> {
        let sync_key = row.sync_key.parse::<SyncKey>().map_err(DatabaseError::SerializationError)?;

        // Both document columns are written together
        let document = match (row.document_id, row.document_file_name) {
            (Some(id), Some(file_name)) => Some(DocumentRef {
                document_id: DocumentId::from(id),
                file_name,
            }),
            (None, None) => None,
            _ => {
                return Err(DatabaseError::SerializationError(format!(
                    "sync record {} has a partial document reference",
                    row.id
                )))
            }
        };

        Ok(SyncRecord {
            id: SyncRecordId::from(row.id),
            broker_invoice_id: BrokerInvoiceId::from(row.broker_invoice_id),
            sync_key,
            sent_at: row.sent_at,
            confirmed_at: row.confirmed_at,
            failure_message: row.failure_message,
            document,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
