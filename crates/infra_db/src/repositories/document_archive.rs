//! Document archive repository
//!
//! Documents are stored whole as JSONB. Replaying a reversal reads the
//! body back exactly as it was sent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DocumentId, DomainPort, PortError};
use domain_billing::{DocumentArchivePort, DocumentRef, GenericInvoiceDocument};

use crate::error::DatabaseError;

/// PostgreSQL-backed document archive
#[derive(Debug, Clone)]
pub struct PgDocumentArchive {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    body: Json<GenericInvoiceDocument>,
}

impl PgDocumentArchive {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, document: &GenericInvoiceDocument) -> Result<(), DatabaseError> {
        let created_at: DateTime<Utc> = document.transaction.created_at;
        sqlx::query(
            r#"
            INSERT INTO billing_documents (id, broker_invoice_id, category, file_name, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(document.id))
        .bind(Uuid::from(document.broker_invoice_id))
        .bind(document.category.as_str())
        .bind(document.file_name())
        .bind(Json(document))
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

        Ok(())
    }

    async fn select(&self, document_id: DocumentId) -> Result<Option<GenericInvoiceDocument>, DatabaseError> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT body FROM billing_documents WHERE id = $1")
            .bind(Uuid::from(document_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                    DatabaseError::SerializationError(e.to_string())
                }
                other => DatabaseError::from(&other),
            })?;

        Ok(row.map(|r| r.body.0))
    }
}

impl DomainPort for PgDocumentArchive {}

#[async_trait]
impl DocumentArchivePort for PgDocumentArchive {
    #[instrument(skip_all, fields(document_id = %document.id, file_name = %document.file_name()))]
    async fn store(&self, document: &GenericInvoiceDocument) -> Result<DocumentRef, PortError> {
        self.insert(document).await?;
        debug!("document archived");
        Ok(DocumentRef {
            document_id: document.id,
            file_name: document.file_name().to_string(),
        })
    }

    #[instrument(skip(self), fields(document_id = %document_id))]
    async fn fetch(&self, document_id: DocumentId) -> Result<Option<GenericInvoiceDocument>, PortError> {
        Ok(self.select(document_id).await?)
    }
}
