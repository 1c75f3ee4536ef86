//! Billing Domain Ports
//!
//! The generator talks to the outside world through three ports:
//!
//! - **SyncLedgerPort**: send state per broker invoice and key, and the
//!   per-entry lock that keeps two runs of one entry from sending twice
//! - **DocumentArchivePort**: every document that was sent, for replay
//! - **OutboundTransport**: hands a rendered document to the delivery channel
//!
//! Adapters: in-memory (`crate::memory`), PostgreSQL (`infra_db`) and the
//! outbox directory drop (`interface_worker`).
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_billing::{BillingGenerator, BillingConfig};
//! use std::sync::Arc;
//!
//! let generator = BillingGenerator::new(
//!     BillingConfig::default(),
//!     Arc::new(PgSyncLedger::new(pool.clone())),
//!     Arc::new(PgDocumentArchive::new(pool)),
//!     Arc::new(FileDropTransport::new(outbox)),
//! );
//! ```

use async_trait::async_trait;

use core_kernel::{BrokerInvoiceId, DocumentId, DomainPort, PortError};

use crate::document::GenericInvoiceDocument;
use crate::sync::{DocumentRef, SyncKey, SyncRecord};

/// Exclusive hold on one entry, taken from the ledger
///
/// Dropping a lease releases it as well; `release` reports whether the
/// store acknowledged the release.
#[async_trait]
pub trait EntryLease: Send {
    async fn release(self: Box<Self>) -> Result<(), PortError>;
}

/// Persistent send ledger
#[async_trait]
pub trait SyncLedgerPort: DomainPort {
    /// Waits until no other run holds `entry_number`, then holds it
    ///
    /// Every run against the same ledger store goes through this lock, so
    /// generators in different processes never bill one entry at once.
    async fn lock_entry(&self, entry_number: &str) -> Result<Box<dyn EntryLease>, PortError>;

    /// Record for one invoice and key, if it was ever attempted
    async fn find(
        &self,
        broker_invoice_id: BrokerInvoiceId,
        key: SyncKey,
    ) -> Result<Option<SyncRecord>, PortError>;

    /// All records of one invoice
    async fn find_for_invoice(&self, broker_invoice_id: BrokerInvoiceId) -> Result<Vec<SyncRecord>, PortError>;

    /// Inserts or replaces the record for its (invoice, key)
    async fn save(&self, record: &SyncRecord) -> Result<(), PortError>;
}

/// Archive of sent documents
#[async_trait]
pub trait DocumentArchivePort: DomainPort {
    /// Stores a document and returns the reference kept on the ledger
    async fn store(&self, document: &GenericInvoiceDocument) -> Result<DocumentRef, PortError>;

    /// Fetches a stored document; `None` when it is no longer available
    async fn fetch(&self, document_id: DocumentId) -> Result<Option<GenericInvoiceDocument>, PortError>;
}

/// Delivery channel for rendered documents
#[async_trait]
pub trait OutboundTransport: DomainPort {
    /// Delivers `payload` under `file_name`
    async fn deliver(&self, file_name: &str, payload: &[u8]) -> Result<(), PortError>;
}
