//! In-memory adapters
//!
//! Back the billing ports with process memory. Used by the worker when no
//! database is configured and by the tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{BrokerInvoiceId, DocumentId, DomainPort, PortError};

use crate::document::GenericInvoiceDocument;
use crate::locks::EntryLocks;
use crate::ports::{DocumentArchivePort, EntryLease, OutboundTransport, SyncLedgerPort};
use crate::sync::{DocumentRef, SyncKey, SyncRecord};

/// Send ledger held in memory
///
/// Clones share records and entry locks.
#[derive(Debug, Default, Clone)]
pub struct InMemorySyncLedger {
    records: Arc<RwLock<HashMap<(BrokerInvoiceId, SyncKey), SyncRecord>>>,
    locks: EntryLocks,
}

impl InMemorySyncLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, in no particular order
    pub async fn records(&self) -> Vec<SyncRecord> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Entry lock registry shared by every clone
    pub fn locks(&self) -> &EntryLocks {
        &self.locks
    }
}

impl DomainPort for InMemorySyncLedger {}

#[async_trait]
impl SyncLedgerPort for InMemorySyncLedger {
    async fn lock_entry(&self, entry_number: &str) -> Result<Box<dyn EntryLease>, PortError> {
        Ok(Box::new(self.locks.acquire(entry_number).await))
    }

    async fn find(
        &self,
        broker_invoice_id: BrokerInvoiceId,
        key: SyncKey,
    ) -> Result<Option<SyncRecord>, PortError> {
        Ok(self.records.read().await.get(&(broker_invoice_id, key)).cloned())
    }

    async fn find_for_invoice(&self, broker_invoice_id: BrokerInvoiceId) -> Result<Vec<SyncRecord>, PortError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.broker_invoice_id == broker_invoice_id)
            .cloned()
            .collect())
    }

    async fn save(&self, record: &SyncRecord) -> Result<(), PortError> {
        self.records
            .write()
            .await
            .insert((record.broker_invoice_id, record.sync_key), record.clone());
        Ok(())
    }
}

/// Document archive held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentArchive {
    documents: Arc<RwLock<HashMap<DocumentId, GenericInvoiceDocument>>>,
}

impl InMemoryDocumentArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a document, simulating an archive that has lost it
    pub async fn evict(&self, document_id: DocumentId) -> Option<GenericInvoiceDocument> {
        self.documents.write().await.remove(&document_id)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

impl DomainPort for InMemoryDocumentArchive {}

#[async_trait]
impl DocumentArchivePort for InMemoryDocumentArchive {
    async fn store(&self, document: &GenericInvoiceDocument) -> Result<DocumentRef, PortError> {
        self.documents.write().await.insert(document.id, document.clone());
        Ok(DocumentRef {
            document_id: document.id,
            file_name: document.file_name().to_string(),
        })
    }

    async fn fetch(&self, document_id: DocumentId) -> Result<Option<GenericInvoiceDocument>, PortError> {
        Ok(self.documents.read().await.get(&document_id).cloned())
    }
}

/// A file handed to [`MemoryTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredFile {
    pub file_name: String,
    pub payload: Vec<u8>,
}

/// Transport that keeps delivered files in memory and can be told to fail
///
/// Like the outbox, it refuses a file name it has already accepted.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    delivered: Arc<RwLock<Vec<DeliveredFile>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every delivery fails with a transient error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn delivered(&self) -> Vec<DeliveredFile> {
        self.delivered.read().await.clone()
    }

    /// Delivered payloads decoded as UTF-8
    pub async fn delivered_xml(&self) -> Vec<String> {
        self.delivered
            .read()
            .await
            .iter()
            .map(|f| String::from_utf8_lossy(&f.payload).into_owned())
            .collect()
    }
}

impl DomainPort for MemoryTransport {}

#[async_trait]
impl OutboundTransport for MemoryTransport {
    async fn deliver(&self, file_name: &str, payload: &[u8]) -> Result<(), PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "memory transport".to_string(),
            });
        }
        let mut delivered = self.delivered.write().await;
        if delivered.iter().any(|f| f.file_name == file_name) {
            return Err(PortError::conflict(format!("{} already delivered", file_name)));
        }
        delivered.push(DeliveredFile {
            file_name: file_name.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
