//! Billing Domain - Outbound Billing Documents
//!
//! This crate turns broker invoices on a customs entry into outbound
//! generic invoice documents, exactly once per invoice and charge category.
//!
//! # Components
//!
//! - **Classifier**: sorts broker charge codes into duty-level, container-level
//!   and skipped charges
//! - **Proration**: penny-exact weight split of container charges
//! - **Builder**: DUTY and CONTAINER line items from matched invoice lines
//! - **Send ledger**: per-invoice, per-category send state (idempotency guard)
//! - **Generator**: the run itself, including reversal replay for credits
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingConfig, BillingGenerator};
//! use domain_billing::memory::{InMemoryDocumentArchive, InMemorySyncLedger, MemoryTransport};
//! use std::sync::Arc;
//!
//! let generator = BillingGenerator::new(
//!     BillingConfig::default(),
//!     Arc::new(InMemorySyncLedger::new()),
//!     Arc::new(InMemoryDocumentArchive::new()),
//!     Arc::new(MemoryTransport::new()),
//! );
//!
//! let report = generator.run(&snapshot).await?;
//! ```

pub mod config;
pub mod classifier;
pub mod proration;
pub mod document;
pub mod xml;
pub mod sync;
pub mod ports;
pub mod memory;
pub mod reversal;
pub mod builder;
pub mod generator;
pub mod locks;
pub mod error;

pub use config::{BillingConfig, ChargeCodeTable, CombinedTaxSplit, DutyCode, DutyComponent};
pub use classifier::{ChargeCategory, ChargeClassifier, Classification, TaxSplit, split_combined_tax};
pub use proration::prorate;
pub use document::{
    ChargeField, ChargePurpose, DocumentCategory, GenericInvoiceDocument, InvoiceLineItem, TransactionHeader,
};
pub use sync::{DocumentRef, SyncKey, SyncRecord, SyncState};
pub use ports::{DocumentArchivePort, EntryLease, OutboundTransport, SyncLedgerPort};
pub use reversal::reversal_candidates;
pub use builder::InvoiceDocumentBuilder;
pub use generator::{BillingGenerator, BillingRunReport, CategoryOutcome, OutcomeStatus};
pub use locks::{EntryLockGuard, EntryLocks};
pub use error::{BillingError, DocumentError, ProrationError};
