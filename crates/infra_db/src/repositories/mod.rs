//! Repository implementations for the billing ports
//!
//! Each repository owns its SQL and maps between rows and domain types.
//! Queries are checked at runtime so the crate builds without a live
//! database.

pub mod sync_ledger;
pub mod document_archive;
pub mod entry_lock;

pub use sync_ledger::{PgSyncLedger, SyncRecordRow};
pub use document_archive::PgDocumentArchive;
pub use entry_lock::PgEntryLease;
