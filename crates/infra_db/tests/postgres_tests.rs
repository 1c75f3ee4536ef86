//! PostgreSQL adapter tests
//!
//! Need a reachable database in `DATABASE_URL`; run with
//! `cargo test -p infra_db -- --ignored`.

use chrono::{NaiveDate, Utc};
use std::time::Duration;

use core_kernel::{BrokerInvoiceId, Currency, DocumentId};
use domain_billing::{
    DocumentArchivePort, DocumentCategory, GenericInvoiceDocument, SyncKey, SyncLedgerPort, SyncRecord,
    TransactionHeader,
};
use infra_db::{create_pool, run_migrations, DatabaseConfig, DatabasePool, PgDocumentArchive, PgSyncLedger};

async fn pool() -> DatabasePool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    let pool = create_pool(DatabaseConfig::new(url).max_connections(2).min_connections(1))
        .await
        .expect("database reachable");
    run_migrations(&pool).await.expect("migrations apply");
    pool
}

fn document(broker_invoice_id: BrokerInvoiceId) -> GenericInvoiceDocument {
    let created_at = Utc::now();
    GenericInvoiceDocument {
        id: DocumentId::new_v7(),
        category: DocumentCategory::Duty,
        broker_invoice_id,
        transaction: TransactionHeader::new("BROKER", "CUSTOMER", "31612345678", DocumentCategory::Duty, created_at),
        invoice_number: "31612345678".into(),
        invoice_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        currency: Currency::USD,
        line_items: Vec::new(),
    }
}

#[tokio::test]
#[ignore]
async fn test_ledger_upsert_updates_in_place() {
    let ledger = PgSyncLedger::new(pool().await);
    let invoice_id = BrokerInvoiceId::new();

    let mut record = SyncRecord::new(invoice_id, SyncKey::Duty);
    record.mark_failed("transport down", Utc::now());
    ledger.save(&record).await.unwrap();

    let archive_doc = document(invoice_id);
    let mut retried = ledger.find(invoice_id, SyncKey::Duty).await.unwrap().unwrap();
    assert!(retried.is_failed());
    retried.mark_sent(
        domain_billing::DocumentRef {
            document_id: archive_doc.id,
            file_name: archive_doc.file_name().to_string(),
        },
        Utc::now(),
    );
    ledger.save(&retried).await.unwrap();

    let records = ledger.find_for_invoice(invoice_id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_sent());
    assert!(!records[0].is_failed());
    assert_eq!(records[0].id, record.id);
}

#[tokio::test]
#[ignore]
async fn test_archive_returns_stored_document() {
    let archive = PgDocumentArchive::new(pool().await);
    let doc = document(BrokerInvoiceId::new());

    let stored = archive.store(&doc).await.unwrap();
    let fetched = archive.fetch(stored.document_id).await.unwrap();

    assert_eq!(fetched.as_ref().map(|d| d.file_name()), Some(doc.file_name()));
    assert!(archive.fetch(DocumentId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_entry_lock_excludes_second_worker() {
    // Two pools stand in for two worker processes
    let first = PgSyncLedger::new(pool().await);
    let second = PgSyncLedger::new(pool().await);
    let entry_number = format!("LOCK-{}", DocumentId::new_v7());

    let held = first.lock_entry(&entry_number).await.unwrap();
    let blocked = tokio::time::timeout(Duration::from_millis(200), second.lock_entry(&entry_number)).await;
    assert!(blocked.is_err(), "second worker took a held entry lock");

    held.release().await.unwrap();
    let lease = tokio::time::timeout(Duration::from_secs(5), second.lock_entry(&entry_number))
        .await
        .expect("lock freed after release")
        .unwrap();
    lease.release().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_dropped_lease_frees_entry() {
    let ledger = PgSyncLedger::new(pool().await);
    let entry_number = format!("LOCK-{}", DocumentId::new_v7());

    drop(ledger.lock_entry(&entry_number).await.unwrap());

    let lease = tokio::time::timeout(Duration::from_secs(5), ledger.lock_entry(&entry_number))
        .await
        .expect("lock freed after drop")
        .unwrap();
    lease.release().await.unwrap();
}
