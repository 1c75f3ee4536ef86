//! Tests for the typed identifiers

use core_kernel::{BrokerInvoiceId, DocumentId, ShipmentId, SyncRecordId};
use uuid::Uuid;

#[test]
fn test_new_generates_unique_ids() {
    assert_ne!(BrokerInvoiceId::new(), BrokerInvoiceId::new());
}

#[test]
fn test_new_v7_generates_time_ordered_ids() {
    let id1 = DocumentId::new_v7();
    std::thread::sleep(std::time::Duration::from_millis(1));
    let id2 = DocumentId::new_v7();
    assert!(id1 < id2);
}

#[test]
fn test_prefixes() {
    assert_eq!(BrokerInvoiceId::prefix(), "BINV");
    assert_eq!(ShipmentId::prefix(), "ASN");
    assert_eq!(SyncRecordId::prefix(), "SYNC");
    assert_eq!(DocumentId::prefix(), "DOC");
}

#[test]
fn test_parse_accepts_bare_uuid() {
    let uuid = Uuid::new_v4();
    let id: SyncRecordId = uuid.to_string().parse().unwrap();
    assert_eq!(*id.as_uuid(), uuid);
}

#[test]
fn test_parse_rejects_garbage() {
    assert!("BINV-not-a-uuid".parse::<BrokerInvoiceId>().is_err());
}

#[test]
fn test_serde_is_transparent() {
    let uuid = Uuid::new_v4();
    let id = ShipmentId::from_uuid(uuid);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", uuid));
}
