//! Send ledger records
//!
//! One record per (broker invoice, key). Records are created lazily the
//! first time a category is attempted and never deleted. A non-null
//! `sent_at` is the idempotency guard: nothing is ever sent twice under
//! the same key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BrokerInvoiceId, DocumentId, SyncRecordId};

/// Ledger key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncKey {
    Duty,
    Container,
    DutyReversal,
    ContainerReversal,
}

impl SyncKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKey::Duty => "DUTY",
            SyncKey::Container => "CONTAINER",
            SyncKey::DutyReversal => "DUTY_REVERSAL",
            SyncKey::ContainerReversal => "CONTAINER_REVERSAL",
        }
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DUTY" => Ok(SyncKey::Duty),
            "CONTAINER" => Ok(SyncKey::Container),
            "DUTY_REVERSAL" => Ok(SyncKey::DutyReversal),
            "CONTAINER_REVERSAL" => Ok(SyncKey::ContainerReversal),
            other => Err(format!("unknown sync key: {}", other)),
        }
    }
}

/// Lifecycle of a ledger record
///
/// `Unsent -> Sent -> Confirmed`; a failure leaves the record `Unsent` with
/// a message so the next run retries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    Unsent,
    Sent,
    Confirmed,
}

/// Pointer to an archived document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: DocumentId,
    pub file_name: String,
}

/// Send state of one broker invoice under one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub id: SyncRecordId,
    pub broker_invoice_id: BrokerInvoiceId,
    pub sync_key: SyncKey,
    pub sent_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub failure_message: Option<String>,
    pub document: Option<DocumentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncRecord {
    /// Creates an unsent record
    pub fn new(broker_invoice_id: BrokerInvoiceId, sync_key: SyncKey) -> Self {
        let now = Utc::now();
        Self {
            id: SyncRecordId::new_v7(),
            broker_invoice_id,
            sync_key,
            sent_at: None,
            confirmed_at: None,
            failure_message: None,
            document: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> SyncState {
        match (self.sent_at, self.confirmed_at) {
            (Some(_), Some(_)) => SyncState::Confirmed,
            (Some(_), None) => SyncState::Sent,
            _ => SyncState::Unsent,
        }
    }

    /// True once a document has been handed off under this key
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }

    /// True when the last attempt failed
    pub fn is_failed(&self) -> bool {
        self.failure_message.is_some()
    }

    /// Records a successful handoff; confirmation is taken at handoff time
    pub fn mark_sent(&mut self, document: DocumentRef, at: DateTime<Utc>) {
        self.sent_at = Some(at);
        self.confirmed_at = Some(at);
        self.failure_message = None;
        self.document = Some(document);
        self.updated_at = at;
    }

    /// Records a failed attempt, leaving the record unsent
    pub fn mark_failed(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.failure_message = Some(message.into());
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_ref() -> DocumentRef {
        DocumentRef {
            document_id: DocumentId::new(),
            file_name: "GI_A_B_1_DUTY_20240101000000000.xml".into(),
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut record = SyncRecord::new(BrokerInvoiceId::new(), SyncKey::Duty);
        assert_eq!(record.state(), SyncState::Unsent);
        assert!(!record.is_sent());

        record.mark_failed("transport down", Utc::now());
        assert_eq!(record.state(), SyncState::Unsent);
        assert!(record.is_failed());

        record.mark_sent(doc_ref(), Utc::now());
        assert_eq!(record.state(), SyncState::Confirmed);
        assert!(record.is_sent());
        assert!(!record.is_failed());
        assert!(record.document.is_some());
    }

    #[test]
    fn test_key_round_trips_through_str() {
        for key in [SyncKey::Duty, SyncKey::Container, SyncKey::DutyReversal, SyncKey::ContainerReversal] {
            assert_eq!(key.as_str().parse::<SyncKey>().unwrap(), key);
        }
        assert!("FREIGHT".parse::<SyncKey>().is_err());
    }
}
