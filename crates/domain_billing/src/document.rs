//! Outbound generic invoice documents
//!
//! One document is produced per broker invoice per charge category. The
//! document is archived as JSON before delivery so that a later credit can
//! replay it verbatim.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BrokerInvoiceId, Currency, DocumentId, Money, MoneyError};
use domain_customs::BrokerInvoice;

use crate::sync::SyncKey;

/// Charge category; each gets its own document and ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    Duty,
    Container,
}

impl DocumentCategory {
    /// Categories in processing order
    pub const ALL: [DocumentCategory; 2] = [DocumentCategory::Duty, DocumentCategory::Container];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Duty => "DUTY",
            DocumentCategory::Container => "CONTAINER",
        }
    }

    /// Ledger key for sending this category
    pub fn sync_key(&self) -> SyncKey {
        match self {
            DocumentCategory::Duty => SyncKey::Duty,
            DocumentCategory::Container => SyncKey::Container,
        }
    }

    /// Ledger key recording that this category of an invoice was reversed
    pub fn reversal_key(&self) -> SyncKey {
        match self {
            DocumentCategory::Duty => SyncKey::DutyReversal,
            DocumentCategory::Container => SyncKey::ContainerReversal,
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marks a charge field that reduces a previously billed amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargePurpose {
    Decrement,
}

/// One charge on a line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeField {
    pub code: String,
    pub charge_date: NaiveDate,
    pub value: Money,
    #[serde(default)]
    pub purpose: Option<ChargePurpose>,
}

/// A document line: identifiers plus the charges billed against them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub bill_of_lading_number: Option<String>,
    pub container_number: Option<String>,
    pub order_number: Option<String>,
    pub part_number: Option<String>,
    pub line_item_number: Option<u32>,
    pub charge_fields: Vec<ChargeField>,
}

impl InvoiceLineItem {
    /// Adds `value` under `code`, summing with an existing field of the same code
    pub fn add_charge(&mut self, code: &str, value: Money, charge_date: NaiveDate) -> Result<(), MoneyError> {
        if let Some(existing) = self.charge_fields.iter_mut().find(|f| f.code == code) {
            existing.value = existing.value.checked_add(&value)?;
            return Ok(());
        }
        self.charge_fields.push(ChargeField {
            code: code.to_string(),
            charge_date,
            value,
            purpose: None,
        });
        Ok(())
    }

    /// Drops zero-valued charge fields
    pub fn prune_zero_charges(&mut self) {
        self.charge_fields.retain(|f| !f.value.is_zero());
    }
}

/// Envelope information for one transmission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub created_at: DateTime<Utc>,
    pub file_name: String,
    pub sender: String,
    pub receiver: String,
    pub message_id: String,
    pub control_number: u64,
}

impl TransactionHeader {
    /// Builds the envelope; message id and control number derive from `created_at`
    pub fn new(
        sender: &str,
        receiver: &str,
        invoice_number: &str,
        category: DocumentCategory,
        created_at: DateTime<Utc>,
    ) -> Self {
        let stamp = created_at.format("%Y%m%d%H%M%S%3f").to_string();
        let file_name = format!("GI_{}_{}_{}_{}_{}.xml", sender, receiver, invoice_number, category, stamp);
        let control_number = created_at.timestamp_millis().rem_euclid(1_000_000_000) as u64;

        Self {
            created_at,
            file_name,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            message_id: stamp,
            control_number,
        }
    }
}

/// A generic invoice document ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericInvoiceDocument {
    pub id: DocumentId,
    pub category: DocumentCategory,
    pub broker_invoice_id: BrokerInvoiceId,
    pub transaction: TransactionHeader,
    /// Entry number plus billing sequence suffix
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub currency: Currency,
    pub line_items: Vec<InvoiceLineItem>,
}

impl GenericInvoiceDocument {
    /// Creates a document for `invoice`
    pub fn new(
        category: DocumentCategory,
        invoice: &BrokerInvoice,
        sender: &str,
        receiver: &str,
        line_items: Vec<InvoiceLineItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let invoice_number = invoice.outbound_invoice_number();
        Self {
            id: DocumentId::new_v7(),
            category,
            broker_invoice_id: invoice.id,
            transaction: TransactionHeader::new(sender, receiver, &invoice_number, category, created_at),
            invoice_number,
            invoice_date: invoice.invoice_date,
            currency: invoice.currency,
            line_items,
        }
    }

    /// Replays this document for `credit`: same line items, every charge
    /// field marked as a decrement
    pub fn reversal_for(&self, credit: &BrokerInvoice, created_at: DateTime<Utc>) -> Self {
        let mut line_items = self.line_items.clone();
        for field in line_items.iter_mut().flat_map(|item| item.charge_fields.iter_mut()) {
            field.purpose = Some(ChargePurpose::Decrement);
        }
        let mut reversal = Self::new(
            self.category,
            credit,
            &self.transaction.sender,
            &self.transaction.receiver,
            line_items,
            created_at,
        );
        reversal.currency = self.currency;
        reversal
    }

    pub fn file_name(&self) -> &str {
        &self.transaction.file_name
    }

    pub fn line_item_count(&self) -> usize {
        self.line_items.len()
    }

    /// Sum of every charge field value
    pub fn total(&self) -> Result<Money, MoneyError> {
        Money::sum(
            self.currency,
            self.line_items.iter().flat_map(|i| i.charge_fields.iter().map(|f| &f.value)),
        )
    }

    /// Charge fields across all line items
    pub fn charge_fields(&self) -> impl Iterator<Item = &ChargeField> {
        self.line_items.iter().flat_map(|i| i.charge_fields.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain_customs::ChargeLine;
    use rust_decimal_macros::dec;

    fn invoice(sequence: Option<u32>) -> BrokerInvoice {
        BrokerInvoice {
            id: BrokerInvoiceId::new(),
            entry_number: "31612345678".into(),
            invoice_number: "B100".into(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            billing_sequence: sequence,
            currency: Currency::USD,
            charge_lines: vec![ChargeLine::new("0044", dec!(100))],
        }
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 14, 5, 9).unwrap() + chrono::Duration::milliseconds(42)
    }

    fn item(value: rust_decimal::Decimal) -> InvoiceLineItem {
        InvoiceLineItem {
            container_number: Some("C1".into()),
            charge_fields: vec![ChargeField {
                code: "C080".into(),
                charge_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                value: Money::new(value, Currency::USD),
                purpose: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_file_name_layout() {
        let doc = GenericInvoiceDocument::new(
            DocumentCategory::Container,
            &invoice(Some(2)),
            "BROKER",
            "CUSTOMER",
            vec![],
            created(),
        );
        assert_eq!(doc.file_name(), "GI_BROKER_CUSTOMER_31612345678B_CONTAINER_20240302140509042.xml");
        assert_eq!(doc.invoice_number, "31612345678B");
        assert_eq!(doc.transaction.message_id, "20240302140509042");
    }

    #[test]
    fn test_add_charge_merges_codes() {
        let mut line = item(dec!(10));
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        line.add_charge("C080", Money::new(dec!(5), Currency::USD), date).unwrap();
        line.add_charge("C081", Money::new(dec!(0), Currency::USD), date).unwrap();
        assert_eq!(line.charge_fields.len(), 2);
        assert_eq!(line.charge_fields[0].value.amount(), dec!(15));

        line.prune_zero_charges();
        assert_eq!(line.charge_fields.len(), 1);
    }

    #[test]
    fn test_reversal_marks_every_field() {
        let original = GenericInvoiceDocument::new(
            DocumentCategory::Container,
            &invoice(None),
            "BROKER",
            "CUSTOMER",
            vec![item(dec!(60)), item(dec!(40))],
            created(),
        );
        let credit = invoice(Some(1));
        let reversal = original.reversal_for(&credit, created());

        assert_eq!(reversal.broker_invoice_id, credit.id);
        assert_ne!(reversal.id, original.id);
        assert_eq!(reversal.line_items.len(), 2);
        assert!(reversal.charge_fields().all(|f| f.purpose == Some(ChargePurpose::Decrement)));
        assert_eq!(reversal.total().unwrap(), original.total().unwrap());
        assert_eq!(reversal.line_items[0].container_number, original.line_items[0].container_number);
    }
}
