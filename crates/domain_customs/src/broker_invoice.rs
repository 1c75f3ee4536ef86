//! Broker invoices
//!
//! A broker invoice is one billing event against an entry. It is created
//! upstream and read-only here; only its send-state lives in the billing
//! domain.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use core_kernel::{BrokerInvoiceId, Currency, Money};

/// A billing event tied to one customs entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerInvoice {
    pub id: BrokerInvoiceId,
    pub entry_number: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    /// Billing sequence on the entry (1 for the first supplemental bill, ...)
    #[serde(default)]
    pub billing_sequence: Option<u32>,
    pub currency: Currency,
    pub charge_lines: Vec<ChargeLine>,
}

impl BrokerInvoice {
    /// Signed total of all charge lines
    pub fn total(&self) -> Money {
        let total: Decimal = self.charge_lines.iter().map(|c| c.amount).sum();
        Money::new(total, self.currency)
    }

    /// A negative total marks a credit
    pub fn is_credit(&self) -> bool {
        self.total().is_negative()
    }

    /// Charge codes sorted, duplicates retained
    pub fn sorted_charge_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.charge_lines.iter().map(|c| c.charge_code.as_str()).collect();
        codes.sort_unstable();
        codes
    }

    /// Alphabetic suffix for the billing sequence: 1 → "A", 26 → "Z", 27 → "AA"
    pub fn sequence_suffix(&self) -> String {
        match self.billing_sequence {
            Some(seq) if seq > 0 => alphabetic_suffix(seq),
            _ => String::new(),
        }
    }

    /// Outbound invoice number: entry number plus sequence suffix
    pub fn outbound_invoice_number(&self) -> String {
        format!("{}{}", self.entry_number, self.sequence_suffix())
    }

    /// Chronological ordering: invoice date, then billing sequence, then invoice number
    pub fn chronological_cmp(&self, other: &BrokerInvoice) -> Ordering {
        self.invoice_date
            .cmp(&other.invoice_date)
            .then_with(|| self.billing_sequence.unwrap_or(0).cmp(&other.billing_sequence.unwrap_or(0)))
            .then_with(|| self.invoice_number.cmp(&other.invoice_number))
    }
}

/// A single charge on a broker invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeLine {
    pub charge_code: String,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
}

impl ChargeLine {
    pub fn new(charge_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            charge_code: charge_code.into(),
            description: String::new(),
            amount,
        }
    }
}

/// Sorts invoices into chronological order in place
pub fn sort_chronologically(invoices: &mut [BrokerInvoice]) {
    invoices.sort_by(|a, b| a.chronological_cmp(b));
}

fn alphabetic_suffix(mut seq: u32) -> String {
    let mut letters = Vec::new();
    while seq > 0 {
        let rem = (seq - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        seq = (seq - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn invoice(seq: Option<u32>, charges: Vec<ChargeLine>) -> BrokerInvoice {
        BrokerInvoice {
            id: BrokerInvoiceId::new(),
            entry_number: "31612345678".into(),
            invoice_number: "INV1".into(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            billing_sequence: seq,
            currency: Currency::USD,
            charge_lines: charges,
        }
    }

    #[test]
    fn test_sequence_suffix() {
        assert_eq!(invoice(None, vec![]).sequence_suffix(), "");
        assert_eq!(invoice(Some(0), vec![]).sequence_suffix(), "");
        assert_eq!(invoice(Some(1), vec![]).sequence_suffix(), "A");
        assert_eq!(invoice(Some(2), vec![]).sequence_suffix(), "B");
        assert_eq!(invoice(Some(26), vec![]).sequence_suffix(), "Z");
        assert_eq!(invoice(Some(27), vec![]).sequence_suffix(), "AA");
        assert_eq!(invoice(Some(2), vec![]).outbound_invoice_number(), "31612345678B");
    }

    #[test]
    fn test_credit_detection() {
        let credit = invoice(None, vec![ChargeLine::new("0044", dec!(-10)), ChargeLine::new("0001", dec!(-5))]);
        assert!(credit.is_credit());
        assert_eq!(credit.total().amount(), dec!(-15));
        assert_eq!(credit.sorted_charge_codes(), vec!["0001", "0044"]);
    }

    #[test]
    fn test_chronological_order() {
        let mut later = invoice(Some(1), vec![]);
        later.invoice_date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let first = invoice(None, vec![]);
        let mut invoices = vec![later.clone(), first.clone()];
        sort_chronologically(&mut invoices);
        assert_eq!(invoices[0].id, first.id);
        assert_eq!(invoices[1].id, later.id);
    }
}
