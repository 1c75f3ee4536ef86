//! Invoice document builder
//!
//! Turns one broker invoice into the line items of its DUTY and CONTAINER
//! documents. Manifest matching is resolved once when the builder is
//! created and shared by every invoice of the run.
//!
//! # DUTY
//!
//! One line item per matched invoice line, keyed by bill, container,
//! order, part and manifest line number. Each duty component present on
//! the broker invoice contributes the line's own amount for that
//! component, signed like the broker charge.
//!
//! # CONTAINER
//!
//! Container charges are aggregated per outbound code. With several
//! containers each charge is prorated by the weight of the manifest lines
//! matched into each container; a single container takes the whole
//! amount; an entry without containers gets one bill-level item.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use core_kernel::{Currency, Money};
use domain_customs::{
    resolve_entry_lines, BrokerInvoice, CustomsEntry, CustomsError, EntrySnapshot, LineResolution,
    ManifestMatcher, ManifestShipment, MatchFailure,
};

use crate::classifier::{split_combined_tax, ChargeCategory, ChargeClassifier};
use crate::config::{BillingConfig, DutyComponent};
use crate::document::{DocumentCategory, GenericInvoiceDocument, InvoiceLineItem};
use crate::error::BillingError;
use crate::proration::prorate;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DutyLineKey {
    bill: Option<String>,
    container: String,
    order: String,
    part: String,
    line_number: u32,
}

/// Builds outbound documents for the invoices of one entry
#[derive(Debug)]
pub struct InvoiceDocumentBuilder<'a> {
    config: &'a BillingConfig,
    classifier: ChargeClassifier<'a>,
    entry: &'a CustomsEntry,
    shipments: Vec<&'a ManifestShipment>,
    resolutions: Vec<LineResolution<'a>>,
}

impl<'a> InvoiceDocumentBuilder<'a> {
    /// Resolves every invoice line of the snapshot's entry against its manifests
    pub fn new(config: &'a BillingConfig, snapshot: &'a EntrySnapshot) -> Self {
        let entry = &snapshot.entry;
        let importer = config.importer_code.as_deref().unwrap_or(&entry.importer_code);
        let shipments = snapshot.relevant_manifests();
        let matcher = ManifestMatcher::new(importer, shipments.iter().copied());
        let resolutions = resolve_entry_lines(entry, &matcher);

        debug!(
            entry_number = %entry.entry_number,
            shipments = shipments.len(),
            lines = resolutions.len(),
            "resolved invoice lines against manifests"
        );

        Self {
            config,
            classifier: ChargeClassifier::new(&config.charge_codes),
            entry,
            shipments,
            resolutions,
        }
    }

    /// Invoice lines that found no manifest line
    pub fn match_failures(&self) -> Vec<MatchFailure> {
        self.resolutions
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().cloned())
            .collect()
    }

    /// Builds the `category` document for `invoice`; `None` when it would
    /// carry no line items
    pub fn build(
        &self,
        category: DocumentCategory,
        invoice: &BrokerInvoice,
        created_at: DateTime<Utc>,
    ) -> Result<Option<GenericInvoiceDocument>, BillingError> {
        let line_items = match category {
            DocumentCategory::Duty => self.duty_line_items(invoice)?,
            DocumentCategory::Container => self.container_line_items(invoice)?,
        };

        if line_items.is_empty() {
            return Ok(None);
        }

        Ok(Some(GenericInvoiceDocument::new(
            category,
            invoice,
            &self.config.sender_code,
            &self.config.partner_code,
            line_items,
            created_at,
        )))
    }

    /// Line items of the DUTY document
    ///
    /// # Errors
    ///
    /// Fails with [`CustomsError::UnmatchedLines`] listing every unmatched
    /// invoice line when the invoice carries any duty charge.
    pub fn duty_line_items(&self, invoice: &BrokerInvoice) -> Result<Vec<InvoiceLineItem>, BillingError> {
        let mut charges: IndexMap<DutyComponent, (String, Decimal)> = IndexMap::new();
        for charge in &invoice.charge_lines {
            let classification = self.classifier.classify(&charge.charge_code);
            if let (ChargeCategory::Duty(component), Some(code)) = (classification.category, classification.outbound_code) {
                charges.entry(component).or_insert((code, Decimal::ZERO)).1 += charge.amount;
            }
        }
        charges.retain(|_, (_, amount)| !amount.is_zero());

        if charges.is_empty() {
            return Ok(Vec::new());
        }

        let failures = self.match_failures();
        if !failures.is_empty() {
            return Err(CustomsError::UnmatchedLines(failures).into());
        }

        let date = invoice.invoice_date;
        let mut items: IndexMap<DutyLineKey, InvoiceLineItem> = IndexMap::new();
        let mut billed: HashMap<DutyComponent, Decimal> = HashMap::new();

        for resolution in &self.resolutions {
            let matched = match &resolution.outcome {
                Ok(matched) => matched,
                Err(_) => continue,
            };

            let key = DutyLineKey {
                bill: self.bill_for_shipment(matched.shipment),
                container: matched.container.container_number.trim().to_string(),
                order: resolution.line.po_number.trim().to_string(),
                part: resolution.line.part_number.trim().to_string(),
                line_number: matched.line.line_number,
            };
            let item = items.entry(key.clone()).or_insert_with(|| InvoiceLineItem {
                bill_of_lading_number: key.bill,
                container_number: Some(key.container),
                order_number: Some(key.order),
                part_number: Some(key.part),
                line_item_number: Some(key.line_number),
                charge_fields: Vec::new(),
            });

            for (component, (code, broker_amount)) in &charges {
                let amount = component.line_amount(resolution.line).abs();
                if amount.is_zero() {
                    continue;
                }
                let signed = if broker_amount.is_sign_negative() { -amount } else { amount };
                item.add_charge(code, Money::new(signed, invoice.currency), date)?;
                *billed.entry(*component).or_default() += signed;
            }
        }

        for (component, (code, broker_amount)) in &charges {
            let billed = billed.get(component).copied().unwrap_or_default();
            if billed != *broker_amount {
                warn!(
                    invoice_number = %invoice.invoice_number,
                    charge = %code,
                    broker_amount = %broker_amount,
                    line_total = %billed,
                    "duty line totals differ from broker charge"
                );
            }
        }

        Ok(non_empty(items.into_values()))
    }

    /// Line items of the CONTAINER document
    pub fn container_line_items(&self, invoice: &BrokerInvoice) -> Result<Vec<InvoiceLineItem>, BillingError> {
        let charges = self.container_charges(invoice);
        if charges.is_empty() {
            return Ok(Vec::new());
        }

        let date = invoice.invoice_date;
        let containers: Vec<String> = self.entry.containers().into_iter().map(String::from).collect();

        match containers.as_slice() {
            [] => {
                let mut item = InvoiceLineItem {
                    bill_of_lading_number: self.entry.primary_bill().map(String::from),
                    ..Default::default()
                };
                for (code, amount) in &charges {
                    item.add_charge(code, *amount, date)?;
                }
                Ok(non_empty([item]))
            }
            [container] => {
                let mut item = self.container_item(container);
                for (code, amount) in &charges {
                    item.add_charge(code, *amount, date)?;
                }
                Ok(non_empty([item]))
            }
            _ => {
                let weights = self.container_weights();
                let mut items: IndexMap<&str, InvoiceLineItem> = containers
                    .iter()
                    .map(|c| (c.as_str(), self.container_item(c)))
                    .collect();

                for (code, amount) in &charges {
                    let shares = prorate(code, *amount, &containers, |c| weights.get(c).copied())?;
                    for (container, share) in shares {
                        if let Some(item) = items.get_mut(container.as_str()) {
                            item.add_charge(code, share, date)?;
                        }
                    }
                }
                Ok(non_empty(items.into_values()))
            }
        }
    }

    /// Container charges per outbound code, first-seen order, zero totals dropped
    fn container_charges(&self, invoice: &BrokerInvoice) -> IndexMap<String, Money> {
        let split = self.config.canada_tax_split.as_ref();
        let mut by_code: IndexMap<String, Decimal> = IndexMap::new();
        let mut tax = None::<Decimal>;
        let mut taxable = Decimal::ZERO;

        for charge in &invoice.charge_lines {
            let classification = self.classifier.classify(&charge.charge_code);
            let code = match (classification.category, classification.outbound_code) {
                (ChargeCategory::Container, Some(code)) => code,
                _ => continue,
            };
            let broker_code = charge.charge_code.trim();

            if let Some(split) = split {
                if broker_code == split.combined_tax_code.trim() {
                    *tax.get_or_insert(Decimal::ZERO) += charge.amount;
                    by_code.entry(split.federal_outbound_code.clone()).or_insert(Decimal::ZERO);
                    continue;
                }
                if split.taxable_codes.is_empty() || split.taxable_codes.iter().any(|c| c.trim() == broker_code) {
                    taxable += charge.amount;
                }
            }

            *by_code.entry(code).or_insert(Decimal::ZERO) += charge.amount;
        }

        if let (Some(split), Some(tax)) = (split, tax) {
            let currency = invoice.currency;
            let parts = split_combined_tax(split, Money::new(tax, currency), Money::new(taxable, currency));
            *by_code.entry(split.federal_outbound_code.clone()).or_insert(Decimal::ZERO) += parts.federal.amount();
            if let Some(provincial) = parts.provincial {
                *by_code.entry(split.provincial_outbound_code.clone()).or_insert(Decimal::ZERO) += provincial.amount();
            }
        }

        to_money(by_code, invoice.currency)
    }

    /// Matched manifest weight per container number; each manifest line counted once
    fn container_weights(&self) -> HashMap<String, Decimal> {
        let mut seen = HashSet::new();
        let mut weights: HashMap<String, Decimal> = HashMap::new();
        for matched in self.resolutions.iter().filter_map(|r| r.outcome.as_ref().ok()) {
            if seen.insert(matched.key) {
                *weights
                    .entry(matched.container.container_number.trim().to_string())
                    .or_default() += matched.line.weight();
            }
        }
        weights
    }

    fn container_item(&self, container: &str) -> InvoiceLineItem {
        let bill = self
            .shipments
            .iter()
            .find(|s| s.containers.iter().any(|c| c.container_number.trim() == container))
            .and_then(|s| s.bill_number())
            .or_else(|| self.entry.primary_bill())
            .map(String::from);

        InvoiceLineItem {
            bill_of_lading_number: bill,
            container_number: Some(container.to_string()),
            ..Default::default()
        }
    }

    fn bill_for_shipment(&self, shipment: &ManifestShipment) -> Option<String> {
        shipment
            .bill_number()
            .or_else(|| self.entry.primary_bill())
            .map(String::from)
    }
}

fn to_money(amounts: IndexMap<String, Decimal>, currency: Currency) -> IndexMap<String, Money> {
    amounts
        .into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(code, amount)| (code, Money::new(amount, currency)))
        .collect()
}

fn non_empty(items: impl IntoIterator<Item = InvoiceLineItem>) -> Vec<InvoiceLineItem> {
    items
        .into_iter()
        .map(|mut item| {
            item.prune_zero_charges();
            item
        })
        .filter(|item| !item.charge_fields.is_empty())
        .collect()
}
