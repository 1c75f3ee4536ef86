//! Manifest match validation
//!
//! Resolves every invoice line on an entry against the manifests with a
//! fresh consumed-line set. Failures are collected rather than returned
//! early so that one missing ASN line does not hide the others.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::entry::{CommercialInvoice, CustomsEntry, InvoiceLine};
use crate::manifest::{shipments_for_entry, ManifestShipment};
use crate::matcher::{ManifestMatcher, MatchNotFound, MatchRequest, MatchedLine, UsedManifestLines};

/// A business-rule failure: an invoice line without a manifest line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchFailure {
    pub entry_number: String,
    pub commercial_invoice_number: String,
    pub line_number: u32,
    pub po_number: String,
    pub part_number: String,
    pub container_number: Option<String>,
}

impl MatchFailure {
    fn new(entry: &CustomsEntry, invoice: &CommercialInvoice, line: &InvoiceLine, not_found: MatchNotFound) -> Self {
        Self {
            entry_number: entry.entry_number.clone(),
            commercial_invoice_number: invoice.invoice_number.clone(),
            line_number: line.line_number,
            po_number: not_found.po_number,
            part_number: not_found.part_number,
            container_number: not_found.container_number,
        }
    }
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entry {} invoice {} line {}: no manifest line for PO {} / part {}",
            self.entry_number, self.commercial_invoice_number, self.line_number, self.po_number, self.part_number
        )?;
        if let Some(container) = &self.container_number {
            write!(f, " in container {}", container)?;
        }
        Ok(())
    }
}

/// The outcome of matching one invoice line
#[derive(Debug, Clone)]
pub struct LineResolution<'a> {
    pub commercial_invoice: &'a CommercialInvoice,
    pub line: &'a InvoiceLine,
    pub outcome: Result<MatchedLine<'a>, MatchFailure>,
}

/// Matches every line of `entry`, in filing order, with a fresh used-set
pub fn resolve_entry_lines<'a>(
    entry: &'a CustomsEntry,
    matcher: &ManifestMatcher<'a>,
) -> Vec<LineResolution<'a>> {
    let mut used = UsedManifestLines::new();
    let lcl = entry.is_ocean_lcl();

    entry
        .lines()
        .map(|(ci, line)| {
            let request = MatchRequest {
                container_number: line.container(),
                po_number: &line.po_number,
                part_number: &line.part_number,
                quantity: line.quantity,
                invoice_number: lcl.then_some(ci.invoice_number.as_str()),
            };
            let outcome = matcher
                .find_line(&request, &mut used)
                .map_err(|nf| MatchFailure::new(entry, ci, line, nf));
            LineResolution {
                commercial_invoice: ci,
                line,
                outcome,
            }
        })
        .collect()
}

/// Validation rule: every invoice line on the entry has a manifest line
///
/// Returns an empty list when the entry is fully matched.
pub fn validate_manifest_matches(entry: &CustomsEntry, shipments: &[ManifestShipment]) -> Vec<MatchFailure> {
    let matcher = ManifestMatcher::new(&entry.importer_code, shipments_for_entry(entry, shipments));
    let failures: Vec<MatchFailure> = resolve_entry_lines(entry, &matcher)
        .into_iter()
        .filter_map(|r| r.outcome.err())
        .collect();

    if !failures.is_empty() {
        warn!(
            entry_number = %entry.entry_number,
            failures = failures.len(),
            "entry has invoice lines without manifest lines"
        );
    }
    failures
}
