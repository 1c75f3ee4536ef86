//! Customs domain errors

use thiserror::Error;

use crate::validation::MatchFailure;

/// Errors that can occur while reading customs snapshots
#[derive(Debug, Error)]
pub enum CustomsError {
    /// Snapshot could not be decoded
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Broker invoice does not belong to the entry it was supplied with
    #[error("Broker invoice {invoice_number} belongs to entry {actual}, not {expected}")]
    ForeignInvoice {
        invoice_number: String,
        expected: String,
        actual: String,
    },

    /// One or more invoice lines have no manifest line
    #[error("{} invoice line(s) could not be matched to the manifest", .0.len())]
    UnmatchedLines(Vec<MatchFailure>),
}

impl CustomsError {
    /// Human-readable list of unmatched lines, one per line
    pub fn detail(&self) -> String {
        match self {
            CustomsError::UnmatchedLines(failures) => failures
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}
