//! Entry snapshot bundle
//!
//! Everything a billing run reads, captured once at the start of the run:
//! the entry, its broker invoices and the manifests received for it.

use serde::{Deserialize, Serialize};

use crate::broker_invoice::BrokerInvoice;
use crate::entry::CustomsEntry;
use crate::error::CustomsError;
use crate::manifest::{shipments_for_entry, ManifestShipment};

/// Read-only inputs for one entry's billing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub entry: CustomsEntry,
    #[serde(default)]
    pub broker_invoices: Vec<BrokerInvoice>,
    #[serde(default)]
    pub manifests: Vec<ManifestShipment>,
}

impl EntrySnapshot {
    /// Decodes and validates a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self, CustomsError> {
        let snapshot: EntrySnapshot =
            serde_json::from_str(json).map_err(|e| CustomsError::InvalidSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Checks that every broker invoice belongs to the entry
    pub fn validate(&self) -> Result<(), CustomsError> {
        if let Some(foreign) = self
            .broker_invoices
            .iter()
            .find(|bi| bi.entry_number.trim() != self.entry.entry_number.trim())
        {
            return Err(CustomsError::ForeignInvoice {
                invoice_number: foreign.invoice_number.clone(),
                expected: self.entry.entry_number.clone(),
                actual: foreign.entry_number.clone(),
            });
        }
        Ok(())
    }

    /// Broker invoices in chronological order
    pub fn invoices_chronological(&self) -> Vec<&BrokerInvoice> {
        let mut invoices: Vec<&BrokerInvoice> = self.broker_invoices.iter().collect();
        invoices.sort_by(|a, b| a.chronological_cmp(b));
        invoices
    }

    /// Manifests whose bills appear on the entry
    pub fn relevant_manifests(&self) -> Vec<&ManifestShipment> {
        shipments_for_entry(&self.entry, &self.manifests)
    }
}
