//! Shipment manifest (ASN) snapshot

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::ShipmentId;

use crate::entry::{CustomsEntry, TransportMode};

/// Reserved HTS value marking a manifest line that may satisfy several
/// invoice lines (a product split across tariff numbers)
pub const SPLIT_TARIFF_SENTINEL: &str = "9999999999";

/// An advance shipment notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestShipment {
    pub id: ShipmentId,
    pub reference: String,
    pub mode: TransportMode,
    #[serde(default)]
    pub master_bill_of_lading: Option<String>,
    #[serde(default)]
    pub house_bill_of_lading: Option<String>,
    pub containers: Vec<Container>,
}

impl ManifestShipment {
    /// Bill number printed on outbound documents: master, else house
    pub fn bill_number(&self) -> Option<&str> {
        non_blank(self.master_bill_of_lading.as_deref())
            .or_else(|| non_blank(self.house_bill_of_lading.as_deref()))
    }

    /// True when the shipment's master or house bill appears on the entry
    pub fn belongs_to(&self, entry: &CustomsEntry) -> bool {
        let masters = entry.master_bills();
        let houses = entry.house_bills();
        non_blank(self.master_bill_of_lading.as_deref()).is_some_and(|mb| masters.contains(&mb))
            || non_blank(self.house_bill_of_lading.as_deref()).is_some_and(|hb| houses.contains(&hb))
    }

    /// Finds a container by number
    pub fn container(&self, number: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.container_number == number)
    }
}

/// A physical container on a shipment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub container_number: String,
    pub lines: Vec<ManifestLine>,
}

/// A shipped line on the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestLine {
    pub line_number: u32,
    /// Importer-namespaced product identifier, e.g. `ACME-PART1`
    pub product_id: String,
    /// Importer-namespaced order reference, e.g. `ACME-PO1`
    pub order_number: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub gross_weight: Option<Decimal>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub hts_code: Option<String>,
}

impl ManifestLine {
    /// True when the line carries the split-tariff sentinel HTS
    pub fn is_split_tariff(&self) -> bool {
        self.hts_code.as_deref().map(str::trim) == Some(SPLIT_TARIFF_SENTINEL)
    }

    /// Weight, absent read as zero
    pub fn weight(&self) -> Decimal {
        self.gross_weight.unwrap_or_default()
    }
}

/// Prefixes an identifier with the importer's namespace
pub fn namespaced(importer_code: &str, identifier: &str) -> String {
    format!("{}-{}", importer_code.trim(), identifier.trim())
}

/// Shipments whose bills appear on the entry; every shipment when the
/// entry carries no bill numbers at all
pub fn shipments_for_entry<'a>(
    entry: &CustomsEntry,
    shipments: &'a [ManifestShipment],
) -> Vec<&'a ManifestShipment> {
    if entry.master_bills().is_empty() && entry.house_bills().is_empty() {
        return shipments.iter().collect();
    }
    shipments.iter().filter(|s| s.belongs_to(entry)).collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn shipment(master: Option<&str>, house: Option<&str>) -> ManifestShipment {
        ManifestShipment {
            id: ShipmentId::new(),
            reference: "ASN1".into(),
            mode: TransportMode::Ocean,
            master_bill_of_lading: master.map(String::from),
            house_bill_of_lading: house.map(String::from),
            containers: vec![],
        }
    }

    #[test]
    fn test_bill_number_prefers_master() {
        assert_eq!(shipment(Some("MB"), Some("HB")).bill_number(), Some("MB"));
        assert_eq!(shipment(Some(" "), Some("HB")).bill_number(), Some("HB"));
        assert_eq!(shipment(None, None).bill_number(), None);
    }

    #[test]
    fn test_split_tariff_flag() {
        let line = ManifestLine {
            line_number: 1,
            product_id: "ACME-P".into(),
            order_number: "ACME-O".into(),
            quantity: dec!(1),
            gross_weight: None,
            invoice_number: None,
            hts_code: Some(SPLIT_TARIFF_SENTINEL.into()),
        };
        assert!(line.is_split_tariff());
        assert_eq!(line.weight(), Decimal::ZERO);
    }

    #[test]
    fn test_namespaced() {
        assert_eq!(namespaced("ACME", " PO1 "), "ACME-PO1");
    }
}
