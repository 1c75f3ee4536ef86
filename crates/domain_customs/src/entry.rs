//! Customs entry snapshot
//!
//! A released customs entry as handed over by the entry-persistence layer.
//! The engine never mutates it; absent sub-amounts read as zero and blank
//! container references read as "no container".

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transport mode decoded from the entry's mode-of-transport code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Ocean,
    Air,
    Truck,
    Rail,
    Other,
}

impl TransportMode {
    /// Decodes US (10/11 vessel, 40/41 air, 20/21 rail, 30-34 truck) and
    /// Canadian (9 marine, 1 air, 6 rail, 2 highway) mode codes
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "10" | "11" | "9" => TransportMode::Ocean,
            "40" | "41" | "1" => TransportMode::Air,
            "20" | "21" | "6" => TransportMode::Rail,
            "30" | "31" | "32" | "33" | "34" | "2" => TransportMode::Truck,
            _ => TransportMode::Other,
        }
    }
}

/// Container load type for ocean entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadType {
    /// Full container load
    Fcl,
    /// Less than container load (consolidated)
    Lcl,
}

/// A customs entry snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomsEntry {
    /// Broker-assigned entry number
    pub entry_number: String,
    /// Importer system code; namespaces product and order identifiers
    pub importer_code: String,
    /// Mode-of-transport code as filed
    pub transport_mode_code: String,
    /// FCL/LCL flag for ocean entries
    #[serde(default)]
    pub load_type: Option<LoadType>,
    /// Newline-delimited master bill numbers
    #[serde(default)]
    pub master_bills_of_lading: String,
    /// Newline-delimited house bill numbers
    #[serde(default)]
    pub house_bills_of_lading: String,
    /// Containers on the entry, in filing order
    #[serde(default)]
    pub container_numbers: Vec<String>,
    /// Release date
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    /// Commercial invoices, in filing order
    pub commercial_invoices: Vec<CommercialInvoice>,
}

impl CustomsEntry {
    /// Returns the decoded transport mode
    pub fn transport_mode(&self) -> TransportMode {
        TransportMode::from_code(&self.transport_mode_code)
    }

    /// True for consolidated ocean shipments, where lines must also
    /// match on commercial invoice number
    pub fn is_ocean_lcl(&self) -> bool {
        self.transport_mode() == TransportMode::Ocean && self.load_type == Some(LoadType::Lcl)
    }

    /// Master bill numbers with blanks removed
    pub fn master_bills(&self) -> Vec<&str> {
        split_multi_value(&self.master_bills_of_lading)
    }

    /// House bill numbers with blanks removed
    pub fn house_bills(&self) -> Vec<&str> {
        split_multi_value(&self.house_bills_of_lading)
    }

    /// First master bill, falling back to the first house bill
    pub fn primary_bill(&self) -> Option<&str> {
        self.master_bills()
            .first()
            .copied()
            .or_else(|| self.house_bills().first().copied())
    }

    /// Container numbers with blanks removed and duplicates dropped,
    /// preserving filing order
    pub fn containers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for number in self.container_numbers.iter().map(|c| c.trim()) {
            if !number.is_empty() && !seen.contains(&number) {
                seen.push(number);
            }
        }
        seen
    }

    /// Iterates every invoice line with its owning commercial invoice
    pub fn lines(&self) -> impl Iterator<Item = (&CommercialInvoice, &InvoiceLine)> {
        self.commercial_invoices
            .iter()
            .flat_map(|ci| ci.lines.iter().map(move |line| (ci, line)))
    }
}

/// A commercial invoice on the entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommercialInvoice {
    /// Vendor invoice number
    pub invoice_number: String,
    /// Ordered invoice lines
    pub lines: Vec<InvoiceLine>,
}

/// A commercial invoice line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub line_number: u32,
    pub po_number: String,
    pub part_number: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub container_number: Option<String>,
    #[serde(default)]
    pub unit_value: Option<Decimal>,
    #[serde(default)]
    pub hmf: Option<Decimal>,
    #[serde(default)]
    pub mpf: Option<Decimal>,
    #[serde(default)]
    pub cotton_fee: Option<Decimal>,
    #[serde(default)]
    pub add_amount: Option<Decimal>,
    #[serde(default)]
    pub cvd_amount: Option<Decimal>,
    #[serde(default)]
    pub tariffs: Vec<Tariff>,
}

impl InvoiceLine {
    /// Container reference, treating blank as absent
    pub fn container(&self) -> Option<&str> {
        self.container_number
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Duty across all tariff rows
    pub fn duty(&self) -> Decimal {
        self.tariffs.iter().map(|t| t.duty_amount.unwrap_or_default()).sum()
    }

    /// Entered value across all tariff rows
    pub fn entered_value(&self) -> Decimal {
        self.tariffs.iter().map(|t| t.entered_value.unwrap_or_default()).sum()
    }

    pub fn hmf(&self) -> Decimal {
        self.hmf.unwrap_or_default()
    }

    pub fn mpf(&self) -> Decimal {
        self.mpf.unwrap_or_default()
    }

    pub fn cotton_fee(&self) -> Decimal {
        self.cotton_fee.unwrap_or_default()
    }

    /// Antidumping plus countervailing duty
    pub fn adcvd(&self) -> Decimal {
        self.add_amount.unwrap_or_default() + self.cvd_amount.unwrap_or_default()
    }
}

/// A tariff classification row on an invoice line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tariff {
    pub hts_code: String,
    #[serde(default)]
    pub entered_value: Option<Decimal>,
    #[serde(default)]
    pub duty_amount: Option<Decimal>,
}

fn split_multi_value(value: &str) -> Vec<&str> {
    value
        .lines()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect()
}
