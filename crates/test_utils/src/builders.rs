//! Test Data Builders
//!
//! Builder patterns for entries, broker invoices and manifests. Tests set
//! only the fields they care about; everything else gets a default from
//! [`crate::fixtures`].

use chrono::NaiveDate;
use core_kernel::{BrokerInvoiceId, Currency, ShipmentId};
use domain_customs::{
    namespaced, BrokerInvoice, ChargeLine, CommercialInvoice, Container, CustomsEntry, InvoiceLine, LoadType,
    ManifestLine, ManifestShipment, Tariff, TransportMode,
};
use rust_decimal::Decimal;

use crate::fixtures::{DateFixtures, StringFixtures};

/// Builder for customs entries
pub struct EntryBuilder {
    entry_number: String,
    importer_code: String,
    transport_mode_code: String,
    load_type: Option<LoadType>,
    master_bills: Vec<String>,
    house_bills: Vec<String>,
    containers: Vec<String>,
    release_date: Option<NaiveDate>,
    commercial_invoices: Vec<CommercialInvoice>,
}

impl Default for EntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryBuilder {
    /// Ocean FCL entry with one master bill and an empty commercial invoice
    pub fn new() -> Self {
        Self {
            entry_number: StringFixtures::entry_number().to_string(),
            importer_code: StringFixtures::importer_code().to_string(),
            transport_mode_code: "11".to_string(),
            load_type: Some(LoadType::Fcl),
            master_bills: vec![StringFixtures::master_bill().to_string()],
            house_bills: Vec::new(),
            containers: Vec::new(),
            release_date: Some(DateFixtures::release_date()),
            commercial_invoices: vec![CommercialInvoice {
                invoice_number: StringFixtures::commercial_invoice().to_string(),
                lines: Vec::new(),
            }],
        }
    }

    pub fn with_entry_number(mut self, number: impl Into<String>) -> Self {
        self.entry_number = number.into();
        self
    }

    pub fn with_importer(mut self, code: impl Into<String>) -> Self {
        self.importer_code = code.into();
        self
    }

    pub fn with_transport_mode(mut self, code: impl Into<String>) -> Self {
        self.transport_mode_code = code.into();
        self
    }

    pub fn with_load_type(mut self, load_type: Option<LoadType>) -> Self {
        self.load_type = load_type;
        self
    }

    /// Replaces the master bills
    pub fn with_master_bills(mut self, bills: &[&str]) -> Self {
        self.master_bills = bills.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn with_house_bill(mut self, bill: impl Into<String>) -> Self {
        self.house_bills.push(bill.into());
        self
    }

    pub fn with_container(mut self, number: impl Into<String>) -> Self {
        self.containers.push(number.into());
        self
    }

    pub fn with_containers(mut self, numbers: &[&str]) -> Self {
        self.containers.extend(numbers.iter().map(|n| n.to_string()));
        self
    }

    /// Starts a new commercial invoice; later lines go onto it
    pub fn with_commercial_invoice(mut self, number: impl Into<String>) -> Self {
        let number = number.into();
        match self.commercial_invoices.last_mut() {
            Some(last) if last.lines.is_empty() => last.invoice_number = number,
            _ => self.commercial_invoices.push(CommercialInvoice {
                invoice_number: number,
                lines: Vec::new(),
            }),
        }
        self
    }

    /// Adds a line to the current commercial invoice, numbering it when unnumbered
    pub fn with_line(mut self, line: InvoiceLineBuilder) -> Self {
        if let Some(current) = self.commercial_invoices.last_mut() {
            let mut line = line.build();
            if line.line_number == 0 {
                line.line_number = current.lines.len() as u32 + 1;
            }
            current.lines.push(line);
        }
        self
    }

    pub fn build(self) -> CustomsEntry {
        CustomsEntry {
            entry_number: self.entry_number,
            importer_code: self.importer_code,
            transport_mode_code: self.transport_mode_code,
            load_type: self.load_type,
            master_bills_of_lading: self.master_bills.join("\n"),
            house_bills_of_lading: self.house_bills.join("\n"),
            container_numbers: self.containers,
            release_date: self.release_date,
            commercial_invoices: self.commercial_invoices,
        }
    }
}

/// Builder for commercial invoice lines
pub struct InvoiceLineBuilder {
    line: InvoiceLine,
}

impl InvoiceLineBuilder {
    pub fn new(po_number: &str, part_number: &str, quantity: Decimal) -> Self {
        Self {
            line: InvoiceLine {
                line_number: 0,
                po_number: po_number.to_string(),
                part_number: part_number.to_string(),
                quantity,
                container_number: None,
                unit_value: None,
                hmf: None,
                mpf: None,
                cotton_fee: None,
                add_amount: None,
                cvd_amount: None,
                tariffs: Vec::new(),
            },
        }
    }

    pub fn line_number(mut self, number: u32) -> Self {
        self.line.line_number = number;
        self
    }

    pub fn container(mut self, number: &str) -> Self {
        self.line.container_number = Some(number.to_string());
        self
    }

    /// Adds a tariff row carrying `amount` of duty
    pub fn duty(mut self, amount: Decimal) -> Self {
        self.line.tariffs.push(Tariff {
            hts_code: StringFixtures::hts_code().to_string(),
            entered_value: None,
            duty_amount: Some(amount),
        });
        self
    }

    pub fn hmf(mut self, amount: Decimal) -> Self {
        self.line.hmf = Some(amount);
        self
    }

    pub fn mpf(mut self, amount: Decimal) -> Self {
        self.line.mpf = Some(amount);
        self
    }

    pub fn cotton_fee(mut self, amount: Decimal) -> Self {
        self.line.cotton_fee = Some(amount);
        self
    }

    pub fn adcvd(mut self, add: Decimal, cvd: Decimal) -> Self {
        self.line.add_amount = Some(add);
        self.line.cvd_amount = Some(cvd);
        self
    }

    pub fn build(self) -> InvoiceLine {
        self.line
    }
}

/// Builder for broker invoices
pub struct BrokerInvoiceBuilder {
    invoice: BrokerInvoice,
}

impl BrokerInvoiceBuilder {
    pub fn new(entry_number: &str, invoice_number: &str) -> Self {
        Self {
            invoice: BrokerInvoice {
                id: BrokerInvoiceId::new(),
                entry_number: entry_number.to_string(),
                invoice_number: invoice_number.to_string(),
                invoice_date: DateFixtures::invoice_date(),
                billing_sequence: None,
                currency: Currency::USD,
                charge_lines: Vec::new(),
            },
        }
    }

    /// Invoice on the default fixture entry
    pub fn for_default_entry(invoice_number: &str) -> Self {
        Self::new(StringFixtures::entry_number(), invoice_number)
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.invoice.invoice_date = date;
        self
    }

    pub fn sequence(mut self, sequence: u32) -> Self {
        self.invoice.billing_sequence = Some(sequence);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.invoice.currency = currency;
        self
    }

    pub fn charge(mut self, code: &str, amount: Decimal) -> Self {
        self.invoice.charge_lines.push(ChargeLine::new(code, amount));
        self
    }

    pub fn build(self) -> BrokerInvoice {
        self.invoice
    }
}

/// Builder for manifest shipments
pub struct ShipmentBuilder {
    shipment: ManifestShipment,
}

impl ShipmentBuilder {
    /// Ocean shipment on the default master bill
    pub fn new(reference: &str) -> Self {
        Self {
            shipment: ManifestShipment {
                id: ShipmentId::new(),
                reference: reference.to_string(),
                mode: TransportMode::Ocean,
                master_bill_of_lading: Some(StringFixtures::master_bill().to_string()),
                house_bill_of_lading: None,
                containers: Vec::new(),
            },
        }
    }

    pub fn master_bill(mut self, bill: Option<&str>) -> Self {
        self.shipment.master_bill_of_lading = bill.map(String::from);
        self
    }

    pub fn house_bill(mut self, bill: Option<&str>) -> Self {
        self.shipment.house_bill_of_lading = bill.map(String::from);
        self
    }

    pub fn mode(mut self, mode: TransportMode) -> Self {
        self.shipment.mode = mode;
        self
    }

    /// Adds a container, numbering unnumbered lines in order
    pub fn container(mut self, number: &str, lines: Vec<ManifestLineBuilder>) -> Self {
        let lines = lines
            .into_iter()
            .enumerate()
            .map(|(i, builder)| {
                let mut line = builder.build();
                if line.line_number == 0 {
                    line.line_number = i as u32 + 1;
                }
                line
            })
            .collect();
        self.shipment.containers.push(Container {
            container_number: number.to_string(),
            lines,
        });
        self
    }

    pub fn build(self) -> ManifestShipment {
        self.shipment
    }
}

/// Builder for manifest lines; identifiers are namespaced on creation
pub struct ManifestLineBuilder {
    line: ManifestLine,
}

impl ManifestLineBuilder {
    pub fn new(importer_code: &str, po_number: &str, part_number: &str, quantity: Decimal) -> Self {
        Self {
            line: ManifestLine {
                line_number: 0,
                product_id: namespaced(importer_code, part_number),
                order_number: namespaced(importer_code, po_number),
                quantity,
                gross_weight: None,
                invoice_number: None,
                hts_code: None,
            },
        }
    }

    /// Line for the default fixture importer
    pub fn for_default_importer(po_number: &str, part_number: &str, quantity: Decimal) -> Self {
        Self::new(StringFixtures::importer_code(), po_number, part_number, quantity)
    }

    pub fn line_number(mut self, number: u32) -> Self {
        self.line.line_number = number;
        self
    }

    pub fn weight(mut self, kilograms: Decimal) -> Self {
        self.line.gross_weight = Some(kilograms);
        self
    }

    pub fn invoice_number(mut self, number: &str) -> Self {
        self.line.invoice_number = Some(number.to_string());
        self
    }

    pub fn hts(mut self, code: &str) -> Self {
        self.line.hts_code = Some(code.to_string());
        self
    }

    pub fn build(self) -> ManifestLine {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_entry_builder_numbers_lines_per_invoice() {
        let entry = EntryBuilder::new()
            .with_line(InvoiceLineBuilder::new("PO1", "P1", dec!(1)))
            .with_line(InvoiceLineBuilder::new("PO1", "P2", dec!(1)))
            .with_commercial_invoice("CI-2")
            .with_line(InvoiceLineBuilder::new("PO2", "P3", dec!(1)))
            .build();

        assert_eq!(entry.commercial_invoices.len(), 2);
        assert_eq!(entry.commercial_invoices[0].lines[1].line_number, 2);
        assert_eq!(entry.commercial_invoices[1].lines[0].line_number, 1);
    }

    #[test]
    fn test_manifest_line_is_namespaced() {
        let line = ManifestLineBuilder::new("ACME", "PO1", "P1", dec!(3)).build();
        assert_eq!(line.product_id, "ACME-P1");
        assert_eq!(line.order_number, "ACME-PO1");
    }
}
