//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for unit and integration tests, plus a few
//! complete snapshots for the common billing scenarios.

use chrono::NaiveDate;
use core_kernel::{Currency, Money};
use domain_customs::{BrokerInvoice, CustomsEntry, EntrySnapshot, ManifestShipment};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::builders::{BrokerInvoiceBuilder, EntryBuilder, InvoiceLineBuilder, ManifestLineBuilder, ShipmentBuilder};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    pub fn cad(amount: Decimal) -> Money {
        Money::new(amount, Currency::CAD)
    }

    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// A JPY amount (zero decimal places)
    pub fn jpy_10000() -> Money {
        Money::new(dec!(10000), Currency::JPY)
    }
}

/// Fixture for dates
pub struct DateFixtures;

impl DateFixtures {
    /// Entry release date (Mar 1, 2024)
    pub fn release_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
    }

    /// Default broker invoice date (Mar 5, 2024)
    pub fn invoice_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date")
    }

    /// A later invoice date (Mar 20, 2024)
    pub fn later_invoice_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).expect("valid date")
    }
}

/// Fixture for identifiers and codes
pub struct StringFixtures;

impl StringFixtures {
    pub fn entry_number() -> &'static str {
        "31612345678"
    }

    pub fn importer_code() -> &'static str {
        "ACME"
    }

    pub fn master_bill() -> &'static str {
        "MAEU123456789"
    }

    pub fn commercial_invoice() -> &'static str {
        "CI-1001"
    }

    pub fn hts_code() -> &'static str {
        "6109100012"
    }

    pub fn container_a() -> &'static str {
        "MSCU1000001"
    }

    pub fn container_b() -> &'static str {
        "MSCU2000002"
    }
}

/// Complete snapshots for common scenarios
pub struct SnapshotFixtures;

impl SnapshotFixtures {
    /// Bundles the parts of a snapshot
    pub fn snapshot(
        entry: CustomsEntry,
        broker_invoices: Vec<BrokerInvoice>,
        manifests: Vec<ManifestShipment>,
    ) -> EntrySnapshot {
        EntrySnapshot {
            entry,
            broker_invoices,
            manifests,
        }
    }

    /// Two containers weighing 1000 kg and 3000 kg, one duty-bearing line in each
    pub fn two_container_entry() -> CustomsEntry {
        EntryBuilder::new()
            .with_containers(&[StringFixtures::container_a(), StringFixtures::container_b()])
            .with_line(
                InvoiceLineBuilder::new("PO1", "PART-A", dec!(10))
                    .container(StringFixtures::container_a())
                    .duty(dec!(30))
                    .mpf(dec!(5)),
            )
            .with_line(
                InvoiceLineBuilder::new("PO1", "PART-B", dec!(20))
                    .container(StringFixtures::container_b())
                    .duty(dec!(70))
                    .mpf(dec!(7)),
            )
            .build()
    }

    /// Manifest matching [`Self::two_container_entry`]
    pub fn two_container_manifest() -> ManifestShipment {
        ShipmentBuilder::new("ASN-1")
            .container(
                StringFixtures::container_a(),
                vec![ManifestLineBuilder::for_default_importer("PO1", "PART-A", dec!(10)).weight(dec!(1000))],
            )
            .container(
                StringFixtures::container_b(),
                vec![ManifestLineBuilder::for_default_importer("PO1", "PART-B", dec!(20)).weight(dec!(3000))],
            )
            .build()
    }

    /// Broker invoice with duty, MPF, freight and a skipped direct-duty code
    pub fn standard_invoice() -> BrokerInvoice {
        BrokerInvoiceBuilder::for_default_entry("B-1001")
            .charge("0001", dec!(100))
            .charge("0003", dec!(12))
            .charge("0044", dec!(100))
            .charge("0099", dec!(55))
            .build()
    }

    /// The two-container scenario with [`Self::standard_invoice`]
    pub fn two_container_snapshot() -> EntrySnapshot {
        Self::snapshot(
            Self::two_container_entry(),
            vec![Self::standard_invoice()],
            vec![Self::two_container_manifest()],
        )
    }
}
