//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use core_kernel::{BrokerInvoiceId, Currency, Money};
use domain_customs::{BrokerInvoice, ChargeLine};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating supported Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::CAD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::MXN),
        Just(Currency::JPY),
    ]
}

/// Strategy for generating valid positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000_000i64
}

/// Strategy for generating signed amounts in minor units (never zero)
pub fn signed_amount_minor_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![1i64..100_000_000i64, -100_000_000i64..-1i64]
}

/// Strategy for generating valid Money values with positive amounts
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for generating signed Money values
pub fn signed_money_strategy() -> impl Strategy<Value = Money> {
    (signed_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for container gross weights in kilograms (0.1 to 30,000.0)
pub fn weight_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..300_000i64).prop_map(|n| Decimal::new(n, 1))
}

/// Strategy for a non-empty set of distinct container numbers with weights
pub fn weighted_containers_strategy(max: usize) -> impl Strategy<Value = Vec<(String, Decimal)>> {
    proptest::collection::vec(weight_strategy(), 1..=max).prop_map(|weights| {
        weights
            .into_iter()
            .enumerate()
            .map(|(i, w)| (format!("TGHU{:07}", i + 1), w))
            .collect()
    })
}

/// Strategy for invoice dates within 2024
pub fn invoice_date_2024_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..365i64).prop_map(|days| {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default() + Duration::days(days)
    })
}

/// Strategy for broker charge codes drawn from the default code table
pub fn charge_code_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("0001".to_string()),
        Just("0003".to_string()),
        Just("0004".to_string()),
        Just("0007".to_string()),
        Just("0044".to_string()),
        Just("0099".to_string()),
        Just("0191".to_string()),
        Just("9999".to_string()),
    ]
}

/// Strategy for broker invoices on the given entry (USD, 1 to 6 charges)
pub fn broker_invoice_strategy(entry_number: &'static str) -> impl Strategy<Value = BrokerInvoice> {
    (
        "[A-Z][0-9]{5}",
        invoice_date_2024_strategy(),
        proptest::option::of(1u32..30u32),
        proptest::collection::vec((charge_code_strategy(), signed_amount_minor_strategy()), 1..6),
    )
        .prop_map(move |(number, date, sequence, charges)| BrokerInvoice {
            id: BrokerInvoiceId::new(),
            entry_number: entry_number.to_string(),
            invoice_number: number,
            invoice_date: date,
            billing_sequence: sequence,
            currency: Currency::USD,
            charge_lines: charges
                .into_iter()
                .map(|(code, minor)| ChargeLine::new(code, Decimal::new(minor, 2)))
                .collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn positive_money_is_always_positive(money in positive_money_strategy()) {
            prop_assert!(money.amount() > Decimal::ZERO);
        }

        #[test]
        fn signed_money_is_never_zero(money in signed_money_strategy()) {
            prop_assert!(!money.is_zero());
        }

        #[test]
        fn weights_are_positive(weight in weight_strategy()) {
            prop_assert!(weight > Decimal::ZERO);
        }

        #[test]
        fn container_numbers_are_distinct(containers in weighted_containers_strategy(8)) {
            let mut numbers: Vec<_> = containers.iter().map(|(n, _)| n.clone()).collect();
            numbers.dedup();
            prop_assert_eq!(numbers.len(), containers.len());
        }

        #[test]
        fn generated_invoices_belong_to_entry(invoice in broker_invoice_strategy("31600000001")) {
            prop_assert_eq!(invoice.entry_number.as_str(), "31600000001");
            prop_assert!(!invoice.charge_lines.is_empty());
        }
    }
}
