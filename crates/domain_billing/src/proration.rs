//! Weight proration
//!
//! Splits one container-level charge across the containers of an entry in
//! proportion to their manifest weight.
//!
//! # Rules
//!
//! - Shares are computed on the absolute amount and truncated to the
//!   currency's minor unit, so they never overshoot.
//! - The remainder is handed out one minor unit at a time in container
//!   order, skipping containers whose share is zero, cycling until it is
//!   used up. When every share is zero the units go to containers in order.
//! - The original sign is re-applied to every share.
//! - The shares must add back up to the charge exactly.

use indexmap::IndexMap;
use rust_decimal::Decimal;

use core_kernel::Money;

use crate::error::ProrationError;

/// Splits `amount` across `containers` by weight
///
/// `weight_of` supplies each container's weight; a missing or non-positive
/// weight fails the whole call. Duplicate container numbers are counted
/// once. The result preserves container order.
pub fn prorate<F>(
    charge_code: &str,
    amount: Money,
    containers: &[String],
    weight_of: F,
) -> Result<IndexMap<String, Money>, ProrationError>
where
    F: Fn(&str) -> Option<Decimal>,
{
    let mut weights: IndexMap<&str, Decimal> = IndexMap::new();
    for container in containers {
        let weight = weight_of(container)
            .filter(|w| *w > Decimal::ZERO)
            .ok_or_else(|| ProrationError::MissingWeight {
                charge_code: charge_code.to_string(),
                container_number: container.clone(),
            })?;
        weights.entry(container.as_str()).or_insert(weight);
    }

    if weights.is_empty() {
        return Err(ProrationError::NoContainers {
            charge_code: charge_code.to_string(),
        });
    }

    let currency = amount.currency();
    let unit = currency.minor_unit();
    let total = amount.amount().abs();
    let total_weight: Decimal = weights.values().copied().sum();

    let mut shares: Vec<Decimal> = weights
        .values()
        .map(|w| Money::new(total * *w / total_weight, currency).truncate_to_currency().amount())
        .collect();

    let mut remainder = total - shares.iter().copied().sum::<Decimal>();
    if remainder > Decimal::ZERO {
        let mut eligible: Vec<usize> = (0..shares.len()).filter(|i| !shares[*i].is_zero()).collect();
        if eligible.is_empty() {
            eligible = (0..shares.len()).collect();
        }

        for index in eligible.iter().cycle() {
            if remainder <= Decimal::ZERO {
                break;
            }
            let step = remainder.min(unit);
            shares[*index] += step;
            remainder -= step;
        }
    }

    let negative = amount.is_negative();
    let result: IndexMap<String, Money> = weights
        .keys()
        .zip(shares)
        .map(|(container, share)| {
            let signed = if negative { -share } else { share };
            (container.to_string(), Money::new(signed, currency))
        })
        .collect();

    let allocated: Decimal = result.values().map(|m| m.amount()).sum();
    if allocated != amount.amount() {
        return Err(ProrationError::Unreconciled {
            charge_code: charge_code.to_string(),
            expected: amount,
            allocated: Money::new(allocated, currency),
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use test_utils::{assert_all_in_currency, assert_money_sum_equals, assert_whole_minor_units, MoneyFixtures};

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn weights(pairs: &[(&str, Decimal)]) -> HashMap<String, Decimal> {
        pairs.iter().map(|(c, w)| (c.to_string(), *w)).collect()
    }

    #[test]
    fn test_weight_ratio() {
        let w = weights(&[("A", dec!(1000)), ("B", dec!(3000))]);
        let result = prorate("0044", MoneyFixtures::usd_100(), &names(&["A", "B"]), |c| w.get(c).copied()).unwrap();
        assert_eq!(result["A"], usd(dec!(25.00)));
        assert_eq!(result["B"], usd(dec!(75.00)));
    }

    #[test]
    fn test_remainder_goes_to_first_container() {
        let w = weights(&[("A", dec!(500)), ("B", dec!(500))]);
        let result = prorate("0044", usd(dec!(100.01)), &names(&["A", "B"]), |c| w.get(c).copied()).unwrap();
        assert_eq!(result["A"], usd(dec!(50.01)));
        assert_eq!(result["B"], usd(dec!(50.00)));
    }

    #[test]
    fn test_remainder_skips_zero_shares() {
        // C's share truncates to zero; the leftover cents go to A and B
        let w = weights(&[("A", dec!(1000)), ("B", dec!(1000)), ("C", dec!(0.001))]);
        let result =
            prorate("0044", usd(dec!(0.05)), &names(&["A", "B", "C"]), |c| w.get(c).copied()).unwrap();
        assert_eq!(result["A"], usd(dec!(0.03)));
        assert_eq!(result["B"], usd(dec!(0.02)));
        assert_eq!(result["C"], usd(dec!(0)));
    }

    #[test]
    fn test_all_zero_shares_assigned_in_order() {
        let w = weights(&[("A", dec!(1)), ("B", dec!(1)), ("C", dec!(1))]);
        let result =
            prorate("0044", usd(dec!(0.02)), &names(&["A", "B", "C"]), |c| w.get(c).copied()).unwrap();
        assert_eq!(result["A"], usd(dec!(0.01)));
        assert_eq!(result["B"], usd(dec!(0.01)));
        assert_eq!(result["C"], usd(dec!(0)));
    }

    #[test]
    fn test_zero_decimal_currency_splits_whole_yen() {
        let total = MoneyFixtures::jpy_10000();
        let result = prorate("0044", total, &names(&["A", "B", "C"]), |_| Some(dec!(1))).unwrap();

        let shares: Vec<Money> = result.values().copied().collect();
        assert_eq!(shares[0].amount(), dec!(3334));
        assert_eq!(shares[1].amount(), dec!(3333));
        assert_eq!(shares[2].amount(), dec!(3333));
        shares.iter().for_each(assert_whole_minor_units);
        assert_money_sum_equals(&shares, &total);
    }

    #[test]
    fn test_negative_amount_keeps_sign() {
        let w = weights(&[("A", dec!(500)), ("B", dec!(500))]);
        let result = prorate("0044", usd(dec!(-100.01)), &names(&["A", "B"]), |c| w.get(c).copied()).unwrap();
        assert_eq!(result["A"], usd(dec!(-50.01)));
        assert_eq!(result["B"], usd(dec!(-50.00)));
    }

    #[test]
    fn test_missing_weight_fails() {
        let w = weights(&[("A", dec!(500)), ("B", dec!(0))]);
        let err = prorate("0044", usd(dec!(10)), &names(&["A", "B"]), |c| w.get(c).copied()).unwrap_err();
        assert_eq!(
            err,
            ProrationError::MissingWeight {
                charge_code: "0044".into(),
                container_number: "B".into()
            }
        );

        let err = prorate("0044", usd(dec!(10)), &names(&["A", "Z"]), |c| w.get(c).copied()).unwrap_err();
        assert!(matches!(err, ProrationError::MissingWeight { .. }));
    }

    #[test]
    fn test_no_containers() {
        let err = prorate("0044", usd(dec!(10)), &[], |_| Some(dec!(1))).unwrap_err();
        assert!(matches!(err, ProrationError::NoContainers { .. }));
    }

    #[test]
    fn test_order_preserved() {
        let result = prorate("0044", usd(dec!(9)), &names(&["Z", "A", "M"]), |_| Some(dec!(1))).unwrap();
        let keys: Vec<&str> = result.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }

    proptest! {
        #[test]
        fn shares_sum_to_amount_with_matching_sign(
            cents in -10_000_000i64..10_000_000i64,
            raw_weights in prop::collection::vec(1u32..50_000, 1..8),
        ) {
            let amount = Money::from_minor(cents, Currency::USD);
            let containers: Vec<String> = (0..raw_weights.len()).map(|i| format!("C{}", i)).collect();
            let lookup: HashMap<String, Decimal> = containers
                .iter()
                .cloned()
                .zip(raw_weights.iter().map(|w| Decimal::from(*w)))
                .collect();

            let result = prorate("0044", amount, &containers, |c| lookup.get(c).copied()).unwrap();

            let shares: Vec<Money> = result.values().copied().collect();
            assert_money_sum_equals(&shares, &amount);
            assert_all_in_currency(&shares, Currency::USD);
            for share in &shares {
                prop_assert!(!(share.is_positive() && amount.is_negative()));
                prop_assert!(!(share.is_negative() && amount.is_positive()));
                assert_whole_minor_units(share);
            }
        }
    }
}
