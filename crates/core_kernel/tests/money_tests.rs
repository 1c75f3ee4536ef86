//! Unit tests for the Money module
//!
//! Tests cover money creation, signed arithmetic, truncation and rounding,
//! currency handling, and rate application.

use core_kernel::{Money, Currency, MoneyError, Rate};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_from_minor_converts_cents_correctly() {
        assert_eq!(Money::from_minor(10050, Currency::USD).amount(), dec!(100.50));
        assert_eq!(Money::from_minor(-1, Currency::CAD).amount(), dec!(-0.01));
    }

    #[test]
    fn test_from_minor_handles_jpy_no_decimals() {
        let m = Money::from_minor(10000, Currency::JPY);
        assert_eq!(m.amount(), dec!(10000));
    }

    #[test]
    fn test_negative_amount_is_credit() {
        let m = Money::new(dec!(-15.00), Currency::USD);
        assert!(m.is_negative());
        assert!(!m.is_positive());
        assert!(!Money::zero(Currency::USD).is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_currency_mismatch() {
        let a = Money::new(dec!(1), Currency::USD);
        let b = Money::new(dec!(1), Currency::CAD);
        assert_eq!(
            a.checked_add(&b),
            Err(MoneyError::CurrencyMismatch("USD".into(), "CAD".into()))
        );
    }

    #[test]
    fn test_checked_sub_can_go_negative() {
        let a = Money::new(dec!(10.00), Currency::USD);
        let b = Money::new(dec!(15.00), Currency::USD);
        assert_eq!(a.checked_sub(&b).unwrap().amount(), dec!(-5.00));
    }

    #[test]
    fn test_negation() {
        let m = Money::new(dec!(100.01), Currency::USD);
        assert_eq!((-m).amount(), dec!(-100.01));
        assert_eq!((-(-m)).amount(), dec!(100.01));
    }

    #[test]
    fn test_divide_by_zero_error() {
        let m = Money::new(dec!(100), Currency::USD);
        assert_eq!(m.divide(dec!(0)), Err(MoneyError::DivisionByZero));
    }

    #[test]
    fn test_sum_of_amounts() {
        let amounts = vec![
            Money::new(dec!(10.00), Currency::USD),
            Money::new(dec!(5.00), Currency::USD),
            Money::new(dec!(-2.50), Currency::USD),
        ];
        assert_eq!(Money::sum(Currency::USD, &amounts).unwrap().amount(), dec!(12.50));
    }

    #[test]
    fn test_sum_rejects_mixed_currencies() {
        let amounts = vec![
            Money::new(dec!(10.00), Currency::USD),
            Money::new(dec!(5.00), Currency::CAD),
        ];
        assert!(Money::sum(Currency::USD, &amounts).is_err());
    }
}

mod truncation_and_rounding {
    use super::*;

    #[test]
    fn test_truncate_positive() {
        let m = Money::new(dec!(33.3333), Currency::USD);
        assert_eq!(m.truncate_to_currency().amount(), dec!(33.33));
    }

    #[test]
    fn test_truncate_does_not_round_half_up() {
        let m = Money::new(dec!(66.6666), Currency::USD);
        assert_eq!(m.truncate_to_currency().amount(), dec!(66.66));
    }

    #[test]
    fn test_round_to_currency_half_away_from_zero() {
        assert_eq!(Money::new(dec!(2.345), Currency::CAD).round_to_currency().amount(), dec!(2.35));
        assert_eq!(Money::new(dec!(-2.345), Currency::CAD).round_to_currency().amount(), dec!(-2.35));
    }

    #[test]
    fn test_minor_unit() {
        assert_eq!(Currency::USD.minor_unit(), dec!(0.01));
        assert_eq!(Currency::JPY.minor_unit(), dec!(1));
    }
}

mod display {
    use super::*;

    #[test]
    fn test_money_display_usd() {
        let m = Money::new(dec!(1234.5), Currency::USD);
        assert_eq!(m.to_string(), "USD 1234.50");
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(Currency::CAD.to_string(), "CAD");
    }
}

mod rate {
    use super::*;

    #[test]
    fn test_rate_from_percentage() {
        let rate = Rate::from_percentage(dec!(5));
        assert_eq!(rate.as_decimal(), dec!(0.05));
    }

    #[test]
    fn test_rate_apply() {
        let rate = Rate::new(dec!(0.05));
        let m = Money::new(dec!(123.45), Currency::CAD);
        assert_eq!(rate.apply(&m).round_to_currency().amount(), dec!(6.17));
    }
}

mod serialization {
    use super::*;

    #[test]
    fn test_currency_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Currency::CAD).unwrap(), "\"CAD\"");
        let parsed: Currency = serde_json::from_str("\"USD\"").unwrap();
        assert_eq!(parsed, Currency::USD);
    }
}
