//! Money assertions for billing tests
//!
//! Panic messages name the amounts involved, which plain `assert_eq!` on
//! a sum or a remainder check would not.

use core_kernel::{Currency, Money};

/// Asserts that `parts` add up to exactly `total`
pub fn assert_money_sum_equals(parts: &[Money], total: &Money) {
    let sum = parts.iter().fold(Money::zero(total.currency()), |acc, m| {
        acc.checked_add(m).expect("Currency mismatch in sum")
    });

    assert_eq!(
        sum.amount(),
        total.amount(),
        "Sum of parts ({}) doesn't equal total ({})",
        sum.amount(),
        total.amount()
    );
}

/// Asserts that an amount is a whole number of the currency's minor units
pub fn assert_whole_minor_units(money: &Money) {
    let unit = money.currency().minor_unit();
    assert!(
        (money.amount() % unit).is_zero(),
        "{} is not a whole number of {} minor units",
        money.amount(),
        money.currency()
    );
}

/// Asserts that all parts carry the given currency
pub fn assert_all_in_currency(parts: &[Money], currency: Currency) {
    for part in parts {
        assert_eq!(part.currency(), currency, "Unexpected currency on {}", part);
    }
}

/// Asserts that a credit amount is below zero
pub fn assert_money_negative(money: &Money) {
    assert!(
        money.is_negative(),
        "Expected a negative amount, got {} {}",
        money.currency(),
        money.amount()
    );
}
