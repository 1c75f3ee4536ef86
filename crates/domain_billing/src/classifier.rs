//! Charge classification
//!
//! Sorts broker charge codes into duty-level charges (attached to matched
//! invoice lines), container-level charges (prorated across containers) and
//! codes that are never billed here.

use tracing::warn;

use core_kernel::{Money, Rate};

use crate::config::{ChargeCodeTable, CombinedTaxSplit, DutyComponent};

/// Where a broker charge is billed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeCategory {
    /// Line-level charge for one duty component
    Duty(DutyComponent),
    /// Container-level charge
    Container,
    /// Not billed through outbound documents
    Skip,
}

/// Result of classifying one charge code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: ChargeCategory,
    /// Outbound charge identifier; `None` for skipped codes
    pub outbound_code: Option<String>,
}

impl Classification {
    fn skip() -> Self {
        Self {
            category: ChargeCategory::Skip,
            outbound_code: None,
        }
    }
}

/// Classifies broker charge codes against a code table
#[derive(Debug, Clone, Copy)]
pub struct ChargeClassifier<'c> {
    table: &'c ChargeCodeTable,
}

impl<'c> ChargeClassifier<'c> {
    pub fn new(table: &'c ChargeCodeTable) -> Self {
        Self { table }
    }

    /// Classifies `code`
    ///
    /// Skip list first, then duty codes, then the container table. Unknown
    /// codes are billed at container level under the catch-all identifier.
    pub fn classify(&self, code: &str) -> Classification {
        let code = code.trim();

        if self.table.skip_codes.iter().any(|c| c.trim() == code) {
            return Classification::skip();
        }

        if let Some(duty) = self.table.duty_codes.get(code) {
            return Classification {
                category: ChargeCategory::Duty(duty.component),
                outbound_code: Some(duty.outbound_code.clone()),
            };
        }

        let outbound_code = match self.table.container_codes.get(code) {
            Some(outbound) => outbound.clone(),
            None => {
                warn!(
                    charge_code = code,
                    catch_all = %self.table.catch_all_code,
                    "unmapped charge code billed under catch-all"
                );
                self.table.catch_all_code.clone()
            }
        };

        Classification {
            category: ChargeCategory::Container,
            outbound_code: Some(outbound_code),
        }
    }
}

/// Federal and provincial parts of a combined tax charge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxSplit {
    pub federal: Money,
    /// Absent when nothing is left after the federal part
    pub provincial: Option<Money>,
}

/// Decomposes a combined tax charge
///
/// Federal is the configured rate of the taxable charges, rounded to the
/// currency; provincial is what remains of the tax. When the remainder is
/// not positive the whole tax stays federal. Both parts carry the sign of
/// `tax`.
pub fn split_combined_tax(split: &CombinedTaxSplit, tax: Money, taxable: Money) -> TaxSplit {
    let magnitude = tax.abs();
    let federal = Rate::from_percentage(split.federal_rate_percent)
        .apply(&taxable.abs())
        .round_to_currency();
    let provincial = Money::new(magnitude.amount() - federal.amount(), tax.currency());

    if provincial.is_positive() {
        TaxSplit {
            federal: federal.with_sign_of(&tax),
            provincial: Some(provincial.with_sign_of(&tax)),
        }
    } else {
        TaxSplit {
            federal: magnitude.with_sign_of(&tax),
            provincial: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn cad(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::CAD)
    }

    #[test]
    fn test_skip_codes() {
        let table = ChargeCodeTable::default();
        let classifier = ChargeClassifier::new(&table);
        for code in ["0099", "0600", "0090"] {
            assert_eq!(classifier.classify(code).category, ChargeCategory::Skip);
            assert_eq!(classifier.classify(code).outbound_code, None);
        }
    }

    #[test]
    fn test_duty_codes() {
        let table = ChargeCodeTable::default();
        let classifier = ChargeClassifier::new(&table);

        let duty = classifier.classify("0001");
        assert_eq!(duty.category, ChargeCategory::Duty(DutyComponent::Duty));
        assert_eq!(duty.outbound_code.as_deref(), Some("C530"));

        assert_eq!(classifier.classify(" 0004 ").category, ChargeCategory::Duty(DutyComponent::Hmf));
    }

    #[test]
    fn test_container_and_catch_all() {
        let table = ChargeCodeTable::default();
        let classifier = ChargeClassifier::new(&table);

        let freight = classifier.classify("0044");
        assert_eq!(freight.category, ChargeCategory::Container);
        assert_eq!(freight.outbound_code.as_deref(), Some("C080"));

        let unknown = classifier.classify("0777");
        assert_eq!(unknown.category, ChargeCategory::Container);
        assert_eq!(unknown.outbound_code.as_deref(), Some("C099"));
    }

    #[test]
    fn test_skip_wins_over_tables() {
        let mut table = ChargeCodeTable::default();
        table.skip_codes.push("0044".into());
        let classifier = ChargeClassifier::new(&table);
        assert_eq!(classifier.classify("0044").category, ChargeCategory::Skip);
    }

    #[test]
    fn test_combined_tax_split() {
        let split = CombinedTaxSplit::default();

        let parts = split_combined_tax(&split, cad(dec!(13)), cad(dec!(100)));
        assert_eq!(parts.federal, cad(dec!(5.00)));
        assert_eq!(parts.provincial, Some(cad(dec!(8.00))));

        let parts = split_combined_tax(&split, cad(dec!(-13)), cad(dec!(-100)));
        assert_eq!(parts.federal, cad(dec!(-5)));
        assert_eq!(parts.provincial, Some(cad(dec!(-8))));
    }

    #[test]
    fn test_combined_tax_split_rounds_federal() {
        let parts = split_combined_tax(&CombinedTaxSplit::default(), cad(dec!(20)), cad(dec!(123.45)));
        // 5% of 123.45 = 6.1725
        assert_eq!(parts.federal, cad(dec!(6.17)));
        assert_eq!(parts.provincial, Some(cad(dec!(13.83))));
    }

    #[test]
    fn test_combined_tax_too_small_stays_federal() {
        let parts = split_combined_tax(&CombinedTaxSplit::default(), cad(dec!(4)), cad(dec!(100)));
        assert_eq!(parts.federal, cad(dec!(4)));
        assert_eq!(parts.provincial, None);

        let parts = split_combined_tax(&CombinedTaxSplit::default(), cad(dec!(5)), cad(dec!(100)));
        assert_eq!(parts.federal, cad(dec!(5)));
        assert_eq!(parts.provincial, None);
    }
}
