//! Billing domain errors

use thiserror::Error;

use core_kernel::{Money, MoneyError, PortError};
use domain_customs::CustomsError;

/// Errors raised while prorating a container charge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProrationError {
    /// Nothing to prorate across
    #[error("No containers to prorate charge {charge_code} across")]
    NoContainers { charge_code: String },

    /// A container has no usable weight
    #[error("Container {container_number} has no weight; cannot prorate charge {charge_code}")]
    MissingWeight {
        charge_code: String,
        container_number: String,
    },

    /// Allocated shares do not add back up to the charge
    #[error("Proration of {charge_code} does not reconcile: expected {expected}, allocated {allocated}")]
    Unreconciled {
        charge_code: String,
        expected: Money,
        allocated: Money,
    },
}

/// Errors raised while rendering an outbound document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("Failed to render document XML: {0}")]
    Render(String),
}

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Snapshot or manifest matching problem
    #[error(transparent)]
    Customs(#[from] CustomsError),

    /// Container charge could not be split
    #[error(transparent)]
    Proration(#[from] ProrationError),

    /// Document could not be produced
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Money arithmetic error
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Ledger, archive or transport failure
    #[error(transparent)]
    Port(#[from] PortError),
}

impl BillingError {
    /// True for internal inconsistencies that must abort the run rather
    /// than be recorded and retried
    pub fn is_defect(&self) -> bool {
        matches!(self, BillingError::Proration(ProrationError::Unreconciled { .. }))
    }

    /// Message recorded on the send ledger
    pub fn ledger_message(&self) -> String {
        match self {
            BillingError::Customs(customs @ CustomsError::UnmatchedLines(_)) => {
                format!("{}\n{}", customs, customs.detail())
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_unreconciled_is_defect() {
        let defect = BillingError::from(ProrationError::Unreconciled {
            charge_code: "0044".into(),
            expected: Money::new(dec!(10), Currency::USD),
            allocated: Money::new(dec!(9.99), Currency::USD),
        });
        assert!(defect.is_defect());

        let missing = BillingError::from(ProrationError::MissingWeight {
            charge_code: "0044".into(),
            container_number: "C1".into(),
        });
        assert!(!missing.is_defect());
        assert!(!BillingError::from(PortError::connection("down")).is_defect());
    }

    #[test]
    fn test_display_mentions_container() {
        let err = ProrationError::MissingWeight {
            charge_code: "0044".into(),
            container_number: "MSCU1234567".into(),
        };
        assert!(err.to_string().contains("MSCU1234567"));
    }
}
