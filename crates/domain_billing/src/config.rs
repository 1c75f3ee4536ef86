//! Billing configuration
//!
//! Charge-code tables and document addressing for one customer. Every field
//! has a default so a partial TOML file or a handful of environment
//! overrides is enough to run.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use domain_customs::InvoiceLine;

/// Duty-level amount carried on each commercial invoice line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyComponent {
    Duty,
    Hmf,
    Mpf,
    CottonFee,
    Adcvd,
}

impl DutyComponent {
    /// The line's amount for this component (unsigned as filed)
    pub fn line_amount(&self, line: &InvoiceLine) -> Decimal {
        match self {
            DutyComponent::Duty => line.duty(),
            DutyComponent::Hmf => line.hmf(),
            DutyComponent::Mpf => line.mpf(),
            DutyComponent::CottonFee => line.cotton_fee(),
            DutyComponent::Adcvd => line.adcvd(),
        }
    }
}

/// Mapping of a duty-level broker charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyCode {
    pub component: DutyComponent,
    pub outbound_code: String,
}

impl DutyCode {
    fn new(component: DutyComponent, outbound_code: &str) -> Self {
        Self {
            component,
            outbound_code: outbound_code.to_string(),
        }
    }
}

/// Broker charge code tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeCodeTable {
    /// Codes never billed through this interface
    pub skip_codes: Vec<String>,
    /// Broker code to duty component and line-level outbound code
    pub duty_codes: BTreeMap<String, DutyCode>,
    /// Broker code to container-level outbound code
    pub container_codes: BTreeMap<String, String>,
    /// Outbound code for container charges missing from the table
    pub catch_all_code: String,
}

impl Default for ChargeCodeTable {
    fn default() -> Self {
        let skip_codes = ["0099", "0600", "0090"].iter().map(|c| c.to_string()).collect();

        let duty_codes = [
            ("0001", DutyCode::new(DutyComponent::Duty, "C530")),
            ("0003", DutyCode::new(DutyComponent::Mpf, "D501")),
            ("0004", DutyCode::new(DutyComponent::Hmf, "D503")),
            ("0005", DutyCode::new(DutyComponent::CottonFee, "D510")),
            ("0006", DutyCode::new(DutyComponent::Adcvd, "C531")),
        ]
        .into_iter()
        .map(|(code, mapping)| (code.to_string(), mapping))
        .collect();

        let container_codes = [
            ("0007", "C060"), // brokerage
            ("0044", "C080"), // ocean freight
            ("0045", "C081"), // drayage
            ("0046", "C082"), // chassis
            ("0162", "C090"), // terminal handling
            ("0191", "C100"), // ISF filing
            ("0250", "C250"), // combined sales tax
        ]
        .into_iter()
        .map(|(code, outbound)| (code.to_string(), outbound.to_string()))
        .collect();

        Self {
            skip_codes,
            duty_codes,
            container_codes,
            catch_all_code: "C099".to_string(),
        }
    }
}

/// Decomposition of a combined (federal + provincial) sales tax charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedTaxSplit {
    /// Broker code of the combined tax charge
    pub combined_tax_code: String,
    pub federal_outbound_code: String,
    pub provincial_outbound_code: String,
    /// Federal rate as a percentage
    pub federal_rate_percent: Decimal,
    /// Broker codes of taxable container charges; empty means every
    /// container charge other than the tax itself
    pub taxable_codes: Vec<String>,
}

impl Default for CombinedTaxSplit {
    fn default() -> Self {
        Self {
            combined_tax_code: "0250".to_string(),
            federal_outbound_code: "C251".to_string(),
            provincial_outbound_code: "C252".to_string(),
            federal_rate_percent: dec!(5),
            taxable_codes: Vec::new(),
        }
    }
}

/// Billing configuration for one customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Sender identifier on outbound documents
    pub sender_code: String,
    /// Receiving partner identifier on outbound documents
    pub partner_code: String,
    /// Overrides the entry's importer code when namespacing manifest identifiers
    pub importer_code: Option<String>,
    pub charge_codes: ChargeCodeTable,
    /// Canadian combined tax split; disabled when absent
    pub canada_tax_split: Option<CombinedTaxSplit>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            sender_code: "BROKER".to_string(),
            partner_code: "CUSTOMER".to_string(),
            importer_code: None,
            charge_codes: ChargeCodeTable::default(),
            canada_tax_split: None,
        }
    }
}

impl BillingConfig {
    /// Enables the Canadian tax split
    pub fn with_canada_tax_split(mut self, split: CombinedTaxSplit) -> Self {
        self.canada_tax_split = Some(split);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BillingConfig::default();
        assert_eq!(config.sender_code, "BROKER");
        assert_eq!(config.charge_codes.catch_all_code, "C099");
        assert!(config.charge_codes.skip_codes.contains(&"0099".to_string()));
        assert_eq!(config.charge_codes.duty_codes["0003"].component, DutyComponent::Mpf);
        assert!(config.canada_tax_split.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: BillingConfig =
            serde_json::from_str(r#"{"partner_code": "ACME", "charge_codes": {"catch_all_code": "X999"}}"#).unwrap();
        assert_eq!(config.partner_code, "ACME");
        assert_eq!(config.sender_code, "BROKER");
        assert_eq!(config.charge_codes.catch_all_code, "X999");
        assert_eq!(config.charge_codes.duty_codes.len(), 5);
    }
}
