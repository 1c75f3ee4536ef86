//! Reversal source search
//!
//! A credit invoice that exactly mirrors an earlier invoice (same charge
//! codes, negated total) reverses it. The earlier invoice's sent documents
//! are then replayed as decrements instead of generating fresh ones.

use domain_customs::BrokerInvoice;

/// Earlier invoices that `credit` could reverse, oldest first
///
/// `invoices` must be in chronological order. Only invoices strictly before
/// `credit` are considered. Returns nothing when `credit` is not a credit.
pub fn reversal_candidates<'a>(credit: &BrokerInvoice, invoices: &[&'a BrokerInvoice]) -> Vec<&'a BrokerInvoice> {
    if !credit.is_credit() {
        return Vec::new();
    }

    let target = -credit.total();
    let codes = credit.sorted_charge_codes();

    invoices
        .iter()
        .copied()
        .filter(|candidate| candidate.chronological_cmp(credit).is_lt())
        .filter(|candidate| candidate.total() == target)
        .filter(|candidate| candidate.sorted_charge_codes() == codes)
        .collect()
}
