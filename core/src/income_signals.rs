//! Income stability computer: payroll detection and cash-flow buffer.
//!
//! Detection runs in two passes:
//!   1. Candidate deposits: inflows into depository accounts that are not
//!      transfers and look like pay (coded, large ACH, or payroll-named payer).
//!   2. Payer groups: candidates grouped by payer. A group with 2+ deposits
//!      qualifies if it is payroll-coded, or its cadence and amounts are
//!      consistent (every gap >= min_gap_days, amount CV <= max_amount_cv).
//!
//! Paychecks are the deposits of every qualifying group, date-ordered.

use crate::{
    config::EngineConfig,
    model::{PaymentChannel, TransactionRecord},
    signals::{coefficient_of_variation, median, monthly_essential_outflow, safe_div, to_monthly, NEAR_ZERO},
    window::WindowSlice,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

const UNATTRIBUTED_PAYER: &str = "(unattributed)";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayCadence {
    Weekly,
    Biweekly,
    SemiMonthly,
    Monthly,
    Irregular,
    #[default]
    Unknown,
}

impl PayCadence {
    pub fn from_median_gap(gap_days: f64) -> Self {
        match gap_days {
            g if g <= 0.0  => Self::Unknown,
            g if g <= 8.0  => Self::Weekly,
            g if g <= 14.5 => Self::Biweekly,
            g if g <= 17.0 => Self::SemiMonthly,
            g if g <= 35.0 => Self::Monthly,
            _              => Self::Irregular,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IncomeSignals {
    pub payroll_detected:       bool,
    pub paycheck_count:         usize,
    /// Median days between consecutive paychecks; 0 when not detected.
    pub payroll_frequency_days: f64,
    pub cadence:                PayCadence,
    /// Coefficient of variation of paycheck amounts, percent.
    pub income_variability:     f64,
    pub monthly_income:         f64,
    /// Checking balance over monthly essential outflow. 0 when unmeasured.
    pub income_buffer_months:   f64,
    /// False when the window had no essential outflow to divide by.
    pub buffer_measured:        bool,
}

pub fn compute_income(slice: &WindowSlice<'_>, config: &EngineConfig) -> IncomeSignals {
    let rules = &config.income;
    let savings_subtypes = &config.savings.savings_subtypes;

    let depository_ids: HashSet<&str> = slice
        .accounts
        .iter()
        .filter(|a| a.is_depository())
        .map(|a| a.account_id.as_str())
        .collect();

    let checking_balance: f64 = slice
        .accounts
        .iter()
        .filter(|a| a.is_depository() && !a.has_subtype(savings_subtypes))
        .map(|a| a.current_balance)
        .sum();
    let monthly_outflow = monthly_essential_outflow(slice, &config.spending);
    let income_buffer_months = safe_div(checking_balance, monthly_outflow).max(0.0);
    let buffer_measured = monthly_outflow >= NEAR_ZERO;

    // Pass 1: candidates grouped by payer.
    let mut by_payer: BTreeMap<&str, Vec<&TransactionRecord>> = BTreeMap::new();
    for txn in slice.transactions.iter().copied() {
        if !txn.is_inflow()
            || !depository_ids.contains(txn.account_id.as_str())
            || txn.has_any_category(&config.spending.transfer_in_codes)
        {
            continue;
        }
        let coded = txn.has_any_category(&rules.payroll_category_codes);
        let large_ach = txn.channel == PaymentChannel::Ach && txn.amount >= rules.min_ach_deposit;
        let named = txn.merchant.as_deref().is_some_and(|m| {
            let m = m.to_ascii_lowercase();
            rules.payroll_name_hints.iter().any(|hint| m.contains(hint.as_str()))
        });
        if coded || large_ach || named {
            let payer = txn.merchant.as_deref().unwrap_or(UNATTRIBUTED_PAYER);
            by_payer.entry(payer).or_default().push(txn);
        }
    }

    // Pass 2: keep payer groups with consistent cadence or explicit coding.
    let mut paychecks: Vec<&TransactionRecord> = Vec::new();
    for (payer, deposits) in &by_payer {
        if deposits.len() < 2 {
            continue;
        }
        let coded = deposits
            .iter()
            .all(|t| t.has_any_category(&rules.payroll_category_codes));
        let amounts: Vec<f64> = deposits.iter().map(|t| t.amount).collect();
        let min_gap = deposits
            .windows(2)
            .map(|w| (w[1].date - w[0].date).num_days())
            .min()
            .unwrap_or(0);
        let consistent = min_gap >= rules.min_gap_days
            && coefficient_of_variation(&amounts) <= rules.max_amount_cv;

        if coded || consistent {
            paychecks.extend(deposits.iter().copied());
        } else {
            log::debug!(
                "subject={} payer={payer}: {} deposits rejected (min gap {min_gap}d)",
                slice.window.subject_id,
                deposits.len()
            );
        }
    }
    paychecks.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.transaction_id.cmp(&b.transaction_id))
    });

    if paychecks.len() < 2 {
        return IncomeSignals {
            income_buffer_months,
            buffer_measured,
            ..IncomeSignals::default()
        };
    }

    let gaps: Vec<f64> = paychecks
        .windows(2)
        .map(|w| (w[1].date - w[0].date).num_days() as f64)
        .collect();
    let amounts: Vec<f64> = paychecks.iter().map(|t| t.amount).collect();
    let payroll_frequency_days = median(&gaps);

    IncomeSignals {
        payroll_detected: true,
        paycheck_count: paychecks.len(),
        payroll_frequency_days,
        cadence: PayCadence::from_median_gap(payroll_frequency_days),
        income_variability: coefficient_of_variation(&amounts) * 100.0,
        monthly_income: to_monthly(amounts.iter().sum(), slice.window_days()),
        income_buffer_months,
        buffer_measured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_labels() {
        assert_eq!(PayCadence::from_median_gap(0.0), PayCadence::Unknown);
        assert_eq!(PayCadence::from_median_gap(7.0), PayCadence::Weekly);
        assert_eq!(PayCadence::from_median_gap(14.0), PayCadence::Biweekly);
        assert_eq!(PayCadence::from_median_gap(15.5), PayCadence::SemiMonthly);
        assert_eq!(PayCadence::from_median_gap(30.0), PayCadence::Monthly);
        assert_eq!(PayCadence::from_median_gap(60.0), PayCadence::Irregular);
    }
}
