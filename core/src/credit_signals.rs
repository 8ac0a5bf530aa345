//! Credit computer: utilization, interest, payment behaviour, overdue status.

use crate::{
    config::EngineConfig,
    signals::safe_div,
    window::{WindowSlice, WindowType},
};
use serde::{Deserialize, Serialize};

const ZERO_BALANCE: f64 = 0.005;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreditSignals {
    pub credit_account_count:   usize,
    /// Highest balance/limit fraction across credit accounts.
    pub max_utilization:        f64,
    pub utilization_30_flag:    bool,
    pub utilization_50_flag:    bool,
    pub utilization_80_flag:    bool,
    /// Interest-coded charges in the window, positive.
    pub interest_charges:       f64,
    pub minimum_payment_only:   bool,
    pub overdue:                bool,
    /// LONG window only: every credit account sat at $0 with no charges.
    pub zero_balance_sustained: bool,
}

impl CreditSignals {
    pub fn utilization_pct(&self) -> f64 {
        self.max_utilization * 100.0
    }
}

pub fn compute_credit(slice: &WindowSlice<'_>, config: &EngineConfig) -> CreditSignals {
    let rules = &config.credit;
    let credit_accounts: Vec<_> = slice.accounts.iter().filter(|a| a.is_credit()).collect();

    let max_utilization = credit_accounts
        .iter()
        .map(|a| {
            let limit = a.credit_limit.unwrap_or(0.0);
            safe_div(a.current_balance, limit).max(0.0)
        })
        .fold(0.0, f64::max);

    let overdue = credit_accounts
        .iter()
        .filter_map(|a| slice.liability_for(&a.account_id))
        .any(|l| l.is_overdue);

    let interest_charges: f64 = slice
        .transactions
        .iter()
        .filter(|t| t.is_outflow() && t.has_any_category(&rules.interest_category_codes))
        .map(|t| t.amount.abs())
        .sum();

    // Most recent payment into each credit account vs. that account's minimum.
    // Refunds and other uncoded inflows are not payments.
    let minimum_payment_only = credit_accounts.iter().any(|account| {
        let minimum = match slice
            .liability_for(&account.account_id)
            .and_then(|l| l.minimum_payment)
        {
            Some(m) if m > 0.0 => m,
            _ => return false,
        };
        slice
            .transactions
            .iter()
            .rev()
            .find(|t| {
                t.account_id == account.account_id
                    && t.is_inflow()
                    && t.has_any_category(&rules.payment_category_codes)
            })
            .is_some_and(|payment| (payment.amount - minimum).abs() <= rules.min_payment_tolerance)
    });

    let zero_balance_sustained = slice.window.window_type == WindowType::Long
        && !credit_accounts.is_empty()
        && credit_accounts.iter().all(|a| a.current_balance.abs() < ZERO_BALANCE)
        && !slice.transactions.iter().any(|t| {
            t.is_outflow() && credit_accounts.iter().any(|a| a.account_id == t.account_id)
        });

    CreditSignals {
        credit_account_count: credit_accounts.len(),
        max_utilization,
        utilization_30_flag: max_utilization >= 0.30,
        utilization_50_flag: max_utilization >= 0.50,
        utilization_80_flag: max_utilization >= 0.80,
        interest_charges,
        minimum_payment_only,
        overdue,
        zero_balance_sustained,
    }
}
