use crate::{
    config::EngineConfig,
    signals::{monthly_essential_outflow, safe_div, to_monthly},
    window::WindowSlice,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SavingsSignals {
    /// Percent change of total depository balance over the window. May be negative.
    pub growth_rate_pct:         f64,
    /// Net movement into savings-type accounts per 30-day month.
    pub net_inflow_monthly:      f64,
    /// Savings-type balance over monthly essential outflow.
    pub emergency_fund_months:   f64,
    pub savings_balance:         f64,
    pub depository_balance:      f64,
    pub depository_account_count: usize,
}

pub fn compute_savings(slice: &WindowSlice<'_>, config: &EngineConfig) -> SavingsSignals {
    let subtypes = &config.savings.savings_subtypes;

    let depository: Vec<_> = slice.accounts.iter().filter(|a| a.is_depository()).collect();
    let depository_ids: HashSet<&str> = depository.iter().map(|a| a.account_id.as_str()).collect();
    let savings_ids: HashSet<&str> = depository
        .iter()
        .filter(|a| a.has_subtype(subtypes))
        .map(|a| a.account_id.as_str())
        .collect();

    let depository_balance: f64 = depository.iter().map(|a| a.current_balance).sum();
    let savings_balance: f64 = depository
        .iter()
        .filter(|a| savings_ids.contains(a.account_id.as_str()))
        .map(|a| a.current_balance)
        .sum();

    let mut depository_flow = 0.0;
    let mut savings_flow = 0.0;
    for txn in &slice.transactions {
        let id = txn.account_id.as_str();
        if depository_ids.contains(id) {
            depository_flow += txn.amount;
        }
        if savings_ids.contains(id) {
            savings_flow += txn.amount;
        }
    }

    // Starting balance is reconstructed by rolling the window's flow back.
    let starting = depository_balance - depository_flow;
    let growth_rate_pct = if depository.is_empty() {
        0.0
    } else {
        (depository_balance - starting) / starting.max(config.savings.balance_epsilon) * 100.0
    };

    let monthly_outflow = monthly_essential_outflow(slice, &config.spending);

    SavingsSignals {
        growth_rate_pct,
        net_inflow_monthly: to_monthly(savings_flow, slice.window_days()),
        emergency_fund_months: safe_div(savings_balance, monthly_outflow).max(0.0),
        savings_balance,
        depository_balance,
        depository_account_count: depository.len(),
    }
}
