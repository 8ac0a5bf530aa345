//! Subscription computer: recurring merchant detection.
//!
//! A merchant is recurring when it charged at least `min_occurrences` times
//! inside the window and its first-to-last span is at most `max_span_days`.

use crate::{
    config::EngineConfig,
    signals::{safe_div, spending_outflows, to_monthly, total_spending},
    types::DAYS_PER_MONTH,
    window::WindowSlice,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionSignals {
    pub recurring_merchant_count: usize,
    /// Sorted by merchant identity.
    pub recurring_merchants:      Vec<String>,
    /// Sum over recurring merchants of their monthly-equivalent charge.
    pub monthly_equivalent_spend: f64,
    /// Fraction of monthly spending taken by recurring merchants, in [0, 1].
    pub spend_share:              f64,
    /// Spending outflow in the window, positive.
    pub total_outflow:            f64,
}

pub fn compute_subscriptions(slice: &WindowSlice<'_>, config: &EngineConfig) -> SubscriptionSignals {
    let rules = &config.subscriptions;

    // BTreeMap keeps merchant order stable across runs.
    let mut by_merchant: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for txn in spending_outflows(slice, &config.spending) {
        if let Some(merchant) = txn.merchant.as_deref() {
            by_merchant
                .entry(merchant)
                .or_default()
                .push((txn.date, txn.amount.abs()));
        }
    }

    let mut recurring_merchants = Vec::new();
    let mut monthly_equivalent_spend = 0.0;

    for (merchant, charges) in &by_merchant {
        if charges.len() < rules.min_occurrences {
            continue;
        }
        // Window transactions arrive date-ordered, so first/last are the span.
        let first = charges[0].0;
        let last = charges[charges.len() - 1].0;
        let span_days = (last - first).num_days();
        if span_days > rules.max_span_days {
            continue;
        }

        let mean_charge = charges.iter().map(|(_, a)| a).sum::<f64>() / charges.len() as f64;
        let mean_interval = (span_days as f64 / (charges.len() - 1) as f64).max(1.0);
        monthly_equivalent_spend += mean_charge * DAYS_PER_MONTH / mean_interval;
        recurring_merchants.push(merchant.to_string());
    }

    let total_outflow = total_spending(slice, &config.spending);
    let monthly_outflow = to_monthly(total_outflow, slice.window_days());
    let spend_share = safe_div(monthly_equivalent_spend, monthly_outflow).clamp(0.0, 1.0);

    SubscriptionSignals {
        recurring_merchant_count: recurring_merchants.len(),
        recurring_merchants,
        monthly_equivalent_spend,
        spend_share,
        total_outflow,
    }
}
