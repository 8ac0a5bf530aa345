//! Signal record: the four sub-signal groups for one (subject, window).
//!
//! RULE: Signal values are always derived from a WindowSlice.
//! Nothing outside the computers writes a signal field.
//!
//! The computers share the spending definition and the guarded arithmetic
//! helpers defined here, so every group agrees on what "outflow" means.

use crate::{
    clock::EvalContext,
    config::{EngineConfig, SpendingConfig},
    credit_signals::{compute_credit, CreditSignals},
    error::SignalResult,
    income_signals::{compute_income, IncomeSignals},
    model::{SubjectHistory, TransactionRecord},
    savings_signals::{compute_savings, SavingsSignals},
    subscription_signals::{compute_subscriptions, SubscriptionSignals},
    types::{SubjectId, DAYS_PER_MONTH},
    window::{Window, WindowPartitioner, WindowSlice, WindowType},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Denominators smaller than this are treated as zero.
pub const NEAR_ZERO: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalRecord {
    pub subject_id:    SubjectId,
    pub window_type:   WindowType,
    pub window:        Window,
    pub computed_at:   DateTime<Utc>,
    pub subscriptions: SubscriptionSignals,
    pub savings:       SavingsSignals,
    pub credit:        CreditSignals,
    pub income:        IncomeSignals,
}

impl SignalRecord {
    /// Run the four computers over an already partitioned window.
    pub fn from_slice(slice: &WindowSlice<'_>, ctx: &EvalContext, config: &EngineConfig) -> Self {
        let subscriptions = compute_subscriptions(slice, config);
        let savings = compute_savings(slice, config);
        let credit = compute_credit(slice, config);
        let income = compute_income(slice, config);

        Self {
            subject_id: slice.window.subject_id.clone(),
            window_type: slice.window.window_type,
            window: slice.window.clone(),
            computed_at: ctx.now,
            subscriptions,
            savings,
            credit,
            income,
        }
    }

    /// The anchor this record was computed for: the day after its window.
    pub fn anchor_date(&self) -> NaiveDate {
        self.window.end_date + Duration::days(1)
    }

    /// Partition `history` and compute a fresh record. Bypasses any cache.
    pub fn compute(
        history: &SubjectHistory,
        window_type: WindowType,
        ctx: &EvalContext,
        config: &EngineConfig,
    ) -> SignalResult<Self> {
        let slice = WindowPartitioner::partition(history, window_type, ctx.anchor_date)?;
        let record = Self::from_slice(&slice, ctx, config);
        log::debug!(
            "subject={} window={}: {} subscriptions, {:.1}% utilization, payroll={}",
            record.subject_id,
            record.window_type,
            record.subscriptions.recurring_merchant_count,
            record.credit.utilization_pct(),
            record.income.payroll_detected,
        );
        Ok(record)
    }
}

// ── Shared spending definition ───────────────────────────────────────────────

/// Settled outflows that count as spending (transfers and debt service excluded).
pub fn spending_outflows<'s, 'a>(
    slice: &'s WindowSlice<'a>,
    spending: &'s SpendingConfig,
) -> impl Iterator<Item = &'a TransactionRecord> + 's {
    slice
        .transactions
        .iter()
        .copied()
        .filter(move |t| t.is_outflow() && !t.has_any_category(&spending.excluded_category_codes))
}

/// Total spending outflow in the window, as a positive number.
pub fn total_spending(slice: &WindowSlice<'_>, spending: &SpendingConfig) -> f64 {
    spending_outflows(slice, spending).map(|t| t.amount.abs()).sum()
}

/// Spending normalized to a 30-day month.
pub fn monthly_essential_outflow(slice: &WindowSlice<'_>, spending: &SpendingConfig) -> f64 {
    to_monthly(total_spending(slice, spending), slice.window_days())
}

pub fn to_monthly(amount: f64, window_days: f64) -> f64 {
    safe_div(amount, window_days) * DAYS_PER_MONTH
}

// ── Guarded arithmetic ───────────────────────────────────────────────────────

/// `num / den`, or 0.0 when the denominator is zero or near zero.
pub fn safe_div(num: f64, den: f64) -> f64 {
    if den.abs() < NEAR_ZERO || !den.is_finite() {
        0.0
    } else {
        num / den
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of `values`; mean of the middle pair for even counts. 0.0 if empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Population coefficient of variation as a fraction. 0.0 for fewer than 2
/// values or a non-positive mean.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    if m <= NEAR_ZERO {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_div_guards_zero() {
        assert_eq!(safe_div(10.0, 0.0), 0.0);
        assert_eq!(safe_div(10.0, 1e-12), 0.0);
        assert_eq!(safe_div(10.0, 4.0), 2.5);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[14.0, 60.0, 30.0]), 30.0);
        assert_eq!(median(&[14.0, 16.0, 30.0, 10.0]), 15.0);
    }

    #[test]
    fn cv_of_constant_series_is_zero() {
        assert_eq!(coefficient_of_variation(&[2000.0, 2000.0, 2000.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[2000.0]), 0.0);
        let cv = coefficient_of_variation(&[1000.0, 3000.0]);
        assert!((cv - 0.5).abs() < 1e-12);
    }
}
