//! Prioritizer: reduces a matched set to exactly one persona.
//!
//! SELECTION CHAIN (fixed, never reordered):
//!   1. Empty set        → lowest-priority persona in the table (warned).
//!   2. Priority filter  → keep candidates at the smallest priority value.
//!   3. Single survivor  → select it.
//!   4. Signal strength  → highest normalized strength sum wins.
//!   5. Exact tie        → fixed persona order.
//!
//! Pure function of (matched set, signal record, table, ranges).

use crate::{
    config::{Range, StrengthRanges},
    persona::{MatchedPersona, Persona, RuleTable},
    signals::SignalRecord,
    trace::{CandidateTrace, TieBreakStep},
};
use serde::{Deserialize, Serialize};

/// Min-max normalize into [0, 1]. Degenerate ranges and NaN yield 0.
pub fn normalize(value: f64, range: Range) -> f64 {
    if range.max <= range.min || value.is_nan() {
        return 0.0;
    }
    ((value - range.min) / (range.max - range.min)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct StrengthComponents {
    pub subscription_count:    f64,
    pub credit_utilization:    f64,
    pub savings_growth_rate:   f64,
    pub income_variability:    f64,
    pub emergency_fund_months: f64,
}

impl StrengthComponents {
    pub fn from_record(record: &SignalRecord, ranges: &StrengthRanges) -> Self {
        Self {
            subscription_count: normalize(
                record.subscriptions.recurring_merchant_count as f64,
                ranges.subscription_count,
            ),
            credit_utilization: normalize(record.credit.utilization_pct(), ranges.credit_utilization),
            savings_growth_rate: normalize(record.savings.growth_rate_pct, ranges.savings_growth_rate),
            income_variability: normalize(record.income.income_variability, ranges.income_variability),
            emergency_fund_months: normalize(
                record.savings.emergency_fund_months,
                ranges.emergency_fund_months,
            ),
        }
    }

    pub fn total(&self) -> f64 {
        self.subscription_count
            + self.credit_utilization
            + self.savings_growth_rate
            + self.income_variability
            + self.emergency_fund_months
    }
}

/// Result of one run of the selection chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Prioritized {
    pub persona:         Persona,
    pub priority:        u8,
    pub signal_strength: f64,
    pub resolved_by:     TieBreakStep,
    pub top_priority:    Option<u8>,
    pub candidates:      Vec<CandidateTrace>,
    pub components:      StrengthComponents,
}

pub struct Prioritizer<'a> {
    rules:  &'a RuleTable,
    ranges: &'a StrengthRanges,
}

impl<'a> Prioritizer<'a> {
    pub fn new(rules: &'a RuleTable, ranges: &'a StrengthRanges) -> Self {
        Self { rules, ranges }
    }

    /// Sum of the five normalized components.
    pub fn signal_strength(&self, record: &SignalRecord) -> f64 {
        StrengthComponents::from_record(record, self.ranges).total()
    }

    pub fn select(&self, matched: &[MatchedPersona], record: &SignalRecord) -> Prioritized {
        let components = StrengthComponents::from_record(record, self.ranges);

        // 1. Empty set.
        if matched.is_empty() {
            let (persona, priority) = self
                .rules
                .lowest_priority()
                .map(|r| (r.persona, r.priority))
                .unwrap_or((Persona::SavingsBuilder, 5));
            log::warn!(
                "subject={} window={}: no persona matched, falling back to {}",
                record.subject_id,
                record.window_type,
                persona.as_str()
            );
            return Prioritized {
                persona,
                priority,
                signal_strength: components.total(),
                resolved_by: TieBreakStep::EmptyMatchFallback,
                top_priority: None,
                candidates: Vec::new(),
                components,
            };
        }

        // 2. Priority filter.
        let top = matched.iter().map(|m| m.priority).min().unwrap_or(u8::MAX);
        let candidates: Vec<CandidateTrace> = matched
            .iter()
            .map(|m| CandidateTrace {
                persona:         m.persona,
                priority:        m.priority,
                signal_strength: components.total(),
                at_top_priority: m.priority == top,
            })
            .collect();
        let mut survivors: Vec<&CandidateTrace> =
            candidates.iter().filter(|c| c.at_top_priority).collect();

        // 3 to 5. Strength descending, then fixed order ascending.
        survivors.sort_by(|a, b| {
            b.signal_strength
                .total_cmp(&a.signal_strength)
                .then(a.persona.cmp(&b.persona))
        });
        let resolved_by = match survivors.as_slice() {
            [_] => TieBreakStep::PriorityOrder,
            [first, second, ..] if first.signal_strength > second.signal_strength => {
                TieBreakStep::SignalStrength
            }
            _ => TieBreakStep::FixedOrder,
        };

        let winner = *survivors[0];
        Prioritized {
            persona: winner.persona,
            priority: winner.priority,
            signal_strength: components.total(),
            resolved_by,
            top_priority: Some(top),
            candidates,
            components,
        }
    }
}
