//! Persona categories and the declarative rule table.
//!
//! RULE: The table is data. Adding, removing, or re-prioritizing a persona
//! changes the table, never the matcher's control flow.
//!
//! Predicates are independent: each one reads the signal record and the
//! configured thresholds, and any number of them may hold at once.

use crate::{config::PersonaThresholds, signals::SignalRecord};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Priority reported for the reserved Welcome persona.
pub const WELCOME_PRIORITY: u8 = 0;

/// Declaration order is the fixed tie-break order (derived `Ord`).
/// Welcome sits outside the rule table and sorts last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    HighUtilization,
    VariableIncome,
    CreditBuilder,
    SubscriptionHeavy,
    SavingsBuilder,
    Welcome,
}

impl Persona {
    pub const RANKED: [Persona; 5] = [
        Persona::HighUtilization,
        Persona::VariableIncome,
        Persona::CreditBuilder,
        Persona::SubscriptionHeavy,
        Persona::SavingsBuilder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighUtilization   => "high_utilization",
            Self::VariableIncome    => "variable_income",
            Self::CreditBuilder     => "credit_builder",
            Self::SubscriptionHeavy => "subscription_heavy",
            Self::SavingsBuilder    => "savings_builder",
            Self::Welcome           => "welcome",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::HighUtilization   => "High Utilization",
            Self::VariableIncome    => "Variable Income Budgeter",
            Self::CreditBuilder     => "Credit Builder",
            Self::SubscriptionHeavy => "Subscription-Heavy",
            Self::SavingsBuilder    => "Savings Builder",
            Self::Welcome           => "Welcome",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Persona {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::RANKED
            .iter()
            .chain(std::iter::once(&Self::Welcome))
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown persona '{s}'"))
    }
}

// ── Predicates ───────────────────────────────────────────────────────────────

pub type Predicate = fn(&SignalRecord, &PersonaThresholds) -> bool;

fn high_utilization(r: &SignalRecord, t: &PersonaThresholds) -> bool {
    r.credit.max_utilization >= t.high_utilization
        || r.credit.interest_charges > 0.0
        || r.credit.minimum_payment_only
        || r.credit.overdue
}

// An unmeasured buffer (no essential outflow) never reads as a thin one.
fn variable_income(r: &SignalRecord, t: &PersonaThresholds) -> bool {
    r.income.payroll_detected
        && r.income.payroll_frequency_days > t.variable_income_min_gap_days
        && r.income.buffer_measured
        && r.income.income_buffer_months < t.variable_income_max_buffer_months
}

// The sustained-zero flag is only ever set on LONG-window records.
fn credit_builder(r: &SignalRecord, _t: &PersonaThresholds) -> bool {
    (r.credit.credit_account_count == 0 || r.credit.zero_balance_sustained)
        && r.savings.depository_account_count >= 1
}

fn subscription_heavy(r: &SignalRecord, t: &PersonaThresholds) -> bool {
    r.subscriptions.recurring_merchant_count >= t.subscription_min_count
        && (r.subscriptions.monthly_equivalent_spend >= t.subscription_min_monthly_spend
            || r.subscriptions.spend_share >= t.subscription_min_share)
}

fn savings_builder(r: &SignalRecord, t: &PersonaThresholds) -> bool {
    (r.savings.growth_rate_pct >= t.savings_min_growth_pct
        || r.savings.net_inflow_monthly >= t.savings_min_monthly_inflow)
        && r.credit.max_utilization < t.savings_max_utilization
}

// ── Rule table ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct PersonaRule {
    pub persona:   Persona,
    /// Lower is more urgent.
    pub priority:  u8,
    pub predicate: Predicate,
}

impl fmt::Debug for PersonaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonaRule")
            .field("persona", &self.persona)
            .field("priority", &self.priority)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<PersonaRule>,
}

impl RuleTable {
    pub fn standard() -> Self {
        let rule = |persona, priority, predicate| PersonaRule { persona, priority, predicate };
        Self {
            rules: vec![
                rule(Persona::HighUtilization,   1, high_utilization as Predicate),
                rule(Persona::VariableIncome,    2, variable_income),
                rule(Persona::CreditBuilder,     3, credit_builder),
                rule(Persona::SubscriptionHeavy, 4, subscription_heavy),
                rule(Persona::SavingsBuilder,    5, savings_builder),
            ],
        }
    }

    /// Replace the priority of one persona. Unknown personas are ignored.
    pub fn with_priority(mut self, persona: Persona, priority: u8) -> Self {
        for rule in self.rules.iter_mut().filter(|r| r.persona == persona) {
            rule.priority = priority;
        }
        self
    }

    pub fn rules(&self) -> &[PersonaRule] {
        &self.rules
    }

    pub fn priority_of(&self, persona: Persona) -> Option<u8> {
        self.rules.iter().find(|r| r.persona == persona).map(|r| r.priority)
    }

    /// Lowest-priority rule (largest value); on equal priority, the one
    /// latest in the fixed order.
    pub fn lowest_priority(&self) -> Option<&PersonaRule> {
        self.rules
            .iter()
            .max_by(|a, b| a.priority.cmp(&b.priority).then(a.persona.cmp(&b.persona)))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ── Matcher ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchedPersona {
    pub persona:  Persona,
    pub priority: u8,
}

pub struct PersonaMatcher<'a> {
    rules:      &'a RuleTable,
    thresholds: &'a PersonaThresholds,
}

impl<'a> PersonaMatcher<'a> {
    pub fn new(rules: &'a RuleTable, thresholds: &'a PersonaThresholds) -> Self {
        Self { rules, thresholds }
    }

    /// Every persona whose predicate holds, in table order.
    pub fn match_personas(&self, record: &SignalRecord) -> Vec<MatchedPersona> {
        let matched: Vec<MatchedPersona> = self
            .rules
            .rules()
            .iter()
            .filter(|rule| (rule.predicate)(record, self.thresholds))
            .map(|rule| MatchedPersona {
                persona:  rule.persona,
                priority: rule.priority,
            })
            .collect();

        log::debug!(
            "subject={} window={}: matched {:?}",
            record.subject_id,
            record.window_type,
            matched.iter().map(|m| m.persona.as_str()).collect::<Vec<_>>()
        );
        matched
    }
}
