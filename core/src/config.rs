use serde::{Deserialize, Serialize};

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ── Signal computers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Minimum charges from one merchant inside the window.
    pub min_occurrences: usize,
    /// Maximum first-to-last span, in days, for those charges.
    pub max_span_days: i64,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            max_span_days:   90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsConfig {
    /// Floor applied to the starting balance in the growth-rate denominator.
    pub balance_epsilon: f64,
    /// Depository subtypes treated as savings.
    pub savings_subtypes: Vec<String>,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            balance_epsilon:  1.0,
            savings_subtypes: codes(&["savings", "money_market", "hsa", "cd"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditConfig {
    /// Absolute dollar tolerance when comparing a payment to the minimum due.
    pub min_payment_tolerance: f64,
    pub interest_category_codes: Vec<String>,
    /// Inflows into a credit account count as a payment only with one of these.
    pub payment_category_codes: Vec<String>,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            min_payment_tolerance:   1.0,
            interest_category_codes: codes(&["INTEREST", "INTEREST_CHARGE", "BANK_FEES_INTEREST"]),
            payment_category_codes:  codes(&["CREDIT_CARD_PAYMENT", "PAYMENT"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeConfig {
    pub payroll_category_codes: Vec<String>,
    /// Merchant-name fragments (lowercase) that mark a deposit as payroll-like.
    pub payroll_name_hints: Vec<String>,
    /// Uncoded ACH deposits at or above this amount are payroll candidates.
    pub min_ach_deposit: f64,
    /// Uncoded payer groups must keep every gap at or above this many days.
    pub min_gap_days: i64,
    /// Uncoded payer groups must keep amount CV (fraction) at or below this.
    pub max_amount_cv: f64,
}

impl Default for IncomeConfig {
    fn default() -> Self {
        Self {
            payroll_category_codes: codes(&["PAYROLL", "INCOME", "INCOME_WAGES"]),
            payroll_name_hints:     codes(&["payroll", "direct dep", "salary"]),
            min_ach_deposit:        500.0,
            min_gap_days:           5,
            max_amount_cv:          0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpendingConfig {
    /// Outflows carrying these codes are not spending (money moves, debt service).
    pub excluded_category_codes: Vec<String>,
    /// Inflows carrying these codes are internal moves, never income.
    pub transfer_in_codes: Vec<String>,
}

impl Default for SpendingConfig {
    fn default() -> Self {
        Self {
            excluded_category_codes: codes(&[
                "TRANSFER_OUT",
                "TRANSFER",
                "LOAN_PAYMENTS",
                "CREDIT_CARD_PAYMENT",
                "INTEREST",
                "INTEREST_CHARGE",
                "BANK_FEES_INTEREST",
            ]),
            transfer_in_codes: codes(&["TRANSFER_IN", "TRANSFER"]),
        }
    }
}

// ── Cache ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

// ── Persona rules ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaThresholds {
    /// Utilization fraction (0.50 = 50 %).
    pub high_utilization: f64,
    pub variable_income_min_gap_days: f64,
    pub variable_income_max_buffer_months: f64,
    pub subscription_min_count: usize,
    pub subscription_min_monthly_spend: f64,
    /// Share fraction (0.10 = 10 %).
    pub subscription_min_share: f64,
    /// Percent (2.0 = 2 %).
    pub savings_min_growth_pct: f64,
    pub savings_min_monthly_inflow: f64,
    /// Utilization fraction.
    pub savings_max_utilization: f64,
}

impl Default for PersonaThresholds {
    fn default() -> Self {
        Self {
            high_utilization:                  0.50,
            variable_income_min_gap_days:      45.0,
            variable_income_max_buffer_months: 1.0,
            subscription_min_count:            3,
            subscription_min_monthly_spend:    50.0,
            subscription_min_share:            0.10,
            savings_min_growth_pct:            2.0,
            savings_min_monthly_inflow:        200.0,
            savings_max_utilization:           0.30,
        }
    }
}

/// Inclusive [min, max] normalization range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthRanges {
    pub subscription_count:    Range,
    /// Percent.
    pub credit_utilization:    Range,
    /// Percent.
    pub savings_growth_rate:   Range,
    /// Percent coefficient of variation.
    pub income_variability:    Range,
    pub emergency_fund_months: Range,
}

impl Default for StrengthRanges {
    fn default() -> Self {
        Self {
            subscription_count:    Range::new(0.0, 10.0),
            credit_utilization:    Range::new(0.0, 100.0),
            savings_growth_rate:   Range::new(-10.0, 20.0),
            income_variability:    Range::new(0.0, 90.0),
            emergency_fund_months: Range::new(0.0, 12.0),
        }
    }
}

// ── Root ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub subscriptions: SubscriptionConfig,
    pub savings:       SavingsConfig,
    pub credit:        CreditConfig,
    pub income:        IncomeConfig,
    pub spending:      SpendingConfig,
    pub cache:         CacheConfig,
    pub personas:      PersonaThresholds,
    pub strength:      StrengthRanges,
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// Missing sections and fields fall back to the defaults.
    /// In tests, use EngineConfig::default().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.cache.ttl_hours < 0 {
            anyhow::bail!("cache.ttl_hours must be >= 0, got {}", self.cache.ttl_hours);
        }
        if self.subscriptions.min_occurrences < 2 {
            anyhow::bail!(
                "subscriptions.min_occurrences must be >= 2, got {}",
                self.subscriptions.min_occurrences
            );
        }
        let ranges = [
            ("subscription_count", self.strength.subscription_count),
            ("credit_utilization", self.strength.credit_utilization),
            ("savings_growth_rate", self.strength.savings_growth_rate),
            ("income_variability", self.strength.income_variability),
            ("emergency_fund_months", self.strength.emergency_fund_months),
        ];
        for (name, r) in ranges {
            if r.max <= r.min {
                anyhow::bail!("strength.{name}: max ({}) must exceed min ({})", r.max, r.min);
            }
        }
        Ok(())
    }
}
