//! Read-only snapshots supplied by the ingestion collaborator.
//!
//! Sign convention: negative `amount` is an outflow, positive is an inflow.

use crate::types::{EntityId, SubjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ── Enumerations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentChannel {
    Online,
    InStore,
    Ach,
    Other,
}

impl PaymentChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online  => "online",
            Self::InStore => "in_store",
            Self::Ach     => "ach",
            Self::Other   => "other",
        }
    }
}

impl FromStr for PaymentChannel {
    type Err = std::convert::Infallible;

    /// Unknown channels map to `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "online"              => Self::Online,
            "in_store" | "in store" => Self::InStore,
            "ach"                 => Self::Ach,
            _                     => Self::Other,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Depository,
    Credit,
    Loan,
    Investment,
    Other,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depository => "depository",
            Self::Credit     => "credit",
            Self::Loan       => "loan",
            Self::Investment => "investment",
            Self::Other      => "other",
        }
    }
}

impl FromStr for AccountKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "depository" => Self::Depository,
            "credit"     => Self::Credit,
            "loan"       => Self::Loan,
            "investment" => Self::Investment,
            _            => Self::Other,
        })
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub transaction_id: EntityId,
    pub account_id:     EntityId,
    pub date:           NaiveDate,
    pub amount:         f64,
    /// Merchant identity; `None` when the ingestion feed had no counterparty.
    #[serde(default)]
    pub merchant:       Option<String>,
    #[serde(default)]
    pub category_codes: Vec<String>,
    #[serde(default)]
    pub pending:        bool,
    pub channel:        PaymentChannel,
}

impl TransactionRecord {
    pub fn is_outflow(&self) -> bool {
        self.amount < 0.0
    }

    pub fn is_inflow(&self) -> bool {
        self.amount > 0.0
    }

    /// Case-insensitive match against any of `codes`.
    pub fn has_any_category(&self, codes: &[String]) -> bool {
        self.category_codes
            .iter()
            .any(|c| codes.iter().any(|code| c.eq_ignore_ascii_case(code)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountSnapshot {
    pub account_id:        EntityId,
    pub subject_id:        SubjectId,
    pub kind:              AccountKind,
    #[serde(default)]
    pub subtype:           String,
    pub current_balance:   f64,
    #[serde(default)]
    pub available_balance: Option<f64>,
    #[serde(default)]
    pub credit_limit:      Option<f64>,
}

impl AccountSnapshot {
    pub fn is_depository(&self) -> bool {
        self.kind == AccountKind::Depository
    }

    pub fn is_credit(&self) -> bool {
        self.kind == AccountKind::Credit
    }

    pub fn has_subtype(&self, subtypes: &[String]) -> bool {
        subtypes.iter().any(|s| s.eq_ignore_ascii_case(&self.subtype))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiabilitySnapshot {
    pub account_id:        EntityId,
    #[serde(default)]
    pub apr:               Option<f64>,
    #[serde(default)]
    pub minimum_payment:   Option<f64>,
    #[serde(default)]
    pub current_balance:   Option<f64>,
    #[serde(default)]
    pub statement_balance: Option<f64>,
    #[serde(default)]
    pub is_overdue:        bool,
    #[serde(default)]
    pub next_due_date:     Option<NaiveDate>,
}

/// Everything the ingestion collaborator knows about one subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubjectHistory {
    pub subject_id:   SubjectId,
    #[serde(default)]
    pub accounts:     Vec<AccountSnapshot>,
    #[serde(default)]
    pub liabilities:  Vec<LiabilitySnapshot>,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

impl SubjectHistory {
    pub fn empty(subject_id: impl Into<SubjectId>) -> Self {
        Self {
            subject_id: subject_id.into(),
            ..Self::default()
        }
    }

    /// Earliest transaction date of any kind, pending included.
    pub fn earliest_observed(&self) -> Option<NaiveDate> {
        self.transactions.iter().map(|t| t.date).min()
    }

    /// Earliest settled transaction date. Drives the availability tier.
    pub fn earliest_settled(&self) -> Option<NaiveDate> {
        self.transactions
            .iter()
            .filter(|t| !t.pending)
            .map(|t| t.date)
            .min()
    }
}
