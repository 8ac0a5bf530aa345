//! Window partitioner: trailing date windows relative to an anchor date.
//!
//! RULE: A window ends the day before the anchor. Today is never included.
//! RULE: Pending transactions never enter a window.
//!
//! Windows are derived from the anchor on every call and never stored as
//! absolute dates, so a new day always yields new boundaries.

use crate::{
    error::{SignalError, SignalResult},
    model::{AccountSnapshot, LiabilitySnapshot, SubjectHistory, TransactionRecord},
    types::SubjectId,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ── Window type ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Short,
    Long,
}

impl WindowType {
    pub fn length_days(&self) -> i64 {
        match self {
            Self::Short => 30,
            Self::Long  => 180,
        }
    }

    /// Stable label used in storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "30d",
            Self::Long  => "180d",
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowType {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "30d" | "short"  => Ok(Self::Short),
            "180d" | "long"  => Ok(Self::Long),
            _ => Err(SignalError::UnknownWindowType(s.to_string())),
        }
    }
}

// ── Data availability ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DataAvailability {
    /// Under 7 days of history.
    New,
    /// 7 to 29 days.
    Limited,
    /// 30 to 179 days.
    Full,
    /// 180 days or more.
    Extended,
}

impl DataAvailability {
    pub fn from_age_days(age_days: i64) -> Self {
        match age_days {
            d if d < 7   => Self::New,
            d if d < 30  => Self::Limited,
            d if d < 180 => Self::Full,
            _            => Self::Extended,
        }
    }

    /// Age is measured from the earliest settled transaction to the anchor.
    pub fn classify(history: &SubjectHistory, anchor_date: NaiveDate) -> Self {
        match history.earliest_settled() {
            Some(earliest) => Self::from_age_days((anchor_date - earliest).num_days()),
            None => Self::New,
        }
    }

    /// The window persona matching reads for this tier.
    /// `None` means matching is bypassed (Welcome).
    pub fn matching_window(&self) -> Option<WindowType> {
        match self {
            Self::New                 => None,
            Self::Limited | Self::Full => Some(WindowType::Short),
            Self::Extended            => Some(WindowType::Long),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New      => "new",
            Self::Limited  => "limited",
            Self::Full     => "full",
            Self::Extended => "extended",
        }
    }
}

// ── Window ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Window {
    pub subject_id:  SubjectId,
    pub window_type: WindowType,
    pub start_date:  NaiveDate,
    pub end_date:    NaiveDate,
}

impl Window {
    pub fn for_anchor(subject_id: &str, window_type: WindowType, anchor_date: NaiveDate) -> Self {
        let end_date = anchor_date - Duration::days(1);
        let start_date = end_date - Duration::days(window_type.length_days() - 1);
        Self {
            subject_id: subject_id.to_string(),
            window_type,
            start_date,
            end_date,
        }
    }

    /// Both boundaries inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn length_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// One window's worth of settled data, borrowed from a subject's history.
#[derive(Debug, Clone)]
pub struct WindowSlice<'a> {
    pub window:       Window,
    /// Settled, in-range, ordered by (date, transaction_id).
    pub transactions: Vec<&'a TransactionRecord>,
    pub accounts:     &'a [AccountSnapshot],
    pub liabilities:  &'a [LiabilitySnapshot],
}

impl<'a> WindowSlice<'a> {
    pub fn window_days(&self) -> f64 {
        self.window.length_days() as f64
    }

    pub fn liability_for(&self, account_id: &str) -> Option<&'a LiabilitySnapshot> {
        self.liabilities.iter().find(|l| l.account_id == account_id)
    }
}

// ── Partitioner ──────────────────────────────────────────────────────────────

pub struct WindowPartitioner;

impl WindowPartitioner {
    /// Fails when `anchor_date` precedes the earliest observed transaction,
    /// pending or settled.
    pub fn check_anchor(history: &SubjectHistory, anchor_date: NaiveDate) -> SignalResult<()> {
        match history.earliest_observed() {
            Some(earliest) if anchor_date < earliest => Err(SignalError::AnchorBeforeData {
                anchor: anchor_date,
                earliest,
            }),
            _ => Ok(()),
        }
    }

    /// Slice `history` into the `window_type` window ending before `anchor_date`.
    ///
    /// An empty result is not an error. An anchor before the earliest
    /// observed transaction is.
    pub fn partition<'a>(
        history: &'a SubjectHistory,
        window_type: WindowType,
        anchor_date: NaiveDate,
    ) -> SignalResult<WindowSlice<'a>> {
        Self::check_anchor(history, anchor_date)?;

        let window = Window::for_anchor(&history.subject_id, window_type, anchor_date);

        let mut transactions: Vec<&TransactionRecord> = history
            .transactions
            .iter()
            .filter(|t| !t.pending && window.contains(t.date))
            .collect();
        transactions.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });

        log::debug!(
            "subject={} window={} {}..={}: {} settled transactions",
            history.subject_id,
            window_type,
            window.start_date,
            window.end_date,
            transactions.len()
        );

        Ok(WindowSlice {
            window,
            transactions,
            accounts: &history.accounts,
            liabilities: &history.liabilities,
        })
    }
}
