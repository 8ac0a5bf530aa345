//! Shared fixtures for the integration tests.
//!
//! Every test anchors on ANCHOR unless it says otherwise, so window ends
//! fall on 2025-05-31 and offsets are written relative to that day.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use spendsense_core::{
    clock::EvalContext,
    config::EngineConfig,
    dataset::InMemoryDataset,
    engine::SignalEngine,
    model::{AccountKind, AccountSnapshot, LiabilitySnapshot, PaymentChannel, SubjectHistory, TransactionRecord},
};

pub fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub fn ctx() -> EvalContext {
    EvalContext::at_anchor(anchor())
}

/// `n` days before the last day of every window anchored at ANCHOR.
pub fn end_minus(n: i64) -> NaiveDate {
    anchor() - Duration::days(1 + n)
}

pub fn engine_with(histories: Vec<SubjectHistory>) -> SignalEngine<InMemoryDataset> {
    SignalEngine::new(InMemoryDataset::from_histories(histories), EngineConfig::default())
}

// ── History builder ──────────────────────────────────────────────────────────

pub struct HistoryBuilder {
    history:  SubjectHistory,
    next_txn: usize,
}

impl HistoryBuilder {
    pub fn new(subject_id: &str) -> Self {
        Self {
            history:  SubjectHistory::empty(subject_id),
            next_txn: 0,
        }
    }

    fn account(mut self, account_id: &str, kind: AccountKind, subtype: &str, balance: f64, limit: Option<f64>) -> Self {
        self.history.accounts.push(AccountSnapshot {
            account_id:        account_id.to_string(),
            subject_id:        self.history.subject_id.clone(),
            kind,
            subtype:           subtype.to_string(),
            current_balance:   balance,
            available_balance: None,
            credit_limit:      limit,
        });
        self
    }

    pub fn checking(self, account_id: &str, balance: f64) -> Self {
        self.account(account_id, AccountKind::Depository, "checking", balance, None)
    }

    pub fn savings(self, account_id: &str, balance: f64) -> Self {
        self.account(account_id, AccountKind::Depository, "savings", balance, None)
    }

    pub fn credit_card(self, account_id: &str, balance: f64, limit: f64) -> Self {
        self.account(account_id, AccountKind::Credit, "credit card", balance, Some(limit))
    }

    pub fn liability(mut self, account_id: &str, minimum_payment: f64, is_overdue: bool) -> Self {
        self.history.liabilities.push(LiabilitySnapshot {
            account_id:        account_id.to_string(),
            apr:               Some(24.99),
            minimum_payment:   Some(minimum_payment),
            current_balance:   None,
            statement_balance: None,
            is_overdue,
            next_due_date:     None,
        });
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn txn(
        mut self,
        account_id: &str,
        date: NaiveDate,
        amount: f64,
        merchant: Option<&str>,
        codes: &[&str],
        channel: PaymentChannel,
        pending: bool,
    ) -> Self {
        self.next_txn += 1;
        self.history.transactions.push(TransactionRecord {
            transaction_id: format!("{}-t{:04}", self.history.subject_id, self.next_txn),
            account_id:     account_id.to_string(),
            date,
            amount,
            merchant:       merchant.map(str::to_string),
            category_codes: codes.iter().map(|c| c.to_string()).collect(),
            pending,
            channel,
        });
        self
    }

    /// Settled card-present purchase of `amount` (positive number).
    pub fn spend(self, account_id: &str, date: NaiveDate, amount: f64, merchant: &str) -> Self {
        self.txn(account_id, date, -amount, Some(merchant), &["GENERAL_MERCHANDISE"], PaymentChannel::InStore, false)
    }

    /// Settled online charge, the usual shape of a subscription.
    pub fn charge(self, account_id: &str, date: NaiveDate, amount: f64, merchant: &str) -> Self {
        self.txn(account_id, date, -amount, Some(merchant), &["ENTERTAINMENT"], PaymentChannel::Online, false)
    }

    pub fn paycheck(self, account_id: &str, date: NaiveDate, amount: f64, payer: &str) -> Self {
        self.txn(account_id, date, amount, Some(payer), &["PAYROLL"], PaymentChannel::Ach, false)
    }

    pub fn transfer_in(self, account_id: &str, date: NaiveDate, amount: f64) -> Self {
        self.txn(account_id, date, amount, None, &["TRANSFER_IN"], PaymentChannel::Online, false)
    }

    pub fn pending_spend(self, account_id: &str, date: NaiveDate, amount: f64, merchant: &str) -> Self {
        self.txn(account_id, date, -amount, Some(merchant), &["GENERAL_MERCHANDISE"], PaymentChannel::InStore, true)
    }

    pub fn build(self) -> SubjectHistory {
        self.history
    }
}

// ── Seeded random histories ──────────────────────────────────────────────────

const MERCHANTS: [&str; 8] = [
    "Corner Grocery",
    "StreamFlix",
    "CloudBox",
    "City Transit",
    "Fuel Stop",
    "Gym Club",
    "Book Nook",
    "Cafe Uno",
];

/// A plausible history for property tests: one checking account, maybe
/// savings and a card, and up to a year of mixed settled and pending activity.
pub fn random_history(seed: u64, subject_id: &str) -> SubjectHistory {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let mut b = HistoryBuilder::new(subject_id).checking("chk", rng.gen_range(0.0..5_000.0));

    if rng.gen_bool(0.6) {
        b = b.savings("sav", rng.gen_range(0.0..20_000.0));
    }
    let has_card = rng.gen_bool(0.7);
    if has_card {
        let limit = rng.gen_range(500.0..10_000.0);
        b = b
            .credit_card("card", rng.gen_range(0.0..limit), limit)
            .liability("card", rng.gen_range(25.0..150.0), rng.gen_bool(0.1));
    }

    let history_days: i64 = rng.gen_range(1..365);
    let txn_count: usize = rng.gen_range(0..120);
    for _ in 0..txn_count {
        let date = end_minus(rng.gen_range(0..history_days));
        let merchant = MERCHANTS[rng.gen_range(0..MERCHANTS.len())];
        let account = if has_card && rng.gen_bool(0.4) { "card" } else { "chk" };
        b = match rng.gen_range(0..10) {
            0 => b.pending_spend(account, date, rng.gen_range(5.0..300.0), merchant),
            1 => b.charge(account, date, rng.gen_range(5.0..30.0), merchant),
            2 => b.transfer_in("chk", date, rng.gen_range(50.0..800.0)),
            _ => b.spend(account, date, rng.gen_range(5.0..300.0), merchant),
        };
    }

    if rng.gen_bool(0.6) {
        let gap: i64 = rng.gen_range(7..70);
        let amount = rng.gen_range(800.0..4_000.0);
        let mut offset = rng.gen_range(0..gap);
        while offset < history_days {
            b = b.paycheck("chk", end_minus(offset), amount * rng.gen_range(0.8..1.2), "Acme Payroll");
            offset += gap;
        }
    }
    b.build()
}
