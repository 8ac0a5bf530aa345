use super::SignalStore;
use crate::{
    dataset::SubjectDataSource,
    error::SignalResult,
    model::{AccountKind, AccountSnapshot, LiabilitySnapshot, PaymentChannel, SubjectHistory, TransactionRecord},
    types::SubjectId,
};
use rusqlite::params;

impl SignalStore {
    // ── Ingestion-side import ─────────────────────────────────────

    /// Write one subject's snapshots in a single transaction.
    /// Existing rows with the same ids are replaced.
    pub fn import_history(&self, history: &SubjectHistory) -> SignalResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO subject (subject_id) VALUES (?1)",
            params![history.subject_id],
        )?;
        for a in &history.accounts {
            tx.execute(
                "INSERT OR REPLACE INTO account (
                    account_id, subject_id, kind, subtype, current_balance,
                    available_balance, credit_limit
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    a.account_id,
                    history.subject_id,
                    a.kind.as_str(),
                    a.subtype,
                    a.current_balance,
                    a.available_balance,
                    a.credit_limit,
                ],
            )?;
        }
        for l in &history.liabilities {
            tx.execute(
                "INSERT OR REPLACE INTO liability (
                    subject_id, account_id, apr, minimum_payment, current_balance,
                    statement_balance, is_overdue, next_due_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    history.subject_id,
                    l.account_id,
                    l.apr,
                    l.minimum_payment,
                    l.current_balance,
                    l.statement_balance,
                    if l.is_overdue { 1 } else { 0 },
                    l.next_due_date,
                ],
            )?;
        }
        for t in &history.transactions {
            tx.execute(
                "INSERT OR REPLACE INTO txn (
                    transaction_id, subject_id, account_id, date, amount,
                    merchant, category_codes, pending, channel
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    t.transaction_id,
                    history.subject_id,
                    t.account_id,
                    t.date,
                    t.amount,
                    t.merchant,
                    serde_json::to_string(&t.category_codes)?,
                    if t.pending { 1 } else { 0 },
                    t.channel.as_str(),
                ],
            )?;
        }
        tx.commit()?;
        log::debug!(
            "imported subject={}: {} accounts, {} liabilities, {} transactions",
            history.subject_id,
            history.accounts.len(),
            history.liabilities.len(),
            history.transactions.len()
        );
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────────

    pub fn load_history(&self, subject_id: &str) -> SignalResult<SubjectHistory> {
        let mut stmt = self.conn.prepare(
            "SELECT account_id, subject_id, kind, subtype, current_balance,
                    available_balance, credit_limit
             FROM account WHERE subject_id = ?1
             ORDER BY account_id ASC",
        )?;
        let accounts = stmt
            .query_map(params![subject_id], |row| {
                Ok(AccountSnapshot {
                    account_id:        row.get(0)?,
                    subject_id:        row.get(1)?,
                    kind:              row.get::<_, String>(2)?.parse().unwrap_or(AccountKind::Other),
                    subtype:           row.get(3)?,
                    current_balance:   row.get(4)?,
                    available_balance: row.get(5)?,
                    credit_limit:      row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT account_id, apr, minimum_payment, current_balance,
                    statement_balance, is_overdue, next_due_date
             FROM liability WHERE subject_id = ?1
             ORDER BY account_id ASC",
        )?;
        let liabilities = stmt
            .query_map(params![subject_id], |row| {
                Ok(LiabilitySnapshot {
                    account_id:        row.get(0)?,
                    apr:               row.get(1)?,
                    minimum_payment:   row.get(2)?,
                    current_balance:   row.get(3)?,
                    statement_balance: row.get(4)?,
                    is_overdue:        row.get::<_, i32>(5)? != 0,
                    next_due_date:     row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT transaction_id, account_id, date, amount, merchant,
                    category_codes, pending, channel
             FROM txn WHERE subject_id = ?1
             ORDER BY date ASC, transaction_id ASC",
        )?;
        let rows = stmt
            .query_map(params![subject_id], |row| {
                Ok((
                    TransactionRecord {
                        transaction_id: row.get(0)?,
                        account_id:     row.get(1)?,
                        date:           row.get(2)?,
                        amount:         row.get(3)?,
                        merchant:       row.get(4)?,
                        category_codes: Vec::new(),
                        pending:        row.get::<_, i32>(6)? != 0,
                        channel:        row.get::<_, String>(7)?.parse().unwrap_or(PaymentChannel::Other),
                    },
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut transactions = Vec::with_capacity(rows.len());
        for (mut txn, codes_json) in rows {
            txn.category_codes = serde_json::from_str(&codes_json)?;
            transactions.push(txn);
        }

        Ok(SubjectHistory {
            subject_id: subject_id.to_string(),
            accounts,
            liabilities,
            transactions,
        })
    }

    pub fn subject_ids(&self) -> SignalResult<Vec<SubjectId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT subject_id FROM subject ORDER BY subject_id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl SubjectDataSource for SignalStore {
    fn subject_history(&self, subject_id: &str) -> SignalResult<SubjectHistory> {
        self.load_history(subject_id)
    }

    fn subject_ids(&self) -> SignalResult<Vec<SubjectId>> {
        SignalStore::subject_ids(self)
    }
}
