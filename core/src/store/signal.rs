use super::SignalStore;
use crate::{error::SignalResult, signals::SignalRecord, window::WindowType};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

impl SignalStore {
    // ── Signal records ────────────────────────────────────────────

    /// One row per (subject, window type, computation date). A recompute on
    /// the same anchor replaces the payload and keeps the row id.
    pub fn insert_signal_record(&self, record: &SignalRecord) -> SignalResult<()> {
        let payload = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO signal_record (
                signal_id, subject_id, window_type, computed_on, start_date, end_date,
                computed_at, recurring_merchant_count, max_utilization, growth_rate_pct,
                payroll_detected, payload
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(subject_id, window_type, computed_on) DO UPDATE SET
                start_date               = excluded.start_date,
                end_date                 = excluded.end_date,
                computed_at              = excluded.computed_at,
                recurring_merchant_count = excluded.recurring_merchant_count,
                max_utilization          = excluded.max_utilization,
                growth_rate_pct          = excluded.growth_rate_pct,
                payroll_detected         = excluded.payroll_detected,
                payload                  = excluded.payload",
            params![
                uuid::Uuid::new_v4().to_string(),
                record.subject_id,
                record.window_type.as_str(),
                record.anchor_date(),
                record.window.start_date,
                record.window.end_date,
                record.computed_at,
                record.subscriptions.recurring_merchant_count as i64,
                record.credit.max_utilization,
                record.savings.growth_rate_pct,
                if record.income.payroll_detected { 1 } else { 0 },
                payload,
            ],
        )?;
        Ok(())
    }

    pub fn signal_record_on(
        &self,
        subject_id: &str,
        window_type: WindowType,
        computed_on: NaiveDate,
    ) -> SignalResult<Option<SignalRecord>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM signal_record
                 WHERE subject_id = ?1 AND window_type = ?2 AND computed_on = ?3",
                params![subject_id, window_type.as_str(), computed_on],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    /// Most recent record for the pair, by computation date.
    pub fn latest_signal_record(
        &self,
        subject_id: &str,
        window_type: WindowType,
    ) -> SignalResult<Option<SignalRecord>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM signal_record
                 WHERE subject_id = ?1 AND window_type = ?2
                 ORDER BY computed_on DESC, computed_at DESC LIMIT 1",
                params![subject_id, window_type.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }
}
