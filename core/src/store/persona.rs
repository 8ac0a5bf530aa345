use super::SignalStore;
use crate::{
    assignment::PersonaAssignment,
    error::SignalResult,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

impl SignalStore {
    // ── Persona assignments ───────────────────────────────────────

    /// Replace the subject's current assignment. One row per subject.
    pub fn upsert_assignment(&self, assignment: &PersonaAssignment) -> SignalResult<()> {
        let trace = serde_json::to_string(&assignment.decision_trace)?;
        self.conn.execute(
            "INSERT INTO persona_assignment (
                subject_id, assignment_id, persona, priority, signal_strength,
                anchor_date, assigned_at, decision_trace
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(subject_id) DO UPDATE SET
                assignment_id   = excluded.assignment_id,
                persona         = excluded.persona,
                priority        = excluded.priority,
                signal_strength = excluded.signal_strength,
                anchor_date     = excluded.anchor_date,
                assigned_at     = excluded.assigned_at,
                decision_trace  = excluded.decision_trace",
            params![
                assignment.subject_id,
                uuid::Uuid::new_v4().to_string(),
                assignment.persona.as_str(),
                assignment.priority as i64,
                assignment.signal_strength,
                assignment.anchor_date,
                assignment.assigned_at,
                trace,
            ],
        )?;
        Ok(())
    }

    pub fn current_assignment(&self, subject_id: &str) -> SignalResult<Option<PersonaAssignment>> {
        let row = self
            .conn
            .query_row(
                "SELECT persona, priority, signal_strength, anchor_date, assigned_at, decision_trace
                 FROM persona_assignment WHERE subject_id = ?1",
                params![subject_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, NaiveDate>(3)?,
                        row.get::<_, DateTime<Utc>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((persona, priority, signal_strength, anchor_date, assigned_at, trace)) = row else {
            return Ok(None);
        };
        Ok(Some(PersonaAssignment {
            subject_id: subject_id.to_string(),
            persona: persona.parse()?,
            priority: u8::try_from(priority).map_err(anyhow::Error::from)?,
            signal_strength,
            decision_trace: serde_json::from_str(&trace)?,
            anchor_date,
            assigned_at,
        }))
    }

    /// Current persona label per subject, sorted by subject id.
    pub fn assignment_labels(&self) -> SignalResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT subject_id, persona FROM persona_assignment ORDER BY subject_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
