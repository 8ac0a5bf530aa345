//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine calls store methods; it never executes SQL directly.
//!
//! The subject, account, liability and txn tables belong to the ingestion
//! side. The engine only reads them; `import_history` exists for tools and
//! tests that need to seed a database.

use crate::{error::SignalResult, event::EventLogEntry};
use rusqlite::{params, Connection};

mod persona;
mod signal;
mod subject;

pub struct SignalStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SignalStore {
    pub fn open(path: &str) -> SignalResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SignalResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a new, isolated database.
    pub fn reopen(&self) -> SignalResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SignalResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SignalResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (subject_id, anchor_date, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.subject_id, entry.anchor_date, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_subject(&self, subject_id: &str) -> SignalResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject_id, anchor_date, event_type, payload
             FROM event_log WHERE subject_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![subject_id], |row| {
                Ok(EventLogEntry {
                    id:          Some(row.get(0)?),
                    subject_id:  row.get(1)?,
                    anchor_date: row.get(2)?,
                    event_type:  row.get(3)?,
                    payload:     row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Test / summary helpers ─────────────────────────────────

    /// Row count of one of the store's own tables.
    pub fn table_count(&self, table: StoreTable) -> SignalResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Tables `table_count` may be asked about. Keeps the SQL free of caller text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTable {
    Subject,
    Account,
    Liability,
    Txn,
    SignalRecord,
    PersonaAssignment,
    EventLog,
}

impl StoreTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subject           => "subject",
            Self::Account           => "account",
            Self::Liability         => "liability",
            Self::Txn               => "txn",
            Self::SignalRecord      => "signal_record",
            Self::PersonaAssignment => "persona_assignment",
            Self::EventLog          => "event_log",
        }
    }
}
