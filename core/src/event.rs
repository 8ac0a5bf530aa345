//! The audit event log: every observable engine decision.
//!
//! RULE: Events are appended, never edited or removed.
//! RULE: Each event names the subject and anchor date it concerns.

use crate::{
    persona::Persona,
    trace::TieBreakStep,
    types::SubjectId,
    window::{DataAvailability, WindowType},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Variants are added over time, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SignalsComputed {
        subject_id:       SubjectId,
        anchor_date:      NaiveDate,
        window_type:      WindowType,
        subscriptions:    usize,
        utilization_pct:  f64,
        payroll_detected: bool,
    },
    SignalsCacheHit {
        subject_id:  SubjectId,
        anchor_date: NaiveDate,
        window_type: WindowType,
    },
    CacheInvalidated {
        subject_id:      SubjectId,
        anchor_date:     NaiveDate,
        entries_removed: usize,
    },
    PersonaAssigned {
        subject_id:        SubjectId,
        anchor_date:       NaiveDate,
        persona:           Persona,
        priority:          u8,
        data_availability: DataAvailability,
        resolved_by:       TieBreakStep,
        signal_strength:   f64,
    },
    EmptyMatchFallback {
        subject_id:  SubjectId,
        anchor_date: NaiveDate,
        window_type: WindowType,
        persona:     Persona,
    },
}

impl EngineEvent {
    pub fn subject_id(&self) -> &str {
        match self {
            Self::SignalsComputed { subject_id, .. }
            | Self::SignalsCacheHit { subject_id, .. }
            | Self::CacheInvalidated { subject_id, .. }
            | Self::PersonaAssigned { subject_id, .. }
            | Self::EmptyMatchFallback { subject_id, .. } => subject_id,
        }
    }

    pub fn anchor_date(&self) -> NaiveDate {
        match self {
            Self::SignalsComputed { anchor_date, .. }
            | Self::SignalsCacheHit { anchor_date, .. }
            | Self::CacheInvalidated { anchor_date, .. }
            | Self::PersonaAssigned { anchor_date, .. }
            | Self::EmptyMatchFallback { anchor_date, .. } => *anchor_date,
        }
    }
}

/// Stable name for the event_type column in event_log.
pub fn event_type_name(event: &EngineEvent) -> &'static str {
    match event {
        EngineEvent::SignalsComputed { .. }    => "signals_computed",
        EngineEvent::SignalsCacheHit { .. }    => "signals_cache_hit",
        EngineEvent::CacheInvalidated { .. }   => "cache_invalidated",
        EngineEvent::PersonaAssigned { .. }    => "persona_assigned",
        EngineEvent::EmptyMatchFallback { .. } => "empty_match_fallback",
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:          Option<i64>,
    pub subject_id:  SubjectId,
    pub anchor_date: NaiveDate,
    pub event_type:  String,
    pub payload:     String, // JSON-serialized EngineEvent
}

impl EventLogEntry {
    pub fn from_event(event: &EngineEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id:          None,
            subject_id:  event.subject_id().to_string(),
            anchor_date: event.anchor_date(),
            event_type:  event_type_name(event).to_string(),
            payload:     serde_json::to_string(event)?,
        })
    }

    pub fn decode(&self) -> serde_json::Result<EngineEvent> {
        serde_json::from_str(&self.payload)
    }
}
