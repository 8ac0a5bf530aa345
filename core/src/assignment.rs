//! Persona assignment: the single current classification of a subject.
//!
//! RULE: Exactly one current assignment exists per subject.
//! Reassignment replaces the previous value; nothing is merged.

use crate::{
    clock::EvalContext,
    config::EngineConfig,
    persona::{Persona, PersonaMatcher, RuleTable, WELCOME_PRIORITY},
    prioritizer::Prioritizer,
    signals::SignalRecord,
    trace::{DecisionTrace, DecisionTraceBuilder},
    types::SubjectId,
    window::DataAvailability,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonaAssignment {
    pub subject_id:      SubjectId,
    pub persona:         Persona,
    pub priority:        u8,
    pub signal_strength: f64,
    pub decision_trace:  DecisionTrace,
    pub anchor_date:     NaiveDate,
    pub assigned_at:     DateTime<Utc>,
}

/// Classify one subject. Pure: same inputs, same assignment.
///
/// `record` must be the window chosen by `availability.matching_window()`;
/// it is ignored for NEW subjects, who always receive Welcome.
pub fn classify(
    subject_id: &str,
    availability: DataAvailability,
    record: Option<&SignalRecord>,
    ctx: &EvalContext,
    rules: &RuleTable,
    config: &EngineConfig,
) -> PersonaAssignment {
    let record = match (availability, record) {
        (DataAvailability::New, _) | (_, None) => return welcome(subject_id, availability, ctx),
        (_, Some(r)) => r,
    };

    let matched = PersonaMatcher::new(rules, &config.personas).match_personas(record);
    let outcome = Prioritizer::new(rules, &config.strength).select(&matched, record);
    let trace = DecisionTraceBuilder::from_prioritized(
        subject_id,
        ctx,
        availability,
        record.window_type,
        &matched,
        &outcome,
    );

    log::info!(
        "subject={subject_id}: assigned '{}' (priority {}, strength {:.2}, {:?})",
        outcome.persona.as_str(),
        outcome.priority,
        outcome.signal_strength,
        outcome.resolved_by
    );

    PersonaAssignment {
        subject_id:      subject_id.to_string(),
        persona:         outcome.persona,
        priority:        outcome.priority,
        signal_strength: outcome.signal_strength,
        decision_trace:  trace,
        anchor_date:     ctx.anchor_date,
        assigned_at:     ctx.now,
    }
}

fn welcome(subject_id: &str, availability: DataAvailability, ctx: &EvalContext) -> PersonaAssignment {
    log::info!("subject={subject_id}: {} data, assigned 'welcome'", availability.as_str());
    PersonaAssignment {
        subject_id:      subject_id.to_string(),
        persona:         Persona::Welcome,
        priority:        WELCOME_PRIORITY,
        signal_strength: 0.0,
        decision_trace:  DecisionTraceBuilder::welcome(subject_id, ctx, availability),
        anchor_date:     ctx.anchor_date,
        assigned_at:     ctx.now,
    }
}
