//! Decision trace: the audit record of one classification.
//!
//! A trace is a plain value: it holds no reference back to the assignment
//! that owns it and can be rebuilt from the same stored inputs.

use crate::{
    clock::EvalContext,
    persona::{MatchedPersona, Persona, WELCOME_PRIORITY},
    prioritizer::{Prioritized, StrengthComponents},
    types::SubjectId,
    window::{DataAvailability, WindowType},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Which step of the selection chain produced the final choice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakStep {
    /// NEW availability: matching bypassed.
    NewSubjectWelcome,
    /// Nothing matched; lowest-priority persona assigned.
    EmptyMatchFallback,
    /// A single candidate at the top priority.
    PriorityOrder,
    /// Highest signal strength among same-priority candidates.
    SignalStrength,
    /// Exact strength tie resolved by the fixed persona order.
    FixedOrder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CandidateTrace {
    pub persona:         Persona,
    pub priority:        u8,
    pub signal_strength: f64,
    /// Survived the priority filter.
    pub at_top_priority: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTrace {
    pub subject_id:           SubjectId,
    pub anchor_date:          NaiveDate,
    pub data_availability:    DataAvailability,
    /// `None` when matching was bypassed.
    pub window_type:          Option<WindowType>,
    pub matched:              Vec<Persona>,
    pub candidates:           Vec<CandidateTrace>,
    pub top_priority:         Option<u8>,
    pub resolved_by:          TieBreakStep,
    pub chosen:               Persona,
    pub chosen_priority:      u8,
    pub signal_strength:      f64,
    pub strength_components:  Option<StrengthComponents>,
    /// Set when the rule table matched nothing. Should not happen.
    pub empty_match_fallback: bool,
    pub recorded_at:          DateTime<Utc>,
}

pub struct DecisionTraceBuilder;

impl DecisionTraceBuilder {
    pub fn welcome(subject_id: &str, ctx: &EvalContext, availability: DataAvailability) -> DecisionTrace {
        DecisionTrace {
            subject_id:           subject_id.to_string(),
            anchor_date:          ctx.anchor_date,
            data_availability:    availability,
            window_type:          None,
            matched:              Vec::new(),
            candidates:           Vec::new(),
            top_priority:         None,
            resolved_by:          TieBreakStep::NewSubjectWelcome,
            chosen:               Persona::Welcome,
            chosen_priority:      WELCOME_PRIORITY,
            signal_strength:      0.0,
            strength_components:  None,
            empty_match_fallback: false,
            recorded_at:          ctx.now,
        }
    }

    pub fn from_prioritized(
        subject_id: &str,
        ctx: &EvalContext,
        availability: DataAvailability,
        window_type: WindowType,
        matched: &[MatchedPersona],
        outcome: &Prioritized,
    ) -> DecisionTrace {
        DecisionTrace {
            subject_id:           subject_id.to_string(),
            anchor_date:          ctx.anchor_date,
            data_availability:    availability,
            window_type:          Some(window_type),
            matched:              matched.iter().map(|m| m.persona).collect(),
            candidates:           outcome.candidates.clone(),
            top_priority:         outcome.top_priority,
            resolved_by:          outcome.resolved_by,
            chosen:               outcome.persona,
            chosen_priority:      outcome.priority,
            signal_strength:      outcome.signal_strength,
            strength_components:  Some(outcome.components),
            empty_match_fallback: outcome.resolved_by == TieBreakStep::EmptyMatchFallback,
            recorded_at:          ctx.now,
        }
    }
}

impl DecisionTrace {
    /// One-line rendering for logs and the runner summary.
    pub fn summary(&self) -> String {
        let matched: Vec<&str> = self.matched.iter().map(|p| p.as_str()).collect();
        format!(
            "{} -> {} (priority {}, {:?}, matched [{}])",
            self.subject_id,
            self.chosen.as_str(),
            self.chosen_priority,
            self.resolved_by,
            matched.join(", ")
        )
    }
}
