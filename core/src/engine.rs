//! The signal engine: the single entry point consumers call.
//!
//! EXECUTION ORDER for one classification (fixed, never reordered):
//!   1. Load the subject's history from the data source, once.
//!      Reject an anchor that precedes every observed transaction.
//!   2. Classify data availability from the earliest settled transaction.
//!   3. NEW: assign Welcome, skip everything below.
//!   4. Fetch the tier's window record through the cache.
//!   5. Match the rule table against the record.
//!   6. Prioritize the matched set down to one persona.
//!   7. Replace the subject's current assignment and record the events.
//!
//! RULES:
//!   - The engine never writes through the data source.
//!   - The cache is the only shared mutable state and is owned here.
//!   - The evaluation context is passed in. Nothing reads the wall clock.
//!   - Every fresh computation and every assignment is an audit event.

use crate::{
    assignment::{classify, PersonaAssignment},
    cache::{CacheOutcome, SignalCache},
    clock::EvalContext,
    config::EngineConfig,
    dataset::SubjectDataSource,
    error::SignalResult,
    event::{EngineEvent, EventLogEntry},
    model::SubjectHistory,
    persona::RuleTable,
    signals::SignalRecord,
    store::SignalStore,
    types::SubjectId,
    window::{DataAvailability, WindowPartitioner, WindowType},
};
use chrono::{DateTime, Utc};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

pub struct SignalEngine<D: SubjectDataSource> {
    config:      EngineConfig,
    source:      D,
    rules:       RuleTable,
    cache:       SignalCache,
    assignments: HashMap<SubjectId, PersonaAssignment>,
    /// Subjects invalidated since their last assignment.
    stale:       HashSet<SubjectId>,
    events:      Vec<EngineEvent>,
    journal:     Option<SignalStore>,
}

impl<D: SubjectDataSource> SignalEngine<D> {
    pub fn new(source: D, config: EngineConfig) -> Self {
        let cache = SignalCache::new(config.cache.ttl_hours);
        Self {
            config,
            source,
            rules: RuleTable::standard(),
            cache,
            assignments: HashMap::new(),
            stale: HashSet::new(),
            events: Vec::new(),
            journal: None,
        }
    }

    /// Replace the rule table. Priorities and predicates are the table's own.
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    /// Persist records, assignments and events to `store` from now on.
    pub fn with_journal(mut self, store: SignalStore) -> Self {
        self.journal = Some(store);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Mutable access for callers that refresh the source in place.
    /// Pair every change with `invalidate`.
    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    pub fn journal(&self) -> Option<&SignalStore> {
        self.journal.as_ref()
    }

    pub fn cached_records(&self) -> usize {
        self.cache.len()
    }

    // ── Signals ────────────────────────────────────────────────

    /// The record for (subject, window) at `ctx.anchor_date`, from the cache
    /// when fresh.
    pub fn get_signals(
        &mut self,
        subject_id: &str,
        window_type: WindowType,
        ctx: &EvalContext,
    ) -> SignalResult<Arc<SignalRecord>> {
        self.cached_signals(subject_id, window_type, ctx, None)
    }

    /// `history` spares a second source read when the caller already has it.
    fn cached_signals(
        &mut self,
        subject_id: &str,
        window_type: WindowType,
        ctx: &EvalContext,
        history: Option<&SubjectHistory>,
    ) -> SignalResult<Arc<SignalRecord>> {
        let source = &self.source;
        let config = &self.config;
        let (record, outcome) = self.cache.get_or_compute(subject_id, window_type, ctx, || match history {
            Some(history) => SignalRecord::compute(history, window_type, ctx, config),
            None => {
                let history = source.subject_history(subject_id)?;
                SignalRecord::compute(&history, window_type, ctx, config)
            }
        })?;

        match outcome {
            CacheOutcome::Hit => self.record_event(EngineEvent::SignalsCacheHit {
                subject_id:  subject_id.to_string(),
                anchor_date: ctx.anchor_date,
                window_type,
            })?,
            CacheOutcome::Computed => {
                if let Some(store) = &self.journal {
                    store.insert_signal_record(&record)?;
                }
                self.record_event(EngineEvent::SignalsComputed {
                    subject_id:       subject_id.to_string(),
                    anchor_date:      ctx.anchor_date,
                    window_type,
                    subscriptions:    record.subscriptions.recurring_merchant_count,
                    utilization_pct:  record.credit.utilization_pct(),
                    payroll_detected: record.income.payroll_detected,
                })?;
            }
        }
        Ok(record)
    }

    /// Compute without touching the cache, the journal or the event log.
    pub fn compute_signals_fresh(
        &self,
        subject_id: &str,
        window_type: WindowType,
        ctx: &EvalContext,
    ) -> SignalResult<SignalRecord> {
        let history = self.source.subject_history(subject_id)?;
        SignalRecord::compute(&history, window_type, ctx, &self.config)
    }

    pub fn data_availability(&self, subject_id: &str, ctx: &EvalContext) -> SignalResult<DataAvailability> {
        let history = self.source.subject_history(subject_id)?;
        Ok(DataAvailability::classify(&history, ctx.anchor_date))
    }

    // ── Personas ───────────────────────────────────────────────

    /// Classify `subject_id` now and replace its current assignment.
    ///
    /// An anchor before the subject's earliest observed transaction is an
    /// error here too, even when no window would be computed.
    pub fn assign_persona(&mut self, subject_id: &str, ctx: &EvalContext) -> SignalResult<PersonaAssignment> {
        let history = self.source.subject_history(subject_id)?;
        WindowPartitioner::check_anchor(&history, ctx.anchor_date)?;
        let availability = DataAvailability::classify(&history, ctx.anchor_date);
        let record = match availability.matching_window() {
            Some(window_type) => Some(self.cached_signals(subject_id, window_type, ctx, Some(&history))?),
            None => None,
        };

        let assignment = classify(
            subject_id,
            availability,
            record.as_deref(),
            ctx,
            &self.rules,
            &self.config,
        );

        let trace = &assignment.decision_trace;
        if trace.empty_match_fallback {
            if let Some(window_type) = trace.window_type {
                self.record_event(EngineEvent::EmptyMatchFallback {
                    subject_id:  subject_id.to_string(),
                    anchor_date: ctx.anchor_date,
                    window_type,
                    persona:     assignment.persona,
                })?;
            }
        }
        self.record_event(EngineEvent::PersonaAssigned {
            subject_id:        subject_id.to_string(),
            anchor_date:       ctx.anchor_date,
            persona:           assignment.persona,
            priority:          assignment.priority,
            data_availability: availability,
            resolved_by:       assignment.decision_trace.resolved_by,
            signal_strength:   assignment.signal_strength,
        })?;

        if let Some(store) = &self.journal {
            store.upsert_assignment(&assignment)?;
        }
        self.stale.remove(subject_id);
        self.assignments
            .insert(subject_id.to_string(), assignment.clone());
        Ok(assignment)
    }

    /// The current assignment when it was made for this anchor and nothing
    /// invalidated it since; otherwise a fresh classification.
    pub fn get_persona(&mut self, subject_id: &str, ctx: &EvalContext) -> SignalResult<PersonaAssignment> {
        if !self.stale.contains(subject_id) {
            if let Some(current) = self.assignments.get(subject_id) {
                if current.anchor_date == ctx.anchor_date {
                    return Ok(current.clone());
                }
            }
        }
        self.assign_persona(subject_id, ctx)
    }

    pub fn current_persona(&self, subject_id: &str) -> Option<&PersonaAssignment> {
        self.assignments.get(subject_id)
    }

    /// Classify every subject the source knows, in subject id order.
    pub fn assign_all(&mut self, ctx: &EvalContext) -> SignalResult<Vec<PersonaAssignment>> {
        let ids = self.source.subject_ids()?;
        let mut out = Vec::with_capacity(ids.len());
        for id in &ids {
            out.push(self.get_persona(id, ctx)?);
        }
        Ok(out)
    }

    // ── Invalidation ───────────────────────────────────────────

    /// Force recomputation of the subject's signals and persona on next access.
    pub fn invalidate(&mut self, subject_id: &str, ctx: &EvalContext) -> SignalResult<usize> {
        let removed = self.cache.invalidate(subject_id);
        self.stale.insert(subject_id.to_string());
        self.record_event(EngineEvent::CacheInvalidated {
            subject_id:      subject_id.to_string(),
            anchor_date:     ctx.anchor_date,
            entries_removed: removed,
        })?;
        Ok(removed)
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let removed = self.cache.purge_expired(now);
        if removed > 0 {
            log::debug!("purged {removed} expired signal records");
        }
        removed
    }

    // ── Events ─────────────────────────────────────────────────

    /// Buffered events since the last drain, in emission order.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn record_event(&mut self, event: EngineEvent) -> SignalResult<()> {
        if let Some(store) = &self.journal {
            store.append_event(&EventLogEntry::from_event(&event)?)?;
        }
        self.events.push(event);
        Ok(())
    }
}
