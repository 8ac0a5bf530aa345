//! Signal cache: the latest record per (subject, window type) and its computation date.
//!
//! RULE: Entries are immutable. A refresh replaces the Arc, never edits it.
//! RULE: The key carries the computation date. Window boundaries move
//! daily, so a subject-only key would serve stale windows.
//! RULE: At most one entry per (subject, window type). Storing a record for
//! a new computation date evicts the entry for the previous one.
//!
//! The cache is advisory. Callers needing guaranteed freshness compute
//! directly with SignalRecord::compute.

use crate::{
    clock::EvalContext,
    error::SignalResult,
    signals::SignalRecord,
    types::SubjectId,
    window::WindowType,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub subject_id:  SubjectId,
    pub window_type: WindowType,
    pub computed_on: NaiveDate,
}

impl CacheKey {
    pub fn new(subject_id: &str, window_type: WindowType, computed_on: NaiveDate) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            window_type,
            computed_on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Computed,
}

/// One slot per (subject, window type). The slot's record carries its own
/// computation date, which a lookup must match.
pub struct SignalCache {
    entries: HashMap<(SubjectId, WindowType), Arc<SignalRecord>>,
    ttl:     Duration,
}

impl SignalCache {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl:     Duration::hours(ttl_hours),
        }
    }

    fn is_fresh(&self, record: &SignalRecord, now: DateTime<Utc>) -> bool {
        now - record.computed_at < self.ttl
    }

    /// A fresh cached record, if any. Never computes.
    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Arc<SignalRecord>> {
        self.entries
            .get(&(key.subject_id.clone(), key.window_type))
            .filter(|r| r.anchor_date() == key.computed_on && self.is_fresh(r, now))
            .cloned()
    }

    /// Return the cached record when fresh, else run `compute`, store, return.
    pub fn get_or_compute<F>(
        &mut self,
        subject_id: &str,
        window_type: WindowType,
        ctx: &EvalContext,
        compute: F,
    ) -> SignalResult<(Arc<SignalRecord>, CacheOutcome)>
    where
        F: FnOnce() -> SignalResult<SignalRecord>,
    {
        let key = CacheKey::new(subject_id, window_type, ctx.anchor_date);
        if let Some(hit) = self.get(&key, ctx.now) {
            return Ok((hit, CacheOutcome::Hit));
        }
        let fresh = Arc::new(compute()?);
        self.store(key, Arc::clone(&fresh));
        Ok((fresh, CacheOutcome::Computed))
    }

    /// Store `record` under its own key, replacing any previous entry.
    pub fn insert(&mut self, record: SignalRecord) -> Arc<SignalRecord> {
        let key = CacheKey::new(&record.subject_id, record.window_type, record.anchor_date());
        let record = Arc::new(record);
        self.store(key, Arc::clone(&record));
        record
    }

    fn store(&mut self, key: CacheKey, record: Arc<SignalRecord>) {
        self.entries.insert((key.subject_id, key.window_type), record);
    }

    /// Drop every entry for `subject_id`. Returns the number removed.
    pub fn invalidate(&mut self, subject_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(subject, _), _| subject != subject_id);
        before - self.entries.len()
    }

    /// Drop entries past their TTL. Returns the number removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, r| now - r.computed_at < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
