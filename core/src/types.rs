//! Shared primitive types used across the entire engine.

/// A stable identifier for the subject being analyzed (one account holder).
pub type SubjectId = String;

/// A stable, unique identifier for an account or transaction.
pub type EntityId = String;

/// Days in a normalized month. Monthly figures are scaled to this length.
pub const DAYS_PER_MONTH: f64 = 30.0;
