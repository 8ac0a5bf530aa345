use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid window: unrecognized window type '{0}'")]
    UnknownWindowType(String),

    #[error("Invalid window: anchor date {anchor} precedes earliest observed data {earliest}")]
    AnchorBeforeData {
        anchor:   NaiveDate,
        earliest: NaiveDate,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SignalError {
    /// True for the two InvalidWindow cases, the only structural domain errors.
    pub fn is_invalid_window(&self) -> bool {
        matches!(
            self,
            Self::UnknownWindowType(_) | Self::AnchorBeforeData { .. }
        )
    }
}

pub type SignalResult<T> = Result<T, SignalError>;
