//! Error types for schedule expansion and conflict checks.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A rule failed its structural invariants (missing start, cadence or
    /// duration, or an end that is not after the start).
    #[error("Invalid schedule rule: {0}")]
    InvalidRule(String),

    #[error("Invalid recurrence '{descriptor}': {reason}")]
    InvalidCadence { descriptor: String, reason: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow { start: String, end: String },

    /// The horizon would produce more occurrences than the configured cap.
    #[error("Expansion exceeded {limit} occurrences")]
    TooManyOccurrences { limit: usize },

    #[error("Expansion error: {0}")]
    Expansion(String),

    /// A rule or booking store failed to answer.
    #[error("Store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

impl ScheduleError {
    /// True when the rule itself is broken, as opposed to a limit or an
    /// environment failure hit while expanding a well-formed rule.
    pub fn is_rule_defect(&self) -> bool {
        matches!(
            self,
            Self::InvalidRule(_) | Self::InvalidCadence { .. } | Self::InvalidTimezone(_)
        )
    }
}
