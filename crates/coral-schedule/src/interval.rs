//! Half-open time intervals: generated occurrences, blocking intervals and
//! query windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::rule::{MoneyUnit, RuleId};

/// Anything occupying `[start, end)`.
pub trait TimeInterval {
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;
}

/// Two intervals overlap iff `a.start < b.end && b.start < a.end`.
///
/// An interval ending exactly when another begins does not overlap it, and an
/// empty interval overlaps nothing.
pub fn overlaps<A, B>(a: &A, b: &B) -> bool
where
    A: TimeInterval + ?Sized,
    B: TimeInterval + ?Sized,
{
    a.start() < b.end() && b.start() < a.end()
}

/// Length of the intersection of `a` and `b` in whole minutes, 0 if disjoint.
pub fn overlap_minutes<A, B>(a: &A, b: &B) -> i64
where
    A: TimeInterval + ?Sized,
    B: TimeInterval + ?Sized,
{
    if !overlaps(a, b) {
        return 0;
    }
    let start = a.start().max(b.start());
    let end = a.end().min(b.end());
    (end - start).num_minutes()
}

/// One concrete bookable slot generated from a rule. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOccurrence {
    /// Parent rule, `None` when the rule has not been persisted yet.
    pub rule_id: Option<RuleId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub price_per_min: f64,
    #[serde(default)]
    pub price_unit: MoneyUnit,
}

impl ScheduleOccurrence {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

impl TimeInterval for ScheduleOccurrence {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        ScheduleOccurrence::end(self)
    }
}

/// Where a blocking interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockingKind {
    /// A booked phone call.
    Call { call_id: u64 },
    /// Time the expert blocked out by hand.
    Exception { exception_id: u64 },
    /// An occurrence of one of the expert's existing rules.
    Rule { rule_id: Option<RuleId> },
}

/// An already-committed range that new occurrences must not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingInterval {
    pub kind: BlockingKind,
    #[serde(alias = "start_time", with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
}

impl BlockingInterval {
    pub fn call(call_id: u64, start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            kind: BlockingKind::Call { call_id },
            start,
            duration_minutes,
        }
    }

    pub fn exception(exception_id: u64, start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            kind: BlockingKind::Exception { exception_id },
            start,
            duration_minutes,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

impl From<&ScheduleOccurrence> for BlockingInterval {
    fn from(occurrence: &ScheduleOccurrence) -> Self {
        Self {
            kind: BlockingKind::Rule {
                rule_id: occurrence.rule_id,
            },
            start: occurrence.start,
            duration_minutes: occurrence.duration_minutes,
        }
    }
}

impl TimeInterval for BlockingInterval {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        BlockingInterval::end(self)
    }
}

/// A bounded query horizon `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
}

impl Window {
    /// # Errors
    /// Returns `ScheduleError::InvalidWindow` if `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(ScheduleError::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// The `days`-long window beginning at `start`.
    pub fn starting_at(start: DateTime<Utc>, days: u32) -> Self {
        Self {
            start,
            end: start + Duration::days(i64::from(days)),
        }
    }

    /// The next `days` days from the current instant.
    pub fn from_now(days: u32) -> Self {
        Self::starting_at(Utc::now(), days)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl TimeInterval for Window {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}
