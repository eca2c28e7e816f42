//! Recurring availability rules owned by an expert.
//!
//! A rule is plain data. It knows how to check its own invariants and nothing
//! else; expansion and conflict logic live in [`crate::expander`] and
//! [`crate::conflict`].

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Identifier of an expert (integration member).
pub type ExpertId = u64;

/// Identifier of a persisted schedule rule.
pub type RuleId = u64;

/// Currency or unit the per-minute price is expressed in.
///
/// Serialized as the numeric codes used by the booking tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MoneyUnit {
    #[default]
    Rupee,
    Dollar,
    Percent,
}

impl TryFrom<u8> for MoneyUnit {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            0 => Ok(MoneyUnit::Rupee),
            1 => Ok(MoneyUnit::Dollar),
            2 => Ok(MoneyUnit::Percent),
            other => Err(format!("unknown money unit code {}", other)),
        }
    }
}

impl From<MoneyUnit> for u8 {
    fn from(unit: MoneyUnit) -> Self {
        match unit {
            MoneyUnit::Rupee => 0,
            MoneyUnit::Dollar => 1,
            MoneyUnit::Percent => 2,
        }
    }
}

/// A recurring availability definition.
///
/// Rules are never deleted. Editing creates a new version with the same `id`;
/// retiring a rule clears `active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RuleId>,
    #[serde(alias = "integration_member_id")]
    pub expert_id: ExpertId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub repeat_start: DateTime<Utc>,
    /// `None` (or `0` on the wire) means the rule never ends.
    #[serde(default, with = "unbounded_millis")]
    pub repeat_end: Option<DateTime<Utc>>,
    /// Cron expression or RFC 5545 RRULE, see [`crate::cadence::Cadence`].
    #[serde(alias = "cron_rule")]
    pub recurrence: String,
    /// IANA zone the recurrence wall-clock times are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub price_per_min: f64,
    #[serde(default)]
    pub price_unit: MoneyUnit,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_active() -> bool {
    true
}

impl ScheduleRule {
    /// Build an active, unbounded, unpriced rule evaluated in UTC.
    pub fn new(
        expert_id: ExpertId,
        repeat_start: DateTime<Utc>,
        recurrence: impl Into<String>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: None,
            expert_id,
            repeat_start,
            repeat_end: None,
            recurrence: recurrence.into(),
            timezone: default_timezone(),
            duration_minutes,
            price_per_min: 0.0,
            price_unit: MoneyUnit::default(),
            active: true,
        }
    }

    pub fn with_id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_end(mut self, repeat_end: DateTime<Utc>) -> Self {
        self.repeat_end = Some(repeat_end);
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_price(mut self, price_per_min: f64, price_unit: MoneyUnit) -> Self {
        self.price_per_min = price_per_min;
        self.price_unit = price_unit;
        self
    }

    /// Clear the active flag. Deactivated rules keep their history but take
    /// no part in conflict scans.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// The end bound, with a zero timestamp treated as unbounded.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.repeat_end.filter(|end| end.timestamp_millis() != 0)
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone(self.timezone.clone()))
    }

    /// Check the structural invariants every rule must satisfy before it can
    /// be expanded.
    pub fn validate(&self) -> Result<()> {
        if self.expert_id == 0 {
            return Err(ScheduleError::InvalidRule("missing expert".to_string()));
        }
        if self.repeat_start.timestamp_millis() == 0 {
            return Err(ScheduleError::InvalidRule(
                "missing repeat start".to_string(),
            ));
        }
        if self.recurrence.trim().is_empty() {
            return Err(ScheduleError::InvalidRule(
                "missing recurrence".to_string(),
            ));
        }
        if self.duration_minutes == 0 {
            return Err(ScheduleError::InvalidRule(
                "duration must be positive".to_string(),
            ));
        }
        if let Some(end) = self.effective_end() {
            if end <= self.repeat_start {
                return Err(ScheduleError::InvalidRule(format!(
                    "repeat end {} is not after repeat start {}",
                    end.to_rfc3339(),
                    self.repeat_start.to_rfc3339()
                )));
            }
        }
        self.tz()?;
        Ok(())
    }
}

/// Epoch-millisecond serde for an optional end bound where `0` and `null`
/// both mean "no end".
mod unbounded_millis {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.map(|dt| dt.timestamp_millis()).unwrap_or(0))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<i64>::deserialize(deserializer)? {
            None | Some(0) => Ok(None),
            Some(ms) => DateTime::from_timestamp_millis(ms)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("timestamp {} out of range", ms))),
        }
    }
}
