//! Recurrence descriptors accepted on a [`ScheduleRule`](crate::rule::ScheduleRule).

use crate::cron::CronExpression;
use crate::error::Result;

/// How often a rule repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cadence {
    /// Five-field cron expression, the format expert rules are stored in.
    Cron(CronExpression),
    /// RFC 5545 RRULE body such as `FREQ=WEEKLY;BYDAY=MO`, expanded from the
    /// rule's repeat start.
    RRule(String),
}

impl Cadence {
    /// Classify and parse a descriptor. Anything mentioning `FREQ=` is taken
    /// as an RRULE (an `RRULE:` prefix is stripped); everything else must be
    /// a cron expression.
    ///
    /// RRULE bodies are only checked when expanded.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let trimmed = descriptor.trim();
        if trimmed.to_ascii_uppercase().contains("FREQ=") {
            let body = match trimmed.get(..6) {
                Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &trimmed[6..],
                _ => trimmed,
            };
            return Ok(Cadence::RRule(body.to_string()));
        }
        CronExpression::parse(trimmed).map(Cadence::Cron)
    }
}
