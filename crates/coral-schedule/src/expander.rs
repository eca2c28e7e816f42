//! Rule expansion -- turns a [`ScheduleRule`] into the concrete slots it offers
//! inside a query window.
//!
//! Cron cadences are enumerated day by day in the rule's timezone. RRULE
//! cadences go through the `rrule` crate with `DTSTART` set to the rule's
//! repeat start.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::debug;

use crate::cadence::Cadence;
use crate::config::ExpansionConfig;
use crate::error::{Result, ScheduleError};
use crate::interval::{ScheduleOccurrence, Window};
use crate::rule::ScheduleRule;

/// Expand `rule` into its occurrences within `[window_start, window_end)`
/// using the default [`ExpansionConfig`].
///
/// The generation horizon is `[max(repeat_start, window_start),
/// min(repeat_end, window_end))`; an empty horizon yields an empty list.
/// Occurrences are strictly ascending by start. `repeat_start` is honoured
/// to the second; any millisecond part is dropped.
///
/// # Errors
/// - `ScheduleError::InvalidRule` / `InvalidTimezone` if the rule fails validation.
/// - `ScheduleError::InvalidCadence` if the recurrence cannot be parsed.
/// - `ScheduleError::InvalidWindow` if `window_start > window_end`.
/// - `ScheduleError::TooManyOccurrences` if the horizon exceeds the cap.
pub fn expand(
    rule: &ScheduleRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<ScheduleOccurrence>> {
    expand_with_config(rule, window_start, window_end, &ExpansionConfig::default())
}

/// [`expand`] with explicit limits.
pub fn expand_with_config(
    rule: &ScheduleRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    config: &ExpansionConfig,
) -> Result<Vec<ScheduleOccurrence>> {
    rule.validate()?;
    let window = Window::new(window_start, window_end)?;
    let cadence = Cadence::parse(&rule.recurrence)?;
    let tz = rule.tz()?;

    // Cadences fire on whole seconds.
    let repeat_start = rule.repeat_start.trunc_subsecs(0);
    let horizon_start = repeat_start.max(window.start);
    let horizon_end = rule
        .effective_end()
        .map_or(window.end, |end| end.min(window.end));

    if horizon_start >= horizon_end {
        debug!(rule_id = ?rule.id, "empty generation horizon");
        return Ok(Vec::new());
    }

    let starts = match &cadence {
        Cadence::Cron(cron) => {
            cron.instants_between(tz, horizon_start, horizon_end, config.max_occurrences)?
        }
        Cadence::RRule(body) => rrule_instants(
            body,
            repeat_start,
            tz,
            horizon_start,
            horizon_end,
            config.max_occurrences,
        )?,
    };

    debug!(
        rule_id = ?rule.id,
        expert_id = rule.expert_id,
        occurrences = starts.len(),
        "expanded schedule rule"
    );

    Ok(starts
        .into_iter()
        .map(|start| ScheduleOccurrence {
            rule_id: rule.id,
            start,
            duration_minutes: rule.duration_minutes,
            price_per_min: rule.price_per_min,
            price_unit: rule.price_unit,
        })
        .collect())
}

/// Expand an RRULE body anchored at `dtstart` and keep the instants in
/// `[from, until)`.
fn rrule_instants(
    body: &str,
    dtstart: DateTime<Utc>,
    tz: Tz,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<DateTime<Utc>>> {
    if body.trim().is_empty() {
        return Err(ScheduleError::InvalidCadence {
            descriptor: body.to_string(),
            reason: "empty RRULE".to_string(),
        });
    }

    // The rrule crate wants a local DTSTART in iCalendar basic format.
    let dtstart_ical = dtstart.with_timezone(&tz).format("%Y%m%dT%H%M%S");
    let rrule_text = format!("DTSTART;TZID={}:{}\nRRULE:{}", tz.name(), dtstart_ical, body);

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| ScheduleError::InvalidCadence {
            descriptor: body.to_string(),
            reason: format!("{}", e),
        })?;

    // `all` takes a u16 cap; ask for one more than the limit so overflow is
    // observable rather than silently truncated.
    let limit = limit.min(usize::from(u16::MAX) - 1);
    let cap = u16::try_from(limit + 1).unwrap_or(u16::MAX);

    let result = rrule_set
        .after((from - Duration::seconds(1)).with_timezone(&rrule::Tz::UTC))
        .before(until.with_timezone(&rrule::Tz::UTC))
        .all(cap);

    let mut instants: Vec<DateTime<Utc>> = Vec::new();
    for dt in result.dates {
        let instant = dt.with_timezone(&Utc);
        if instant < from || instant >= until {
            continue;
        }
        if instants.last().is_some_and(|last| *last >= instant) {
            continue;
        }
        if instants.len() == limit {
            return Err(ScheduleError::TooManyOccurrences { limit });
        }
        instants.push(instant);
    }

    if result.limited && instants.len() == limit {
        return Err(ScheduleError::TooManyOccurrences { limit });
    }

    Ok(instants)
}
