//! Five-field cron expressions evaluated against wall-clock time in a zone.
//!
//! Format: `minute hour day-of-month month day-of-week`. Every field accepts
//! `*`, a value, a range `a-b`, a step (`*/n`, `a-b/n`, `a/n`) or a comma list
//! of those. Months and weekdays also accept three-letter names.

use std::fmt;

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, ScheduleError};

const MONTH_NAMES: &[&str] = &[
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const WEEKDAY_NAMES: &[&str] = &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    name_offset: u32,
}

const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
    name_offset: 0,
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
    name_offset: 0,
};
const DAY_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
    name_offset: 0,
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: MONTH_NAMES,
    name_offset: 1,
};
// 7 is accepted as a second spelling of Sunday and folded onto 0.
const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: WEEKDAY_NAMES,
    name_offset: 0,
};

/// A parsed cron expression. Field values are stored expanded and sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days: Vec<u32>,
    months: Vec<u32>,
    weekdays: Vec<u32>,
    days_restricted: bool,
    weekdays_restricted: bool,
}

impl CronExpression {
    /// # Errors
    /// Returns `ScheduleError::InvalidCadence` naming the offending field.
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |reason: String| ScheduleError::InvalidCadence {
            descriptor: expr.to_string(),
            reason,
        };

        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(invalid(format!("expected 5 fields, got {}", parts.len())));
        }

        let minutes = parse_field(parts[0], &MINUTE).map_err(invalid)?;
        let hours = parse_field(parts[1], &HOUR).map_err(invalid)?;
        let days = parse_field(parts[2], &DAY_OF_MONTH).map_err(invalid)?;
        let months = parse_field(parts[3], &MONTH).map_err(invalid)?;
        let mut weekdays = parse_field(parts[4], &DAY_OF_WEEK).map_err(invalid)?;
        for day in weekdays.iter_mut() {
            if *day == 7 {
                *day = 0;
            }
        }
        weekdays.sort_unstable();
        weekdays.dedup();

        Ok(Self {
            source: parts.join(" "),
            minutes,
            hours,
            days,
            months,
            weekdays,
            days_restricted: !parts[2].starts_with('*'),
            weekdays_restricted: !parts[4].starts_with('*'),
        })
    }

    /// Whether any time on `date` can match.
    ///
    /// When both day-of-month and day-of-week are restricted a date matches
    /// if either one does.
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        if !self.months.contains(&date.month()) {
            return false;
        }
        let dom = self.days.contains(&date.day());
        let dow = self
            .weekdays
            .contains(&date.weekday().num_days_from_sunday());
        match (self.days_restricted, self.weekdays_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }

    /// Enumerate matching instants in `[from, until)`, ascending, with the
    /// wall-clock fields read in `tz`.
    ///
    /// Local times skipped by a DST gap produce nothing; repeated local times
    /// resolve to the earlier instant.
    ///
    /// # Errors
    /// Returns `ScheduleError::TooManyOccurrences` once more than `limit`
    /// instants have been produced.
    pub fn instants_between(
        &self,
        tz: Tz,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>> {
        let mut instants: Vec<DateTime<Utc>> = Vec::new();
        if from >= until {
            return Ok(instants);
        }

        let mut day = from.with_timezone(&tz).date_naive();
        let last_day = until.with_timezone(&tz).date_naive();

        while day <= last_day {
            if self.matches_date(day) {
                for &hour in &self.hours {
                    for &minute in &self.minutes {
                        let Some(naive) = day.and_hms_opt(hour, minute, 0) else {
                            continue;
                        };
                        let local = match tz.from_local_datetime(&naive) {
                            LocalResult::Single(dt) => dt,
                            LocalResult::Ambiguous(earliest, _) => earliest,
                            LocalResult::None => continue,
                        };
                        let instant = local.with_timezone(&Utc);
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
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        Ok(instants)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_field(raw: &str, field: &FieldSpec) -> std::result::Result<Vec<u32>, String> {
    let mut values = Vec::new();

    for item in raw.split(',') {
        if item.is_empty() {
            return Err(format!("empty item in {} field '{}'", field.name, raw));
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step '{}' in {} field", step, field.name))?;
                if step == 0 {
                    return Err(format!("zero step in {} field", field.name));
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let (low, high) = if range == "*" {
            (field.min, field.max)
        } else if let Some((low, high)) = range.split_once('-') {
            (parse_value(low, field)?, parse_value(high, field)?)
        } else {
            let value = parse_value(range, field)?;
            // `a/n` runs from `a` to the top of the field.
            if step.is_some() {
                (value, field.max)
            } else {
                (value, value)
            }
        };

        if low < field.min || high > field.max || low > high {
            return Err(format!(
                "{}-{} not valid in {} range {}-{}",
                low, high, field.name, field.min, field.max
            ));
        }

        values.extend((low..=high).step_by(step.unwrap_or(1) as usize));
    }

    values.sort_unstable();
    values.dedup();
    Ok(values)
}

fn parse_value(token: &str, field: &FieldSpec) -> std::result::Result<u32, String> {
    if let Ok(value) = token.parse::<u32>() {
        return Ok(value);
    }
    field.names
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
        .map(|index| index as u32 + field.name_offset)
        .ok_or_else(|| format!("invalid {} value '{}'", field.name, token))
}
