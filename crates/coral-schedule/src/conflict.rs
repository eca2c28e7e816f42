//! Detect overlaps between candidate slots and everything already committed
//! for an expert.
//!
//! All checks use half-open intervals: a slot ending exactly when another
//! starts is NOT a conflict, so back-to-back bookings are allowed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cadence::Cadence;
use crate::config::ExpansionConfig;
use crate::error::{Result, ScheduleError};
use crate::expander::expand_with_config;
use crate::interval::{
    overlap_minutes, overlaps, BlockingInterval, ScheduleOccurrence, TimeInterval, Window,
};
use crate::rule::{RuleId, ScheduleRule};

/// A detected overlap between a candidate and a reference interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict<A, B> {
    pub candidate: A,
    pub reference: B,
    pub overlap_minutes: i64,
}

/// An existing rule left out of a conflict scan because it is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRule {
    pub rule_id: Option<RuleId>,
    pub reason: String,
}

/// Outcome of a full conflict check for one candidate rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict<ScheduleOccurrence, BlockingInterval>>,
    /// Existing rules that could not be expanded and were ignored.
    pub skipped_rules: Vec<SkippedRule>,
}

impl ConflictReport {
    pub fn has_conflict(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// True if any candidate overlaps any reference. False when either side is
/// empty.
pub fn has_conflict<A, B>(candidates: &[A], references: &[B]) -> bool
where
    A: TimeInterval,
    B: TimeInterval,
{
    candidates
        .iter()
        .any(|candidate| references.iter().any(|reference| overlaps(candidate, reference)))
}

/// Find every overlapping (candidate, reference) pair.
///
/// Pairs come out in candidate order, then reference order.
pub fn find_conflicts<A, B>(candidates: &[A], references: &[B]) -> Vec<Conflict<A, B>>
where
    A: TimeInterval + Clone,
    B: TimeInterval + Clone,
{
    let mut conflicts = Vec::new();

    for candidate in candidates {
        for reference in references {
            if overlaps(candidate, reference) {
                conflicts.push(Conflict {
                    candidate: candidate.clone(),
                    reference: reference.clone(),
                    overlap_minutes: overlap_minutes(candidate, reference),
                });
            }
        }
    }

    conflicts
}

/// Expand `candidate` over `window` and report whether any of its slots
/// collides with a relevant rule in `existing`.
///
/// Inactive rules, rules of other experts and the candidate's own previous
/// version (same id) are ignored. Malformed existing rules are skipped with a
/// warning. Existing rules are expanded around each candidate slot, so a slot
/// that started before `window` and runs into it still counts.
///
/// # Errors
/// Fails if the candidate itself does not validate or expand, or if a
/// well-formed existing rule cannot be expanded (for example it exceeds the
/// occurrence cap near the candidate's slots).
pub fn rule_conflicts_with_existing_rules(
    candidate: &ScheduleRule,
    existing: &[ScheduleRule],
    window: &Window,
) -> Result<bool> {
    let config = ExpansionConfig::default();
    let window = Window::new(window.start, window.end)?;
    let candidates = expand_with_config(candidate, window.start, window.end, &config)?;
    if candidates.is_empty() {
        return Ok(false);
    }
    let (references, _) = existing_rule_intervals(candidate, &candidates, existing, &config)?;
    Ok(has_conflict(&candidates, &references))
}

/// The complete check used by the registration and edit flows: candidate
/// slots against the expert's other rules plus booked calls and exceptions.
///
/// # Errors
/// Same as [`rule_conflicts_with_existing_rules`].
pub fn check_rule(
    candidate: &ScheduleRule,
    existing: &[ScheduleRule],
    booked: &[BlockingInterval],
    window: &Window,
    config: &ExpansionConfig,
) -> Result<ConflictReport> {
    let window = Window::new(window.start, window.end)?;
    let candidates = expand_with_config(candidate, window.start, window.end, config)?;

    let (mut references, skipped_rules) =
        existing_rule_intervals(candidate, &candidates, existing, config)?;
    references.extend_from_slice(booked);

    let conflicts = find_conflicts(&candidates, &references);

    debug!(
        rule_id = ?candidate.id,
        expert_id = candidate.expert_id,
        candidates = candidates.len(),
        references = references.len(),
        conflicts = conflicts.len(),
        skipped = skipped_rules.len(),
        "checked schedule rule for conflicts"
    );

    Ok(ConflictReport {
        conflicts,
        skipped_rules,
    })
}

/// Expand the existing rules that can block `candidate`, collecting the
/// malformed ones instead of aborting.
fn existing_rule_intervals(
    candidate: &ScheduleRule,
    slots: &[ScheduleOccurrence],
    existing: &[ScheduleRule],
    config: &ExpansionConfig,
) -> Result<(Vec<BlockingInterval>, Vec<SkippedRule>)> {
    let mut intervals = Vec::new();
    let mut skipped = Vec::new();

    for rule in existing {
        if !rule.active || rule.expert_id != candidate.expert_id {
            continue;
        }
        if rule.id.is_some() && rule.id == candidate.id {
            continue;
        }

        match expand_near_slots(rule, slots, config) {
            Ok(occurrences) => intervals.extend(occurrences.iter().map(BlockingInterval::from)),
            Err(e) if e.is_rule_defect() => {
                warn!(
                    rule_id = ?rule.id,
                    expert_id = rule.expert_id,
                    error = %e,
                    "skipping malformed existing schedule rule"
                );
                skipped.push(SkippedRule {
                    rule_id: rule.id,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok((intervals, skipped))
}

/// Expand `rule` only where its occurrences can touch one of `slots`: from one
/// rule duration before each slot start up to that slot's end. Touching spans
/// are merged, so no occurrence is produced twice.
///
/// `slots` must be ascending by start.
fn expand_near_slots(
    rule: &ScheduleRule,
    slots: &[ScheduleOccurrence],
    config: &ExpansionConfig,
) -> Result<Vec<ScheduleOccurrence>> {
    rule.validate()?;
    Cadence::parse(&rule.recurrence)?;

    let lead = rule.duration();
    let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    for slot in slots {
        let (start, end) = (slot.start - lead, slot.end());
        if let Some(last) = spans.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        spans.push((start, end));
    }

    let mut occurrences = Vec::new();
    for (start, end) in spans {
        occurrences.extend(expand_with_config(rule, start, end, config)?);
        if occurrences.len() > config.max_occurrences {
            return Err(ScheduleError::TooManyOccurrences {
                limit: config.max_occurrences,
            });
        }
    }
    Ok(occurrences)
}
