//! Store-backed entry points for the booking and registration flows.

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use crate::availability::available_occurrences;
use crate::config::ExpansionConfig;
use crate::conflict::{check_rule, ConflictReport, SkippedRule};
use crate::error::{Result, ScheduleError};
use crate::expander::expand_with_config;
use crate::interval::{ScheduleOccurrence, Window};
use crate::rule::{ExpertId, ScheduleRule};
use crate::store::{BookingSource, RuleSource};

/// Runs conflict checks and availability queries against live stores.
///
/// Holds no mutable state, so one checker can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct ScheduleChecker<R, B> {
    rules: R,
    bookings: B,
    config: ExpansionConfig,
}

/// Slots still open for booking, plus any rules that could not be expanded.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BookableSlots {
    pub slots: Vec<ScheduleOccurrence>,
    pub skipped_rules: Vec<SkippedRule>,
}

impl<R, B> ScheduleChecker<R, B>
where
    R: RuleSource,
    B: BookingSource,
{
    pub fn new(rules: R, bookings: B) -> Self {
        Self::with_config(rules, bookings, ExpansionConfig::default())
    }

    pub fn with_config(rules: R, bookings: B, config: ExpansionConfig) -> Self {
        Self {
            rules,
            bookings,
            config,
        }
    }

    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// Check `candidate` against the expert's active rules, booked calls and
    /// exceptions inside `window`.
    ///
    /// # Errors
    /// Candidate validation errors and store failures propagate.
    pub fn check(&self, candidate: &ScheduleRule, window: &Window) -> Result<ConflictReport> {
        candidate.validate()?;

        let existing = self
            .rules
            .fetch_active_rules_for_expert(candidate.expert_id)
            .map_err(|e| ScheduleError::Store(Box::new(e)))?;

        // Slots starting near the end of the window run past it.
        let booking_window = Window {
            start: window.start,
            end: window.end + candidate.duration(),
        };
        let booked = self
            .bookings
            .fetch_booked_intervals(candidate.expert_id, &booking_window)
            .map_err(|e| ScheduleError::Store(Box::new(e)))?;

        check_rule(candidate, &existing, &booked, window, &self.config)
    }

    /// [`check`](Self::check) over the configured default horizon, starting
    /// at the later of now and the rule's repeat start.
    pub fn check_next_days(&self, candidate: &ScheduleRule) -> Result<ConflictReport> {
        let start = Utc::now().max(candidate.repeat_start);
        let window = Window::starting_at(start, self.config.default_horizon_days);
        self.check(candidate, &window)
    }

    /// Every slot the expert's active rules offer in `window` that no booked
    /// call or exception overlaps, ascending by start.
    ///
    /// Malformed rules are skipped and reported, not fatal. A well-formed rule
    /// that exceeds the occurrence cap fails the query instead of vanishing
    /// from the listing.
    pub fn bookable_slots(&self, expert_id: ExpertId, window: &Window) -> Result<BookableSlots> {
        let window = Window::new(window.start, window.end)?;
        let rules = self
            .rules
            .fetch_active_rules_for_expert(expert_id)
            .map_err(|e| ScheduleError::Store(Box::new(e)))?;

        let mut slots = Vec::new();
        let mut skipped_rules = Vec::new();
        for rule in &rules {
            match expand_with_config(rule, window.start, window.end, &self.config) {
                Ok(occurrences) => slots.extend(occurrences),
                Err(e) if e.is_rule_defect() => {
                    warn!(
                        rule_id = ?rule.id,
                        expert_id,
                        error = %e,
                        "skipping malformed schedule rule"
                    );
                    skipped_rules.push(SkippedRule {
                        rule_id: rule.id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        slots.sort_by_key(|slot| (slot.start, slot.rule_id));

        let longest = slots
            .iter()
            .map(|slot| slot.end() - slot.start)
            .max()
            .unwrap_or_else(Duration::zero);
        let booking_window = Window {
            start: window.start,
            end: window.end + longest,
        };
        let booked = self
            .bookings
            .fetch_booked_intervals(expert_id, &booking_window)
            .map_err(|e| ScheduleError::Store(Box::new(e)))?;

        let open = available_occurrences(&slots, &booked);
        debug!(
            expert_id,
            generated = slots.len(),
            open = open.len(),
            booked = booked.len(),
            "computed bookable slots"
        );

        Ok(BookableSlots {
            slots: open,
            skipped_rules,
        })
    }
}
