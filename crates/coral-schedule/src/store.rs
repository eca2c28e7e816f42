//! Read-side seams into the rule and booking stores.
//!
//! The scheduling core never writes. Callers hand it something that can
//! answer these two queries; [`InMemoryStore`] is the reference
//! implementation used by tests and the CLI.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::interval::{overlaps, BlockingInterval, Window};
use crate::rule::{ExpertId, ScheduleRule};

/// Source of an expert's persisted schedule rules.
pub trait RuleSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All active rules owned by `expert_id`.
    fn fetch_active_rules_for_expert(
        &self,
        expert_id: ExpertId,
    ) -> Result<Vec<ScheduleRule>, Self::Error>;
}

/// Source of booked calls and manual schedule exceptions.
pub trait BookingSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Booked calls and exceptions for `expert_id` overlapping `window`.
    fn fetch_booked_intervals(
        &self,
        expert_id: ExpertId,
        window: &Window,
    ) -> Result<Vec<BlockingInterval>, Self::Error>;
}

/// An expert's blocking interval as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertBooking {
    pub expert_id: ExpertId,
    #[serde(flatten)]
    pub interval: BlockingInterval,
}

/// Rules and bookings held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    #[serde(default)]
    pub rules: Vec<ScheduleRule>,
    #[serde(default)]
    pub bookings: Vec<ExpertBooking>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: ScheduleRule) {
        self.rules.push(rule);
    }

    pub fn add_booking(&mut self, expert_id: ExpertId, interval: BlockingInterval) {
        self.bookings.push(ExpertBooking {
            expert_id,
            interval,
        });
    }
}

impl RuleSource for InMemoryStore {
    type Error = Infallible;

    fn fetch_active_rules_for_expert(
        &self,
        expert_id: ExpertId,
    ) -> Result<Vec<ScheduleRule>, Self::Error> {
        Ok(self
            .rules
            .iter()
            .filter(|rule| rule.expert_id == expert_id && rule.active)
            .cloned()
            .collect())
    }
}

impl BookingSource for InMemoryStore {
    type Error = Infallible;

    fn fetch_booked_intervals(
        &self,
        expert_id: ExpertId,
        window: &Window,
    ) -> Result<Vec<BlockingInterval>, Self::Error> {
        Ok(self
            .bookings
            .iter()
            .filter(|booking| booking.expert_id == expert_id && overlaps(&booking.interval, window))
            .map(|booking| booking.interval)
            .collect())
    }
}
