//! # coral-schedule
//!
//! Recurring availability for Coral experts: expand schedule rules into
//! concrete bookable slots and detect collisions with the expert's other rules,
//! booked calls and blocked-out exceptions.
//!
//! Everything here is a pure function of its inputs. Stores are reached only
//! through the [`store::RuleSource`] and [`store::BookingSource`] seams.
//!
//! ## Modules
//!
//! - [`rule`] — `ScheduleRule` data and invariant checks
//! - [`cadence`] / [`cron`] — recurrence descriptors (cron or RRULE)
//! - [`expander`] — rule + window → ordered occurrences
//! - [`interval`] — half-open interval types and the overlap test
//! - [`conflict`] — candidate vs existing conflict detection
//! - [`availability`] — drop slots that are already booked
//! - [`checker`] — store-backed entry points
//! - [`config`] — expansion limits and default horizon
//! - [`error`] — Error types

pub mod availability;
pub mod cadence;
pub mod checker;
pub mod config;
pub mod conflict;
pub mod cron;
pub mod error;
pub mod expander;
pub mod interval;
pub mod rule;
pub mod store;

pub use availability::available_occurrences;
pub use checker::{BookableSlots, ScheduleChecker};
pub use config::ExpansionConfig;
pub use conflict::{
    check_rule, find_conflicts, has_conflict, rule_conflicts_with_existing_rules, Conflict,
    ConflictReport, SkippedRule,
};
pub use error::ScheduleError;
pub use expander::{expand, expand_with_config};
pub use interval::{
    overlaps, BlockingInterval, BlockingKind, ScheduleOccurrence, TimeInterval, Window,
};
pub use rule::{ExpertId, MoneyUnit, RuleId, ScheduleRule};
pub use store::{BookingSource, InMemoryStore, RuleSource};
