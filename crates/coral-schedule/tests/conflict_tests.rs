//! Tests for conflict detection between candidate slots, existing rules and
//! booked intervals.

use chrono::{DateTime, Duration, TimeZone, Utc};
use coral_schedule::{
    check_rule, find_conflicts, has_conflict, rule_conflicts_with_existing_rules, BlockingInterval,
    BlockingKind, ExpansionConfig, ScheduleError, ScheduleOccurrence, ScheduleRule, Window,
};

fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0).unwrap()
}

/// Helper to create a candidate slot on 2026-03-03 (a Tuesday).
fn slot(hour: u32, min: u32, duration_minutes: u32) -> ScheduleOccurrence {
    ScheduleOccurrence {
        rule_id: None,
        start: utc(2026, 3, 3, hour, min),
        duration_minutes,
        price_per_min: 0.0,
        price_unit: Default::default(),
    }
}

fn booked(hour: u32, min: u32, duration_minutes: u32) -> BlockingInterval {
    BlockingInterval::call(1, utc(2026, 3, 3, hour, min), duration_minutes)
}

/// Four weeks starting Sunday 2026-03-01.
fn march() -> Window {
    Window::new(utc(2026, 3, 1, 0, 0), utc(2026, 3, 29, 0, 0)).unwrap()
}

fn tuesday_rule(id: u64, cron: &str, duration_minutes: u32) -> ScheduleRule {
    ScheduleRule::new(7, utc(2026, 3, 1, 0, 0), cron, duration_minutes).with_id(id)
}

// ---------------------------------------------------------------------------
// Pairwise checks
// ---------------------------------------------------------------------------

#[test]
fn back_to_back_booking_is_not_a_conflict() {
    // [14:00,14:30) vs [14:30,15:00)
    assert!(!has_conflict(&[slot(14, 0, 30)], &[booked(14, 30, 30)]));
}

#[test]
fn partial_overlap_is_a_conflict() {
    // [14:00,14:30) vs [14:15,14:45)
    assert!(has_conflict(&[slot(14, 0, 30)], &[booked(14, 15, 30)]));
}

#[test]
fn empty_sides_never_conflict() {
    let none: [BlockingInterval; 0] = [];
    assert!(!has_conflict(&[slot(14, 0, 30)], &none));
    let no_slots: [ScheduleOccurrence; 0] = [];
    assert!(!has_conflict(&no_slots, &[booked(14, 0, 30)]));
}

#[test]
fn find_conflicts_collects_every_pair() {
    let candidates = vec![slot(9, 0, 60), slot(14, 0, 60)];
    let references = vec![booked(9, 30, 60), booked(13, 0, 60), booked(14, 45, 30)];

    let conflicts = find_conflicts(&candidates, &references);

    // 09:00-10:00 vs 09:30-10:30, 14:00-15:00 vs 14:45-15:15.
    // 13:00-14:00 only touches 14:00 and does not count.
    assert_eq!(conflicts.len(), 2);
    assert_eq!(conflicts[0].candidate, candidates[0]);
    assert_eq!(conflicts[0].reference, references[0]);
    assert_eq!(conflicts[0].overlap_minutes, 30);
    assert_eq!(conflicts[1].candidate, candidates[1]);
    assert_eq!(conflicts[1].reference, references[2]);
    assert_eq!(conflicts[1].overlap_minutes, 15);
}

#[test]
fn contained_slot_overlap_is_its_own_length() {
    let conflicts = find_conflicts(&[slot(9, 0, 180)], &[booked(10, 0, 60)]);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].overlap_minutes, 60);
}

// ---------------------------------------------------------------------------
// Rule against rules
// ---------------------------------------------------------------------------

#[test]
fn adjacent_weekly_rules_do_not_conflict() {
    let candidate = tuesday_rule(2, "0 14 * * 2", 30);
    let existing = vec![tuesday_rule(1, "30 14 * * 2", 30)];

    let conflict = rule_conflicts_with_existing_rules(&candidate, &existing, &march()).unwrap();

    assert!(!conflict);
}

#[test]
fn overlapping_weekly_rules_conflict() {
    let candidate = tuesday_rule(2, "0 14 * * 2", 30);
    let existing = vec![tuesday_rule(1, "15 14 * * 2", 30)];

    let conflict = rule_conflicts_with_existing_rules(&candidate, &existing, &march()).unwrap();

    assert!(conflict);
}

#[test]
fn rules_on_different_days_do_not_conflict() {
    let candidate = tuesday_rule(2, "0 14 * * 2", 60);
    let existing = vec![tuesday_rule(1, "0 14 * * 3", 60)];
    assert!(!rule_conflicts_with_existing_rules(&candidate, &existing, &march()).unwrap());
}

#[test]
fn daily_rule_conflicts_with_weekly_rule_at_same_time() {
    let candidate = tuesday_rule(2, "0 9 * * *", 60);
    let existing = vec![tuesday_rule(1, "FREQ=WEEKLY;BYDAY=FR;BYHOUR=9;BYMINUTE=30", 30)];
    assert!(rule_conflicts_with_existing_rules(&candidate, &existing, &march()).unwrap());
}

#[test]
fn inactive_and_own_previous_version_are_ignored() {
    let candidate = tuesday_rule(1, "0 14 * * 2", 60);
    let mut retired = tuesday_rule(3, "0 14 * * 2", 60);
    retired.deactivate();
    let previous_version = tuesday_rule(1, "15 14 * * 2", 60);

    let existing = [retired, previous_version];
    let conflict = rule_conflicts_with_existing_rules(&candidate, &existing, &march()).unwrap();

    assert!(!conflict);
}

#[test]
fn other_experts_rules_are_ignored() {
    let candidate = tuesday_rule(2, "0 14 * * 2", 60);
    let mut someone_else = tuesday_rule(1, "0 14 * * 2", 60);
    someone_else.expert_id = 99;
    assert!(!rule_conflicts_with_existing_rules(&candidate, &[someone_else], &march()).unwrap());
}

#[test]
fn invalid_candidate_fails_the_whole_check() {
    let candidate = tuesday_rule(2, "0 14 * * 2", 30).with_end(utc(2026, 2, 1, 0, 0));
    let existing = vec![tuesday_rule(1, "0 9 * * 2", 30)];

    let result = rule_conflicts_with_existing_rules(&candidate, &existing, &march());

    assert!(matches!(result, Err(ScheduleError::InvalidRule(_))));
}

#[test]
fn malformed_existing_rule_is_skipped_not_fatal() {
    let candidate = tuesday_rule(3, "0 14 * * 2", 30);
    let broken = tuesday_rule(1, "0 14 * * 2", 0);
    let fine = tuesday_rule(2, "0 9 * * 2", 30);

    assert!(
        !rule_conflicts_with_existing_rules(&candidate, &[broken.clone(), fine.clone()], &march())
            .unwrap()
    );

    let report = check_rule(
        &candidate,
        &[broken, fine],
        &[],
        &march(),
        &ExpansionConfig::default(),
    )
    .unwrap();

    assert!(!report.has_conflict());
    assert_eq!(report.skipped_rules.len(), 1);
    assert_eq!(report.skipped_rules[0].rule_id, Some(1));
}

#[test]
fn unparseable_existing_cadence_is_skipped() {
    let candidate = tuesday_rule(3, "0 14 * * 2", 30);
    let broken = tuesday_rule(1, "every tuesday", 30);

    let report =
        check_rule(&candidate, &[broken], &[], &march(), &ExpansionConfig::default()).unwrap();

    assert!(!report.has_conflict());
    assert_eq!(report.skipped_rules.len(), 1);
}

#[test]
fn dense_existing_rule_blocks_every_candidate_slot() {
    // Five-minute slots all day would exceed the occurrence cap over 60 days.
    let candidate = tuesday_rule(2, "0 9 * * 1", 30);
    let existing = vec![tuesday_rule(1, "*/5 * * * *", 5)];
    let window = Window::new(utc(2026, 3, 1, 0, 0), utc(2026, 4, 30, 0, 0)).unwrap();

    assert!(rule_conflicts_with_existing_rules(&candidate, &existing, &window).unwrap());

    let report =
        check_rule(&candidate, &existing, &[], &window, &ExpansionConfig::default()).unwrap();

    // Nine Mondays, each overlapping 09:00 through 09:25.
    assert_eq!(report.conflicts.len(), 9 * 6);
    assert!(report.skipped_rules.is_empty());
}

#[test]
fn existing_rule_over_cap_near_candidate_is_an_error() {
    let candidate = tuesday_rule(2, "0 9 * * *", 60);
    let existing = vec![tuesday_rule(1, "* * * * *", 1)];
    let window = Window::new(utc(2026, 3, 1, 0, 0), utc(2026, 3, 8, 0, 0)).unwrap();
    let config = ExpansionConfig {
        max_occurrences: 100,
        ..ExpansionConfig::default()
    };

    let result = check_rule(&candidate, &existing, &[], &window, &config);

    assert!(matches!(
        result,
        Err(ScheduleError::TooManyOccurrences { limit: 100 })
    ));
}

#[test]
fn existing_slot_straddling_window_start_conflicts() {
    // 08:45-09:45 starts before the window but covers the 09:00 candidate.
    let candidate = tuesday_rule(2, "0 9 * * *", 30);
    let existing = vec![tuesday_rule(1, "45 8 * * *", 60)];
    let window = Window::new(utc(2026, 3, 2, 9, 0), utc(2026, 3, 3, 8, 0)).unwrap();

    assert!(rule_conflicts_with_existing_rules(&candidate, &existing, &window).unwrap());

    let report =
        check_rule(&candidate, &existing, &[], &window, &ExpansionConfig::default()).unwrap();
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].reference.start, utc(2026, 3, 2, 8, 45));
    assert_eq!(report.conflicts[0].overlap_minutes, 30);
}

// ---------------------------------------------------------------------------
// Full check with bookings
// ---------------------------------------------------------------------------

#[test]
fn check_rule_reports_booked_call_and_rule_conflicts() {
    let candidate = tuesday_rule(5, "0 14 * * 2", 60);
    let existing = vec![tuesday_rule(1, "30 14 * * 2", 30)];
    // Tuesday 2026-03-10 14:45 call.
    let call = BlockingInterval::call(77, utc(2026, 3, 10, 14, 45), 30);

    let report = check_rule(
        &candidate,
        &existing,
        &[call],
        &march(),
        &ExpansionConfig::default(),
    )
    .unwrap();

    assert!(report.has_conflict());
    // Four Tuesdays conflict with rule 1, one with the call.
    let rule_hits = report
        .conflicts
        .iter()
        .filter(|c| c.reference.kind == BlockingKind::Rule { rule_id: Some(1) })
        .count();
    let call_hits: Vec<_> = report
        .conflicts
        .iter()
        .filter(|c| c.reference.kind == BlockingKind::Call { call_id: 77 })
        .collect();
    assert_eq!(rule_hits, 4);
    assert_eq!(call_hits.len(), 1);
    assert_eq!(call_hits[0].candidate.start, utc(2026, 3, 10, 14, 0));
    assert_eq!(call_hits[0].overlap_minutes, 15);
    assert!(report.skipped_rules.is_empty());
}

#[test]
fn booking_past_window_end_still_blocks_trailing_slot() {
    // Last candidate slot starts 23:30 on the window's final day and runs past it.
    let candidate = ScheduleRule::new(7, utc(2026, 3, 1, 0, 0), "30 23 * * *", 60);
    let window = Window::new(utc(2026, 3, 1, 0, 0), utc(2026, 3, 2, 0, 0)).unwrap();
    let call = BlockingInterval::call(1, utc(2026, 3, 2, 0, 0), 30);

    let report =
        check_rule(&candidate, &[], &[call], &window, &ExpansionConfig::default()).unwrap();

    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].overlap_minutes, 30);
    assert_eq!(
        report.conflicts[0].candidate.end(),
        utc(2026, 3, 1, 23, 30) + Duration::hours(1)
    );
}
