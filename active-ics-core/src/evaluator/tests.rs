use super::*;
use crate::{Frequency, RecurrenceRule};
use chrono::TimeZone;
use chrono_tz::Europe::London;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Instant {
    London.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn active(query: Instant, events: &[Event]) -> Vec<String> {
    ActiveEventEvaluator::new()
        .active_events(&query, events)
        .expect("evaluation failed")
        .into_iter()
        .collect()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

#[test]
fn simple_events_use_half_open_intervals() {
    let events = vec![
        Event::new("Morning", "m", at(2022, 5, 3, 9, 0), at(2022, 5, 3, 10, 0)),
        Event::new("Late morning", "l", at(2022, 5, 3, 10, 0), at(2022, 5, 3, 11, 0)),
    ];

    assert_eq!(active(at(2022, 5, 3, 9, 0), &events), names(&["Morning"]));
    assert_eq!(active(at(2022, 5, 3, 10, 0), &events), names(&["Late morning"]));
    assert!(active(at(2022, 5, 3, 11, 0), &events).is_empty());
    assert!(active(at(2022, 5, 3, 8, 59), &events).is_empty());
}

#[test]
fn duplicate_and_missing_names_are_collapsed() {
    let mut unnamed = Event::new("", "u1", at(2022, 5, 3, 9, 0), at(2022, 5, 3, 10, 0));
    unnamed.name = None;
    let events = vec![
        Event::new("Focus", "f1", at(2022, 5, 3, 9, 0), at(2022, 5, 3, 10, 0)),
        Event::new("Focus", "f2", at(2022, 5, 3, 8, 0), at(2022, 5, 3, 12, 0)),
        Event::new("", "e", at(2022, 5, 3, 9, 0), at(2022, 5, 3, 10, 0)),
        unnamed,
    ];

    assert_eq!(active(at(2022, 5, 3, 9, 30), &events), names(&["Focus"]));
}

#[test]
fn override_wins_over_the_rule_even_when_moved_away() {
    let rule = RecurrenceRule::new(Frequency::Weekly).with_by_day(["MO", "WE", "FR", "SU"]);
    let events = vec![
        Event::new("Weekly Test", "w", at(2022, 3, 16, 10, 0), at(2022, 3, 16, 13, 0))
            .with_rule(rule),
        Event::new("Weekly Test", "w", at(2022, 3, 20, 16, 0), at(2022, 3, 20, 19, 0))
            .with_recurrence_id(at(2022, 3, 20, 10, 0)),
    ];

    assert!(active(at(2022, 3, 20, 10, 0), &events).is_empty());
    assert!(active(at(2022, 3, 20, 12, 59), &events).is_empty());
    assert_eq!(active(at(2022, 3, 20, 16, 0), &events), names(&["Weekly Test"]));
    assert!(active(at(2022, 3, 20, 19, 0), &events).is_empty());
    // neighbouring occurrences are untouched
    assert_eq!(active(at(2022, 3, 21, 10, 0), &events), names(&["Weekly Test"]));
}

#[test]
fn override_name_is_reported() {
    let events = vec![
        Event::new("Standup", "s", at(2022, 6, 6, 9, 0), at(2022, 6, 6, 9, 15))
            .with_rule(RecurrenceRule::new(Frequency::Daily)),
        Event::new("Standup (demo day)", "s", at(2022, 6, 8, 9, 0), at(2022, 6, 8, 10, 0))
            .with_recurrence_id(at(2022, 6, 8, 9, 0)),
    ];

    assert_eq!(
        active(at(2022, 6, 8, 9, 30), &events),
        names(&["Standup (demo day)"])
    );
    assert_eq!(active(at(2022, 6, 9, 9, 0), &events), names(&["Standup"]));
}

#[test]
fn excluded_dates_are_never_active() {
    let events = vec![
        Event::new("Gym", "g", at(2022, 1, 3, 18, 0), at(2022, 1, 3, 19, 0))
            .with_rule(RecurrenceRule::new(Frequency::Daily))
            .with_excluding_dates([at(2022, 1, 5, 18, 0)]),
    ];

    assert_eq!(active(at(2022, 1, 4, 18, 30), &events), names(&["Gym"]));
    assert!(active(at(2022, 1, 5, 18, 30), &events).is_empty());
    assert_eq!(active(at(2022, 1, 6, 18, 30), &events), names(&["Gym"]));
}

#[test]
fn count_includes_excluded_candidates() {
    let events = vec![
        Event::new("Course", "c", at(2022, 2, 1, 14, 0), at(2022, 2, 1, 15, 0))
            .with_rule(RecurrenceRule::new(Frequency::Daily).with_count(5))
            .with_excluding_dates([at(2022, 2, 2, 14, 0)]),
    ];

    assert_eq!(active(at(2022, 2, 5, 14, 0), &events), names(&["Course"]));
    // the excluded 2nd still used up one of the five
    assert!(active(at(2022, 2, 6, 14, 0), &events).is_empty());
}

#[test]
fn yearly_with_moved_and_deleted_years() {
    let events = vec![
        Event::new("Anniversary", "y", at(2020, 6, 1, 12, 0), at(2020, 6, 1, 14, 0))
            .with_rule(RecurrenceRule::new(Frequency::Yearly))
            .with_excluding_dates([at(2022, 6, 1, 12, 0)]),
        Event::new("Anniversary", "y", at(2021, 6, 2, 12, 0), at(2021, 6, 2, 14, 0))
            .with_recurrence_id(at(2021, 6, 1, 12, 0)),
    ];

    assert_eq!(active(at(2020, 6, 1, 12, 0), &events), names(&["Anniversary"]));
    assert!(active(at(2021, 6, 1, 12, 0), &events).is_empty());
    assert_eq!(active(at(2021, 6, 2, 13, 59), &events), names(&["Anniversary"]));
    assert!(active(at(2022, 6, 1, 12, 0), &events).is_empty());
    assert!(active(at(2022, 6, 1, 13, 0), &events).is_empty());
    assert_eq!(active(at(2023, 6, 1, 12, 0), &events), names(&["Anniversary"]));
    assert_eq!(active(at(2040, 6, 1, 13, 30), &events), names(&["Anniversary"]));
    assert!(active(at(2040, 6, 2, 12, 0), &events).is_empty());
}

#[test]
fn recurrence_dates_add_occurrences() {
    let events = vec![
        Event::new("Review", "r", at(2022, 9, 5, 15, 0), at(2022, 9, 5, 16, 0))
            .with_rule(RecurrenceRule::new(Frequency::Weekly).with_count(2))
            .with_recurrence_dates([at(2022, 9, 7, 11, 0), at(2022, 9, 9, 11, 0)]),
        Event::new("Review", "r", at(2022, 9, 9, 17, 0), at(2022, 9, 9, 18, 0))
            .with_recurrence_id(at(2022, 9, 9, 11, 0)),
    ];

    assert_eq!(active(at(2022, 9, 7, 11, 30), &events), names(&["Review"]));
    assert!(active(at(2022, 9, 7, 12, 0), &events).is_empty());
    // the second RDATE was moved by an override
    assert!(active(at(2022, 9, 9, 11, 30), &events).is_empty());
    assert_eq!(active(at(2022, 9, 9, 17, 30), &events), names(&["Review"]));
    assert_eq!(active(at(2022, 9, 12, 15, 0), &events), names(&["Review"]));
    assert!(active(at(2022, 9, 19, 15, 0), &events).is_empty());
}

#[test]
fn first_containing_candidate_decides() {
    // 30 hour occurrences overlap their successor; an excluded first
    // candidate hides the overlapping start of the next one
    let events = vec![
        Event::new("Shift", "s", at(2022, 4, 4, 8, 0), at(2022, 4, 5, 14, 0))
            .with_rule(RecurrenceRule::new(Frequency::Daily))
            .with_excluding_dates([at(2022, 4, 4, 8, 0)]),
    ];

    assert!(active(at(2022, 4, 5, 9, 0), &events).is_empty());
    assert_eq!(active(at(2022, 4, 5, 15, 0), &events), names(&["Shift"]));
}

#[test]
fn query_before_first_occurrence_is_inactive() {
    let events = vec![
        Event::new("Later", "l", at(2030, 1, 1, 9, 0), at(2030, 1, 1, 10, 0))
            .with_rule(RecurrenceRule::new(Frequency::Monthly)),
    ];
    assert!(active(at(2029, 12, 31, 9, 30), &events).is_empty());
}

#[test]
fn rule_errors_abort_the_evaluation() {
    let events = vec![
        Event::new("Fine", "a", at(2022, 1, 1, 9, 0), at(2022, 1, 1, 10, 0)),
        Event::new("Broken", "b", at(2022, 1, 11, 9, 0), at(2022, 1, 11, 10, 0))
            .with_rule(RecurrenceRule::new(Frequency::Monthly).with_by_day(["SECONDTU"])),
    ];

    let result = ActiveEventEvaluator::new().active_events(&at(2022, 1, 1, 9, 30), &events);
    assert!(matches!(result, Err(Error::InvalidRuleFormat(_))));
}

#[test]
fn ambiguous_families_abort_the_evaluation() {
    let rule = RecurrenceRule::new(Frequency::Daily);
    let events = vec![
        Event::new("A", "dup", at(2022, 1, 1, 9, 0), at(2022, 1, 1, 10, 0)).with_rule(rule.clone()),
        Event::new("B", "dup", at(2022, 1, 2, 9, 0), at(2022, 1, 2, 10, 0)).with_rule(rule),
    ];

    let result = ActiveEventEvaluator::new().active_events(&at(2022, 1, 1, 9, 30), &events);
    assert!(matches!(
        result,
        Err(Error::AmbiguousRecurrenceDefinition { .. })
    ));
}
