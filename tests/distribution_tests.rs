use chrono::NaiveDate;
use rota_tool::calendar::ExceptionCalendar;
use rota_tool::curriculum::{Curriculum, CurriculumItem};
use rota_tool::distribution::{Assignment, RotationDistributor};
use rota_tool::ledger::{MemoryLedger, ProgressLedger, ProgressRecord};
use rota_tool::timetable::WeeklyTimetable;
use rota_tool::week::WeekIdentifier;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn curriculum(values: &[&str]) -> Curriculum {
    Curriculum::from_items(
        values
            .iter()
            .enumerate()
            .map(|(idx, value)| CurriculumItem {
                id: idx as i64 + 1,
                value: (*value).to_string(),
            })
            .collect(),
    )
}

// Week 5 of 2025: Monday 2025-01-27 through Saturday 2025-02-01.
fn week_five() -> WeekIdentifier {
    let week = WeekIdentifier::containing(date(2025, 1, 29));
    assert_eq!(week.number, 5);
    week
}

#[test]
fn fresh_class_starts_at_first_item() {
    // Scenario A: empty ledger, one slot -> first curriculum item.
    let curriculum = curriculum(&["L1", "L2", "L3"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week_five()).unwrap();

    let slots = distribution.slots_for(10);
    assert_eq!(slots.len(), 1);
    assert_eq!((slots[0].day_id, slots[0].time_slot_id), (1, 1));
    assert_eq!(slots[0].assignment, Assignment::Course(1));
}

#[test]
fn ledger_cursor_resumes_rotation() {
    // Scenario B: cursor at item 1 -> next assignment is item 2.
    let curriculum = curriculum(&["L1", "L2", "L3"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();
    ledger
        .save(&ProgressRecord {
            class_id: 10,
            last_course_id: 1,
            last_week: 4,
            year: 2025,
        })
        .unwrap();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week_five()).unwrap();

    assert_eq!(distribution.slots_for(10)[0].assignment, Assignment::Course(2));
}

#[test]
fn exhausted_curriculum_yields_marker_not_error() {
    // Scenario C: cursor already at the last item.
    let curriculum = curriculum(&["L1", "L2"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();
    ledger
        .save(&ProgressRecord {
            class_id: 10,
            last_course_id: 2,
            last_week: 4,
            year: 2025,
        })
        .unwrap();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week_five()).unwrap();

    assert!(distribution.slots_for(10)[0].assignment.is_exhausted());

    // The marker is exempt from validation.
    let (ok, errors) = distributor.validate_distribution(&distribution);
    assert!(ok, "unexpected errors: {errors:?}");

    // No ledger record derives from a fully exhausted week.
    assert!(distribution.progress_records(&week_five()).is_empty());
}

#[test]
fn vacation_day_receives_no_assignments() {
    // Scenario D: class 20 only teaches on day 3, which falls in a
    // vacation; its cursor must not move.
    let curriculum = curriculum(&["L1", "L2", "L3"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(3, 1, 20);
    let mut calendar = ExceptionCalendar::new();
    let week = week_five();
    calendar.add_vacation(week.date_for_day(3), week.date_for_day(3), "Noël");
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week).unwrap();

    // The class is known to the result but received nothing.
    assert!(distribution.classes().any(|id| id == 20));
    assert!(distribution.slots_for(20).is_empty());
    assert!(distribution.progress_records(&week).is_empty());
    assert_eq!(ledger.last_known_course_id(20, 6, 2025).unwrap(), 0);
}

#[test]
fn shared_slot_assigns_both_and_validator_flags_it() {
    // Scenario E: two classes on the same cell is malformed data; both
    // still get a course, the validator reports the duplicate.
    let curriculum = curriculum(&["L1", "L2", "L3"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    timetable.add_entry(1, 1, 11);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week_five()).unwrap();

    assert_eq!(distribution.slots_for(10)[0].assignment, Assignment::Course(1));
    assert_eq!(distribution.slots_for(11)[0].assignment, Assignment::Course(1));

    let (ok, errors) = distributor.validate_distribution(&distribution);
    assert!(!ok);
    assert!(errors.iter().any(|e| e.contains("day 1, time slot 1")));
}

#[test]
fn distribute_is_deterministic_without_ledger_writes() {
    let curriculum = curriculum(&["L1", "L2", "L3", "L4"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    timetable.add_entry(2, 3, 10);
    timetable.add_entry(4, 5, 11);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let first = distributor.distribute(&week_five()).unwrap();
    let second = distributor.distribute(&week_five()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn rotation_advances_one_item_per_saved_week() {
    // One appearance per week over consecutive weeks: indexes strictly
    // increase, then the marker once the curriculum is spent.
    let curriculum = curriculum(&["L1", "L2", "L3"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();
    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);

    let mut assigned = Vec::new();
    // Mondays of weeks 2..=6 of 2025.
    for monday in [6, 13, 20, 27] {
        let week = WeekIdentifier::containing(date(2025, 1, monday));
        let distribution = distributor.distribute(&week).unwrap();
        assigned.push(distribution.slots_for(10)[0].assignment);
        ledger
            .save_week(&distribution.progress_records(&week))
            .unwrap();
    }
    let week = WeekIdentifier::containing(date(2025, 2, 3));
    let distribution = distributor.distribute(&week).unwrap();
    assigned.push(distribution.slots_for(10)[0].assignment);

    assert_eq!(
        assigned,
        vec![
            Assignment::Course(1),
            Assignment::Course(2),
            Assignment::Course(3),
            Assignment::Exhausted,
            Assignment::Exhausted,
        ]
    );
}

#[test]
fn exhaustion_is_terminal_within_a_call() {
    // Three slots, one curriculum item: first slot gets it, the rest get
    // the marker and the index never moves backwards.
    let curriculum = curriculum(&["L1"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    timetable.add_entry(2, 2, 10);
    timetable.add_entry(3, 3, 10);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week_five()).unwrap();

    let assignments: Vec<_> = distribution
        .slots_for(10)
        .iter()
        .map(|slot| slot.assignment)
        .collect();
    assert_eq!(
        assignments,
        vec![
            Assignment::Course(1),
            Assignment::Exhausted,
            Assignment::Exhausted,
        ]
    );
}

#[test]
fn excluded_day_skips_only_that_day() {
    let curriculum = curriculum(&["L1", "L2", "L3"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    timetable.add_entry(3, 1, 10);
    let mut calendar = ExceptionCalendar::new();
    let week = week_five();
    calendar.add_holiday(week.date_for_day(1), "Jour férié");
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week).unwrap();

    let slots = distribution.slots_for(10);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].day_id, 3);
    assert_eq!(slots[0].assignment, Assignment::Course(1));
}

#[test]
fn lunch_slot_is_never_assigned() {
    let curriculum = curriculum(&["L1", "L2"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    // Slot 9 is the lunch break in the default grid.
    timetable.add_entry(1, 9, 10);
    timetable.add_entry(1, 2, 10);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week_five()).unwrap();

    let slots = distribution.slots_for(10);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].time_slot_id, 2);
}

#[test]
fn entry_outside_the_grid_is_skipped() {
    let curriculum = curriculum(&["L1", "L2"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(99, 1, 30);
    timetable.add_entry(2, 1, 10);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let distribution = distributor.distribute(&week_five()).unwrap();

    // Class 30's entry references no known day: it stays empty, the rest
    // of the week distributes normally.
    assert!(distribution.slots_for(30).is_empty());
    assert_eq!(distribution.slots_for(10).len(), 1);
    let (ok, errors) = distributor.validate_distribution(&distribution);
    assert!(ok, "unexpected errors: {errors:?}");
}

#[test]
fn multiple_weekly_appearances_advance_within_the_week() {
    // A class seen three times in one week consumes three consecutive
    // items, and the derived ledger record keeps the furthest one.
    let curriculum = curriculum(&["L1", "L2", "L3", "L4", "L5"]);
    let mut timetable = WeeklyTimetable::with_default_grid();
    timetable.add_entry(1, 1, 10);
    timetable.add_entry(1, 2, 10);
    timetable.add_entry(4, 1, 10);
    let calendar = ExceptionCalendar::new();
    let ledger = MemoryLedger::new();

    let distributor = RotationDistributor::new(&curriculum, &timetable, &calendar, &ledger);
    let week = week_five();
    let distribution = distributor.distribute(&week).unwrap();

    let assignments: Vec<_> = distribution
        .slots_for(10)
        .iter()
        .map(|slot| slot.assignment)
        .collect();
    assert_eq!(
        assignments,
        vec![
            Assignment::Course(1),
            Assignment::Course(2),
            Assignment::Course(3),
        ]
    );

    let records = distribution.progress_records(&week);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].last_course_id, 3);
}
