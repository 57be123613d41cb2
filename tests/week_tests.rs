use chrono::{Datelike, NaiveDate, Weekday};
use rota_tool::week::{SchoolYear, WeekIdentifier};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn school_year_runs_september_to_july() {
    let year = SchoolYear::containing(date(2024, 10, 15));
    assert_eq!(year.start, date(2024, 9, 1));
    assert_eq!(year.end, date(2025, 7, 7));

    // Before September the running year started the previous September.
    let year = SchoolYear::containing(date(2025, 3, 2));
    assert_eq!(year.start, date(2024, 9, 1));
    assert_eq!(year.end, date(2025, 7, 7));
}

#[test]
fn school_year_weeks_are_consecutive_mondays() {
    let year = SchoolYear::starting(2024);
    let weeks = year.weeks();
    assert!(!weeks.is_empty());
    for week in &weeks {
        assert_eq!(week.start.weekday(), Weekday::Mon);
        assert_eq!(week.end.weekday(), Weekday::Sat);
    }
    for pair in weeks.windows(2) {
        assert_eq!(pair[1].start - pair[0].start, chrono::Duration::days(7));
    }
    // The window spans the calendar-year boundary, so week 1 shows up.
    assert!(weeks.iter().any(|week| week.number == 1));
}

#[test]
fn date_for_day_maps_grid_days_to_dates() {
    let week = WeekIdentifier::containing(date(2025, 3, 17));
    assert_eq!(week.date_for_day(1), date(2025, 3, 17));
    assert_eq!(week.date_for_day(3), date(2025, 3, 19));
    assert_eq!(week.date_for_day(6), date(2025, 3, 22));
}

#[test]
fn label_formats_french_week_text() {
    let week = WeekIdentifier::containing(date(2025, 3, 17));
    assert_eq!(
        week.label(""),
        "Semaine 12 - du 17/03/2025 au 22/03/2025"
    );
    assert_eq!(
        week.label(" (Vacances de printemps)"),
        "Semaine 12 - du 17/03/2025 au 22/03/2025 (Vacances de printemps)"
    );
}
