use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A school week, built once from structured data by the week-selection
/// layer. Display text is derived from it and never parsed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekIdentifier {
    /// ISO week number of the Monday.
    pub number: u32,
    /// Monday of the week.
    pub start: NaiveDate,
    /// Saturday of the week (the grid runs Monday through Saturday).
    pub end: NaiveDate,
}

impl WeekIdentifier {
    /// The week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        let end = start + Duration::days(5);
        Self {
            number: start.iso_week().week(),
            start,
            end,
        }
    }

    /// Calendar year the week's ledger records are keyed by. Week 1 crosses
    /// into the new calendar year, so it belongs to the end date's year;
    /// every other week belongs to its start date's year.
    pub fn primary_year(&self) -> i32 {
        if self.number == 1 {
            self.end.year()
        } else {
            self.start.year()
        }
    }

    /// Date of a grid day within this week (1 = Lundi .. 6 = Samedi).
    pub fn date_for_day(&self, day_id: i64) -> NaiveDate {
        self.start + Duration::days(day_id - 1)
    }

    /// Display label, e.g. "Semaine 12 - du 17/03/2025 au 22/03/2025".
    /// `suffix` carries an optional vacation annotation such as
    /// " (Vacances de Noël)".
    pub fn label(&self, suffix: &str) -> String {
        format!(
            "Semaine {} - du {} au {}{}",
            self.number,
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y"),
            suffix
        )
    }
}

/// The academic year window: September 1st to July 7th of the following
/// calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolYear {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SchoolYear {
    /// The school year `today` falls in. Before September the running year
    /// is the one that started the previous September.
    pub fn containing(today: NaiveDate) -> Self {
        let start_year = if today.month() < 9 {
            today.year() - 1
        } else {
            today.year()
        };
        Self::starting(start_year)
    }

    /// The school year starting in September of `start_year`.
    pub fn starting(start_year: i32) -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(start_year, 9, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(start_year + 1, 7, 7).unwrap(),
        }
    }

    /// Every week of the window, in order. Weeks are anchored on their
    /// Monday, so the first and last entries may extend slightly past the
    /// window bounds.
    pub fn weeks(&self) -> Vec<WeekIdentifier> {
        let mut weeks = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            weeks.push(WeekIdentifier::containing(current));
            current = current + Duration::days(7);
        }
        weeks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_containing_anchors_on_monday() {
        // 2025-03-19 is a Wednesday
        let week = WeekIdentifier::containing(NaiveDate::from_ymd_opt(2025, 3, 19).unwrap());
        assert_eq!(week.start, NaiveDate::from_ymd_opt(2025, 3, 17).unwrap());
        assert_eq!(week.end, NaiveDate::from_ymd_opt(2025, 3, 22).unwrap());
        assert_eq!(week.number, 12);
    }

    #[test]
    fn primary_year_uses_end_year_for_week_one() {
        // Week 1 of 2025 starts Monday 2024-12-30
        let week = WeekIdentifier::containing(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
        assert_eq!(week.number, 1);
        assert_eq!(week.primary_year(), 2025);

        let week = WeekIdentifier::containing(NaiveDate::from_ymd_opt(2024, 12, 23).unwrap());
        assert_eq!(week.number, 52);
        assert_eq!(week.primary_year(), 2024);
    }
}
