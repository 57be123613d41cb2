use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::persistence::StoreResult;

/// Kind of calendar exception. When several apply to the same date the
/// priority is vacation, then public holiday, then absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionKind {
    Vacation,
    Holiday,
    Absence,
}

impl ExceptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacation => "vacation",
            Self::Holiday => "holiday",
            Self::Absence => "absence",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified date: the exception kind and its display label (a vacation
/// name, a holiday name, or an absence motif).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayException {
    pub kind: ExceptionKind,
    pub label: String,
}

/// Read side consumed by the distributor: answers whether a date is
/// excluded from teaching and why.
pub trait ExceptionOracle {
    fn classify(&self, date: NaiveDate) -> StoreResult<Option<DayException>>;
}

/// Vacation period, inclusive on both bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl VacationRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether the range overlaps the closed interval [start, end].
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start <= end && start <= self.end
    }
}

/// In-memory exception calendar: vacation ranges, public holidays and
/// recorded absence days.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExceptionCalendar {
    vacations: Vec<VacationRange>,
    holidays: BTreeMap<NaiveDate, String>,
    absences: BTreeMap<NaiveDate, String>,
}

impl ExceptionCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vacation(&mut self, start: NaiveDate, end: NaiveDate, label: impl Into<String>) {
        self.vacations.push(VacationRange {
            start,
            end,
            label: label.into(),
        });
    }

    pub fn add_holiday(&mut self, date: NaiveDate, label: impl Into<String>) {
        self.holidays.insert(date, label.into());
    }

    pub fn add_absence(&mut self, date: NaiveDate, motif: impl Into<String>) {
        self.absences.insert(date, motif.into());
    }

    /// Label of the first vacation overlapping [start, end], used to
    /// annotate week listings.
    pub fn vacation_overlapping(&self, start: NaiveDate, end: NaiveDate) -> Option<&str> {
        self.vacations
            .iter()
            .find(|vacation| vacation.overlaps(start, end))
            .map(|vacation| vacation.label.as_str())
    }

    /// Classify a date. Vacation ranges are checked first, in insertion
    /// order, then exact-date holidays, then absences.
    pub fn classify_date(&self, date: NaiveDate) -> Option<DayException> {
        if let Some(vacation) = self.vacations.iter().find(|v| v.contains(date)) {
            return Some(DayException {
                kind: ExceptionKind::Vacation,
                label: vacation.label.clone(),
            });
        }
        if let Some(label) = self.holidays.get(&date) {
            return Some(DayException {
                kind: ExceptionKind::Holiday,
                label: label.clone(),
            });
        }
        if let Some(motif) = self.absences.get(&date) {
            return Some(DayException {
                kind: ExceptionKind::Absence,
                label: motif.clone(),
            });
        }
        None
    }
}

impl ExceptionOracle for ExceptionCalendar {
    fn classify(&self, date: NaiveDate) -> StoreResult<Option<DayException>> {
        Ok(self.classify_date(date))
    }
}
