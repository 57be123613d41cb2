use serde::{Deserialize, Serialize};

use crate::persistence::StoreResult;

/// Day names of the six-day school grid, day_id 1 through 6.
pub const DAY_NAMES: [&str; 6] = ["Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub id: i64,
    pub name: String,
}

/// Half-day a teaching slot belongs to. The lunch break carries no period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "morning" => Some(Self::Morning),
            "afternoon" => Some(Self::Afternoon),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: i64,
    pub start_time: String,
    pub end_time: String,
    pub is_lunch_break: bool,
    pub period: Option<Period>,
}

/// A class as registered by the administrative layer; the core only ever
/// references it by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRoom {
    pub id: i64,
    pub name: String,
    pub level: String,
    pub school_year: String,
}

/// One cell of the fixed weekly template: the same class sits in the same
/// slot every non-excluded week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub day_id: i64,
    pub time_slot_id: i64,
    pub class_id: i64,
}

/// Read side consumed by the distributor. The grid is week-independent;
/// the distributor maps day ids to dates itself.
pub trait TimetableStore {
    fn days(&self) -> StoreResult<Vec<Day>>;

    fn time_slots(&self) -> StoreResult<Vec<TimeSlot>>;

    /// Entries ordered by (day_id, time_slot_id) ascending.
    fn entries(&self) -> StoreResult<Vec<TimetableEntry>>;

    fn is_lunch_break(&self, time_slot_id: i64) -> StoreResult<bool> {
        Ok(self
            .time_slots()?
            .iter()
            .any(|slot| slot.id == time_slot_id && slot.is_lunch_break))
    }
}

/// The standard nine-slot day: four morning hours, four afternoon hours,
/// and the 12:30-14:30 lunch break.
pub fn default_time_slots() -> Vec<TimeSlot> {
    let spec: [(&str, &str, bool, Option<Period>); 9] = [
        ("08:30", "09:30", false, Some(Period::Morning)),
        ("09:30", "10:30", false, Some(Period::Morning)),
        ("10:30", "11:30", false, Some(Period::Morning)),
        ("11:30", "12:30", false, Some(Period::Morning)),
        ("14:30", "15:30", false, Some(Period::Afternoon)),
        ("15:30", "16:30", false, Some(Period::Afternoon)),
        ("16:30", "17:30", false, Some(Period::Afternoon)),
        ("17:30", "18:30", false, Some(Period::Afternoon)),
        ("12:30", "14:30", true, None),
    ];
    spec.iter()
        .enumerate()
        .map(|(idx, (start, end, lunch, period))| TimeSlot {
            id: idx as i64 + 1,
            start_time: (*start).to_string(),
            end_time: (*end).to_string(),
            is_lunch_break: *lunch,
            period: *period,
        })
        .collect()
}

/// In-memory weekly timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTimetable {
    days: Vec<Day>,
    time_slots: Vec<TimeSlot>,
    entries: Vec<TimetableEntry>,
}

impl WeeklyTimetable {
    pub fn new(days: Vec<Day>, time_slots: Vec<TimeSlot>) -> Self {
        Self {
            days,
            time_slots,
            entries: Vec::new(),
        }
    }

    /// Empty timetable over the standard six-day, nine-slot grid.
    pub fn with_default_grid() -> Self {
        let days = DAY_NAMES
            .iter()
            .enumerate()
            .map(|(idx, name)| Day {
                id: idx as i64 + 1,
                name: (*name).to_string(),
            })
            .collect();
        Self::new(days, default_time_slots())
    }

    pub fn add_entry(&mut self, day_id: i64, time_slot_id: i64, class_id: i64) {
        self.entries.push(TimetableEntry {
            day_id,
            time_slot_id,
            class_id,
        });
        self.entries
            .sort_by_key(|entry| (entry.day_id, entry.time_slot_id));
    }

    pub fn entry_list(&self) -> &[TimetableEntry] {
        &self.entries
    }
}

impl Default for WeeklyTimetable {
    fn default() -> Self {
        Self::with_default_grid()
    }
}

impl TimetableStore for WeeklyTimetable {
    fn days(&self) -> StoreResult<Vec<Day>> {
        Ok(self.days.clone())
    }

    fn time_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        Ok(self.time_slots.clone())
    }

    fn entries(&self) -> StoreResult<Vec<TimetableEntry>> {
        Ok(self.entries.clone())
    }
}
