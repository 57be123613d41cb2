use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use chrono::NaiveDate;

use crate::calendar::{DayException, ExceptionOracle};
use crate::curriculum::{CurriculumItem, CurriculumStore};
use crate::ledger::{ProgressLedger, ProgressRecord};
use crate::persistence::StoreResult;
use crate::timetable::TimetableStore;
use crate::week::WeekIdentifier;

/// Text shown for a slot once the curriculum has been fully taught.
pub const NO_MORE_COURSES_TEXT: &str = "No more courses available";

/// What a (day, slot) cell received for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    /// A curriculum item id.
    Course(i64),
    /// Exhaustion marker: nothing left to assign. Terminal within a
    /// distribution call and never an error.
    Exhausted,
}

impl Assignment {
    pub fn course_id(&self) -> Option<i64> {
        match self {
            Self::Course(id) => Some(*id),
            Self::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Course(id) => write!(f, "{id}"),
            Self::Exhausted => write!(f, "{NO_MORE_COURSES_TEXT}"),
        }
    }
}

/// One assigned cell of a class's week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub day_id: i64,
    pub time_slot_id: i64,
    pub assignment: Assignment,
}

/// Result of distributing one week: per class, the cells it was assigned
/// in (day, slot) order. Classes present on the timetable that received
/// nothing keep an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution {
    per_class: BTreeMap<i64, Vec<SlotAssignment>>,
}

impl Distribution {
    pub fn record(&mut self, class_id: i64, slot: SlotAssignment) {
        self.per_class.entry(class_id).or_default().push(slot);
    }

    pub fn ensure_class(&mut self, class_id: i64) {
        self.per_class.entry(class_id).or_default();
    }

    pub fn classes(&self) -> impl Iterator<Item = i64> + '_ {
        self.per_class.keys().copied()
    }

    /// Assigned cells for a class, empty when it received nothing.
    pub fn slots_for(&self, class_id: i64) -> &[SlotAssignment] {
        self.per_class
            .get(&class_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &[SlotAssignment])> {
        self.per_class
            .iter()
            .map(|(&class_id, slots)| (class_id, slots.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.per_class.is_empty()
    }

    /// Ledger records to persist for this week: one per class that
    /// received at least one real course, carrying the maximum course id
    /// reached so a class that advanced several items resumes correctly.
    pub fn progress_records(&self, week: &WeekIdentifier) -> Vec<ProgressRecord> {
        let year = week.primary_year();
        self.per_class
            .iter()
            .filter_map(|(&class_id, slots)| {
                slots
                    .iter()
                    .filter_map(|slot| slot.assignment.course_id())
                    .max()
                    .map(|last_course_id| ProgressRecord {
                        class_id,
                        last_course_id,
                        last_week: week.number,
                        year,
                    })
            })
            .collect()
    }
}

/// The rotation core. All four store interfaces are injected; the
/// distributor keeps no state of its own between calls.
pub struct RotationDistributor<'a> {
    curriculum: &'a dyn CurriculumStore,
    timetable: &'a dyn TimetableStore,
    calendar: &'a dyn ExceptionOracle,
    ledger: &'a dyn ProgressLedger,
}

impl<'a> RotationDistributor<'a> {
    pub fn new(
        curriculum: &'a dyn CurriculumStore,
        timetable: &'a dyn TimetableStore,
        calendar: &'a dyn ExceptionOracle,
        ledger: &'a dyn ProgressLedger,
    ) -> Self {
        Self {
            curriculum,
            timetable,
            calendar,
            ledger,
        }
    }

    /// Assign the next curriculum items to every timetabled cell of the
    /// week that is not excluded by a calendar exception.
    ///
    /// Slots are processed in (day, slot) ascending order. A class's
    /// cursor advances once per assignment within the call; once the
    /// curriculum runs out the remaining cells receive the exhaustion
    /// marker. The ledger is only read here; persisting the outcome is
    /// the caller's decision.
    pub fn distribute(&self, week: &WeekIdentifier) -> StoreResult<Distribution> {
        let primary_year = week.primary_year();
        info!(week = week.number, year = primary_year, "distributing week");

        let items = self.curriculum.all_items()?;
        let valid_slots = self.valid_slots()?;
        let entries = self.timetable.entries()?;

        let mut by_slot: HashMap<(i64, i64), Vec<i64>> = HashMap::new();
        for entry in &entries {
            by_slot
                .entry((entry.day_id, entry.time_slot_id))
                .or_default()
                .push(entry.class_id);
        }

        let mut distribution = Distribution::default();
        for entry in &entries {
            distribution.ensure_class(entry.class_id);
        }
        let mut appearances: HashMap<i64, usize> = HashMap::new();

        for (day_id, time_slot_id) in valid_slots {
            let date = week.date_for_day(day_id);
            if let Some(exception) = self.classify(date) {
                debug!(
                    %date,
                    kind = exception.kind.as_str(),
                    label = %exception.label,
                    "day excluded"
                );
                continue;
            }

            let Some(scheduled) = by_slot.get(&(day_id, time_slot_id)) else {
                continue;
            };
            for &class_id in scheduled {
                let appearance = appearances.get(&class_id).copied().unwrap_or(0);
                let assignment =
                    self.next_course(class_id, week.number, appearance, primary_year, &items)?;
                if assignment.course_id().is_some() {
                    *appearances.entry(class_id).or_insert(0) += 1;
                }
                distribution.record(
                    class_id,
                    SlotAssignment {
                        day_id,
                        time_slot_id,
                        assignment,
                    },
                );
            }
        }

        Ok(distribution)
    }

    /// Advisory consistency check. Distribution still completes and can be
    /// displayed or saved whatever this reports.
    pub fn validate_distribution(&self, distribution: &Distribution) -> (bool, Vec<String>) {
        let mut errors = Vec::new();

        for (class_id, slots) in distribution.iter() {
            for slot in slots {
                if let Assignment::Course(course_id) = slot.assignment {
                    if course_id <= 0 {
                        errors.push(format!(
                            "Empty slot found for class {class_id} on day {}, time slot {}",
                            slot.day_id, slot.time_slot_id
                        ));
                    }
                }
            }
        }

        let mut assigned = HashSet::new();
        for (_, slots) in distribution.iter() {
            for slot in slots {
                if !assigned.insert((slot.day_id, slot.time_slot_id)) {
                    errors.push(format!(
                        "Duplicate assignment found for day {}, time slot {}",
                        slot.day_id, slot.time_slot_id
                    ));
                }
            }
        }

        (errors.is_empty(), errors)
    }

    /// All (day, slot) pairs of the weekly grid minus lunch slots, in
    /// ascending order. Calendar exclusion is per-day, downstream.
    fn valid_slots(&self) -> StoreResult<Vec<(i64, i64)>> {
        let days = self.timetable.days()?;
        let slots = self.timetable.time_slots()?;
        let mut valid = Vec::with_capacity(days.len() * slots.len());
        for day in &days {
            for slot in &slots {
                if !slot.is_lunch_break {
                    valid.push((day.id, slot.id));
                }
            }
        }
        valid.sort_unstable();
        Ok(valid)
    }

    /// A failed calendar read must not block distribution; the day is
    /// treated as regular and the failure logged.
    fn classify(&self, date: NaiveDate) -> Option<DayException> {
        match self.calendar.classify(date) {
            Ok(exception) => exception,
            Err(err) => {
                warn!(%date, error = %err, "calendar lookup failed, treating day as regular");
                None
            }
        }
    }

    fn next_course(
        &self,
        class_id: i64,
        week_number: u32,
        appearance: usize,
        year: i32,
        items: &[CurriculumItem],
    ) -> StoreResult<Assignment> {
        let last_course_id = self
            .ledger
            .last_known_course_id(class_id, week_number, year)?;
        // 0 and unknown ids both mean "no prior course": start at index 0.
        let last_index = items
            .iter()
            .position(|item| item.id == last_course_id)
            .map(|idx| idx as i64)
            .unwrap_or(-1);
        let next_index = last_index + appearance as i64 + 1;
        if (next_index as usize) < items.len() {
            Ok(Assignment::Course(items[next_index as usize].id))
        } else {
            Ok(Assignment::Exhausted)
        }
    }
}
