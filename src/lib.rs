pub mod calendar;
pub mod curriculum;
pub mod distribution;
pub mod ledger;
pub mod persistence;
pub mod timetable;
pub mod week;

pub use calendar::{DayException, ExceptionCalendar, ExceptionKind, ExceptionOracle, VacationRange};
pub use curriculum::{Curriculum, CurriculumItem, CurriculumStore};
pub use distribution::{Assignment, Distribution, RotationDistributor, SlotAssignment};
pub use ledger::{MemoryLedger, ProgressLedger, ProgressRecord};
pub use timetable::{
    ClassRoom, Day, Period, TimeSlot, TimetableEntry, TimetableStore, WeeklyTimetable,
};
pub use week::{SchoolYear, WeekIdentifier};
