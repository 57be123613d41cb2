use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::persistence::StoreResult;

/// One snapshot of how far a class had progressed as of a given week.
/// Unique per (class_id, last_week, year); re-saving the same key replaces
/// the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub class_id: i64,
    pub last_course_id: i64,
    pub last_week: u32,
    pub year: i32,
}

/// Durable record of rotation cursors, read to resume distribution and
/// written when a week is saved.
pub trait ProgressLedger {
    /// Most recent cursor recorded before `before_week` of `year`, or 0
    /// when the class has no history ("start from the first item").
    ///
    /// Week 1 spans the calendar-year boundary: its lookup also accepts
    /// records from the closing weeks (>= 50) of the previous year,
    /// preferring the most recent by (year, week).
    fn last_known_course_id(&self, class_id: i64, before_week: u32, year: i32)
    -> StoreResult<i64>;

    /// Delete-then-insert upsert for the record's key. Idempotent.
    fn save(&self, record: &ProgressRecord) -> StoreResult<()>;

    /// Persist a whole week's records atomically: either every record is
    /// applied or none is, so class cursors never desynchronize.
    fn save_week(&self, records: &[ProgressRecord]) -> StoreResult<()>;
}

/// In-memory ledger, keyed by (class_id, year, week).
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<BTreeMap<(i64, i32, u32), i64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProgressRecord> {
        let records = self.records.lock().expect("ledger mutex poisoned");
        records
            .iter()
            .map(|(&(class_id, year, last_week), &last_course_id)| ProgressRecord {
                class_id,
                last_course_id,
                last_week,
                year,
            })
            .collect()
    }
}

impl ProgressLedger for MemoryLedger {
    fn last_known_course_id(
        &self,
        class_id: i64,
        before_week: u32,
        year: i32,
    ) -> StoreResult<i64> {
        let records = self.records.lock().expect("ledger mutex poisoned");
        let best = if before_week == 1 {
            records
                .iter()
                .filter(|((c, y, w), _)| {
                    *c == class_id && ((*y == year - 1 && *w >= 50) || (*y == year && *w < 1))
                })
                .max_by_key(|((_, y, w), _)| (*y, *w))
        } else {
            records
                .iter()
                .filter(|((c, y, w), _)| *c == class_id && *y == year && *w < before_week)
                .max_by_key(|((_, _, w), _)| *w)
        };
        Ok(best.map(|(_, &course_id)| course_id).unwrap_or(0))
    }

    fn save(&self, record: &ProgressRecord) -> StoreResult<()> {
        let mut records = self.records.lock().expect("ledger mutex poisoned");
        records.insert(
            (record.class_id, record.year, record.last_week),
            record.last_course_id,
        );
        Ok(())
    }

    fn save_week(&self, week_records: &[ProgressRecord]) -> StoreResult<()> {
        let mut records = self.records.lock().expect("ledger mutex poisoned");
        for record in week_records {
            records.insert(
                (record.class_id, record.year, record.last_week),
                record.last_course_id,
            );
        }
        Ok(())
    }
}
