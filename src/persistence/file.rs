use super::{StoreError, StoreResult};
use crate::calendar::ExceptionCalendar;
use crate::curriculum::{Curriculum, CurriculumItem};
use crate::timetable::WeeklyTimetable;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Full backup of the data a distribution run depends on: curriculum,
/// weekly timetable and calendar exceptions. Ledger history is not part of
/// the snapshot; it lives in the SQLite store only.
#[derive(Serialize, Deserialize)]
pub struct SchoolSnapshot {
    pub curriculum: Curriculum,
    pub timetable: WeeklyTimetable,
    pub calendar: ExceptionCalendar,
}

pub fn save_snapshot_to_json<P: AsRef<Path>>(
    snapshot: &SchoolSnapshot,
    path: P,
) -> StoreResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_snapshot_from_json<P: AsRef<Path>>(path: P) -> StoreResult<SchoolSnapshot> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

#[derive(Serialize, Deserialize)]
struct CurriculumCsvRecord {
    id: i64,
    value: String,
}

pub fn save_curriculum_to_csv<P: AsRef<Path>>(curriculum: &Curriculum, path: P) -> StoreResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for item in curriculum.items() {
        writer.serialize(CurriculumCsvRecord {
            id: item.id,
            value: item.value.clone(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_curriculum_from_csv<P: AsRef<Path>>(path: P) -> StoreResult<Curriculum> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut items = Vec::new();
    for record in reader.deserialize::<CurriculumCsvRecord>() {
        let record = record?;
        if record.value.trim().is_empty() {
            return Err(StoreError::InvalidData(format!(
                "curriculum item {} has an empty value",
                record.id
            )));
        }
        items.push(CurriculumItem {
            id: record.id,
            value: record.value,
        });
    }

    if items.is_empty() {
        return Err(StoreError::InvalidData(
            "CSV file contained no curriculum items".into(),
        ));
    }

    Ok(Curriculum::from_items(items))
}
