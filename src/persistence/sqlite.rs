use super::{StoreError, StoreResult};
use crate::calendar::{DayException, ExceptionKind, ExceptionOracle, VacationRange};
use crate::curriculum::{CurriculumItem, CurriculumStore};
use crate::distribution::{Assignment, Distribution, SlotAssignment};
use crate::ledger::{ProgressLedger, ProgressRecord};
use crate::timetable::{
    ClassRoom, DAY_NAMES, Day, Period, TimeSlot, TimetableEntry, TimetableStore,
    default_time_slots,
};
use crate::week::WeekIdentifier;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::Mutex;
use tracing::info;

/// SQLite-backed implementation of all four store contracts, plus the
/// administrative inserts and the saved-distribution table the desktop
/// layer uses. One connection, writes inside transactions.
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS classes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                level TEXT NOT NULL,
                school_year TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS days (
                day_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS time_slots (
                slot_id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                is_lunch_break INTEGER NOT NULL DEFAULT 0,
                period TEXT
            );
            CREATE TABLE IF NOT EXISTS schedule_entries (
                entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
                class_id INTEGER NOT NULL,
                day_id INTEGER NOT NULL,
                time_slot_id INTEGER NOT NULL,
                FOREIGN KEY (class_id) REFERENCES classes (id),
                FOREIGN KEY (day_id) REFERENCES days (day_id),
                FOREIGN KEY (time_slot_id) REFERENCES time_slots (slot_id)
            );
            CREATE TABLE IF NOT EXISTS vacations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                label TEXT NOT NULL DEFAULT 'Vacances Scolaires'
            );
            CREATE TABLE IF NOT EXISTS public_holidays (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                label TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS absences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                motif TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS class_course_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                class_id INTEGER NOT NULL,
                last_course_id INTEGER NOT NULL,
                last_week INTEGER NOT NULL,
                year INTEGER NOT NULL,
                UNIQUE(class_id, last_week, year)
            );
            CREATE TABLE IF NOT EXISTS week_assignments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                week_number INTEGER NOT NULL,
                year INTEGER NOT NULL,
                class_id INTEGER NOT NULL,
                day_id INTEGER NOT NULL,
                time_slot_id INTEGER NOT NULL,
                course_id INTEGER,
                UNIQUE(week_number, year, class_id, day_id, time_slot_id)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Insert the standard six-day, nine-slot grid when the day and slot
    /// tables are still empty. Explicit so opening a store never mutates
    /// an existing database.
    pub fn seed_default_grid(&self) -> StoreResult<()> {
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction()?;

        let day_count: i64 = tx.query_row("SELECT COUNT(*) FROM days", [], |row| row.get(0))?;
        if day_count == 0 {
            for name in DAY_NAMES {
                tx.execute("INSERT INTO days (name) VALUES (?1)", params![name])?;
            }
        }

        let slot_count: i64 =
            tx.query_row("SELECT COUNT(*) FROM time_slots", [], |row| row.get(0))?;
        if slot_count == 0 {
            for slot in default_time_slots() {
                tx.execute(
                    "INSERT INTO time_slots (start_time, end_time, is_lunch_break, period)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        slot.start_time,
                        slot.end_time,
                        slot.is_lunch_break as i64,
                        slot.period.map(|p| p.as_str()),
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    // Administrative inserts. These belong to the surrounding CRUD layer,
    // not to the rotation core, but fixtures and the CLI need them.

    pub fn add_course(&self, value: &str) -> StoreResult<i64> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        conn.execute("INSERT INTO courses (value) VALUES (?1)", params![value])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_class(&self, name: &str, level: &str, school_year: &str) -> StoreResult<i64> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "INSERT INTO classes (name, level, school_year) VALUES (?1, ?2, ?3)",
            params![name, level, school_year],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_schedule_entry(
        &self,
        class_id: i64,
        day_id: i64,
        time_slot_id: i64,
    ) -> StoreResult<()> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "INSERT INTO schedule_entries (class_id, day_id, time_slot_id) VALUES (?1, ?2, ?3)",
            params![class_id, day_id, time_slot_id],
        )?;
        Ok(())
    }

    pub fn add_vacation(&self, start: NaiveDate, end: NaiveDate, label: &str) -> StoreResult<()> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "INSERT INTO vacations (start_date, end_date, label) VALUES (?1, ?2, ?3)",
            params![format_date(start), format_date(end), label],
        )?;
        Ok(())
    }

    pub fn add_holiday(&self, date: NaiveDate, label: &str) -> StoreResult<()> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "INSERT INTO public_holidays (date, label) VALUES (?1, ?2)",
            params![format_date(date), label],
        )?;
        Ok(())
    }

    pub fn add_absence(&self, date: NaiveDate, motif: &str) -> StoreResult<()> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "INSERT INTO absences (date, motif) VALUES (?1, ?2)",
            params![format_date(date), motif],
        )?;
        Ok(())
    }

    pub fn classes(&self) -> StoreResult<Vec<ClassRoom>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt =
            conn.prepare("SELECT id, name, level, school_year FROM classes ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(ClassRoom {
                id: row.get(0)?,
                name: row.get(1)?,
                level: row.get(2)?,
                school_year: row.get(3)?,
            })
        })?;
        let mut classes = Vec::new();
        for class in rows {
            classes.push(class?);
        }
        Ok(classes)
    }

    pub fn vacations(&self) -> StoreResult<Vec<VacationRange>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT start_date, end_date, label FROM vacations ORDER BY start_date ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut vacations = Vec::new();
        for row in rows {
            let (start, end, label) = row?;
            vacations.push(VacationRange {
                start: parse_date(&start)?,
                end: parse_date(&end)?,
                label,
            });
        }
        Ok(vacations)
    }

    pub fn holidays(&self) -> StoreResult<Vec<(NaiveDate, String)>> {
        self.dated_labels("SELECT date, label FROM public_holidays ORDER BY date ASC")
    }

    pub fn absences(&self) -> StoreResult<Vec<(NaiveDate, String)>> {
        self.dated_labels("SELECT date, motif FROM absences ORDER BY date ASC")
    }

    fn dated_labels(&self, sql: &str) -> StoreResult<Vec<(NaiveDate, String)>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn.prepare(sql)?;
        let rows =
            stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut entries = Vec::new();
        for row in rows {
            let (date, label) = row?;
            entries.push((parse_date(&date)?, label));
        }
        Ok(entries)
    }

    /// Every recorded cursor of a class, most recent first.
    pub fn progress_history(&self, class_id: i64) -> StoreResult<Vec<ProgressRecord>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT class_id, last_course_id, last_week, year
             FROM class_course_progress
             WHERE class_id = ?1
             ORDER BY year DESC, last_week DESC",
        )?;
        let rows = stmt.query_map(params![class_id], |row| {
            Ok(ProgressRecord {
                class_id: row.get(0)?,
                last_course_id: row.get(1)?,
                last_week: row.get(2)?,
                year: row.get(3)?,
            })
        })?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    /// Persist a computed week: replaces the week's saved assignments and
    /// advances every affected class's ledger cursor in one transaction,
    /// so a failed write leaves both untouched.
    pub fn save_distribution(
        &self,
        week: &WeekIdentifier,
        distribution: &Distribution,
    ) -> StoreResult<()> {
        let records = distribution.progress_records(week);
        let year = week.primary_year();

        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM week_assignments WHERE week_number = ?1 AND year = ?2",
            params![week.number, year],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO week_assignments
                     (week_number, year, class_id, day_id, time_slot_id, course_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (class_id, slots) in distribution.iter() {
                for slot in slots {
                    stmt.execute(params![
                        week.number,
                        year,
                        class_id,
                        slot.day_id,
                        slot.time_slot_id,
                        slot.assignment.course_id(),
                    ])?;
                }
            }
        }
        for record in &records {
            upsert_progress(&tx, record)?;
        }

        tx.commit()?;
        info!(
            week = week.number,
            year,
            classes = records.len(),
            "distribution saved"
        );
        Ok(())
    }

    /// Reload a previously saved week, empty when none was saved.
    pub fn load_distribution(&self, week_number: u32, year: i32) -> StoreResult<Distribution> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT class_id, day_id, time_slot_id, course_id
             FROM week_assignments
             WHERE week_number = ?1 AND year = ?2
             ORDER BY class_id, day_id, time_slot_id",
        )?;
        let rows = stmt.query_map(params![week_number, year], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut distribution = Distribution::default();
        for row in rows {
            let (class_id, day_id, time_slot_id, course_id) = row?;
            let assignment = match course_id {
                Some(id) => Assignment::Course(id),
                None => Assignment::Exhausted,
            };
            distribution.record(
                class_id,
                SlotAssignment {
                    day_id,
                    time_slot_id,
                    assignment,
                },
            );
        }
        Ok(distribution)
    }
}

impl CurriculumStore for SqliteStore {
    fn all_items(&self) -> StoreResult<Vec<CurriculumItem>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn.prepare("SELECT id, value FROM courses ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(CurriculumItem {
                id: row.get(0)?,
                value: row.get(1)?,
            })
        })?;
        let mut items = Vec::new();
        for item in rows {
            items.push(item?);
        }
        Ok(items)
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn value_of(&self, id: i64) -> StoreResult<Option<String>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let value = conn
            .query_row(
                "SELECT value FROM courses WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl TimetableStore for SqliteStore {
    fn days(&self) -> StoreResult<Vec<Day>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn.prepare("SELECT day_id, name FROM days ORDER BY day_id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Day {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut days = Vec::new();
        for day in rows {
            days.push(day?);
        }
        Ok(days)
    }

    fn time_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT slot_id, start_time, end_time, is_lunch_break, period
             FROM time_slots ORDER BY slot_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;
        let mut slots = Vec::new();
        for row in rows {
            let (id, start_time, end_time, is_lunch_break, period) = row?;
            let period = match period {
                Some(value) => Some(Period::from_str(&value).ok_or_else(|| {
                    StoreError::InvalidData(format!("invalid period '{value}' for slot {id}"))
                })?),
                None => None,
            };
            slots.push(TimeSlot {
                id,
                start_time,
                end_time,
                is_lunch_break: is_lunch_break != 0,
                period,
            });
        }
        Ok(slots)
    }

    fn entries(&self) -> StoreResult<Vec<TimetableEntry>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT day_id, time_slot_id, class_id
             FROM schedule_entries ORDER BY day_id, time_slot_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TimetableEntry {
                day_id: row.get(0)?,
                time_slot_id: row.get(1)?,
                class_id: row.get(2)?,
            })
        })?;
        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }
}

impl ExceptionOracle for SqliteStore {
    fn classify(&self, date: NaiveDate) -> StoreResult<Option<DayException>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let key = format_date(date);

        // Vacations have priority over holidays, holidays over absences.
        let vacation: Option<String> = conn
            .query_row(
                "SELECT label FROM vacations
                 WHERE ?1 BETWEEN start_date AND end_date
                 ORDER BY start_date LIMIT 1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(label) = vacation {
            return Ok(Some(DayException {
                kind: ExceptionKind::Vacation,
                label,
            }));
        }

        let holiday: Option<String> = conn
            .query_row(
                "SELECT label FROM public_holidays WHERE date = ?1 LIMIT 1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(label) = holiday {
            return Ok(Some(DayException {
                kind: ExceptionKind::Holiday,
                label,
            }));
        }

        let absence: Option<String> = conn
            .query_row(
                "SELECT motif FROM absences WHERE date = ?1 LIMIT 1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(motif) = absence {
            return Ok(Some(DayException {
                kind: ExceptionKind::Absence,
                label: motif,
            }));
        }

        Ok(None)
    }
}

impl ProgressLedger for SqliteStore {
    fn last_known_course_id(
        &self,
        class_id: i64,
        before_week: u32,
        year: i32,
    ) -> StoreResult<i64> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let result: Option<i64> = if before_week == 1 {
            // Week 1 also accepts the closing weeks of the previous year.
            conn.query_row(
                "SELECT last_course_id FROM class_course_progress
                 WHERE class_id = ?1
                   AND ((year = ?2 AND last_week >= 50) OR (year = ?3 AND last_week < ?4))
                 ORDER BY year DESC, last_week DESC LIMIT 1",
                params![class_id, year - 1, year, before_week],
                |row| row.get(0),
            )
            .optional()?
        } else {
            conn.query_row(
                "SELECT last_course_id FROM class_course_progress
                 WHERE class_id = ?1 AND year = ?2 AND last_week < ?3
                 ORDER BY last_week DESC LIMIT 1",
                params![class_id, year, before_week],
                |row| row.get(0),
            )
            .optional()?
        };
        Ok(result.unwrap_or(0))
    }

    fn save(&self, record: &ProgressRecord) -> StoreResult<()> {
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction()?;
        upsert_progress(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    fn save_week(&self, records: &[ProgressRecord]) -> StoreResult<()> {
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction()?;
        for record in records {
            upsert_progress(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert_progress(tx: &Transaction, record: &ProgressRecord) -> StoreResult<()> {
    tx.execute(
        "DELETE FROM class_course_progress
         WHERE class_id = ?1 AND last_week = ?2 AND year = ?3",
        params![record.class_id, record.last_week, record.year],
    )?;
    tx.execute(
        "INSERT INTO class_course_progress (class_id, last_course_id, last_week, year)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            record.class_id,
            record.last_course_id,
            record.last_week,
            record.year
        ],
    )?;
    Ok(())
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(input: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| StoreError::InvalidData(format!("invalid date '{input}': {e}")))
}
