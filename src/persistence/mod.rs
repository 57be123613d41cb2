use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

/// Infrastructure failure in one of the backing stores. Logical anomalies
/// in a computed distribution are never errors; they are collected by
/// `RotationDistributor::validate_distribution` instead.
#[derive(Debug)]
pub enum StoreError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    InvalidData(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Serialization(err) => write!(f, "serialization error: {err}"),
            StoreError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            StoreError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            StoreError::Csv(err) => write!(f, "csv error: {err}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<SerdeJsonError> for StoreError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for StoreError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for StoreError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    SchoolSnapshot, load_curriculum_from_csv, load_snapshot_from_json, save_curriculum_to_csv,
    save_snapshot_to_json,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
