//! CSV export of screening history
//!
//! Serializes detection rows through the csv writer for spreadsheet use

use csv::Writer;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::database::{Database, DatabaseError, Detection};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// One exported history row
#[derive(Debug, Serialize)]
pub struct HistoryRow {
    pub detection_id: i64,
    pub username: String,
    pub test_date: String,
    pub test_type: String,
    pub result: String,
    pub confidence: f64,
    pub audio_path: String,
}

impl HistoryRow {
    fn new(username: &str, detection: &Detection) -> Self {
        Self {
            detection_id: detection.id,
            username: username.to_string(),
            test_date: detection.test_date.clone(),
            test_type: detection.test_type.as_str().to_string(),
            result: detection.result.as_str().to_string(),
            confidence: detection.confidence,
            audio_path: detection.audio_path.clone(),
        }
    }
}

/// Collect history rows for one user, or for everyone
pub fn gather_rows(db: &Database, username: Option<&str>) -> Result<Vec<HistoryRow>, ExportError> {
    let rows = match username {
        Some(username) => {
            let user = db.require_user(username)?;
            db.list_detections(user.id, u32::MAX)?
                .iter()
                .map(|d| HistoryRow::new(username, d))
                .collect()
        }
        None => db
            .list_all_detections()?
            .iter()
            .map(|(username, d)| HistoryRow::new(username, d))
            .collect(),
    };
    Ok(rows)
}

/// Write history rows to a CSV file with a header
pub fn write_history_csv(rows: &[HistoryRow], path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    let mut writer = Writer::from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}
