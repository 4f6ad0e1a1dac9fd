//! CSV ingestion
//!
//! Reads bulk exports with a `department,threat_score` header into
//! validated [`ScoreRecord`]s ready to be stored.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use threat_core::{ScoreRecord, ThreatScore};

/// Errors from reading a score export
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read score export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: {reason}")]
    InvalidRow { line: usize, reason: String },
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    department: String,
    threat_score: i64,
}

/// Parse records from any reader
pub fn read_records<R: Read>(reader: R) -> Result<Vec<ScoreRecord>, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();

    let mut records = Vec::new();
    for raw in csv_reader.records() {
        let raw = raw?;
        let line = raw.position().map(|p| p.line() as usize).unwrap_or_default();
        let row: ScoreRow = raw.deserialize(Some(&headers))?;

        if row.department.is_empty() {
            return Err(IngestError::InvalidRow {
                line,
                reason: "empty department".to_string(),
            });
        }
        let score = ThreatScore::new(row.threat_score).map_err(|e| IngestError::InvalidRow {
            line,
            reason: e.to_string(),
        })?;

        records.push(ScoreRecord::new(row.department, score));
    }

    Ok(records)
}

/// Parse records from a file on disk
pub fn read_records_path<P: AsRef<Path>>(path: P) -> Result<Vec<ScoreRecord>, IngestError> {
    let file = std::fs::File::open(path)?;
    read_records(file)
}
