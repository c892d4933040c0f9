//! CSV ingest and cleaning of measured transients.
//!
//! Input is a two-column CSV (`time, Zth`), optionally with a header row and
//! extra columns (ignored). Cleaning mirrors what the upstream uploader
//! normally guarantees:
//!
//! - rows whose first two fields are not numbers are skipped and reported
//! - non-finite rows are dropped
//! - rows are sorted by time (stable)
//! - `t <= 0` and repeated times (first occurrence wins) are dropped
//!
//! The cleaned samples are then validated by `Dataset::new`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Dataset, Measurement, PowerProfile, PowerSample};
use crate::error::AppError;

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the clean dataset plus bookkeeping for the report.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows parsed but removed by cleaning (non-finite, `t <= 0`, duplicate t).
    pub rows_dropped: usize,
}

impl IngestedData {
    pub fn rows_used(&self) -> usize {
        self.dataset.len()
    }
}

/// Load and clean a transient CSV file.
pub fn load_zth_csv(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_zth_csv(file)
}

/// Same as [`load_zth_csv`] for any reader.
pub fn read_zth_csv<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut raw = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                rows_read += 1;
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        if is_blank(&record) {
            continue;
        }
        rows_read += 1;
        match parse_row(&record) {
            Ok(m) => raw.push(m),
            // A non-numeric first line is a header, not an error.
            Err(_) if line == 1 => rows_read -= 1,
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let parsed = raw.len();
    let points = clean(raw);
    let rows_dropped = parsed - points.len();
    if points.is_empty() {
        return Err(AppError::io("No valid rows remain after cleaning."));
    }
    if !row_errors.is_empty() || rows_dropped > 0 {
        tracing::info!(
            skipped = row_errors.len(),
            dropped = rows_dropped,
            "CSV ingest removed rows"
        );
    }

    Ok(IngestedData {
        dataset: Dataset::new(points)?,
        row_errors,
        rows_read,
        rows_dropped,
    })
}

/// Drop non-finite rows, sort by time, drop `t <= 0` and duplicate times.
pub fn clean(mut points: Vec<Measurement>) -> Vec<Measurement> {
    points.retain(|p| p.t.is_finite() && p.zth.is_finite());
    points.sort_by(|a, b| a.t.total_cmp(&b.t));
    let mut out: Vec<Measurement> = Vec::with_capacity(points.len());
    for p in points {
        if p.t <= 0.0 {
            continue;
        }
        if out.last().is_some_and(|prev| prev.t >= p.t) {
            continue;
        }
        out.push(p);
    }
    out
}

/// Load a power profile CSV (`time, power`), sorted by time.
///
/// Unlike transients, `t = 0` is allowed and power may be negative; rows are
/// sorted but not deduplicated, so repeated times are rejected by validation.
pub fn load_power_csv(path: &Path) -> Result<PowerProfile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_power_csv(file)
}

pub fn read_power_csv<R: Read>(reader: R) -> Result<PowerProfile, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 1;
        let record =
            result.map_err(|e| AppError::validation(format!("Power CSV line {line}: {e}")))?;
        if is_blank(&record) {
            continue;
        }
        match parse_row(&record) {
            Ok(m) => samples.push(PowerSample::new(m.t, m.zth)),
            Err(_) if line == 1 => {}
            Err(message) => {
                return Err(AppError::validation(format!("Power CSV line {line}: {message}")));
            }
        }
    }
    samples.sort_by(|a, b| a.t.total_cmp(&b.t));
    PowerProfile::new(samples)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.is_empty())
}

fn parse_row(record: &StringRecord) -> Result<Measurement, String> {
    if record.len() < 2 {
        return Err("Expected at least two columns: time, Zth.".to_string());
    }
    let t = parse_f64(&record[0]).ok_or_else(|| format!("Invalid time value `{}`.", &record[0]))?;
    let z = parse_f64(&record[1]).ok_or_else(|| format!("Invalid Zth value `{}`.", &record[1]))?;
    Ok(Measurement::new(t, z))
}

fn parse_f64(s: &str) -> Option<f64> {
    let s = s.trim().trim_start_matches('\u{feff}');
    if s.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    s.parse::<f64>().ok()
}
