//! CSV exports: network element tables and time series.
//!
//! Both formats are plain numeric CSV with a one-line header so they load
//! directly in spreadsheets or back through `ingest`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::Measurement;
use crate::error::AppError;

/// Write an element table with header `R,C` (or a custom pair of names).
pub fn write_rc_csv(path: &Path, header: [&str; 2], r: &[f64], c: &[f64]) -> Result<(), AppError> {
    let file = create(path)?;
    write_rc(file, header, r, c)
}

/// Write a `(tp, Zth)` series.
pub fn write_series_csv(path: &Path, series: &[Measurement]) -> Result<(), AppError> {
    let file = create(path)?;
    write_series(file, series)
}

pub fn write_rc<W: Write>(out: W, header: [&str; 2], r: &[f64], c: &[f64]) -> Result<(), AppError> {
    if r.len() != c.len() {
        return Err(AppError::validation(format!(
            "R and C must have the same length ({} vs {}).",
            r.len(),
            c.len()
        )));
    }
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(header).map_err(write_err)?;
    for (ri, ci) in r.iter().zip(c.iter()) {
        writer
            .write_record([format!("{ri:e}"), format!("{ci:e}")])
            .map_err(write_err)?;
    }
    writer.flush().map_err(|e| AppError::io(format!("Failed to flush CSV: {e}")))
}

pub fn write_series<W: Write>(out: W, series: &[Measurement]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["tp", "Zth"]).map_err(write_err)?;
    for p in series {
        writer
            .write_record([format!("{:e}", p.t), format!("{:e}", p.zth)])
            .map_err(write_err)?;
    }
    writer.flush().map_err(|e| AppError::io(format!("Failed to flush CSV: {e}")))
}

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create CSV '{}': {e}", path.display())))
}

fn write_err(e: csv::Error) -> AppError {
    AppError::io(format!("Failed to write CSV row: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::read_zth_csv;

    #[test]
    fn rc_table_has_header_and_rows() {
        let mut buf = Vec::new();
        write_rc(&mut buf, ["R_cauer", "C_cauer"], &[0.5, 1.5], &[2.0, 0.25]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "R_cauer,C_cauer");
        assert_eq!(lines.len(), 3);
        let row: Vec<f64> = lines[1].split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(row, vec![0.5, 2.0]);
    }

    #[test]
    fn rc_table_rejects_mismatched_columns() {
        let mut buf = Vec::new();
        assert!(write_rc(&mut buf, ["R", "C"], &[1.0], &[]).unwrap_err().is_validation());
    }

    #[test]
    fn series_reloads_through_ingest() {
        let series = vec![Measurement::new(1e-3, 0.1), Measurement::new(0.5, 0.75)];
        let mut buf = Vec::new();
        write_series(&mut buf, &series).unwrap();
        let back = read_zth_csv(buf.as_slice()).unwrap();
        assert_eq!(back.dataset.points(), series.as_slice());
    }
}
