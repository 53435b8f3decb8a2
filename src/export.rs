use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::ImportExportError;
use crate::models::CalibratedMeasurement;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = ImportExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ImportExportError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Flat CSV row; absent values become empty cells
#[derive(Debug, Serialize)]
struct CsvRow {
    date: String,
    weight: Option<f64>,
    fat_percent: Option<f64>,
    fat_percent_calibrated: Option<f64>,
    muscle_percent: Option<f64>,
    fat_mass: Option<f64>,
    muscle_mass: Option<f64>,
}

impl From<&CalibratedMeasurement> for CsvRow {
    fn from(m: &CalibratedMeasurement) -> Self {
        CsvRow {
            date: m.date.format("%Y-%m-%d").to_string(),
            weight: m.weight,
            fat_percent: m.fat_percent,
            fat_percent_calibrated: m.fat_percent_calibrated(),
            muscle_percent: m.muscle_percent(),
            fat_mass: m.fat_mass(),
            muscle_mass: m.muscle_mass(),
        }
    }
}

/// Write calibrated measurements as CSV with a header row
pub fn write_csv<W: Write>(
    measurements: &[CalibratedMeasurement],
    writer: W,
) -> Result<(), ImportExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for measurement in measurements {
        csv_writer.serialize(CsvRow::from(measurement))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write calibrated measurements as a pretty-printed JSON array
pub fn write_json<W: Write>(
    measurements: &[CalibratedMeasurement],
    mut writer: W,
) -> Result<(), ImportExportError> {
    serde_json::to_writer_pretty(&mut writer, measurements)?;
    writeln!(writer)?;
    Ok(())
}

/// Export to a file in the requested format
pub fn export_to_file<P: AsRef<Path>>(
    measurements: &[CalibratedMeasurement],
    format: ExportFormat,
    output_path: P,
) -> Result<(), ImportExportError> {
    let path = output_path.as_ref();
    let file = File::create(path).map_err(|e| ImportExportError::ExportFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match format {
        ExportFormat::Csv => write_csv(measurements, file)?,
        ExportFormat::Json => write_json(measurements, file)?,
    }

    info!(
        path = %path.display(),
        ?format,
        records = measurements.len(),
        "Export complete"
    );
    Ok(())
}
