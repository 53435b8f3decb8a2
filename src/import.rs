//! CSV import of historical scale readings
//!
//! Accepts exports with `date`, `weight` and an optional fat% column.
//! Header names are matched case-insensitively against common variations.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::ImportExportError;
use crate::models::RawMeasurement;

/// Outcome of reading one CSV file
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    /// Readings with a usable date and weight
    pub measurements: Vec<RawMeasurement>,

    /// Rows dropped because the weight cell was empty or not a number
    pub skipped_without_weight: usize,

    /// Rows that could not be read, as (line, reason)
    pub errors: Vec<(u64, String)>,
}

/// CSV importer with flexible column mapping
pub struct CsvImporter {
    column_mapping: HashMap<String, &'static str>,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(&mut column_mapping, "date", &["date", "day", "timestamp"]);
        Self::add_mapping(
            &mut column_mapping,
            "weight",
            &["weight", "weight_lbs", "scale_weight", "new_scale"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "fat_percent",
            &["fat_percent", "fat", "body_fat", "fat_pct", "bodyfat"],
        );

        Self { column_mapping }
    }

    fn add_mapping(
        mapping: &mut HashMap<String, &'static str>,
        standard: &'static str,
        variations: &[&str],
    ) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard);
        }
    }

    fn normalize_column_name(&self, name: &str) -> Option<&'static str> {
        let normalized = name
            .trim()
            .to_lowercase()
            .replace([' ', '-', '%'], "_")
            .trim_matches('_')
            .to_string();

        self.column_mapping.get(&normalized).copied()
    }

    fn parse_date(value: &str) -> Option<NaiveDate> {
        let formats = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

        formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
    }

    /// Numeric cell, with blanks and markers such as `NA` read as absent
    fn parse_number(value: &str) -> Option<f64> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<ImportSummary, ImportExportError> {
        let reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path.as_ref())?;

        let summary = self.import_reader(reader)?;
        info!(
            file = %path.as_ref().display(),
            imported = summary.measurements.len(),
            skipped = summary.skipped_without_weight,
            errors = summary.errors.len(),
            "CSV import parsed"
        );
        Ok(summary)
    }

    pub fn import_str(&self, content: &str) -> Result<ImportSummary, ImportExportError> {
        let reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        self.import_reader(reader)
    }

    fn import_reader<R: Read>(
        &self,
        mut reader: csv::Reader<R>,
    ) -> Result<ImportSummary, ImportExportError> {
        let mut columns: HashMap<&'static str, usize> = HashMap::new();
        for (index, header) in reader.headers()?.iter().enumerate() {
            if let Some(standard) = self.normalize_column_name(header) {
                columns.entry(standard).or_insert(index);
            }
        }

        let date_col = *columns.get("date").ok_or(ImportExportError::MissingColumn {
            column: "date".to_string(),
        })?;
        let weight_col = *columns
            .get("weight")
            .ok_or(ImportExportError::MissingColumn {
                column: "weight".to_string(),
            })?;
        let fat_col = columns.get("fat_percent").copied();

        let mut summary = ImportSummary::default();

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    summary.errors.push((line, e.to_string()));
                    continue;
                }
            };
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let raw_date = record.get(date_col).unwrap_or("");
            let Some(date) = Self::parse_date(raw_date) else {
                warn!(line, value = raw_date, "Unparseable date, row skipped");
                summary
                    .errors
                    .push((line, format!("Unable to parse date: {}", raw_date)));
                continue;
            };

            let Some(weight) = record.get(weight_col).and_then(Self::parse_number) else {
                summary.skipped_without_weight += 1;
                continue;
            };

            let fat_percent = fat_col
                .and_then(|col| record.get(col))
                .and_then(Self::parse_number);

            summary
                .measurements
                .push(RawMeasurement::new(date, weight, fat_percent));
        }

        Ok(summary)
    }
}
