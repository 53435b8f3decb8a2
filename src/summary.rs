//! Progress summaries and terminal tables over calibrated readings

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

use crate::models::{CalibratedMeasurement, ReferenceScan};

/// Change between the first and latest calibrated readings of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSummary {
    /// Records in the series
    pub total: usize,

    /// Records that carried both weight and fat%
    pub calibrated: usize,

    pub first_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,

    /// Latest corrected weight (lbs)
    pub latest_weight: Option<f64>,
    pub latest_fat_percent: Option<f64>,
    pub latest_muscle_percent: Option<f64>,

    /// Deltas from first to latest calibrated reading (lbs)
    pub weight_change: Option<f64>,
    pub fat_mass_change: Option<f64>,
    pub muscle_mass_change: Option<f64>,
}

impl CompositionSummary {
    /// Summarise a series ordered by date ascending
    pub fn from_series(series: &[CalibratedMeasurement]) -> Self {
        let mut calibrated = series.iter().filter(|m| m.is_calibrated());
        let first = calibrated.next();
        let latest = calibrated.last().or(first);

        let delta = |f: fn(&CalibratedMeasurement) -> Option<f64>| match (first, latest) {
            (Some(a), Some(b)) => Some(f(b)? - f(a)?),
            _ => None,
        };

        Self {
            total: series.len(),
            calibrated: series.iter().filter(|m| m.is_calibrated()).count(),
            first_date: first.map(|m| m.date),
            latest_date: latest.map(|m| m.date),
            latest_weight: latest.and_then(|m| m.weight),
            latest_fat_percent: latest.and_then(CalibratedMeasurement::fat_percent_calibrated),
            latest_muscle_percent: latest.and_then(CalibratedMeasurement::muscle_percent),
            weight_change: delta(|m| m.weight),
            fat_mass_change: delta(CalibratedMeasurement::fat_mass),
            muscle_mass_change: delta(CalibratedMeasurement::muscle_mass),
        }
    }
}

#[derive(Tabled)]
struct DisplayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Scale Fat%")]
    scale_fat: String,
    #[tabled(rename = "Fat%")]
    fat: String,
    #[tabled(rename = "Muscle%")]
    muscle: String,
    #[tabled(rename = "Fat lbs")]
    fat_mass: String,
    #[tabled(rename = "Muscle lbs")]
    muscle_mass: String,
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "—".to_string(), |v| format!("{:.1}", v))
}

/// Render readings as a rounded terminal table
pub fn render_table(series: &[CalibratedMeasurement]) -> String {
    let rows: Vec<DisplayRow> = series
        .iter()
        .map(|m| DisplayRow {
            date: m.date.format("%Y-%m-%d").to_string(),
            weight: cell(m.weight),
            scale_fat: cell(m.fat_percent),
            fat: cell(m.fat_percent_calibrated()),
            muscle: cell(m.muscle_percent()),
            fat_mass: cell(m.fat_mass()),
            muscle_mass: cell(m.muscle_mass()),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct ScanRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Fat%")]
    fat: String,
    #[tabled(rename = "Muscle lbs")]
    muscle_mass: String,
    #[tabled(rename = "Est. Fat%")]
    estimated_fat: String,
    #[tabled(rename = "Est. − Scan")]
    fat_error: String,
}

/// Render reference scans next to the calibrated estimate for the same day.
///
/// `series` is searched by date; scans without a calibrated reading that day
/// show no estimate.
pub fn render_scans(scans: &[ReferenceScan], series: &[CalibratedMeasurement]) -> String {
    let rows: Vec<ScanRow> = scans
        .iter()
        .map(|scan| {
            let estimate = series
                .iter()
                .find(|m| m.date == scan.date)
                .and_then(CalibratedMeasurement::fat_percent_calibrated);
            let fat_error = match (estimate, scan.fat_percent) {
                (Some(estimate), Some(actual)) => format!("{:+.1}", estimate - actual),
                _ => "—".to_string(),
            };

            ScanRow {
                date: scan.date.format("%Y-%m-%d").to_string(),
                weight: cell(scan.weight),
                fat: cell(scan.fat_percent),
                muscle_mass: cell(scan.muscle_mass),
                estimated_fat: cell(estimate),
                fat_error,
            }
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationEngine, CalibrationTables};
    use crate::models::RawMeasurement;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series() -> Vec<CalibratedMeasurement> {
        let engine = CalibrationEngine::new(CalibrationTables::default()).unwrap();
        engine.calibrate_batch(&[
            RawMeasurement::new(date(2025, 1, 1), 170.0, Some(18.0)),
            RawMeasurement::new(date(2025, 2, 1), 171.0, None),
            RawMeasurement::new(date(2025, 3, 1), 175.0, Some(18.5)),
        ])
    }

    #[test]
    fn test_summary_deltas() {
        let series = series();
        let summary = CompositionSummary::from_series(&series);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.calibrated, 2);
        assert_eq!(summary.first_date, Some(date(2025, 1, 1)));
        assert_eq!(summary.latest_date, Some(date(2025, 3, 1)));

        let weight_change = summary.weight_change.unwrap();
        assert!((weight_change - 5.0).abs() < 1e-9);

        let fat_change = series[2].fat_mass().unwrap() - series[0].fat_mass().unwrap();
        assert!((summary.fat_mass_change.unwrap() - fat_change).abs() < 1e-12);
    }

    #[test]
    fn test_summary_single_and_empty() {
        let series = series();
        let single = CompositionSummary::from_series(&series[..1]);
        assert_eq!(single.weight_change, Some(0.0));

        let empty = CompositionSummary::from_series(&[]);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.latest_date, None);
        assert_eq!(empty.muscle_mass_change, None);
    }

    #[test]
    fn test_render_scans_compares_same_day_estimate() {
        let scans = vec![
            ReferenceScan {
                date: date(2025, 1, 1),
                weight: Some(168.5),
                fat_percent: Some(13.0),
                muscle_mass: Some(84.0),
            },
            ReferenceScan {
                date: date(2025, 2, 1),
                weight: Some(170.0),
                fat_percent: Some(13.5),
                muscle_mass: None,
            },
        ];
        let series = series();
        let table = render_scans(&scans, &series);

        let expected = series[0].fat_percent_calibrated().unwrap() - 13.0;
        assert!(table.contains(&format!("{:+.1}", expected)));
        assert!(table.contains("Est. Fat%"));
        // 2025-02-01 has no fat% reading, so no estimate
        assert!(table.contains("—"));
    }

    #[test]
    fn test_render_table_marks_missing_values() {
        let table = render_table(&series());

        assert!(table.contains("Muscle lbs"));
        assert!(table.contains("2025-02-01"));
        assert!(table.contains("—"));
        assert!(table.contains("168.7"));
    }
}
