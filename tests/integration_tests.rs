use bodycomp::calibration::{CalibrationEngine, CalibrationTables, FatBiasAnchor};
use bodycomp::database::{Database, MeasurementSource};
use bodycomp::export::{self, ExportFormat};
use bodycomp::import::CsvImporter;
use bodycomp::models::RawMeasurement;
use bodycomp::summary::CompositionSummary;
use bodycomp::AppConfig;
use chrono::NaiveDate;
use tempfile::tempdir;

/// Integration tests covering store → calibrate → export workflows

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn default_engine() -> CalibrationEngine {
    CalibrationEngine::new(CalibrationTables::default()).unwrap()
}

#[test]
fn test_reference_scenarios() {
    let engine = default_engine();
    let records = vec![
        RawMeasurement::new(date(2025, 1, 1), 170.0, Some(18.0)),
        RawMeasurement::new(date(2025, 2, 1), 167.8, Some(18.6)),
        RawMeasurement::new(date(2025, 3, 1), 150.0, Some(12.0)),
        RawMeasurement::new(date(2025, 4, 1), 100.0, None),
    ];

    let out = engine.calibrate_batch(&records);

    assert!((out[0].fat_percent_calibrated().unwrap() - 13.80).abs() < 0.01);
    assert!((out[0].weight.unwrap() - 168.7).abs() < 1e-9);

    assert_eq!(engine.fat_bias_for_weight(167.8), 4.0);
    assert!((out[1].fat_percent_calibrated().unwrap() - 14.6).abs() < 1e-9);

    assert!((out[2].fat_percent_calibrated().unwrap() - 9.576).abs() < 1e-3);

    assert_eq!(out[3].weight, Some(100.0));
    assert_eq!(out[3].fat_percent, None);
    assert!(out[3].composition.is_none());

    // Input untouched
    assert_eq!(records[0].weight, Some(170.0));
}

#[test]
fn test_anchor_continuity_for_default_tables() {
    let engine = default_engine();
    for anchor in &engine.tables().fat_bias_anchors {
        assert!((engine.fat_bias_for_weight(anchor.weight) - anchor.bias).abs() <= 1e-9);
    }
}

#[test]
fn test_store_calibrate_export_workflow() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("weight_fat.csv");
    std::fs::write(
        &csv_path,
        "date,weight,fat_percent\n\
         2025-01-01,170.0,18.0\n\
         2025-01-02,170.6,NA\n\
         2025-01-03,,18.0\n\
         2025-01-04,171.0,18.4\n",
    )
    .unwrap();

    let parsed = CsvImporter::new().import_file(&csv_path).unwrap();
    assert_eq!(parsed.measurements.len(), 3);

    let mut db = Database::new(dir.path().join("body_comp.db")).unwrap();
    assert_eq!(db.bulk_insert(&parsed.measurements, "csv_import").unwrap(), 3);

    let raw = db.measurements(None).unwrap();
    let calibrated = default_engine().calibrate_batch(&raw);
    assert_eq!(calibrated.len(), 3);
    assert!(calibrated[0].is_calibrated());
    assert!(!calibrated[1].is_calibrated());
    assert!(calibrated[2].is_calibrated());

    let summary = CompositionSummary::from_series(&calibrated);
    assert_eq!(summary.calibrated, 2);
    assert!((summary.weight_change.unwrap() - 1.0).abs() < 1e-9);

    let out_path = dir.path().join("export.csv");
    export::export_to_file(&calibrated, ExportFormat::Csv, &out_path).unwrap();
    let exported = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(exported.lines().count(), 4);
}

#[test]
fn test_swapping_tables_recomputes_history() {
    let raw = vec![RawMeasurement::new(date(2025, 1, 1), 170.0, Some(18.0))];

    let before = default_engine().calibrate_batch(&raw);

    let mut tables = CalibrationTables::default();
    tables.fat_bias_anchors = vec![
        FatBiasAnchor::new(160.0, 1.0),
        FatBiasAnchor::new(180.0, 1.0),
    ];
    let after = CalibrationEngine::new(tables).unwrap().calibrate_batch(&raw);

    assert!((after[0].fat_percent_calibrated().unwrap() - 17.0).abs() < 1e-9);
    assert_ne!(before[0].fat_percent_calibrated(), after[0].fat_percent_calibrated());
}

#[test]
fn test_config_with_broken_tables_refuses_engine() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = AppConfig::default();
    config.calibration.fat_bias_anchors.truncate(1);
    config.save_to_file(&path).unwrap();

    let loaded = AppConfig::load_from_file(&path).unwrap();
    assert!(loaded.build_engine().is_err());
}

#[test]
fn test_parallel_matches_sequential_on_large_batch() {
    let engine = default_engine();
    let records: Vec<RawMeasurement> = (0..2_000)
        .map(|i| RawMeasurement {
            date: date(2020, 1, 1) + chrono::Duration::days(i),
            weight: Some(140.0 + (i % 60) as f64),
            fat_percent: if i % 7 == 0 { None } else { Some(10.0 + (i % 15) as f64) },
        })
        .collect();

    assert_eq!(
        engine.calibrate_batch(&records),
        engine.calibrate_batch_parallel(&records)
    );
}

#[test]
fn test_reference_scans_and_events_alongside_series() {
    use bodycomp::models::ReferenceScan;
    use bodycomp::summary;

    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("body_comp.db")).unwrap();
    let engine = default_engine();

    db.add_measurement(date(2025, 3, 21), 172.8, Some(17.5), "app").unwrap();
    db.add_scan(&ReferenceScan {
        date: date(2025, 3, 21),
        weight: Some(171.5),
        fat_percent: Some(12.7),
        muscle_mass: Some(85.8),
    })
    .unwrap();
    db.add_event(date(2025, 3, 31), "Started Strength Training").unwrap();

    let calibrated = engine.calibrate_batch(&db.measurements(None).unwrap());
    let table = summary::render_scans(&db.scans().unwrap(), &calibrated);
    assert!(table.contains("2025-03-21"));
    assert!(table.contains("12.7"));

    assert_eq!(db.events().unwrap()[0].label, "Started Strength Training");
}

#[test]
fn test_non_finite_readings_never_break_the_clamp() {
    let engine = default_engine();
    let records = vec![
        RawMeasurement::new(date(2025, 1, 1), 170.0, Some("NaN".parse().unwrap())),
        RawMeasurement::new(date(2025, 1, 2), "inf".parse().unwrap(), Some(18.0)),
        RawMeasurement::new(date(2025, 1, 3), 170.0, Some(18.0)),
    ];

    for out in engine.calibrate_batch(&records) {
        if let Some(fat) = out.fat_percent_calibrated() {
            assert!((5.0..=35.0).contains(&fat));
        }
    }

    let out = engine.calibrate_batch(&records);
    assert!(!out[0].is_calibrated());
    assert!(!out[1].is_calibrated());
    assert!(out[2].is_calibrated());
}
