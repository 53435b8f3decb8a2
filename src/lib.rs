// Library interface for bodycomp modules
// This allows integration tests and benches to access the core functionality

pub mod calibration;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod models;
pub mod summary;

// Re-export commonly used types for convenience
pub use calibration::{
    CalibrationEngine, CalibrationTables, FatBiasAnchor, FatBiasCurve, MuscleCalibration,
    MuscleModel, SharedCalibration,
};
pub use config::AppConfig;
pub use database::{Database, MeasurementSource};
pub use error::{BodyCompError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{BodyComposition, CalibratedMeasurement, Event, RawMeasurement, ReferenceScan};
