//! Body-composition calibration engine
//!
//! Converts raw bio-impedance scale readings into corrected fat%, muscle%,
//! fat mass and muscle mass. Each record is calibrated from its own weight
//! and fat% alone, so batches can be processed in any order or in parallel.
//!
//! Pipeline per record:
//! 1. corrected weight = raw weight − weight bias
//! 2. fat bias looked up on the *raw* weight (the basis the anchors were
//!    measured against)
//! 3. corrected fat% = clamp(raw fat% − fat bias, 5, 35)
//! 4. muscle% = affine(muscle model(corrected weight, corrected fat%))
//! 5. masses = corrected weight × percentage / 100

use rayon::prelude::*;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::error::CalibrationError;
use crate::models::{BodyComposition, CalibratedMeasurement, RawMeasurement};

pub mod fat_bias;
pub mod tables;

pub use fat_bias::FatBiasCurve;
pub use tables::{CalibrationTables, FatBiasAnchor, MuscleCalibration, MuscleModel};

/// Lowest plausible corrected fat%
pub const FAT_PERCENT_FLOOR: f64 = 5.0;

/// Highest plausible corrected fat%
pub const FAT_PERCENT_CEILING: f64 = 35.0;

/// Stateless calibration engine over a validated, immutable table set
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    tables: CalibrationTables,
    fat_bias: FatBiasCurve,
}

impl CalibrationEngine {
    /// Validate the tables and build an engine.
    ///
    /// Fails on tables that would produce NaN or infinite output, so a bad
    /// configuration is caught once here instead of on every record.
    pub fn new(tables: CalibrationTables) -> Result<Self, CalibrationError> {
        tables.validate()?;
        let fat_bias = FatBiasCurve::new(&tables.fat_bias_anchors)?;

        debug!(
            anchors = tables.fat_bias_anchors.len(),
            weight_bias = tables.weight_bias,
            "Calibration engine initialised"
        );

        Ok(Self { tables, fat_bias })
    }

    pub fn tables(&self) -> &CalibrationTables {
        &self.tables
    }

    /// Fat% bias at a raw (uncorrected) scale weight
    pub fn fat_bias_for_weight(&self, raw_weight: f64) -> f64 {
        self.fat_bias.bias_at(raw_weight)
    }

    /// Corrected weight and composition for one raw weight/fat% pair.
    ///
    /// Expects a positive finite weight and a finite fat%.
    /// [`calibrate`](Self::calibrate) checks both before calling.
    pub fn compose(&self, raw_weight: f64, raw_fat_percent: f64) -> (f64, BodyComposition) {
        let weight = raw_weight - self.tables.weight_bias;

        let fat_percent_calibrated = (raw_fat_percent - self.fat_bias_for_weight(raw_weight))
            .clamp(FAT_PERCENT_FLOOR, FAT_PERCENT_CEILING);

        let raw_muscle = self
            .tables
            .muscle_model
            .estimate(weight, fat_percent_calibrated);
        let muscle_percent = self.tables.muscle_calibration.apply(raw_muscle);

        let composition = BodyComposition {
            fat_percent_calibrated,
            muscle_percent,
            fat_mass: weight * fat_percent_calibrated / 100.0,
            muscle_mass: weight * muscle_percent / 100.0,
        };

        (weight, composition)
    }

    /// Calibrate a single record.
    ///
    /// Records missing either weight or fat% come back unchanged.
    pub fn calibrate(&self, record: &RawMeasurement) -> CalibratedMeasurement {
        let Some((raw_weight, raw_fat_percent)) = record.calibration_inputs() else {
            return CalibratedMeasurement::passthrough(record);
        };

        let (weight, composition) = self.compose(raw_weight, raw_fat_percent);

        CalibratedMeasurement {
            date: record.date,
            weight: Some(weight),
            fat_percent: record.fat_percent,
            composition: Some(composition),
        }
    }

    /// Calibrate every record, one output per input in the same order
    pub fn calibrate_batch(&self, records: &[RawMeasurement]) -> Vec<CalibratedMeasurement> {
        let calibrated: Vec<CalibratedMeasurement> =
            records.iter().map(|record| self.calibrate(record)).collect();

        log_batch(&calibrated);
        calibrated
    }

    /// Same contract as [`calibrate_batch`](Self::calibrate_batch), computed
    /// on the rayon thread pool. Output order matches input order.
    pub fn calibrate_batch_parallel(
        &self,
        records: &[RawMeasurement],
    ) -> Vec<CalibratedMeasurement> {
        let calibrated: Vec<CalibratedMeasurement> = records
            .par_iter()
            .map(|record| self.calibrate(record))
            .collect();

        log_batch(&calibrated);
        calibrated
    }
}

fn log_batch(calibrated: &[CalibratedMeasurement]) {
    let count = calibrated.iter().filter(|m| m.is_calibrated()).count();
    debug!(
        records = calibrated.len(),
        calibrated = count,
        skipped = calibrated.len() - count,
        "Calibrated measurement batch"
    );
}

/// Calibration engine that can be swapped at runtime.
///
/// Callers take a snapshot with [`current`](Self::current); a reload
/// validates the new tables first and then publishes the new engine with a
/// single pointer swap, so no caller ever sees a partly updated table.
#[derive(Debug)]
pub struct SharedCalibration {
    current: RwLock<Arc<CalibrationEngine>>,
}

impl SharedCalibration {
    pub fn new(engine: CalibrationEngine) -> Self {
        Self {
            current: RwLock::new(Arc::new(engine)),
        }
    }

    pub fn from_tables(tables: CalibrationTables) -> Result<Self, CalibrationError> {
        Ok(Self::new(CalibrationEngine::new(tables)?))
    }

    /// Snapshot of the engine in effect right now
    pub fn current(&self) -> Arc<CalibrationEngine> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the tables. On error the current engine stays in place.
    pub fn reload(&self, tables: CalibrationTables) -> Result<(), CalibrationError> {
        let engine = Arc::new(CalibrationEngine::new(tables)?);

        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = engine;

        info!("Calibration tables reloaded");
        Ok(())
    }

    pub fn calibrate_batch(&self, records: &[RawMeasurement]) -> Vec<CalibratedMeasurement> {
        self.current().calibrate_batch(records)
    }
}
