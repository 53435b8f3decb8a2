//! Calibration constant tables
//!
//! All values are fitted offline against gold-standard reference scans and
//! supplied as configuration. Nothing here is refit at runtime.

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Linear model estimating raw muscle% from corrected weight and fat%
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MuscleModel {
    pub intercept: f64,
    pub weight_coef: f64,
    pub fat_coef: f64,
}

impl MuscleModel {
    /// Raw muscle% for a corrected weight (lbs) and corrected fat%
    pub fn estimate(&self, weight: f64, fat_percent: f64) -> f64 {
        self.intercept + weight * self.weight_coef + fat_percent * self.fat_coef
    }
}

/// Affine correction aligning the muscle model with reference scans
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MuscleCalibration {
    pub slope: f64,
    pub intercept: f64,
}

impl MuscleCalibration {
    pub fn apply(&self, raw_muscle_percent: f64) -> f64 {
        self.slope * raw_muscle_percent + self.intercept
    }
}

/// One reference occasion: the raw scale weight and the fat% bias
/// (scale fat% minus reference fat%) observed at that weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatBiasAnchor {
    /// Raw scale weight in pounds
    pub weight: f64,

    /// Fat% over-estimate in percentage points
    pub bias: f64,
}

impl FatBiasAnchor {
    pub const fn new(weight: f64, bias: f64) -> Self {
        Self { weight, bias }
    }
}

/// Complete set of constants consumed by the calibration engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTables {
    /// Constant subtracted from every raw scale weight (lbs)
    pub weight_bias: f64,

    /// Muscle% regression on corrected inputs
    pub muscle_model: MuscleModel,

    /// Affine correction of the muscle model output
    pub muscle_calibration: MuscleCalibration,

    /// Fat% bias anchors, strictly ascending by raw weight
    pub fat_bias_anchors: Vec<FatBiasAnchor>,
}

impl Default for CalibrationTables {
    /// Anchor-based tables fitted against two InBody scans and one
    /// hydrostatic weighing, each paired with the scale readings taken
    /// around the same day.
    fn default() -> Self {
        Self {
            weight_bias: 1.3,
            muscle_model: MuscleModel {
                intercept: 48.859072,
                weight_coef: 0.0118987,
                fat_coef: -0.585404,
            },
            muscle_calibration: MuscleCalibration {
                slope: 1.1320982,
                intercept: 0.8285357,
            },
            fat_bias_anchors: vec![
                FatBiasAnchor::new(167.8, 4.0),
                FatBiasAnchor::new(172.347, 4.4028),
                FatBiasAnchor::new(183.0, 7.1),
            ],
        }
    }
}

impl CalibrationTables {
    /// Check every table for values that would turn into NaN or infinity
    /// during calibration.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let scalars = [
            ("weight_bias", self.weight_bias),
            ("muscle_model.intercept", self.muscle_model.intercept),
            ("muscle_model.weight_coef", self.muscle_model.weight_coef),
            ("muscle_model.fat_coef", self.muscle_model.fat_coef),
            ("muscle_calibration.slope", self.muscle_calibration.slope),
            ("muscle_calibration.intercept", self.muscle_calibration.intercept),
        ];
        for (field, value) in scalars {
            ensure_finite(field, value)?;
        }

        validate_anchors(&self.fat_bias_anchors)
    }
}

/// At least two finite anchors, strictly ascending by weight.
pub(crate) fn validate_anchors(anchors: &[FatBiasAnchor]) -> Result<(), CalibrationError> {
    if anchors.len() < 2 {
        return Err(CalibrationError::TooFewAnchors {
            count: anchors.len(),
        });
    }

    for (index, anchor) in anchors.iter().enumerate() {
        ensure_finite(&format!("fat_bias_anchors[{}].weight", index), anchor.weight)?;
        ensure_finite(&format!("fat_bias_anchors[{}].bias", index), anchor.bias)?;
    }

    for (index, pair) in anchors.windows(2).enumerate() {
        if pair[1].weight <= pair[0].weight {
            return Err(CalibrationError::UnorderedAnchors {
                index: index + 1,
                weight: pair[1].weight,
                previous: pair[0].weight,
            });
        }
    }

    Ok(())
}

fn ensure_finite(field: &str, value: f64) -> Result<(), CalibrationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CalibrationError::NonFinite {
            field: field.to_string(),
            value,
        })
    }
}
