use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single scale reading as logged or imported.
///
/// Both numeric fields are optional: a reading with only a weight is valid
/// but cannot be calibrated. Neither can one whose weight is not a positive
/// finite number or whose fat% is not finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    /// Day of the reading (one reading per day)
    pub date: NaiveDate,

    /// Raw scale weight in pounds
    pub weight: Option<f64>,

    /// Raw bio-impedance fat percentage reported by the scale
    pub fat_percent: Option<f64>,
}

impl RawMeasurement {
    pub fn new(date: NaiveDate, weight: f64, fat_percent: Option<f64>) -> Self {
        Self {
            date,
            weight: Some(weight),
            fat_percent,
        }
    }

    /// Weight and fat% together, when both are present and usable.
    pub fn calibration_inputs(&self) -> Option<(f64, f64)> {
        match (self.weight, self.fat_percent) {
            (Some(weight), Some(fat_percent))
                if weight.is_finite() && weight > 0.0 && fat_percent.is_finite() =>
            {
                Some((weight, fat_percent))
            }
            _ => None,
        }
    }
}

/// Corrected body-composition estimates derived from one reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyComposition {
    /// Bias-corrected fat percentage, always within [5, 35]
    pub fat_percent_calibrated: f64,

    /// Calibrated muscle percentage
    pub muscle_percent: f64,

    /// Fat mass in pounds
    pub fat_mass: f64,

    /// Muscle mass in pounds
    pub muscle_mass: f64,
}

/// A reading after passing through the calibration engine.
///
/// When `composition` is present, `weight` holds the corrected weight and the
/// raw value is not retained. When it is absent the record is identical to
/// its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedMeasurement {
    pub date: NaiveDate,

    pub weight: Option<f64>,

    /// Raw scale fat% as read, kept for reference
    pub fat_percent: Option<f64>,

    #[serde(flatten)]
    pub composition: Option<BodyComposition>,
}

impl CalibratedMeasurement {
    /// Wrap a raw reading that could not be calibrated
    pub fn passthrough(raw: &RawMeasurement) -> Self {
        Self {
            date: raw.date,
            weight: raw.weight,
            fat_percent: raw.fat_percent,
            composition: None,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.composition.is_some()
    }

    pub fn fat_percent_calibrated(&self) -> Option<f64> {
        self.composition.map(|c| c.fat_percent_calibrated)
    }

    pub fn muscle_percent(&self) -> Option<f64> {
        self.composition.map(|c| c.muscle_percent)
    }

    pub fn fat_mass(&self) -> Option<f64> {
        self.composition.map(|c| c.fat_mass)
    }

    pub fn muscle_mass(&self) -> Option<f64> {
        self.composition.map(|c| c.muscle_mass)
    }
}

/// Gold-standard body-composition scan (e.g. InBody or DEXA) kept as a
/// reference point against the calibrated scale series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceScan {
    pub date: NaiveDate,

    /// Weight measured by the scanner (lbs)
    pub weight: Option<f64>,

    pub fat_percent: Option<f64>,

    /// Skeletal muscle mass (lbs)
    pub muscle_mass: Option<f64>,
}

/// Dated annotation shown alongside the series ("Started strength training")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub date: NaiveDate,
    pub label: String,
}
