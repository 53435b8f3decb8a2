//! Weight-dependent fat% bias curve
//!
//! The scale's BIA estimate over-reads fat% by an amount that grows with
//! lean mass, so the bias is modelled as a piecewise-linear function of raw
//! scale weight. Between anchors the curve interpolates; beyond either end
//! it extends the adjacent segment.

use crate::calibration::tables::{validate_anchors, FatBiasAnchor};
use crate::error::CalibrationError;

/// Validated piecewise-linear bias curve over raw scale weight
#[derive(Debug, Clone, PartialEq)]
pub struct FatBiasCurve {
    anchors: Vec<FatBiasAnchor>,
}

impl FatBiasCurve {
    /// Build a curve, rejecting tables that cannot define a finite slope
    /// on every segment.
    pub fn new(anchors: &[FatBiasAnchor]) -> Result<Self, CalibrationError> {
        validate_anchors(anchors)?;
        Ok(Self {
            anchors: anchors.to_vec(),
        })
    }

    pub fn anchors(&self) -> &[FatBiasAnchor] {
        &self.anchors
    }

    /// Fat% bias (percentage points) at a raw scale weight.
    ///
    /// Each branch evaluates the line from the anchor nearest its own side,
    /// so the value at any anchor weight is that anchor's bias exactly.
    pub fn bias_at(&self, raw_weight: f64) -> f64 {
        let anchors = &self.anchors;
        let last = anchors.len() - 1;

        if raw_weight <= anchors[0].weight {
            let slope = segment_slope(&anchors[0], &anchors[1]);
            return anchors[0].bias + slope * (raw_weight - anchors[0].weight);
        }

        if raw_weight >= anchors[last].weight {
            let slope = segment_slope(&anchors[last - 1], &anchors[last]);
            return anchors[last].bias + slope * (raw_weight - anchors[last].weight);
        }

        // anchors[0].weight < raw_weight < anchors[last].weight
        let upper = anchors.partition_point(|a| a.weight <= raw_weight);
        let (left, right) = (&anchors[upper - 1], &anchors[upper]);
        let fraction = (raw_weight - left.weight) / (right.weight - left.weight);

        left.bias + fraction * (right.bias - left.bias)
    }
}

fn segment_slope(left: &FatBiasAnchor, right: &FatBiasAnchor) -> f64 {
    (right.bias - left.bias) / (right.weight - left.weight)
}
