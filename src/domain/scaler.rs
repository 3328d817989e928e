//! Per-ticker min-max normalization.
//!
//! Fitted exactly once over the training feature matrix and persisted beside
//! the model; every later transform or inversion for that ticker must reuse
//! the stored state. Refitting would silently shift the scale under an
//! already-trained model.

use crate::domain::errors::PredictionError;
use crate::domain::types::{FeatureRow, CLOSE_IDX, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fits per-column bounds over the full cleaned feature matrix,
    /// mapping each column onto [0, 1].
    pub fn fit(rows: &[FeatureRow]) -> Result<Self, PredictionError> {
        if rows.is_empty() {
            return Err(PredictionError::BadInput {
                reason: "cannot fit scaler on an empty feature matrix".to_string(),
            });
        }

        let mut min = vec![f64::INFINITY; FEATURE_COUNT];
        let mut max = vec![f64::NEG_INFINITY; FEATURE_COUNT];
        for row in rows {
            for (col, &v) in row.iter().enumerate() {
                min[col] = min[col].min(v);
                max[col] = max[col].max(v);
            }
        }
        Ok(Self { min, max })
    }

    /// Restores a persisted scaler, rejecting malformed state so a corrupt
    /// artifact fails loudly instead of producing shifted prices.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PredictionError> {
        let scaler: Self =
            serde_json::from_slice(bytes).map_err(|_| PredictionError::UnfittedScaler)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PredictionError> {
        serde_json::to_vec(self).map_err(|e| PredictionError::Internal(e.into()))
    }

    fn validate(&self) -> Result<(), PredictionError> {
        let well_formed = self.min.len() == FEATURE_COUNT
            && self.max.len() == FEATURE_COUNT
            && self
                .min
                .iter()
                .zip(&self.max)
                .all(|(lo, hi)| lo.is_finite() && hi.is_finite() && lo <= hi);
        if well_formed {
            Ok(())
        } else {
            Err(PredictionError::UnfittedScaler)
        }
    }

    fn scale(&self, col: usize, v: f64) -> f64 {
        let span = self.max[col] - self.min[col];
        // Constant column: map to 0.0, the inverse returns the stored min.
        if span == 0.0 {
            0.0
        } else {
            (v - self.min[col]) / span
        }
    }

    pub fn transform_row(&self, row: &FeatureRow) -> FeatureRow {
        let mut out = [0.0; FEATURE_COUNT];
        for (col, &v) in row.iter().enumerate() {
            out[col] = self.scale(col, v);
        }
        out
    }

    pub fn transform(&self, rows: &[FeatureRow]) -> Vec<FeatureRow> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    /// Inverts a normalized close value back to the original price scale.
    /// Only the close column matters; the model predicts nothing else.
    pub fn inverse_close(&self, normalized: f64) -> f64 {
        let span = self.max[CLOSE_IDX] - self.min[CLOSE_IDX];
        if span == 0.0 {
            self.min[CLOSE_IDX]
        } else {
            normalized * span + self.min[CLOSE_IDX]
        }
    }
}
