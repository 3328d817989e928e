//! Evaluation metrics, computed on denormalized (original-scale) prices.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
}

/// MAE and RMSE over paired predicted/real prices. `None` when there is
/// nothing to score, which the status endpoint reports as null metrics.
pub fn evaluate(predicted: &[f64], real: &[f64]) -> Option<EvaluationMetrics> {
    if predicted.is_empty() || predicted.len() != real.len() {
        return None;
    }
    let n = predicted.len() as f64;
    let mae = predicted
        .iter()
        .zip(real)
        .map(|(p, r)| (p - r).abs())
        .sum::<f64>()
        / n;
    let mse = predicted
        .iter()
        .zip(real)
        .map(|(p, r)| (p - r).powi(2))
        .sum::<f64>()
        / n;
    Some(EvaluationMetrics { mae, rmse: mse.sqrt() })
}
