use thiserror::Error;

/// Errors surfaced by the prediction and model-lifecycle paths.
///
/// Background-training failures are deliberately absent from any caller's
/// return type: they are logged and recorded in the per-ticker training
/// state, and observable only through `/status`.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Invalid input: {reason}")]
    BadInput { reason: String },

    #[error("No price data available for {ticker}")]
    NoData { ticker: String },

    #[error("Insufficient data: need at least {needed} valid rows, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Model for {ticker} not found. Train the model first.")]
    ModelNotFound { ticker: String },

    #[error("Scaler state is unfitted or malformed")]
    UnfittedScaler,

    #[error("Upload is missing required columns: {columns:?}")]
    MissingColumns { columns: Vec<String> },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
