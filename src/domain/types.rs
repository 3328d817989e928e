use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of features fed to the model per trading day.
pub const FEATURE_COUNT: usize = 5;

/// Index of the close price inside a [`FeatureRow`]. The model predicts
/// close, and the scaler inverts only this column.
pub const CLOSE_IDX: usize = 0;

/// One day of features in the fixed order close, high, low, open, volume.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// A fixed-length run of contiguous feature rows forming one model input.
pub type Window = Vec<FeatureRow>;

/// One cleaned daily bar from the price-history provider.
///
/// Rows with missing or non-numeric fields are dropped before they ever
/// become a `PriceRow`; chronological ordering is the provider's contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceRow {
    pub fn features(&self) -> FeatureRow {
        [self.close, self.high, self.low, self.open, self.volume]
    }
}

/// Canonical form of a ticker symbol used for state and artifact keys.
/// Uppercasing must happen exactly once, here, or artifacts written by
/// training become unreachable from predict.
pub fn canonical_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}
