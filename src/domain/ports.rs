use crate::domain::types::PriceRow;
use anyhow::Result;
use async_trait::async_trait;

/// Source of chronologically ordered daily bars for a ticker.
///
/// An empty `Ok(vec![])` means the provider had nothing for the symbol;
/// callers map that to `NoData`. Implementations should impose their own
/// request timeout, fetches have no other deadline.
#[async_trait]
pub trait PriceHistoryService: Send + Sync {
    async fn fetch_daily(&self, ticker: &str) -> Result<Vec<PriceRow>>;
}

/// A trained regression model over flattened feature windows.
///
/// Inputs are row-major `window_length * FEATURE_COUNT` vectors of
/// normalized features; outputs are normalized close values.
pub trait PriceModel: Send + Sync {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;
    fn to_bytes(&self) -> Result<Vec<u8>>;
}

/// Factory for the opaque model capability: fit on normalized training
/// pairs, or restore a previously serialized model. Keeping the technique
/// behind this seam means windowing/scaling/lifecycle never name it.
pub trait ModelBackend: Send + Sync {
    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn PriceModel>>;
    fn from_bytes(&self, bytes: &[u8]) -> Result<Box<dyn PriceModel>>;
}

/// Persistent artifact store keyed by canonicalized ticker.
///
/// `put` must publish the (model, scaler) pair atomically from a reader's
/// perspective: `get`/`exists` never observe a model without its scaler.
/// `delete` is idempotent.
pub trait ModelStore: Send + Sync {
    fn exists(&self, ticker: &str) -> bool;
    fn put(&self, ticker: &str, model: &[u8], scaler: &[u8]) -> Result<()>;
    fn get(&self, ticker: &str) -> Result<Option<StoredArtifact>>;
    fn delete(&self, ticker: &str) -> Result<()>;
}

/// Raw bytes of a persisted (model, scaler) pair.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub model: Vec<u8>,
    pub scaler: Vec<u8>,
}
