//! Per-ticker model lifecycle: train, persist, load, predict, evaluate,
//! delete.
//!
//! Training is fire-and-forget: the HTTP caller gets an immediate
//! acknowledgment and can only poll `/status` for completion. Failures in
//! the background task are logged and recorded in the per-ticker state,
//! never returned to the original caller.

use crate::domain::errors::PredictionError;
use crate::domain::metrics::{self, EvaluationMetrics};
use crate::domain::ports::{ModelBackend, ModelStore, PriceHistoryService, PriceModel};
use crate::domain::scaler::MinMaxScaler;
use crate::domain::types::{canonical_ticker, FeatureRow, PriceRow};
use crate::domain::windowing;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Observable per-ticker training state. `Ready` is derived from artifact
/// existence so it survives restarts; `Training` and `Failed` live only in
/// process memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrainingState {
    Absent,
    Training,
    Ready,
    Failed { reason: String },
}

/// Outcome of a training request, before the background task runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainOutcome {
    Started,
    AlreadyExists,
}

pub struct ModelLifecycle {
    store: Arc<dyn ModelStore>,
    history: Arc<dyn PriceHistoryService>,
    backend: Arc<dyn ModelBackend>,
    window_length: usize,
    states: Mutex<HashMap<String, TrainingState>>,
    // One mutex per ticker so concurrent trainings of the same symbol
    // serialize on the fetch/fit/persist section instead of racing on the
    // artifact path. Different tickers train in parallel.
    train_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ModelLifecycle {
    pub fn new(
        store: Arc<dyn ModelStore>,
        history: Arc<dyn PriceHistoryService>,
        backend: Arc<dyn ModelBackend>,
        window_length: usize,
    ) -> Self {
        Self {
            store,
            history,
            backend,
            window_length,
            states: Mutex::new(HashMap::new()),
            train_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    fn train_lock(&self, ticker: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.train_locks.lock().expect("train lock map poisoned");
        locks
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drops the lock entry once nobody else is waiting on it, so the map
    /// does not grow with every distinct ticker ever trained.
    fn release_train_lock(&self, ticker: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.train_locks.lock().expect("train lock map poisoned");
        // two handles left means the map's and ours: no waiters
        if Arc::strong_count(lock) <= 2 {
            locks.remove(ticker);
        }
    }

    fn set_state(&self, ticker: &str, state: TrainingState) {
        let mut states = self.states.lock().expect("state map poisoned");
        states.insert(ticker.to_string(), state);
    }

    /// `Ready` and `Absent` are derived from artifact existence, so their
    /// map entries can simply be dropped. `Training`/`Failed` entries stay
    /// until the ticker is retrained or deleted.
    fn clear_state(&self, ticker: &str) {
        let mut states = self.states.lock().expect("state map poisoned");
        states.remove(ticker);
    }

    pub fn training_state(&self, ticker: &str) -> TrainingState {
        let ticker = canonical_ticker(ticker);
        if self.store.exists(&ticker) {
            return TrainingState::Ready;
        }
        let states = self.states.lock().expect("state map poisoned");
        states.get(&ticker).cloned().unwrap_or(TrainingState::Absent)
    }

    /// Checks for existing artifacts and, when absent, spawns the training
    /// task. Returns immediately in both cases.
    pub fn begin_training(self: &Arc<Self>, ticker: &str) -> Result<TrainOutcome, PredictionError> {
        let ticker = validated_ticker(ticker)?;
        if self.store.exists(&ticker) {
            return Ok(TrainOutcome::AlreadyExists);
        }

        self.set_state(&ticker, TrainingState::Training);
        let lifecycle = Arc::clone(self);
        let spawned = ticker.clone();
        tokio::spawn(async move {
            lifecycle.run_training(&spawned).await;
        });
        info!(ticker = %ticker, "Training task dispatched");
        Ok(TrainOutcome::Started)
    }

    /// The background training body. Public so integration tests can await
    /// it directly instead of polling the spawned task.
    pub async fn run_training(&self, ticker: &str) {
        let ticker = canonical_ticker(ticker);
        let lock = self.train_lock(&ticker);
        let guard = lock.lock().await;

        // A concurrent train may have finished while we waited on the lock.
        if self.store.exists(&ticker) {
            info!(ticker = %ticker, "Model already present, skipping training");
            self.clear_state(&ticker);
        } else {
            self.set_state(&ticker, TrainingState::Training);
            match self.train_inner(&ticker).await {
                Ok(()) => {
                    info!(ticker = %ticker, "Model trained and persisted");
                    self.clear_state(&ticker);
                }
                Err(e) => {
                    error!(ticker = %ticker, error = %e, "Training failed");
                    self.set_state(
                        &ticker,
                        TrainingState::Failed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        drop(guard);
        self.release_train_lock(&ticker, &lock);
    }

    async fn train_inner(&self, ticker: &str) -> Result<(), PredictionError> {
        let rows = self.fetch_rows(ticker).await?;
        let features: Vec<FeatureRow> = rows.iter().map(PriceRow::features).collect();

        let scaler = MinMaxScaler::fit(&features)?;
        let scaled = scaler.transform(&features);
        let (windows, targets) = windowing::make_windows(&scaled, self.window_length);
        if windows.is_empty() {
            return Err(PredictionError::InsufficientData {
                needed: self.window_length + 1,
                got: features.len(),
            });
        }

        let x: Vec<Vec<f64>> = windows.iter().map(windowing::flatten).collect();
        info!(
            ticker = %ticker,
            samples = x.len(),
            window_length = self.window_length,
            "Fitting model"
        );
        let model = self.backend.fit(&x, &targets)?;

        self.store
            .put(ticker, &model.to_bytes()?, &scaler.to_bytes()?)?;
        Ok(())
    }

    /// Predicts the next close price from the provider's most recent window.
    pub async fn predict(&self, ticker: &str) -> Result<f64, PredictionError> {
        let ticker = validated_ticker(ticker)?;
        let (model, scaler) = self.load_artifact(&ticker)?;

        let rows = self.fetch_rows(&ticker).await?;
        let features: Vec<FeatureRow> = rows.iter().map(PriceRow::features).collect();
        let scaled = scaler.transform(&features);

        let window = windowing::latest_window(&scaled, self.window_length).ok_or(
            PredictionError::InsufficientData {
                needed: self.window_length,
                got: features.len(),
            },
        )?;

        let predictions = model.predict(&[windowing::flatten(&window)])?;
        let normalized = predictions
            .first()
            .copied()
            .ok_or_else(|| PredictionError::Internal(anyhow::anyhow!("model returned no output")))?;
        Ok(scaler.inverse_close(normalized))
    }

    /// Predicts from user-supplied feature rows instead of the live
    /// provider, reusing the ticker's persisted scaler. Fewer than
    /// `window_length + 1` rows produce an empty list, not an error.
    pub fn predict_from_rows(
        &self,
        ticker: &str,
        rows: &[FeatureRow],
    ) -> Result<Vec<f64>, PredictionError> {
        let ticker = validated_ticker(ticker)?;
        let (model, scaler) = self.load_artifact(&ticker)?;

        let scaled = scaler.transform(rows);
        let (windows, _) = windowing::make_windows(&scaled, self.window_length);
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let x: Vec<Vec<f64>> = windows.iter().map(windowing::flatten).collect();
        let predictions = model.predict(&x)?;
        Ok(predictions
            .into_iter()
            .map(|p| scaler.inverse_close(p))
            .collect())
    }

    /// Scores the model on the chronologically newest 20% of the windowed
    /// history. Too little history yields `Ok(None)`, not an error.
    pub async fn evaluate(&self, ticker: &str) -> Result<Option<EvaluationMetrics>, PredictionError> {
        let ticker = validated_ticker(ticker)?;
        let (model, scaler) = self.load_artifact(&ticker)?;

        let rows = match self.history.fetch_daily(&ticker).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Evaluation fetch failed");
                return Ok(None);
            }
        };
        let features: Vec<FeatureRow> = rows.iter().map(PriceRow::features).collect();
        let scaled = scaler.transform(&features);

        let (windows, targets) = windowing::make_windows(&scaled, self.window_length);
        let test_size = windows.len() / 5;
        if test_size == 0 {
            return Ok(None);
        }

        let x: Vec<Vec<f64>> = windows[windows.len() - test_size..]
            .iter()
            .map(windowing::flatten)
            .collect();
        let y = &targets[targets.len() - test_size..];

        let predicted: Vec<f64> = model
            .predict(&x)?
            .into_iter()
            .map(|p| scaler.inverse_close(p))
            .collect();
        let real: Vec<f64> = y.iter().map(|&t| scaler.inverse_close(t)).collect();

        Ok(metrics::evaluate(&predicted, &real))
    }

    /// Removes the ticker's artifacts. Idempotent: deleting an absent
    /// ticker succeeds silently.
    pub fn delete(&self, ticker: &str) -> Result<(), PredictionError> {
        let ticker = validated_ticker(ticker)?;
        self.store.delete(&ticker)?;
        self.clear_state(&ticker);
        info!(ticker = %ticker, "Model artifacts removed");
        Ok(())
    }

    pub fn model_exists(&self, ticker: &str) -> bool {
        self.store.exists(&canonical_ticker(ticker))
    }

    fn load_artifact(
        &self,
        ticker: &str,
    ) -> Result<(Box<dyn PriceModel>, MinMaxScaler), PredictionError> {
        let artifact = self
            .store
            .get(ticker)?
            .ok_or_else(|| PredictionError::ModelNotFound {
                ticker: ticker.to_string(),
            })?;
        let scaler = MinMaxScaler::from_bytes(&artifact.scaler)?;
        let model = self.backend.from_bytes(&artifact.model)?;
        Ok((model, scaler))
    }

    async fn fetch_rows(&self, ticker: &str) -> Result<Vec<PriceRow>, PredictionError> {
        let rows = self.history.fetch_daily(ticker).await?;
        if rows.is_empty() {
            return Err(PredictionError::NoData {
                ticker: ticker.to_string(),
            });
        }
        Ok(rows)
    }
}

fn validated_ticker(raw: &str) -> Result<String, PredictionError> {
    let ticker = canonical_ticker(raw);
    if ticker.is_empty() {
        return Err(PredictionError::BadInput {
            reason: "ticker must not be empty".to_string(),
        });
    }
    Ok(ticker)
}

#[cfg(test)]
impl ModelLifecycle {
    pub(crate) fn train_lock_entries(&self) -> usize {
        self.train_locks.lock().unwrap().len()
    }

    pub(crate) fn state_entries(&self) -> usize {
        self.states.lock().unwrap().len()
    }
}
