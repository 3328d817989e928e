use crate::application::lifecycle::{TrainOutcome, TrainingState};
use crate::domain::errors::PredictionError;
use crate::domain::metrics::EvaluationMetrics;
use crate::infrastructure::{csv_rows, telemetry};
use crate::interfaces::http::AppState;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TrainQuery {
    pub ticker: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    pub ticker: String,
}

#[derive(Debug, Deserialize)]
pub struct TickerQuery {
    pub ticker: String,
}

// ── Responses ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub ticker: String,
    pub predicted_price: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct MetricsBody {
    #[serde(rename = "MAE")]
    pub mae: Option<f64>,
    #[serde(rename = "RMSE")]
    pub rmse: Option<f64>,
}

impl From<Option<EvaluationMetrics>> for MetricsBody {
    fn from(metrics: Option<EvaluationMetrics>) -> Self {
        Self {
            mae: metrics.map(|m| m.mae),
            rmse: metrics.map(|m| m.rmse),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub model_exists: bool,
    pub training_state: TrainingState,
    pub performance_metrics: MetricsBody,
    pub system_usage: telemetry::SystemUsage,
}

// ── Error mapping ───────────────────────────────────────────────────

pub struct ApiError(PredictionError);

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PredictionError::BadInput { .. }
            | PredictionError::MissingColumns { .. }
            | PredictionError::InsufficientData { .. } => StatusCode::BAD_REQUEST,
            PredictionError::NoData { .. } | PredictionError::ModelNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            PredictionError::UnfittedScaler | PredictionError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /train — ticker from the query string or, failing that, the JSON
/// body. Dispatches fire-and-forget training; the caller polls /status.
pub async fn train(
    State(state): State<AppState>,
    Query(query): Query<TrainQuery>,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    // Query string takes precedence over the request body.
    let from_body = || {
        serde_json::from_slice::<TrainRequest>(&body)
            .ok()
            .map(|req| req.ticker)
    };
    let ticker = query
        .ticker
        .or_else(from_body)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| PredictionError::BadInput {
            reason: "Ticker not provided. Pass it as a query parameter or JSON body.".to_string(),
        })?;

    match state.lifecycle.begin_training(&ticker)? {
        TrainOutcome::AlreadyExists => Ok((
            StatusCode::OK,
            Json(json!({
                "message": format!("Model for {} already exists.", canonical(&ticker))
            })),
        )
            .into_response()),
        TrainOutcome::Started => Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "message": format!(
                    "Training started for {}. The model will be available once training completes.",
                    canonical(&ticker)
                )
            })),
        )
            .into_response()),
    }
}

/// GET /predict — next-day close prediction from live provider data.
pub async fn predict(
    State(state): State<AppState>,
    Query(query): Query<TickerQuery>,
) -> Result<Json<PredictResponse>, ApiError> {
    let predicted_price = state.lifecycle.predict(&query.ticker).await?;
    Ok(Json(PredictResponse {
        ticker: canonical(&query.ticker),
        predicted_price,
    }))
}

/// GET /status — artifact existence, training state, evaluation metrics
/// and a system-usage snapshot.
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<TickerQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let lifecycle = &state.lifecycle;
    let model_exists = lifecycle.model_exists(&query.ticker);

    let metrics = if model_exists {
        match lifecycle.evaluate(&query.ticker).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(ticker = %query.ticker, error = %e, "Evaluation failed");
                None
            }
        }
    } else {
        None
    };

    let system_usage = tokio::task::spawn_blocking(telemetry::snapshot)
        .await
        .map_err(|e| PredictionError::Internal(e.into()))?;

    Ok(Json(StatusResponse {
        model_exists,
        training_state: lifecycle.training_state(&query.ticker),
        performance_metrics: metrics.into(),
        system_usage,
    }))
}

/// POST /predict_from_file — predictions over an uploaded CSV table using
/// the ticker's already-fitted scaler and model.
pub async fn predict_from_file(
    State(state): State<AppState>,
    Query(query): Query<TickerQuery>,
    mut multipart: Multipart,
) -> Result<Json<PredictionsResponse>, ApiError> {
    let mut contents: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        PredictionError::BadInput {
            reason: format!("failed to read upload: {}", e),
        }
    })? {
        if field.name() == Some("file") || contents.is_none() {
            let bytes = field.bytes().await.map_err(|e| PredictionError::BadInput {
                reason: format!("failed to read uploaded file: {}", e),
            })?;
            contents = Some(bytes.to_vec());
        }
    }

    let contents = contents.ok_or_else(|| PredictionError::BadInput {
        reason: "no file attached to the upload".to_string(),
    })?;

    let rows = csv_rows::parse_feature_rows(&contents)?;
    let predictions = state.lifecycle.predict_from_rows(&query.ticker, &rows)?;
    Ok(Json(PredictionsResponse { predictions }))
}

/// GET /metrics — Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// DELETE /delete_model — removes both artifact files, idempotently.
pub async fn delete_model(
    State(state): State<AppState>,
    Query(query): Query<TickerQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.lifecycle.delete(&query.ticker)?;
    Ok(Json(json!({
        "message": format!("Model for {} removed.", canonical(&query.ticker))
    })))
}

fn canonical(ticker: &str) -> String {
    crate::domain::types::canonical_ticker(ticker)
}
