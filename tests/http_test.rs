//! Router-level tests: auth enforcement, route mounting and the
//! error-to-status mapping, driven through the assembled axum router.

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stockcast::application::lifecycle::ModelLifecycle;
use stockcast::domain::ports::{ModelBackend, PriceHistoryService, PriceModel};
use stockcast::domain::types::PriceRow;
use stockcast::infrastructure::model_store::FsModelStore;
use stockcast::infrastructure::observability::HttpMetrics;
use stockcast::interfaces::http::{build_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

const API_KEY: &str = "test-secret";

// ── Stubs ───────────────────────────────────────────────────────────

struct StubHistory {
    rows: Vec<PriceRow>,
}

#[async_trait]
impl PriceHistoryService for StubHistory {
    async fn fetch_daily(&self, _ticker: &str) -> Result<Vec<PriceRow>> {
        Ok(self.rows.clone())
    }
}

#[derive(Serialize, Deserialize)]
struct MeanModel {
    mean: f64,
}

impl PriceModel for MeanModel {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(vec![self.mean; x.len()])
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

struct MeanBackend;

impl ModelBackend for MeanBackend {
    fn fit(&self, _x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn PriceModel>> {
        anyhow::ensure!(!y.is_empty(), "empty training set");
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        Ok(Box::new(MeanModel { mean }))
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Box<dyn PriceModel>> {
        Ok(Box::new(serde_json::from_slice::<MeanModel>(bytes)?))
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn synthetic_rows(n: usize) -> Vec<PriceRow> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64 * 0.5;
            PriceRow {
                date: start + chrono::Days::new(i as u64),
                open: close - 1.0,
                high: close + 2.0,
                low: close - 2.0,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

fn app_with(rows: Vec<PriceRow>) -> (Router, Arc<ModelLifecycle>, TempDir) {
    let dir = TempDir::new().unwrap();
    let lifecycle = Arc::new(ModelLifecycle::new(
        Arc::new(FsModelStore::new(dir.path()).unwrap()),
        Arc::new(StubHistory { rows }),
        Arc::new(MeanBackend),
        60,
    ));
    let state = AppState {
        lifecycle: Arc::clone(&lifecycle),
        api_key: API_KEY.to_string(),
        metrics: Arc::new(HttpMetrics::new().unwrap()),
    };
    (build_router(state), lifecycle, dir)
}

fn get(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = key {
        builder = builder.header("access_token", key);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn protected_routes_reject_a_missing_key_with_403() {
    let (app, _, _dir) = app_with(synthetic_rows(120));
    for uri in ["/status?ticker=AAPL", "/train?ticker=AAPL"] {
        let request = Request::builder()
            .method(if uri.starts_with("/train") { "POST" } else { "GET" })
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn protected_routes_reject_a_wrong_key_with_403() {
    let (app, _, _dir) = app_with(synthetic_rows(120));
    let response = app
        .oneshot(get("/status?ticker=AAPL", Some("wrong-secret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn the_right_key_passes_the_auth_layer() {
    let (app, _, _dir) = app_with(synthetic_rows(120));
    let request = Request::builder()
        .method("DELETE")
        .uri("/delete_model?ticker=AAPL")
        .header("access_token", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn predict_is_reachable_without_a_key() {
    let (app, _, _dir) = app_with(synthetic_rows(120));
    // no key, untrained ticker: past auth, into the 404 mapping
    let response = app.oneshot(get("/predict?ticker=TSLA", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_string(response).await;
    assert!(body.contains("TSLA"), "detail should name the ticker: {}", body);
}

// ── Error-to-status mapping ─────────────────────────────────────────

#[tokio::test]
async fn predict_after_training_returns_the_price() {
    let (app, lifecycle, _dir) = app_with(synthetic_rows(120));
    lifecycle.run_training("NVDA").await;

    let response = app.oneshot(get("/predict?ticker=nvda", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("\"ticker\":\"NVDA\""), "{}", body);
    assert!(body.contains("predicted_price"), "{}", body);
}

#[tokio::test]
async fn predict_with_short_history_maps_to_400() {
    let (trained, trainer, dir) = app_with(synthetic_rows(120));
    drop(trained);
    trainer.run_training("AMD").await;

    // same artifacts, provider now too short to fill a window
    let lifecycle = Arc::new(ModelLifecycle::new(
        Arc::new(FsModelStore::new(dir.path()).unwrap()),
        Arc::new(StubHistory {
            rows: synthetic_rows(30),
        }),
        Arc::new(MeanBackend),
        60,
    ));
    let app = build_router(AppState {
        lifecycle,
        api_key: API_KEY.to_string(),
        metrics: Arc::new(HttpMetrics::new().unwrap()),
    });

    let response = app.oneshot(get("/predict?ticker=AMD", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn train_without_a_ticker_maps_to_400() {
    let (app, _, _dir) = app_with(synthetic_rows(120));
    let request = Request::builder()
        .method("POST")
        .uri("/train")
        .header("access_token", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn train_accepts_the_ticker_from_the_json_body() {
    let (app, _, _dir) = app_with(synthetic_rows(120));
    let request = Request::builder()
        .method("POST")
        .uri("/train")
        .header("access_token", API_KEY)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"ticker":"msft"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_string(response).await;
    assert!(body.contains("MSFT"), "{}", body);
}

#[tokio::test]
async fn training_an_existing_model_answers_200_already_exists() {
    let (app, lifecycle, _dir) = app_with(synthetic_rows(120));
    lifecycle.run_training("AAPL").await;

    let request = Request::builder()
        .method("POST")
        .uri("/train?ticker=aapl")
        .header("access_token", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("already exists"), "{}", body);
}

// ── Metrics exposition ──────────────────────────────────────────────

#[tokio::test]
async fn metrics_route_is_open_and_reports_observed_requests() {
    let (app, _, _dir) = app_with(synthetic_rows(120));

    // drive one request through the tracking layer first
    let response = app
        .clone()
        .oneshot(get("/predict?ticker=TSLA", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("stockcast_http_requests_total"), "{}", body);
    assert!(body.contains("path=\"/predict\""), "{}", body);
    assert!(body.contains("status=\"404\""), "{}", body);
}
