pub mod auth;
pub mod handlers;

use crate::application::lifecycle::ModelLifecycle;
use crate::infrastructure::observability::HttpMetrics;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ModelLifecycle>,
    pub api_key: String,
    pub metrics: Arc<HttpMetrics>,
}

/// Records request count and latency for every route, including rejections
/// from the auth layer.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    state.metrics.observe_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Assembles the route tree. `/predict` and `/metrics` sit outside the auth
/// layer; the remaining routes require the shared-secret header.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/train", post(handlers::train))
        .route("/status", get(handlers::status))
        .route("/predict_from_file", post(handlers::predict_from_file))
        .route("/delete_model", delete(handlers::delete_model))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/predict", get(handlers::predict))
        .route("/metrics", get(handlers::metrics))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
