//! Shared-secret authentication.
//!
//! A single API key is compared against a fixed request header; anything
//! else is a 403. The `/predict` route is mounted outside this layer.

use crate::interfaces::http::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "access_token";

pub fn key_matches(expected: &str, presented: Option<&str>) -> bool {
    presented == Some(expected)
}

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if key_matches(&state.api_key, presented) {
        Ok(next.run(request).await)
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "detail": "Invalid API key" })),
        )
            .into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_required() {
        assert!(key_matches("secret", Some("secret")));
        assert!(!key_matches("secret", Some("SECRET")));
        assert!(!key_matches("secret", Some("secret ")));
        assert!(!key_matches("secret", None));
    }
}
