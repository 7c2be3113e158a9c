use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Rejects any request whose `X-API-KEY` header does not match the configured
/// key. Layered in front of the users router, so handlers never see
/// unauthenticated traffic.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(state.config.api_key.as_str()) {
        warn!(method = %req.method(), uri = %req.uri(), "rejected request with missing or invalid api key");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(req).await
}
