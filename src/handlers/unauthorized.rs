use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

/// Seconds before the 401 page sends the visitor home.
pub const REDIRECT_DELAY_SECS: u64 = 5;

pub async fn unauthorized() -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        [(header::REFRESH, format!("{}; url=/", REDIRECT_DELAY_SECS))],
        Json(json!({
            "success": false,
            "status": 401,
            "error": "Unauthorized, you are not authorized for selected action.",
            "redirect": "/",
        })),
    )
}
