/*
 * Responsibility
 * - GET /health (疎通用)
 * - gate の分類対象外 (常に通る)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
