/*
 * Responsibility
 * - POST /api/auth/session
 * - client 側で取得した access/refresh token を identity provider で検証し、
 *   HttpOnly cookie として書き出す (以後は gate が cookie を読む)
 */
use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};

use crate::{
    api::dto::session::{SetSessionRequest, SetSessionResponse},
    error::AppError,
    middleware::gate::append_cookies,
    services::identity::RequestCookies,
    state::AppState,
};

pub async fn set_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SetSessionRequest>,
) -> Result<Response, AppError> {
    req.validate()
        .map_err(|m| AppError::bad_request("MISSING_TOKENS", m))?;

    let provider = state.identity.as_ref().ok_or_else(|| {
        tracing::error!("session bridge called without a configured identity provider");
        AppError::Internal
    })?;

    let cookies = RequestCookies::from_headers(&headers);
    let lookup = provider
        .establish_session(&cookies, req.access_token.trim(), req.refresh_token.trim())
        .await?;

    let user_id = lookup.session.as_ref().map(|s| s.user_id);
    if let Some(id) = user_id {
        tracing::info!(user_id = %id, "session established");
    }

    let mut response = Json(SetSessionResponse { ok: true, user_id }).into_response();
    append_cookies(response.headers_mut(), &lookup.cookies, state.secure_cookies);

    Ok(response)
}
