/*
 * Responsibility
 * - /platform 配下のプレースホルダー (実機能はこのリポジトリに無い)
 * - /api/{ask,send,inbox,...} は gate を通過した後 501 を返す
 * - handler 側では認可チェックをしない: gate (middleware) が唯一の関門
 */
use axum::{Extension, http::header, response::{Html, IntoResponse}};

use crate::error::AppError;
use crate::services::identity::Session;

pub async fn login_page() -> impl IntoResponse {
    // Sign-in happens client-side against the identity provider; the
    // resulting tokens are posted to /api/auth/session.
    (
        [(header::CACHE_CONTROL, "no-store")],
        Html(
            "<!doctype html><html><head><title>Sign in · BlueWise Platform</title></head>\
             <body><main id=\"login\"><h1>Sign in</h1></main></body></html>",
        ),
    )
}

pub async fn home(session: Option<Extension<Session>>) -> impl IntoResponse {
    let who = match session {
        Some(Extension(s)) => format!("<p data-user-id=\"{}\">Signed in</p>", s.user_id),
        None => String::new(),
    };
    Html(format!(
        "<!doctype html><html><head><title>BlueWise Platform</title></head>\
         <body><main id=\"platform\"><h1>BlueWise Platform</h1>{who}</main></body></html>"
    ))
}

pub async fn not_implemented(feature: &'static str) -> AppError {
    AppError::NotImplemented { feature }
}

pub async fn not_found() -> AppError {
    AppError::not_found("route")
}
