/*
 * Responsibility
 * - URL 構造を定義
 * - /health, /api/contact, /api/auth/session, /platform/{*path}, /api/{ask,...}
 * - gate はここでは掛けない (app.rs で Router 全体に掛ける)
 */
use axum::{
    Router,
    routing::{any, get, post},
};

use crate::state::AppState;

use crate::api::handlers::{
    contact::submit,
    health::health,
    platform::{home, login_page, not_found, not_implemented},
    session::set_session,
};

/// API groups behind the gate whose handlers live outside this service.
pub const PLATFORM_API_GROUPS: &[&str] = &[
    "ask",
    "send",
    "inbox",
    "leads",
    "overview",
    "tasks",
    "followups",
];

pub fn routes(login_path: &str) -> Router<AppState> {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/api/contact", post(submit))
        .route("/api/auth/session", post(set_session))
        .route("/platform", get(home))
        .route("/platform/{*path}", get(home));

    // Config guarantees a static path strictly below /platform/.
    router = router.route(login_path, get(login_page));

    for &group in PLATFORM_API_GROUPS {
        router = router
            .route(
                &format!("/api/{group}"),
                any(move || not_implemented(group)),
            )
            .route(
                &format!("/api/{group}/{{*rest}}"),
                any(move || not_implemented(group)),
            );
    }

    router.fallback(not_found)
}
