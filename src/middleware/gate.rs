//! Access gate middleware: runs `Gate::evaluate` before any handler and
//! turns the outcome into a response.
//!
//! - Allow: the request continues; in session mode the verified `Session` is
//!   put into request extensions for handlers.
//! - Challenge: `401` + `WWW-Authenticate: Basic realm="..."`, plain text.
//! - Redirect: `302` to the login page with `next`.
//!
//! Cookie mutations from the identity provider are written on every
//! response, allowed or not.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::services::gate::{GateDecision, GateOutcome};
use crate::services::identity::CookieMutation;
use crate::state::AppState;

/// Put the gate in front of every route (and the fallback) of `router`.
///
/// Must be called after all routes and the fallback are registered.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, gate_middleware))
}

async fn gate_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let GateOutcome {
        decision,
        cookies,
        session,
    } = state.gate.evaluate(req.uri(), req.headers()).await;

    let mut response = match decision {
        GateDecision::Allow => {
            if let Some(session) = session {
                // middleware → handler への受け渡し
                req.extensions_mut().insert(session);
            }
            next.run(req).await
        }
        GateDecision::Challenge { realm } => challenge_response(&realm),
        GateDecision::Redirect { location } => redirect_response(&location),
    };

    append_cookies(response.headers_mut(), &cookies, state.secure_cookies);
    response
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

fn challenge_response(realm: &str) -> Response {
    let mut response = unauthorized();
    match HeaderValue::from_str(&format!("Basic realm=\"{}\"", realm)) {
        Ok(value) => {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        Err(err) => tracing::error!(error = %err, "invalid realm for WWW-Authenticate"),
    }
    response
}

fn redirect_response(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(err) => {
            // Still a deny; only the shape degrades.
            tracing::error!(error = %err, "invalid login redirect location");
            unauthorized()
        }
    }
}

pub fn append_cookies(headers: &mut HeaderMap, cookies: &[CookieMutation], secure: bool) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_header_value(secure)) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(err) => {
                tracing::error!(cookie = cookie.name(), error = %err, "dropping unencodable cookie")
            }
        }
    }
}
