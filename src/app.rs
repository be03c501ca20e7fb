/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → 依存生成 (gate, identity provider, mailer) → Router 組み立て
 * - Middleware の適用 (gate/security headers/CORS/http)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::{Config, GateMode},
    middleware,
    services::{
        gate::Gate,
        identity::build_identity_provider,
        mail::{Mailer, MailgunMailer},
    },
    state::AppState,
};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,bluewise_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost".
        tracing::error!(?info, "panic");

        // In development, fail fast: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting gate in {:?} mode ({:?}) on {}",
        config.app_env,
        config.gate_mode,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

fn build_state(config: &Config) -> Result<AppState> {
    // Build process-level services here and inject them into the shared application state.
    // Nothing below is re-read per request.
    let identity = build_identity_provider(config)?;
    let gate = Gate::from_config(config, identity.clone());

    // Fail-closed configuration is warned once here, not per request.
    if !gate.is_configured() {
        match gate.mode() {
            GateMode::Basic => tracing::warn!(
                "BASIC_AUTH_USER / BASIC_AUTH_PASS not set; protected routes will deny every request"
            ),
            GateMode::Session => tracing::warn!(
                "SUPABASE_URL / SUPABASE_ANON_KEY not set; protected routes will redirect to login"
            ),
        }
    }

    let mailer = MailgunMailer::new(&config.mailgun)?;
    if config.mailgun.api_key.is_none() || mailer.domain().is_none() {
        tracing::warn!("MAILGUN_API_KEY / MAILGUN_DOMAIN not set; contact form delivery will fail");
    }

    Ok(AppState {
        gate: Arc::new(gate),
        identity,
        mailer: Arc::new(mailer) as Arc<dyn Mailer>,
        contact_inbox: config.mailgun.notify_to.as_deref().map(Arc::from),
        mail_domain: config.mailgun.domain.as_deref().map(Arc::from),
        secure_cookies: config.app_env.is_production(),
    })
}

fn build_router(state: AppState, config: &Config) -> Router {
    // The gate wraps every route and the fallback, so it runs before any handler.
    let router = api::routes(&config.login_path);
    let router = middleware::gate::apply(router, state.clone()).with_state(state);

    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router)
}
