/// Factory: build the identity provider from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::identity::{IdentityError, IdentityProvider, supabase::SupabaseIdentity};

/// `Ok(None)` when Supabase is not configured; the session gate then denies
/// every protected request.
pub fn build_identity_provider(
    config: &Config,
) -> Result<Option<Arc<dyn IdentityProvider>>, IdentityError> {
    let provider = SupabaseIdentity::from_config(&config.supabase)?;

    Ok(provider.map(|p| {
        tracing::info!(cookie = %p.cookie_name(), "identity provider: supabase");
        Arc::new(p) as Arc<dyn IdentityProvider>
    }))
}
