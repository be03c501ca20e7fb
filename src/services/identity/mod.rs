pub mod cookies;
pub mod factory;
pub mod provider;
pub mod supabase;

pub use cookies::{CookieMutation, RequestCookies};
pub use factory::build_identity_provider;
pub use provider::{IdentityError, IdentityProvider, Session, SessionLookup};
