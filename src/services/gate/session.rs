//! Delegated session verification (session gate mode).
//!
//! "No session" and "provider failed" are deliberately indistinguishable to
//! the caller: both end in the same login redirect.

use std::sync::Arc;

use axum::http::HeaderMap;
use url::form_urlencoded;

use crate::services::gate::decision::DenyReason;
use crate::services::identity::{CookieMutation, IdentityProvider, RequestCookies, Session};

/// What the session check produced for one request.
pub struct SessionCheck {
    pub result: Result<Session, DenyReason>,
    // Applied to the response even when `result` is a deny.
    pub cookies: Vec<CookieMutation>,
}

#[derive(Clone)]
pub struct SessionVerifier {
    login_path: String,
    provider: Option<Arc<dyn IdentityProvider>>,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("login_path", &self.login_path)
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .finish()
    }
}

impl SessionVerifier {
    /// `provider: None` means the provider is not configured (fail closed).
    pub fn new(login_path: impl Into<String>, provider: Option<Arc<dyn IdentityProvider>>) -> Self {
        Self {
            login_path: login_path.into(),
            provider,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn verify(&self, headers: &HeaderMap) -> SessionCheck {
        let Some(provider) = self.provider.as_ref() else {
            return SessionCheck {
                result: Err(DenyReason::ConfigurationMissing),
                cookies: Vec::new(),
            };
        };

        let cookies = RequestCookies::from_headers(headers);
        if cookies.is_empty() {
            return SessionCheck {
                result: Err(DenyReason::CredentialAbsent),
                cookies: Vec::new(),
            };
        }

        match provider.read_session(&cookies).await {
            Ok(lookup) => SessionCheck {
                result: lookup.session.ok_or(DenyReason::CredentialAbsent),
                cookies: lookup.cookies,
            },
            Err(err) => {
                tracing::warn!(provider = provider.name(), error = %err, "session lookup failed");
                SessionCheck {
                    result: Err(DenyReason::VerificationCallFailed),
                    cookies: Vec::new(),
                }
            }
        }
    }

    /// Login URL carrying the original path + query as `next`.
    pub fn login_redirect(&self, path: &str, query: Option<&str>) -> String {
        login_redirect(&self.login_path, path, query)
    }
}

/// `/platform/login?next=<urlencoded path?query>`
pub fn login_redirect(login_path: &str, path: &str, query: Option<&str>) -> String {
    let next = match query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path.to_string(),
    };

    let encoded = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", &next)
        .finish();

    format!("{}?{}", login_path, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity::{IdentityError, SessionLookup};
    use async_trait::async_trait;
    use axum::http::{HeaderValue, header};
    use proptest::prelude::*;
    use uuid::Uuid;

    enum Behaviour {
        NoSession,
        Fails,
        Valid,
    }

    struct FakeProvider(Behaviour);

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn read_session(
            &self,
            _cookies: &RequestCookies,
        ) -> Result<SessionLookup, IdentityError> {
            match self.0 {
                Behaviour::NoSession => Ok(SessionLookup::none()),
                Behaviour::Fails => Err(IdentityError::Transport("down".into())),
                Behaviour::Valid => Ok(SessionLookup {
                    session: Some(Session {
                        user_id: Uuid::nil(),
                        email: None,
                        access_token: "a".into(),
                        refresh_token: "r".into(),
                        expires_at: 0,
                    }),
                    cookies: vec![CookieMutation::Set {
                        name: "sb".into(),
                        value: "fresh".into(),
                        max_age_seconds: None,
                    }],
                }),
            }
        }

        async fn establish_session(
            &self,
            _cookies: &RequestCookies,
            _access_token: &str,
            _refresh_token: &str,
        ) -> Result<SessionLookup, IdentityError> {
            Err(IdentityError::Transport("unused".into()))
        }
    }

    fn with_cookie() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_static("sb=stale"));
        h
    }

    fn verifier(b: Behaviour) -> SessionVerifier {
        SessionVerifier::new("/platform/login", Some(Arc::new(FakeProvider(b))))
    }

    #[test]
    fn test_login_redirect_examples() {
        assert_eq!(
            login_redirect("/platform/login", "/platform/leads/42", None),
            "/platform/login?next=%2Fplatform%2Fleads%2F42"
        );
        assert_eq!(
            login_redirect("/platform/login", "/platform/leads", Some("page=2&q=a b")),
            "/platform/login?next=%2Fplatform%2Fleads%3Fpage%3D2%26q%3Da+b"
        );
        assert_eq!(
            login_redirect("/platform/login", "/platform", Some("")),
            "/platform/login?next=%2Fplatform"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_provider_denies() {
        let v = SessionVerifier::new("/platform/login", None);
        let check = v.verify(&with_cookie()).await;
        assert_eq!(check.result, Err(DenyReason::ConfigurationMissing));
    }

    #[tokio::test]
    async fn test_no_cookies_is_absent() {
        let check = verifier(Behaviour::Valid).verify(&HeaderMap::new()).await;
        assert_eq!(check.result, Err(DenyReason::CredentialAbsent));
        assert!(check.cookies.is_empty());
    }

    #[tokio::test]
    async fn test_no_session_and_failure_both_deny() {
        let none = verifier(Behaviour::NoSession).verify(&with_cookie()).await;
        let failed = verifier(Behaviour::Fails).verify(&with_cookie()).await;
        assert!(none.result.is_err());
        assert!(failed.result.is_err());
        assert_eq!(failed.result, Err(DenyReason::VerificationCallFailed));
    }

    #[tokio::test]
    async fn test_valid_session_forwards_cookies() {
        let check = verifier(Behaviour::Valid).verify(&with_cookie()).await;
        assert_eq!(check.result.map(|s| s.user_id), Ok(Uuid::nil()));
        assert_eq!(check.cookies.len(), 1);
        assert_eq!(check.cookies[0].name(), "sb");
    }

    proptest! {
        #[test]
        fn next_parameter_reconstructs_original_target(
            path in "/[a-zA-Z0-9/._~%!$&'()*+,;=:@ -]{0,40}",
            query in proptest::option::of("[a-zA-Z0-9=&%+ ?/#-]{0,30}"),
        ) {
            let location = login_redirect("/platform/login", &path, query.as_deref());
            let (login, encoded) = location.split_once('?').unwrap();
            prop_assert_eq!(login, "/platform/login");

            let next: Vec<(String, String)> = form_urlencoded::parse(encoded.as_bytes())
                .into_owned()
                .collect();
            prop_assert_eq!(next.len(), 1);
            prop_assert_eq!(next[0].0.as_str(), "next");

            let expected = match query.as_deref() {
                Some(q) if !q.is_empty() => format!("{path}?{q}"),
                _ => path.clone(),
            };
            prop_assert_eq!(&next[0].1, &expected);
        }
    }
}
