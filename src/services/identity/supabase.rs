//! Supabase Auth backed identity provider.
//!
//! Session cookie layout follows the browser SSR client:
//! - name `sb-<project-ref>-auth-token`
//! - value is the session JSON, optionally `base64-` + base64url(JSON)
//! - values over `CHUNK_SIZE` are split across `<name>.0`, `<name>.1`, ...
//!
//! Every read verifies the access token against `/auth/v1/user`; tokens close
//! to expiry are rotated through `/auth/v1/token?grant_type=refresh_token` and
//! the new session is handed back as cookie mutations.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::config::SupabaseConfig;
use crate::services::identity::cookies::{CookieMutation, RequestCookies};
use crate::services::identity::provider::{
    IdentityError, IdentityProvider, Session, SessionLookup,
};

const CHUNK_SIZE: usize = 3180;
const BASE64_PREFIX: &str = "base64-";
// Browser-side clients keep the cookie for 400 days; expiry is in the JSON.
const COOKIE_MAX_AGE_SECONDS: i64 = 400 * 24 * 60 * 60;
const REFRESH_MARGIN_SECONDS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ProviderUser {
    id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

/// Session JSON as stored in the auth cookie and returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<ProviderUser>,
}

impl StoredSession {
    fn effective_expires_at(&self, now: i64) -> Option<i64> {
        self.expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs))
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    cookie_name: String,
}

impl std::fmt::Debug for SupabaseIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the anon key
        f.debug_struct("SupabaseIdentity")
            .field("base_url", &self.base_url)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl SupabaseIdentity {
    /// Returns `Ok(None)` when URL or anon key is not configured.
    pub fn from_config(config: &SupabaseConfig) -> Result<Option<Self>, IdentityError> {
        let (Some(url), Some(anon_key)) = (config.url.as_deref(), config.anon_key.as_deref())
        else {
            return Ok(None);
        };

        let cookie_name = match config.auth_cookie.as_deref() {
            Some(name) => name.to_string(),
            None => cookie_name_for(url).ok_or_else(|| {
                IdentityError::InvalidResponse(format!("cannot derive project ref from {url}"))
            })?,
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(IdentityError::from)?;

        Ok(Some(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            cookie_name,
        }))
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    async fn get_user(&self, access_token: &str) -> Result<ProviderUser, IdentityError> {
        let resp = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        decode_response(resp).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredSession, IdentityError> {
        let resp = self
            .client
            .post(format!(
                "{}/auth/v1/token?grant_type=refresh_token",
                self.base_url
            ))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        decode_response(resp).await
    }

    fn store(
        &self,
        cookies: &RequestCookies,
        stored: &StoredSession,
    ) -> Result<Vec<CookieMutation>, IdentityError> {
        let value = encode_cookie_value(stored)
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;
        Ok(write_mutations(&self.cookie_name, &value, cookies))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn read_session(&self, cookies: &RequestCookies) -> Result<SessionLookup, IdentityError> {
        let Some(raw) = read_chunked(cookies, &self.cookie_name) else {
            return Ok(SessionLookup::none());
        };

        let Some(stored) = decode_cookie_value(&raw) else {
            tracing::debug!(cookie = %self.cookie_name, "unreadable session cookie; clearing");
            return Ok(SessionLookup {
                session: None,
                cookies: clear_mutations(&self.cookie_name, cookies),
            });
        };

        let now = chrono::Utc::now().timestamp();
        let fresh = stored
            .effective_expires_at(now)
            .is_some_and(|exp| exp - REFRESH_MARGIN_SECONDS > now);

        if fresh {
            let user = self.get_user(&stored.access_token).await?;
            let expires_at = stored.effective_expires_at(now).unwrap_or(now);
            return Ok(SessionLookup {
                session: Some(to_session(stored, user, expires_at)),
                cookies: Vec::new(),
            });
        }

        let refreshed = match self.refresh(&stored.refresh_token).await {
            Ok(s) => s,
            // Refresh token revoked or reused: the session is over.
            Err(IdentityError::Rejected { status, message }) if (400..500).contains(&status) => {
                tracing::debug!(status, %message, "session refresh rejected; clearing");
                return Ok(SessionLookup {
                    session: None,
                    cookies: clear_mutations(&self.cookie_name, cookies),
                });
            }
            Err(e) => return Err(e),
        };

        let user = match refreshed.user.clone() {
            Some(user) => user,
            None => self.get_user(&refreshed.access_token).await?,
        };

        let expires_at = refreshed
            .effective_expires_at(now)
            .unwrap_or(now + DEFAULT_TOKEN_LIFETIME_SECONDS);
        let to_store = StoredSession {
            expires_at: Some(expires_at),
            user: Some(user.clone()),
            ..refreshed
        };
        let mutations = self.store(cookies, &to_store)?;

        tracing::debug!(user_id = %user.id, "session refreshed");

        Ok(SessionLookup {
            session: Some(to_session(to_store, user, expires_at)),
            cookies: mutations,
        })
    }

    async fn establish_session(
        &self,
        cookies: &RequestCookies,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<SessionLookup, IdentityError> {
        let user = self.get_user(access_token).await?;

        let now = chrono::Utc::now().timestamp();
        let expires_at = jwt_exp(access_token).unwrap_or(now + DEFAULT_TOKEN_LIFETIME_SECONDS);

        let stored = StoredSession {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            token_type: Some("bearer".into()),
            expires_in: Some((expires_at - now).max(0)),
            expires_at: Some(expires_at),
            user: Some(user.clone()),
        };
        let mutations = self.store(cookies, &stored)?;

        Ok(SessionLookup {
            session: Some(to_session(stored, user, expires_at)),
            cookies: mutations,
        })
    }
}

fn to_session(stored: StoredSession, user: ProviderUser, expires_at: i64) -> Session {
    Session {
        user_id: user.id,
        email: user.email,
        access_token: stored.access_token,
        refresh_token: stored.refresh_token,
        expires_at,
    }
}

async fn decode_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, IdentityError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let message = provider_message(&body).unwrap_or_else(|| format!("status {}", status));
        return Err(IdentityError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| IdentityError::InvalidResponse(e.to_string()))
}

fn provider_message(body: &str) -> Option<String> {
    let parsed: ProviderErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
}

/// `https://abcd.supabase.co` → `sb-abcd-auth-token`
fn cookie_name_for(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let project_ref = parsed.host_str()?.split('.').next()?;
    if project_ref.is_empty() {
        return None;
    }
    Some(format!("sb-{}-auth-token", project_ref))
}

fn chunk_name(name: &str, index: usize) -> String {
    format!("{}.{}", name, index)
}

/// Whole cookie value, joining `<name>.N` chunks when the plain cookie is absent.
fn read_chunked(cookies: &RequestCookies, name: &str) -> Option<String> {
    if let Some(v) = cookies.get(name) {
        return Some(v.to_string());
    }

    let mut joined = String::new();
    let mut index = 0;
    while let Some(part) = cookies.get(&chunk_name(name, index)) {
        joined.push_str(part);
        index += 1;
    }

    (index > 0).then_some(joined)
}

fn decode_cookie_value(raw: &str) -> Option<StoredSession> {
    let json = match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .ok()?;
            String::from_utf8(bytes).ok()?
        }
        None => raw.to_string(),
    };

    let stored: StoredSession = serde_json::from_str(&json).ok()?;
    if stored.access_token.is_empty() || stored.refresh_token.is_empty() {
        return None;
    }
    Some(stored)
}

fn encode_cookie_value(stored: &StoredSession) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(stored)?;
    Ok(format!(
        "{}{}",
        BASE64_PREFIX,
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    ))
}

/// Cookie writes for `value`, plus removals for stale plain/chunk cookies.
fn write_mutations(name: &str, value: &str, cookies: &RequestCookies) -> Vec<CookieMutation> {
    let mut out = Vec::new();

    // base64url output is ASCII, so byte chunks are char boundaries.
    let chunks: Vec<&str> = if value.len() <= CHUNK_SIZE {
        vec![value]
    } else {
        value
            .as_bytes()
            .chunks(CHUNK_SIZE)
            .filter_map(|c| std::str::from_utf8(c).ok())
            .collect()
    };

    let written_chunks = if chunks.len() == 1 {
        out.push(CookieMutation::Set {
            name: name.to_string(),
            value: chunks[0].to_string(),
            max_age_seconds: Some(COOKIE_MAX_AGE_SECONDS),
        });
        0
    } else {
        for (i, chunk) in chunks.iter().enumerate() {
            out.push(CookieMutation::Set {
                name: chunk_name(name, i),
                value: chunk.to_string(),
                max_age_seconds: Some(COOKIE_MAX_AGE_SECONDS),
            });
        }
        if cookies.contains(name) {
            out.push(CookieMutation::Remove {
                name: name.to_string(),
            });
        }
        chunks.len()
    };

    let mut index = written_chunks;
    while cookies.contains(&chunk_name(name, index)) {
        out.push(CookieMutation::Remove {
            name: chunk_name(name, index),
        });
        index += 1;
    }

    out
}

fn clear_mutations(name: &str, cookies: &RequestCookies) -> Vec<CookieMutation> {
    let mut out = Vec::new();
    if cookies.contains(name) {
        out.push(CookieMutation::Remove {
            name: name.to_string(),
        });
    }
    let mut index = 0;
    while cookies.contains(&chunk_name(name, index)) {
        out.push(CookieMutation::Remove {
            name: chunk_name(name, index),
        });
        index += 1;
    }
    out
}

/// `exp` claim of a JWT, read without verification (the provider already
/// vouched for the token through `/auth/v1/user`).
fn jwt_exp(token: &str) -> Option<i64> {
    #[derive(Deserialize)]
    struct Claims {
        exp: i64,
    }

    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice::<Claims>(&bytes).ok().map(|c| c.exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> StoredSession {
        StoredSession {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            token_type: Some("bearer".into()),
            expires_in: Some(3600),
            expires_at: Some(1_900_000_000),
            user: Some(ProviderUser {
                id: Uuid::nil(),
                email: Some("owner@example.com".into()),
            }),
        }
    }

    #[test]
    fn test_cookie_name_from_url() {
        assert_eq!(
            cookie_name_for("https://abcdefgh.supabase.co").as_deref(),
            Some("sb-abcdefgh-auth-token")
        );
        assert_eq!(
            cookie_name_for("http://localhost:54321").as_deref(),
            Some("sb-localhost-auth-token")
        );
        assert_eq!(cookie_name_for("not a url"), None);
    }

    #[test]
    fn test_decode_plain_json_cookie() {
        let json = serde_json::to_string(&stored()).unwrap();
        assert_eq!(decode_cookie_value(&json), Some(stored()));
    }

    #[test]
    fn test_decode_base64_cookie() {
        let encoded = encode_cookie_value(&stored()).unwrap();
        assert!(encoded.starts_with(BASE64_PREFIX));
        assert_eq!(decode_cookie_value(&encoded), Some(stored()));
    }

    #[test]
    fn test_decode_rejects_garbage_and_empty_tokens() {
        assert_eq!(decode_cookie_value("base64-%%%"), None);
        assert_eq!(decode_cookie_value("{not json"), None);
        assert_eq!(
            decode_cookie_value(r#"{"access_token":"","refresh_token":"r"}"#),
            None
        );
    }

    #[test]
    fn test_effective_expiry_falls_back_to_expires_in() {
        let s = StoredSession {
            expires_at: None,
            expires_in: Some(100),
            ..stored()
        };
        assert_eq!(s.effective_expires_at(1000), Some(1100));
        let s = StoredSession {
            expires_at: None,
            expires_in: None,
            ..stored()
        };
        assert_eq!(s.effective_expires_at(1000), None);
    }

    #[test]
    fn test_read_chunked_prefers_plain_cookie() {
        let jar: RequestCookies = [("c", "whole"), ("c.0", "a"), ("c.1", "b")]
            .into_iter()
            .collect();
        assert_eq!(read_chunked(&jar, "c").as_deref(), Some("whole"));
    }

    #[test]
    fn test_read_chunked_joins_in_order() {
        let jar: RequestCookies = [("c.1", "b"), ("c.0", "a"), ("c.2", "c"), ("c.4", "x")]
            .into_iter()
            .collect();
        assert_eq!(read_chunked(&jar, "c").as_deref(), Some("abc"));
        assert_eq!(read_chunked(&jar, "other"), None);
    }

    #[test]
    fn test_write_small_value_clears_old_chunks() {
        let jar: RequestCookies = [("c.0", "a"), ("c.1", "b")].into_iter().collect();
        let out = write_mutations("c", "value", &jar);
        assert_eq!(
            out,
            vec![
                CookieMutation::Set {
                    name: "c".into(),
                    value: "value".into(),
                    max_age_seconds: Some(COOKIE_MAX_AGE_SECONDS),
                },
                CookieMutation::Remove { name: "c.0".into() },
                CookieMutation::Remove { name: "c.1".into() },
            ]
        );
    }

    #[test]
    fn test_write_large_value_chunks_and_round_trips() {
        let value = "x".repeat(CHUNK_SIZE * 2 + 10);
        let jar: RequestCookies = [("c", "old")].into_iter().collect();
        let out = write_mutations("c", &value, &jar);

        let names: Vec<&str> = out.iter().map(CookieMutation::name).collect();
        assert_eq!(names, vec!["c.0", "c.1", "c.2", "c"]);

        let rejoined: RequestCookies = out
            .iter()
            .filter_map(|m| match m {
                CookieMutation::Set { name, value, .. } => Some((name.clone(), value.clone())),
                CookieMutation::Remove { .. } => None,
            })
            .collect();
        assert_eq!(read_chunked(&rejoined, "c"), Some(value));
    }

    #[test]
    fn test_clear_mutations() {
        let jar: RequestCookies = [("c", "v"), ("c.0", "a"), ("unrelated", "z")]
            .into_iter()
            .collect();
        let out = clear_mutations("c", &jar);
        assert_eq!(
            out,
            vec![
                CookieMutation::Remove { name: "c".into() },
                CookieMutation::Remove { name: "c.0".into() },
            ]
        );
        assert!(clear_mutations("c", &RequestCookies::default()).is_empty());
    }

    #[test]
    fn test_jwt_exp() {
        let payload =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(r#"{"sub":"x","exp":1700000000}"#);
        let token = format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig");
        assert_eq!(jwt_exp(&token), Some(1_700_000_000));
        assert_eq!(jwt_exp("opaque-token"), None);
        assert_eq!(jwt_exp("a.%%%.c"), None);
    }

    #[test]
    fn test_provider_message_preference() {
        assert_eq!(
            provider_message(r#"{"error":"invalid_grant","error_description":"Refresh Token Not Found"}"#)
                .as_deref(),
            Some("Refresh Token Not Found")
        );
        assert_eq!(
            provider_message(r#"{"msg":"Invalid JWT"}"#).as_deref(),
            Some("Invalid JWT")
        );
        assert_eq!(provider_message("<html>"), None);
    }

    #[test]
    fn test_from_config_requires_url_and_key() {
        let cfg = SupabaseConfig {
            url: Some("https://abcd.supabase.co".into()),
            anon_key: None,
            auth_cookie: None,
            timeout: std::time::Duration::from_secs(1),
        };
        assert!(SupabaseIdentity::from_config(&cfg).unwrap().is_none());

        let cfg = SupabaseConfig {
            anon_key: Some("anon".into()),
            ..cfg
        };
        let provider = SupabaseIdentity::from_config(&cfg).unwrap().unwrap();
        assert_eq!(provider.cookie_name(), "sb-abcd-auth-token");
    }
}
