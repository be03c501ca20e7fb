//! HTTP Basic verification against the static shared secret.
//!
//! Both sides of each comparison are reduced to SHA-256 digests first, so the
//! constant-time compare always runs over 32 bytes no matter how long the
//! presented values are. Username and password are compared independently and
//! combined with a non-short-circuit `&` on `subtle::Choice`.

use base64::Engine as _;
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

use crate::config::BasicAuthConfig;
use crate::services::gate::decision::DenyReason;

type SecretDigest = [u8; 32];

#[derive(Clone)]
struct Expected {
    user: SecretDigest,
    pass: SecretDigest,
}

/// Shared-secret verifier. Fail-closed when either secret is missing.
#[derive(Clone)]
pub struct BasicVerifier {
    expected: Option<Expected>,
    realm: String,
}

impl std::fmt::Debug for BasicVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print digests
        f.debug_struct("BasicVerifier")
            .field("configured", &self.expected.is_some())
            .field("realm", &self.realm)
            .finish()
    }
}

impl BasicVerifier {
    pub fn new(config: &BasicAuthConfig) -> Self {
        let expected = match (config.user.as_deref(), config.pass.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some(Expected {
                user: digest(user.as_bytes()),
                pass: digest(pass.as_bytes()),
            }),
            _ => None,
        };

        Self {
            expected,
            realm: config.realm.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Verify a raw `Authorization` header value.
    pub fn verify(&self, authorization: Option<&str>) -> Result<(), DenyReason> {
        // Checked before looking at the header: an unconfigured gate denies
        // everything, including an "empty" credential.
        let expected = self
            .expected
            .as_ref()
            .ok_or(DenyReason::ConfigurationMissing)?;

        let header = authorization.ok_or(DenyReason::CredentialAbsent)?;
        let (user, pass) = parse_basic(header)?;

        let user_ok = digest(user.as_bytes())
            .as_slice()
            .ct_eq(expected.user.as_slice());
        let pass_ok = digest(pass.as_bytes())
            .as_slice()
            .ct_eq(expected.pass.as_slice());

        if bool::from(both(user_ok, pass_ok)) {
            Ok(())
        } else {
            Err(DenyReason::CredentialInvalid)
        }
    }
}

fn both(a: Choice, b: Choice) -> Choice {
    a & b
}

fn digest(bytes: &[u8]) -> SecretDigest {
    Sha256::digest(bytes).into()
}

/// `Basic <base64(user:pass)>` → `(user, pass)`, split at the first `:`.
fn parse_basic(header: &str) -> Result<(String, String), DenyReason> {
    let header = header.trim();
    let (scheme, payload) = header
        .split_once(' ')
        .ok_or(DenyReason::CredentialMalformed)?;

    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(DenyReason::CredentialMalformed);
    }

    let raw = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| DenyReason::CredentialMalformed)?;

    let decoded = String::from_utf8(raw).map_err(|_| DenyReason::CredentialMalformed)?;

    let (user, pass) = decoded
        .split_once(':')
        .ok_or(DenyReason::CredentialMalformed)?;

    Ok((user.to_string(), pass.to_string()))
}
