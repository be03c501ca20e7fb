/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, GATE_MODE, Basic/Supabase/Mailgun 設定など)
 * - 設定値のバリデーション (形式不正なら起動失敗)
 * - secret の欠落は起動失敗にしない: gate 側で fail-closed にする
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Which credential scheme protects the platform routes.
///
/// Exactly one mode runs per process; the two are never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// HTTP Basic Auth against a static shared secret.
    Basic,
    /// Session cookie verified by the identity provider.
    Session,
}

impl GateMode {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "basic" => Ok(Self::Basic),
            "session" | "supabase" => Ok(Self::Session),
            _ => Err(ConfigError::Invalid("GATE_MODE")),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Shared-secret material for the Basic gate.
///
/// Empty strings are normalized to `None` so "unset" and "set to empty"
/// are the same fail-closed state.
#[derive(Clone, Default)]
pub struct BasicAuthConfig {
    pub user: Option<String>,
    pub pass: Option<String>,
    pub realm: String,
}

impl fmt::Debug for BasicAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print secrets
        f.debug_struct("BasicAuthConfig")
            .field("user_set", &self.user.is_some())
            .field("pass_set", &self.pass.is_some())
            .field("realm", &self.realm)
            .finish()
    }
}

impl BasicAuthConfig {
    pub fn is_complete(&self) -> bool {
        self.user.is_some() && self.pass.is_some()
    }
}

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    // Overrides the `sb-<project-ref>-auth-token` cookie name.
    pub auth_cookie: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key_set", &self.anon_key.is_some())
            .field("auth_cookie", &self.auth_cookie)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SupabaseConfig {
    pub fn is_complete(&self) -> bool {
        self.url.is_some() && self.anon_key.is_some()
    }
}

#[derive(Clone)]
pub struct MailgunConfig {
    pub api_key: Option<String>,
    pub domain: Option<String>,
    pub from: Option<String>,
    // Internal inbox that receives contact notifications.
    pub notify_to: Option<String>,
    pub region: String,
    pub timeout: Duration,
}

impl fmt::Debug for MailgunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunConfig")
            .field("api_key_set", &self.api_key.is_some())
            .field("domain", &self.domain)
            .field("from", &self.from)
            .field("notify_to", &self.notify_to)
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub gate_mode: GateMode,
    pub login_path: String,
    pub basic_auth: BasicAuthConfig,
    pub supabase: SupabaseConfig,

    pub mailgun: MailgunConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = match std::env::var("PORT") {
            Ok(s) => s.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            Err(_) => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let gate_mode = GateMode::parse(&std::env::var("GATE_MODE").unwrap_or_default())?;

        let login_path = non_empty_var("LOGIN_PATH").unwrap_or_else(|| "/platform/login".into());
        if !is_valid_login_path(&login_path) {
            return Err(ConfigError::Invalid("LOGIN_PATH"));
        }

        let basic_auth = BasicAuthConfig {
            user: non_empty_var("BASIC_AUTH_USER"),
            pass: non_empty_var("BASIC_AUTH_PASS"),
            realm: non_empty_var("BASIC_AUTH_REALM").unwrap_or_else(|| "BlueWise Platform".into()),
        };
        if basic_auth.realm.contains('"') || basic_auth.realm.chars().any(char::is_control) {
            return Err(ConfigError::Invalid("BASIC_AUTH_REALM"));
        }

        let supabase = SupabaseConfig {
            url: non_empty_var("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            anon_key: non_empty_var("SUPABASE_ANON_KEY"),
            auth_cookie: non_empty_var("SUPABASE_AUTH_COOKIE"),
            timeout: Duration::from_millis(millis_var("SUPABASE_TIMEOUT_MS", 10_000)),
        };

        let mailgun = MailgunConfig {
            api_key: non_empty_var("MAILGUN_API_KEY"),
            domain: non_empty_var("MAILGUN_DOMAIN"),
            from: non_empty_var("MAILGUN_FROM"),
            notify_to: non_empty_var("MAILGUN_TO"),
            region: non_empty_var("MAILGUN_REGION")
                .unwrap_or_else(|| "us".into())
                .to_ascii_lowercase(),
            timeout: Duration::from_millis(millis_var("MAILGUN_TIMEOUT_MS", 12_000)),
        };

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            gate_mode,
            login_path,
            basic_auth,
            supabase,
            mailgun,
        })
    }
}

/// A static path strictly below `/platform/`, safe for routing and headers.
fn is_valid_login_path(path: &str) -> bool {
    path.len() > "/platform/".len()
        && path.starts_with("/platform/")
        && !path.ends_with('/')
        && path
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'-' | b'_' | b'.'))
        && !path.contains("//")
        && !path.split('/').any(|seg| seg == "." || seg == "..")
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn millis_var(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
