use std::str::FromStr;

use serde::Serialize;

use crate::ai::AiConfig;
use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL and JWT secret have defaults suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitSettings,
    pub ai: AiConfig,
    pub features: FeatureFlags,
    pub log_format: LogFormat,
}

/// Request budgets for the two rate-limited route groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Requests per window for `/auth/*` (default: `100`).
    pub max_requests: u64,
    /// Window length in seconds, shared by both limiters (default: `60`).
    pub window_secs: u64,
    /// Requests per window for `/ai/*` (default: `20`).
    pub ai_max_requests: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
            ai_max_requests: 20,
        }
    }
}

/// Feature toggles exposed at `GET /api/v1/features`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    /// Label only. No homomorphic encryption is performed.
    pub fhe: bool,
    pub bias_detection: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            fhe: false,
            bias_detection: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}', expected 'text' or 'json'")),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                  |
    /// |------------------------------|--------------------------|
    /// | `HOST`                       | `0.0.0.0`                |
    /// | `PORT`                       | `3000`                   |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                     |
    /// | `RATE_LIMIT_MAX_REQUESTS`    | `100`                    |
    /// | `RATE_LIMIT_WINDOW_SECS`     | `60`                     |
    /// | `AI_RATE_LIMIT_MAX_REQUESTS` | `20`                     |
    /// | `FEATURE_FHE`                | `false`                  |
    /// | `FEATURE_BIAS_DETECTION`     | `true`                   |
    /// | `LOG_FORMAT`                 | `text`                   |
    ///
    /// JWT and AI settings are documented on [`JwtConfig::from_env`] and
    /// [`AiConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on any value that fails to parse. Misconfiguration should stop
    /// the process before it binds a socket.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", 3000);
        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );
        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30);

        let defaults = RateLimitSettings::default();
        let rate_limit = RateLimitSettings {
            max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests),
            window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", defaults.window_secs),
            ai_max_requests: env_parse("AI_RATE_LIMIT_MAX_REQUESTS", defaults.ai_max_requests),
        };
        assert!(rate_limit.window_secs > 0, "RATE_LIMIT_WINDOW_SECS must be positive");

        let features = FeatureFlags {
            fhe: env_flag("FEATURE_FHE", false),
            bias_detection: env_flag("FEATURE_BIAS_DETECTION", true),
        };

        let log_format = env_parse("LOG_FORMAT", LogFormat::Text);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            rate_limit,
            ai: AiConfig::from_env(),
            features,
            log_format,
        }
    }
}

/// Read `name` and parse it, falling back to `default` when unset.
///
/// # Panics
///
/// Panics when the variable is set but does not parse.
pub(crate) fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => parse_flag(&raw)
            .unwrap_or_else(|| panic!("{name} must be a boolean (true/false), got '{raw}'")),
        Err(_) => default,
    }
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` in any case.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
