use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Deployment profile; selects log verbosity and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Local,
    Dev,
    Prod,
}

impl AppEnv {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "dev" => Some(Self::Dev),
            "prod" => Some(Self::Prod),
            _ => None,
        }
    }

    pub fn default_filter(self) -> &'static str {
        match self {
            AppEnv::Local | AppEnv::Dev => "handyman=debug,tower_http=debug,axum=info,sqlx=warn",
            AppEnv::Prod => "handyman=info,tower_http=info,axum=info,sqlx=warn",
        }
    }

    pub fn json_logs(self) -> bool {
        !matches!(self, AppEnv::Local)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: AppEnv,
    pub host: String,
    pub port: u16,
    pub db: DbConfig,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            Some(raw) => AppEnv::parse(&raw).ok_or(ConfigError::Invalid {
                key: "APP_ENV",
                value: raw,
            })?,
            None => AppEnv::Local,
        };

        let db = DbConfig {
            url: required(&lookup, "DATABASE_URL")?,
            max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            min_connections: parsed(&lookup, "DB_MIN_CONNECTIONS", 0)?,
            acquire_timeout: Duration::from_secs(parsed(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            idle_timeout: Duration::from_secs(parsed(&lookup, "DB_IDLE_TIMEOUT_SECS", 600)?),
            max_lifetime: Duration::from_secs(parsed(&lookup, "DB_MAX_LIFETIME_SECS", 3600)?),
        };

        let jwt = JwtConfig {
            secret: required(&lookup, "JWT_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "handyman".into()),
            ttl_hours: token_ttl_hours(&lookup)?,
        };

        Ok(Self {
            env,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed(&lookup, "APP_PORT", 8080)?,
            db,
            jwt,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(key)),
    }
}

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

fn token_ttl_hours<F>(lookup: &F) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let hours: i64 = parsed(lookup, "JWT_TTL_HOURS", 24)?;
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        return Err(ConfigError::Invalid {
            key: "JWT_TTL_HOURS",
            value: hours.to_string(),
        });
    }
    Ok(hours)
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
