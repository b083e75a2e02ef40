use std::env;

use thiserror::Error;

/// Fallback signing secret for local runs. Production must set `JWT_SECRET`.
const LOCAL_JWT_SECRET: &str = "tutorial-api-local-development-secret";

/// Upper bound for `JWT_TTL_SECS`: one year.
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup
/// and shared read-only with every request through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the development identity bypass and log format.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    pub db_max_connections: u32,
    // HMAC secret used to sign and validate bearer tokens.
    pub jwt_secret: String,
    // Lifetime of issued access tokens, in seconds.
    pub token_ttl_secs: u64,
    pub bind_addr: String,
    // Absolute base used when rendering hyperlinks (no trailing slash).
    pub public_url: String,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// Local configuration with the in-memory store, used by tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            db_max_connections: 5,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_secs: 3600,
            bind_addr: "0.0.0.0:3000".to_string(),
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Fails fast when a variable required in production is absent or when a
    /// numeric variable cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let env = match lookup("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        let jwt_secret = lookup("JWT_SECRET").filter(|secret| !secret.is_empty());

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                jwt_secret.ok_or(ConfigError::Missing("JWT_SECRET"))?,
            ),
            Env::Local => (db_url, jwt_secret.unwrap_or(defaults.jwt_secret)),
        };

        let token_ttl_secs = parse_or(&lookup, "JWT_TTL_SECS", defaults.token_ttl_secs)?;
        if token_ttl_secs == 0 || token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid {
                name: "JWT_TTL_SECS",
                value: token_ttl_secs.to_string(),
            });
        }

        let public_url = lookup("PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_url);

        Ok(Self {
            env,
            db_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            jwt_secret,
            token_ttl_secs,
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_url,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
