//! Process configuration read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DATABASE_URL` | unset | Postgres URL; unset selects the in-memory store |
//! | `DATABASE_MAX_CONNECTIONS` | `10` | Pool size |
//! | `SERVER_ADDRESS` | `0.0.0.0:8080` | HTTP bind address |
//! | `JWT_SECRET` | `dev-secret` | HS256 verification key |
//! | `TRANSFER_TIMEOUT_MS` | `5000` | Deadline for one transfer, including lock waits |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_JWT_SECRET: &str = "dev-secret";
const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub server_address: SocketAddr,
    pub jwt_secret: String,
    pub transfer_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let server_address = get("SERVER_ADDRESS")
            .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "SERVER_ADDRESS",
                reason: e.to_string(),
            })?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let timeout_ms = match get("TRANSFER_TIMEOUT_MS") {
            Some(raw) => parse_positive::<u64>("TRANSFER_TIMEOUT_MS", &raw)?,
            None => DEFAULT_TRANSFER_TIMEOUT_MS,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse_positive::<u32>("DATABASE_MAX_CONNECTIONS", &raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            database_max_connections,
            server_address,
            jwt_secret,
            transfer_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn parse_positive<N>(key: &'static str, raw: &str) -> Result<N, ConfigError>
where
    N: std::str::FromStr + PartialOrd + Default,
    N::Err: std::fmt::Display,
{
    let value = raw.parse::<N>().map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })?;
    if value <= N::default() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
