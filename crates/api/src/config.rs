//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

pub const DEV_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    /// JSON directory seed; the built-in development seed is used when unset.
    pub seed_file: Option<PathBuf>,
    /// Largest request body the gate will buffer.
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            seed_file: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ApiConfig {
    /// Read `JWT_SECRET`, `BIND_ADDR`, `SEED_FILE` and `MAX_BODY_BYTES`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8080")?;

        let max_body_bytes = match get("MAX_BODY_BYTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MAX_BODY_BYTES must be a byte count, got '{raw}'"))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            jwt_secret,
            bind_addr,
            seed_file: get("SEED_FILE").map(PathBuf::from),
            max_body_bytes,
        })
    }
}
