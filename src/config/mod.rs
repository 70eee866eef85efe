use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" => Ok(StorageBackend::Postgres),
            other => Err(anyhow!("unknown STORAGE_BACKEND: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    /// Resolved once at startup; handlers never branch on the backend.
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub token_key: [u8; 32],
    pub token_ttl_hours: u64,
    pub mapbox_access_token: Option<String>,
    pub aggregation_timeout_ms: u64,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        SocketAddr::from_str(&http_addr).map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let storage_backend: StorageBackend = env_or("STORAGE_BACKEND", "memory").parse()?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL is required for the postgres backend"));
        }

        Ok(Self {
            http_addr,
            storage_backend,
            database_url,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            token_key: env_key_32("TOKEN_KEY")?,
            token_ttl_hours: env_or_parse("TOKEN_TTL_HOURS", "24")?,
            mapbox_access_token: std::env::var("MAPBOX_ACCESS_TOKEN").ok(),
            aggregation_timeout_ms: env_or_parse("AGGREGATION_TIMEOUT_MS", "5000")?,
            seed_demo_data: env_or_parse("SEED_DEMO_DATA", "true")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn unparseable_http_addr_fails_startup() {
        std::env::set_var("HTTP_ADDR", "not-an-address");
        let err = AppConfig::from_env().unwrap_err();
        std::env::remove_var("HTTP_ADDR");
        assert!(err.to_string().contains("invalid HTTP_ADDR"));
    }
}
