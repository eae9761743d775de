//! Runtime configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = ".data";
pub const DEFAULT_MAX_CHECKS_PER_USER: usize = 5;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60 * 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

impl StorageBackend {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("memory" | "mem") => Self::Memory,
            _ => Self::File,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub storage: StorageBackend,
    pub max_checks_per_user: usize,
    pub token_ttl: Duration,
    pub password_secret: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage: StorageBackend::File,
            max_checks_per_user: DEFAULT_MAX_CHECKS_PER_USER,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            password_secret: String::new(),
        }
    }
}

impl AppConfig {
    /// Build config from environment variables. All are optional:
    ///
    /// - `PORT`: default 3000
    /// - `DATA_DIR`: default `.data`
    /// - `STORAGE_BACKEND`: `file` (default) or `memory`
    /// - `MAX_CHECKS_PER_USER`: default 5
    /// - `TOKEN_TTL_SECS`: default 86400
    /// - `PASSWORD_SECRET`: default empty
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            data_dir: std::env::var("DATA_DIR").map_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            storage: StorageBackend::parse(std::env::var("STORAGE_BACKEND").ok().as_deref()),
            max_checks_per_user: env_parse("MAX_CHECKS_PER_USER", DEFAULT_MAX_CHECKS_PER_USER),
            token_ttl: Duration::from_secs(env_parse("TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)),
            password_secret: std::env::var("PASSWORD_SECRET").unwrap_or_default(),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
