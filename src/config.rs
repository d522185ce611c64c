// Configuration management

use crate::core::errors::KeeperError;
use secrecy::{ExposeSecret, Secret};
use std::env;
use std::path::Path;

/// Minimum signing key length, in bytes
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;

/// Longest allowed session token lifetime (30 days)
pub const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 3600;

/// Application configuration loaded from environment variables
///
/// Validated on load; an invalid configuration never reaches the server.
#[derive(Debug)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Storage (in-memory when absent)
    pub database_url: Option<String>,

    // Session tokens
    pub token_secret: Secret<String>,
    pub token_ttl_secs: u64,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    /// The signing key comes from `TOKEN_SECRET_FILE` when set, otherwise
    /// from `TOKEN_SECRET`.
    pub fn from_env() -> Result<Self, KeeperError> {
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_port()?,
            database_url: Self::get_optional_env("DATABASE_URL"),
            token_secret: Self::load_token_secret()?,
            token_ttl_secs: Self::parse_u64_or_default("TOKEN_TTL_SECS", 3600)?,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_usize_or_default("BODY_SIZE_LIMIT_BYTES", 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "json"),
        };

        config.validate()?;

        Ok(config)
    }

    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn load_token_secret() -> Result<Secret<String>, KeeperError> {
        if let Some(path) = Self::get_optional_env("TOKEN_SECRET_FILE") {
            return Self::read_secret_file(Path::new(&path));
        }

        env::var("TOKEN_SECRET")
            .map(Secret::new)
            .map_err(|_| KeeperError::Configuration("TOKEN_SECRET not set".to_string()))
    }

    /// Read a signing key from a file, ignoring surrounding whitespace
    fn read_secret_file(path: &Path) -> Result<Secret<String>, KeeperError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            KeeperError::Configuration(format!("Cannot read token secret file {:?}: {}", path, e))
        })?;
        Ok(Secret::new(raw.trim().to_string()))
    }

    /// Parse port from PORT environment variable
    fn parse_port() -> Result<u16, KeeperError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        Self::parse_port_value(&port_str)
    }

    fn parse_port_value(port_str: &str) -> Result<u16, KeeperError> {
        let port = port_str.parse::<u16>().map_err(|e| {
            KeeperError::Configuration(format!("Invalid PORT value '{}': {}", port_str, e))
        })?;

        if port == 0 {
            return Err(KeeperError::Configuration(
                "PORT must be between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, KeeperError> {
        match env::var(key) {
            Ok(value) => Self::parse_positive(key, &value),
            _ => Ok(default),
        }
    }

    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, KeeperError> {
        match env::var(key) {
            Ok(value) => Self::parse_positive(key, &value),
            _ => Ok(default),
        }
    }

    /// Parse a strictly positive integer
    fn parse_positive<T>(key: &str, value: &str) -> Result<T, KeeperError>
    where
        T: std::str::FromStr + PartialEq + Default,
        T::Err: std::fmt::Display,
    {
        let parsed = value.parse::<T>().map_err(|e| {
            KeeperError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
        })?;

        if parsed == T::default() {
            return Err(KeeperError::Configuration(format!(
                "{} must be greater than 0",
                key
            )));
        }

        Ok(parsed)
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), KeeperError> {
        Self::validate_token_secret(&self.token_secret)?;

        if self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(KeeperError::Configuration(format!(
                "TOKEN_TTL_SECS must be at most {}",
                MAX_TOKEN_TTL_SECS
            )));
        }

        if let Some(ref url) = self.database_url {
            Self::validate_url(url, "Database URL")?;
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    fn validate_token_secret(secret: &Secret<String>) -> Result<(), KeeperError> {
        let len = secret.expose_secret().len();
        if len < MIN_TOKEN_SECRET_BYTES {
            return Err(KeeperError::Configuration(format!(
                "TOKEN_SECRET must be at least {} bytes, got {}",
                MIN_TOKEN_SECRET_BYTES, len
            )));
        }
        Ok(())
    }

    fn validate_url(url: &str, description: &str) -> Result<(), KeeperError> {
        url::Url::parse(url).map_err(|e| {
            KeeperError::Configuration(format!("Invalid {} '{}': {}", description, url, e))
        })?;
        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), KeeperError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(KeeperError::Configuration(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), KeeperError> {
        if format != "json" && format != "text" {
            return Err(KeeperError::Configuration(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }

    /// Session token lifetime
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs.min(MAX_TOKEN_TTL_SECS) as i64)
    }
}

impl Config {
    /// Create a test configuration
    ///
    /// Bypasses environment loading: in-memory storage, fixed signing key.
    pub fn test_config() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            database_url: None,
            token_secret: Secret::new("test-token-secret-0123456789abcdef0123".to_string()),
            token_ttl_secs: 3600,
            request_timeout_secs: 30,
            body_size_limit_bytes: 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }

    /// Load and validate a signing key from a file
    pub fn token_secret_from_file(path: &Path) -> Result<Secret<String>, KeeperError> {
        let secret = Self::read_secret_file(path)?;
        Self::validate_token_secret(&secret)?;
        Ok(secret)
    }
}
