use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub observability: ObservabilityConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HTML file served at `/`
    pub index_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    /// Create the schema on startup if it is missing
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    File,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub ttl_seconds: u64,
    /// Directory holding one file per entry (file backend)
    pub directory: PathBuf,
    /// Connection URL (redis backend)
    #[serde(default)]
    pub redis_url: Option<String>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub cors_allowed_origins: Vec<String>,
    pub cors_max_age_seconds: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Load configuration, layering `extra` (if given) over the default and
    /// environment-specific files and under the environment variables.
    pub fn load_with(extra: Option<&Path>) -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let environment =
            env::var("FINANCIERA_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(
                config::File::with_name(&format!("config/{}", environment)).required(false),
            );

        if let Some(path) = extra {
            builder = builder.add_source(config::File::from(path));
        }

        // e.g., FINANCIERA__RATE_LIMIT__MAX_REQUESTS=50
        let config = builder
            .add_source(
                config::Environment::with_prefix("FINANCIERA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Configuration(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Configuration("Invalid port number".to_string()));
        }

        if self.database.url.is_empty() {
            return Err(AppError::Configuration(
                "Database URL is required".to_string(),
            ));
        }

        if self.rate_limit.window_seconds == 0 {
            return Err(AppError::Configuration(
                "Rate limit window must be greater than zero".to_string(),
            ));
        }

        if self.cache.ttl_seconds == 0 {
            return Err(AppError::Configuration(
                "Cache TTL must be greater than zero".to_string(),
            ));
        }

        if self.cache.backend == CacheBackend::Redis
            && self.cache.redis_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(AppError::Configuration(
                "Redis URL is required for the redis cache backend".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = Config::load().expect("Failed to load config");
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(900));
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));

        // Test invalid port
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_and_ttl_rejected() {
        let mut config = Config::load().expect("Failed to load config");
        config.rate_limit.window_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::load().expect("Failed to load config");
        config.cache.ttl_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let mut config = Config::load().expect("Failed to load config");
        config.cache.backend = CacheBackend::Redis;
        config.cache.redis_url = None;
        assert!(config.validate().is_err());

        config.cache.redis_url = Some("redis://localhost:6379".to_string());
        assert!(config.validate().is_ok());
    }
}
