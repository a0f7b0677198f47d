//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Bounded retry for transient commit failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
        }
    }
}

/// Engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Batches at or above this size fan out over blocking worker tasks
    pub parallel_threshold: usize,
    /// Resources handed to each worker task
    pub chunk_size: usize,
    pub commit_retry: RetryConfig,
    pub timeline_max_entries: usize,
    pub seed_default_policies: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 64,
            chunk_size: 32,
            commit_retry: RetryConfig::default(),
            timeline_max_entries: 90,
            seed_default_policies: true,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub engine: EngineConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let server = ServerConfig {
            host: env_or("HOST", ServerConfig::default().host)?,
            port: env_or("PORT", ServerConfig::default().port)?,
        };

        let cors = CorsConfig {
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|s| parse_origins(&s))
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            parallel_threshold: env_or("ENGINE_PARALLEL_THRESHOLD", defaults.parallel_threshold)?,
            chunk_size: env_or("ENGINE_CHUNK_SIZE", defaults.chunk_size)?,
            commit_retry: RetryConfig {
                max_attempts: env_or("COMMIT_MAX_ATTEMPTS", defaults.commit_retry.max_attempts)?,
                base_delay_ms: env_or("COMMIT_RETRY_BASE_MS", defaults.commit_retry.base_delay_ms)?,
            },
            timeline_max_entries: env_or("TIMELINE_MAX_ENTRIES", defaults.timeline_max_entries)?,
            seed_default_policies: env_or("SEED_DEFAULT_POLICIES", defaults.seed_default_policies)?,
        };

        if engine.chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "ENGINE_CHUNK_SIZE must be greater than zero".to_string(),
            ));
        }
        if engine.commit_retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "COMMIT_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            server,
            cors,
            engine,
        })
    }
}

/// Read and parse an environment variable, falling back to `default` when unset
fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(std::env::VarError::NotUnicode(_)) => {
            Err(ConfigError::InvalidValue(format!("{} is not valid unicode", name)))
        }
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{}={:?}", name, raw)))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_default_engine_config() {
        let config = EngineConfig::default();
        assert_eq!(config.parallel_threshold, 64);
        assert_eq!(config.chunk_size, 32);
        assert_eq!(config.commit_retry.max_attempts, 3);
        assert!(config.seed_default_policies);
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        let parsed: Result<usize, _> = parse_value("ENGINE_CHUNK_SIZE", "lots");
        assert!(matches!(parsed, Err(ConfigError::InvalidValue(_))));

        let parsed: usize = parse_value("ENGINE_CHUNK_SIZE", " 16 ").unwrap();
        assert_eq!(parsed, 16);
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        let origins = parse_origins("http://a.test, ,http://b.test");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}
