//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use tourney::cache::CacheConfig;
use tourney::db::DatabaseConfig;
use tourney::tournament::TournamentRules;

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Backends the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// PostgreSQL + Redis
    External,
    /// In-process store and cache, nothing persisted
    Memory,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Which backends to use
    pub backend: Backend,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Ranked cache configuration
    pub cache: CacheConfig,
    /// Entry fee and capacity
    pub rules: TournamentRules,
    /// Prometheus exporter address, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Values given on the command line, taking precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if an address variable cannot be parsed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or_else(default_bind),
        };

        let database_url = overrides
            .database_url
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| DatabaseConfig::development().database_url);

        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 2),
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 5),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800),
        };

        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            url: overrides
                .redis_url
                .or_else(|| std::env::var("REDIS_URL").ok())
                .unwrap_or(defaults.url),
            key_prefix: std::env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        };

        let default_rules = TournamentRules::default();
        let rules = TournamentRules {
            entry_fee: parse_env_or("TOURNAMENT_ENTRY_FEE", default_rules.entry_fee),
            capacity: parse_env_or("TOURNAMENT_CAPACITY", default_rules.capacity),
        };

        let backend = if overrides.memory || parse_env_or("USE_MEMORY_BACKEND", false) {
            Backend::Memory
        } else {
            Backend::External
        };

        Ok(ServerConfig {
            bind,
            backend,
            database,
            cache,
            rules,
            metrics_bind: parse_addr("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.entry_fee < 0 {
            return Err(ConfigError::Invalid {
                var: "TOURNAMENT_ENTRY_FEE".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        if self.rules.capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "TOURNAMENT_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.backend == Backend::External {
            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }

            if !self.cache.url.starts_with("redis://") && !self.cache.url.starts_with("rediss://")
            {
                return Err(ConfigError::Invalid {
                    var: "REDIS_URL".to_string(),
                    reason: "Must start with redis:// or rediss://".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Parse an optional socket address variable
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("{value:?} is not a socket address: {e}"),
            }),
        Err(_) => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
