//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use bracket_engine::db::DatabaseConfig;
use std::{fmt, net::SocketAddr, str::FromStr};

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:7878";

/// Where tournaments are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ConfigError::Invalid {
                var: "STORAGE".to_string(),
                reason: format!("expected `memory` or `postgres`, got `{other}`"),
            }),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    pub storage: StorageBackend,
    /// Only used with `StorageBackend::Postgres`
    pub database: DatabaseConfig,
    /// Prometheus exporter address; exporter disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables, applying CLI overrides
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but invalid
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_env_required_format("SERVER_BIND")?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 7878))),
        };

        let mut database = DatabaseConfig::from_env();
        let database_url = overrides
            .database_url
            .or_else(|| std::env::var("DATABASE_URL").ok());

        let storage = if overrides.memory {
            StorageBackend::Memory
        } else {
            match std::env::var("STORAGE") {
                Ok(value) => value.parse()?,
                Err(_) if database_url.is_some() => StorageBackend::Postgres,
                Err(_) => StorageBackend::Memory,
            }
        };
        if let Some(url) = database_url {
            database.database_url = url;
        }

        let metrics_bind = parse_env_required_format("METRICS_BIND")?;

        Ok(ServerConfig {
            bind,
            storage,
            database,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage == StorageBackend::Postgres && self.database.database_url.trim().is_empty()
        {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set DATABASE_URL or run with --memory".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an optional variable, rejecting values that are set but malformed
fn parse_env_required_format<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}
