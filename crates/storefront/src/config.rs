//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL used in pagination links (default: `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_CATALOG_PATH` - YAML catalog seed, loaded when no database is configured
//! - `STOREFRONT_PAGE_SIZE` - Default API page size (default: 10)
//! - `STOREFRONT_MAX_PAGE_SIZE` - Largest page size a client may request (default: 50)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "3000";
const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_PAGE_SIZE: &str = "10";
const DEFAULT_MAX_PAGE_SIZE: &str = "50";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Catalog seed file used when running without a database
    pub catalog_path: Option<PathBuf>,
    /// API pagination settings
    pub pagination: PaginationConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Page sizes for paginated API listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Page size when the client does not ask for one
    pub default_page_size: u32,
    /// Upper bound on a client-requested page size
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 50,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            catalog_path: None,
            pagination: PaginationConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_env(&env, "STOREFRONT_HOST", DEFAULT_HOST)?;
        let port = parse_env(&env, "STOREFRONT_PORT", DEFAULT_PORT)?;
        let base_url: Url = parse_env(&env, "STOREFRONT_BASE_URL", DEFAULT_BASE_URL)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_BASE_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        let pagination = PaginationConfig {
            default_page_size: parse_env(&env, "STOREFRONT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            max_page_size: parse_env(&env, "STOREFRONT_MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE)?,
        };
        validate_pagination(pagination)?;

        Ok(Self {
            database_url: get_database_url(&env, "STOREFRONT_DATABASE_URL"),
            host,
            port,
            base_url,
            catalog_path: get_optional_env(&env, "STOREFRONT_CATALOG_PATH").map(PathBuf::from),
            pagination,
            sentry_dsn: get_optional_env(&env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&env, "SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(
    env: &impl Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Option<SecretString> {
    get_optional_env(env, primary_key)
        .or_else(|| get_optional_env(env, "DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(env, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_pagination(pagination: PaginationConfig) -> Result<(), ConfigError> {
    if pagination.max_page_size == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_MAX_PAGE_SIZE".to_string(),
            "must be at least 1".to_string(),
        ));
    }
    if pagination.default_page_size == 0 || pagination.default_page_size > pagination.max_page_size
    {
        return Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_PAGE_SIZE".to_string(),
            format!("must be between 1 and {}", pagination.max_page_size),
        ));
    }
    Ok(())
}
