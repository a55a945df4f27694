//! Server configuration module.
//!
//! Parses configuration from environment variables for the to-do list server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 8080 | HTTP server port |
//! | `TODO_SESSION_TTL_SECS` | No | 86400 | Idle lifetime of a server-side session |
//! | `TODO_MAX_SESSIONS` | No | 10000 | Maximum number of concurrent sessions |
//! | `TODO_SESSION_CLEANUP_SECS` | No | 60 | Interval of the expired-session sweep |
//! | `TODO_SECURE_COOKIE` | No | false | Mark the session cookie `Secure` (HTTPS only) |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::session::{SessionStoreConfig, DEFAULT_MAX_CAPACITY, DEFAULT_TTL_SECS};

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 8080;

/// Default interval between expired-session sweeps.
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Idle lifetime of a session, refreshed on every request.
    pub session_ttl: Duration,

    /// Maximum number of sessions held at once.
    pub max_sessions: usize,

    /// Interval of the background sweep that drops expired sessions.
    pub cleanup_interval: Duration,

    /// When true, the session cookie carries the `Secure` attribute.
    pub secure_cookie: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_sessions: DEFAULT_MAX_CAPACITY,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            secure_cookie: false,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Port number is not a valid u16
    /// - A numeric variable is not a number
    /// - A duration or capacity is zero
    ///
    /// # Example
    ///
    /// ```no_run
    /// use todo_lists_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port()?;
        let session_ttl = Duration::from_secs(parse_number_env(
            "TODO_SESSION_TTL_SECS",
            DEFAULT_TTL_SECS,
        )?);
        let max_sessions = parse_number_env("TODO_MAX_SESSIONS", DEFAULT_MAX_CAPACITY)?;
        let cleanup_interval = Duration::from_secs(parse_number_env(
            "TODO_SESSION_CLEANUP_SECS",
            DEFAULT_CLEANUP_INTERVAL_SECS,
        )?);
        let secure_cookie = parse_bool_env("TODO_SECURE_COOKIE");

        let config = Self {
            port,
            session_ttl,
            max_sessions,
            cleanup_interval,
            secure_cookie,
        };

        config.validate()?;

        Ok(config)
    }

    /// Session store settings derived from this configuration.
    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig::new(self.max_sessions, self.session_ttl)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl.is_zero() {
            return Err(ConfigError::ValidationError(
                "TODO_SESSION_TTL_SECS must be greater than zero".to_string(),
            ));
        }

        if self.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "TODO_MAX_SESSIONS must be greater than zero".to_string(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "TODO_SESSION_CLEANUP_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the variable is set to "true" (case-insensitive),
/// `false` otherwise.
fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.trim().parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse a numeric environment variable, falling back to `default` when unset.
fn parse_number_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|err: T::Err| ConfigError::InvalidFormat {
                var: name.to_string(),
                message: err.to_string(),
            }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}
