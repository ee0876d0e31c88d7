//! Process configuration for the HTTP server.
//!
//! # Responsibility
//! - Resolve database location, bind address and logging settings from the
//!   environment.
//! - Reject malformed values at startup instead of at first request.
//!
//! # Invariants
//! - The database is always a file path; in-memory SQLite is refused because
//!   every unit of work opens its own connection.
//! - `log_dir` is absolute.

use genesis_core::{default_log_level, LogLevel, LoggingError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

pub const DATABASE_URL_ENV: &str = "GENESIS_DATABASE_URL";
pub const DATABASE_URL_FALLBACK_ENV: &str = "DATABASE_URL";
pub const BIND_ENV: &str = "GENESIS_HTTP_BIND";
pub const LOG_LEVEL_ENV: &str = "GENESIS_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "GENESIS_LOG_DIR";

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_DB_FILE_NAME: &str = "genesis_students.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "genesis-logs";
const SQLITE_URL_PREFIX: &str = "sqlite:///";

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub log_level: LogLevel,
    pub log_dir: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidDatabaseUrl(String),
    InvalidBindAddr {
        value: String,
        source: AddrParseError,
    },
    InvalidLogLevel(LoggingError),
    InvalidLogDir(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDatabaseUrl(message) => write!(f, "invalid database url: {message}"),
            Self::InvalidBindAddr { value, source } => {
                write!(f, "invalid {BIND_ENV} `{value}`: {source}")
            }
            Self::InvalidLogLevel(err) => write!(f, "invalid {LOG_LEVEL_ENV}: {err}"),
            Self::InvalidLogDir(value) => {
                write!(f, "{LOG_DIR_ENV} must be an absolute path, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBindAddr { source, .. } => Some(source),
            Self::InvalidLogLevel(err) => Some(err),
            _ => None,
        }
    }
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let database_path = match read(DATABASE_URL_ENV).or_else(|| read(DATABASE_URL_FALLBACK_ENV))
        {
            Some(value) => parse_database_url(&value)?,
            None => std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
        };

        let bind = read(BIND_ENV).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind.clone(),
                source,
            })?;

        let log_level = match read(LOG_LEVEL_ENV) {
            Some(value) => LogLevel::from_str(&value).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        let log_dir = match read(LOG_DIR_ENV) {
            Some(value) => {
                let path = PathBuf::from(&value);
                if !path.is_absolute() {
                    return Err(ConfigError::InvalidLogDir(value));
                }
                path
            }
            None => std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME),
        };

        Ok(Self {
            database_path,
            bind_addr,
            log_level,
            log_dir,
        })
    }
}

/// Accepts a plain file path or a `sqlite:///<path>` URL.
///
/// `sqlite:///data/app.db` is relative, `sqlite:////srv/app.db` is absolute.
fn parse_database_url(value: &str) -> Result<PathBuf, ConfigError> {
    let path = if let Some(rest) = value.strip_prefix(SQLITE_URL_PREFIX) {
        rest
    } else if value.contains("://") {
        return Err(ConfigError::InvalidDatabaseUrl(format!(
            "only sqlite:/// urls are supported, got `{value}`"
        )));
    } else {
        value
    };

    if path.is_empty() || path == ":memory:" {
        return Err(ConfigError::InvalidDatabaseUrl(
            "a file-backed sqlite database is required".to_string(),
        ));
    }
    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use genesis_core::LogLevel;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5000");
        assert!(config.database_path.ends_with("genesis_students.sqlite3"));
        assert!(config.log_dir.is_absolute());
    }

    #[test]
    fn sqlite_urls_and_plain_paths_are_accepted() {
        let config = config_from(&[("GENESIS_DATABASE_URL", "sqlite:////srv/gs.db")]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/gs.db"));

        let config = config_from(&[("DATABASE_URL", "sqlite:///data/gs_manager.db")]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("data/gs_manager.db"));

        let config = config_from(&[
            ("GENESIS_DATABASE_URL", "/tmp/primary.db"),
            ("DATABASE_URL", "/tmp/fallback.db"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/primary.db"));
    }

    #[test]
    fn unsupported_database_urls_are_rejected() {
        for url in ["postgres://db/app", "sqlite:///:memory:", "sqlite:///"] {
            assert!(
                matches!(
                    config_from(&[("GENESIS_DATABASE_URL", url)]),
                    Err(ConfigError::InvalidDatabaseUrl(_))
                ),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn bind_and_log_settings_are_parsed() {
        let config = config_from(&[
            ("GENESIS_HTTP_BIND", "0.0.0.0:8080"),
            ("GENESIS_LOG_LEVEL", "Warning"),
            ("GENESIS_LOG_DIR", "/var/log/genesis"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/genesis"));
    }

    #[test]
    fn malformed_settings_fail_fast() {
        assert!(matches!(
            config_from(&[("GENESIS_HTTP_BIND", "localhost")]),
            Err(ConfigError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            config_from(&[("GENESIS_LOG_LEVEL", "loud")]),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert!(matches!(
            config_from(&[("GENESIS_LOG_DIR", "relative/logs")]),
            Err(ConfigError::InvalidLogDir(_))
        ));
    }
}
