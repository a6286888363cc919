//! API server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                   | Default           |
//! |----------------------------|-------------------|
//! | `HTTP_PORT`                | `8000`            |
//! | `DATABASE_PATH`            | `./stockroom.db`  |
//! | `JWT_SECRET`               | development value |
//! | `JWT_ACCESS_LIFETIME_SECS` | `3600`            |
//! | `HISTORY_UTC_OFFSET_HOURS` | `5`               |
//! | `EXPORT_DIR`               | unset (disabled)  |
//! | `EXPORT_INTERVAL_SECS`     | `3600`            |
//! | `ADMIN_USERNAME`           | unset             |
//! | `ADMIN_PASSWORD`           | unset             |
//!
//! `ADMIN_USERNAME` and `ADMIN_PASSWORD` go together: when both are set the
//! server creates that admin account at startup if it does not exist yet.
//! Open registration only ever creates staff accounts.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use tracing::warn;

const DEV_JWT_SECRET: &str = "stockroom-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Offset history titles are rendered in
    pub display_offset: FixedOffset,

    /// Where periodic snapshots go; `None` disables the export task
    pub export_dir: Option<PathBuf>,

    /// Time between snapshots
    pub export_interval: Duration,

    /// Admin account ensured at startup
    pub admin: Option<AdminAccount>,
}

/// Credentials of the bootstrap admin.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAccount")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            // In production, this MUST be set via environment variable
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });
        if jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }

        let offset_hours: i32 = parse_or(&lookup, "HISTORY_UTC_OFFSET_HOURS", 5)?;
        let display_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| ConfigError::InvalidValue("HISTORY_UTC_OFFSET_HOURS".to_string()))?;

        let jwt_access_lifetime_secs: i64 = parse_or(&lookup, "JWT_ACCESS_LIFETIME_SECS", 3600)?;
        if jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }

        let export_interval_secs: u64 = parse_or(&lookup, "EXPORT_INTERVAL_SECS", 3600)?;
        if export_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("EXPORT_INTERVAL_SECS".to_string()));
        }

        let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminAccount { username, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingRequired("ADMIN_PASSWORD".to_string()))
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingRequired("ADMIN_USERNAME".to_string()))
            }
        };

        Ok(ApiConfig {
            http_port: parse_or(&lookup, "HTTP_PORT", 8000)?,
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./stockroom.db")),
            jwt_secret,
            jwt_access_lifetime_secs,
            display_offset,
            export_dir: lookup("EXPORT_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            export_interval: Duration::from_secs(export_interval_secs),
            admin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_source(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.http_port, 8000);
        assert_eq!(config.database_path, PathBuf::from("./stockroom.db"));
        assert_eq!(config.jwt_access_lifetime_secs, 3600);
        assert_eq!(config.display_offset.local_minus_utc(), 5 * 3600);
        assert!(config.export_dir.is_none());
        assert_eq!(config.export_interval, Duration::from_secs(3600));
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_admin_account_needs_both_values() {
        let config = load(&[("ADMIN_USERNAME", "root"), ("ADMIN_PASSWORD", "hunter22")]).unwrap();
        let admin = config.admin.unwrap();
        assert_eq!(admin.username, "root");
        assert!(!format!("{:?}", admin).contains("hunter22"));

        assert!(matches!(
            load(&[("ADMIN_USERNAME", "root")]),
            Err(ConfigError::MissingRequired(key)) if key == "ADMIN_PASSWORD"
        ));
        assert!(matches!(
            load(&[("ADMIN_PASSWORD", "hunter22")]),
            Err(ConfigError::MissingRequired(key)) if key == "ADMIN_USERNAME"
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HTTP_PORT", "9000"),
            ("HISTORY_UTC_OFFSET_HOURS", "-3"),
            ("EXPORT_DIR", "/var/backups/stockroom"),
            ("JWT_SECRET", "s3cret"),
        ])
        .unwrap();

        assert_eq!(config.http_port, 9000);
        assert_eq!(config.display_offset.local_minus_utc(), -3 * 3600);
        assert_eq!(config.export_dir, Some(PathBuf::from("/var/backups/stockroom")));
        assert_eq!(config.jwt_secret, "s3cret");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("HTTP_PORT", "eighty")]),
            Err(ConfigError::InvalidValue(key)) if key == "HTTP_PORT"
        ));
        assert!(load(&[("HISTORY_UTC_OFFSET_HOURS", "30")]).is_err());
        assert!(load(&[("EXPORT_INTERVAL_SECS", "0")]).is_err());
        assert!(matches!(
            load(&[("JWT_SECRET", "")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
