use crate::audit::emitter::{DEFAULT_AUDIT_BUFFER_SIZE, DEFAULT_AUDIT_SEND_TIMEOUT};
use crate::tasks::expired_cleanup::{
    ExpiredCleanupConfig, DEFAULT_CHECK_INTERVAL_SECONDS, DEFAULT_GRACE_PERIOD_SECONDS,
};
use common::config::{DatabaseConfig, LogFormat, ObservabilityConfig, UnknownLogFormat};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,authn=debug,tower_http=debug";

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Audit emission settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// Emit audit events for deletions of audited methods.
    pub logging_enabled: bool,
    /// Capacity of the emitter channel.
    pub buffer_size: usize,
    /// How long a request may wait for channel capacity before the event is dropped.
    pub send_timeout: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            logging_enabled: false,
            buffer_size: DEFAULT_AUDIT_BUFFER_SIZE,
            send_timeout: DEFAULT_AUDIT_SEND_TIMEOUT,
        }
    }
}

/// Service configuration. `Debug` never prints the bootstrap token or the
/// database URL.
pub struct Config {
    pub bind_address: String,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub audit: AuditConfig,
    pub cleanup: ExpiredCleanupConfig,
    /// Client token for the TOKEN authentication provisioned on first start.
    pub bootstrap_token: Option<SecretString>,
    pub observability: ObservabilityConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field(
                "database",
                &self.database.as_ref().map(|db| db.max_connections),
            )
            .field("audit", &self.audit)
            .field("cleanup", &self.cleanup)
            .field(
                "bootstrap_token",
                &self.bootstrap_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("observability", &self.observability)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Invalid LOG_FORMAT: {0}")]
    InvalidLogFormat(#[from] UnknownLogFormat),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let database = match non_empty(vars, "DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                postgres_url: url.to_string(),
                max_connections: parse_var(
                    vars,
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                )?,
            }),
            None => None,
        };

        let audit = AuditConfig {
            logging_enabled: parse_bool(vars, "AUTHN_AUDIT_LOGGING_ENABLED", false)?,
            buffer_size: parse_var(vars, "AUTHN_AUDIT_BUFFER_SIZE", DEFAULT_AUDIT_BUFFER_SIZE)?,
            send_timeout: Duration::from_millis(parse_var(
                vars,
                "AUTHN_AUDIT_SEND_TIMEOUT_MS",
                DEFAULT_AUDIT_SEND_TIMEOUT.as_millis() as u64,
            )?),
        };
        if audit.buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "AUTHN_AUDIT_BUFFER_SIZE".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let cleanup = ExpiredCleanupConfig {
            check_interval_seconds: parse_var(
                vars,
                "AUTHN_CLEANUP_INTERVAL_SECONDS",
                DEFAULT_CHECK_INTERVAL_SECONDS,
            )?,
            grace_period_seconds: parse_var(
                vars,
                "AUTHN_CLEANUP_GRACE_PERIOD_SECONDS",
                DEFAULT_GRACE_PERIOD_SECONDS,
            )?,
        };
        if cleanup.check_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                name: "AUTHN_CLEANUP_INTERVAL_SECONDS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let bootstrap_token =
            non_empty(vars, "AUTHN_BOOTSTRAP_TOKEN").map(|t| SecretString::from(t.to_string()));

        let log_format = match vars.get("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        Ok(Config {
            bind_address,
            database,
            audit,
            cleanup,
            bootstrap_token,
            observability: ObservabilityConfig {
                log_level: DEFAULT_LOG_FILTER.to_string(),
                log_format,
            },
        })
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(vars, name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(vars: &HashMap<String, String>, name: &str, default: bool) -> Result<bool, ConfigError> {
    match non_empty(vars, name).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}
