use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Upper bound on any configured timeout, in seconds (one day).
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
}

/// Where the catalog lives and how to talk to it.
///
/// Unknown keys are rejected. Prepared-statement caching in particular is
/// not configurable: statements are always released when their call ends.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSettings {
    /// Host name or IP address of the MySQL server.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// The database the session is bound to. Created on first connect if missing.
    pub name: String,
    pub pool: PoolSettings,
    pub timeouts: TimeoutSettings,
}

/// Limits applied to the connection pool backing a session.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Hard cap on concurrently open connections. Callers wait once it is reached.
    pub max_open_connections: u32,
    /// Upper bound on idle connections. The pool never opens connections
    /// just to keep them idle; idle ones are reaped after `idle_timeout_secs`.
    pub max_idle_connections: u32,
    /// A connection is retired after this many seconds, busy or not.
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Per-step deadlines, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    pub connect_secs: u64,
    pub ddl_secs: u64,
    pub ping_secs: u64,
    /// Default deadline for a single read or write call, including the wait for a pooled connection.
    pub statement_secs: u64,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()
    }
}

impl DatabaseSettings {
    /// Checks the invariants `config` cannot express through types alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError("database.host must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError("database.name must not be empty".into()));
        }
        self.pool.validate()?;
        self.timeouts.validate()
    }
}

impl PoolSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.pool.max_open_connections must be at least 1".into(),
            ));
        }
        if self.max_idle_connections > self.max_open_connections {
            return Err(ConfigError::ValidationError(format!(
                "database.pool.max_idle_connections ({}) exceeds max_open_connections ({})",
                self.max_idle_connections, self.max_open_connections
            )));
        }
        if self.max_lifetime_secs == 0 {
            return Err(ConfigError::ValidationError(
                "database.pool.max_lifetime_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl TimeoutSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            ("connect_secs", self.connect_secs),
            ("ddl_secs", self.ddl_secs),
            ("ping_secs", self.ping_secs),
            ("statement_secs", self.statement_secs),
        ];
        for (key, secs) in all {
            if secs == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "database.timeouts.{key} must be positive"
                )));
            }
            if secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "database.timeouts.{key} ({secs}) exceeds {MAX_TIMEOUT_SECS}"
                )));
            }
        }
        Ok(())
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn ddl(&self) -> Duration {
        Duration::from_secs(self.ddl_secs)
    }

    pub fn ping(&self) -> Duration {
        Duration::from_secs(self.ping_secs)
    }

    pub fn statement(&self) -> Duration {
        Duration::from_secs(self.statement_secs)
    }
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("name", &self.name)
            .field("pool", &self.pool)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
