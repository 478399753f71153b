use crate::context::CallContext;
use crate::error::DbError;
use configuration::{DatabaseSettings, MAX_TIMEOUT_SECS};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::{Connection, Executor};
use std::sync::Arc;
use std::time::Duration;

/// MySQL caps identifiers at 64 characters.
const MAX_IDENTIFIER_LEN: usize = 64;

/// No per-connection statement cache: sqlx closes each prepared statement on
/// the server as soon as the call that prepared it is done.
const STATEMENT_CACHE_CAPACITY: usize = 0;

/// A pooled handle bound to one target database.
///
/// Cloning is cheap and every clone shares the same pool, so concurrent
/// callers can each hold one. The pool is the only coordination between
/// them: when all connections are busy, callers wait inside their own
/// deadline for one to come back.
#[derive(Debug, Clone)]
pub struct Session {
    pool: MySqlPool,
    database: Arc<str>,
    statement_timeout: Duration,
}

impl Session {
    /// Wraps an existing pool. `acquire_session` is the usual way in.
    pub fn new(pool: MySqlPool, database: impl Into<Arc<str>>, statement_timeout: Duration) -> Self {
        Self {
            pool,
            database: database.into(),
            statement_timeout,
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// A fresh call context using the configured statement timeout.
    pub fn context(&self) -> CallContext {
        CallContext::new(self.statement_timeout)
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(database = %self.database, "Database session closed.");
    }
}

/// Establishes a session against the database named in `settings`.
///
/// The target database is created first if it does not exist, using a
/// throwaway connection that has no database selected. The pool is then
/// built against the target and proven alive with a ping. Each step has its
/// own deadline, and nothing is retried.
pub async fn acquire_session(settings: &DatabaseSettings) -> Result<Session, DbError> {
    settings.validate()?;
    validate_database_name(&settings.name)?;

    let timeouts = &settings.timeouts;
    let server = server_options(settings);

    let opening = CallContext::new(timeouts.connect());
    let mut conn = opening
        .run(MySqlConnection::connect_with(&server))
        .await
        .map_err(|source| {
            tracing::warn!(host = %settings.host, port = settings.port, error = %source, "Could not open server connection.");
            DbError::Connectivity {
                stage: "opening the server connection",
                source,
            }
        })?;

    let create = format!("CREATE DATABASE IF NOT EXISTS `{}`", settings.name);
    let ddl = CallContext::new(timeouts.ddl());
    let result = ddl
        .run(conn.execute(create.as_str()))
        .await
        .map_err(|source| {
            tracing::warn!(database = %settings.name, error = %source, "Could not create database.");
            DbError::Ddl {
                object: format!("database {}", settings.name),
                source,
            }
        })?;
    tracing::debug!(
        database = %settings.name,
        rows_affected = result.rows_affected(),
        "Ensured database exists."
    );

    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Server connection did not close cleanly.");
    }

    let limits = &settings.pool;
    let pool = pool_options(settings).connect_lazy_with(server.database(&settings.name));

    let ping = CallContext::new(timeouts.ping());
    let alive = ping
        .run(async {
            let mut conn = pool.acquire().await?;
            conn.ping().await
        })
        .await;
    if let Err(source) = alive {
        tracing::warn!(database = %settings.name, error = %source, "Liveness check failed.");
        pool.close().await;
        return Err(DbError::Connectivity {
            stage: "pinging the target database",
            source,
        });
    }

    tracing::info!(
        database = %settings.name,
        max_open = limits.max_open_connections,
        max_idle = limits.max_idle_connections,
        "Connected to database."
    );
    Ok(Session::new(pool, settings.name.as_str(), timeouts.statement()))
}

fn server_options(settings: &DatabaseSettings) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.username)
        .password(&settings.password)
        .statement_cache_capacity(STATEMENT_CACHE_CAPACITY)
}

/// Pool limits for a session.
///
/// sqlx has no cap on idle connections, only a floor. The floor stays at
/// zero so the pool never opens connections on its own; idle ones are closed
/// after `idle_timeout_secs`, which bounds them instead. The acquire timeout
/// is only a ceiling: each call's [`CallContext`] decides how long it waits.
fn pool_options(settings: &DatabaseSettings) -> MySqlPoolOptions {
    let limits = &settings.pool;
    MySqlPoolOptions::new()
        .max_connections(limits.max_open_connections)
        .min_connections(0)
        .idle_timeout(Some(limits.idle_timeout()))
        .max_lifetime(Some(limits.max_lifetime()))
        .acquire_timeout(Duration::from_secs(MAX_TIMEOUT_SECS))
}

/// The database name is spliced into DDL, so only plain identifier
/// characters are accepted.
pub(crate) fn validate_database_name(name: &str) -> Result<(), DbError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid {
        Ok(())
    } else {
        Err(DbError::Config(format!(
            "database name '{name}' must be 1-{MAX_IDENTIFIER_LEN} characters of [A-Za-z0-9_$]"
        )))
    }
}
