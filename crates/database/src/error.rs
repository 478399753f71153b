use std::time::Duration;
use thiserror::Error;

/// Why a single step of a database call did not complete.
#[derive(Error, Debug)]
pub enum Fault {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    #[error("deadline of {0:?} expired")]
    TimedOut(Duration),

    #[error("call was cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database configuration: {0}")]
    Config(String),

    #[error("Failed to reach the database while {stage}: {source}")]
    Connectivity {
        stage: &'static str,
        #[source]
        source: Fault,
    },

    #[error("Failed to create {object}: {source}")]
    Ddl {
        object: String,
        #[source]
        source: Fault,
    },

    #[error("Failed to prepare statement: {0}")]
    Statement(#[source] Fault),

    #[error("Failed to execute statement: {0}")]
    Execution(#[source] Fault),

    #[error("The requested item was not found in the database.")]
    NotFound,

    #[error("Failed to read result rows: {0}")]
    Scan(#[source] Fault),

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl DbError {
    fn fault(&self) -> Option<&Fault> {
        match self {
            DbError::Connectivity { source, .. } | DbError::Ddl { source, .. } => Some(source),
            DbError::Statement(f) | DbError::Execution(f) | DbError::Scan(f) => Some(f),
            DbError::Config(_) | DbError::NotFound | DbError::Validation(_) => None,
        }
    }

    /// True when the call gave up because its deadline passed, including a
    /// pool that stayed exhausted until then.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.fault(),
            Some(Fault::TimedOut(_)) | Some(Fault::Sql(sqlx::Error::PoolTimedOut))
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.fault(), Some(Fault::Cancelled))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound)
    }
}

impl From<configuration::error::ConfigError> for DbError {
    fn from(e: configuration::error::ConfigError) -> Self {
        DbError::Config(e.to_string())
    }
}
