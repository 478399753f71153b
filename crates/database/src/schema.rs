use crate::connection::Session;
use crate::context::CallContext;
use crate::error::DbError;
use sqlx::Executor;

pub(crate) const CREATE_ITEM_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS item (
        item_id    BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
        item_name  TEXT NOT NULL,
        item_price INT NOT NULL,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

/// Creates the `item` table unless it already exists.
///
/// Safe to call any number of times. The server reports a different
/// affected-row count for "created" and "already there", so only the absence
/// of an error is meaningful; the count is logged and otherwise ignored.
pub async fn ensure_schema(session: &Session, ctx: &CallContext) -> Result<(), DbError> {
    let result = ctx
        .run(session.pool().execute(CREATE_ITEM_TABLE))
        .await
        .map_err(|source| {
            tracing::warn!(error = %source, "Could not create item table.");
            DbError::Ddl {
                object: "table item".to_string(),
                source,
            }
        })?;

    tracing::debug!(
        database = %session.database(),
        rows_affected = result.rows_affected(),
        "Ensured item table exists."
    );
    Ok(())
}
