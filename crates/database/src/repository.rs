use crate::batch::InsertBatch;
use crate::connection::Session;
use crate::context::CallContext;
use crate::error::DbError;
use core_types::{Item, NewItem};
use futures::TryStreamExt;
use sqlx::mysql::{MySql, MySqlConnection, MySqlStatement};
use sqlx::pool::PoolConnection;
use sqlx::{Executor, FromRow, Row, Statement};

const INSERT_ITEM: &str = "INSERT INTO item(item_name, item_price) VALUES (?, ?)";
const SELECT_PRICE_BY_NAME: &str = "SELECT item_price FROM item WHERE item_name = ? LIMIT 1";
const SELECT_ITEMS_BY_PRICE: &str = r#"
    SELECT item_id, item_name, item_price, created_at, updated_at
    FROM item
    WHERE item_price >= ? AND item_price <= ?
"#;

/// Reads and writes catalog items through a shared [`Session`].
///
/// Every method checks out its own pooled connection, prepares its statement
/// on it, and hands both back before returning, on success and on error.
/// Nothing is retried; a failed or expired call is reported as-is.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    session: Session,
}

impl ItemRepository {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Inserts one item and returns the identity the store assigned to it.
    pub async fn insert_one(&self, ctx: &CallContext, item: &NewItem) -> Result<u64, DbError> {
        let mut conn = self.checkout(ctx).await?;
        let stmt = prepare(ctx, &mut conn, INSERT_ITEM).await?;

        let result = ctx
            .run(
                stmt.query()
                    .bind(item.name.as_str())
                    .bind(item.price)
                    .execute(&mut *conn),
            )
            .await
            .map_err(|source| {
                tracing::warn!(item_name = %item.name, error = %source, "Insert failed.");
                DbError::Execution(source)
            })?;

        let id = result.last_insert_id();
        tracing::info!(id, item_name = %item.name, price = item.price, "Item created.");
        Ok(id)
    }

    /// Inserts all `items` with a single multi-row statement, in input order.
    ///
    /// The statement either stores every row or none of them. Returns the
    /// affected-row count, which equals `items.len()` on success. An empty
    /// slice is rejected before touching the database.
    pub async fn insert_batch(&self, ctx: &CallContext, items: &[NewItem]) -> Result<u64, DbError> {
        let mut batch = InsertBatch::new(items)?;
        let expected = batch.rows();

        let mut conn = self.checkout(ctx).await?;
        prepare(ctx, &mut conn, batch.sql()).await?;

        let result = ctx
            .run(batch.query().execute(&mut *conn))
            .await
            .map_err(|source| {
                tracing::warn!(rows = expected, error = %source, "Batch insert failed.");
                DbError::Execution(source)
            })?;

        let rows = result.rows_affected();
        tracing::info!(rows, "Items created in one batch.");
        Ok(rows)
    }

    /// Looks up the price of the item called `name`.
    ///
    /// Names are not unique. When several items share a name, the price of
    /// one of them is returned and which one is up to the server; callers
    /// that need a stable answer must keep names unique themselves.
    /// Returns [`DbError::NotFound`] when no item has that name.
    pub async fn find_price_by_name(&self, ctx: &CallContext, name: &str) -> Result<i32, DbError> {
        let mut conn = self.checkout(ctx).await?;
        let stmt = prepare(ctx, &mut conn, SELECT_PRICE_BY_NAME).await?;

        let row = ctx
            .run(stmt.query().bind(name).fetch_optional(&mut *conn))
            .await
            .map_err(|source| {
                tracing::warn!(item_name = name, error = %source, "Price lookup failed.");
                DbError::Scan(source)
            })?;

        let Some(row) = row else {
            tracing::debug!(item_name = name, "No item with that name.");
            return Err(DbError::NotFound);
        };
        row.try_get::<i32, _>("item_price")
            .map_err(|e| DbError::Scan(e.into()))
    }

    /// Returns every item with `min <= price <= max`, in no particular order.
    ///
    /// The whole result set is read before returning. If reading fails part
    /// way through, the rows collected so far are dropped and the error is
    /// returned. No matches (including `min > max`) is an empty vector.
    pub async fn find_items_in_price_range(
        &self,
        ctx: &CallContext,
        min: i32,
        max: i32,
    ) -> Result<Vec<Item>, DbError> {
        let mut conn = self.checkout(ctx).await?;
        let stmt = prepare(ctx, &mut conn, SELECT_ITEMS_BY_PRICE).await?;

        let items = ctx
            .run(async {
                let mut rows = stmt.query().bind(min).bind(max).fetch(&mut *conn);
                let mut items = Vec::new();
                while let Some(row) = rows.try_next().await? {
                    items.push(Item::from_row(&row)?);
                }
                Ok::<_, sqlx::Error>(items)
            })
            .await
            .map_err(|source| {
                tracing::warn!(min, max, error = %source, "Price range scan failed.");
                DbError::Scan(source)
            })?;

        tracing::debug!(min, max, count = items.len(), "Price range scanned.");
        Ok(items)
    }

    /// Waits, within the call's deadline, for a pooled connection.
    async fn checkout(&self, ctx: &CallContext) -> Result<PoolConnection<MySql>, DbError> {
        ctx.run(self.session.pool().acquire()).await.map_err(|source| {
            tracing::warn!(error = %source, "No database connection available.");
            DbError::Statement(source)
        })
    }
}

// With the statement cache disabled, executing prepares the statement again
// and closes it afterwards, so this costs one extra round trip. It is kept so
// that malformed SQL or a missing table is reported as `Statement` before
// anything runs, separately from faults during execution.
async fn prepare<'q>(
    ctx: &CallContext,
    conn: &mut MySqlConnection,
    sql: &'q str,
) -> Result<MySqlStatement<'q>, DbError> {
    ctx.run(conn.prepare(sql)).await.map_err(|source| {
        tracing::warn!(error = %source, "Could not prepare statement.");
        DbError::Statement(source)
    })
}
