use crate::error::DbError;
use core_types::NewItem;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;
use sqlx::QueryBuilder;

/// MySQL refuses prepared statements with more placeholders than this.
pub const MAX_PLACEHOLDERS: usize = u16::MAX as usize;

const COLUMNS_PER_ROW: usize = 2;

/// A multi-row `INSERT` for a fixed set of items.
///
/// The SQL text only ever contains the table, the column list and `?`
/// placeholders; row values travel separately as bound arguments, one
/// `(name, price)` pair per row in input order. Building one for zero rows,
/// or for more rows than the placeholder ceiling allows, fails up front
/// instead of producing a statement the server would reject.
pub struct InsertBatch<'a> {
    rows: usize,
    builder: QueryBuilder<'a, MySql>,
}

impl<'a> InsertBatch<'a> {
    pub fn new(items: &'a [NewItem]) -> Result<Self, DbError> {
        let rows = items.len();
        if rows == 0 {
            return Err(DbError::Validation(
                "a batch insert needs at least one row".to_string(),
            ));
        }
        let max_rows = Self::max_rows();
        if rows > max_rows {
            return Err(DbError::Validation(format!(
                "a batch insert holds at most {max_rows} rows, got {rows}"
            )));
        }

        let mut builder = QueryBuilder::new("INSERT INTO item(item_name, item_price) ");
        builder.push_values(items, |mut row, item| {
            row.push_bind(item.name.as_str()).push_bind(item.price);
        });

        Ok(Self { rows, builder })
    }

    pub fn max_rows() -> usize {
        MAX_PLACEHOLDERS / COLUMNS_PER_ROW
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn placeholders(&self) -> usize {
        self.rows * COLUMNS_PER_ROW
    }

    pub fn sql(&self) -> &str {
        self.builder.sql()
    }

    /// The statement with every row's values bound. Hands the arguments over,
    /// so a batch can be executed once.
    pub fn query(&mut self) -> Query<'_, MySql, MySqlArguments> {
        self.builder.build()
    }
}
