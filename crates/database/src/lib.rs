//! # Catalog Database Crate
//!
//! The data-access layer for the item catalog, backed by MySQL through
//! `sqlx`.
//!
//! ## Public API
//!
//! - `acquire_session`: creates the target database if needed and returns a
//!   pooled, ping-verified `Session`.
//! - `ensure_schema`: idempotently creates the `item` table.
//! - `ItemRepository`: single and batched inserts, lookup by name, and
//!   inclusive price-range scans.
//! - `CallContext`: the deadline and cancellation token every call runs under.
//! - `DbError`: one variant per failure category, so callers can tell a
//!   missing item from a broken connection.

pub mod batch;
pub mod connection;
pub mod context;
pub mod error;
pub mod repository;
pub mod schema;

pub use batch::InsertBatch;
pub use connection::{acquire_session, Session};
pub use context::CallContext;
pub use error::{DbError, Fault};
pub use repository::ItemRepository;
pub use schema::ensure_schema;
