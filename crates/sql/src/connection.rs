use std::fmt::Debug;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

/// Result type for asynchronous operations.
pub type FutureResult<T> = BoxFuture<'static, anyhow::Result<T>>;

/// A single result row keyed by column name, in column order.
pub type Record = Map<String, Value>;

/// SQL flavour a backend speaks, used where statement text differs between
/// engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// Structured values are cast with `::jsonb` and `ilike` renders `ILIKE`.
    #[default]
    Postgres,

    /// Structured values are stored as JSON text and `ilike` renders `LIKE`,
    /// which `SQLite` already matches case-insensitively for ASCII.
    Sqlite,
}

/// SQL providers implement the [`Connection`] trait to allow queries to be
/// executed against a backend (Postgres, `SQLite`, etc).
///
/// Cancellation, timeouts and pooling are the provider's concern.
pub trait Connection: Debug + Send + Sync + 'static {
    /// Execute a statement and return the resulting rows.
    ///
    /// `params` is empty unless the statement contains `$n` placeholders.
    /// Statements that produce no rows return an empty `Vec`.
    fn query(&self, query: String, params: Vec<Value>) -> FutureResult<Vec<Record>>;

    /// The dialect statements for this connection are rendered in.
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}
