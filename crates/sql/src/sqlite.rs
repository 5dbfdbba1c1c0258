//! Default `SQLite` implementation of [`Connection`].
//!
//! This is a lightweight implementation for development and tests only.

#![allow(clippy::significant_drop_tightening)]

use std::sync::Arc;

use anyhow::{Context, Result};
use base64ct::{Base64, Encoding};
use fromenv::FromEnv;
use futures::FutureExt;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{Connection as RawConnection, params_from_iter};
use serde_json::{Number, Value};

use crate::connection::{Connection, Dialect, FutureResult, Record};

/// Options used to connect to the SQL database.
///
/// This struct is used to load connection options from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database path or `SQLite` URI.
    #[env(from = "SQL_DATABASE", default = "file::memory:?cache=shared")]
    pub database: String,
}

/// `SQLite`-backed [`Connection`].
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    // Mutex is necessary since rusqlite::Connection isn't `Sync`
    conn: Arc<parking_lot::Mutex<RawConnection>>,
}

impl SqliteConnection {
    /// Connect using options loaded from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be loaded or the database cannot be opened.
    pub fn connect() -> Result<Self> {
        let options =
            ConnectOptions::from_env().finalize().context("issue loading connection options")?;
        Self::connect_with(options)
    }

    /// Connect using explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn connect_with(options: ConnectOptions) -> Result<Self> {
        tracing::debug!("initializing SQLite connection to: {}", options.database);

        let conn =
            RawConnection::open(&options.database).context("failed to open SQLite database")?;
        Ok(Self {
            conn: Arc::new(parking_lot::Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn in_memory() -> Result<Self> {
        Self::connect_with(ConnectOptions {
            database: ":memory:".to_string(),
        })
    }

    /// Run one or more `;`-separated statements, discarding any rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql).context("failed to execute batch")
    }
}

impl Connection for SqliteConnection {
    fn query(&self, query: String, params: Vec<Value>) -> FutureResult<Vec<Record>> {
        tracing::debug!("executing query: {}", query);
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&query).context("failed to prepare statement")?;

            let sqlite_params: Vec<SqliteValue> = params.iter().map(json_to_sqlite).collect();
            let column_names: Vec<String> =
                stmt.column_names().iter().map(ToString::to_string).collect();

            let mut rows = stmt
                .query(params_from_iter(sqlite_params.iter()))
                .context("failed to execute query")?;

            let mut records = Vec::new();
            while let Some(row) = rows.next().context("failed to fetch row")? {
                let mut record = Record::new();
                for (i, name) in column_names.iter().enumerate() {
                    let value = row.get_ref(i).context("failed to get column value")?;
                    record.insert(name.clone(), sqlite_to_json(value)?);
                }
                records.push(record);
            }

            Ok(records)
        }
        .boxed()
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

fn json_to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| SqliteValue::Real(n.as_f64().unwrap_or_default()), SqliteValue::Integer),
        Value::String(s) => SqliteValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqliteValue::Text(value.to_string()),
    }
}

fn sqlite_to_json(value: ValueRef) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Number(i.into())),
        ValueRef::Real(f) => Ok(Number::from_f64(f).map_or(Value::Null, Value::Number)),
        ValueRef::Text(t) => {
            let s = std::str::from_utf8(t).context("invalid UTF-8 in text value")?;
            Ok(Value::String(s.to_string()))
        }
        ValueRef::Blob(b) => Ok(Value::String(Base64::encode_string(b))),
    }
}
