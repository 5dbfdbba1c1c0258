use omnia_sql::Record;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// How many rows a query is expected to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cardinality {
    /// Any number of rows, returned as an array.
    #[default]
    Many,

    /// Exactly one row; zero rows is a [`Error::NotFound`].
    Single,

    /// At most one row; zero rows is `null`.
    MaybeSingle,
}

/// Result envelope returned by every execution.
///
/// `data` is `null`, a single record or an array of records depending on
/// the operation and [`Cardinality`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Returned rows.
    pub data: Value,

    /// Failure, if any. `data` is `null` whenever this is set.
    pub error: Option<Error>,

    /// Exact row count, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl QueryResult {
    pub(crate) fn from_rows(rows: Vec<Record>, cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::Many => Self::ok(Value::Array(rows.into_iter().map(Value::Object).collect())),
            Cardinality::Single => rows
                .into_iter()
                .next()
                .map_or_else(|| Self::failed(Error::not_found()), |row| Self::ok(Value::Object(row))),
            Cardinality::MaybeSingle => {
                Self::ok(rows.into_iter().next().map_or(Value::Null, Value::Object))
            }
        }
    }

    pub(crate) fn ok(data: Value) -> Self {
        Self {
            data,
            error: None,
            count: None,
        }
    }

    pub(crate) fn failed(error: Error) -> Self {
        Self {
            data: Value::Null,
            error: Some(error),
            count: None,
        }
    }

    /// True when no error was reported.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Converts the envelope into a `Result` over `data`.
    ///
    /// # Errors
    ///
    /// Returns the carried error, if any.
    pub fn into_result(self) -> Result<Value, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }

    /// Deserializes `data` into `T`.
    ///
    /// # Errors
    ///
    /// Returns the carried error, or [`Error::Decode`] if `data` does not fit `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, Error> {
        let data = self.into_result()?;
        serde_json::from_value(data).map_err(|e| Error::Decode {
            message: e.to_string(),
        })
    }
}
