//! Errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message reported when `single()` finds no rows.
pub const NO_ROWS: &str = "No rows found";

/// Error carried in [`QueryResult::error`](crate::QueryResult::error).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Error {
    /// `single()` matched no rows.
    #[error("{message}")]
    NotFound {
        /// Human-readable description.
        message: String,
    },

    /// The statement could not be built or the database rejected it.
    #[error("{message}")]
    Execution {
        /// Human-readable description.
        message: String,
    },

    /// Result data could not be deserialized into the requested type.
    #[error("{message}")]
    Decode {
        /// Human-readable description.
        message: String,
    },
}

impl Error {
    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message } | Self::Execution { message } | Self::Decode { message } => {
                message
            }
        }
    }

    pub(crate) fn not_found() -> Self {
        Self::NotFound {
            message: NO_ROWS.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let message = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(": ");
        Self::Execution { message }
    }
}
