//! # SQL Execution Handle
//!
//! The narrow interface `omnia-query` uses to run the statements it renders:
//! a [`Connection`] accepts a complete SQL string (plus positional parameters
//! when rendering with bound values) and returns the resulting rows as JSON
//! records.
//!
//! A lightweight `SQLite` implementation, [`SqliteConnection`], is provided for
//! development and tests.

#![forbid(unsafe_code)]

mod connection;
mod sqlite;

pub use connection::{Connection, Dialect, FutureResult, Record};
pub use sqlite::{ConnectOptions, SqliteConnection};
