//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::anyhow;
use futures::FutureExt;
use omnia_query::{Client, Record, Relationships};
use omnia_sql::{Connection, FutureResult, SqliteConnection};
use parking_lot::Mutex;
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Connection that records every statement and replies from a script.
///
/// Each call pops the next scripted reply; once the script is exhausted,
/// statements return no rows.
#[derive(Debug, Default)]
pub struct MockConnection {
    replies: Mutex<VecDeque<Result<Vec<Record>, String>>>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues rows for the next statement.
    pub fn reply(&self, rows: Value) {
        let rows = match rows {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => record,
                    other => panic!("scripted row must be an object, got {other}"),
                })
                .collect(),
            other => panic!("scripted reply must be an array, got {other}"),
        };
        self.replies.lock().push_back(Ok(rows));
    }

    /// Queues a database error for the next statement.
    pub fn fail(&self, message: &str) {
        self.replies.lock().push_back(Err(message.to_string()));
    }

    /// Statements executed so far.
    pub fn statements(&self) -> Vec<String> {
        self.executed.lock().iter().map(|(sql, _)| sql.clone()).collect()
    }

    /// Parameters of every executed statement.
    pub fn params(&self) -> Vec<Vec<Value>> {
        self.executed.lock().iter().map(|(_, params)| params.clone()).collect()
    }
}

impl Connection for MockConnection {
    fn query(&self, query: String, params: Vec<Value>) -> FutureResult<Vec<Record>> {
        self.executed.lock().push((query, params));
        let reply = self.replies.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()));
        async move { reply.map_err(|message| anyhow!(message)) }.boxed()
    }
}

/// Routes generated-SQL debug logs to the test output. Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = Registry::default()
        .with(EnvFilter::new("omnia_query=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Client over a fresh [`MockConnection`].
pub fn mock_client() -> (Client, Arc<MockConnection>) {
    init_tracing();
    let conn = MockConnection::new();
    (Client::new(Arc::clone(&conn) as Arc<dyn Connection>), conn)
}

/// In-memory `SQLite` store with a small catalogue:
///
/// - `category`: 2 rows, `Tools` (id 1) and `Garden` (id 2)
/// - `products`: 10 rows; odd ids are inactive, ids 1-6 are `Tools`, 7-10
///   are `Garden`, and `created_at` increases with id
/// - `categories` and `tags`: a has-many pair where `tags.category_id`
///   points back at `categories.id`
pub fn catalogue() -> (Client, SqliteConnection) {
    init_tracing();
    let conn = SqliteConnection::in_memory().expect("open database");
    conn.execute_batch(
        "CREATE TABLE category (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE products (
             id INTEGER PRIMARY KEY,
             title TEXT NOT NULL,
             slug TEXT UNIQUE,
             price REAL,
             active BOOLEAN NOT NULL DEFAULT TRUE,
             created_at TEXT NOT NULL,
             category_id INTEGER REFERENCES category (id)
         );
         CREATE TABLE categories (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT NOT NULL, category_id INTEGER);
         INSERT INTO category (id, name) VALUES (1, 'Tools'), (2, 'Garden');
         INSERT INTO categories (id, name) VALUES (1, 'Hardware'), (2, 'Empty'), (3, 'Solo');
         INSERT INTO tags (id, label, category_id)
             VALUES (1, 'nails', 1), (2, 'screws', 1), (3, 'bolts', 1), (4, 'rake', 3);",
    )
    .expect("create schema");

    for id in 1..=10 {
        let category = if id <= 6 { 1 } else { 2 };
        let active = if id % 2 == 0 { "TRUE" } else { "FALSE" };
        conn.execute_batch(&format!(
            "INSERT INTO products (id, title, slug, price, active, created_at, category_id)
             VALUES ({id}, 'Product {id}', 'product-{id}', {price}, {active}, '2024-01-{id:02}', {category});",
            price = id * 5,
        ))
        .expect("insert product");
    }

    let relationships = Relationships::new().reverse("tags");
    let client =
        Client::new(Arc::new(conn.clone()) as Arc<dyn Connection>).with_relationships(relationships);
    (client, conn)
}

/// Ids of the records in `data`, in order.
pub fn ids(data: &Value) -> Vec<i64> {
    data.as_array()
        .expect("array data")
        .iter()
        .map(|row| row["id"].as_i64().expect("integer id"))
        .collect()
}

/// Collapses runs of whitespace to single spaces.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops double-quoted identifier delimiters outside string literals, so
/// expectations can be written as `products.id` rather than
/// `"products"."id"`.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' if !in_single_quote => {}
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Asserts that `actual` contains each fragment, in order. Used where a test
/// pins the clauses that matter (a subquery, a conflict clause) rather than
/// the whole statement.
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) else {
            panic!("expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`");
        };
        search_start += pos + fragment_canonical.len();
    }
}
