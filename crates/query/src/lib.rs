//! Fluent query builder for SQL databases.
//!
//! Chained calls are compiled into SQL text and executed through an
//! [`omnia_sql::Connection`]. Every execution resolves to a [`QueryResult`]
//! envelope of `{ data, error, count }` rather than a `Result`.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use omnia_query::{Client, OrderOptions};
//! use omnia_sql::SqliteConnection;
//!
//! let client = Client::new(Arc::new(SqliteConnection::connect()?));
//!
//! let result = client
//!     .from("products")
//!     .select("id,title,category(name)")
//!     .eq("active", true)
//!     .order("created_at", OrderOptions::desc())
//!     .limit(5)
//!     .await;
//! // result.data: [{"id": 1, "title": "...", "category": {"name": "..."}}, ...]
//! ```
//!
//! ## Selections
//!
//! A selection lists columns and embedded relations, which may nest:
//!
//! ```ignore
//! client.from("orders").select("id,customer(name,address(city))");
//! ```
//!
//! Suffixing a relation with `!inner` excludes main rows with no related row.
//! Relations are resolved by naming convention: `products` embedding
//! `category` reads `products.category_id`. Tables holding the foreign key
//! back to the embedding table are registered with
//! [`Relationships::reverse`]:
//!
//! ```ignore
//! let client = Client::new(conn).with_relationships(Relationships::new().reverse("products"));
//! // categories embedding products reads products.category_id
//! client.from("categories").select("id,products(id)");
//! ```
//!
//! ## Filtering
//!
//! ```ignore
//! client
//!     .from("products")
//!     .select("*,category(name)")
//!     .gte("price", 10)
//!     .r#in("status", ["new", "sale"])
//!     .eq("category.name", "Tools") // filters products by related row
//!     .or("featured.is.true,stock.gt.100");
//! ```
//!
//! ## Mutations
//!
//! ```ignore
//! client.from("products").insert(json!([{"title": "A"}, {"title": "B", "price": 3}]));
//! client.from("products").update(json!({"active": false})).eq("id", 7);
//! client
//!     .from("products")
//!     .upsert_with(json!({"slug": "a", "title": "A"}), UpsertOptions { on_conflict: Some("slug".into()) });
//! client.from("products").delete().lt("stock", 1);
//! ```
//!
//! Statements render literal values inline by default. Use
//! [`Client::with_render`] with [`Render::Bound`] to emit `$n` placeholders
//! and positional parameters instead. Dialect differences (`::jsonb` casts,
//! `ILIKE`) follow the connection's [`Dialect`], which
//! [`Client::with_dialect`] overrides.

#![forbid(unsafe_code)]

mod builder;
mod client;
mod delete;
mod error;
mod filter;
mod insert;
mod join;
mod query;
mod relation;
mod result;
mod select;
mod selection;
mod update;
mod value;

pub use builder::{
    Count, OrderClause, OrderOptions, QueryBuilder, SelectOptions, Table, UpsertOptions,
};
pub use client::Client;
pub use error::{Error, NO_ROWS};
pub use filter::{Filter, Operator};
pub use omnia_sql::{Connection, Dialect, Record};
pub use query::{Query, Render};
pub use relation::{Direction, Relationship, Relationships, singularize};
pub use result::{Cardinality, QueryResult};
pub use selection::{RelationSpec, Selection};
pub use value::{escape_identifier, format_value, format_value_for};
