use std::sync::Arc;

use anyhow::Result;
use omnia_sql::{Connection, Dialect, Record};

use crate::builder::Table;
use crate::query::{Backend, Query, Render};
use crate::relation::Relationships;

/// Entry point for building queries against a [`Connection`].
///
/// Cloning is cheap: the connection and relationship registry are shared.
#[derive(Debug, Clone)]
pub struct Client {
    conn: Arc<dyn Connection>,
    relationships: Arc<Relationships>,
    render: Render,
    dialect: Dialect,
}

impl Client {
    /// Creates a client with the default relationship conventions, inline
    /// literal rendering and the connection's dialect.
    #[must_use]
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        let dialect = conn.dialect();
        Self {
            conn,
            relationships: Arc::new(Relationships::new()),
            render: Render::Inline,
            dialect,
        }
    }

    /// Uses `relationships` to resolve embedded relations and relation filters.
    #[must_use]
    pub fn with_relationships(mut self, relationships: Relationships) -> Self {
        self.relationships = Arc::new(relationships);
        self
    }

    /// Sets how literal values are written into statements.
    #[must_use]
    pub const fn with_render(mut self, render: Render) -> Self {
        self.render = render;
        self
    }

    /// Overrides the dialect reported by the connection.
    #[must_use]
    pub const fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Begins a query against `table`.
    #[must_use]
    pub fn from(&self, table: impl Into<String>) -> Table {
        Table::new(self.clone(), table.into())
    }

    pub(crate) fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub(crate) const fn backend(&self) -> Backend {
        Backend::new(self.render, self.dialect)
    }

    pub(crate) const fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub(crate) async fn run(&self, query: Query) -> Result<Vec<Record>> {
        self.conn.query(query.sql, query.params).await
    }
}
