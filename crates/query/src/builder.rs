use std::future::IntoFuture;

use anyhow::{Result, bail};
use futures::FutureExt;
use futures::future::BoxFuture;
use omnia_sql::Record;
use serde_json::Value;

use crate::client::Client;
use crate::filter::{Filter, Operator};
use crate::query::Query;
use crate::result::{Cardinality, QueryResult};

/// Row count requested alongside a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// `SELECT COUNT(*)` with the same filters.
    Exact,
}

/// Options for [`Table::select_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectOptions {
    /// Compute a row count.
    pub count: Option<Count>,

    /// Skip fetching rows; only the count is returned.
    pub head: bool,
}

/// Options for [`Table::upsert_with`].
#[derive(Debug, Clone, Default)]
pub struct UpsertOptions {
    /// Conflict target column. Defaults to `id`.
    pub on_conflict: Option<String>,
}

/// Options for [`QueryBuilder::order`].
#[derive(Debug, Clone, Copy)]
pub struct OrderOptions {
    /// Sort ascending (the default) or descending.
    pub ascending: bool,

    /// Place nulls first or last. `None` leaves the database default.
    pub nulls_first: Option<bool>,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            ascending: true,
            nulls_first: None,
        }
    }
}

impl OrderOptions {
    /// Descending order.
    #[must_use]
    pub const fn desc() -> Self {
        Self {
            ascending: false,
            nulls_first: None,
        }
    }

    /// Sets null placement.
    #[must_use]
    pub const fn nulls_first(mut self, nulls_first: bool) -> Self {
        self.nulls_first = Some(nulls_first);
        self
    }
}

/// A single ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    /// Column to sort by.
    pub column: String,

    /// Ascending when `true`.
    pub ascending: bool,

    /// Explicit null placement.
    pub nulls_first: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub(crate) enum Operation {
    #[default]
    Select,
    Insert(Value),
    Update(Value),
    Upsert { payload: Value, on_conflict: String },
    Delete,
}

/// A table chosen with [`Client::from`], awaiting an operation.
#[derive(Debug, Clone)]
pub struct Table {
    client: Client,
    name: String,
}

impl Table {
    pub(crate) const fn new(client: Client, name: String) -> Self {
        Self { client, name }
    }

    fn operation(self, operation: Operation, selection: Option<String>) -> QueryBuilder {
        QueryBuilder {
            client: self.client,
            table: self.name,
            operation,
            selection,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            cardinality: Cardinality::Many,
            count: None,
            head: false,
        }
    }

    /// Selects columns and embedded relations, e.g. `id,name,category(name)`.
    #[must_use]
    pub fn select(self, columns: impl Into<String>) -> QueryBuilder {
        self.operation(Operation::Select, Some(columns.into()))
    }

    /// Selects with a row count and/or without fetching rows.
    #[must_use]
    pub fn select_with(self, columns: impl Into<String>, options: SelectOptions) -> QueryBuilder {
        let mut query = self.select(columns);
        query.count = options.count;
        query.head = options.head;
        query
    }

    /// Inserts one record (an object) or several (an array of objects).
    ///
    /// Rows are only returned when [`QueryBuilder::select`] is chained.
    #[must_use]
    pub fn insert(self, data: impl Into<Value>) -> QueryBuilder {
        self.operation(Operation::Insert(data.into()), None)
    }

    /// Updates rows matching the chained filters with the columns of `data`.
    #[must_use]
    pub fn update(self, data: impl Into<Value>) -> QueryBuilder {
        self.operation(Operation::Update(data.into()), None)
    }

    /// Inserts or, on an `id` conflict, updates.
    #[must_use]
    pub fn upsert(self, data: impl Into<Value>) -> QueryBuilder {
        self.upsert_with(data, UpsertOptions::default())
    }

    /// Inserts or, on a conflict in the configured column, updates.
    #[must_use]
    pub fn upsert_with(self, data: impl Into<Value>, options: UpsertOptions) -> QueryBuilder {
        let on_conflict = options.on_conflict.unwrap_or_else(|| "id".to_string());
        self.operation(
            Operation::Upsert {
                payload: data.into(),
                on_conflict,
            },
            None,
        )
    }

    /// Deletes rows matching the chained filters.
    #[must_use]
    pub fn delete(self) -> QueryBuilder {
        self.operation(Operation::Delete, None)
    }
}

/// A query with its operation chosen, accepting filters and modifiers until
/// it is executed.
///
/// Executing consumes the builder. It can also be awaited directly.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) client: Client,
    pub(crate) table: String,
    pub(crate) operation: Operation,
    pub(crate) selection: Option<String>,
    pub(crate) filters: Vec<Filter>,
    pub(crate) order: Vec<OrderClause>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) cardinality: Cardinality,
    pub(crate) count: Option<Count>,
    pub(crate) head: bool,
}

impl QueryBuilder {
    /// Sets the selection. For mutations this also requests the affected rows.
    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.selection = Some(columns.into());
        self
    }

    /// Adds a filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    fn predicate(self, column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, operator, value))
    }

    /// column = value
    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(column, Operator::Eq, value)
    }

    /// column != value
    #[must_use]
    pub fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(column, Operator::Neq, value)
    }

    /// column > value
    #[must_use]
    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(column, Operator::Gt, value)
    }

    /// column >= value
    #[must_use]
    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(column, Operator::Gte, value)
    }

    /// column < value
    #[must_use]
    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(column, Operator::Lt, value)
    }

    /// column <= value
    #[must_use]
    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(column, Operator::Lte, value)
    }

    /// column IS NULL / TRUE / FALSE
    #[must_use]
    pub fn is(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate(column, Operator::Is, value)
    }

    /// column IN (values)
    #[must_use]
    pub fn r#in(
        self, column: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.filter(Filter::r#in(column, values))
    }

    /// column ILIKE pattern
    #[must_use]
    pub fn ilike(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.predicate(column, Operator::Ilike, pattern.into())
    }

    /// column LIKE pattern
    #[must_use]
    pub fn like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.predicate(column, Operator::Like, pattern.into())
    }

    /// Adds an OR-group, e.g. `status.eq.draft,published_at.is.null`.
    #[must_use]
    pub fn or(self, expr: impl Into<String>) -> Self {
        self.filter(Filter::or(expr))
    }

    /// Adds an ORDER BY term. Terms apply in the order added.
    #[must_use]
    pub fn order(mut self, column: impl Into<String>, options: OrderOptions) -> Self {
        self.order.push(OrderClause {
            column: column.into(),
            ascending: options.ascending,
            nulls_first: options.nulls_first,
        });
        self
    }

    /// Caps the number of rows returned.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns rows `from..=to` (zero based, inclusive).
    ///
    /// An inverted range (`to < from`) selects nothing.
    #[must_use]
    pub const fn range(mut self, from: u64, to: u64) -> Self {
        self.offset = Some(from);
        self.limit = Some(match to.checked_sub(from) {
            Some(span) => span.saturating_add(1),
            None => 0,
        });
        self
    }

    /// Expects exactly one row, unwrapped from the array.
    #[must_use]
    pub const fn single(mut self) -> Self {
        self.cardinality = Cardinality::Single;
        self
    }

    /// Expects at most one row; `null` when none match.
    #[must_use]
    pub const fn maybe_single(mut self) -> Self {
        self.cardinality = Cardinality::MaybeSingle;
        self
    }

    /// Renders the primary statement without executing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the filters or payload are malformed.
    pub fn build(&self) -> Result<Query> {
        match &self.operation {
            Operation::Select => self.build_select(),
            Operation::Insert(payload) => self.build_insert(&records(payload)?, None),
            Operation::Upsert {
                payload,
                on_conflict,
            } => self.build_insert(&records(payload)?, Some(on_conflict.as_str())),
            Operation::Update(payload) => self.build_update(record(payload)?),
            Operation::Delete => self.build_delete(),
        }
    }

    /// Runs the query. Never fails: errors are reported in the result.
    pub async fn execute(mut self) -> QueryResult {
        let table = self.table.clone();

        let outcome = match std::mem::take(&mut self.operation) {
            Operation::Select => self.execute_select().await,
            Operation::Insert(payload) => self.execute_insert(payload, None).await,
            Operation::Upsert {
                payload,
                on_conflict,
            } => self.execute_insert(payload, Some(on_conflict)).await,
            Operation::Update(payload) => self.execute_update(payload).await,
            Operation::Delete => self.execute_delete().await,
        };

        outcome.unwrap_or_else(|err| {
            tracing::warn!(table = %table, error = %format!("{err:#}"), "query failed");
            QueryResult::failed(err.into())
        })
    }

    pub(crate) fn effective_limit(&self) -> Option<u64> {
        match self.cardinality {
            Cardinality::Many => self.limit,
            Cardinality::Single | Cardinality::MaybeSingle => Some(1),
        }
    }
}

impl IntoFuture for QueryBuilder {
    type IntoFuture = BoxFuture<'static, QueryResult>;
    type Output = QueryResult;

    fn into_future(self) -> Self::IntoFuture {
        self.execute().boxed()
    }
}

/// Normalizes an insert payload to a list of records.
pub(crate) fn records(payload: &Value) -> Result<Vec<Record>> {
    match payload {
        Value::Object(record) => Ok(vec![record.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record.clone()),
                _ => bail!("insert payload must be an object or an array of objects"),
            })
            .collect(),
        _ => bail!("insert payload must be an object or an array of objects"),
    }
}

pub(crate) fn record(payload: &Value) -> Result<&Record> {
    match payload {
        Value::Object(record) => Ok(record),
        _ => bail!("update payload must be an object"),
    }
}
