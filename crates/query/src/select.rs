use anyhow::{Context, Result};
use sea_query::{Alias, ColumnRef, Expr, Func, IntoIden, NullOrdering, Order, SimpleExpr};
use serde_json::Value;

use crate::builder::{Count, QueryBuilder};
use crate::filter;
use crate::join::{self, Projection};
use crate::query::Query;
use crate::result::QueryResult;
use crate::selection::Selection;

/// Column reference for `name`: `*`, `table.*`, `table.column` or a bare
/// column.
pub fn column_ref(name: &str) -> ColumnRef {
    if name == "*" {
        return ColumnRef::Asterisk;
    }
    match name.split_once('.') {
        Some((table, "*")) => ColumnRef::TableAsterisk(Alias::new(table).into_iden()),
        Some((table, column)) => table_column(table, column),
        None => ColumnRef::Column(Alias::new(name).into_iden()),
    }
}

pub fn table_column(table: &str, column: &str) -> ColumnRef {
    ColumnRef::TableColumn(Alias::new(table).into_iden(), Alias::new(column).into_iden())
}

impl QueryBuilder {
    pub(crate) fn parsed_selection(&self) -> Selection {
        Selection::parse(self.selection.as_deref().unwrap_or("*"))
    }

    pub(crate) fn build_select(&self) -> Result<Query> {
        let selection = self.parsed_selection();
        let conditions = self.conditions(&selection)?;
        let projection = self.projection(&selection);
        Ok(self.select_statement(&projection, &conditions))
    }

    pub(crate) fn conditions(&self, selection: &Selection) -> Result<Vec<SimpleExpr>> {
        filter::compile(
            &self.filters,
            &selection.relations,
            &self.table,
            self.client.relationships(),
            self.client.dialect(),
        )
    }

    fn projection(&self, selection: &Selection) -> Projection {
        Projection::plan(selection, &self.table, self.client.relationships(), &[])
    }

    fn select_statement(&self, projection: &Projection, conditions: &[SimpleExpr]) -> Query {
        let mut statement = sea_query::Query::select();
        projection.apply(&mut statement);
        statement.from(Alias::new(&self.table));

        for condition in conditions {
            statement.and_where(condition.clone());
        }

        for clause in &self.order {
            let order = if clause.ascending { Order::Asc } else { Order::Desc };
            match clause.nulls_first {
                Some(first) => {
                    let nulls = if first { NullOrdering::First } else { NullOrdering::Last };
                    statement.order_by_with_nulls(column_ref(&clause.column), order, nulls);
                }
                None => {
                    statement.order_by(column_ref(&clause.column), order);
                }
            }
        }

        if let Some(limit) = self.effective_limit() {
            statement.limit(limit);
        }
        if let Some(offset) = self.offset {
            statement.offset(offset);
        }

        let query = self.client.backend().build(&statement);
        tracing::debug!(
            table = %self.table,
            sql = %query.sql,
            param_count = query.params.len(),
            "select generated SQL"
        );
        query
    }

    fn count_statement(&self, conditions: &[SimpleExpr]) -> Query {
        let mut statement = sea_query::Query::select();
        statement.expr(Func::count(Expr::col(ColumnRef::Asterisk))).from(Alias::new(&self.table));
        for condition in conditions {
            statement.and_where(condition.clone());
        }

        let query = self.client.backend().build(&statement);
        tracing::debug!(
            table = %self.table,
            sql = %query.sql,
            param_count = query.params.len(),
            "count generated SQL"
        );
        query
    }

    pub(crate) async fn execute_select(self) -> Result<QueryResult> {
        let selection = self.parsed_selection();
        let conditions = self.conditions(&selection)?;

        let count = if self.count == Some(Count::Exact) {
            let rows = self.client.run(self.count_statement(&conditions)).await?;
            Some(read_count(&rows)?)
        } else {
            None
        };

        if self.head {
            return Ok(QueryResult {
                count,
                ..QueryResult::ok(Value::Null)
            });
        }

        let projection = self.projection(&selection);
        let mut rows = self.client.run(self.select_statement(&projection, &conditions)).await?;

        join::attach(&self.client, &self.table, &mut rows, &selection.relations).await?;
        for row in &mut rows {
            projection.strip(row);
        }

        let mut result = QueryResult::from_rows(rows, self.cardinality);
        if result.is_ok() {
            result.count = count;
        }
        Ok(result)
    }
}

fn read_count(rows: &[omnia_sql::Record]) -> Result<u64> {
    let value = rows
        .first()
        .and_then(|row| row.values().next())
        .context("count query returned no rows")?;

    match value {
        Value::Number(n) => n.as_u64().context("count is not a non-negative integer"),
        Value::String(s) => s.parse().context("count is not an integer"),
        other => anyhow::bail!("unexpected count value: {other}"),
    }
}
