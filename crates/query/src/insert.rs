use anyhow::{Result, anyhow, bail};
use omnia_sql::Record;
use sea_query::{Alias, OnConflict, SimpleExpr};
use serde_json::Value;

use crate::builder::{QueryBuilder, records};
use crate::join;
use crate::query::Query;
use crate::result::QueryResult;
use crate::value::to_sql_value;

impl QueryBuilder {
    /// Renders `INSERT` for `rows`, with `ON CONFLICT` when `on_conflict` is set.
    ///
    /// The column list is the union of keys across all rows in first-seen
    /// order; a row missing a column gets `NULL`.
    pub(crate) fn build_insert(&self, rows: &[Record], on_conflict: Option<&str>) -> Result<Query> {
        let mut columns: Vec<&str> = Vec::new();
        for key in rows.iter().flat_map(Record::keys) {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
        if columns.is_empty() {
            bail!("insert payload has no columns");
        }

        let mut statement = sea_query::Query::insert();
        statement.into_table(Alias::new(&self.table)).columns(columns.iter().map(|c| Alias::new(*c)));

        for row in rows {
            let values = columns
                .iter()
                .map(|column| row.get(*column).map_or_else(|| to_sql_value(&Value::Null), to_sql_value))
                .map(SimpleExpr::from)
                .collect::<Vec<_>>();
            statement.values(values).map_err(|err| anyhow!("invalid insert row: {err:?}"))?;
        }

        if let Some(target) = on_conflict {
            let updates: Vec<&str> = columns.iter().copied().filter(|c| *c != target).collect();
            let mut clause = OnConflict::column(Alias::new(target));
            if updates.is_empty() {
                clause.do_nothing();
            } else {
                clause.update_columns(updates.into_iter().map(Alias::new));
            }
            statement.on_conflict(clause);
        }

        if on_conflict.is_some() || self.selection.is_some() {
            statement.returning_all();
        }

        let query = self.client.backend().build(&statement);
        tracing::debug!(
            table = %self.table,
            sql = %query.sql,
            param_count = query.params.len(),
            row_count = rows.len(),
            "insert generated SQL"
        );
        Ok(query)
    }

    pub(crate) async fn execute_insert(
        self, payload: Value, on_conflict: Option<String>,
    ) -> Result<QueryResult> {
        let rows = records(&payload)?;
        if rows.is_empty() {
            tracing::debug!(table = %self.table, "empty insert payload, nothing to do");
            return Ok(QueryResult::ok(Value::Array(Vec::new())));
        }

        let query = self.build_insert(&rows, on_conflict.as_deref())?;
        let returned = self.client.run(query).await?;

        if on_conflict.is_none() && self.selection.is_none() {
            return Ok(QueryResult::ok(Value::Null));
        }
        self.returning(returned).await
    }

    /// Attaches requested relations to rows returned by a mutation and shapes
    /// them.
    ///
    /// The relation fetch runs after the write without a transaction, so it
    /// may observe later changes.
    pub(crate) async fn returning(self, mut rows: Vec<Record>) -> Result<QueryResult> {
        let selection = self.parsed_selection();
        join::attach(&self.client, &self.table, &mut rows, &selection.relations).await?;
        Ok(QueryResult::from_rows(rows, self.cardinality))
    }
}
