use anyhow::{Result, bail};
use omnia_sql::Record;
use sea_query::Alias;
use serde_json::Value;

use crate::builder::{QueryBuilder, record};
use crate::query::Query;
use crate::result::QueryResult;
use crate::value::to_sql_value;

impl QueryBuilder {
    pub(crate) fn build_update(&self, payload: &Record) -> Result<Query> {
        if payload.is_empty() {
            bail!("update payload has no columns");
        }
        let selection = self.parsed_selection();
        let conditions = self.conditions(&selection)?;

        let mut statement = sea_query::Query::update();
        statement.table(Alias::new(&self.table));
        for (column, value) in payload {
            statement.value(Alias::new(column), to_sql_value(value));
        }
        for condition in conditions {
            statement.and_where(condition);
        }
        statement.returning_all();

        let query = self.client.backend().build(&statement);
        tracing::debug!(
            table = %self.table,
            sql = %query.sql,
            param_count = query.params.len(),
            "update generated SQL"
        );
        Ok(query)
    }

    pub(crate) async fn execute_update(self, payload: Value) -> Result<QueryResult> {
        let query = self.build_update(record(&payload)?)?;
        let rows = self.client.run(query).await?;
        self.returning(rows).await
    }
}
