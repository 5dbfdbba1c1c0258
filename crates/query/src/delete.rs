use anyhow::Result;
use sea_query::Alias;
use serde_json::Value;

use crate::builder::QueryBuilder;
use crate::query::Query;
use crate::result::QueryResult;

impl QueryBuilder {
    pub(crate) fn build_delete(&self) -> Result<Query> {
        let selection = self.parsed_selection();
        let conditions = self.conditions(&selection)?;

        let mut statement = sea_query::Query::delete();
        statement.from_table(Alias::new(&self.table));
        for condition in conditions {
            statement.and_where(condition);
        }

        let query = self.client.backend().build(&statement);
        tracing::debug!(
            table = %self.table,
            sql = %query.sql,
            param_count = query.params.len(),
            "delete generated SQL"
        );
        Ok(query)
    }

    pub(crate) async fn execute_delete(self) -> Result<QueryResult> {
        let query = self.build_delete()?;
        self.client.run(query).await?;
        Ok(QueryResult::ok(Value::Null))
    }
}
