//! Embedded relation fetching.
//!
//! After the main rows are loaded, each embedded relation is fetched with one
//! batched `IN (...)` query and merged into the rows under the relation's
//! name. Relations are fetched one after another, in declaration order.
//!
//! A to-one relation attaches the related record or `null`. A has-many
//! relation attaches `null` for no match, the bare record for exactly one
//! match and an array otherwise.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use omnia_sql::Record;
use sea_query::{Alias, ColumnRef, Expr, ExprTrait, SelectStatement};
use serde_json::Value;

use crate::client::Client;
use crate::relation::{Direction, Relationships};
use crate::select::column_ref;
use crate::selection::{RelationSpec, Selection};
use crate::value::to_sql_value;

/// Columns to fetch for a selection, including any key columns needed to
/// stitch relations that the caller did not ask for.
pub struct Projection {
    columns: Option<Vec<String>>,
    added: Vec<String>,
}

impl Projection {
    /// Plans the column list for `selection` on `table`. `required` names key
    /// columns the caller needs in addition to relation keys.
    pub fn plan(
        selection: &Selection, table: &str, relationships: &Relationships, required: &[&str],
    ) -> Self {
        if selection.is_wildcard() {
            return Self {
                columns: None,
                added: Vec::new(),
            };
        }

        let mut columns = selection.columns.clone();
        let mut added = Vec::new();

        let relation_keys = selection.relations.iter().map(|spec| {
            let relationship = relationships.resolve(table, &spec.table);
            match relationship.direction {
                Direction::OwnedByMain => relationship.foreign_key,
                Direction::OwnedByRelated => "id".to_string(),
            }
        });
        let keys = required.iter().map(ToString::to_string).chain(relation_keys);

        for key in keys {
            if !columns.contains(&key) {
                columns.push(key.clone());
                added.push(key);
            }
        }

        Self {
            columns: Some(columns),
            added,
        }
    }

    /// Adds the planned columns to `statement`.
    pub fn apply(&self, statement: &mut SelectStatement) {
        match &self.columns {
            None => {
                statement.column(ColumnRef::Asterisk);
            }
            Some(columns) => {
                statement.columns(columns.iter().map(|column| column_ref(column)));
            }
        }
    }

    /// Removes key columns that were fetched only for stitching.
    pub fn strip(&self, record: &mut Record) {
        for column in &self.added {
            record.remove(column);
        }
    }
}

/// Fetches `relations` for `rows` of `table` and merges them in place.
pub fn attach<'a>(
    client: &'a Client, table: &'a str, rows: &'a mut [Record], relations: &'a [RelationSpec],
) -> BoxFuture<'a, Result<()>> {
    async move {
        if rows.is_empty() {
            return Ok(());
        }
        for spec in relations {
            attach_relation(client, table, rows, spec).await?;
        }
        Ok(())
    }
    .boxed()
}

async fn attach_relation(
    client: &Client, table: &str, rows: &mut [Record], spec: &RelationSpec,
) -> Result<()> {
    let relationship = client.relationships().resolve(table, &spec.table);
    let (local_key, remote_key) = match relationship.direction {
        Direction::OwnedByMain => (relationship.foreign_key.as_str(), "id"),
        Direction::OwnedByRelated => ("id", relationship.foreign_key.as_str()),
    };

    let keys = distinct(rows, local_key);
    if keys.is_empty() {
        for row in rows.iter_mut() {
            row.insert(spec.table.clone(), Value::Null);
        }
        return Ok(());
    }

    let selection = Selection::parse(&spec.columns);
    let projection =
        Projection::plan(&selection, &spec.table, client.relationships(), &[remote_key]);

    let mut statement = sea_query::Query::select();
    projection.apply(&mut statement);
    statement
        .from(Alias::new(&spec.table))
        .and_where(Expr::col(column_ref(remote_key)).is_in(keys.iter().map(to_sql_value)));
    let query = client.backend().build(&statement);

    tracing::debug!(
        table,
        relation = %spec.table,
        sql = %query.sql,
        key_count = keys.len(),
        "fetching embedded relation"
    );

    let mut related = client.run(query).await?;
    attach(client, &spec.table, &mut related, &selection.relations).await?;

    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    for mut record in related {
        let Some(key) = record.get(remote_key).map(key_of) else {
            continue;
        };
        projection.strip(&mut record);
        groups.entry(key).or_default().push(record);
    }

    for row in rows.iter_mut() {
        let matched = row
            .get(local_key)
            .filter(|value| !value.is_null())
            .and_then(|value| groups.get(&key_of(value)))
            .map(Vec::as_slice);

        let value = match (relationship.direction, matched) {
            (_, None | Some([])) => Value::Null,
            (Direction::OwnedByMain, Some([first, ..])) | (Direction::OwnedByRelated, Some([first])) => {
                Value::Object(first.clone())
            }
            (Direction::OwnedByRelated, Some(many)) => {
                Value::Array(many.iter().cloned().map(Value::Object).collect())
            }
        };
        row.insert(spec.table.clone(), value);
    }

    Ok(())
}

/// Distinct non-null values of `column`, in first-seen order.
fn distinct(rows: &[Record], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null() && seen.insert(key_of(value)))
        .cloned()
        .collect()
}

// Text and numeric keys compare equal so `1` matches `"1"`.
fn key_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
