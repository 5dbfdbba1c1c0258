//! Predicate model and WHERE-clause compiler.
//!
//! Filters on the main table compile to plain comparisons. A filter on
//! `relation.column` compiles to an `IN (SELECT ...)` subquery against the
//! related table, and every `!inner` relation adds an `EXISTS` constraint so
//! main rows without a related row are excluded.

use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use omnia_sql::Dialect;
use sea_query::{Alias, BinOper, Expr, ExprTrait, SimpleExpr};
use serde_json::{Number, Value};

use crate::relation::{Direction, Relationship, Relationships};
use crate::select::{column_ref, table_column};
use crate::selection::RelationSpec;
use crate::value::to_sql_value;

/// Predicate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    Neq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `IS NULL`, `IS TRUE` or `IS FALSE`
    Is,
    /// `IN (...)`
    In,
    /// `ILIKE`
    Ilike,
    /// `LIKE`
    Like,
    /// OR-group written in the `column.operator.value,...` grammar
    Or,
}

impl FromStr for Operator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "is" => Self::Is,
            "in" => Self::In,
            "ilike" => Self::Ilike,
            "like" => Self::Like,
            "or" => Self::Or,
            _ => bail!("unknown operator `{s}`"),
        })
    }
}

/// A single predicate.
///
/// A `column` containing a dot (`table.column`) targets an embedded relation
/// rather than the main table. For [`Operator::Or`], `column` is unused and
/// `value` holds the raw OR expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Target column, optionally qualified by a relation name.
    pub column: String,

    /// Comparison operator.
    pub operator: Operator,

    /// Right-hand operand.
    pub value: Value,
}

impl Filter {
    /// Creates a filter.
    #[must_use]
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Creates an equality filter (column = value).
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    /// Creates an inequality filter (column != value).
    #[must_use]
    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Neq, value)
    }

    /// Creates an IN filter (column IN (values)).
    #[must_use]
    pub fn r#in(
        column: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        Self::new(column, Operator::In, Value::Array(values))
    }

    /// Creates an OR-group from a `column.operator.value,...` expression.
    #[must_use]
    pub fn or(expr: impl Into<String>) -> Self {
        Self::new(String::new(), Operator::Or, Value::String(expr.into()))
    }

    fn target(&self) -> Target<'_> {
        if self.operator == Operator::Or {
            return Target::OrGroup(self.value.as_str().unwrap_or_default());
        }
        self.column
            .split_once('.')
            .map_or(Target::Main(&self.column), |(table, column)| Target::Relation(table, column))
    }
}

enum Target<'a> {
    Main(&'a str),
    Relation(&'a str, &'a str),
    OrGroup(&'a str),
}

fn compare(column: &str, operator: Operator, value: &Value, dialect: Dialect) -> Result<SimpleExpr> {
    let left = SimpleExpr::Column(column_ref(column));
    Ok(match operator {
        Operator::Eq => left.eq(to_sql_value(value)),
        Operator::Neq => left.ne(to_sql_value(value)),
        Operator::Gt => left.gt(to_sql_value(value)),
        Operator::Gte => left.gte(to_sql_value(value)),
        Operator::Lt => left.lt(to_sql_value(value)),
        Operator::Lte => left.lte(to_sql_value(value)),
        Operator::In => {
            let values = match value {
                Value::Array(values) => values.as_slice(),
                other => std::slice::from_ref(other),
            };
            // `IN ()` is invalid SQL; an empty list matches nothing
            if values.is_empty() {
                return Ok(SimpleExpr::Custom("FALSE".to_string()));
            }
            left.is_in(values.iter().map(to_sql_value))
        }
        Operator::Is => match is_keyword(value) {
            Some(keyword) => binary(left, BinOper::Is, SimpleExpr::Custom(keyword.to_string())),
            None => binary(left, BinOper::Is, to_sql_value(value).into()),
        },
        Operator::Like => binary(left, BinOper::Like, to_sql_value(value).into()),
        Operator::Ilike => {
            let op = match dialect {
                Dialect::Postgres => BinOper::Custom("ILIKE"),
                Dialect::Sqlite => BinOper::Like,
            };
            binary(left, op, to_sql_value(value).into())
        }
        Operator::Or => bail!("`or` cannot compare column `{column}`"),
    })
}

fn binary(left: SimpleExpr, op: BinOper, right: SimpleExpr) -> SimpleExpr {
    SimpleExpr::Binary(Box::new(left), op, Box::new(right))
}

fn is_keyword(value: &Value) -> Option<&'static str> {
    match value {
        Value::Null => Some("NULL"),
        Value::Bool(true) => Some("TRUE"),
        Value::Bool(false) => Some("FALSE"),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "null" => Some("NULL"),
            "true" => Some("TRUE"),
            "false" => Some("FALSE"),
            _ => None,
        },
        Value::Number(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Compiles filters against `table` into top-level conditions, to be joined
/// with `AND`.
///
/// Order: main-table predicates, OR-groups, one subquery per filtered
/// relation (in order of first appearance), then `!inner` constraints.
///
/// # Errors
///
/// Returns an error if an OR-group expression is malformed.
pub fn compile(
    filters: &[Filter], relations: &[RelationSpec], table: &str, relationships: &Relationships,
    dialect: Dialect,
) -> Result<Vec<SimpleExpr>> {
    let mut conditions = Vec::new();
    let mut groups = Vec::new();
    let mut related: Vec<(&str, Vec<SimpleExpr>)> = Vec::new();

    for filter in filters {
        match filter.target() {
            Target::Main(column) => {
                conditions.push(compare(column, filter.operator, &filter.value, dialect)?);
            }
            Target::OrGroup(expr) => {
                let exprs = parse_or(expr)?
                    .iter()
                    .map(|f| compare(&f.column, f.operator, &f.value, dialect))
                    .collect::<Result<Vec<_>>>()?;
                let mut exprs = exprs.into_iter();
                if let Some(first) = exprs.next() {
                    groups.push(exprs.fold(first, SimpleExpr::or));
                }
            }
            Target::Relation(relation, column) => {
                let condition = compare(column, filter.operator, &filter.value, dialect)?;
                if let Some((_, predicates)) = related.iter_mut().find(|(r, _)| *r == relation) {
                    predicates.push(condition);
                } else {
                    related.push((relation, vec![condition]));
                }
            }
        }
    }
    conditions.extend(groups);

    for (relation, predicates) in related {
        let Relationship {
            foreign_key,
            direction,
        } = relationships.resolve(table, relation);

        let (column, select) = match direction {
            Direction::OwnedByMain => (foreign_key, "id".to_string()),
            Direction::OwnedByRelated => ("id".to_string(), foreign_key),
        };

        let mut subquery = sea_query::Query::select();
        subquery.column(column_ref(&select)).from(Alias::new(relation));
        for predicate in predicates {
            subquery.and_where(predicate);
        }
        conditions.push(Expr::col(column_ref(&column)).in_subquery(subquery));
    }

    for spec in relations.iter().filter(|spec| spec.inner) {
        let Relationship {
            foreign_key,
            direction,
        } = relationships.resolve(table, &spec.table);

        let (related_column, main_column) = match direction {
            Direction::OwnedByMain => {
                conditions.push(Expr::col(column_ref(&foreign_key)).is_not_null());
                ("id".to_string(), foreign_key)
            }
            Direction::OwnedByRelated => (foreign_key, "id".to_string()),
        };

        let mut subquery = sea_query::Query::select();
        subquery
            .expr(SimpleExpr::Custom("1".to_string()))
            .from(Alias::new(&spec.table))
            .and_where(
                Expr::col(table_column(&spec.table, &related_column))
                    .eq(Expr::col(table_column(table, &main_column))),
            );
        conditions.push(Expr::exists(subquery));
    }

    Ok(conditions)
}

/// Parses `column.operator.value` triplets separated by commas.
///
/// Values may contain dots. For comparisons, `null`, `true`, `false` and
/// canonical numbers become typed values so they match the same predicate
/// written directly; `like` and `ilike` patterns stay text. `is` accepts only
/// `null`, `true` or `false`.
fn parse_or(expr: &str) -> Result<Vec<Filter>> {
    let mut filters = Vec::new();

    for triplet in expr.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let mut parts = triplet.splitn(3, '.');
        let (Some(column), Some(operator), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            bail!("malformed or filter `{triplet}`: expected column.operator.value");
        };

        let operator = match operator {
            "eq" | "neq" | "gt" | "gte" | "lt" | "lte" | "ilike" | "like" | "is" => {
                operator.parse::<Operator>()?
            }
            _ => bail!("unsupported operator `{operator}` in or filter `{triplet}`"),
        };

        let value = match operator {
            Operator::Like | Operator::Ilike => Value::String(value.to_string()),
            _ => typed_token(value),
        };
        if operator == Operator::Is && is_keyword(&value).is_none() {
            bail!("or filter `{triplet}`: `is` expects null, true or false");
        }

        filters.push(Filter::new(column, operator, value));
    }

    if filters.is_empty() {
        return Err(anyhow!("empty or filter"));
    }
    Ok(filters)
}

// Numbers are only recognised when they print back unchanged, so `007`
// stays text.
fn typed_token(token: &str) -> Value {
    match token {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => token
            .parse::<i64>()
            .map(Number::from)
            .ok()
            .or_else(|| token.parse::<f64>().ok().and_then(Number::from_f64))
            .filter(|number| number.to_string() == token)
            .map_or_else(|| Value::String(token.to_string()), Value::Number),
    }
}
