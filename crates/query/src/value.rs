//! Literal and identifier formatting.
//!
//! Every literal that reaches SQL text without a bound placeholder passes
//! through [`format_value_for`], and every identifier through
//! [`escape_identifier`]. The statement backend calls both.

use omnia_sql::Dialect;
use sea_query::Value as SqlValue;
use serde_json::Value;

/// Formats a value as a `Postgres` literal.
///
/// - `null` → `NULL`
/// - booleans → `TRUE` / `FALSE`
/// - numbers → decimal text, unquoted
/// - arrays and objects → single-quoted JSON cast to `jsonb`
/// - strings → single-quoted, with embedded single quotes doubled
#[must_use]
pub fn format_value(value: &Value) -> String {
    format_value_for(value, Dialect::Postgres)
}

/// Formats a value as a literal in `dialect`.
///
/// Identical to [`format_value`] except for arrays and objects under
/// [`Dialect::Sqlite`], which are written as plain quoted JSON text.
#[must_use]
pub fn format_value_for(value: &Value, dialect: Dialect) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        Value::Array(_) | Value::Object(_) => {
            let literal = quote_literal(&value.to_string());
            match dialect {
                Dialect::Postgres => format!("{literal}::jsonb"),
                Dialect::Sqlite => literal,
            }
        }
    }
}

/// Quotes an identifier, doubling embedded double quotes.
///
/// Dotted names (`table.column`) are quoted per segment; `*` is left bare.
#[must_use]
pub fn escape_identifier(name: &str) -> String {
    name.split('.')
        .map(|segment| if segment == "*" { segment.to_string() } else { quote_identifier(segment) })
        .collect::<Vec<_>>()
        .join(".")
}

/// Quotes a single identifier segment.
pub(crate) fn quote_identifier(segment: &str) -> String {
    format!("\"{}\"", segment.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Converts a JSON value into the value type statements are built from.
///
/// `null` has no untyped counterpart, so it travels as an empty JSON value.
pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Json(None),
        Value::Bool(b) => SqlValue::Bool(Some(*b)),
        Value::Number(n) => n.as_i64().map_or_else(
            || {
                n.as_u64().map_or_else(
                    || SqlValue::Double(n.as_f64()),
                    |u| SqlValue::BigUnsigned(Some(u)),
                )
            },
            |i| SqlValue::BigInt(Some(i)),
        ),
        Value::String(s) => SqlValue::String(Some(Box::new(s.clone()))),
        Value::Array(_) | Value::Object(_) => SqlValue::Json(Some(Box::new(value.clone()))),
    }
}

/// Converts a statement value back into JSON, for inline formatting and for
/// the parameters handed to a connection.
pub(crate) fn to_json_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Bool(Some(b)) => Value::Bool(*b),
        SqlValue::TinyInt(Some(n)) => Value::from(*n),
        SqlValue::SmallInt(Some(n)) => Value::from(*n),
        SqlValue::Int(Some(n)) => Value::from(*n),
        SqlValue::BigInt(Some(n)) => Value::from(*n),
        SqlValue::TinyUnsigned(Some(n)) => Value::from(*n),
        SqlValue::SmallUnsigned(Some(n)) => Value::from(*n),
        SqlValue::Unsigned(Some(n)) => Value::from(*n),
        SqlValue::BigUnsigned(Some(n)) => Value::from(*n),
        SqlValue::Float(Some(n)) => Value::from(*n),
        SqlValue::Double(Some(n)) => Value::from(*n),
        SqlValue::String(Some(s)) => Value::String(s.to_string()),
        SqlValue::Char(Some(c)) => Value::String(c.to_string()),
        SqlValue::Json(Some(json)) => json.as_ref().clone(),
        // empty values, and variants never produced by `to_sql_value`
        _ => Value::Null,
    }
}
