use omnia_sql::Dialect;
use sea_query::backend::{
    EscapeBuilder, OperLeftAssocDecider, PrecedenceDecider, QuotedBuilder, TableRefBuilder,
};
use sea_query::prepare::SqlWriter;
use sea_query::{
    BinOper, Oper, QueryStatementWriter, Quote, SimpleExpr, SubQueryStatement,
    Value as SqlValue,
};
use serde_json::Value;

use crate::value::{format_value_for, to_json_value};

/// A rendered SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Statement text.
    pub sql: String,

    /// Positional parameters for `$n` placeholders. Empty when rendering inline.
    pub params: Vec<Value>,
}

/// How literal values are written into statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Render {
    /// Values are formatted into the SQL text as escaped literals.
    #[default]
    Inline,

    /// Values are written as numbered `$n` placeholders and returned as
    /// parameters. This includes `LIMIT` and `OFFSET`.
    Bound,
}

/// Statement backend: double-quoted identifiers, `$n` placeholders, and
/// literals written through the value formatter when rendering inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Backend {
    render: Render,
    dialect: Dialect,
}

impl Backend {
    pub const fn new(render: Render, dialect: Dialect) -> Self {
        Self { render, dialect }
    }

    /// Renders `statement` to text and parameters.
    pub fn build(self, statement: &impl QueryStatementWriter) -> Query {
        let (sql, values) = statement.build(self);
        Query {
            sql,
            params: values.into_iter().map(|value| to_json_value(&value)).collect(),
        }
    }
}

impl QuotedBuilder for Backend {
    fn quote(&self) -> Quote {
        Quote::new(b'"')
    }
}

impl EscapeBuilder for Backend {}

impl TableRefBuilder for Backend {}

impl OperLeftAssocDecider for Backend {
    fn well_known_left_associative(&self, op: &BinOper) -> bool {
        matches!(
            op,
            BinOper::And | BinOper::Or | BinOper::Add | BinOper::Sub | BinOper::Mul | BinOper::Mod
        )
    }
}

impl PrecedenceDecider for Backend {
    // comparisons bind tighter than AND/OR; every other nesting is parenthesised
    fn inner_expr_well_known_greater_precedence(
        &self, inner: &SimpleExpr, outer_oper: &Oper,
    ) -> bool {
        match inner {
            SimpleExpr::Binary(_, op, _) => {
                is_predicate(op) && matches!(outer_oper, Oper::BinOper(BinOper::And | BinOper::Or))
            }
            SimpleExpr::Unary(..) => false,
            _ => true,
        }
    }
}

const fn is_predicate(op: &BinOper) -> bool {
    matches!(
        op,
        BinOper::Equal
            | BinOper::NotEqual
            | BinOper::SmallerThan
            | BinOper::SmallerThanOrEqual
            | BinOper::GreaterThan
            | BinOper::GreaterThanOrEqual
            | BinOper::Is
            | BinOper::IsNot
            | BinOper::In
            | BinOper::NotIn
            | BinOper::Like
            | BinOper::NotLike
            | BinOper::Custom(_)
    )
}

impl sea_query::backend::QueryBuilder for Backend {
    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        match query {
            SubQueryStatement::SelectStatement(s) => self.prepare_select_statement(s, sql),
            SubQueryStatement::InsertStatement(s) => self.prepare_insert_statement(s, sql),
            SubQueryStatement::UpdateStatement(s) => self.prepare_update_statement(s, sql),
            SubQueryStatement::DeleteStatement(s) => self.prepare_delete_statement(s, sql),
            SubQueryStatement::WithStatement(s) => self.prepare_with_query(s, sql),
        }
    }

    fn prepare_value(&self, value: &SqlValue, sql: &mut dyn SqlWriter) {
        match self.render {
            Render::Inline => {
                let _ = sql.write_str(&format_value_for(&to_json_value(value), self.dialect));
            }
            Render::Bound => sql.push_param(value.clone(), self),
        }
    }

    fn placeholder(&self) -> (&str, bool) {
        ("$", true)
    }
}
