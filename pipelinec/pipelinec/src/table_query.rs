//! SQL for browsing a single table, without going through a pipeline.
//!
//! Values of `like` and `not_like` conditions are bound as positional
//! parameters. Every other literal is written into the SQL text, quoted when
//! it is a string. Callers building requests from untrusted input should keep
//! this in mind.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use pipelinec_ast::{
    ColumnRef, Direction, Error, Filter, FilterValue, OperatorForm, Order, Result, Table, Take,
};

use crate::sql::{self, quote_ident};
use crate::Options;

/// Name of the prepared statement used when parameters are bound.
const STATEMENT_NAME: &str = "table_query";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableQueryRequest {
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub order: Option<Order>,
    /// When absent, the query is limited to `Options::default_limit` rows.
    #[serde(default)]
    pub take: Option<Take>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableQuery {
    pub sql: String,
    /// Values for `$1`, `$2`, …, in order.
    pub params: Vec<String>,
    /// Number of leading result sets the executor returns before the rows of
    /// the query itself. They must be skipped.
    pub discarded_result_sets: usize,
}

pub fn build_table_query(
    table: &Table,
    request: &TableQueryRequest,
    options: &Options,
) -> Result<TableQuery> {
    let mut query = format!(
        "SELECT * FROM {}.{}",
        quote_ident(&table.schema),
        quote_ident(&table.external_name)
    );
    let mut params = Vec::new();

    if let Some(filter) = &request.filter {
        if let Some(predicate) = compile_where(filter, &mut params)? {
            query += " WHERE ";
            query += &predicate;
        }
    }

    if let Some(order) = request.order.as_ref().filter(|o| !o.order.is_empty()) {
        let keys = order.order.iter().map(|key| match key.direction {
            Direction::Asc => quote_ident(&key.column.name),
            Direction::Desc => format!("{} DESC", quote_ident(&key.column.name)),
        });
        query += &format!(" ORDER BY {}", keys.format(", "));
    }

    match &request.take {
        Some(take) => {
            if let Some(limit) = take.limit {
                query += &format!(" LIMIT {limit}");
            }
            if let Some(offset) = take.offset {
                query += &format!(" OFFSET {offset}");
            }
        }
        None => query += &format!(" LIMIT {}", options.default_limit),
    }

    if params.is_empty() {
        return Ok(TableQuery {
            sql: query,
            params,
            discarded_result_sets: 0,
        });
    }

    let types = params.iter().map(|_| "text").format(", ");
    let placeholders = (1..=params.len()).map(|n| format!("${n}")).format(", ");
    let sql = format!(
        "PREPARE {STATEMENT_NAME}({types}) AS {query}; EXECUTE {STATEMENT_NAME}({placeholders})"
    );
    log::debug!("table query binds {} parameter(s)", params.len());

    Ok(TableQuery {
        sql,
        params,
        discarded_result_sets: 1,
    })
}

/// The WHERE clause, or `None` when the filter has no conditions.
fn compile_where(filter: &Filter, params: &mut Vec<String>) -> Result<Option<String>> {
    let mut conditions = Vec::with_capacity(filter.conditions.len());

    for condition in &filter.conditions {
        let column = column(&condition.column);

        let compiled = match (condition.operator.form(), &condition.value) {
            (OperatorForm::Unary(op), _) => format!("{column} {op}"),
            (OperatorForm::Pattern(op), FilterValue::Literal(value)) => {
                let pattern = sql::contains_pattern(value).ok_or_else(|| {
                    Error::new_simple(format!("`{}` needs a value", condition.operator))
                })?;
                params.push(pattern);
                format!("{column} {op} ${}", params.len())
            }
            (OperatorForm::Pattern(_), FilterValue::Column(_)) => {
                return Err(Error::new_simple(format!(
                    "`{}` matches against a text value, not a column",
                    condition.operator
                )));
            }
            (OperatorForm::Infix(op), FilterValue::Column(other)) => {
                format!("{column} {op} {}", self::column(other))
            }
            (OperatorForm::Infix(op), FilterValue::Literal(value)) => {
                format!("{column} {op} {}", sql::literal(value))
            }
        };
        conditions.push(compiled);
    }

    if conditions.is_empty() {
        return Ok(None);
    }
    let separator = format!(" {} ", filter.logical_operator);
    Ok(Some(conditions.join(&separator)))
}

/// Columns are addressed by their raw name; the query reads a single table.
fn column(column: &ColumnRef) -> String {
    quote_ident(&column.name)
}
