//! Compilers for the single-relation steps.
//!
//! Each compiler turns one step into a `let step_{index}` declaration that
//! reads from `step_{index - 1}`. They are pure: the same step, index and
//! tables always give the same declaration.

use pipelinec_ast::{
    Aggregate, Direction, ExternalColumn, Filter, FilterValue, OperatorForm, Order, Result, Select,
    Table, Take,
};
use pipelinec_ast::{Error, WithErrorInfo};

use crate::resolver::{resolve, resolve_all, Prefix};
use crate::script::{Decl, Relation, SString, SortKey, Source, Transform};
use crate::sql;

pub fn step_name(index: usize) -> String {
    format!("step_{index}")
}

pub(crate) fn step(index: usize, transforms: Vec<Transform>) -> Result<Decl> {
    let previous = index
        .checked_sub(1)
        .ok_or_else(|| Error::new_assert("only the from step may be numbered 0"))?;

    Ok(Decl {
        name: step_name(index),
        relation: Relation {
            source: Source::Var(step_name(previous)),
            transforms,
        },
    })
}

/// A physical table with every column renamed to its flattened name, so that
/// the table can be joined or selected from without any name clashing.
pub fn flatten_table(table: &Table, prefix: &Prefix, columns: &[ExternalColumn]) -> Relation {
    let names: Vec<_> = columns.iter().map(|c| prefix.column(&c.name)).collect();
    let derived = names
        .iter()
        .zip(columns)
        .map(|(name, c)| (name.clone(), c.name.clone()))
        .collect();

    Relation::new(Source::Table {
        schema: table.schema.clone(),
        name: table.external_name.clone(),
    })
    .with(Transform::Derive(derived))
    .with(Transform::Select(names))
}

/// The root table of a pipeline, always `step_0`.
pub fn compile_from(table: &Table, columns: &[ExternalColumn]) -> Decl {
    Decl {
        name: step_name(0),
        relation: flatten_table(table, &Prefix::Table(table.external_name.clone()), columns),
    }
}

pub fn compile_select(select: &Select, index: usize, tables: &[Table]) -> Result<Decl> {
    if select.select.is_empty() {
        return Err(Error::new_simple("select step has no columns")
            .push_hint("select at least one column, or remove the step"));
    }
    let columns = resolve_all(&select.select, tables)?;

    step(index, vec![Transform::Select(columns)])
}

pub fn compile_filter(filter: &Filter, index: usize, tables: &[Table]) -> Result<Decl> {
    let predicate = compile_predicate(filter, tables)?;

    let transforms = if predicate.is_empty() {
        vec![]
    } else {
        vec![Transform::Filter(predicate)]
    };
    step(index, transforms)
}

/// All conditions of a filter as one SQL expression, joined by the logical
/// operator.
fn compile_predicate(filter: &Filter, tables: &[Table]) -> Result<SString> {
    let mut predicate = SString::default();

    for (position, condition) in filter.conditions.iter().enumerate() {
        if position > 0 {
            predicate.push_str(&format!(" {} ", filter.logical_operator));
        }
        predicate.push_column(resolve(&condition.column, tables)?);

        match (condition.operator.form(), &condition.value) {
            (OperatorForm::Unary(op), _) => {
                predicate.push_str(&format!(" {op}"));
            }
            (OperatorForm::Pattern(op), FilterValue::Literal(value)) => {
                let pattern = sql::contains_pattern(value).ok_or_else(|| {
                    Error::new_simple(format!("`{}` needs a value", condition.operator))
                })?;
                predicate.push_str(&format!(" {op} {}", sql::quote_string(&pattern)));
            }
            (OperatorForm::Pattern(_), FilterValue::Column(_)) => {
                return Err(Error::new_simple(format!(
                    "`{}` matches against a text value, not a column",
                    condition.operator
                )));
            }
            (OperatorForm::Infix(op), FilterValue::Column(other)) => {
                predicate.push_str(&format!(" {op} "));
                predicate.push_column(resolve(other, tables)?);
            }
            (OperatorForm::Infix(op), FilterValue::Literal(value)) => {
                predicate.push_str(&format!(" {op} {}", sql::literal(value)));
            }
        }
    }

    log::trace!("filter predicate: {predicate:?}");
    Ok(predicate)
}

pub fn compile_order(order: &Order, index: usize, tables: &[Table]) -> Result<Decl> {
    let keys = order
        .order
        .iter()
        .map(|key| {
            Ok(SortKey {
                column: resolve(&key.column, tables)?,
                descending: key.direction == Direction::Desc,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let transforms = if keys.is_empty() {
        vec![]
    } else {
        vec![Transform::Sort(keys)]
    };
    step(index, transforms)
}

pub fn compile_aggregate(aggregate: &Aggregate, index: usize, tables: &[Table]) -> Result<Decl> {
    let by = resolve_all(&aggregate.group, tables)?;
    let column = resolve(&aggregate.column, tables)?;

    step(
        index,
        vec![Transform::Aggregate {
            by,
            operation: aggregate.operation,
            column,
            alias: aggregate.alias.clone(),
        }],
    )
}

pub fn compile_take(take: &Take, index: usize) -> Result<Decl> {
    let offset = take.offset.unwrap_or(0);
    let out_of_bounds = || {
        Error::new_simple("take range is out of bounds")
            .push_hint(format!("offset and limit must add up to at most {}", u64::MAX))
    };

    let transforms = match take.limit {
        Some(limit) => vec![Transform::Take {
            start: Some(offset.checked_add(1).ok_or_else(out_of_bounds)?),
            end: Some(offset.checked_add(limit).ok_or_else(out_of_bounds)?),
        }],
        None if offset > 0 => vec![Transform::Take {
            start: Some(offset.checked_add(1).ok_or_else(out_of_bounds)?),
            end: None,
        }],
        None => vec![],
    };
    step(index, transforms)
}
