//! Flattened column names.
//!
//! Every column flowing through a compiled pipeline is named
//! `{prefix}__{column}`, where the prefix is the table's external name or the
//! alias of the relation it was joined under. Two columns with the same raw
//! name never collide as long as their prefixes differ. Columns produced by
//! an aggregate keep their bare name.

use std::fmt::{self, Display, Formatter};

use pipelinec_ast::{ColumnRef, ColumnSource, Error, Result, Table};

/// The namespace of a flattened column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// A physical table, by external name.
    Table(String),
    /// A table joined through a Relate step, by relation alias.
    Relation(String),
    /// The junction table of a many-to-many relation, by relation alias.
    JoinTable(String),
}

impl Prefix {
    pub fn column(&self, name: &str) -> String {
        format!("{self}__{name}")
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Table(name) | Prefix::Relation(name) => f.write_str(name),
            Prefix::JoinTable(alias) => write!(f, "{alias}_join_table"),
        }
    }
}

/// Resolve a column reference to its flattened name.
pub fn resolve(column: &ColumnRef, tables: &[Table]) -> Result<String> {
    let table_id = match &column.table {
        ColumnSource::Aggregate => return Ok(column.name.clone()),
        ColumnSource::Table(id) => id,
    };

    if let Some(relation) = &column.relation {
        return Ok(Prefix::Relation(relation.alias.clone()).column(&column.name));
    }

    let table = tables
        .iter()
        .find(|t| &t.id == table_id)
        .ok_or_else(|| Error::new_not_found("table", table_id))?;
    Ok(Prefix::Table(table.external_name.clone()).column(&column.name))
}

pub fn resolve_all<'a, I>(columns: I, tables: &[Table]) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a ColumnRef>,
{
    columns.into_iter().map(|c| resolve(c, tables)).collect()
}
