//! Metadata about the external database: tables, their introspected columns
//! and the relations discovered between them.
//!
//! A [Catalog] is a snapshot supplied per compilation. Nothing here is cached
//! across calls.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, WithErrorInfo};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(pub String);

/// A physical table inside an external database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub external_name: String,
    pub schema: String,
    pub database_id: String,
}

/// Introspection result for one physical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub default_expression: Option<String>,
    #[serde(default)]
    pub is_updateable: bool,
    #[serde(default)]
    pub is_identity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColumnType {
    String,
    Number,
    Float,
    Boolean,
    Date,
    Datetime,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::Float)
    }
}

/// A relation discovered between two tables.
///
/// Side `1` and side `2` are symmetric: which one acts as the base of a join
/// is decided when a pipeline relates to one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RelationDef", into = "RelationDef")]
pub struct Relation {
    pub id: RelationId,
    pub kind: RelationKind,
    pub table_1: TableId,
    pub column_1: String,
    pub table_2: TableId,
    pub column_2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToMany(Junction),
}

/// The junction table implementing a many-to-many relation. `column_1`
/// references `table_1` of the relation, `column_2` references `table_2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Junction {
    pub table: TableId,
    pub column_1: String,
    pub column_2: String,
}

/// Wire shape of [Relation], as persisted by the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RelationDef {
    id: RelationId,
    #[serde(rename = "type")]
    kind: RelationType,
    table_1: TableId,
    column_1: String,
    table_2: TableId,
    column_2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join_table: Option<TableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join_column_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join_column_2: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
enum RelationType {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl TryFrom<RelationDef> for Relation {
    type Error = Error;

    fn try_from(def: RelationDef) -> Result<Self> {
        let junction = (def.join_table, def.join_column_1, def.join_column_2);

        let kind = match (def.kind, junction) {
            (RelationType::OneToOne, (None, None, None)) => RelationKind::OneToOne,
            (RelationType::OneToMany, (None, None, None)) => RelationKind::OneToMany,
            (RelationType::ManyToMany, (Some(table), Some(column_1), Some(column_2))) => {
                RelationKind::ManyToMany(Junction {
                    table,
                    column_1,
                    column_2,
                })
            }
            (RelationType::ManyToMany, _) => {
                return Err(Error::new_simple(format!(
                    "relation `{}` is many_to_many but lacks a junction table",
                    def.id
                ))
                .push_hint("expected join_table, join_column_1 and join_column_2"));
            }
            (kind, _) => {
                return Err(Error::new_simple(format!(
                    "relation `{}` is {kind} but declares a junction table",
                    def.id
                )));
            }
        };

        Ok(Relation {
            id: def.id,
            kind,
            table_1: def.table_1,
            column_1: def.column_1,
            table_2: def.table_2,
            column_2: def.column_2,
        })
    }
}

impl From<Relation> for RelationDef {
    fn from(relation: Relation) -> Self {
        let (kind, join_table, join_column_1, join_column_2) = match relation.kind {
            RelationKind::OneToOne => (RelationType::OneToOne, None, None, None),
            RelationKind::OneToMany => (RelationType::OneToMany, None, None, None),
            RelationKind::ManyToMany(j) => (
                RelationType::ManyToMany,
                Some(j.table),
                Some(j.column_1),
                Some(j.column_2),
            ),
        };
        RelationDef {
            id: relation.id,
            kind,
            table_1: relation.table_1,
            column_1: relation.column_1,
            table_2: relation.table_2,
            column_2: relation.column_2,
            join_table,
            join_column_1,
            join_column_2,
        }
    }
}

/// Snapshot of everything a compilation may look up: the tables reachable
/// from a pipeline, the relations between them and their columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Columns per table, in introspection order.
    pub columns: HashMap<TableId, Vec<ExternalColumn>>,
}

impl Catalog {
    pub fn with_table(mut self, table: Table, columns: Vec<ExternalColumn>) -> Self {
        self.columns.insert(table.id.clone(), columns);
        self.tables.push(table);
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn table(&self, id: &TableId) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| Error::new_not_found("table", id))
    }

    pub fn relation(&self, id: &RelationId) -> Result<&Relation> {
        self.relations
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| Error::new_not_found("relation", id))
    }

    pub fn columns(&self, id: &TableId) -> Result<&[ExternalColumn]> {
        match self.columns.get(id) {
            Some(columns) if !columns.is_empty() => Ok(columns),
            Some(_) => Err(Error::new_simple(format!("table `{id}` has no columns"))),
            None => Err(Error::new_not_found("table schema", id)
                .push_hint("the table has not been introspected yet")),
        }
    }

    /// Introspected column of a table by name, if the table is known.
    pub fn column(&self, table: &TableId, name: &str) -> Option<&ExternalColumn> {
        self.columns.get(table)?.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableId {
    fn from(id: &str) -> Self {
        TableId(id.to_string())
    }
}

impl From<&str> for RelationId {
    fn from(id: &str) -> Self {
        RelationId(id.to_string())
    }
}
