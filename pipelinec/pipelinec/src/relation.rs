//! Compiles Relate steps into joins.
//!
//! A relation has two symmetric sides. The side matching the relate target is
//! joined in; the other side is the base, whose columns are already present
//! under the base context's prefix. Many-to-many relations go through their
//! junction table, whose columns never leak into the result.

use pipelinec_ast::{
    Catalog, ColumnRef, Junction, Relate, Relation, RelationAlias, RelationKind, Result, Table,
    TableId,
};

use crate::resolver::{resolve_all, Prefix};
use crate::script::{Decl, Transform};
use crate::steps::{flatten_table, step};

/// What a Relate step joins from.
#[derive(Debug, Clone, Copy)]
pub enum BaseContext<'a> {
    /// The pipeline's root table.
    Root(&'a Table),
    /// A relation introduced by an earlier Relate step.
    Relation(&'a RelationAlias),
}

impl BaseContext<'_> {
    pub fn prefix(&self) -> Prefix {
        match self {
            BaseContext::Root(table) => Prefix::Table(table.external_name.clone()),
            BaseContext::Relation(alias) => Prefix::Relation(alias.alias.clone()),
        }
    }

    pub fn table(&self) -> &TableId {
        match self {
            BaseContext::Root(table) => &table.id,
            BaseContext::Relation(alias) => &alias.table,
        }
    }
}

/// Which side of a relation is the base, given the table being joined in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orientation<'a> {
    pub base_table: &'a TableId,
    pub base_column: &'a str,
    pub target_column: &'a str,
    target_is_table_1: bool,
}

impl<'a> Orientation<'a> {
    pub fn of(relation: &'a Relation, target: &TableId) -> Self {
        if target == &relation.table_1 {
            Orientation {
                base_table: &relation.table_2,
                base_column: &relation.column_2,
                target_column: &relation.column_1,
                target_is_table_1: true,
            }
        } else {
            Orientation {
                base_table: &relation.table_1,
                base_column: &relation.column_1,
                target_column: &relation.column_2,
                target_is_table_1: false,
            }
        }
    }

    /// Junction columns referencing the base and the target side, in that
    /// order.
    fn junction_columns(&self, junction: &'a Junction) -> (&'a str, &'a str) {
        if self.target_is_table_1 {
            (&junction.column_2, &junction.column_1)
        } else {
            (&junction.column_1, &junction.column_2)
        }
    }
}

#[derive(Debug)]
pub struct CompiledRelate {
    pub decl: Decl,
    /// Columns of the joined table, as they are visible after the step.
    pub columns: Vec<ColumnRef>,
}

/// Compile a Relate step.
///
/// `input_schema` is the set of columns visible before the step; it is
/// needed to rebuild the projection of many-to-many joins.
pub fn compile_relate(
    relate: &Relate,
    index: usize,
    base: BaseContext,
    input_schema: &[ColumnRef],
    catalog: &Catalog,
) -> Result<CompiledRelate> {
    let alias = &relate.relation;
    let relation = catalog.relation(&alias.relation)?;
    let target = catalog.table(&alias.table)?;
    let target_columns = catalog.columns(&target.id)?;

    let orientation = Orientation::of(relation, &target.id);
    let base_prefix = base.prefix();
    let target_prefix = Prefix::Relation(alias.alias.clone());
    let joined = Box::new(flatten_table(target, &target_prefix, target_columns));

    log::debug!(
        "relating {} as `{}` from `{base_prefix}` via {}",
        target.external_name,
        alias.alias,
        relation.id
    );

    let transforms = match &relation.kind {
        RelationKind::OneToOne | RelationKind::OneToMany => vec![Transform::Join {
            alias: target_prefix.to_string(),
            with: joined,
            left: base_prefix.column(orientation.base_column),
            right: target_prefix.column(orientation.target_column),
        }],
        RelationKind::ManyToMany(junction) => {
            let junction_table = catalog.table(&junction.table)?;
            let junction_prefix = Prefix::JoinTable(alias.alias.clone());
            let (junction_base, junction_target) = orientation.junction_columns(junction);

            let mut projection = resolve_all(input_schema, &catalog.tables)?;
            projection.extend(target_columns.iter().map(|c| target_prefix.column(&c.name)));

            vec![
                Transform::Join {
                    alias: junction_prefix.to_string(),
                    with: Box::new(flatten_table(
                        junction_table,
                        &junction_prefix,
                        catalog.columns(&junction_table.id)?,
                    )),
                    left: base_prefix.column(orientation.base_column),
                    right: junction_prefix.column(junction_base),
                },
                Transform::Join {
                    alias: target_prefix.to_string(),
                    with: joined,
                    left: junction_prefix.column(junction_target),
                    right: target_prefix.column(orientation.target_column),
                },
                Transform::Select(projection),
            ]
        }
    };

    let columns = target_columns
        .iter()
        .map(|c| ColumnRef::new(target.id.clone(), &c.name).with_relation(alias.clone()))
        .collect();

    Ok(CompiledRelate {
        decl: step(index, transforms)?,
        columns,
    })
}
