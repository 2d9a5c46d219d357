//! Checks a pipeline against a catalog without compiling it.
//!
//! The compiler itself accepts anything it can translate, and leaves type
//! errors to the downstream compiler or to the database. Callers that want
//! earlier, friendlier errors run [validate] first. It reports every issue it
//! finds rather than stopping at the first one.

use std::collections::HashSet;

use pipelinec_ast::{
    Aggregate, AggregateOperation, Catalog, ColumnRef, ColumnSource, ColumnType, Error, Errors,
    ExternalColumn, Filter, FilterValue, OperatorForm, Pipeline, Reason, Relate, RelationAlias,
    Result, Step, Table, WithErrorInfo,
};

use crate::relation::{BaseContext, Orientation};
use crate::resolver::{resolve, Prefix};

pub fn validate(pipeline: &Pipeline, catalog: &Catalog) -> Result<(), Errors> {
    let mut validator = Validator {
        catalog,
        schema: Vec::new(),
        relations: Vec::new(),
        errors: Vec::new(),
    };
    validator.validate(pipeline);

    if validator.errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(validator.errors))
    }
}

struct Validator<'a> {
    catalog: &'a Catalog,
    /// Flattened names of the columns visible after the last step.
    schema: Vec<String>,
    relations: Vec<&'a RelationAlias>,
    errors: Vec<Error>,
}

impl<'a> Validator<'a> {
    fn validate(&mut self, pipeline: &'a Pipeline) {
        let catalog = self.catalog;
        let root = match catalog.table(&pipeline.from) {
            Ok(root) => root,
            Err(e) => return self.errors.push(e),
        };
        match catalog.columns(&root.id) {
            Ok(columns) => {
                let prefix = Prefix::Table(root.external_name.clone());
                self.schema = columns.iter().map(|c| prefix.column(&c.name)).collect();
            }
            Err(e) => return self.errors.push(e),
        }

        for step in &pipeline.steps {
            match step {
                Step::From(from) => self.errors.push(Error::new(Reason::Unexpected {
                    found: format!("`from` step for table `{}`", from.table),
                })),
                Step::Select(select) => {
                    let names = self.resolve_all(&select.select);
                    let mut seen = HashSet::new();
                    for name in &names {
                        if !seen.insert(name) {
                            self.errors.push(Error::new_simple(format!(
                                "column `{name}` is selected more than once"
                            )));
                        }
                    }
                    self.schema = names;
                }
                Step::Filter(filter) => self.filter(filter),
                Step::Order(order) => {
                    for key in &order.order {
                        self.resolve(&key.column);
                    }
                }
                Step::Aggregate(aggregate) => self.aggregate(aggregate),
                Step::Relate(relate) => self.relate(relate, root),
                Step::Take(_) | Step::Display => {}
            }
        }
    }

    fn resolve(&mut self, column: &ColumnRef) -> Option<String> {
        match resolve(column, &self.catalog.tables) {
            Ok(name) => Some(name),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    fn resolve_all(&mut self, columns: &[ColumnRef]) -> Vec<String> {
        columns.iter().filter_map(|c| self.resolve(c)).collect()
    }

    /// Introspected type of a column read from a catalog table.
    fn column_type(&self, column: &ColumnRef) -> Option<ColumnType> {
        let ColumnSource::Table(table) = &column.table else {
            return None;
        };
        self.catalog.column(table, &column.name).map(|c| c.ty)
    }

    fn filter(&mut self, filter: &Filter) {
        for condition in &filter.conditions {
            self.resolve(&condition.column);
            if let FilterValue::Column(other) = &condition.value {
                self.resolve(other);
            }

            if let OperatorForm::Pattern(_) = condition.operator.form() {
                match self.column_type(&condition.column) {
                    Some(ColumnType::String) | None => {}
                    Some(ty) => self.errors.push(
                        Error::new_simple(format!(
                            "`{}` needs a text column, but `{}` is {ty}",
                            condition.operator, condition.column.name
                        ))
                        .push_hint("compare with `equal` instead"),
                    ),
                }
            }
        }
    }

    fn aggregate(&mut self, aggregate: &Aggregate) {
        let group = self.resolve_all(&aggregate.group);
        let column = self.resolve(&aggregate.column);

        if self.schema.contains(&aggregate.alias) {
            self.errors.push(Error::new_simple(format!(
                "aggregate name `{}` collides with an existing column",
                aggregate.alias
            )));
        }

        if let Some(column) = &column {
            if group.contains(column) {
                self.errors.push(Error::new_simple(format!(
                    "column `{}` is both grouped and aggregated",
                    aggregate.column.name
                )));
            }
        }

        if matches!(
            aggregate.operation,
            AggregateOperation::Sum | AggregateOperation::Average
        ) {
            if let Some(ty) = self.column_type(&aggregate.column) {
                if !ty.is_numeric() {
                    self.errors.push(Error::new_simple(format!(
                        "`{}` needs a numeric column, but `{}` is {ty}",
                        aggregate.operation, aggregate.column.name
                    )));
                }
            }
        }

        self.schema = group;
        self.schema.push(aggregate.alias.clone());
    }

    fn relate(&mut self, relate: &'a Relate, root: &'a Table) {
        let alias = &relate.relation;

        let base = match alias.base_relation() {
            None => BaseContext::Root(root),
            Some(base) => match self.relations.iter().copied().find(|r| r.alias == base.alias) {
                Some(found) => BaseContext::Relation(found),
                None => {
                    self.errors
                        .push(Error::new_not_found("relation alias", &base.alias));
                    return;
                }
            },
        };

        match self.check_relation(alias, base) {
            Ok(columns) => {
                let prefix = Prefix::Relation(alias.alias.clone());
                self.schema
                    .extend(columns.iter().map(|c| prefix.column(&c.name)));
                self.relations.push(alias);
            }
            Err(e) => self.errors.push(e),
        }
    }

    /// Columns of the related table, once the relation is known to connect
    /// the base to it.
    fn check_relation(
        &self,
        alias: &RelationAlias,
        base: BaseContext,
    ) -> Result<&'a [ExternalColumn]> {
        let catalog = self.catalog;
        let relation = catalog.relation(&alias.relation)?;
        let target = catalog.table(&alias.table)?;
        let columns = catalog.columns(&target.id)?;

        let orientation = Orientation::of(relation, &target.id);
        if orientation.base_table != base.table() {
            return Err(Error::new_simple(format!(
                "relation `{}` does not connect `{}` to `{}`",
                relation.id,
                base.table(),
                target.id
            )));
        }
        Ok(columns)
    }
}
