//! Turns a whole pipeline into a script of numbered steps.

use pipelinec_ast::{
    Catalog, ColumnRef, Error, Pipeline, Reason, RelationAlias, Result, Step, Table,
    WithErrorInfo,
};

use crate::relation::{compile_relate, BaseContext};
use crate::resolver::resolve_all;
use crate::script::{Decl, Relation, Script, Source, Transform};
use crate::steps::{self, step_name};

/// Compile a pipeline into a script. The script's main relation reads from the
/// last step and projects every column visible at the end of the pipeline.
pub fn compile_pipeline(pipeline: &Pipeline, catalog: &Catalog) -> Result<Script> {
    let root = catalog.table(&pipeline.from)?;
    let mut ctx = Context::new(root, catalog)?;

    for step in &pipeline.steps {
        ctx.compile_step(step)?;
    }

    ctx.finish()
}

struct Context<'a> {
    catalog: &'a Catalog,
    root: &'a Table,
    decls: Vec<Decl>,
    /// Columns visible after the last compiled step.
    schema: Vec<ColumnRef>,
    /// Relations introduced by Relate steps so far, in order.
    relations: Vec<&'a RelationAlias>,
}

impl<'a> Context<'a> {
    fn new(root: &'a Table, catalog: &'a Catalog) -> Result<Self> {
        let columns = catalog.columns(&root.id)?;
        let schema = columns
            .iter()
            .map(|c| ColumnRef::new(root.id.clone(), &c.name))
            .collect();

        Ok(Context {
            catalog,
            root,
            decls: vec![steps::compile_from(root, columns)],
            schema,
            relations: Vec::new(),
        })
    }

    fn next_index(&self) -> usize {
        self.decls.len()
    }

    fn compile_step(&mut self, step: &'a Step) -> Result<()> {
        let index = self.next_index();
        let catalog = self.catalog;
        let tables = &catalog.tables;

        let decl = match step {
            Step::Display => {
                log::trace!("skipping display step");
                return Ok(());
            }
            Step::From(from) => {
                return Err(Error::new(Reason::Unexpected {
                    found: format!("`from` step for table `{}`", from.table),
                })
                .push_hint("the root table is set by the pipeline's `from`"));
            }
            Step::Select(select) => {
                let decl = steps::compile_select(select, index, tables)?;
                self.schema = select.select.clone();
                decl
            }
            Step::Filter(filter) => steps::compile_filter(filter, index, tables)?,
            Step::Order(order) => steps::compile_order(order, index, tables)?,
            Step::Take(take) => steps::compile_take(take, index)?,
            Step::Aggregate(aggregate) => {
                let decl = steps::compile_aggregate(aggregate, index, tables)?;
                self.schema = aggregate.group.clone();
                self.schema.push(ColumnRef::aggregate(&aggregate.alias));
                decl
            }
            Step::Relate(relate) => {
                let base = self.base_context(&relate.relation)?;
                let compiled = compile_relate(relate, index, base, &self.schema, catalog)?;
                self.schema.extend(compiled.columns);
                self.relations.push(&relate.relation);
                compiled.decl
            }
        };

        log::trace!("compiled {}", decl.name);
        self.decls.push(decl);
        Ok(())
    }

    /// The root table, or the earlier relation named in `on.relation`.
    fn base_context(&self, alias: &RelationAlias) -> Result<BaseContext<'a>> {
        let Some(base) = alias.base_relation() else {
            return Ok(BaseContext::Root(self.root));
        };

        self.relations
            .iter()
            .rev()
            .copied()
            .find(|r| r.alias == base.alias)
            .map(BaseContext::Relation)
            .ok_or_else(|| {
                Error::new_not_found("relation alias", &base.alias)
                    .push_hint("a relation can only be based on one introduced by an earlier step")
            })
    }

    fn finish(self) -> Result<Script> {
        let last = step_name(self.decls.len() - 1);
        let columns = resolve_all(&self.schema, &self.catalog.tables)?;

        Ok(Script {
            decls: self.decls,
            main: Relation::new(Source::Var(last)).with(Transform::Select(columns)),
        })
    }
}
