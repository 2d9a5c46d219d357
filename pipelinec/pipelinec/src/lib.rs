//! # pipelinec
//!
//! Compiler for data-exploration pipelines. A pipeline is a root table
//! followed by steps (select, filter, order, aggregate, relate, take) edited
//! in a UI. It is compiled against a [Catalog] snapshot of the external
//! database into a PRQL script, which `prqlc` then turns into SQL.
//!
//! ```ascii
//!          Pipeline JSON
//!
//!  from_json │
//!            ▼
//!         Pipeline ◄──── Catalog
//!            │
//!  (resolve, │ compile_to_script
//!   steps,   │
//!   relate)  ▼
//!
//!           PRQL
//!            │
//!            │ script_to_sql
//!            ▼
//!
//!            SQL
//! ```
//!
//! Browsing a single table does not need a pipeline: [build_table_query]
//! writes SQL directly, binding pattern values as parameters.
//!
//! ## Example
//!
//! ```
//! use pipelinec::{Catalog, ColumnType, ExternalColumn, Options, Pipeline, Table};
//!
//! let catalog = Catalog::default().with_table(
//!     Table {
//!         id: "t1".into(),
//!         external_name: "orders".to_string(),
//!         schema: "public".to_string(),
//!         database_id: "db".to_string(),
//!     },
//!     ["id", "total"]
//!         .into_iter()
//!         .map(|name| ExternalColumn {
//!             name: name.to_string(),
//!             ty: ColumnType::Number,
//!             is_nullable: false,
//!             default_expression: None,
//!             is_updateable: true,
//!             is_identity: false,
//!         })
//!         .collect(),
//! );
//!
//! let pipeline = Pipeline::from_json(
//!     r#"{"from": "t1", "steps": [{"type": "take", "limit": 10}]}"#,
//! )
//! .unwrap();
//!
//! let sql = pipelinec::compile(&pipeline, &catalog, &Options::default()).unwrap();
//! assert!(sql.contains("orders__total"));
//! assert!(sql.contains("LIMIT 10"));
//! ```

#![forbid(unsafe_code)]
// `CompileError` carries prqlc's diagnostics, which are large. Compilation is
// not on a hot path.
#![allow(clippy::result_large_err)]

use prqlc::Target;
use serde::{Deserialize, Serialize};

pub use pipelinec_ast as ast;
pub use pipelinec_ast::{
    Catalog, ColumnRef, ColumnType, Error, Errors, ExternalColumn, Pipeline, Reason, Relation,
    RelationKind, Result, Step, Table, WithErrorInfo,
};
pub use prqlc::sql::Dialect;
pub use prqlc::{DisplayOptions, ErrorMessage, ErrorMessages};

pub use error_message::{to_messages, CompileError};
pub use table_query::{build_table_query, TableQuery, TableQueryRequest};
pub use validate::validate;

mod error_message;
mod pipeline;
mod relation;
mod resolver;
mod script;
mod sql;
mod steps;
mod table_query;
mod validate;

/// Compile a pipeline into SQL.
pub fn compile(
    pipeline: &Pipeline,
    catalog: &Catalog,
    options: &Options,
) -> Result<String, CompileError> {
    let script = compile_to_script(pipeline, catalog)?;
    script_to_sql(&script, options).map_err(CompileError::Script)
}

/// Compile a pipeline into the PRQL script that [compile] would hand to
/// `prqlc`.
pub fn compile_to_script(pipeline: &Pipeline, catalog: &Catalog) -> Result<String> {
    let script = pipeline::compile_pipeline(pipeline, catalog)?.to_string();
    log::debug!("compiled pipeline from `{}`:\n{script}", pipeline.from);
    Ok(script)
}

/// Compile a PRQL script into SQL. Diagnostics are returned as `prqlc`
/// reports them.
pub fn script_to_sql(script: &str, options: &Options) -> Result<String, ErrorMessages> {
    prqlc::compile(script, &options.to_prqlc())
}

/// Compilation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// SQL dialect of the external database.
    ///
    /// Defaults to Postgres.
    pub dialect: Dialect,

    /// Pass generated SQL through `prqlc`'s formatter.
    ///
    /// Defaults to false.
    pub format: bool,

    /// Append `prqlc`'s signature comment to generated SQL.
    ///
    /// Defaults to false.
    pub signature_comment: bool,

    /// How `prqlc` renders diagnostics.
    pub display: DisplayOptions,

    /// Row limit of table queries that do not ask for one.
    pub default_limit: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            format: false,
            signature_comment: false,
            display: DisplayOptions::Plain,
            default_limit: 100,
        }
    }
}

impl Options {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    pub fn with_signature_comment(mut self, signature_comment: bool) -> Self {
        self.signature_comment = signature_comment;
        self
    }

    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }

    pub fn with_default_limit(mut self, default_limit: u64) -> Self {
        self.default_limit = default_limit;
        self
    }

    fn to_prqlc(&self) -> prqlc::Options {
        prqlc::Options::default()
            .with_target(Target::Sql(Some(self.dialect)))
            .with_format(self.format)
            .with_signature_comment(self.signature_comment)
            .with_display(self.display.clone())
    }
}
