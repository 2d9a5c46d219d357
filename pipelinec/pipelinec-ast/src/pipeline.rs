//! The pipeline document: a root table followed by an ordered list of steps,
//! in the JSON shape the UI edits and persists.

use std::fmt;

use enum_as_inner::EnumAsInner;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, Reason, RelationId, Result, TableId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pipeline {
    #[schemars(with = "String")]
    pub from: TableId,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Pipeline {
    /// Parse a pipeline document. Unknown step types and operators are
    /// reported here, before any compilation starts.
    pub fn from_json(json: &str) -> Result<Pipeline> {
        serde_json::from_str(json).map_err(|e| {
            Error::new(Reason::Unexpected {
                found: format!("pipeline document: {e}"),
            })
        })
    }
}

/// JSON schema of the pipeline document, for editors and API docs.
pub fn pipeline_json_schema() -> Result<String> {
    let schema = schemars::schema_for!(Pipeline);
    serde_json::to_string_pretty(&schema).map_err(|e| Error::new_assert(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, EnumAsInner)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    From(FromTable),
    Select(Select),
    Filter(Filter),
    Order(Order),
    Aggregate(Aggregate),
    Relate(Relate),
    Take(Take),
    /// UI-only branching construct. Has no effect on the compiled query.
    Display,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FromTable {
    #[schemars(with = "String")]
    pub table: TableId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Select {
    pub select: Vec<ColumnRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub logical_operator: LogicalOperator,
    pub conditions: Vec<FilterCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Order {
    pub order: Vec<OrderKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OrderKey {
    pub column: ColumnRef,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Aggregate {
    #[serde(default)]
    pub group: Vec<ColumnRef>,
    pub operation: AggregateOperation,
    pub column: ColumnRef,
    /// Name of the produced column. Unprefixed in the compiled query.
    #[serde(rename = "as")]
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Relate {
    pub relation: RelationAlias,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Take {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

/// A column as seen by the UI: where it comes from and its raw name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnRef {
    #[schemars(with = "String")]
    pub table: ColumnSource,
    pub name: String,
    /// Set when the column lives on a table reached through a Relate step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationAlias>,
}

/// Origin of a column. Serialized as the table id, or as the string
/// `"aggregate"` for columns produced by an Aggregate step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnSource {
    Aggregate,
    Table(TableId),
}

/// The name under which a related table's columns are exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelationAlias {
    #[serde(rename = "as")]
    pub alias: String,
    #[schemars(with = "String")]
    pub relation: RelationId,
    #[schemars(with = "String")]
    pub table: TableId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<RelationOn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelationOn {
    /// When set, the join is based on this earlier relation rather than on
    /// the pipeline's root table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Box<RelationAlias>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FilterCondition {
    pub column: ColumnRef,
    pub operator: Operator,
    #[serde(default)]
    pub value: FilterValue,
}

/// Right-hand side of a condition. A value that type-checks as a column
/// reference is compared column to column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FilterValue {
    Column(ColumnRef),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    /// Integers above `i64::MAX`, kept exact.
    Unsigned(u64),
    Float(f64),
    String(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

/// How an operator is written in SQL.
pub enum OperatorForm {
    /// `{column} IS NULL`
    Unary(&'static str),
    /// `{column} LIKE '%value%'`
    Pattern(&'static str),
    /// `{column} > {value}`
    Infix(&'static str),
}

impl Operator {
    pub fn form(&self) -> OperatorForm {
        match self {
            Operator::Equal => OperatorForm::Infix("="),
            Operator::NotEqual => OperatorForm::Infix("<>"),
            Operator::GreaterThan => OperatorForm::Infix(">"),
            Operator::LessThan => OperatorForm::Infix("<"),
            Operator::GreaterThanOrEqual => OperatorForm::Infix(">="),
            Operator::LessThanOrEqual => OperatorForm::Infix("<="),
            Operator::Like => OperatorForm::Pattern("LIKE"),
            Operator::NotLike => OperatorForm::Pattern("NOT LIKE"),
            Operator::IsNull => OperatorForm::Unary("IS NULL"),
            Operator::IsNotNull => OperatorForm::Unary("IS NOT NULL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

/// Aggregate functions. The display name is the PRQL standard library
/// function implementing it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AggregateOperation {
    Sum,
    Count,
    Average,
    Min,
    Max,
}

impl ColumnRef {
    pub fn new<T: Into<TableId>>(table: T, name: &str) -> Self {
        ColumnRef {
            table: ColumnSource::Table(table.into()),
            name: name.to_string(),
            relation: None,
        }
    }

    pub fn aggregate(name: &str) -> Self {
        ColumnRef {
            table: ColumnSource::Aggregate,
            name: name.to_string(),
            relation: None,
        }
    }

    pub fn with_relation(mut self, relation: RelationAlias) -> Self {
        self.relation = Some(relation);
        self
    }
}

impl RelationAlias {
    /// The earlier relation this one is chained from, if any.
    pub fn base_relation(&self) -> Option<&RelationAlias> {
        self.on.as_ref()?.relation.as_deref()
    }
}

impl Default for FilterValue {
    fn default() -> Self {
        FilterValue::Literal(Literal::Null)
    }
}

impl From<String> for ColumnSource {
    fn from(value: String) -> Self {
        if value == "aggregate" {
            ColumnSource::Aggregate
        } else {
            ColumnSource::Table(TableId(value))
        }
    }
}

impl From<ColumnSource> for String {
    fn from(source: ColumnSource) -> Self {
        match source {
            ColumnSource::Aggregate => "aggregate".to_string(),
            ColumnSource::Table(id) => id.0,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Unsigned(u) => write!(f, "{u}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::String(s) => f.write_str(s),
        }
    }
}
