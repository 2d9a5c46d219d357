//! A minimal representation of the PRQL scripts pipelinec emits, and the
//! writer that turns them into source text.
//!
//! Only the handful of transforms the step compilers need are modelled. The
//! writer is deterministic: the same script always produces the same text.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter, Write};
use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;

use pipelinec_ast::AggregateOperation;

/// A whole script: a sequence of `let` declarations and a main relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub decls: Vec<Decl>,
    pub main: Relation,
}

/// `let {name} = ({relation})`
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: String,
    pub relation: Relation,
}

/// A source followed by a pipeline of transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub source: Source,
    pub transforms: Vec<Transform>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A physical table, addressed as `schema.table`.
    Table { schema: String, name: String },
    /// An earlier `let` declaration.
    Var(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// `derive {name = this.column, …}`
    Derive(Vec<(String, String)>),
    /// `select {this.name, …}`
    Select(Vec<String>),
    Filter(SString),
    Sort(Vec<SortKey>),
    /// `aggregate {…}`, or `group {…} (aggregate {…})` when `by` is not empty.
    Aggregate {
        by: Vec<String>,
        operation: AggregateOperation,
        column: String,
        alias: String,
    },
    /// `join side:left {alias} = ({with}) (this.{left} == that.{right})`
    Join {
        alias: String,
        with: Box<Relation>,
        left: String,
        right: String,
    },
    /// One-based, inclusive, like PRQL's own ranges.
    Take {
        start: Option<u64>,
        end: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

/// An s-string: raw SQL text with interpolated column references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SString(pub Vec<InterpolateItem>);

#[derive(Debug, Clone, PartialEq)]
pub enum InterpolateItem {
    String(String),
    Column(String),
}

impl Relation {
    pub fn new(source: Source) -> Self {
        Relation {
            source,
            transforms: Vec::new(),
        }
    }

    pub fn with(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    fn write(&self, f: &mut Formatter<'_>, separator: &str) -> fmt::Result {
        write!(f, "from {}", self.source)?;
        for transform in &self.transforms {
            f.write_str(separator)?;
            transform.fmt(f)?;
        }
        Ok(())
    }
}

impl SString {
    pub fn push_str(&mut self, text: &str) {
        if let Some(InterpolateItem::String(last)) = self.0.last_mut() {
            last.push_str(text);
        } else {
            self.0.push(InterpolateItem::String(text.to_string()));
        }
    }

    pub fn push_column(&mut self, column: String) {
        self.0.push(InterpolateItem::Column(column));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Script {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for decl in &self.decls {
            writeln!(f, "{decl}\n")?;
        }
        self.main.write(f, "\n")?;
        f.write_char('\n')
    }
}

impl Display for Decl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "let {} = (", write_ident_part(&self.name))?;
        f.write_str("  ")?;
        self.relation.write(f, "\n  ")?;
        f.write_str("\n)")
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write(f, " | ")
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Source::Table { schema, name } => {
                write!(f, "{}.{}", write_ident_part(schema), write_ident_part(name))
            }
            Source::Var(name) => f.write_str(&write_ident_part(name)),
        }
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Derive(assigns) => {
                let assigns = assigns.iter().map(|(name, column)| {
                    format!("{} = {}", write_ident_part(name), write_column(column))
                });
                write!(f, "derive {{{}}}", assigns.format(", "))
            }
            Transform::Select(columns) => {
                write!(f, "select {{{}}}", columns.iter().map(|c| write_column(c)).format(", "))
            }
            Transform::Filter(predicate) => write!(f, "filter {predicate}"),
            Transform::Sort(keys) => {
                let keys = keys.iter().map(|key| {
                    let sign = if key.descending { "-" } else { "" };
                    format!("{sign}{}", write_column(&key.column))
                });
                write!(f, "sort {{{}}}", keys.format(", "))
            }
            Transform::Aggregate {
                by,
                operation,
                column,
                alias,
            } => {
                let aggregate = format!(
                    "aggregate {{{} = {operation} {}}}",
                    write_ident_part(alias),
                    write_column(column)
                );
                if by.is_empty() {
                    f.write_str(&aggregate)
                } else {
                    let by = by.iter().map(|c| write_column(c)).format(", ");
                    write!(f, "group {{{by}}} ({aggregate})")
                }
            }
            Transform::Join {
                alias,
                with,
                left,
                right,
            } => write!(
                f,
                "join side:left {} = ({with}) ({} == that.{})",
                write_ident_part(alias),
                write_column(left),
                write_ident_part(right),
            ),
            Transform::Take { start, end } => match (start, end) {
                (None | Some(1), Some(end)) => write!(f, "take {end}"),
                (Some(start), Some(end)) => write!(f, "take {start}..{end}"),
                (Some(start), None) => write!(f, "take {start}.."),
                (None, None) => f.write_str("take 1.."),
            },
        }
    }
}

impl Display for SString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut body = String::new();
        for item in &self.0 {
            match item {
                InterpolateItem::String(text) => {
                    // The lexer reads `\` escapes in s-strings too.
                    body += &text
                        .replace('\\', "\\\\")
                        .replace('{', "{{")
                        .replace('}', "}}");
                }
                InterpolateItem::Column(column) => {
                    body += "{";
                    body += &write_column(column);
                    body += "}";
                }
            }
        }
        write!(f, "s{}", quote_string(&body))
    }
}

/// A column of the relation being transformed. Always qualified with `this`,
/// so that column names never resolve to standard library functions.
fn write_column(name: &str) -> String {
    format!("this.{}", write_ident_part(name))
}

fn keywords() -> &'static HashSet<&'static str> {
    static KEYWORDS: OnceLock<HashSet<&str>> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        HashSet::from_iter([
            "let", "into", "case", "prql", "type", "module", "internal", "func", "import",
            "enum", "this", "that", "true", "false", "null",
        ])
    })
}

fn valid_prql_ident() -> &'static Regex {
    static VALID_PRQL_IDENT: OnceLock<Regex> = OnceLock::new();
    VALID_PRQL_IDENT.get_or_init(|| Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$]*$").unwrap())
}

pub fn write_ident_part(s: &str) -> String {
    if valid_prql_ident().is_match(s) && !keywords().contains(s) {
        s.to_string()
    } else {
        format!("`{}`", s)
    }
}

/// Delimit a PRQL string, picking a quote that does not appear in it.
fn quote_string(s: &str) -> String {
    if !s.contains('"') {
        return format!(r#""{}""#, s);
    }

    if !s.contains('\'') {
        return format!("'{}'", s);
    }

    // If the string starts or ends with a quote, use the other quote to delimit
    // the string. Otherwise default to double quotes.
    let quote = if s.starts_with('"') || s.ends_with('"') {
        '\''
    } else {
        '"'
    };

    // Quotes must be odd; an even number of quotes is an empty string. Use
    // the next odd number above the longest run of the delimiter.
    let max_consecutive = s
        .split(|c| c != quote)
        .map(|quote_sequence| quote_sequence.len())
        .max()
        .unwrap_or(0);
    let next_odd = (max_consecutive + 1) / 2 * 2 + 1;
    let delim = quote.to_string().repeat(next_odd);

    format!("{}{}{}", delim, s, delim)
}
