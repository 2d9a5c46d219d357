//! SQL text helpers shared by filter compilation and the direct table query
//! builder.

use pipelinec_ast::Literal;

/// `'text'`, with embedded single quotes doubled.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `"ident"`, with embedded double quotes doubled.
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// A literal as it is interpolated into SQL text: strings quoted, everything
/// else bare.
pub fn literal(value: &Literal) -> String {
    match value {
        Literal::Null => "NULL".to_string(),
        Literal::String(s) => quote_string(s),
        Literal::Boolean(_)
        | Literal::Integer(_)
        | Literal::Unsigned(_)
        | Literal::Float(_) => value.to_string(),
    }
}

/// The `%value%` pattern used by `like` and `not_like`.
pub fn contains_pattern(value: &Literal) -> Option<String> {
    match value {
        Literal::Null => None,
        value => Some(format!("%{value}%")),
    }
}
