/// A pipelinec error. Raised while resolving or compiling a pipeline, before
/// anything reaches the downstream PRQL compiler.
#[derive(Debug, Clone)]
pub struct Error {
    pub reason: Reason,
    pub hints: Vec<String>,
}

/// Multiple pipelinec errors, as collected by validation.
#[derive(Debug, Clone)]
pub struct Errors(pub Vec<Error>);

#[derive(Debug, Clone)]
pub enum Reason {
    Simple(String),
    /// A lookup by id failed. `namespace` names what was looked up, such as
    /// `table` or `relation`.
    NotFound {
        name: String,
        namespace: String,
    },
    Unexpected {
        found: String,
    },
    Bug {
        details: Option<String>,
    },
}

impl Error {
    pub fn new(reason: Reason) -> Self {
        Error {
            reason,
            hints: Vec::new(),
        }
    }

    pub fn new_simple<S: ToString>(reason: S) -> Self {
        Error::new(Reason::Simple(reason.to_string()))
    }

    pub fn new_not_found<N: ToString, S: ToString>(namespace: N, name: S) -> Self {
        Error::new(Reason::NotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
    }

    /// Used for things that you *think* should never happen, but are not sure.
    pub fn new_assert<S: ToString>(details: S) -> Self {
        Error::new(Reason::Bug {
            details: Some(details.to_string()),
        })
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::Simple(text) => f.write_str(text),
            Reason::NotFound { name, namespace } => write!(f, "{namespace} `{name}` not found"),
            Reason::Unexpected { found } => write!(f, "unexpected {found}"),
            Reason::Bug { details } => {
                write!(f, "internal compiler error")?;
                if let Some(details) = details {
                    write!(f, "; {details}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Errors(vec![error])
    }
}

impl std::error::Error for Error {}

impl std::error::Error for Errors {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error: {}", self.reason)?;
        for hint in &self.hints {
            write!(f, "\n↳ Hint: {hint}")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            std::fmt::Display::fmt(error, f)?;
        }
        Ok(())
    }
}

pub trait WithErrorInfo: Sized {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self;

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self;
}

impl WithErrorInfo for Error {
    fn push_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.hints.push(hint.into());
        self
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(mut self, hints: I) -> Self {
        self.hints = hints.into_iter().map(|x| x.into()).collect();
        self
    }
}

impl<T, E: WithErrorInfo> WithErrorInfo for Result<T, E> {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self {
        self.map_err(|e| e.push_hint(hint))
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self {
        self.map_err(|e| e.with_hints(hints))
    }
}
