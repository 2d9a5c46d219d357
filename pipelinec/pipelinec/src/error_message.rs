use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

use prqlc::{ErrorMessage, ErrorMessages, MessageKind};

use pipelinec_ast::{Error, Errors};

/// Failure of a whole compilation.
#[derive(Debug, Clone)]
pub enum CompileError {
    /// The pipeline could not be turned into a script.
    Pipeline(Error),
    /// The downstream compiler rejected the script. Diagnostics are kept as
    /// they were reported.
    Script(ErrorMessages),
}

impl CompileError {
    /// All diagnostics of this failure, in the shape the downstream compiler
    /// reports them, so callers can render both kinds the same way.
    pub fn into_messages(self) -> ErrorMessages {
        match self {
            CompileError::Pipeline(e) => ErrorMessages {
                inner: vec![to_message(e)],
            },
            CompileError::Script(messages) => messages,
        }
    }
}

/// Validation errors as downstream diagnostics, one per issue.
pub fn to_messages(errors: Errors) -> ErrorMessages {
    ErrorMessages {
        inner: errors.0.into_iter().map(to_message).collect(),
    }
}

fn to_message(e: Error) -> ErrorMessage {
    log::debug!("{:#?}", e);
    ErrorMessage {
        kind: MessageKind::Error,
        code: None,
        reason: e.reason.to_string(),
        hints: e.hints,
        span: None,
        display: None,
        location: None,
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Pipeline(e) => Display::fmt(e, f),
            CompileError::Script(messages) => Display::fmt(messages, f),
        }
    }
}

impl StdError for CompileError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CompileError::Pipeline(e) => Some(e),
            CompileError::Script(messages) => Some(messages),
        }
    }
}

impl From<Error> for CompileError {
    fn from(e: Error) -> Self {
        CompileError::Pipeline(e)
    }
}

impl From<ErrorMessages> for CompileError {
    fn from(messages: ErrorMessages) -> Self {
        CompileError::Script(messages)
    }
}
