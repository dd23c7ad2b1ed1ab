use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can fail with an interpreter error.
pub(crate) type EvalResult<T> = Result<T, Error>;

/// The three user-visible error categories.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `SyntaxError` -> "SyntaxError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input at the lexical or syntactic level: unexpected
    /// characters, unmatched brackets, misplaced dots, trailing tokens, or a
    /// malformed special-form shape.
    SyntaxError,
    /// Lookup or assignment against an identifier that is not bound anywhere
    /// in the visible environment chain.
    NameError,
    /// A semantic precondition failure at run time: type violations, arity
    /// mismatches, empty applications, out-of-range list indices, division
    /// by zero.
    RuntimeError,
}

/// An error surfaced to the host.
///
/// Fatal to the current top-level call; the session itself stays intact and
/// the next call starts fresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::SyntaxError,
            message: message.into(),
        }
    }

    pub(crate) fn name(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NameError,
            message: message.into(),
        }
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::RuntimeError,
            message: message.into(),
        }
    }

    /// The error's category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message, without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}
