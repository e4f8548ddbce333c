//! Fault types: unrecoverable errors that abort an operation (§7).
//!
//! Faults are distinct from [`crate::report::Message`]s: a fault means the
//! engine could not complete at all, whereas a report is a diagnostic
//! collected while traversal continues.
use std::{error, fmt};

/// An unrecoverable error, returned instead of a result.
#[derive(Debug)]
pub struct ValidationFault {
    kind: FaultKind,
}

impl ValidationFault {
    #[must_use]
    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    pub(crate) fn new(kind: FaultKind) -> Self {
        ValidationFault { kind }
    }
}

/// The specific kind of fault that occurred.
#[derive(Debug)]
#[allow(missing_docs)]
pub enum FaultKind {
    /// The JSON text handed to `validate_from_str` did not parse.
    Parse { error: serde_json::Error },
    /// A path string did not conform to the grammar of §6.4.
    PathSyntax { path: String, reason: &'static str },
    /// An `ERedirect` referenced an identifier with no registered target.
    UnknownIdentifier { id: String },
    /// An identifier was registered more than once.
    DuplicateIdentifier { id: String },
    /// Recursion nested past the configured maximum depth (§5).
    DepthExceeded { limit: usize },
    /// An `ERedirect` chain looped back to an identifier already visited
    /// while resolving it, instead of bottoming out in a concrete node.
    RedirectCycle { id: String },
}

impl fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FaultKind::Parse { error } => write!(f, "failed to parse JSON input: {error}"),
            FaultKind::PathSyntax { path, reason } => {
                write!(f, "invalid path '{path}': {reason}")
            }
            FaultKind::UnknownIdentifier { id } => {
                write!(f, "redirect to unknown identifier '{id}'")
            }
            FaultKind::DuplicateIdentifier { id } => {
                write!(f, "identifier '{id}' registered more than once")
            }
            FaultKind::DepthExceeded { limit } => {
                write!(f, "recursion depth exceeded the configured limit of {limit}")
            }
            FaultKind::RedirectCycle { id } => {
                write!(f, "redirect chain cycles back to already-visited identifier '{id}'")
            }
        }
    }
}

impl error::Error for ValidationFault {}

impl From<serde_json::Error> for ValidationFault {
    fn from(error: serde_json::Error) -> Self {
        ValidationFault::new(FaultKind::Parse { error })
    }
}
