//! The error type wrapping compiler diagnostics.

use thiserror::Error;

use crate::error::{Diagnostic, ErrorKind};

/// A type alias for `Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Error type for the compile lifecycle.
///
/// Wraps one or more diagnostics. The lexer reports every lexical error of a
/// file at once; later phases stop at the first error.
#[derive(Debug, Error)]
#[error("{}", summarize(.diagnostics))]
pub struct DiagnosticError {
    diagnostics: Vec<Diagnostic>,
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => String::new(),
        [first] => first.to_string(),
        [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
    }
}

impl DiagnosticError {
    /// Create a new error from diagnostics.
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Get all diagnostics in this error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The category of the first error-level diagnostic.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity().is_error())
            .find_map(|diag| diag.code())
            .map(|code| code.kind())
    }
}

impl From<Diagnostic> for DiagnosticError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for DiagnosticError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}
