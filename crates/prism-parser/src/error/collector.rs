//! Collector for accumulating diagnostics during a processing phase.

use crate::error::{Diagnostic, DiagnosticError};

/// A collector for accumulating diagnostics during a processing phase.
///
/// The lexer uses it to report every lexical error of a file in one pass
/// instead of stopping at the first one.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic to this collector.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Finish collection and return a result.
    ///
    /// Warnings are discarded in the success case.
    pub fn finish(self) -> Result<(), DiagnosticError> {
        if self.has_errors {
            Err(DiagnosticError::new(self.diagnostics))
        } else {
            Ok(())
        }
    }
}
