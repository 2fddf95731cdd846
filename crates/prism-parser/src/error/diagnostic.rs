//! The core diagnostic type.

use std::fmt;

use crate::{
    error::{Severity, error_code::ErrorCode, label::Label},
    span::Span,
};

/// A rich diagnostic message with source location information.
///
/// # Example
///
/// ```text
/// error[E202]: cannot flatten `employees`
///   --> hr/Department.dto:3:10
///    |
///  3 |     flat(employees) { #allScalars }
///    |          ^^^^^^^^^ to-many association
///    |
///    = help: flattening requires a single-valued association or an embedded value
/// ```
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use prism_parser::error::{Diagnostic, ErrorCode};
    /// # use prism_parser::Span;
    ///
    /// let diag = Diagnostic::error("property `nmae` does not exist")
    ///     .with_code(ErrorCode::E300)
    ///     .with_label(Span::new(0..4), "not found")
    ///     .with_help("did you mean `name`?");
    /// ```
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get all labels attached to this diagnostic.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Append context to the primary message, e.g. the enclosing declaration.
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{} {context}", self.message);
        self
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "error[E001]: message" or "error: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_new() {
        let diag = Diagnostic::new(Severity::Error, "test error");

        assert!(diag.severity().is_error());
        assert_eq!(diag.message(), "test error");
        assert!(diag.code().is_none());
        assert!(diag.labels().is_empty());
        assert!(diag.help().is_none());
    }

    #[test]
    fn test_diagnostic_builder_chain() {
        let diag = Diagnostic::error("property `name` is selected more than once")
            .with_code(ErrorCode::E301)
            .with_label(Span::new(100..104), "duplicate selection")
            .with_secondary_label(Span::new(50..54), "first selected here")
            .with_help("remove one of the selections");

        assert_eq!(diag.code(), Some(ErrorCode::E301));
        assert_eq!(diag.labels().len(), 2);
        assert!(diag.labels()[0].is_primary());
        assert!(diag.labels()[1].is_secondary());
        assert_eq!(diag.help(), Some("remove one of the selections"));
    }

    #[test]
    fn test_diagnostic_with_context() {
        let diag = Diagnostic::error("unexpected token: expected `}`")
            .with_context("in declaration `DepartmentView`");

        assert_eq!(
            diag.message(),
            "unexpected token: expected `}` in declaration `DepartmentView`"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let with_code = Diagnostic::error("unknown macro `#all`").with_code(ErrorCode::E200);
        let without_code = Diagnostic::warning("unused modifier");

        assert_eq!(with_code.to_string(), "error[E200]: unknown macro `#all`");
        assert_eq!(without_code.to_string(), "warning: unused modifier");
    }
}
