//! Error adapter for converting PrismError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When a [`prism_parser::DiagnosticError`] contains multiple diagnostics,
//! each diagnostic is rendered independently, prefixed with the file it
//! belongs to.

use std::{fmt, path::Path};

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use prism::PrismError;
use prism_parser::error::Diagnostic;

/// Adapter for a single compiler diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    /// Source code for displaying snippets
    src: &'a str,
    path: Option<&'a Path>,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src, path: None }
    }

    /// Attribute the diagnostic to the DTO source at `path`.
    pub fn with_path(mut self, path: &'a Path) -> Self {
        self.path = Some(path);
        self
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .field("path", &self.path)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path {
            Some(path) => write!(f, "Failed to parse \"{}\": {}", path.display(), self.diag.message()),
            None => write!(f, "{}", self.diag.message()),
        }
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for [`PrismError`] variants without source diagnostics.
pub struct ErrorAdapter<'a>(pub &'a PrismError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            PrismError::Io(_) => "prism::io",
            PrismError::Read { .. } => "prism::read",
            PrismError::Parse { .. } | PrismError::Compile { .. } => return None,
            PrismError::UnknownEntity { .. } => "prism::unknown_entity",
            PrismError::IneligibleEntity { .. } => "prism::ineligible_entity",
            PrismError::Schema(_) => "prism::schema",
            PrismError::Emit(_) => "prism::emit",
            PrismError::Config(_) => "prism::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            PrismError::UnknownEntity { .. } => "check the `export` statement against the schema catalog",
            PrismError::IneligibleEntity { .. } => "give the entity a `marker` in the schema catalog",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A rich diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a prism [`Span`](prism_parser::Span) to a miette [`SourceSpan`].
fn span_to_miette(span: prism_parser::Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`PrismError`] into a list of reportable errors.
///
/// `Parse` and `Compile` errors yield one [`Reportable`] per diagnostic;
/// every other variant yields a single one.
pub fn to_reportables(err: &PrismError) -> Vec<Reportable<'_>> {
    match (err.diagnostics(), err.path()) {
        (Some((diagnostics, src)), Some(path)) => diagnostics
            .diagnostics()
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, src).with_path(path)))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use prism::identifier::Id;
    use prism_parser::{
        DiagnosticError, Span,
        error::ErrorCode,
    };

    use super::*;

    fn compile_error(diagnostics: Vec<Diagnostic>) -> PrismError {
        PrismError::Compile {
            path: PathBuf::from("dto/Department.dto"),
            err: DiagnosticError::from(diagnostics),
            src: "export hr.Department\nView { budget, id, id }".to_string(),
        }
    }

    #[test]
    fn test_single_diagnostic() {
        let diag = Diagnostic::error("`hr.Department` has no property `budget`")
            .with_code(ErrorCode::E300)
            .with_label(Span::new(28..34), "unknown property")
            .with_help("available properties: id, name");
        let err = compile_error(vec![diag]);

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);

        match &reportables[0] {
            Reportable::Diagnostic(d) => {
                assert_eq!(
                    d.to_string(),
                    "Failed to parse \"dto/Department.dto\": `hr.Department` has no property `budget`"
                );
                assert_eq!(d.code().map(|c| c.to_string()), Some("E300".to_string()));
            }
            Reportable::Error(_) => panic!("Expected Diagnostic"),
        }
    }

    #[test]
    fn test_multiple_diagnostics() {
        let err = compile_error(vec![
            Diagnostic::error("first error").with_label(Span::new(0..6), "first"),
            Diagnostic::error("second error").with_label(Span::new(7..9), "second"),
        ]);

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 2);
        assert!(reportables[1].to_string().ends_with("second error"));
    }

    #[test]
    fn test_non_diagnostic_error() {
        let err = PrismError::IneligibleEntity {
            path: PathBuf::from("Draft.dto"),
            entity: Id::new("hr.Draft"),
        };

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert!(e.to_string().contains("Entity, Embeddable or Immutable"));
                assert_eq!(
                    e.code().map(|c| c.to_string()),
                    Some("prism::ineligible_entity".to_string())
                );
                assert!(e.help().is_some());
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_all_labels_returned() {
        let diag = Diagnostic::error("property `id` is selected more than once")
            .with_label(Span::new(40..42), "selected again")
            .with_secondary_label(Span::new(36..38), "first selected here");

        let adapter = DiagnosticAdapter::new(&diag, "export hr.Department\nView { budget, id, id }");

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label(), Some("selected again"));
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
    }
}
