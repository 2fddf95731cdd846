//! Error and diagnostic system for the DTO compiler front end.
//!
//! Every failure of lexing, parsing, macro expansion or resolution is
//! reported as a [`Diagnostic`]: a message with an [`ErrorCode`], labelled
//! source spans and optional help text. One or more diagnostics are returned
//! together as a [`DiagnosticError`].
//!
//! Each code belongs to exactly one [`ErrorKind`], the user-facing category
//! of the failure.
//!
//! # Example
//!
//! ```
//! # use prism_parser::error::{Diagnostic, ErrorCode, ErrorKind};
//! # use prism_parser::Span;
//!
//! let diag = Diagnostic::error("property `name` is selected more than once")
//!     .with_code(ErrorCode::E301)
//!     .with_label(Span::new(40..44), "duplicate selection")
//!     .with_secondary_label(Span::new(12..16), "first selected here")
//!     .with_help("remove one of the selections or give it an alias");
//!
//! assert_eq!(diag.code().map(|c| c.kind()), Some(ErrorKind::DuplicateProperty));
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;
pub(crate) use parse_error::Result;

pub use diagnostic::Diagnostic;
pub use error_code::{ErrorCode, ErrorKind};
pub use label::Label;
pub use parse_error::DiagnosticError;
pub use severity::Severity;
