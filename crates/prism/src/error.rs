//! Error types for Prism operations.
//!
//! This module provides the main error type [`PrismError`]. Every error that
//! concerns one DTO source carries the file's path, and its message starts
//! with `Failed to parse "<path>"` (or `Failed to read "<path>"`), so the
//! first line of any report names the file to fix.

use std::{io, path::PathBuf};

use thiserror::Error;

use prism_core::{
    identifier::Id,
    schema::{SchemaError, SchemaMarker},
};
use prism_parser::DiagnosticError;

use crate::{catalog::CatalogError, emit::EmitError};

/// The main error type for Prism operations.
///
/// # Diagnostic Variants
///
/// The `Parse` and `Compile` variants carry structured diagnostics with
/// source spans, together with the source text, so callers can render rich
/// reports.
#[derive(Debug, Error)]
pub enum PrismError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read \"{}\": {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse \"{}\": {err}", path.display())]
    Parse {
        path: PathBuf,
        err: DiagnosticError,
        src: String,
    },

    #[error("Failed to parse \"{}\": {err}", path.display())]
    Compile {
        path: PathBuf,
        err: DiagnosticError,
        src: String,
    },

    #[error("Failed to parse \"{}\": entity `{entity}` does not exist in the schema", path.display())]
    UnknownEntity { path: PathBuf, entity: Id },

    #[error(
        "Failed to parse \"{}\": entity `{entity}` is not marked as {}",
        path.display(),
        accepted_markers()
    )]
    IneligibleEntity { path: PathBuf, entity: Id },

    #[error("Schema error: {0}")]
    Schema(#[from] CatalogError),

    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// "Entity, Embeddable or Immutable"
fn accepted_markers() -> String {
    let names: Vec<String> = SchemaMarker::RECOGNIZED
        .iter()
        .map(|marker| marker.to_string())
        .collect();
    match names.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        _ => names.join(""),
    }
}

impl From<SchemaError> for PrismError {
    fn from(error: SchemaError) -> Self {
        Self::Schema(CatalogError::from(error))
    }
}

impl PrismError {
    /// The diagnostics and source text of a `Parse` or `Compile` error.
    pub fn diagnostics(&self) -> Option<(&DiagnosticError, &str)> {
        match self {
            Self::Parse { err, src, .. } | Self::Compile { err, src, .. } => Some((err, src)),
            _ => None,
        }
    }

    /// The DTO source file this error is about, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::Compile { path, .. }
            | Self::UnknownEntity { path, .. }
            | Self::IneligibleEntity { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ineligible_entity_message() {
        let err = PrismError::IneligibleEntity {
            path: PathBuf::from("dto/Thing.dto"),
            entity: Id::new("com.example.Thing"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse \"dto/Thing.dto\": entity `com.example.Thing` is not marked as Entity, Embeddable or Immutable"
        );
        assert_eq!(err.path(), Some(&PathBuf::from("dto/Thing.dto")));
    }

    #[test]
    fn test_unknown_entity_message() {
        let err = PrismError::UnknownEntity {
            path: PathBuf::from("Missing.dto"),
            entity: Id::new("hr.Missing"),
        };
        assert!(err.to_string().starts_with("Failed to parse \"Missing.dto\""));
        assert!(err.diagnostics().is_none());
    }
}
