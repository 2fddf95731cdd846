//! # Prism Parser
//!
//! Front end of the Prism DTO compiler. This crate turns DTO source text into
//! a syntax tree, and a syntax tree into resolved [`DtoType`]s once the
//! schema has passed its resolution barrier.
//!
//! The two steps are kept apart so a driver can parse every file before the
//! schema is final: [`parse`] needs no schema at all, and [`compile`] only
//! accepts a [`ResolvedSchema`].
//!
//! ## Usage
//!
//! ```
//! # use prism_core::schema::{EntitySchema, PropertyMeta, SchemaBarrier, SchemaMarker, SchemaRegistry};
//! # use prism_core::identifier::Id;
//! # use prism_parser::{compile, parse, CompileConfig};
//! let mut registry = SchemaRegistry::new();
//! registry.register(EntitySchema::new(
//!     Id::new("hr.Department"),
//!     SchemaMarker::Entity,
//!     vec![PropertyMeta::id("id", "Long"), PropertyMeta::scalar("name", "String")],
//! )?)?;
//!
//! let file = parse("export hr.Department\nDepartmentView { #allScalars }")?;
//! let schema = SchemaBarrier::new(&mut registry).resolve()?;
//! let types = compile(&file, &schema, &CompileConfig::default())?;
//!
//! assert_eq!(types[0].property_names(), vec!["id", "name"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
mod expand;
mod lexer;
mod parser;
mod parser_types;
mod resolve;
mod span;
mod tokens;

use std::collections::HashMap;

use log::{debug, info};

pub use error::DiagnosticError;
pub use parser_types::{
    AliasGroupItem, AliasPattern, Annotation, Body, Declaration, DtoFile, FlattenItem, IdOnlyItem,
    Item, MacroItem, Modifier, PropertyItem, UserPropItem,
};
pub use resolve::CompileConfig;
pub use span::{Span, Spanned};

use prism_core::{
    dto::DtoType,
    identifier::Id,
    schema::{ResolvedSchema, SchemaProvider},
};

use error::{Diagnostic, ErrorCode};
use expand::Expander;
use resolve::Resolver;

/// Parse DTO source text into a [`DtoFile`].
///
/// Parsing is a pure function of the text: no schema lookups happen here, so
/// the driver can parse every file before the schema is finalized.
///
/// # Errors
///
/// Returns every lexical error of the file at once, or the first syntax
/// error.
pub fn parse(source: &str) -> Result<DtoFile, DiagnosticError> {
    let tokens = lexer::tokenize(source)?;
    let file = parser::build_file(&tokens)?;
    debug!(
        entity:% = file.entity,
        declarations = file.declarations.len();
        "Parsed DTO file"
    );
    Ok(file)
}

/// Compile every declaration of `file` against the resolved schema.
///
/// Declarations are expanded and resolved in source order; the first error
/// aborts the file.
pub fn compile<P: SchemaProvider + ?Sized>(
    file: &DtoFile,
    schema: &ResolvedSchema<'_, P>,
    config: &CompileConfig,
) -> Result<Vec<DtoType>, DiagnosticError> {
    let entity = *file.entity.inner();
    if schema.entity(entity).is_none() {
        return Err(Diagnostic::error(format!("unknown entity `{entity}`"))
            .with_code(ErrorCode::E308)
            .with_label(file.entity.span(), "not found in the schema")
            .into());
    }

    let mut seen: HashMap<Id, Span> = HashMap::new();
    for declaration in &file.declarations {
        if let Some(first) = seen.insert(*declaration.name.inner(), declaration.name.span()) {
            return Err(Diagnostic::error(format!(
                "DTO type `{}` is declared more than once",
                declaration.name
            ))
            .with_code(ErrorCode::E205)
            .with_label(declaration.name.span(), "declared again")
            .with_secondary_label(first, "first declared here")
            .into());
        }
    }

    let expander = Expander::new(schema);
    let resolver = Resolver::new(schema, config);
    let mut types = Vec::with_capacity(file.declarations.len());
    for declaration in &file.declarations {
        let name = *declaration.name.inner();
        let in_declaration =
            |diagnostic: Diagnostic| diagnostic.with_context(format!("in declaration `{name}`"));

        let body = expander
            .expand(&declaration.body, entity, name)
            .map_err(in_declaration)?;
        let dto = resolver
            .resolve(declaration, &file.modifiers, &body)
            .map_err(in_declaration)?;
        types.push(dto);
    }

    info!(entity:% = entity, types = types.len(); "Compiled DTO file");
    Ok(types)
}
