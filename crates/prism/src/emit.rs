//! Emission of compiled DTO types.
//!
//! This module provides the [`Emitter`] trait, the final stage of the Prism
//! pipeline, and [`RustEmitter`], the bundled backend writing Rust structs.
//!
//! # Pipeline Position
//!
//! ```text
//! DTO Source Text
//!     ↓ parse
//! DtoFile (per source)
//!     ↓ barrier, expand, resolve
//! DtoType graph (grouped by entity)
//!     ↓ emit (this module)
//! Output Files
//! ```

use std::{
    collections::{BTreeSet, HashSet},
    fs,
    path::{Path, PathBuf},
};

use convert_case::{Case, Casing};
use log::{debug, trace};
use thiserror::Error;

use prism_core::{
    dto::{DtoKind, DtoProperty, DtoType, PropertyTarget, TypeRef, UserProperty},
    identifier::Id,
    schema::{EntitySchema, PropertyKind},
};

/// Abstraction for code generation backends.
pub trait Emitter {
    /// Generates the artifacts of one top-level DTO type.
    ///
    /// # Arguments
    ///
    /// * `dto` - The resolved DTO type, nested types included.
    /// * `entity` - Full schema of the entity the DTO projects.
    /// * `mutable` - Effective mutability of the DTO type.
    /// * `docs` - Every source file of the run, for documentation lookup.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Collision`] if the output path was already
    /// written in this run, or [`EmitError::Io`] if writing fails.
    fn generate(
        &mut self,
        dto: &DtoType,
        entity: &EntitySchema,
        mutable: bool,
        docs: &DocContext,
    ) -> Result<(), EmitError>;
}

/// Errors that can occur while emitting DTO types.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to write \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("\"{}\" would be written twice in one run", path.display())]
    Collision { path: PathBuf },

    #[error("entity `{0}` disappeared from the schema")]
    UnknownEntity(Id),
}

/// The source files of a run, handed to every [`Emitter::generate`] call.
#[derive(Debug, Clone, Default)]
pub struct DocContext {
    files: Vec<PathBuf>,
}

impl DocContext {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Module generated code imports entity types from unless configured.
pub const DEFAULT_ENTITY_MODULE: &str = "crate::entities";

/// Writes one `<snake_case_name>.rs` file per top-level DTO type.
#[derive(Debug)]
pub struct RustEmitter {
    directory: PathBuf,
    entity_module: String,
    written: HashSet<PathBuf>,
}

impl RustEmitter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            entity_module: DEFAULT_ENTITY_MODULE.to_string(),
            written: HashSet::new(),
        }
    }

    /// Import entity and embeddable types from `module` instead of
    /// [`DEFAULT_ENTITY_MODULE`].
    pub fn with_entity_module(mut self, module: impl Into<String>) -> Self {
        self.entity_module = module.into();
        self
    }

    /// Paths written so far.
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.written.iter().map(PathBuf::as_path)
    }

    /// The file a DTO type is written to.
    pub fn path_of(&self, dto: &DtoType) -> PathBuf {
        let file = dto.name().to_string().to_case(Case::Snake);
        self.directory.join(format!("{file}.rs"))
    }
}

impl Emitter for RustEmitter {
    fn generate(
        &mut self,
        dto: &DtoType,
        entity: &EntitySchema,
        mutable: bool,
        docs: &DocContext,
    ) -> Result<(), EmitError> {
        let path = self.path_of(dto);
        if !self.written.insert(path.clone()) {
            return Err(EmitError::Collision { path });
        }

        let source = render(dto, entity, mutable, &self.entity_module);
        trace!(dto:% = dto.name(), sources = docs.files().len(); "Rendered DTO type");

        fs::create_dir_all(&self.directory).map_err(|source| EmitError::Io {
            path: self.directory.clone(),
            source,
        })?;
        fs::write(&path, source).map_err(|source| EmitError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(dto:% = dto.name(), path:? = path; "Wrote DTO type");
        Ok(())
    }
}

/// Render a DTO type and its nested types as Rust source.
///
/// Entity and embeddable types the fields refer to are imported from
/// `entity_module`.
pub fn render(dto: &DtoType, entity: &EntitySchema, mutable: bool, entity_module: &str) -> String {
    let mut body = String::new();
    let mut scopes = Vec::new();
    render_type(&mut body, dto, dto.name().to_string(), mutable, &mut scopes);

    let mut out = format!(
        "// Generated by prism from `{}`. Do not edit.\n",
        entity.name()
    );
    let mut imports = BTreeSet::new();
    collect_imports(dto, &mut imports);
    if !imports.is_empty() {
        let names: Vec<String> = imports.into_iter().collect();
        let list = match names.as_slice() {
            [single] => single.clone(),
            _ => format!("{{{}}}", names.join(", ")),
        };
        out.push_str(&format!("\nuse {entity_module}::{list};\n"));
    }
    out.push_str(&body);
    out
}

/// Simple names of the entity and embeddable types `dto` refers to.
fn collect_imports(dto: &DtoType, imports: &mut BTreeSet<String>) {
    for property in dto.properties() {
        match property.target() {
            PropertyTarget::Entity { entity } => {
                imports.insert(entity.simple_name());
            }
            PropertyTarget::Nested(nested) => collect_imports(nested, imports),
            PropertyTarget::Value => {
                if let Some(embedded) = embedded_type(property) {
                    imports.insert(embedded.simple_name());
                }
            }
            PropertyTarget::IdOnly { .. } | PropertyTarget::Recursive { .. } => {}
        }
    }
}

fn embedded_type(property: &DtoProperty) -> Option<Id> {
    match property.kind() {
        PropertyKind::Scalar { embedded } => *embedded,
        _ => None,
    }
}

/// Enclosing DTO types: source name and emitted name.
type Scopes = Vec<(Id, String)>;

/// One emitted struct field.
struct Field {
    name: String,
    ty: String,
    doc: Option<String>,
}

fn render_type(out: &mut String, dto: &DtoType, rust_name: String, mutable: bool, scopes: &mut Scopes) {
    scopes.push((dto.name(), rust_name.clone()));

    let mut nested = Vec::new();
    let mut fields: Vec<Field> = dto
        .properties()
        .iter()
        .map(|property| Field {
            name: field_ident(&property.name().to_string()),
            ty: field_type(property, &rust_name, scopes, &mut nested),
            doc: None,
        })
        .collect();
    fields.extend(dto.user_properties().iter().map(user_field));

    out.push('\n');
    out.push_str(&format!("/// {} of `{}`.\n", describe(dto.modifiers().kind()), dto.entity()));
    out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    out.push_str(&format!("pub struct {rust_name} {{\n"));
    let visibility = if mutable { "pub " } else { "" };
    for field in &fields {
        if let Some(doc) = &field.doc {
            out.push_str(&format!("    /// {doc}\n"));
        }
        out.push_str(&format!("    {visibility}{}: {},\n", field.name, field.ty));
    }
    out.push_str("}\n");

    if !mutable {
        render_accessors(out, &rust_name, &fields);
    }

    for (nested_dto, nested_name) in nested {
        render_type(out, nested_dto, nested_name, mutable, scopes);
    }
    scopes.pop();
}

fn render_accessors(out: &mut String, rust_name: &str, fields: &[Field]) {
    let params: Vec<String> = fields.iter().map(|f| format!("{}: {}", f.name, f.ty)).collect();
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();

    out.push_str(&format!("\nimpl {rust_name} {{\n"));
    out.push_str("    #[allow(clippy::too_many_arguments)]\n");
    out.push_str(&format!("    pub fn new({}) -> Self {{\n", params.join(", ")));
    out.push_str(&format!("        Self {{ {} }}\n", names.join(", ")));
    out.push_str("    }\n");
    for Field { name, ty, .. } in fields {
        out.push_str(&format!("\n    pub fn {name}(&self) -> &{ty} {{\n        &self.{name}\n    }}\n"));
    }
    out.push_str("}\n");
}

/// Words that cannot name a field as written.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn", "else",
    "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
    "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static", "struct", "trait",
    "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// The snake_case field identifier of a property name.
///
/// Keywords become raw identifiers; `self`, `super` and `crate` cannot, so
/// they get a trailing underscore.
fn field_ident(name: &str) -> String {
    let snake = name.to_case(Case::Snake);
    match snake.as_str() {
        "self" | "super" | "crate" => format!("{snake}_"),
        word if RUST_KEYWORDS.contains(&word) => format!("r#{snake}"),
        _ => snake,
    }
}

fn user_field(property: &UserProperty) -> Field {
    Field {
        name: field_ident(&property.name().to_string()),
        ty: user_type(property.type_ref(), property.is_nullable()),
        doc: property.default().map(|default| format!("Defaults to `{default}`.")),
    }
}

/// Map a type written in DTO source to a Rust type.
fn user_type(type_ref: &TypeRef, nullable: bool) -> String {
    let arguments: Vec<String> = type_ref
        .arguments()
        .iter()
        .map(|argument| user_type(argument, argument.is_nullable()))
        .collect();
    let simple = type_ref.name().simple_name();
    let base = match (simple.as_str(), arguments.as_slice()) {
        ("List" | "MutableList" | "Set" | "MutableSet" | "Collection" | "Iterable", [element]) => {
            format!("Vec<{element}>")
        }
        ("Map" | "MutableMap", [key, value]) => format!("std::collections::HashMap<{key}, {value}>"),
        (_, []) => rust_type(&simple),
        (_, arguments) => format!("{}<{}>", rust_type(&simple), arguments.join(", ")),
    };
    if nullable { format!("Option<{base}>") } else { base }
}

fn describe(kind: DtoKind) -> &'static str {
    match kind {
        DtoKind::View => "View",
        DtoKind::Input => "Input",
        DtoKind::Specification => "Specification",
    }
}

fn field_type<'d>(
    property: &'d DtoProperty,
    parent: &str,
    scopes: &Scopes,
    nested: &mut Vec<(&'d DtoType, String)>,
) -> String {
    let many = property.is_many();
    let base = match property.target() {
        PropertyTarget::Value => match embedded_type(property) {
            Some(embedded) => embedded.simple_name(),
            None => rust_type(property.type_name()),
        },
        PropertyTarget::Entity { entity } => collection(entity.simple_name(), many),
        PropertyTarget::IdOnly { id_type } => collection(rust_type(id_type), many),
        PropertyTarget::Nested(dto) => {
            let name = format!("{parent}{}", dto.name().to_string().to_case(Case::Pascal));
            nested.push((dto.as_ref(), name.clone()));
            collection(name, many)
        }
        PropertyTarget::Recursive { type_name } => {
            let name = scopes
                .iter()
                .rev()
                .find(|(id, _)| id == type_name)
                .map(|(_, name)| name.clone())
                .unwrap_or_else(|| type_name.to_string());
            if many {
                format!("Vec<{name}>")
            } else {
                format!("Box<{name}>")
            }
        }
    };
    if property.is_nullable() {
        format!("Option<{base}>")
    } else {
        base
    }
}

fn collection(element: String, many: bool) -> String {
    if many { format!("Vec<{element}>") } else { element }
}

/// Map a declared schema type to a Rust type.
fn rust_type(declared: &str) -> String {
    let declared = declared.trim();
    for wrapper in ["List<", "Set<", "Collection<"] {
        if let Some(inner) = declared.strip_prefix(wrapper).and_then(|rest| rest.strip_suffix('>')) {
            return format!("Vec<{}>", rust_type(inner));
        }
    }
    let simple = declared.rsplit('.').next().unwrap_or(declared);
    match simple {
        "Long" | "long" => "i64",
        "Integer" | "int" => "i32",
        "Short" | "short" => "i16",
        "Byte" | "byte" => "i8",
        "Boolean" | "boolean" => "bool",
        "Double" | "double" => "f64",
        "Float" | "float" => "f32",
        "Character" | "char" => "char",
        "String" => "String",
        "Int" => "i32",
        "Char" => "char",
        other => other,
    }
    .to_string()
}
