//! The resolved DTO model.
//!
//! These types are the output of compilation: fully-resolved DTO types with
//! every property bound to entity metadata, nullability decided and nested
//! shapes materialized. Emitters consume them without consulting the schema
//! again.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{identifier::Id, schema::PropertyKind};

/// What a DTO type is used for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DtoKind {
    /// An output projection of an entity.
    #[default]
    View,
    /// A write-side payload converted back into an entity.
    Input,
    /// A query specification.
    Specification,
}

impl fmt::Display for DtoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DtoKind::View => "view",
            DtoKind::Input => "input",
            DtoKind::Specification => "specification",
        };
        f.write_str(s)
    }
}

/// How an input DTO represents nullable properties.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NullableInputStrategy {
    /// Nullable properties must be present, possibly as null.
    Fixed,
    /// Absent and null are the same.
    #[default]
    Static,
    /// Absent and null are distinguished at runtime.
    Dynamic,
    /// Absent and null are distinguished, null is treated as absent.
    Fuzzy,
}

impl FromStr for NullableInputStrategy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            "fuzzy" => Ok(Self::Fuzzy),
            _ => Err("Unsupported nullable input strategy"),
        }
    }
}

impl fmt::Display for NullableInputStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NullableInputStrategy::Fixed => "fixed",
            NullableInputStrategy::Static => "static",
            NullableInputStrategy::Dynamic => "dynamic",
            NullableInputStrategy::Fuzzy => "fuzzy",
        };
        f.write_str(s)
    }
}

/// Resolved modifiers of a DTO type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DtoModifiers {
    kind: DtoKind,
    nullable_input: NullableInputStrategy,
    include_deleted: bool,
}

impl DtoModifiers {
    pub fn new(kind: DtoKind, nullable_input: NullableInputStrategy, include_deleted: bool) -> Self {
        Self {
            kind,
            nullable_input,
            include_deleted,
        }
    }

    pub fn kind(&self) -> DtoKind {
        self.kind
    }

    /// The nullable-input stance. Only meaningful for input DTOs.
    pub fn nullable_input(&self) -> NullableInputStrategy {
        self.nullable_input
    }

    /// Whether logically-deleted rows are included.
    pub fn include_deleted(&self) -> bool {
        self.include_deleted
    }

    pub fn is_input(&self) -> bool {
        self.kind == DtoKind::Input
    }
}

/// Mutability requested by a DTO's annotations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    Immutable,
    Mutable,
    /// No mutability annotation, or one that names neither option.
    #[default]
    Unspecified,
}

impl Mutability {
    /// The effective mutability flag, falling back to `default` when
    /// unspecified.
    ///
    /// ```
    /// use prism_core::dto::Mutability;
    ///
    /// assert!(Mutability::Mutable.resolve(false));
    /// assert!(!Mutability::Immutable.resolve(true));
    /// assert!(Mutability::Unspecified.resolve(true));
    /// ```
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Mutability::Immutable => false,
            Mutability::Mutable => true,
            Mutability::Unspecified => default,
        }
    }
}

/// A literal annotation argument.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// A possibly qualified enum constant, such as `Immutability.MUTABLE`.
    EnumConstant(Id),
    List(Vec<AnnotationValue>),
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::String(value) => write!(f, "{value:?}"),
            AnnotationValue::Integer(value) => write!(f, "{value}"),
            AnnotationValue::Float(value) => write!(f, "{value}"),
            AnnotationValue::Boolean(value) => write!(f, "{value}"),
            AnnotationValue::EnumConstant(value) => write!(f, "{value}"),
            AnnotationValue::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// An annotation attached to a DTO type.
#[derive(Debug, Clone, PartialEq)]
pub struct DtoAnnotation {
    name: Id,
    arguments: IndexMap<Id, AnnotationValue>,
}

impl DtoAnnotation {
    /// The argument name used when an annotation is written with a single
    /// positional value.
    pub const DEFAULT_ARGUMENT: &'static str = "value";

    pub fn new(name: Id, arguments: IndexMap<Id, AnnotationValue>) -> Self {
        Self { name, arguments }
    }

    /// Get the annotation name as written, possibly qualified.
    pub fn name(&self) -> Id {
        self.name
    }

    /// Get the arguments in declaration order.
    pub fn arguments(&self) -> &IndexMap<Id, AnnotationValue> {
        &self.arguments
    }

    /// Look up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&AnnotationValue> {
        self.arguments.get(&Id::new(name))
    }
}

/// An explicit nullability request on a DTO property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullabilityOverride {
    /// `?`
    Nullable,
    /// `!`
    NonNull,
}

/// What a DTO property materializes to.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyTarget {
    /// A plain value of the entity property's declared type.
    Value,
    /// The identifier(s) of an associated entity.
    IdOnly { id_type: String },
    /// An association kept as the raw entity reference.
    Entity { entity: Id },
    /// An inline nested DTO type.
    Nested(Box<DtoType>),
    /// A recursive reference back to the named enclosing DTO type.
    Recursive { type_name: Id },
}

/// A resolved DTO property.
#[derive(Debug, Clone, PartialEq)]
pub struct DtoProperty {
    name: Id,
    source: Id,
    alias: Option<Id>,
    base_path: Vec<Id>,
    kind: PropertyKind,
    type_name: String,
    nullable: bool,
    nullability_override: Option<NullabilityOverride>,
    many: bool,
    target: PropertyTarget,
}

impl DtoProperty {
    /// Create a resolved property.
    ///
    /// # Arguments
    ///
    /// * `name` - Output name, after aliasing and flatten prefixes
    /// * `source` - The entity property this one reads
    /// * `alias` - The alias written in the source, if any
    /// * `base_path` - Properties traversed by flattening to reach `source`
    /// * `kind` - Kind of the source property
    /// * `type_name` - Declared type of the source property
    /// * `nullable` - The resolved nullability
    /// * `nullability_override` - Explicit `?`/`!` in the source
    /// * `many` - Whether the source is a to-many association
    /// * `target` - What the property materializes to
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: Id,
        source: Id,
        alias: Option<Id>,
        base_path: Vec<Id>,
        kind: PropertyKind,
        type_name: String,
        nullable: bool,
        nullability_override: Option<NullabilityOverride>,
        many: bool,
        target: PropertyTarget,
    ) -> Self {
        Self {
            name,
            source,
            alias,
            base_path,
            kind,
            type_name,
            nullable,
            nullability_override,
            many,
            target,
        }
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn alias(&self) -> Option<Id> {
        self.alias
    }

    /// The flatten path leading to the source property, outermost first.
    pub fn base_path(&self) -> &[Id] {
        &self.base_path
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn nullability_override(&self) -> Option<NullabilityOverride> {
        self.nullability_override
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    pub fn target(&self) -> &PropertyTarget {
        &self.target
    }

    /// The nested DTO type, if this property has one.
    pub fn nested(&self) -> Option<&DtoType> {
        match &self.target {
            PropertyTarget::Nested(dto) => Some(dto),
            _ => None,
        }
    }
}

/// Broad category of a type written in DTO source, by its simple name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Boolean,
    Char,
    /// `Byte`, `Short`, `Int`/`Integer`, `Long`
    Integral,
    /// `Float`, `Double`
    Floating,
    String,
    /// Lists, sets, maps and other containers
    Collection,
    Other,
}

/// A type reference written in DTO source: `Map<String, List<Long>>?`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    name: Id,
    arguments: Vec<TypeRef>,
    nullable: bool,
}

impl TypeRef {
    pub fn new(name: Id, arguments: Vec<TypeRef>, nullable: bool) -> Self {
        Self {
            name,
            arguments,
            nullable,
        }
    }

    /// The type name as written, possibly qualified.
    pub fn name(&self) -> Id {
        self.name
    }

    pub fn arguments(&self) -> &[TypeRef] {
        &self.arguments
    }

    /// Whether the type was written with a trailing `?`.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn category(&self) -> TypeCategory {
        match self.name.simple_name().as_str() {
            "Boolean" | "boolean" => TypeCategory::Boolean,
            "Char" | "Character" | "char" => TypeCategory::Char,
            "Byte" | "byte" | "Short" | "short" | "Int" | "int" | "Integer" | "Long" | "long" => {
                TypeCategory::Integral
            }
            "Float" | "float" | "Double" | "double" => TypeCategory::Floating,
            "String" => TypeCategory::String,
            "List" | "MutableList" | "Set" | "MutableSet" | "Collection" | "Iterable" | "Map"
            | "MutableMap" => TypeCategory::Collection,
            _ => TypeCategory::Other,
        }
    }

    /// Whether a non-null property of this type may omit its default.
    ///
    /// Primitives, strings and containers have a natural zero value.
    pub fn has_implicit_default(&self) -> bool {
        self.category() != TypeCategory::Other
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.arguments.is_empty() {
            write!(f, "<")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{argument}")?;
            }
            write!(f, ">")?;
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// The default value of a user-defined property.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Null => write!(f, "null"),
            DefaultValue::Boolean(value) => write!(f, "{value}"),
            DefaultValue::Integer(value) => write!(f, "{value}"),
            DefaultValue::Float(value) => write!(f, "{value:?}"),
            DefaultValue::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// A property declared in DTO source with its own type, not read from the
/// entity.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProperty {
    name: Id,
    type_ref: TypeRef,
    nullable: bool,
    default: Option<DefaultValue>,
    annotations: Vec<DtoAnnotation>,
}

impl UserProperty {
    pub fn new(
        name: Id,
        type_ref: TypeRef,
        nullable: bool,
        default: Option<DefaultValue>,
        annotations: Vec<DtoAnnotation>,
    ) -> Self {
        Self {
            name,
            type_ref,
            nullable,
            default,
            annotations,
        }
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// The resolved nullability; specifications make every property nullable.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn annotations(&self) -> &[DtoAnnotation] {
        &self.annotations
    }
}

/// A fully-resolved DTO type.
#[derive(Debug, Clone, PartialEq)]
pub struct DtoType {
    entity: Id,
    name: Id,
    modifiers: DtoModifiers,
    annotations: Vec<DtoAnnotation>,
    mutability: Mutability,
    mutable: bool,
    properties: Vec<DtoProperty>,
    user_properties: Vec<UserProperty>,
}

impl DtoType {
    /// Create a resolved DTO type.
    ///
    /// # Arguments
    ///
    /// * `entity` - Qualified name of the owning entity
    /// * `name` - DTO type name, unique per entity
    /// * `modifiers` - Resolved modifiers
    /// * `annotations` - Annotations in declaration order
    /// * `mutability` - Mutability requested by the annotations
    /// * `mutable` - Effective mutability after applying the default
    /// * `properties` - Resolved properties in output order
    pub fn new(
        entity: Id,
        name: Id,
        modifiers: DtoModifiers,
        annotations: Vec<DtoAnnotation>,
        mutability: Mutability,
        mutable: bool,
        properties: Vec<DtoProperty>,
    ) -> Self {
        Self {
            entity,
            name,
            modifiers,
            annotations,
            mutability,
            mutable,
            properties,
            user_properties: Vec::new(),
        }
    }

    /// Attach the user-defined properties, which follow the entity-derived
    /// ones.
    pub fn with_user_properties(mut self, user_properties: Vec<UserProperty>) -> Self {
        self.user_properties = user_properties;
        self
    }

    pub fn entity(&self) -> Id {
        self.entity
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn modifiers(&self) -> DtoModifiers {
        self.modifiers
    }

    pub fn annotations(&self) -> &[DtoAnnotation] {
        &self.annotations
    }

    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// The effective mutability flag.
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn properties(&self) -> &[DtoProperty] {
        &self.properties
    }

    /// Look up a property by output name.
    pub fn property(&self, name: &str) -> Option<&DtoProperty> {
        self.properties.iter().find(|property| property.name() == name)
    }

    pub fn user_properties(&self) -> &[UserProperty] {
        &self.user_properties
    }

    /// Look up a user-defined property by name.
    pub fn user_property(&self, name: &str) -> Option<&UserProperty> {
        self.user_properties.iter().find(|property| property.name() == name)
    }

    /// Output property names in order, user-defined ones last.
    pub fn property_names(&self) -> Vec<String> {
        self.properties
            .iter()
            .map(|p| p.name())
            .chain(self.user_properties.iter().map(UserProperty::name))
            .map(|name| name.as_string())
            .collect()
    }
}
