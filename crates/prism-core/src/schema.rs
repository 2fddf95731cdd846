//! Entity schema metadata.
//!
//! This module describes the read-only facts the compiler knows about the
//! record types DTOs are declared against: which entities exist, what schema
//! marker they carry and, for every property, its kind, declared type and
//! nullability.
//!
//! # Organization
//!
//! - [`EntitySchema`] / [`PropertyMeta`] / [`PropertyKind`] - the metadata model
//! - [`SchemaProvider`] - the lookup interface the compiler consumes
//! - [`registry`] - [`SchemaRegistry`], the bundled in-memory provider
//! - [`barrier`] - [`SchemaBarrier`] and [`ResolvedSchema`], the explicit
//!   two-phase resolution barrier

pub mod barrier;
pub mod registry;

pub use barrier::{ResolvedSchema, SchemaBarrier};
pub use registry::{InclusionPolicy, SchemaRegistry};

use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::Id;

/// The marker an entity carries in external metadata.
///
/// Only entities tagged with one of the three recognized markers may have
/// DTOs declared against them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMarker {
    /// A persisted entity
    Entity,
    /// An embeddable value object
    Embeddable,
    /// A plain immutable value type
    Immutable,
    /// No recognized marker
    #[default]
    None,
}

impl SchemaMarker {
    /// The markers that make an entity eligible for DTO declarations.
    pub const RECOGNIZED: [SchemaMarker; 3] = [
        SchemaMarker::Entity,
        SchemaMarker::Embeddable,
        SchemaMarker::Immutable,
    ];

    /// Returns `true` for every marker except [`SchemaMarker::None`].
    pub fn is_recognized(&self) -> bool {
        !matches!(self, SchemaMarker::None)
    }
}

impl FromStr for SchemaMarker {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity" => Ok(Self::Entity),
            "embeddable" => Ok(Self::Embeddable),
            "immutable" => Ok(Self::Immutable),
            "none" => Ok(Self::None),
            _ => Err("Unsupported schema marker"),
        }
    }
}

impl fmt::Display for SchemaMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaMarker::Entity => "Entity",
            SchemaMarker::Embeddable => "Embeddable",
            SchemaMarker::Immutable => "Immutable",
            SchemaMarker::None => "None",
        };
        f.write_str(s)
    }
}

/// The kind of an entity property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// A stored value. `embedded` names the embeddable schema when the value
    /// is itself a structured embeddable object.
    Scalar { embedded: Option<Id> },
    /// The identifier property.
    Id,
    /// A reference to another entity, single-valued or a collection.
    Association { target: Id, many: bool },
    /// A derived property exposing the id(s) of `association`.
    IdView { association: Id },
    /// A derived property computed from `dependencies`.
    Computed { dependencies: Vec<Id> },
    /// The soft-delete status flag.
    LogicalDeleted,
}

impl PropertyKind {
    /// Returns `true` for [`PropertyKind::Scalar`] and [`PropertyKind::Id`].
    pub fn is_scalar(&self) -> bool {
        matches!(self, PropertyKind::Scalar { .. } | PropertyKind::Id)
    }

    /// Returns `true` for associations of either multiplicity.
    pub fn is_association(&self) -> bool {
        matches!(self, PropertyKind::Association { .. })
    }

    /// The schema a structured property points to: the association target or
    /// the embeddable type of a scalar.
    pub fn target(&self) -> Option<Id> {
        match self {
            PropertyKind::Association { target, .. } => Some(*target),
            PropertyKind::Scalar { embedded } => *embedded,
            _ => None,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Scalar { embedded: None } => write!(f, "scalar"),
            PropertyKind::Scalar { embedded: Some(target) } => {
                write!(f, "embedded `{target}`")
            }
            PropertyKind::Id => write!(f, "id"),
            PropertyKind::Association { target, many: false } => {
                write!(f, "to-one association to `{target}`")
            }
            PropertyKind::Association { target, many: true } => {
                write!(f, "to-many association to `{target}`")
            }
            PropertyKind::IdView { association } => write!(f, "id view of `{association}`"),
            PropertyKind::Computed { .. } => write!(f, "computed"),
            PropertyKind::LogicalDeleted => write!(f, "logically-deleted marker"),
        }
    }
}

/// Metadata for one property of an [`EntitySchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMeta {
    name: Id,
    type_name: String,
    nullable: bool,
    kind: PropertyKind,
}

impl PropertyMeta {
    /// Create property metadata.
    ///
    /// # Arguments
    ///
    /// * `name` - Property name, unique within its schema
    /// * `type_name` - Declared type as written in the host schema
    /// * `nullable` - Whether the declared type admits null
    /// * `kind` - The property kind
    pub fn new(name: Id, type_name: impl Into<String>, nullable: bool, kind: PropertyKind) -> Self {
        Self {
            name,
            type_name: type_name.into(),
            nullable,
            kind,
        }
    }

    /// A non-null plain scalar property.
    pub fn scalar(name: &str, type_name: &str) -> Self {
        Self::new(
            Id::new(name),
            type_name,
            false,
            PropertyKind::Scalar { embedded: None },
        )
    }

    /// A non-null identifier property.
    pub fn id(name: &str, type_name: &str) -> Self {
        Self::new(Id::new(name), type_name, false, PropertyKind::Id)
    }

    /// A non-null association property.
    pub fn association(name: &str, target: &str, many: bool) -> Self {
        let target = Id::new(target);
        let type_name = if many {
            format!("List<{}>", target.simple_name())
        } else {
            target.simple_name()
        };
        Self::new(
            Id::new(name),
            type_name,
            false,
            PropertyKind::Association { target, many },
        )
    }

    /// A non-null embedded value property.
    pub fn embedded(name: &str, target: &str) -> Self {
        let target = Id::new(target);
        Self::new(
            Id::new(name),
            target.simple_name(),
            false,
            PropertyKind::Scalar {
                embedded: Some(target),
            },
        )
    }

    /// An id view of `association`.
    pub fn id_view(name: &str, type_name: &str, association: &str) -> Self {
        Self::new(
            Id::new(name),
            type_name,
            false,
            PropertyKind::IdView {
                association: Id::new(association),
            },
        )
    }

    /// A computed property depending on `dependencies`.
    pub fn computed(name: &str, type_name: &str, dependencies: &[&str]) -> Self {
        Self::new(
            Id::new(name),
            type_name,
            false,
            PropertyKind::Computed {
                dependencies: dependencies.iter().map(|d| Id::new(d)).collect(),
            },
        )
    }

    /// A logically-deleted marker property.
    pub fn logical_deleted(name: &str, type_name: &str) -> Self {
        Self::new(Id::new(name), type_name, true, PropertyKind::LogicalDeleted)
    }

    /// Returns the same property with the given nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Get the property name.
    pub fn name(&self) -> Id {
        self.name
    }

    /// Get the declared type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether the declared type is nullable.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Get the property kind.
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Returns `true` for to-many associations.
    pub fn is_many(&self) -> bool {
        matches!(self.kind, PropertyKind::Association { many: true, .. })
    }
}

/// Metadata for one record type, identified by its fully-qualified name.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: Id,
    marker: SchemaMarker,
    properties: Vec<PropertyMeta>,
    index: HashMap<Id, usize>,
}

impl EntitySchema {
    /// Create an entity schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateProperty`] if two properties share a name.
    pub fn new(
        name: Id,
        marker: SchemaMarker,
        properties: Vec<PropertyMeta>,
    ) -> Result<Self, SchemaError> {
        let mut index = HashMap::with_capacity(properties.len());
        for (position, property) in properties.iter().enumerate() {
            if index.insert(property.name(), position).is_some() {
                return Err(SchemaError::DuplicateProperty {
                    entity: name,
                    property: property.name(),
                });
            }
        }

        Ok(Self {
            name,
            marker,
            properties,
            index,
        })
    }

    /// Get the fully-qualified name.
    pub fn name(&self) -> Id {
        self.name
    }

    /// Get the last segment of the qualified name.
    pub fn simple_name(&self) -> String {
        self.name.simple_name()
    }

    /// Get the schema marker.
    pub fn marker(&self) -> SchemaMarker {
        self.marker
    }

    /// Borrow the properties in declaration order.
    pub fn properties(&self) -> &[PropertyMeta] {
        &self.properties
    }

    /// Look up a property by name.
    pub fn property(&self, name: Id) -> Option<&PropertyMeta> {
        self.index.get(&name).map(|&position| &self.properties[position])
    }

    /// The identifier property, if the schema declares one.
    pub fn id_property(&self) -> Option<&PropertyMeta> {
        self.properties
            .iter()
            .find(|property| matches!(property.kind(), PropertyKind::Id))
    }

    /// The id view property exposing `association`, if any.
    pub fn id_view_of(&self, association: Id) -> Option<&PropertyMeta> {
        self.properties.iter().find(|property| {
            matches!(property.kind(), PropertyKind::IdView { association: a } if *a == association)
        })
    }
}

/// Errors raised while building or finalizing schema metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("entity `{0}` is registered more than once")]
    DuplicateEntity(Id),

    #[error("property `{property}` is declared more than once on `{entity}`")]
    DuplicateProperty { entity: Id, property: Id },

    #[error("property `{entity}.{property}` refers to unknown entity `{target}`")]
    UnknownTarget { entity: Id, property: Id, target: Id },

    #[error(
        "id view `{entity}.{property}` must name an association of `{entity}`, \
         but `{association}` is not one"
    )]
    InvalidIdView {
        entity: Id,
        property: Id,
        association: Id,
    },

    #[error("the schema is finalized and can no longer be modified")]
    Finalized,
}

/// Read-only lookup of entity and property facts.
///
/// The compiler never inspects host-language declarations; everything it
/// knows about entities comes through this interface. Lookups before
/// [`SchemaProvider::finalize`] may observe incomplete metadata, which is why
/// the compiler only resolves DTOs through a [`ResolvedSchema`].
pub trait SchemaProvider {
    /// Look up an entity by fully-qualified name.
    fn lookup(&self, qualified_name: Id) -> Option<&EntitySchema>;

    /// The ordered properties of `schema`.
    fn properties_of<'a>(&'a self, schema: &'a EntitySchema) -> &'a [PropertyMeta] {
        schema.properties()
    }

    /// The marker `schema` is tagged with.
    fn marker_of(&self, schema: &EntitySchema) -> SchemaMarker {
        schema.marker()
    }

    /// External policy gate deciding whether DTOs of `schema` are compiled.
    fn is_included(&self, _schema: &EntitySchema) -> bool {
        true
    }

    /// Returns `true` if `to` is reachable from `from` by following
    /// associations (zero or more hops).
    fn reaches(&self, from: Id, to: Id) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![from];
        while let Some(current) = pending.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(schema) = self.lookup(current) {
                pending.extend(
                    self.properties_of(schema)
                        .iter()
                        .filter(|property| property.kind().is_association())
                        .filter_map(|property| property.kind().target()),
                );
            }
        }
        false
    }

    /// Complete discovery of every entity. Called exactly once, at the
    /// resolution barrier.
    fn finalize(&mut self) -> Result<(), SchemaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn department() -> EntitySchema {
        EntitySchema::new(
            Id::new("hr.Department"),
            SchemaMarker::Entity,
            vec![
                PropertyMeta::id("id", "Long"),
                PropertyMeta::scalar("name", "String"),
                PropertyMeta::association("employees", "hr.Employee", true),
                PropertyMeta::id_view("employeeIds", "List<Long>", "employees"),
            ],
        )
        .expect("valid schema")
    }

    #[test]
    fn test_property_lookup() {
        let schema = department();

        assert_eq!(schema.simple_name(), "Department");
        assert_eq!(schema.properties().len(), 4);
        assert!(schema.property(Id::new("name")).is_some());
        assert!(schema.property(Id::new("missing")).is_none());
        assert_eq!(schema.id_property().map(|p| p.name()), Some(Id::new("id")));
        assert_eq!(
            schema.id_view_of(Id::new("employees")).map(|p| p.name()),
            Some(Id::new("employeeIds"))
        );
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let err = EntitySchema::new(
            Id::new("hr.Broken"),
            SchemaMarker::Entity,
            vec![
                PropertyMeta::scalar("name", "String"),
                PropertyMeta::scalar("name", "String"),
            ],
        )
        .unwrap_err();

        assert_eq!(
            err,
            SchemaError::DuplicateProperty {
                entity: Id::new("hr.Broken"),
                property: Id::new("name"),
            }
        );
    }

    #[test]
    fn test_marker_parsing() {
        assert_eq!("entity".parse(), Ok(SchemaMarker::Entity));
        assert_eq!("embeddable".parse(), Ok(SchemaMarker::Embeddable));
        assert!("table".parse::<SchemaMarker>().is_err());
        assert!(!SchemaMarker::None.is_recognized());
        assert!(SchemaMarker::Immutable.is_recognized());
    }

    #[test]
    fn test_kind_helpers() {
        let many = PropertyMeta::association("employees", "hr.Employee", true);
        assert!(many.is_many());
        assert!(many.kind().is_association());
        assert_eq!(many.kind().target(), Some(Id::new("hr.Employee")));
        assert_eq!(many.type_name(), "List<Employee>");

        let embedded = PropertyMeta::embedded("address", "hr.Address");
        assert!(embedded.kind().is_scalar());
        assert_eq!(embedded.kind().target(), Some(Id::new("hr.Address")));
    }

    /// Provider holding a plain map, relying on every default method.
    struct MapProvider(HashMap<Id, EntitySchema>);

    impl SchemaProvider for MapProvider {
        fn lookup(&self, qualified_name: Id) -> Option<&EntitySchema> {
            self.0.get(&qualified_name)
        }

        fn finalize(&mut self) -> Result<(), SchemaError> {
            Ok(())
        }
    }

    fn ring(size: usize) -> MapProvider {
        let entities = (0..size)
            .map(|i| {
                let name = Id::new(&format!("ring.Node{i}"));
                let schema = EntitySchema::new(
                    name,
                    SchemaMarker::Entity,
                    vec![
                        PropertyMeta::id("id", "Long"),
                        PropertyMeta::association("next", &format!("ring.Node{}", (i + 1) % size), false),
                        PropertyMeta::association("self", &format!("ring.Node{i}"), true),
                    ],
                )
                .expect("valid schema");
                (name, schema)
            })
            .collect();
        MapProvider(entities)
    }

    #[test]
    fn test_default_reaches_terminates_on_cycles() {
        let provider = ring(200);
        assert!(provider.reaches(Id::new("ring.Node0"), Id::new("ring.Node199")));
        assert!(provider.reaches(Id::new("ring.Node150"), Id::new("ring.Node3")));
        assert!(provider.reaches(Id::new("ring.Node7"), Id::new("ring.Node7")));
        assert!(!provider.reaches(Id::new("ring.Node0"), Id::new("ring.Elsewhere")));
    }
}
