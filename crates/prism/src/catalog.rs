//! TOML schema catalogs.
//!
//! A catalog is the bundled stand-in for an external metadata provider: a
//! TOML document listing entities and their properties, loaded into a
//! [`SchemaRegistry`]. Entities may appear in any order; association targets
//! are only checked when the registry is finalized at the barrier.
//!
//! ```toml
//! [[entities]]
//! name = "hr.Department"
//! marker = "entity"
//! properties = [
//!     { name = "id", type = "Long", kind = "id" },
//!     { name = "name", type = "String" },
//!     { name = "employees", kind = "association", target = "hr.Employee", many = true },
//!     { name = "employeeIds", type = "List<Long>", kind = "id_view", association = "employees" },
//! ]
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use prism_core::{
    identifier::Id,
    schema::{EntitySchema, InclusionPolicy, PropertyKind, PropertyMeta, SchemaError, SchemaMarker, SchemaRegistry},
};

/// Errors raised while loading a catalog or finalizing the schema.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read schema \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid schema \"{}\": {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid property `{property}` of `{entity}`: {reason}")]
    Property {
        entity: String,
        property: String,
        reason: &'static str,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    entities: Vec<EntityDef>,
}

#[derive(Debug, Deserialize)]
struct EntityDef {
    name: String,
    #[serde(default)]
    marker: SchemaMarker,
    #[serde(default)]
    properties: Vec<PropertyDef>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum KindDef {
    #[default]
    Scalar,
    Id,
    Association,
    IdView,
    Computed,
    LogicalDeleted,
}

#[derive(Debug, Deserialize)]
struct PropertyDef {
    name: String,
    #[serde(rename = "type")]
    type_name: Option<String>,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    kind: KindDef,
    /// Association target, or the embeddable type of a scalar.
    target: Option<String>,
    #[serde(default)]
    many: bool,
    /// The association an id view exposes.
    association: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl PropertyDef {
    fn into_meta(self, entity: &str) -> Result<PropertyMeta, CatalogError> {
        let invalid = |reason| CatalogError::Property {
            entity: entity.to_string(),
            property: self.name.clone(),
            reason,
        };

        let kind = match self.kind {
            KindDef::Scalar => PropertyKind::Scalar {
                embedded: self.target.as_deref().map(Id::new),
            },
            KindDef::Id => PropertyKind::Id,
            KindDef::Association => {
                let target = self
                    .target
                    .as_deref()
                    .ok_or_else(|| invalid("an association needs a `target`"))?;
                PropertyKind::Association {
                    target: Id::new(target),
                    many: self.many,
                }
            }
            KindDef::IdView => {
                let association = self
                    .association
                    .as_deref()
                    .ok_or_else(|| invalid("an id view needs an `association`"))?;
                PropertyKind::IdView {
                    association: Id::new(association),
                }
            }
            KindDef::Computed => PropertyKind::Computed {
                dependencies: self.dependencies.iter().map(|d| Id::new(d)).collect(),
            },
            KindDef::LogicalDeleted => PropertyKind::LogicalDeleted,
        };

        let type_name = match (&self.type_name, &kind) {
            (Some(type_name), _) => type_name.clone(),
            // Associations and embeddables default to the target's simple name
            (None, PropertyKind::Association { target, many: true }) => format!("List<{}>", target.simple_name()),
            (None, PropertyKind::Association { target, many: false }) => target.simple_name(),
            (
                None,
                PropertyKind::Scalar {
                    embedded: Some(target),
                },
            ) => target.simple_name(),
            (None, _) => return Err(invalid("missing `type`")),
        };

        Ok(PropertyMeta::new(Id::new(&self.name), type_name, self.nullable, kind))
    }
}

/// Parse a catalog document into a registry using `policy`.
///
/// `path` is only used in error messages.
pub fn from_str(text: &str, path: &Path, policy: InclusionPolicy) -> Result<SchemaRegistry, CatalogError> {
    let catalog: CatalogFile = toml::from_str(text).map_err(|source| CatalogError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    let mut registry = SchemaRegistry::with_policy(policy);
    for entity in catalog.entities {
        let properties = entity
            .properties
            .into_iter()
            .map(|property| property.into_meta(&entity.name))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(entity = entity.name.as_str(), marker:% = entity.marker, properties = properties.len(); "Registering entity");
        registry.register(EntitySchema::new(Id::new(&entity.name), entity.marker, properties)?)?;
    }
    Ok(registry)
}

/// Load the catalog at `path` into a registry using `policy`.
pub fn load(path: &Path, policy: InclusionPolicy) -> Result<SchemaRegistry, CatalogError> {
    info!(path:? = path; "Loading schema catalog");
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let registry = from_str(&text, path, policy)?;
    info!(entities = registry.len(); "Schema catalog loaded");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use prism_core::schema::SchemaProvider;

    use super::*;

    const CATALOG: &str = r#"
        [[entities]]
        name = "hr.Employee"
        marker = "entity"
        properties = [
            { name = "id", type = "Long", kind = "id" },
            { name = "name", type = "String" },
            { name = "nickname", type = "String", nullable = true },
            { name = "department", kind = "association", target = "hr.Department" },
            { name = "address", kind = "scalar", target = "hr.Address" },
            { name = "label", type = "String", kind = "computed", dependencies = ["name", "nickname"] },
            { name = "deleted", type = "Boolean", kind = "logical_deleted" },
        ]

        [[entities]]
        name = "hr.Department"
        marker = "entity"
        properties = [
            { name = "id", type = "Long", kind = "id" },
            { name = "employees", kind = "association", target = "hr.Employee", many = true },
            { name = "employeeIds", type = "List<Long>", kind = "id_view", association = "employees" },
        ]

        [[entities]]
        name = "hr.Address"
        marker = "embeddable"
        properties = [{ name = "city", type = "String" }]

        [[entities]]
        name = "hr.Unmarked"
        properties = [{ name = "id", type = "Long", kind = "id" }]
    "#;

    fn load_str(text: &str) -> Result<SchemaRegistry, CatalogError> {
        from_str(text, Path::new("schema.toml"), InclusionPolicy::default())
    }

    #[test]
    fn test_load_catalog() {
        let mut registry = load_str(CATALOG).unwrap();
        assert_eq!(registry.len(), 4);
        registry.finalize().unwrap();

        let employee = registry.lookup(Id::new("hr.Employee")).unwrap();
        assert_eq!(employee.marker(), SchemaMarker::Entity);
        let department = employee.property(Id::new("department")).unwrap();
        assert_eq!(department.type_name(), "Department");
        assert!(!department.is_many());
        assert_eq!(employee.property(Id::new("address")).unwrap().kind().target(), Some(Id::new("hr.Address")));
        assert!(employee.property(Id::new("nickname")).unwrap().is_nullable());

        let department = registry.lookup(Id::new("hr.Department")).unwrap();
        assert_eq!(department.property(Id::new("employees")).unwrap().type_name(), "List<Employee>");
        let unmarked = registry.lookup(Id::new("hr.Unmarked")).unwrap();
        assert_eq!(registry.marker_of(unmarked), SchemaMarker::None);
    }

    #[test]
    fn test_missing_target() {
        let err = load_str(
            r#"
            [[entities]]
            name = "a.B"
            properties = [{ name = "c", kind = "association" }]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Property { .. }));
        assert!(err.to_string().contains("`target`"));
    }

    #[test]
    fn test_missing_type() {
        let err = load_str("[[entities]]\nname = \"a.B\"\nproperties = [{ name = \"c\" }]").unwrap_err();
        assert!(err.to_string().contains("missing `type`"));
    }

    #[test]
    fn test_dangling_target_fails_at_finalize() {
        let mut registry = load_str(
            r#"
            [[entities]]
            name = "a.B"
            marker = "entity"
            properties = [{ name = "c", kind = "association", target = "a.Missing" }]
            "#,
        )
        .unwrap();
        assert!(matches!(registry.finalize(), Err(SchemaError::UnknownTarget { .. })));
    }

    #[test]
    fn test_invalid_toml() {
        let err = load_str("[[entities]\nname =").unwrap_err();
        assert!(err.to_string().starts_with("Invalid schema \"schema.toml\""));
    }
}
