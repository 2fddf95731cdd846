//! The bundled in-memory [`SchemaProvider`].

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, trace};
use petgraph::{
    algo::has_path_connecting,
    graph::{DiGraph, NodeIndex},
};

use super::{EntitySchema, PropertyKind, SchemaError, SchemaProvider};
use crate::identifier::Id;

/// Qualified-name prefix policy deciding which entities are compiled.
///
/// An entity is included when it matches no `exclude` prefix and, if any
/// `include` prefixes are given, matches at least one of them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InclusionPolicy {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl InclusionPolicy {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Returns `true` if `qualified_name` passes the policy.
    pub fn allows(&self, qualified_name: &str) -> bool {
        if self
            .exclude
            .iter()
            .any(|prefix| qualified_name.starts_with(prefix.as_str()))
        {
            return false;
        }
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|prefix| qualified_name.starts_with(prefix.as_str()))
    }
}

/// Association graph built once the registry is finalized.
#[derive(Debug, Default)]
struct AssociationGraph {
    graph: DiGraph<Id, ()>,
    nodes: HashMap<Id, NodeIndex>,
}

impl AssociationGraph {
    fn build(entities: &IndexMap<Id, EntitySchema>) -> Self {
        let mut graph = DiGraph::new();
        let nodes: HashMap<Id, NodeIndex> = entities
            .keys()
            .map(|&name| (name, graph.add_node(name)))
            .collect();

        for schema in entities.values() {
            let source = nodes[&schema.name()];
            for property in schema.properties() {
                let target = match property.kind() {
                    PropertyKind::Association { target, .. } => nodes.get(target),
                    _ => None,
                };
                if let Some(&target) = target {
                    graph.update_edge(source, target, ());
                }
            }
        }

        Self { graph, nodes }
    }

    fn reaches(&self, from: Id, to: Id) -> bool {
        match (self.nodes.get(&from), self.nodes.get(&to)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }
}

/// An in-memory, ordered collection of [`EntitySchema`]s.
///
/// Entities are registered during discovery and the registry becomes
/// read-only once [`SchemaProvider::finalize`] succeeds.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entities: IndexMap<Id, EntitySchema>,
    policy: InclusionPolicy,
    graph: Option<AssociationGraph>,
}

impl SchemaRegistry {
    /// Create an empty registry that includes every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry gated by `policy`.
    pub fn with_policy(policy: InclusionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Register an entity.
    ///
    /// # Errors
    ///
    /// Fails if the registry is finalized or the entity is already known.
    pub fn register(&mut self, schema: EntitySchema) -> Result<(), SchemaError> {
        if self.is_finalized() {
            return Err(SchemaError::Finalized);
        }
        if self.entities.contains_key(&schema.name()) {
            return Err(SchemaError::DuplicateEntity(schema.name()));
        }
        trace!(entity:% = schema.name(); "Registering entity schema");
        self.entities.insert(schema.name(), schema);
        Ok(())
    }

    /// Whether [`SchemaProvider::finalize`] has completed.
    pub fn is_finalized(&self) -> bool {
        self.graph.is_some()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for schema in self.entities.values() {
            for property in schema.properties() {
                match property.kind() {
                    PropertyKind::Association { target, .. }
                    | PropertyKind::Scalar {
                        embedded: Some(target),
                    } => {
                        if !self.entities.contains_key(target) {
                            return Err(SchemaError::UnknownTarget {
                                entity: schema.name(),
                                property: property.name(),
                                target: *target,
                            });
                        }
                    }
                    PropertyKind::IdView { association } => {
                        let is_association = schema
                            .property(*association)
                            .is_some_and(|p| p.kind().is_association());
                        if !is_association {
                            return Err(SchemaError::InvalidIdView {
                                entity: schema.name(),
                                property: property.name(),
                                association: *association,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

impl SchemaProvider for SchemaRegistry {
    fn lookup(&self, qualified_name: Id) -> Option<&EntitySchema> {
        self.entities.get(&qualified_name)
    }

    fn is_included(&self, schema: &EntitySchema) -> bool {
        self.policy.allows(&schema.name().as_string())
    }

    fn reaches(&self, from: Id, to: Id) -> bool {
        if from == to {
            return true;
        }
        match &self.graph {
            Some(graph) => graph.reaches(from, to),
            None => false,
        }
    }

    fn finalize(&mut self) -> Result<(), SchemaError> {
        if self.is_finalized() {
            return Err(SchemaError::Finalized);
        }
        self.validate()?;
        let graph = AssociationGraph::build(&self.entities);
        debug!(
            entities = self.entities.len(),
            edges = graph.graph.edge_count();
            "Schema registry finalized"
        );
        self.graph = Some(graph);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PropertyMeta, SchemaMarker};

    fn entity(name: &str, properties: Vec<PropertyMeta>) -> EntitySchema {
        EntitySchema::new(Id::new(name), SchemaMarker::Entity, properties).expect("valid schema")
    }

    fn hr_registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(entity(
                "hr.Department",
                vec![
                    PropertyMeta::id("id", "Long"),
                    PropertyMeta::association("employees", "hr.Employee", true),
                ],
            ))
            .unwrap();
        registry
            .register(entity(
                "hr.Employee",
                vec![
                    PropertyMeta::id("id", "Long"),
                    PropertyMeta::association("manager", "hr.Employee", false).with_nullable(true),
                    PropertyMeta::association("badge", "hr.Badge", false),
                ],
            ))
            .unwrap();
        registry
            .register(entity("hr.Badge", vec![PropertyMeta::id("id", "Long")]))
            .unwrap();
        registry
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = hr_registry();

        assert_eq!(registry.len(), 3);
        assert!(registry.lookup(Id::new("hr.Employee")).is_some());
        assert!(registry.lookup(Id::new("hr.Missing")).is_none());
        let order: Vec<_> = registry.entities().map(|e| e.simple_name()).collect();
        assert_eq!(order, vec!["Department", "Employee", "Badge"]);
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut registry = hr_registry();
        let err = registry
            .register(entity("hr.Badge", vec![]))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateEntity(Id::new("hr.Badge")));
    }

    #[test]
    fn test_finalize_freezes_registry() {
        let mut registry = hr_registry();
        registry.finalize().unwrap();

        assert!(registry.is_finalized());
        assert_eq!(
            registry.register(entity("hr.Late", vec![])),
            Err(SchemaError::Finalized)
        );
        assert_eq!(registry.finalize(), Err(SchemaError::Finalized));
    }

    #[test]
    fn test_finalize_rejects_unknown_target() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(entity(
                "hr.Employee",
                vec![PropertyMeta::association("office", "hr.Office", false)],
            ))
            .unwrap();

        assert_eq!(
            registry.finalize(),
            Err(SchemaError::UnknownTarget {
                entity: Id::new("hr.Employee"),
                property: Id::new("office"),
                target: Id::new("hr.Office"),
            })
        );
    }

    #[test]
    fn test_finalize_rejects_dangling_id_view() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(entity(
                "hr.Employee",
                vec![
                    PropertyMeta::scalar("name", "String"),
                    PropertyMeta::id_view("nameId", "Long", "name"),
                ],
            ))
            .unwrap();

        assert!(matches!(
            registry.finalize(),
            Err(SchemaError::InvalidIdView { .. })
        ));
    }

    #[test]
    fn test_reachability() {
        let mut registry = hr_registry();
        registry.finalize().unwrap();

        assert!(registry.reaches(Id::new("hr.Department"), Id::new("hr.Badge")));
        assert!(registry.reaches(Id::new("hr.Employee"), Id::new("hr.Employee")));
        assert!(!registry.reaches(Id::new("hr.Badge"), Id::new("hr.Department")));
    }

    #[test]
    fn test_inclusion_policy() {
        let policy = InclusionPolicy::new(vec!["hr.".to_string()], vec!["hr.internal.".to_string()]);

        assert!(policy.allows("hr.Employee"));
        assert!(!policy.allows("hr.internal.Audit"));
        assert!(!policy.allows("billing.Invoice"));
        assert!(InclusionPolicy::default().allows("anything.At.All"));
    }
}
