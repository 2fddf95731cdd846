//! Two-phase schema resolution.
//!
//! Metadata lookups made while sources are still being discovered may see an
//! incomplete schema. The driver therefore works in two phases:
//!
//! 1. Through a [`SchemaBarrier`] it may look entities up and inspect their
//!    markers, but cannot resolve anything.
//! 2. [`SchemaBarrier::resolve`] finalizes the provider exactly once and
//!    hands out a [`ResolvedSchema`], the only view the expander and resolver
//!    accept.

use log::debug;

use super::{EntitySchema, PropertyMeta, SchemaError, SchemaMarker, SchemaProvider};
use crate::identifier::Id;

/// Phase-one access to a provider that has not been finalized yet.
pub struct SchemaBarrier<'p, P: SchemaProvider + ?Sized> {
    provider: &'p mut P,
}

impl<'p, P: SchemaProvider + ?Sized> SchemaBarrier<'p, P> {
    pub fn new(provider: &'p mut P) -> Self {
        Self { provider }
    }

    /// Look up an entity by fully-qualified name.
    pub fn lookup(&self, qualified_name: Id) -> Option<&EntitySchema> {
        self.provider.lookup(qualified_name)
    }

    /// The marker of the named entity, if it exists.
    pub fn marker_of(&self, qualified_name: Id) -> Option<SchemaMarker> {
        self.provider
            .lookup(qualified_name)
            .map(|schema| self.provider.marker_of(schema))
    }

    /// Whether the named entity passes the provider's inclusion policy.
    pub fn is_included(&self, qualified_name: Id) -> bool {
        self.provider
            .lookup(qualified_name)
            .is_some_and(|schema| self.provider.is_included(schema))
    }

    /// Finalize the provider and cross into phase two.
    ///
    /// # Errors
    ///
    /// Propagates any [`SchemaError`] raised by [`SchemaProvider::finalize`].
    pub fn resolve(self) -> Result<ResolvedSchema<'p, P>, SchemaError> {
        self.provider.finalize()?;
        debug!("Schema resolution barrier crossed");
        Ok(ResolvedSchema {
            provider: self.provider,
        })
    }
}

/// A finalized, read-only schema view.
///
/// Obtainable only from [`SchemaBarrier::resolve`], so holding one proves
/// every entity has been discovered.
pub struct ResolvedSchema<'p, P: SchemaProvider + ?Sized> {
    provider: &'p P,
}

impl<P: SchemaProvider + ?Sized> Clone for ResolvedSchema<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: SchemaProvider + ?Sized> Copy for ResolvedSchema<'_, P> {}

impl<'p, P: SchemaProvider + ?Sized> ResolvedSchema<'p, P> {
    /// Look up an entity by fully-qualified name.
    pub fn entity(&self, qualified_name: Id) -> Option<&'p EntitySchema> {
        self.provider.lookup(qualified_name)
    }

    /// The ordered properties of `schema`.
    pub fn properties_of(&self, schema: &'p EntitySchema) -> &'p [PropertyMeta] {
        self.provider.properties_of(schema)
    }

    /// The ordered properties of the named entity, empty if it is unknown.
    pub fn properties_of_name(&self, qualified_name: Id) -> &'p [PropertyMeta] {
        match self.provider.lookup(qualified_name) {
            Some(schema) => self.provider.properties_of(schema),
            None => &[],
        }
    }

    /// Look up one property of the named entity.
    pub fn property(&self, entity: Id, property: Id) -> Option<&'p PropertyMeta> {
        self.properties_of_name(entity)
            .iter()
            .find(|meta| meta.name() == property)
    }

    /// The marker of `schema`.
    pub fn marker_of(&self, schema: &EntitySchema) -> SchemaMarker {
        self.provider.marker_of(schema)
    }

    /// Whether `to` is reachable from `from` through associations.
    pub fn reaches(&self, from: Id, to: Id) -> bool {
        self.provider.reaches(from, to)
    }

    /// Borrow the underlying provider.
    pub fn provider(&self) -> &'p P {
        self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                EntitySchema::new(
                    Id::new("shop.Order"),
                    SchemaMarker::Entity,
                    vec![
                        PropertyMeta::id("id", "Long"),
                        PropertyMeta::association("lines", "shop.OrderLine", true),
                    ],
                )
                .unwrap(),
            )
            .unwrap();
        registry
            .register(
                EntitySchema::new(
                    Id::new("shop.OrderLine"),
                    SchemaMarker::Entity,
                    vec![PropertyMeta::id("id", "Long")],
                )
                .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_phase_one_lookups() {
        let mut registry = registry();
        let barrier = SchemaBarrier::new(&mut registry);

        assert_eq!(
            barrier.marker_of(Id::new("shop.Order")),
            Some(SchemaMarker::Entity)
        );
        assert_eq!(barrier.marker_of(Id::new("shop.Missing")), None);
        assert!(barrier.is_included(Id::new("shop.Order")));
        assert!(!barrier.is_included(Id::new("shop.Missing")));
    }

    #[test]
    fn test_resolve_finalizes_provider() {
        let mut registry = registry();
        {
            let resolved = SchemaBarrier::new(&mut registry).resolve().unwrap();
            let order = resolved.entity(Id::new("shop.Order")).unwrap();
            assert_eq!(resolved.properties_of(order).len(), 2);
            assert!(resolved.property(Id::new("shop.Order"), Id::new("lines")).is_some());
            assert!(resolved.reaches(Id::new("shop.Order"), Id::new("shop.OrderLine")));
        }
        assert!(registry.is_finalized());
    }

    #[test]
    fn test_resolve_twice_fails() {
        let mut registry = registry();
        SchemaBarrier::new(&mut registry).resolve().unwrap();
        assert!(SchemaBarrier::new(&mut registry).resolve().is_err());
    }
}
