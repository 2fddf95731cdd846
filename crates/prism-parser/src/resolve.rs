//! Resolution of expanded declarations into [`DtoType`]s.
//!
//! The resolver binds every [`PropertyRef`] to its schema metadata, computes
//! the output nullability, applies the declaration's modifiers and
//! annotations, and rejects illegal selections. Its output is final: the
//! emitter never consults the syntax tree.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, trace};

use prism_core::{
    dto::{
        AnnotationValue, DefaultValue, DtoAnnotation, DtoKind, DtoModifiers, DtoProperty, DtoType, Mutability,
        NullabilityOverride, NullableInputStrategy, PropertyTarget, TypeCategory, UserProperty,
    },
    identifier::Id,
    schema::{PropertyKind, PropertyMeta, ResolvedSchema, SchemaProvider},
};

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    expand::{ExpandedBody, PropertyRef, Shape},
    parser_types::{Annotation, Declaration, Modifier, UserPropItem},
    span::{Span, Spanned},
};

/// Annotation that carries generation hints for a DTO type.
const DTO_ANNOTATION: &str = "Dto";
/// Argument of [`DTO_ANNOTATION`] selecting mutable or immutable output.
const IMMUTABILITY_ARGUMENT: &str = "immutability";

/// Process-wide compilation defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileConfig {
    /// Mutability of DTO types without a mutability annotation.
    pub mutable: bool,
    /// Nullable-input stance of input DTOs that name none.
    pub nullable_input: NullableInputStrategy,
}

/// Modifiers written at one level, either the file or a declaration.
#[derive(Debug, Default)]
struct ModifierSet {
    kind: Option<Spanned<DtoKind>>,
    nullable_input: Option<Spanned<NullableInputStrategy>>,
    deleted: bool,
}

impl ModifierSet {
    fn collect(modifiers: &[Spanned<Modifier>]) -> Result<Self> {
        let mut set = ModifierSet::default();
        for modifier in modifiers {
            match *modifier.inner() {
                Modifier::Input | Modifier::Specification => {
                    let kind = if *modifier.inner() == Modifier::Input {
                        DtoKind::Input
                    } else {
                        DtoKind::Specification
                    };
                    if let Some(previous) = set.kind {
                        if *previous.inner() != kind {
                            return Err(conflict(modifier.span(), previous.span())
                                .with_help("a DTO type is either `input` or `specification`"));
                        }
                    }
                    set.kind = Some(Spanned::new(kind, modifier.span()));
                }
                Modifier::NullableInput(strategy) => {
                    if let Some(previous) = set.nullable_input {
                        if *previous.inner() != strategy {
                            return Err(conflict(modifier.span(), previous.span())
                                .with_help("name at most one of `fixed`, `static`, `dynamic` and `fuzzy`"));
                        }
                    }
                    set.nullable_input = Some(Spanned::new(strategy, modifier.span()));
                }
                Modifier::Deleted => set.deleted = true,
            }
        }
        Ok(set)
    }
}

fn conflict(span: Span, previous: Span) -> Diagnostic {
    Diagnostic::error("conflicting modifiers")
        .with_code(ErrorCode::E305)
        .with_label(span, "conflicts with an earlier modifier")
        .with_secondary_label(previous, "earlier modifier")
}

/// Resolve the effective modifiers of a declaration.
///
/// The declaration's own nullable-input stance wins over the file default,
/// which wins over the configured default. `deleted` at either level allows
/// the logically-deleted marker.
pub fn resolve_modifiers(
    file: &[Spanned<Modifier>],
    declaration: &[Spanned<Modifier>],
    config: &CompileConfig,
) -> Result<DtoModifiers> {
    let file = ModifierSet::collect(file)?;
    if let Some(kind) = file.kind {
        return Err(Diagnostic::error(format!("`{}` cannot be a file default", kind.inner()))
            .with_code(ErrorCode::E305)
            .with_label(kind.span(), "only allowed on a declaration")
            .with_help("write the modifier before the DTO type name instead"));
    }
    let own = ModifierSet::collect(declaration)?;

    let kind = own.kind.map(|k| *k.inner()).unwrap_or_default();
    let nullable_input = own
        .nullable_input
        .or(file.nullable_input)
        .map(|s| *s.inner())
        .unwrap_or(config.nullable_input);

    Ok(DtoModifiers::new(kind, nullable_input, own.deleted || file.deleted))
}

/// Convert parsed annotations, keeping declaration and argument order.
pub fn resolve_annotations(annotations: &[Annotation]) -> Vec<DtoAnnotation> {
    annotations
        .iter()
        .map(|annotation| {
            let arguments: IndexMap<Id, AnnotationValue> = annotation
                .arguments
                .iter()
                .map(|(name, value)| (*name.inner(), value.inner().clone()))
                .collect();
            DtoAnnotation::new(*annotation.name.inner(), arguments)
        })
        .collect()
}

/// Read the mutability requested by `@Dto(immutability = ...)`.
pub fn resolve_mutability(annotations: &[Annotation]) -> Result<Mutability> {
    let mut mutability = Mutability::Unspecified;
    for annotation in annotations {
        if annotation.name.inner().simple_name() != DTO_ANNOTATION {
            continue;
        }
        for (name, value) in &annotation.arguments {
            if *name.inner() != IMMUTABILITY_ARGUMENT {
                continue;
            }
            mutability = match value.inner() {
                AnnotationValue::EnumConstant(constant) => match constant.simple_name().as_str() {
                    "MUTABLE" => Mutability::Mutable,
                    "IMMUTABLE" => Mutability::Immutable,
                    _ => Mutability::Unspecified,
                },
                other => {
                    return Err(Diagnostic::error(format!("invalid `{IMMUTABILITY_ARGUMENT}` value `{other}`"))
                        .with_code(ErrorCode::E306)
                        .with_label(value.span(), "expected an enum constant")
                        .with_help("use `MUTABLE` or `IMMUTABLE`"));
                }
            };
        }
    }
    Ok(mutability)
}

/// Check a user-defined property's type, nullability and default.
///
/// Specifications make every property nullable, so their user-defined
/// properties never need a default.
pub fn resolve_user_property(user: &UserPropItem, modifiers: DtoModifiers) -> Result<UserProperty> {
    let name = *user.name.inner();
    let type_ref = user.type_ref.inner();
    let nullable = type_ref.is_nullable() || modifiers.kind() == DtoKind::Specification;

    match &user.default {
        None if !nullable && !type_ref.has_implicit_default() => {
            return Err(Diagnostic::error(format!(
                "non-null property `{name}` of type `{type_ref}` needs a default value"
            ))
            .with_code(ErrorCode::E307)
            .with_label(user.type_ref.span(), "type without an implicit default")
            .with_help("add `= <value>`, or make the type nullable with `?`"));
        }
        None => {}
        Some(default) => {
            let fits = match default.inner() {
                DefaultValue::Null => nullable,
                DefaultValue::Boolean(_) => type_ref.category() == TypeCategory::Boolean,
                DefaultValue::Integer(_) => matches!(
                    type_ref.category(),
                    TypeCategory::Integral | TypeCategory::Floating
                ),
                DefaultValue::Float(_) => type_ref.category() == TypeCategory::Floating,
                DefaultValue::String(_) => type_ref.category() == TypeCategory::String,
            };
            if !fits {
                let help = if *default.inner() == DefaultValue::Null {
                    "make the type nullable with `?`"
                } else {
                    "only boolean, numeric and string properties take a non-null default"
                };
                return Err(Diagnostic::error(format!(
                    "`{}` is not a valid default of `{name}: {type_ref}`",
                    default.inner()
                ))
                .with_code(ErrorCode::E307)
                .with_label(default.span(), "invalid default")
                .with_secondary_label(user.type_ref.span(), "declared type")
                .with_help(help));
            }
        }
    }

    Ok(UserProperty::new(
        name,
        type_ref.clone(),
        nullable,
        user.default.as_ref().map(|d| d.inner().clone()),
        resolve_annotations(&user.annotations),
    ))
}

/// Binds expanded properties to the schema.
pub struct Resolver<'s, 'p, P: SchemaProvider + ?Sized> {
    schema: &'s ResolvedSchema<'p, P>,
    config: &'s CompileConfig,
}

impl<'s, 'p, P: SchemaProvider + ?Sized> Resolver<'s, 'p, P> {
    pub fn new(schema: &'s ResolvedSchema<'p, P>, config: &'s CompileConfig) -> Self {
        Self { schema, config }
    }

    /// Resolve one declaration whose body has already been expanded.
    pub fn resolve(
        &self,
        declaration: &Declaration,
        file_modifiers: &[Spanned<Modifier>],
        body: &ExpandedBody,
    ) -> Result<DtoType> {
        let modifiers = resolve_modifiers(file_modifiers, &declaration.modifiers, self.config)?;
        let annotations = resolve_annotations(&declaration.annotations);
        let mutability = resolve_mutability(&declaration.annotations)?;
        let mutable = mutability.resolve(self.config.mutable);

        let properties = self.properties(body, modifiers, mutable)?;
        let users = self.user_properties(body, modifiers)?;
        debug!(
            dto:% = body.type_name,
            entity:% = body.entity,
            kind:% = modifiers.kind(),
            mutable = mutable,
            properties = properties.len(),
            users = users.len();
            "Resolved DTO type"
        );
        Ok(DtoType::new(
            body.entity,
            body.type_name,
            modifiers,
            annotations,
            mutability,
            mutable,
            properties,
        )
        .with_user_properties(users))
    }

    /// Resolve the user-defined properties, which must not reuse any output
    /// name of the body.
    fn user_properties(&self, body: &ExpandedBody, modifiers: DtoModifiers) -> Result<Vec<UserProperty>> {
        let mut outputs: HashMap<Id, Span> = body.refs.iter().map(|r| (r.name, r.source.span())).collect();
        let mut users = Vec::with_capacity(body.users.len());
        for user in &body.users {
            if let Some(first) = outputs.insert(*user.name.inner(), user.name.span()) {
                return Err(Diagnostic::error(format!(
                    "duplicate property `{}` in `{}`",
                    user.name, body.type_name
                ))
                .with_code(ErrorCode::E301)
                .with_label(user.name.span(), "declared again")
                .with_secondary_label(first, "first produced here")
                .with_help("rename the user-defined property"));
            }
            let property = resolve_user_property(user, modifiers)?;
            trace!(
                dto:% = body.type_name,
                property:% = property.name(),
                nullable = property.is_nullable();
                "Resolved user-defined property"
            );
            users.push(property);
        }
        Ok(users)
    }

    fn properties(&self, body: &ExpandedBody, modifiers: DtoModifiers, mutable: bool) -> Result<Vec<DtoProperty>> {
        let mut outputs: HashMap<Id, Span> = HashMap::new();
        let mut explicit_sources: HashMap<(Vec<Id>, Id), Span> = HashMap::new();
        let mut properties = Vec::with_capacity(body.refs.len());

        for property_ref in &body.refs {
            let source = *property_ref.source.inner();
            if property_ref.explicit {
                let key = (property_ref.base_path.clone(), source);
                if let Some(first) = explicit_sources.insert(key, property_ref.source.span()) {
                    return Err(Diagnostic::error(format!("property `{source}` is selected more than once"))
                        .with_code(ErrorCode::E301)
                        .with_label(property_ref.source.span(), "selected again")
                        .with_secondary_label(first, "first selected here"));
                }
            }

            let property = self.property(property_ref, modifiers, mutable)?;
            trace!(dto:% = body.type_name, property:% = property.name(), nullable = property.is_nullable(); "Resolved property");

            if let Some(first) = outputs.insert(property.name(), property_ref.source.span()) {
                return Err(Diagnostic::error(format!(
                    "duplicate property `{}` in `{}`",
                    property.name(),
                    body.type_name
                ))
                .with_code(ErrorCode::E301)
                .with_label(property_ref.source.span(), "produces the same name again")
                .with_secondary_label(first, "first produced here")
                .with_help("rename one of them with `as`"));
            }
            properties.push(property);
        }
        Ok(properties)
    }

    fn property(&self, property_ref: &PropertyRef, modifiers: DtoModifiers, mutable: bool) -> Result<DtoProperty> {
        let meta = self.lookup(property_ref)?;
        let span = property_ref.source.span();

        match meta.kind() {
            PropertyKind::LogicalDeleted if !modifiers.include_deleted() => {
                return Err(Diagnostic::error(format!(
                    "`{}` is the logically-deleted marker of `{}`",
                    meta.name(),
                    property_ref.entity
                ))
                .with_code(ErrorCode::E303)
                .with_label(span, "logically-deleted marker")
                .with_help("add the `deleted` modifier to select it"));
            }
            PropertyKind::Computed { dependencies } => self.check_dependencies(property_ref, meta, dependencies)?,
            _ => {}
        }

        let explicit_nullability = property_ref.nullability.map(|n| *n.inner());
        if let Some(nullability) = property_ref.nullability {
            if *nullability.inner() == NullabilityOverride::NonNull && !modifiers.is_input() {
                return Err(Diagnostic::error("`!` is only allowed in input DTOs")
                    .with_code(ErrorCode::E304)
                    .with_label(nullability.span(), "non-null override")
                    .with_help("add the `input` modifier, or remove the `!`"));
            }
        }

        let implicit = meta.is_nullable()
            || property_ref.through_nullable
            || modifiers.kind() == DtoKind::Specification;
        let nullable = match explicit_nullability {
            Some(NullabilityOverride::Nullable) => true,
            Some(NullabilityOverride::NonNull) => false,
            None => implicit,
        };

        let (type_name, target) = match &property_ref.shape {
            Shape::Value => {
                let target = match meta.kind() {
                    PropertyKind::Association { target, .. } => PropertyTarget::Entity { entity: *target },
                    _ => PropertyTarget::Value,
                };
                (meta.type_name().to_string(), target)
            }
            Shape::IdOnly => {
                let id_type = self.id_type(property_ref, meta)?;
                let type_name = if meta.is_many() {
                    format!("List<{id_type}>")
                } else {
                    id_type.clone()
                };
                (type_name, PropertyTarget::IdOnly { id_type })
            }
            Shape::Nested(nested) => {
                let properties = self.properties(nested, modifiers, mutable)?;
                let nested_type = DtoType::new(
                    nested.entity,
                    nested.type_name,
                    modifiers,
                    Vec::new(),
                    Mutability::Unspecified,
                    mutable,
                    properties,
                );
                (nested.type_name.to_string(), PropertyTarget::Nested(Box::new(nested_type)))
            }
            Shape::Recursive { type_name } => (
                type_name.to_string(),
                PropertyTarget::Recursive { type_name: *type_name },
            ),
        };

        Ok(DtoProperty::new(
            property_ref.name,
            meta.name(),
            property_ref.alias,
            property_ref.base_path.clone(),
            meta.kind().clone(),
            type_name,
            nullable,
            explicit_nullability,
            meta.is_many(),
            target,
        ))
    }

    fn lookup(&self, property_ref: &PropertyRef) -> Result<&'p PropertyMeta> {
        let source = *property_ref.source.inner();
        if let Some(meta) = self.schema.property(property_ref.entity, source) {
            return Ok(meta);
        }
        let available: Vec<String> = self
            .schema
            .properties_of_name(property_ref.entity)
            .iter()
            .map(|meta| meta.name().to_string())
            .collect();
        let mut diagnostic = Diagnostic::error(format!(
            "`{}` has no property `{source}`",
            property_ref.entity
        ))
        .with_code(ErrorCode::E300)
        .with_label(property_ref.source.span(), "unknown property");
        if !available.is_empty() {
            diagnostic = diagnostic.with_help(format!("available properties: {}", available.join(", ")));
        }
        Err(diagnostic)
    }

    fn check_dependencies(&self, property_ref: &PropertyRef, meta: &PropertyMeta, dependencies: &[Id]) -> Result<()> {
        let missing = dependencies
            .iter()
            .find(|dependency| self.schema.property(property_ref.entity, **dependency).is_none());
        match missing {
            Some(dependency) => Err(Diagnostic::error(format!(
                "computed property `{}` depends on `{dependency}`, which `{}` does not declare",
                meta.name(),
                property_ref.entity
            ))
            .with_code(ErrorCode::E302)
            .with_label(property_ref.source.span(), "computed property")),
            None => Ok(()),
        }
    }

    fn id_type(&self, property_ref: &PropertyRef, meta: &PropertyMeta) -> Result<String> {
        let id = meta
            .kind()
            .target()
            .and_then(|target| self.schema.entity(target))
            .and_then(|target| target.id_property());
        match id {
            Some(id) => Ok(id.type_name().to_string()),
            None => Err(Diagnostic::error(format!(
                "id-only selection cannot be applied to `{}`",
                meta.name()
            ))
            .with_code(ErrorCode::E202)
            .with_label(property_ref.source.span(), "target has no id property")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expand::Expander, lexer::tokenize, parser::build_file};
    use prism_core::schema::{EntitySchema, SchemaBarrier, SchemaMarker, SchemaRegistry};

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        let entities = [
            EntitySchema::new(
                Id::new("shop.Order"),
                SchemaMarker::Entity,
                vec![
                    PropertyMeta::id("id", "Long"),
                    PropertyMeta::scalar("code", "String"),
                    PropertyMeta::scalar("note", "String").with_nullable(true),
                    PropertyMeta::logical_deleted("deleted", "Boolean"),
                    PropertyMeta::computed("total", "BigDecimal", &["code"]),
                    PropertyMeta::computed("broken", "BigDecimal", &["price"]),
                    PropertyMeta::association("customer", "shop.Customer", false).with_nullable(true),
                    PropertyMeta::association("items", "shop.Item", true),
                ],
            ),
            EntitySchema::new(
                Id::new("shop.Customer"),
                SchemaMarker::Entity,
                vec![PropertyMeta::id("id", "String"), PropertyMeta::scalar("name", "String")],
            ),
            EntitySchema::new(
                Id::new("shop.Item"),
                SchemaMarker::Entity,
                vec![PropertyMeta::id("id", "Long"), PropertyMeta::scalar("sku", "String")],
            ),
        ];
        for entity in entities {
            registry.register(entity.unwrap()).unwrap();
        }
        registry
    }

    fn resolve_with(source: &str, config: CompileConfig) -> Result<DtoType> {
        let mut registry = registry();
        let schema = SchemaBarrier::new(&mut registry).resolve().unwrap();
        let text = format!("export shop.Order\n{source}");
        let tokens = tokenize(&text).unwrap();
        let file = build_file(&tokens).unwrap();
        let declaration = &file.declarations[0];
        let entity = *file.entity.inner();
        let body = Expander::new(&schema).expand(&declaration.body, entity, *declaration.name.inner())?;
        Resolver::new(&schema, &config).resolve(declaration, &file.modifiers, &body)
    }

    fn resolve(source: &str) -> Result<DtoType> {
        resolve_with(source, CompileConfig::default())
    }

    #[test]
    fn test_nullability() {
        let dto = resolve("View { id, note, customer, code? }").unwrap();
        let nullable: Vec<bool> = dto.properties().iter().map(|p| p.is_nullable()).collect();
        assert_eq!(nullable, vec![false, true, true, true]);
        assert_eq!(
            dto.property("customer").unwrap().target(),
            &PropertyTarget::Entity {
                entity: Id::new("shop.Customer")
            }
        );
    }

    #[test]
    fn test_non_null_override() {
        let dto = resolve("input OrderInput { note! }").unwrap();
        assert!(!dto.property("note").unwrap().is_nullable());
        assert!(dto.modifiers().is_input());

        let err = resolve("View { note! }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E304));
    }

    #[test]
    fn test_specification_makes_everything_nullable() {
        let dto = resolve("specification OrderSpec { id, code }").unwrap();
        assert!(dto.properties().iter().all(|p| p.is_nullable()));
    }

    #[test]
    fn test_flattened_nullable_association() {
        let dto = resolve("View { flat(customer) { name } }").unwrap();
        let property = dto.property("customerName").unwrap();
        assert!(property.is_nullable());
        assert_eq!(property.base_path(), &[Id::new("customer")]);
        assert_eq!(property.source(), Id::new("name"));
    }

    #[test]
    fn test_unresolved_property() {
        let err = resolve("View { id, price }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E300));
        assert!(err.help().unwrap().contains("code"));
    }

    #[test]
    fn test_duplicate_output_name() {
        let err = resolve("View { code, note as code }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E301));

        let err = resolve("View { code, code as other }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E301));
    }

    #[test]
    fn test_logically_deleted_marker() {
        let err = resolve("View { id, deleted }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E303));

        let dto = resolve("deleted View { id, deleted }").unwrap();
        assert_eq!(dto.property_names(), vec!["id", "deleted"]);

        let dto = resolve("default deleted;\nView { deleted }").unwrap();
        assert!(dto.modifiers().include_deleted());
    }

    #[test]
    fn test_computed_dependencies() {
        let dto = resolve("View { total }").unwrap();
        assert!(matches!(dto.properties()[0].kind(), PropertyKind::Computed { .. }));

        let err = resolve("View { broken }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E302));
    }

    #[test]
    fn test_id_only_types() {
        let dto = resolve("View { id(customer), id(items) }").unwrap();
        let customer = dto.property("customerId").unwrap();
        assert_eq!(customer.type_name(), "String");
        assert_eq!(
            customer.target(),
            &PropertyTarget::IdOnly {
                id_type: "String".to_string()
            }
        );
        assert_eq!(dto.property("itemIds").unwrap().type_name(), "List<Long>");
    }

    #[test]
    fn test_nested_type_inherits_mutability() {
        let dto = resolve_with("View { items { sku } }", CompileConfig {
            mutable: true,
            ..CompileConfig::default()
        })
        .unwrap();
        let nested = dto.property("items").unwrap().nested().unwrap();
        assert_eq!(nested.name(), Id::new("TargetOf_items"));
        assert!(nested.is_mutable());
        assert_eq!(nested.property_names(), vec!["sku"]);
    }

    #[test]
    fn test_mutability_annotation() {
        let dto = resolve("@Dto(immutability = Dto.Immutability.MUTABLE)\nView { id }").unwrap();
        assert_eq!(dto.mutability(), Mutability::Mutable);
        assert!(dto.is_mutable());
        assert_eq!(dto.annotations()[0].name(), Id::new("Dto"));

        let dto = resolve_with("@Dto(immutability = IMMUTABLE)\nView { id }", CompileConfig {
            mutable: true,
            ..CompileConfig::default()
        })
        .unwrap();
        assert!(!dto.is_mutable());

        let dto = resolve_with("@Other(flag = true)\nView { id }", CompileConfig {
            mutable: true,
            ..CompileConfig::default()
        })
        .unwrap();
        assert_eq!(dto.mutability(), Mutability::Unspecified);
        assert!(dto.is_mutable());

        let err = resolve("@Dto(immutability = \"yes\")\nView { id }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E306));
    }

    #[test]
    fn test_modifier_precedence() {
        let config = CompileConfig {
            nullable_input: NullableInputStrategy::Fixed,
            ..CompileConfig::default()
        };
        let dto = resolve_with("input View { id }", config).unwrap();
        assert_eq!(dto.modifiers().nullable_input(), NullableInputStrategy::Fixed);

        let dto = resolve_with("default dynamic;\ninput View { id }", config).unwrap();
        assert_eq!(dto.modifiers().nullable_input(), NullableInputStrategy::Dynamic);

        let dto = resolve_with("default dynamic;\ninput fuzzy View { id }", config).unwrap();
        assert_eq!(dto.modifiers().nullable_input(), NullableInputStrategy::Fuzzy);
    }

    #[test]
    fn test_user_properties() {
        let dto = resolve(
            "View { remark: String? = null, #allScalars, @Doc(\"retries\") retries: Int = -1, tags: List<String>, ratio: Double = 2 }",
        )
        .unwrap();
        assert_eq!(
            dto.property_names(),
            vec!["id", "code", "note", "remark", "retries", "tags", "ratio"]
        );

        let remark = dto.user_property("remark").unwrap();
        assert!(remark.is_nullable());
        assert_eq!(remark.default(), Some(&DefaultValue::Null));

        let retries = dto.user_property("retries").unwrap();
        assert!(!retries.is_nullable());
        assert_eq!(retries.default(), Some(&DefaultValue::Integer(-1)));
        assert_eq!(retries.annotations()[0].name(), Id::new("Doc"));

        assert_eq!(dto.user_property("tags").unwrap().type_ref().to_string(), "List<String>");
        assert!(dto.user_property("tags").unwrap().default().is_none());
    }

    #[test]
    fn test_user_property_defaults_must_fit() {
        let cases = [
            "View { total2: java.math.BigDecimal }",
            "View { flag: Boolean = null }",
            "View { flag: Boolean = 1 }",
            "View { count: Long = 1.5 }",
            "View { count: Int = \"1\" }",
            "View { label: String = true }",
            "View { when: java.time.Instant? = \"now\" }",
        ];
        for source in cases {
            let err = resolve(source).expect_err(source);
            assert_eq!(err.code(), Some(ErrorCode::E307), "{source}");
        }

        // Nullable types and specifications need no default
        resolve("View { when: java.time.Instant? }").unwrap();
        let dto = resolve("specification Spec { when: java.time.Instant, flag: Boolean = null }").unwrap();
        assert!(dto.user_properties().iter().all(|p| p.is_nullable()));
    }

    #[test]
    fn test_user_property_name_clash() {
        let err = resolve("View { code, code: String? }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E301));

        let err = resolve("View { id(customer), customerId: String? }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E301));

        let err = resolve("View { extra: Int, extra: Long }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E301));
    }

    #[test]
    fn test_conflicting_modifiers() {
        let err = resolve("input specification View { id }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E305));

        let err = resolve("input fixed dynamic View { id }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E305));

        let err = resolve("default input;\nView { id }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E305));
    }
}
