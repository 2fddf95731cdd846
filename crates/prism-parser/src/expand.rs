//! Macro expansion.
//!
//! Rewrites the selection items of a declaration body into an ordered list
//! of [`PropertyRef`]s with no remaining macros. Expanded properties take the
//! position of the macro that produced them.
//!
//! | item                 | expands to                                            |
//! |----------------------|-------------------------------------------------------|
//! | `#allScalars`        | every scalar and id property, in schema order         |
//! | `#allReferences`     | an id-only reference per single-valued association    |
//! | `flat(p) { ... }`    | the body's properties against `p`'s target, prefixed  |
//! | `id(p)`              | `p`'s id view if the entity has one, else the target id |
//! | `p*`                 | a recursive marker naming the enclosing DTO type      |
//! | `p { ... }`          | a nested selection against `p`'s target               |
//!
//! | `as(^ -> p) { ... }` | the group's properties, renamed by the pattern          |
//!
//! A property selected explicitly, flattened or named by `id(..)` is never
//! also produced by a macro of the same body, and `-name` removes the
//! property the body outputs as `name`.

use std::collections::{HashMap, HashSet};

use log::trace;

use prism_core::{
    dto::NullabilityOverride,
    identifier::Id,
    schema::{PropertyKind, PropertyMeta, ResolvedSchema, SchemaProvider},
};

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    parser_types::{AliasGroupItem, AliasPattern, Body, FlattenItem, IdOnlyItem, Item, MacroItem, PropertyItem, UserPropItem},
    span::{Span, Spanned},
};

const ALL_SCALARS: &str = "allScalars";
const ALL_REFERENCES: &str = "allReferences";

/// Name prefix of nested DTO types materialized for `p { ... }` selections.
pub const NESTED_TYPE_PREFIX: &str = "TargetOf_";

/// What a selected property materializes to.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// The property value itself, or the raw entity for an association.
    Value,
    /// The id(s) of the association's target.
    IdOnly,
    /// An inline nested selection.
    Nested(ExpandedBody),
    /// A back-reference to an enclosing DTO type.
    Recursive { type_name: Id },
}

/// One selected property after macro expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    /// The entity that declares `source`.
    pub entity: Id,
    pub source: Spanned<Id>,
    /// Flattened properties traversed to reach `entity`, outermost first.
    pub base_path: Vec<Id>,
    /// The output name.
    pub name: Id,
    pub alias: Option<Id>,
    pub nullability: Option<Spanned<NullabilityOverride>>,
    /// Set when a flattened association on the path is nullable.
    pub through_nullable: bool,
    pub shape: Shape,
    /// Whether the property was written out rather than produced by a macro.
    pub explicit: bool,
}

/// An expanded selection body against one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedBody {
    pub entity: Id,
    /// Name of the DTO type this body becomes.
    pub type_name: Id,
    pub refs: Vec<PropertyRef>,
    /// User-defined properties, only ever present on a declaration's own body.
    pub users: Vec<UserPropItem>,
}

/// The synthesized output name of an id-only selection without an id view:
/// `department` becomes `departmentId`, `employees` becomes `employeeIds`.
pub fn id_only_name(property: Id, many: bool) -> Id {
    let text = property.as_string();
    if many {
        let singular = text.strip_suffix('s').unwrap_or(&text);
        Id::new(&format!("{singular}Ids"))
    } else {
        Id::new(&format!("{text}Id"))
    }
}

/// Where a body is written; decides which items it may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Declaration,
    Nested,
    Flatten,
    AliasGroup,
}

impl Placement {
    fn describe(self) -> &'static str {
        match self {
            Placement::Declaration => "a declaration body",
            Placement::Nested => "a nested selection",
            Placement::Flatten => "a `flat(..)` body",
            Placement::AliasGroup => "an alias group",
        }
    }
}

/// Names a body selects explicitly, alias groups included.
fn explicit_names(items: &[Item], names: &mut HashSet<Id>) {
    for item in items {
        match item {
            Item::Property(p) => {
                names.insert(*p.name.inner());
            }
            Item::IdOnly(i) => {
                names.insert(*i.property.inner());
            }
            Item::Flatten(f) => {
                names.insert(*f.property.inner());
            }
            Item::AliasGroup(group) => explicit_names(&group.body.items, names),
            Item::Macro(_) | Item::Negative(_) | Item::UserProp(_) => {}
        }
    }
}

fn not_allowed(what: &str, span: Span, placement: Placement) -> Diagnostic {
    Diagnostic::error(format!("{what} is not allowed in {}", placement.describe()))
        .with_code(ErrorCode::E207)
        .with_label(span, "not allowed here")
}

/// An enclosing DTO type: its entity and name.
#[derive(Debug, Clone, Copy)]
struct Scope {
    entity: Id,
    type_name: Id,
}

/// Expands macros against a resolved schema.
pub struct Expander<'s, 'p, P: SchemaProvider + ?Sized> {
    schema: &'s ResolvedSchema<'p, P>,
}

impl<'s, 'p, P: SchemaProvider + ?Sized> Expander<'s, 'p, P> {
    pub fn new(schema: &'s ResolvedSchema<'p, P>) -> Self {
        Self { schema }
    }

    /// Expand the body of the declaration `type_name` against `entity`.
    pub fn expand(&self, body: &Body, entity: Id, type_name: Id) -> Result<ExpandedBody> {
        let scopes = [Scope { entity, type_name }];
        let refs = self.expand_body(body, entity, &scopes, Placement::Declaration)?;
        let users: Vec<UserPropItem> = body
            .items
            .iter()
            .filter_map(|item| match item {
                Item::UserProp(user) => Some(user.clone()),
                _ => None,
            })
            .collect();
        trace!(dto:% = type_name, properties = refs.len(), users = users.len(); "Expanded declaration body");
        Ok(ExpandedBody {
            entity,
            type_name,
            refs,
            users,
        })
    }

    fn expand_body(
        &self,
        body: &Body,
        entity: Id,
        scopes: &[Scope],
        placement: Placement,
    ) -> Result<Vec<PropertyRef>> {
        let mut explicit = HashSet::new();
        explicit_names(&body.items, &mut explicit);

        let mut negatives: Vec<Spanned<Id>> = Vec::new();
        for item in &body.items {
            let Item::Negative(name) = item else {
                continue;
            };
            if let Some(first) = negatives.iter().find(|n| n.inner() == name.inner()) {
                return Err(Diagnostic::error(format!("negative property `-{name}` is written more than once"))
                    .with_code(ErrorCode::E206)
                    .with_label(name.span(), "duplicate negative property")
                    .with_secondary_label(first.span(), "first written here"));
            }
            negatives.push(*name);
        }

        let mut refs = self.expand_items(&body.items, entity, scopes, &explicit, placement, None)?;

        for negative in &negatives {
            let before = refs.len();
            refs.retain(|r| r.name != *negative.inner());
            if refs.len() == before {
                return Err(Diagnostic::error(format!("negative property `-{negative}` removes nothing"))
                    .with_code(ErrorCode::E203)
                    .with_label(negative.span(), "this body outputs no property of that name")
                    .with_help("a negative property names an output of the same body, such as `-departmentId`"));
            }
        }

        Ok(refs)
    }

    /// Expand `items` in order. Inside an alias group, `pattern` renames what
    /// each item produces unless the item has its own alias.
    fn expand_items(
        &self,
        items: &[Item],
        entity: Id,
        scopes: &[Scope],
        explicit: &HashSet<Id>,
        placement: Placement,
        pattern: Option<&AliasPattern>,
    ) -> Result<Vec<PropertyRef>> {
        let mut seen_macros: HashMap<Id, Span> = HashMap::new();
        let mut refs = Vec::new();

        for item in items {
            let mut produced = match item {
                Item::Macro(item) => {
                    if let Some(first) = seen_macros.insert(*item.name.inner(), item.name.span()) {
                        return Err(Diagnostic::error(format!(
                            "macro `#{}` is used more than once",
                            item.name
                        ))
                        .with_code(ErrorCode::E201)
                        .with_label(item.name.span(), "duplicate macro")
                        .with_secondary_label(first, "first used here"));
                    }
                    self.macro_candidates(item, entity)?
                        .into_iter()
                        .filter(|meta| !explicit.contains(&meta.name()))
                        .map(|meta| self.macro_ref(item, entity, meta))
                        .collect()
                }
                Item::Negative(name) => {
                    if placement == Placement::AliasGroup {
                        return Err(not_allowed("a negative property", name.span(), placement)
                            .with_help("write the negative property next to the alias group"));
                    }
                    Vec::new()
                }
                Item::UserProp(user) => {
                    if placement != Placement::Declaration {
                        return Err(not_allowed("a user-defined property", user.name.span(), placement)
                            .with_help("declare user-defined properties directly in the DTO type body"));
                    }
                    Vec::new()
                }
                Item::Property(item) => vec![self.property_ref(item, entity, scopes)?],
                Item::IdOnly(item) => vec![self.id_only_ref(item, entity)?],
                Item::Flatten(item) => self.flatten(item, entity, scopes)?,
                Item::AliasGroup(group) => self.alias_group(group, entity, scopes, explicit, placement)?,
            };

            if let Some(pattern) = pattern {
                if !item.has_alias() {
                    for r in &mut produced {
                        if r.alias.is_none() {
                            r.name = pattern.apply(r.name);
                            r.alias = Some(r.name);
                        }
                    }
                }
            }
            refs.extend(produced);
        }

        Ok(refs)
    }

    fn alias_group(
        &self,
        group: &AliasGroupItem,
        entity: Id,
        scopes: &[Scope],
        explicit: &HashSet<Id>,
        placement: Placement,
    ) -> Result<Vec<PropertyRef>> {
        if placement == Placement::AliasGroup {
            return Err(not_allowed("an alias group", group.pattern.span(), placement)
                .with_help("alias groups do not nest"));
        }
        let refs = self.expand_items(
            &group.body.items,
            entity,
            scopes,
            explicit,
            Placement::AliasGroup,
            Some(group.pattern.inner()),
        )?;
        trace!(pattern:% = group.pattern, properties = refs.len(); "Expanded alias group");
        Ok(refs)
    }

    /// The schema properties a macro selects, in schema order.
    fn macro_candidates(&self, item: &MacroItem, entity: Id) -> Result<Vec<&'p PropertyMeta>> {
        let properties = self.schema.properties_of_name(entity);
        let name = item.name.inner().as_string();
        let selected = match name.as_str() {
            ALL_SCALARS => properties
                .iter()
                .filter(|meta| meta.kind().is_scalar())
                .collect(),
            ALL_REFERENCES => properties
                .iter()
                .filter(|meta| matches!(meta.kind(), PropertyKind::Association { many: false, .. }))
                .collect(),
            _ => {
                return Err(Diagnostic::error(format!("unknown macro `#{name}`"))
                    .with_code(ErrorCode::E200)
                    .with_label(item.name.span(), "unknown macro")
                    .with_help(format!("expected `#{ALL_SCALARS}` or `#{ALL_REFERENCES}`")));
            }
        };
        Ok(selected)
    }

    fn macro_ref(&self, item: &MacroItem, entity: Id, meta: &PropertyMeta) -> PropertyRef {
        let source = Spanned::new(meta.name(), item.name.span());
        let (name, shape) = match meta.kind() {
            PropertyKind::Association { many, .. } => (id_only_name(meta.name(), *many), Shape::IdOnly),
            _ => (meta.name(), Shape::Value),
        };
        PropertyRef {
            entity,
            source,
            base_path: Vec::new(),
            name,
            alias: None,
            nullability: item.nullability,
            through_nullable: false,
            shape,
            explicit: false,
        }
    }

    fn property_ref(&self, item: &PropertyItem, entity: Id, scopes: &[Scope]) -> Result<PropertyRef> {
        let property = *item.name.inner();
        let meta = self.schema.property(entity, property);

        let shape = if item.recursive {
            if let Some(body) = &item.body {
                return Err(Diagnostic::error(format!(
                    "recursive property `{property}` cannot have a selection body"
                ))
                .with_code(ErrorCode::E204)
                .with_label(body.span, "unexpected selection")
                .with_help("a recursive property reuses the enclosing DTO type"));
            }
            self.recursive_shape(item, meta, entity, scopes)?
        } else if let Some(body) = &item.body {
            match meta {
                // Unknown properties are reported by the resolver
                None => Shape::Value,
                Some(meta) => match meta.kind().target() {
                    Some(target) => {
                        let type_name = Id::new(&format!("{NESTED_TYPE_PREFIX}{property}"));
                        let mut nested_scopes = scopes.to_vec();
                        nested_scopes.push(Scope {
                            entity: target,
                            type_name,
                        });
                        let refs = self.expand_body(body, target, &nested_scopes, Placement::Nested)?;
                        Shape::Nested(ExpandedBody {
                            entity: target,
                            type_name,
                            refs,
                            users: Vec::new(),
                        })
                    }
                    None => {
                        return Err(Diagnostic::error(format!(
                            "property `{property}` has no properties to select from"
                        ))
                        .with_code(ErrorCode::E204)
                        .with_label(body.span, "unexpected selection")
                        .with_secondary_label(item.name.span(), format!("{} property", meta.kind()))
                        .with_help("only associations and embedded values take a selection body"));
                    }
                },
            }
        } else {
            Shape::Value
        };

        Ok(PropertyRef {
            entity,
            source: item.name,
            base_path: Vec::new(),
            name: item.alias.map(|a| *a.inner()).unwrap_or(property),
            alias: item.alias.map(|a| *a.inner()),
            nullability: item.nullability,
            through_nullable: false,
            shape,
            explicit: true,
        })
    }

    /// A recursive selection must name an association whose target is one of
    /// the enclosing DTO types; the marker refers to the innermost such type.
    fn recursive_shape(
        &self,
        item: &PropertyItem,
        meta: Option<&PropertyMeta>,
        entity: Id,
        scopes: &[Scope],
    ) -> Result<Shape> {
        let property = *item.name.inner();
        let target = match meta.map(|m| m.kind()) {
            Some(PropertyKind::Association { target, .. }) => *target,
            Some(kind) => {
                return Err(ineligible("recursive selection", item.name)
                    .with_label(item.name.span(), format!("{kind} property"))
                    .with_help("recursion requires an association"));
            }
            None => {
                return Err(ineligible("recursive selection", item.name)
                    .with_label(item.name.span(), format!("`{entity}` has no such property")));
            }
        };

        if let Some(scope) = scopes.iter().rev().find(|scope| scope.entity == target) {
            return Ok(Shape::Recursive {
                type_name: scope.type_name,
            });
        }

        let reason = if self.schema.reaches(target, entity) {
            format!("`{target}` leads back to `{entity}`, but no enclosing DTO type is of `{target}`")
        } else {
            format!("`{target}` never leads back to `{entity}`")
        };
        Err(ineligible("recursive selection", item.name)
            .with_label(item.name.span(), reason)
            .with_help(format!("`{property}*` is only allowed on a self-referencing association")))
    }

    fn id_only_ref(&self, item: &IdOnlyItem, entity: Id) -> Result<PropertyRef> {
        let property = *item.property.inner();
        let meta = self.association(item.property, entity, "id-only selection")?;
        let many = meta.is_many();
        let alias = item.alias.map(|a| *a.inner());

        let owner = self.schema.entity(entity);
        let id_view = owner.and_then(|schema| schema.id_view_of(property));
        let (source, default_name, shape) = match id_view {
            Some(view) => (view.name(), view.name(), Shape::Value),
            None => (property, id_only_name(property, many), Shape::IdOnly),
        };

        Ok(PropertyRef {
            entity,
            source: Spanned::new(source, item.property.span()),
            base_path: Vec::new(),
            name: alias.unwrap_or(default_name),
            alias,
            nullability: item.nullability,
            through_nullable: false,
            shape,
            explicit: true,
        })
    }

    fn flatten(&self, item: &FlattenItem, entity: Id, scopes: &[Scope]) -> Result<Vec<PropertyRef>> {
        let property = *item.property.inner();
        let Some(meta) = self.schema.property(entity, property) else {
            return Err(ineligible("flatten", item.property)
                .with_label(item.property.span(), format!("`{entity}` has no such property")));
        };

        let target = match meta.kind() {
            PropertyKind::Association { target, many: false } => *target,
            PropertyKind::Scalar {
                embedded: Some(target),
            } => *target,
            PropertyKind::Association { many: true, .. } => {
                return Err(ineligible("flatten", item.property)
                    .with_label(item.property.span(), "to-many association")
                    .with_help("flattening requires a single-valued association or an embedded value"));
            }
            kind => {
                return Err(ineligible("flatten", item.property)
                    .with_label(item.property.span(), format!("{kind} property"))
                    .with_help("flattening requires a single-valued association or an embedded value"));
            }
        };

        let prefix = item.prefix.map(|p| *p.inner()).unwrap_or(property);
        let nullable = meta.is_nullable();
        let mut refs = self.expand_body(&item.body, target, scopes, Placement::Flatten)?;
        for r in &mut refs {
            r.name = r.name.prefixed(prefix);
            r.base_path.insert(0, property);
            r.through_nullable |= nullable;
        }
        Ok(refs)
    }

    fn association(&self, name: Spanned<Id>, entity: Id, usage: &str) -> Result<&'p PropertyMeta> {
        match self.schema.property(entity, *name.inner()) {
            Some(meta) if meta.kind().is_association() => Ok(meta),
            Some(meta) => Err(ineligible(usage, name)
                .with_label(name.span(), format!("{} property", meta.kind()))
                .with_help(format!("{usage} requires an association"))),
            None => Err(ineligible(usage, name)
                .with_label(name.span(), format!("`{entity}` has no such property"))),
        }
    }
}

fn ineligible(usage: &str, property: Spanned<Id>) -> Diagnostic {
    Diagnostic::error(format!("{usage} cannot be applied to `{property}`")).with_code(ErrorCode::E202)
}
