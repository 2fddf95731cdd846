//! Parser AST types
//!
//! The syntax tree of one DTO source file. It records what was written and
//! where, and performs no schema lookups; property names stay unresolved
//! until macro expansion and resolution.
//!
//! Leaf values are wrapped in [`Spanned<T>`] so later phases can point at
//! the offending source text.

use std::fmt;

use prism_core::{
    dto::{AnnotationValue, DefaultValue, NullabilityOverride, NullableInputStrategy, TypeRef},
    identifier::Id,
};

use crate::span::{Span, Spanned};

/// A modifier word written before a declaration name or in a `default`
/// statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Input,
    Specification,
    NullableInput(NullableInputStrategy),
    /// Allow selection of the logically-deleted marker.
    Deleted,
}

impl Modifier {
    /// Parse a contextual modifier word.
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "input" => Some(Modifier::Input),
            "specification" => Some(Modifier::Specification),
            "deleted" => Some(Modifier::Deleted),
            other => other.parse().ok().map(Modifier::NullableInput),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Input => write!(f, "input"),
            Modifier::Specification => write!(f, "specification"),
            Modifier::NullableInput(strategy) => write!(f, "{strategy}"),
            Modifier::Deleted => write!(f, "deleted"),
        }
    }
}

/// `@Name` or `@Name(arg = value, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: Spanned<Id>,
    pub arguments: Vec<(Spanned<Id>, Spanned<AnnotationValue>)>,
}

/// A selection body: `{ item item, item }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub items: Vec<Item>,
    pub span: Span,
}

/// A plain property selection, optionally recursive, aliased or with a
/// nested body: `employees* ? as staff { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyItem {
    pub name: Spanned<Id>,
    pub recursive: bool,
    pub nullability: Option<Spanned<NullabilityOverride>>,
    pub alias: Option<Spanned<Id>>,
    pub body: Option<Body>,
}

/// `#allScalars?`
#[derive(Debug, Clone, PartialEq)]
pub struct MacroItem {
    pub name: Spanned<Id>,
    pub nullability: Option<Spanned<NullabilityOverride>>,
}

/// `flat(manager) as boss { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenItem {
    pub property: Spanned<Id>,
    pub prefix: Option<Spanned<Id>>,
    pub body: Body,
}

/// `id(department)? as departmentKey`
#[derive(Debug, Clone, PartialEq)]
pub struct IdOnlyItem {
    pub property: Spanned<Id>,
    pub nullability: Option<Spanned<NullabilityOverride>>,
    pub alias: Option<Spanned<Id>>,
}

/// `@Doc("...") remark: String? = null`
#[derive(Debug, Clone, PartialEq)]
pub struct UserPropItem {
    pub annotations: Vec<Annotation>,
    pub name: Spanned<Id>,
    pub type_ref: Spanned<TypeRef>,
    pub default: Option<Spanned<DefaultValue>>,
}

/// The renaming rule of an alias group: `[^][text][$] -> [replacement]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPattern {
    pub prefix: bool,
    pub suffix: bool,
    pub original: String,
    pub replacement: String,
}

impl AliasPattern {
    /// Rename `name`. Names the pattern does not match are returned as is.
    ///
    /// ```text
    /// ^ -> old        name     -> oldName
    /// $ -> Text       name     -> nameText
    /// ^old ->         oldName  -> name
    /// Name$ -> Title  fullName -> fullTitle
    /// a -> o          banana   -> bonono
    /// ```
    pub fn apply(&self, name: Id) -> Id {
        let text = name.as_string();
        let renamed = match (self.prefix, self.suffix, self.original.is_empty()) {
            (true, false, true) => format!("{}{}", self.replacement, capitalize(&text)),
            (false, true, true) => format!("{text}{}", self.replacement),
            (true, true, false) if text == self.original => self.replacement.clone(),
            (true, false, false) => match text.strip_prefix(self.original.as_str()) {
                Some(rest) if self.replacement.is_empty() => decapitalize(rest),
                Some(rest) => format!("{}{}", self.replacement, capitalize(rest)),
                None => return name,
            },
            (false, true, false) => match text.strip_suffix(self.original.as_str()) {
                Some(rest) => format!("{rest}{}", self.replacement),
                None => return name,
            },
            (false, false, false) => text.replace(self.original.as_str(), &self.replacement),
            _ => return name,
        };
        if renamed.is_empty() {
            name
        } else {
            Id::new(&renamed)
        }
    }
}

impl fmt::Display for AliasPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix {
            write!(f, "^")?;
        }
        write!(f, "{}", self.original)?;
        if self.suffix {
            write!(f, "$")?;
        }
        write!(f, " -> {}", self.replacement)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `as(^ -> prefix) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct AliasGroupItem {
    pub pattern: Spanned<AliasPattern>,
    pub body: Body,
}

/// One selection item of a body.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Property(PropertyItem),
    Macro(MacroItem),
    Flatten(FlattenItem),
    IdOnly(IdOnlyItem),
    /// `-name`
    Negative(Spanned<Id>),
    UserProp(UserPropItem),
    AliasGroup(AliasGroupItem),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Property(item) => {
                let mut span = item.name.span();
                if let Some(alias) = &item.alias {
                    span = span.union(alias.span());
                }
                span
            }
            Item::Macro(item) => item.name.span(),
            Item::Flatten(item) => item.property.span(),
            Item::IdOnly(item) => item.property.span(),
            Item::Negative(name) => name.span(),
            Item::UserProp(item) => item.name.span().union(item.type_ref.span()),
            Item::AliasGroup(item) => item.pattern.span(),
        }
    }

    /// Whether the item names its own output with `as`.
    pub fn has_alias(&self) -> bool {
        match self {
            Item::Property(item) => item.alias.is_some(),
            Item::Flatten(item) => item.prefix.is_some(),
            Item::IdOnly(item) => item.alias.is_some(),
            _ => false,
        }
    }
}

/// A named DTO declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: Spanned<Id>,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Spanned<Modifier>>,
    pub body: Body,
}

/// A parsed DTO source file.
///
/// All declarations are against the single entity named by the `export`
/// statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DtoFile {
    pub entity: Spanned<Id>,
    pub modifiers: Vec<Spanned<Modifier>>,
    pub declarations: Vec<Declaration>,
}

impl DtoFile {
    /// The names of all declarations in source order.
    pub fn declaration_names(&self) -> Vec<Id> {
        self.declarations.iter().map(|d| *d.name.inner()).collect()
    }
}
