//! Identifier management using string interning.
//!
//! Entity names, property names, aliases and DTO names are compared and hashed
//! constantly during expansion and resolution, so they are stored as interned
//! symbols. Two identifiers with the same text are always the same [`Id`],
//! which makes an [`Id`] of a qualified entity name a stable schema identity.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn with_interner<R>(f: impl FnOnce(&mut DefaultStringInterner) -> R) -> R {
    let mut interner = INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock");
    f(&mut interner)
}

/// Interned identifier.
///
/// # Examples
///
/// ```
/// use prism_core::identifier::Id;
///
/// let name = Id::new("name");
/// assert_eq!(name, Id::new("name"));
/// assert_eq!(name, "name");
///
/// let entity = Id::new("com.example.hr.Department");
/// assert_eq!(entity.simple_name(), "Department");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from `&str`.
    pub fn new(name: &str) -> Self {
        Self(with_interner(|interner| interner.get_or_intern(name)))
    }

    /// Returns an owned copy of the identifier text.
    pub fn as_string(&self) -> String {
        with_interner(|interner| {
            interner
                .resolve(self.0)
                .expect("Symbol should exist in interner")
                .to_string()
        })
    }

    /// Joins two identifiers with a `.` separator.
    ///
    /// ```
    /// use prism_core::identifier::Id;
    ///
    /// let qualified = Id::new("com.example").join(Id::new("Department"));
    /// assert_eq!(qualified, "com.example.Department");
    /// ```
    pub fn join(&self, child: Id) -> Self {
        Self::new(&format!("{self}.{child}"))
    }

    /// The last `.`-separated segment of the identifier.
    pub fn simple_name(&self) -> String {
        let text = self.as_string();
        match text.rsplit_once('.') {
            Some((_, last)) => last.to_string(),
            None => text,
        }
    }

    /// Creates a new identifier with `prefix` prepended and the first
    /// character of `self` upper-cased (`manager` + `name` -> `managerName`).
    pub fn prefixed(&self, prefix: Id) -> Self {
        let text = self.as_string();
        let mut chars = text.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self::new(&format!("{prefix}{capitalized}"))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.as_string();
        f.write_str(&text)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`
    fn eq(&self, other: &str) -> bool {
        with_interner(|interner| interner.resolve(self.0) == Some(other))
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}
