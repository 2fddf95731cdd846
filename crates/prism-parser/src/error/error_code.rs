//! Error codes for the DTO compiler diagnostics.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors
//! - `E2xx` - Macro expansion errors
//! - `E3xx` - Resolution errors

use std::fmt;

/// The user-facing category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed DTO syntax.
    Parse,
    /// Illegal macro use or an otherwise illegal declaration.
    Semantic,
    /// A selected property does not exist on the entity.
    UnresolvedProperty,
    /// Two selections produce the same output, or one property is selected twice.
    DuplicateProperty,
    /// A computed property depends on a property the entity does not have.
    ComputedDependency,
    /// A DTO file exports an entity the schema does not know.
    UnknownEntity,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Parse => "parse error",
            ErrorKind::Semantic => "semantic error",
            ErrorKind::UnresolvedProperty => "unresolved property",
            ErrorKind::DuplicateProperty => "duplicate property",
            ErrorKind::ComputedDependency => "computed dependency error",
            ErrorKind::UnknownEntity => "unknown entity",
        };
        f.write_str(s)
    }
}

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    E001,

    /// Unexpected character.
    E002,

    /// Invalid escape sequence.
    ///
    /// Valid escapes are: `\n`, `\r`, `\t`, `\\`, `\'`, `\"`, `\0`, `\u{...}`.
    E003,

    /// Unterminated block comment.
    E004,

    /// Numeric literal out of range.
    E005,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    E100,

    /// Incomplete input.
    E101,

    /// Unknown modifier word before a declaration name.
    E102,

    // =========================================================================
    // Macro Expansion Errors (E2xx)
    // =========================================================================
    /// Unknown macro name.
    E200,

    /// The same macro is used twice in one body.
    E201,

    /// A macro is applied to a property of the wrong kind.
    ///
    /// Flattening requires a single-valued association or an embedded value,
    /// id-only requires an association and recursion requires an association
    /// that leads back to the entity.
    E202,

    /// A negative property removes nothing.
    E203,

    /// A nested selection on a property that has no structure to select from.
    E204,

    /// Two DTO types in one file share a name.
    E205,

    /// The same negative property appears twice in one body.
    E206,

    /// An item kind that is not allowed where it appears, e.g. a user-defined
    /// property inside `flat(..)`.
    E207,

    // =========================================================================
    // Resolution Errors (E3xx)
    // =========================================================================
    /// Unresolved property.
    E300,

    /// Duplicate property.
    E301,

    /// Computed property with a dependency the entity does not have.
    E302,

    /// Logically-deleted marker selected without the `deleted` modifier.
    E303,

    /// Non-null override outside an input DTO.
    E304,

    /// Conflicting modifiers.
    E305,

    /// Malformed mutability annotation.
    E306,

    /// User-defined property whose type, nullability and default disagree.
    E307,

    /// The exported entity is not in the schema.
    E308,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            // Parser errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            // Macro expansion errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
            // Resolution errors
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
            ErrorCode::E305 => "E305",
            ErrorCode::E306 => "E306",
            ErrorCode::E307 => "E307",
            ErrorCode::E308 => "E308",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "invalid escape sequence",
            ErrorCode::E004 => "unterminated block comment",
            ErrorCode::E005 => "numeric literal out of range",
            // Parser errors
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E102 => "unknown modifier",
            // Macro expansion errors
            ErrorCode::E200 => "unknown macro",
            ErrorCode::E201 => "duplicate macro",
            ErrorCode::E202 => "ineligible macro target",
            ErrorCode::E203 => "negative property removes nothing",
            ErrorCode::E204 => "nested selection not allowed",
            ErrorCode::E205 => "duplicate DTO type",
            ErrorCode::E206 => "duplicate negative property",
            ErrorCode::E207 => "item not allowed here",
            // Resolution errors
            ErrorCode::E300 => "unresolved property",
            ErrorCode::E301 => "duplicate property",
            ErrorCode::E302 => "unresolved computed dependency",
            ErrorCode::E303 => "logically-deleted property selected",
            ErrorCode::E304 => "non-null override outside input",
            ErrorCode::E305 => "conflicting modifiers",
            ErrorCode::E306 => "invalid mutability annotation",
            ErrorCode::E307 => "invalid user-defined property",
            ErrorCode::E308 => "unknown entity",
        }
    }

    /// Returns the category this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::E001
            | ErrorCode::E002
            | ErrorCode::E003
            | ErrorCode::E004
            | ErrorCode::E005
            | ErrorCode::E100
            | ErrorCode::E101
            | ErrorCode::E102 => ErrorKind::Parse,
            ErrorCode::E300 => ErrorKind::UnresolvedProperty,
            ErrorCode::E301 => ErrorKind::DuplicateProperty,
            ErrorCode::E302 => ErrorKind::ComputedDependency,
            ErrorCode::E308 => ErrorKind::UnknownEntity,
            ErrorCode::E200
            | ErrorCode::E201
            | ErrorCode::E202
            | ErrorCode::E203
            | ErrorCode::E204
            | ErrorCode::E205
            | ErrorCode::E206
            | ErrorCode::E207
            | ErrorCode::E303
            | ErrorCode::E304
            | ErrorCode::E305
            | ErrorCode::E306
            | ErrorCode::E307 => ErrorKind::Semantic,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
