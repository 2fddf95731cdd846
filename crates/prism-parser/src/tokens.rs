//! Token definitions for the DTO language.

use std::fmt;

use crate::span::Span;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Keywords
    Export,
    As,

    // Literals
    StringLiteral(String),
    IntegerLiteral(i64),
    FloatLiteral(f64),
    Identifier(&'src str),

    // Punctuation
    At,           // @
    Hash,         // #
    Dot,          // .
    Comma,        // ,
    Semicolon,    // ;
    Equals,       // =
    Question,     // ?
    Bang,         // !
    Star,         // *
    Minus,        // -
    Colon,        // :
    Caret,        // ^
    Arrow,        // ->
    LessThan,     // <
    GreaterThan,  // >
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]

    // Comments
    LineComment(&'src str),
    BlockComment(&'src str),

    // Whitespace
    Whitespace,
    Newline,
}

impl Token<'_> {
    /// Returns `true` for tokens the parser skips between meaningful tokens.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::Whitespace | Token::Newline | Token::LineComment(_) | Token::BlockComment(_)
        )
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Export => write!(f, "export"),
            Token::As => write!(f, "as"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::IntegerLiteral(n) => write!(f, "{n}"),
            Token::FloatLiteral(n) => write!(f, "{n}"),
            Token::Identifier(name) => write!(f, "{name}"),
            Token::At => write!(f, "@"),
            Token::Hash => write!(f, "#"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Equals => write!(f, "="),
            Token::Question => write!(f, "?"),
            Token::Bang => write!(f, "!"),
            Token::Star => write!(f, "*"),
            Token::Minus => write!(f, "-"),
            Token::Colon => write!(f, ":"),
            Token::Caret => write!(f, "^"),
            Token::Arrow => write!(f, "->"),
            Token::LessThan => write!(f, "<"),
            Token::GreaterThan => write!(f, ">"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LineComment(text) => write!(f, "//{text}"),
            Token::BlockComment(text) => write!(f, "/*{text}*/"),
            Token::Whitespace => write!(f, " "),
            Token::Newline => writeln!(f),
        }
    }
}

/// A token with position information for winnow integration
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}
