//! Lexical analyzer for DTO source text.
//!
//! The public entry point is [`tokenize`], which recovers from errors and
//! reports every lexical problem of a source in one pass.

use winnow::{
    Parser as _,
    ascii::digit1,
    combinator::{alt, cut_err, delimited, not, opt, peek, preceded, repeat, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, none_of, one_of, take_until, take_while},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, DiagnosticError, ErrorCode},
    span::Span,
    tokens::{PositionedToken, Token},
};

/// Rich diagnostic information for lexer errors.
///
/// Attached to winnow errors via `.context()`. The reported span runs from
/// `start` to the position where lexing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<LexerDiagnostic>>;

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// A committed error at the current position.
fn cut_error(input: &Input<'_>, diagnostic: LexerDiagnostic) -> ErrMode<ContextError<LexerDiagnostic>> {
    ErrMode::Cut(ContextError::new().add_context(input, &input.checkpoint(), diagnostic))
}

/// Parse an escape sequence after the backslash.
fn string_escape(input: &mut Input<'_>) -> IResult<char> {
    let escape_start = input.current_token_start();

    '\\'.parse_next(input)?;

    let unicode = preceded(
        'u',
        delimited('{', take_while(1..=6, |c: char| c.is_ascii_hexdigit()), '}'),
    )
    .verify_map(|hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32));

    let simple = one_of(['n', 'r', 't', '\\', '\'', '"', '0']).map(|c| match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        other => other,
    });

    cut_err(alt((unicode, simple)))
        .context(LexerDiagnostic {
            code: ErrorCode::E003,
            message: "invalid escape sequence",
            help: Some("valid escapes: `\\n`, `\\r`, `\\t`, `\\\\`, `\\'`, `\\\"`, `\\0`, `\\u{XXXX}`"),
            start: escape_start,
        })
        .parse_next(input)
}

/// Parse a double-quoted string literal.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();

    '"'.parse_next(input)?;

    let content = repeat(0.., alt((string_escape, none_of(['"', '\\', '\n', '\r'])))).fold(
        String::new,
        |mut acc, ch| {
            acc.push(ch);
            acc
        },
    );

    cut_err(terminated(content, '"'))
        .context(LexerDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated string literal",
            help: Some("add closing `\"`"),
            start,
        })
        .map(Token::StringLiteral)
        .parse_next(input)
}

/// Parse an integer or decimal literal. Signs are separate tokens.
fn number_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();

    let text: &str = (digit1, opt(('.', digit1)), peek(not(one_of(is_identifier_char))))
        .take()
        .parse_next(input)?;

    let out_of_range = LexerDiagnostic {
        code: ErrorCode::E005,
        message: "numeric literal out of range",
        help: Some("integers must fit in a signed 64-bit value"),
        start,
    };

    if text.contains('.') {
        text.parse::<f64>()
            .map(Token::FloatLiteral)
            .map_err(|_| cut_error(input, out_of_range))
    } else {
        text.parse::<i64>()
            .map(Token::IntegerLiteral)
            .map_err(|_| cut_error(input, out_of_range))
    }
}

/// Parse a `//` comment up to, not including, the newline.
fn line_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded("//", take_while(0.., |c| c != '\n'))
        .map(Token::LineComment)
        .parse_next(input)
}

/// Parse a `/* ... */` comment.
fn block_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();

    preceded(
        "/*",
        cut_err(terminated(take_until(0.., "*/"), "*/")).context(LexerDiagnostic {
            code: ErrorCode::E004,
            message: "unterminated block comment",
            help: Some("add closing `*/`"),
            start,
        }),
    )
    .map(Token::BlockComment)
    .parse_next(input)
}

/// Parse keywords with word boundary checking.
///
/// Every other word of the language (`input`, `flat`, `id`, ...) is
/// contextual and lexed as an identifier.
fn keyword<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    terminated(
        alt((literal("export"), literal("as"))),
        peek(not(one_of(is_identifier_char))),
    )
    .map(|keyword: &str| match keyword {
        "export" => Token::Export,
        _ => Token::As,
    })
    .parse_next(input)
}

/// Parse identifiers
fn identifier<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., is_identifier_char)
        .verify(|s: &str| s.chars().next().is_some_and(|c| !c.is_ascii_digit()))
        .map(Token::Identifier)
        .parse_next(input)
}

/// Parse brackets and delimiters
fn delimiter<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        '('.value(Token::LeftParen),
        ')'.value(Token::RightParen),
        '{'.value(Token::LeftBrace),
        '}'.value(Token::RightBrace),
        '['.value(Token::LeftBracket),
        ']'.value(Token::RightBracket),
        ','.value(Token::Comma),
        ';'.value(Token::Semicolon),
    ))
    .parse_next(input)
}

/// Parse operators; `->` before the single character ones
fn operator<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        "->".value(Token::Arrow),
        '@'.value(Token::At),
        '#'.value(Token::Hash),
        '.'.value(Token::Dot),
        '='.value(Token::Equals),
        '?'.value(Token::Question),
        '!'.value(Token::Bang),
        '*'.value(Token::Star),
        '-'.value(Token::Minus),
        ':'.value(Token::Colon),
        '^'.value(Token::Caret),
        '<'.value(Token::LessThan),
        '>'.value(Token::GreaterThan),
    ))
    .parse_next(input)
}

/// Parse whitespace other than newlines
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n')
        .value(Token::Whitespace)
        .parse_next(input)
}

/// Parse newline
fn newline<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// Parse a single token with position tracking
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        line_comment,   // Must come before block comments
        block_comment,  // Must come before operators
        string_literal, // Must come before any single char
        keyword,        // Must come before identifier
        number_literal, // Must come before identifier
        identifier,
        delimiter,
        operator,
        newline, // Must come before whitespace
        whitespace,
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();

    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Tokenize the input, collecting tokens and errors.
    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_token(&mut input) {
                Ok(token) => self.tokens.push(token),
                Err(e) => {
                    let error_pos = input.current_token_start();
                    self.diagnostics.emit(Self::convert_err_mode(e, error_pos));

                    // Skip one character and keep going so later errors are
                    // reported too.
                    if !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }
    }

    fn finish(self) -> Result<Vec<PositionedToken<'a>>, DiagnosticError> {
        self.diagnostics.finish().map(|()| self.tokens)
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E002 (unexpected character) if no diagnostic context is
    /// attached.
    fn convert_err_mode(err: ErrMode<ContextError<LexerDiagnostic>>, error_pos: usize) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let span = Span::new(*start..error_pos.max(*start + 1));

            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(span, code.description());
            if let Some(h) = help {
                diag = diag.with_help(*h);
            }
            return diag;
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1));
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E002)
            .with_label(span, ErrorCode::E002.description())
    }
}

/// Split source text into tokens, collecting every lexical error.
///
/// # Errors
///
/// Returns a [`DiagnosticError`] holding one diagnostic per lexical error.
pub fn tokenize(input: &str) -> Result<Vec<PositionedToken<'_>>, DiagnosticError> {
    let mut lexer = Lexer::new();
    lexer.tokenize(LocatingSlice::new(input));
    lexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_token(input: &str) -> Token<'_> {
        let mut located = LocatingSlice::new(input);
        let positioned = positioned_token(&mut located).expect("Failed to lex");
        positioned.token
    }

    fn significant(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .expect("Failed to tokenize")
            .into_iter()
            .map(|t| t.token)
            .filter(|t| !t.is_trivia())
            .collect()
    }

    #[test]
    fn test_keywords_and_word_boundaries() {
        assert_eq!(single_token("export"), Token::Export);
        assert_eq!(single_token("as"), Token::As);
        assert_eq!(single_token("exported"), Token::Identifier("exported"));
        assert_eq!(single_token("assignee"), Token::Identifier("assignee"));
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(single_token("name"), Token::Identifier("name"));
        assert_eq!(single_token("_private"), Token::Identifier("_private"));
        assert_eq!(single_token("TargetOf_x"), Token::Identifier("TargetOf_x"));
        assert_eq!(single_token("flat"), Token::Identifier("flat"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(single_token("42"), Token::IntegerLiteral(42));
        assert_eq!(single_token("2.5"), Token::FloatLiteral(2.5));
        assert_eq!(
            significant("-7"),
            vec![Token::Minus, Token::IntegerLiteral(7)]
        );
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            single_token("\"hello world\""),
            Token::StringLiteral("hello world".to_string())
        );
        assert_eq!(
            single_token(r#""tab\there \"quoted\" \u{41}""#),
            Token::StringLiteral("tab\there \"quoted\" A".to_string())
        );
        assert_eq!(single_token("\"\""), Token::StringLiteral(String::new()));
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            single_token("// trailing"),
            Token::LineComment(" trailing")
        );
        assert_eq!(single_token("/* block */"), Token::BlockComment(" block "));
        assert_eq!(
            significant("a /* x */ b // y\nc"),
            vec![
                Token::Identifier("a"),
                Token::Identifier("b"),
                Token::Identifier("c"),
            ]
        );
    }

    #[test]
    fn test_declaration_tokens() {
        let tokens = significant("input DepartmentInput { #allScalars? -name id(employees) as staff }");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("input"),
                Token::Identifier("DepartmentInput"),
                Token::LeftBrace,
                Token::Hash,
                Token::Identifier("allScalars"),
                Token::Question,
                Token::Minus,
                Token::Identifier("name"),
                Token::Identifier("id"),
                Token::LeftParen,
                Token::Identifier("employees"),
                Token::RightParen,
                Token::As,
                Token::Identifier("staff"),
                Token::RightBrace,
            ]
        );
    }

    #[test]
    fn test_user_property_and_alias_group_tokens() {
        assert_eq!(
            significant("tags: Map<String, List<Long>>? = -1"),
            vec![
                Token::Identifier("tags"),
                Token::Colon,
                Token::Identifier("Map"),
                Token::LessThan,
                Token::Identifier("String"),
                Token::Comma,
                Token::Identifier("List"),
                Token::LessThan,
                Token::Identifier("Long"),
                Token::GreaterThan,
                Token::GreaterThan,
                Token::Question,
                Token::Equals,
                Token::Minus,
                Token::IntegerLiteral(1),
            ]
        );
        assert_eq!(
            significant("as(^old->new) as(Name$ -> Title)"),
            vec![
                Token::As,
                Token::LeftParen,
                Token::Caret,
                Token::Identifier("old"),
                Token::Arrow,
                Token::Identifier("new"),
                Token::RightParen,
                Token::As,
                Token::LeftParen,
                Token::Identifier("Name$"),
                Token::Arrow,
                Token::Identifier("Title"),
                Token::RightParen,
            ]
        );
        assert_eq!(significant("-name"), vec![Token::Minus, Token::Identifier("name")]);
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("export a.B").unwrap();
        assert_eq!(tokens[0].span, Span::new(0..6));
        assert_eq!(tokens[2].span, Span::new(7..8));
        assert_eq!(tokens[4].span, Span::new(9..10));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("@Doc(\"open").unwrap_err();
        let diag = &err.diagnostics()[0];
        assert_eq!(diag.code(), Some(ErrorCode::E001));
        assert_eq!(diag.labels()[0].span().start(), 5);
    }

    #[test]
    fn test_invalid_escape() {
        let err = tokenize(r#""bad \q""#).unwrap_err();
        assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E003));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = tokenize("name /* never closed").unwrap_err();
        assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E004));
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E005));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let err = tokenize("name % other ~ last").unwrap_err();
        assert_eq!(err.diagnostics().len(), 2);
        assert!(
            err.diagnostics()
                .iter()
                .all(|d| d.code() == Some(ErrorCode::E002))
        );
        assert_eq!(err.diagnostics()[0].labels()[0].span(), Span::new(5..6));
    }
}
