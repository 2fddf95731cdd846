//! Parser for DTO source tokens.
//!
//! This module turns the token stream produced by the [`lexer`](super::lexer)
//! into a [`DtoFile`](types::DtoFile). The public entry point is
//! [`build_file`].
//!
//! Trivia (whitespace, newlines and comments) may appear between any two
//! tokens; every parser here skips it before looking at the next token.

use winnow::{
    Parser as _,
    combinator::repeat,
    error::{AddContext, ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use prism_core::{
    dto::{AnnotationValue, DefaultValue, DtoAnnotation, NullabilityOverride, TypeRef},
    identifier::Id,
};

use crate::{
    error::{Diagnostic, ErrorCode},
    parser_types as types,
    span::{Span, Spanned},
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what was expected at the failure position
    Label(&'static str),
}

type Input<'src> = TokenSlice<'src, PositionedToken<'src>>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;

/// A committed error at the current position.
fn cut_here(input: &Input<'_>, label: &'static str) -> ErrMode<ContextError<Context>> {
    ErrMode::Cut(ContextError::new().add_context(input, &input.checkpoint(), Context::Label(label)))
}

/// Skip whitespace, newlines and comments
fn trivia<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(
        0..,
        any.verify(|token: &PositionedToken<'_>| token.token.is_trivia())
            .void(),
    )
    .parse_next(input)
}

/// Consume the next significant token if `matches` accepts it.
fn expect<'src>(
    input: &mut Input<'src>,
    label: &'static str,
    matches: impl Fn(&Token<'_>) -> bool,
) -> IResult<Span> {
    trivia(input)?;
    any.verify_map(|token: &'src PositionedToken<'src>| matches(&token.token).then_some(token.span))
        .context(Context::Label(label))
        .parse_next(input)
}

/// Like [`expect`], but leaves the input untouched on mismatch.
fn eat<'src>(input: &mut Input<'src>, matches: impl Fn(&Token<'_>) -> bool) -> Option<Span> {
    let checkpoint = input.checkpoint();
    match expect(input, "", matches) {
        Ok(span) => Some(span),
        Err(_) => {
            input.reset(&checkpoint);
            None
        }
    }
}

/// Check the next significant token without consuming anything.
fn peek_is<'src>(input: &mut Input<'src>, matches: impl Fn(&Token<'_>) -> bool) -> bool {
    let checkpoint = input.checkpoint();
    let found = eat(input, matches).is_some();
    input.reset(&checkpoint);
    found
}

fn identifier<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    trivia(input)?;
    any.verify_map(|token: &'src PositionedToken<'src>| match token.token {
        Token::Identifier(name) => Some(Spanned::new(name, token.span)),
        _ => None,
    })
    .context(Context::Label("identifier"))
    .parse_next(input)
}

fn try_identifier<'src>(input: &mut Input<'src>) -> Option<Spanned<&'src str>> {
    let checkpoint = input.checkpoint();
    match identifier(input) {
        Ok(name) => Some(name),
        Err(_) => {
            input.reset(&checkpoint);
            None
        }
    }
}

fn name_id(name: Spanned<&str>) -> Spanned<Id> {
    name.map(Id::new)
}

/// Parse a dotted name: `com.example.Department`
fn qualified_name<'src>(input: &mut Input<'src>) -> IResult<Spanned<Id>> {
    let first = identifier(input)?;
    let mut text = first.inner().to_string();
    let mut span = first.span();

    while eat(input, |t| matches!(t, Token::Dot)).is_some() {
        let segment = identifier(input)?;
        text.push('.');
        text.push_str(segment.inner());
        span = span.union(segment.span());
    }

    Ok(Spanned::new(Id::new(&text), span))
}

/// Parse an optional `?` or `!`
fn nullability<'src>(input: &mut Input<'src>) -> Option<Spanned<NullabilityOverride>> {
    if let Some(span) = eat(input, |t| matches!(t, Token::Question)) {
        return Some(Spanned::new(NullabilityOverride::Nullable, span));
    }
    eat(input, |t| matches!(t, Token::Bang))
        .map(|span| Spanned::new(NullabilityOverride::NonNull, span))
}

/// Parse an optional `as alias`
fn alias<'src>(input: &mut Input<'src>) -> IResult<Option<Spanned<Id>>> {
    let checkpoint = input.checkpoint();
    if eat(input, |t| matches!(t, Token::As)).is_none() {
        return Ok(None);
    }
    // `as(` opens the next item, an alias group
    if peek_is(input, |t| matches!(t, Token::LeftParen)) {
        input.reset(&checkpoint);
        return Ok(None);
    }
    Ok(Some(name_id(identifier(input)?)))
}

/// Parse a literal annotation value.
///
/// Accepts strings, optionally negated numbers, `true`/`false`, enum
/// constants written as dotted names, and bracketed lists.
fn annotation_value<'src>(input: &mut Input<'src>) -> IResult<Spanned<AnnotationValue>> {
    if let Some(open) = eat(input, |t| matches!(t, Token::LeftBracket)) {
        let mut values = Vec::new();
        let close = loop {
            if let Some(close) = eat(input, |t| matches!(t, Token::RightBracket)) {
                break close;
            }
            values.push(annotation_value(input)?.into_inner());
            if eat(input, |t| matches!(t, Token::Comma)).is_none() {
                break expect(input, "`]`", |t| matches!(t, Token::RightBracket))?;
            }
        };
        return Ok(Spanned::new(AnnotationValue::List(values), open.union(close)));
    }

    let negative = eat(input, |t| matches!(t, Token::Minus));
    trivia(input)?;
    let checkpoint = input.checkpoint();

    let literal = any
        .verify_map(|token: &'src PositionedToken<'src>| {
            let value = match (&token.token, negative.is_some()) {
                (Token::IntegerLiteral(n), true) => AnnotationValue::Integer(-*n),
                (Token::IntegerLiteral(n), false) => AnnotationValue::Integer(*n),
                (Token::FloatLiteral(n), true) => AnnotationValue::Float(-*n),
                (Token::FloatLiteral(n), false) => AnnotationValue::Float(*n),
                (Token::StringLiteral(s), false) => AnnotationValue::String(s.clone()),
                (Token::Identifier("true"), false) => AnnotationValue::Boolean(true),
                (Token::Identifier("false"), false) => AnnotationValue::Boolean(false),
                _ => return None,
            };
            Some(Spanned::new(value, token.span))
        })
        .parse_next(input);

    match literal {
        Ok(value) => {
            let span = match negative {
                Some(minus) => minus.union(value.span()),
                None => value.span(),
            };
            return Ok(Spanned::new(value.into_inner(), span));
        }
        Err(ErrMode::Backtrack(_)) => input.reset(&checkpoint),
        Err(e) => return Err(e),
    }

    if negative.is_none() {
        if let Ok(constant) = qualified_name(input) {
            return Ok(constant.map(AnnotationValue::EnumConstant));
        }
        input.reset(&checkpoint);
    }

    Err(cut_here(input, "annotation value"))
}

/// Parse one annotation argument: `name = value` or a bare `value`
fn annotation_argument<'src>(
    input: &mut Input<'src>,
) -> IResult<(Spanned<Id>, Spanned<AnnotationValue>)> {
    let checkpoint = input.checkpoint();
    if let Some(name) = try_identifier(input) {
        if eat(input, |t| matches!(t, Token::Equals)).is_some() {
            let value = annotation_value(input)?;
            return Ok((name_id(name), value));
        }
        input.reset(&checkpoint);
    }

    let value = annotation_value(input)?;
    let name = Spanned::new(Id::new(DtoAnnotation::DEFAULT_ARGUMENT), value.span());
    Ok((name, value))
}

/// Parse an annotation: `@Name` or `@Name(arg = value, ...)`
fn annotation<'src>(input: &mut Input<'src>) -> IResult<types::Annotation> {
    expect(input, "`@`", |t| matches!(t, Token::At))?;
    let name = qualified_name(input)?;
    let mut arguments = Vec::new();

    if eat(input, |t| matches!(t, Token::LeftParen)).is_some()
        && eat(input, |t| matches!(t, Token::RightParen)).is_none()
    {
        loop {
            arguments.push(annotation_argument(input)?);
            if eat(input, |t| matches!(t, Token::Comma)).is_none() {
                break;
            }
        }
        expect(input, "`)`", |t| matches!(t, Token::RightParen))?;
    }

    Ok(types::Annotation { name, arguments })
}

/// Parse a selection body: `{ item, item }`
fn body<'src>(input: &mut Input<'src>) -> IResult<types::Body> {
    let open = expect(input, "`{`", |t| matches!(t, Token::LeftBrace))?;
    let mut items = Vec::new();

    loop {
        if let Some(close) = eat(input, |t| matches!(t, Token::RightBrace)) {
            return Ok(types::Body {
                items,
                span: open.union(close),
            });
        }
        items.push(item(input)?);
        eat(input, |t| matches!(t, Token::Comma));
    }
}

/// Parse one selection item.
fn item<'src>(input: &mut Input<'src>) -> IResult<types::Item> {
    if peek_is(input, |t| matches!(t, Token::At)) {
        let mut annotations = Vec::new();
        while peek_is(input, |t| matches!(t, Token::At)) {
            annotations.push(annotation(input)?);
        }
        let name = name_id(identifier(input)?);
        return user_prop_item(input, annotations, name).map(types::Item::UserProp);
    }

    if let Some(keyword) = eat(input, |t| matches!(t, Token::As)) {
        return alias_group_item(input, keyword).map(types::Item::AliasGroup);
    }

    if let Some(hash) = eat(input, |t| matches!(t, Token::Hash)) {
        let name = identifier(input)?;
        let name = Spanned::new(Id::new(name.inner()), hash.union(name.span()));
        let nullability = nullability(input);
        return Ok(types::Item::Macro(types::MacroItem { name, nullability }));
    }

    if eat(input, |t| matches!(t, Token::Minus)).is_some() {
        let name = identifier(input)?;
        return Ok(types::Item::Negative(name_id(name)));
    }

    let Some(name) = try_identifier(input) else {
        return Err(cut_here(input, "selection item or `}`"));
    };

    if peek_is(input, |t| matches!(t, Token::Colon)) {
        return user_prop_item(input, Vec::new(), name_id(name)).map(types::Item::UserProp);
    }

    match *name.inner() {
        "flat" | "flatten" if peek_is(input, |t| matches!(t, Token::LeftParen)) => {
            flatten_item(input).map(types::Item::Flatten)
        }
        "id" if peek_is(input, |t| matches!(t, Token::LeftParen)) => {
            id_only_item(input).map(types::Item::IdOnly)
        }
        _ => property_item(input, name_id(name)).map(types::Item::Property),
    }
}

/// The rest of `flat(property) as prefix { ... }` after the keyword
fn flatten_item<'src>(input: &mut Input<'src>) -> IResult<types::FlattenItem> {
    expect(input, "`(`", |t| matches!(t, Token::LeftParen))?;
    let property = name_id(identifier(input)?);
    expect(input, "`)`", |t| matches!(t, Token::RightParen))?;
    let prefix = alias(input)?;
    let body = body(input)?;

    Ok(types::FlattenItem {
        property,
        prefix,
        body,
    })
}

/// The rest of `id(property)? as alias` after the keyword
fn id_only_item<'src>(input: &mut Input<'src>) -> IResult<types::IdOnlyItem> {
    expect(input, "`(`", |t| matches!(t, Token::LeftParen))?;
    let property = name_id(identifier(input)?);
    expect(input, "`)`", |t| matches!(t, Token::RightParen))?;
    let mut nullability = nullability(input);
    let alias = alias(input)?;
    if nullability.is_none() {
        nullability = self::nullability(input);
    }

    Ok(types::IdOnlyItem {
        property,
        nullability,
        alias,
    })
}

/// The rest of `name*? as alias { ... }` after the name
fn property_item<'src>(input: &mut Input<'src>, name: Spanned<Id>) -> IResult<types::PropertyItem> {
    let recursive = eat(input, |t| matches!(t, Token::Star)).is_some();
    let mut nullability = nullability(input);
    let alias = alias(input)?;
    if nullability.is_none() {
        nullability = self::nullability(input);
    }
    let body = if peek_is(input, |t| matches!(t, Token::LeftBrace)) {
        Some(body(input)?)
    } else {
        None
    };

    Ok(types::PropertyItem {
        name,
        recursive,
        nullability,
        alias,
        body,
    })
}

/// Parse a type reference: `java.util.List<String>?`
fn type_ref<'src>(input: &mut Input<'src>) -> IResult<Spanned<TypeRef>> {
    let name = qualified_name(input)?;
    let mut span = name.span();
    let mut arguments = Vec::new();

    if eat(input, |t| matches!(t, Token::LessThan)).is_some() {
        loop {
            arguments.push(type_ref(input)?.into_inner());
            if eat(input, |t| matches!(t, Token::Comma)).is_none() {
                break;
            }
        }
        span = span.union(expect(input, "`>`", |t| matches!(t, Token::GreaterThan))?);
    }

    let question = eat(input, |t| matches!(t, Token::Question));
    if let Some(question) = question {
        span = span.union(question);
    }
    Ok(Spanned::new(
        TypeRef::new(*name.inner(), arguments, question.is_some()),
        span,
    ))
}

/// Parse the default of a user-defined property: `null`, `true`, `false`,
/// an optionally negated number or a string.
fn default_value<'src>(input: &mut Input<'src>) -> IResult<Spanned<DefaultValue>> {
    let negative = eat(input, |t| matches!(t, Token::Minus));
    trivia(input)?;

    let value = any
        .verify_map(|token: &'src PositionedToken<'src>| {
            let value = match (&token.token, negative.is_some()) {
                (Token::IntegerLiteral(n), true) => DefaultValue::Integer(-*n),
                (Token::IntegerLiteral(n), false) => DefaultValue::Integer(*n),
                (Token::FloatLiteral(n), true) => DefaultValue::Float(-*n),
                (Token::FloatLiteral(n), false) => DefaultValue::Float(*n),
                (Token::StringLiteral(s), false) => DefaultValue::String(s.clone()),
                (Token::Identifier("true"), false) => DefaultValue::Boolean(true),
                (Token::Identifier("false"), false) => DefaultValue::Boolean(false),
                (Token::Identifier("null"), false) => DefaultValue::Null,
                _ => return None,
            };
            Some(Spanned::new(value, token.span))
        })
        .context(Context::Label("default value"))
        .parse_next(input)?;

    let span = match negative {
        Some(minus) => minus.union(value.span()),
        None => value.span(),
    };
    Ok(Spanned::new(value.into_inner(), span))
}

/// The rest of `name: Type = default` after the name
fn user_prop_item<'src>(
    input: &mut Input<'src>,
    annotations: Vec<types::Annotation>,
    name: Spanned<Id>,
) -> IResult<types::UserPropItem> {
    expect(input, "`:` and a type", |t| matches!(t, Token::Colon))?;
    let type_ref = type_ref(input)?;
    let default = if eat(input, |t| matches!(t, Token::Equals)).is_some() {
        Some(default_value(input)?)
    } else {
        None
    };

    Ok(types::UserPropItem {
        annotations,
        name,
        type_ref,
        default,
    })
}

/// The rest of `as(^old -> new) { ... }` after the `as`
fn alias_group_item<'src>(input: &mut Input<'src>, keyword: Span) -> IResult<types::AliasGroupItem> {
    expect(input, "`(`", |t| matches!(t, Token::LeftParen))?;
    let prefix = eat(input, |t| matches!(t, Token::Caret)).is_some();
    let (original, suffix) = match try_identifier(input) {
        Some(text) => match text.inner().strip_suffix('$') {
            Some(rest) => (rest.to_string(), true),
            None => (text.inner().to_string(), false),
        },
        None => (String::new(), false),
    };
    if original.is_empty() && prefix == suffix {
        return Err(cut_here(input, "`^`, `$` or the text to replace"));
    }

    expect(input, "`->`", |t| matches!(t, Token::Arrow))?;
    let replacement = try_identifier(input)
        .map(|text| text.inner().to_string())
        .unwrap_or_default();
    // Only an anchored text match may be replaced by nothing
    let may_remove = !original.is_empty() && prefix != suffix;
    if replacement.is_empty() && !may_remove {
        return Err(cut_here(input, "replacement text after `->`"));
    }
    let close = expect(input, "`)`", |t| matches!(t, Token::RightParen))?;

    let pattern = types::AliasPattern {
        prefix,
        suffix,
        original,
        replacement,
    };
    let body = body(input)?;
    Ok(types::AliasGroupItem {
        pattern: Spanned::new(pattern, keyword.union(close)),
        body,
    })
}

/// Parse `export com.example.Entity;`
fn export_statement<'src>(input: &mut Input<'src>) -> IResult<Spanned<Id>> {
    expect(input, "`export` statement", |t| matches!(t, Token::Export))?;
    let entity = qualified_name(input)?;
    eat(input, |t| matches!(t, Token::Semicolon));
    Ok(entity)
}

/// Everything before a declaration body, or a whole `default` statement.
enum Header<'src> {
    Default {
        words: Vec<Spanned<&'src str>>,
    },
    Declaration {
        annotations: Vec<types::Annotation>,
        words: Vec<Spanned<&'src str>>,
        name: Spanned<&'src str>,
    },
}

fn header<'src>(input: &mut Input<'src>) -> IResult<Header<'src>> {
    let mut annotations = Vec::new();
    while peek_is(input, |t| matches!(t, Token::At)) {
        annotations.push(annotation(input)?);
    }

    let Some(first) = try_identifier(input) else {
        return Err(cut_here(input, "DTO declaration"));
    };
    let is_default = annotations.is_empty() && *first.inner() == "default";

    let mut words = Vec::new();
    let mut name = first;
    loop {
        if is_default {
            eat(input, |t| matches!(t, Token::Comma));
        }
        let checkpoint = input.checkpoint();
        match try_identifier(input) {
            // A `default` statement ends at the first non-modifier word
            Some(next) if is_default && types::Modifier::from_word(next.inner()).is_none() => {
                input.reset(&checkpoint);
                break;
            }
            Some(next) => words.push(std::mem::replace(&mut name, next)),
            None => break,
        }
    }

    if peek_is(input, |t| matches!(t, Token::LeftBrace)) {
        return Ok(Header::Declaration {
            annotations,
            words,
            name,
        });
    }

    if is_default {
        eat(input, |t| matches!(t, Token::Semicolon));
        // `words[0]` is the `default` keyword itself
        words.push(name);
        words.remove(0);
        return Ok(Header::Default { words });
    }

    Err(cut_here(input, "`{`"))
}

/// Turn modifier words into [`types::Modifier`]s.
fn modifiers(words: &[Spanned<&str>]) -> Result<Vec<Spanned<types::Modifier>>, Diagnostic> {
    words
        .iter()
        .map(|word| match types::Modifier::from_word(word.inner()) {
            Some(modifier) => Ok(Spanned::new(modifier, word.span())),
            None => Err(Diagnostic::error(format!("unknown modifier `{}`", word.inner()))
                .with_code(ErrorCode::E102)
                .with_label(word.span(), "not a modifier")
                .with_help(
                    "expected one of `input`, `specification`, `fixed`, `static`, \
                     `dynamic`, `fuzzy`, `deleted`",
                )),
        })
        .collect()
}

/// Convert a winnow error into a diagnostic pointing at the first
/// significant token after the failure position.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken<'_>],
    remaining: usize,
) -> Diagnostic {
    let position = tokens.len().saturating_sub(remaining);
    let found = tokens[position..].iter().find(|t| !t.token.is_trivia());

    let expected = match &error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e
            .context()
            .map(|ctx| match ctx {
                Context::Label(label) => *label,
            })
            .find(|label| !label.is_empty()),
        ErrMode::Incomplete(_) => None,
    };

    match found {
        Some(token) => {
            let message = match expected {
                Some(label) => format!("unexpected `{}`: expected {label}", token.token),
                None => format!("unexpected `{}`", token.token),
            };
            Diagnostic::error(message)
                .with_code(ErrorCode::E100)
                .with_label(token.span, "unexpected token")
                .with_help("check the syntax near this token")
        }
        None => {
            let end = tokens.last().map(|t| t.span.end()).unwrap_or(0);
            let message = match expected {
                Some(label) => format!("unexpected end of input: expected {label}"),
                None => "unexpected end of input".to_string(),
            };
            Diagnostic::error(message)
                .with_code(ErrorCode::E101)
                .with_label(Span::new(end..end), "input ends here")
                .with_help("ensure the input is complete")
        }
    }
}

/// Run `parser`, converting its error into a diagnostic.
fn run<'src, O>(
    input: &mut Input<'src>,
    tokens: &'src [PositionedToken<'src>],
    parser: impl FnOnce(&mut Input<'src>) -> IResult<O>,
) -> Result<O, Diagnostic> {
    match parser(input) {
        Ok(output) => Ok(output),
        Err(e) => Err(convert_error(e, tokens, input.eof_offset())),
    }
}

/// Build a [`DtoFile`](types::DtoFile) from tokens.
pub fn build_file<'src>(tokens: &'src [PositionedToken<'src>]) -> Result<types::DtoFile, Diagnostic> {
    let mut input = TokenSlice::new(tokens);

    let entity = run(&mut input, tokens, export_statement)?;
    let mut file_modifiers = Vec::new();
    let mut declarations = Vec::new();

    loop {
        run(&mut input, tokens, trivia)?;
        if input.eof_offset() == 0 {
            break;
        }

        match run(&mut input, tokens, header)? {
            Header::Default { words } => file_modifiers.extend(modifiers(&words)?),
            Header::Declaration {
                annotations,
                words,
                name,
            } => {
                let name = name_id(name);
                let context = format!("in declaration `{name}`");
                let modifiers = modifiers(&words).map_err(|d| d.with_context(&context))?;
                let body = run(&mut input, tokens, body).map_err(|d| d.with_context(&context))?;
                run(&mut input, tokens, |input| {
                    eat(input, |t| matches!(t, Token::Semicolon));
                    Ok(())
                })?;

                declarations.push(types::Declaration {
                    name,
                    annotations,
                    modifiers,
                    body,
                });
            }
        }
    }

    Ok(types::DtoFile {
        entity,
        modifiers: file_modifiers,
        declarations,
    })
}
