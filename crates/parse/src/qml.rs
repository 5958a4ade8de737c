//! QML document parser.
//!
//! Extracts what a component contributes to the type database: imports, the
//! root object's type, and the properties, signals, functions and enums
//! declared directly on the root object. Bindings, child objects and
//! JavaScript bodies are skipped without being interpreted.

use crate::error::{ErrorKind, Result};
use crate::lexer::{Cursor, Token, TokenKind, tokenize};
use crate::models::{Enumeration, Enumerator, Function, Import, ImportKind, Parameter, Property, QmlDocument, Version};
use exn::ResultExt;

const PROPERTY_MODIFIERS: [&str; 4] = ["readonly", "required", "default", "final"];

pub fn parse(text: &str) -> Result<QmlDocument> {
    let mut cursor = Cursor::new(tokenize(text)?);
    let mut document = QmlDocument::default();

    loop {
        if cursor.eat_ident("pragma") {
            let pragma = cursor.expect_ident()?;
            if pragma == "Singleton" {
                document.is_singleton = true;
            }
            // `pragma ComponentBehavior: Bound`
            if cursor.eat_punct(':') {
                skip_statement(&mut cursor)?;
            }
            cursor.eat_punct(';');
        } else if cursor.eat_ident("import") {
            document.imports.push(import(&mut cursor)?);
            cursor.eat_punct(';');
        } else {
            break;
        }
    }

    if cursor.is_at_end() {
        exn::bail!(ErrorKind::MissingRootObject);
    }
    document.prototype = cursor.expect_qualified_ident()?;
    let root_line = cursor.line();
    cursor.expect_punct('{')?;
    loop {
        if cursor.eat_punct('}') {
            break;
        }
        if cursor.is_at_end() {
            exn::bail!(ErrorKind::syntax(root_line, "unterminated root object"));
        }
        member(&mut cursor, &mut document)?;
    }
    if !cursor.is_at_end() {
        exn::bail!(ErrorKind::syntax(cursor.line(), "unexpected content after root object"));
    }
    Ok(document)
}

fn import(cursor: &mut Cursor) -> Result<Import> {
    let line = cursor.line();
    let kind = match cursor.peek().map(|t| t.kind.clone()) {
        Some(TokenKind::String(path)) => {
            cursor.next();
            match path.ends_with(".js") || path.ends_with(".mjs") {
                true => ImportKind::Script(path),
                false => ImportKind::Directory(path),
            }
        },
        Some(TokenKind::Ident(_)) => ImportKind::Module(cursor.expect_qualified_ident()?),
        _ => exn::bail!(ErrorKind::syntax(line, "expected module or path after `import`")),
    };
    let version = match cursor.peek().map(|t| t.kind.clone()) {
        Some(TokenKind::Number(version)) => {
            cursor.next();
            Version::parse(&version).or_raise(|| ErrorKind::syntax(line, format!("invalid import version `{version}`")))?
        },
        _ => Version::NONE,
    };
    let alias = match cursor.eat_ident("as") {
        true => Some(cursor.expect_ident()?),
        false => None,
    };
    Ok(Import { kind, version, alias })
}

/// One member of the root object.
fn member(cursor: &mut Cursor, document: &mut QmlDocument) -> Result<()> {
    if cursor.eat_punct(';') {
        return Ok(());
    }
    let Some(token) = cursor.peek().cloned() else {
        return Ok(());
    };
    // `signal: ...` or `property.foo: ...` are bindings, not declarations.
    let binding_follows = cursor.peek_nth(1).is_some_and(|t| t.is_punct(':') || t.is_punct('.'));
    if binding_follows || !is_declaration_start(&token) {
        return skip_statement(cursor);
    }

    match token.ident() {
        Some("property") => {
            cursor.next();
            document.properties.push(property(cursor, &[])?);
        },
        Some(modifier) if PROPERTY_MODIFIERS.contains(&modifier) => {
            let mut modifiers = Vec::new();
            while let Some(modifier) = cursor.peek().and_then(Token::ident).filter(|m| PROPERTY_MODIFIERS.contains(m)) {
                modifiers.push(modifier.to_string());
                cursor.next();
            }
            // `required foo` marks an inherited property; nothing to record.
            if !cursor.eat_ident("property") {
                return skip_statement(cursor);
            }
            let property = property(cursor, &modifiers)?;
            if property.is_default {
                document.default_property = Some(property.name.clone());
            }
            document.properties.push(property);
        },
        Some("signal") => {
            cursor.next();
            document.signals.push(signal(cursor)?);
        },
        Some("function") => {
            cursor.next();
            document.functions.push(function(cursor)?);
        },
        Some("enum") => {
            cursor.next();
            document.enumerations.push(enumeration(cursor)?);
        },
        _ => return skip_statement(cursor),
    }
    Ok(())
}

fn is_declaration_start(token: &Token) -> bool {
    matches!(token.ident(), Some("property" | "signal" | "function" | "enum"))
        || token.ident().is_some_and(|ident| PROPERTY_MODIFIERS.contains(&ident))
}

/// `[list<]Type[>] name [: value]`, after the `property` keyword.
fn property(cursor: &mut Cursor, modifiers: &[String]) -> Result<Property> {
    let mut property = Property {
        is_readonly: modifiers.iter().any(|m| m == "readonly"),
        is_required: modifiers.iter().any(|m| m == "required"),
        is_default: modifiers.iter().any(|m| m == "default"),
        ..Property::default()
    };
    if cursor.peek().is_some_and(|t| t.is_ident("list")) && cursor.peek_nth(1).is_some_and(|t| t.is_punct('<')) {
        cursor.next();
        cursor.next();
        property.type_name = cursor.expect_qualified_ident()?;
        property.is_list = true;
        cursor.expect_punct('>')?;
    } else {
        property.type_name = cursor.expect_qualified_ident()?;
    }
    property.name = cursor.expect_ident()?;
    if cursor.eat_punct(':') {
        skip_statement(cursor)?;
    }
    Ok(property)
}

/// `name[(params)]`, after the `signal` keyword.
fn signal(cursor: &mut Cursor) -> Result<Function> {
    let name = cursor.expect_ident()?;
    let parameters = match cursor.peek().is_some_and(|t| t.is_punct('(')) {
        true => parameters(cursor)?,
        false => Vec::new(),
    };
    Ok(Function { name, return_type: None, parameters })
}

/// `name(params) [: ReturnType] { body }`, after the `function` keyword.
fn function(cursor: &mut Cursor) -> Result<Function> {
    let name = cursor.expect_ident()?;
    let parameters = parameters(cursor)?;
    let return_type = match cursor.eat_punct(':') {
        true => Some(cursor.expect_qualified_ident()?),
        false => None,
    };
    if cursor.peek().is_some_and(|t| t.is_punct('{')) {
        cursor.skip_group()?;
    }
    Ok(Function { name, return_type, parameters })
}

/// `(a, b: int, string c)`: untyped, annotated, or old-style typed signal
/// parameters.
fn parameters(cursor: &mut Cursor) -> Result<Vec<Parameter>> {
    cursor.expect_punct('(')?;
    let mut parameters = Vec::new();
    while !cursor.eat_punct(')') {
        let first = cursor.expect_qualified_ident()?;
        let parameter = if cursor.eat_punct(':') {
            Parameter { name: first, type_name: cursor.expect_qualified_ident()? }
        } else if let Some(name) = cursor.peek().and_then(Token::ident).map(str::to_string) {
            cursor.next();
            Parameter { name, type_name: first }
        } else {
            Parameter { name: first, type_name: String::new() }
        };
        parameters.push(parameter);
        if !cursor.eat_punct(',') {
            cursor.expect_punct(')')?;
            break;
        }
    }
    Ok(parameters)
}

/// `Name { A, B = 2, C }`, after the `enum` keyword.
fn enumeration(cursor: &mut Cursor) -> Result<Enumeration> {
    let name = cursor.expect_ident()?;
    cursor.expect_punct('{')?;
    let mut enumerators = Vec::new();
    while !cursor.eat_punct('}') {
        let name = cursor.expect_ident()?;
        let mut value = None;
        if cursor.eat_punct('=') {
            let line = cursor.line();
            let negative = cursor.eat_punct('-');
            let literal = match cursor.next().map(|t| t.kind) {
                Some(TokenKind::Number(literal)) => literal,
                _ => exn::bail!(ErrorKind::syntax(line, "expected enumerator value")),
            };
            let parsed = literal
                .parse::<i64>()
                .or_raise(|| ErrorKind::syntax(line, format!("invalid enumerator value `{literal}`")))?;
            value = Some(if negative { -parsed } else { parsed });
        }
        enumerators.push(Enumerator { name, value });
        if !cursor.eat_punct(',') {
            cursor.expect_punct('}')?;
            break;
        }
    }
    Ok(Enumeration { name, enumerators })
}

/// Skip one binding, child object or other statement.
///
/// A statement ends at a `;`, at a line break outside any brackets, or right
/// before the `}` that closes the enclosing object.
fn skip_statement(cursor: &mut Cursor) -> Result<()> {
    let start = cursor.line();
    let mut depth = 0usize;
    let mut last_line = None;
    while let Some(token) = cursor.peek().cloned() {
        if depth == 0 {
            if token.is_punct('}') {
                return Ok(());
            }
            if token.is_punct(';') {
                cursor.next();
                return Ok(());
            }
            if last_line.is_some_and(|line| token.line > line) {
                return Ok(());
            }
        }
        match token.kind {
            TokenKind::Punct('(' | '[' | '{') => depth += 1,
            TokenKind::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            _ => {},
        }
        last_line = Some(token.line);
        cursor.next();
    }
    if depth > 0 {
        exn::bail!(ErrorKind::syntax(start, "unbalanced brackets"));
    }
    Ok(())
}
