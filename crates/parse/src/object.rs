//! Generic reader for the QML object notation used by qmltypes files:
//! nested `Type { name: value; Child { ... } }` blocks with literal values.

use crate::error::{ErrorKind, Result};
use crate::lexer::{Cursor, TokenKind, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    String(String),
    Number(String),
    Bool(bool),
    Ident(String),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}
impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => parse_integer(n),
            _ => None,
        }
    }
}

fn parse_integer(literal: &str) -> Option<i64> {
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, literal),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Binding {
    pub name: String,
    pub value: Value,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Object {
    pub type_name: String,
    pub line: usize,
    pub bindings: Vec<Binding>,
    pub children: Vec<Object>,
}
impl Object {
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn string(&self, name: &str) -> Option<String> {
        self.binding(name).and_then(|b| b.value.as_str()).map(str::to_string)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.binding(name).and_then(|b| b.value.as_bool())
    }

    pub fn children_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Object> + 'a {
        self.children.iter().filter(move |child| child.type_name == type_name)
    }
}

/// Parse a whole file: optional `import` lines followed by exactly one root
/// object.
pub(crate) fn parse_document(text: &str) -> Result<Object> {
    let mut cursor = Cursor::new(tokenize(text)?);
    while cursor.eat_ident("import") {
        let line = cursor.previous_line().unwrap_or(1);
        while cursor.peek().is_some_and(|t| t.line == line) {
            cursor.next();
        }
    }
    if cursor.is_at_end() {
        exn::bail!(ErrorKind::MissingRootObject);
    }
    let root = parse_object(&mut cursor)?;
    if !cursor.is_at_end() {
        exn::bail!(ErrorKind::syntax(cursor.line(), "unexpected content after root object"));
    }
    Ok(root)
}

fn parse_object(cursor: &mut Cursor) -> Result<Object> {
    let line = cursor.line();
    let type_name = cursor.expect_qualified_ident()?;
    parse_object_body(cursor, type_name, line)
}

fn parse_object_body(cursor: &mut Cursor, type_name: String, line: usize) -> Result<Object> {
    cursor.expect_punct('{')?;
    let mut object = Object {
        type_name,
        line,
        bindings: Vec::new(),
        children: Vec::new(),
    };
    loop {
        if cursor.eat_punct('}') {
            return Ok(object);
        }
        if cursor.is_at_end() {
            exn::bail!(ErrorKind::syntax(line, format!("unterminated `{}` object", object.type_name)));
        }
        if cursor.eat_punct(';') {
            continue;
        }
        let member_line = cursor.line();
        let name = cursor.expect_qualified_ident()?;
        if cursor.eat_punct(':') {
            let value = parse_value(cursor)?;
            object.bindings.push(Binding { name, value, line: member_line });
        } else {
            object.children.push(parse_object_body(cursor, name, member_line)?);
        }
    }
}

fn parse_value(cursor: &mut Cursor) -> Result<Value> {
    let line = cursor.line();
    let Some(token) = cursor.next() else {
        exn::bail!(ErrorKind::syntax(line, "expected value"));
    };
    match token.kind {
        TokenKind::String(s) => Ok(Value::String(s)),
        TokenKind::Number(n) => Ok(Value::Number(n)),
        TokenKind::Ident(ident) if ident == "true" => Ok(Value::Bool(true)),
        TokenKind::Ident(ident) if ident == "false" => Ok(Value::Bool(false)),
        TokenKind::Ident(mut ident) => {
            while cursor.eat_punct('.') {
                ident.push('.');
                ident.push_str(&cursor.expect_ident()?);
            }
            Ok(Value::Ident(ident))
        },
        TokenKind::Punct('-') => match cursor.next().map(|t| t.kind) {
            Some(TokenKind::Number(n)) => Ok(Value::Number(format!("-{n}"))),
            _ => exn::bail!(ErrorKind::syntax(line, "expected number after `-`")),
        },
        TokenKind::Punct('[') => {
            let mut values = Vec::new();
            while !cursor.eat_punct(']') {
                values.push(parse_value(cursor)?);
                if !cursor.eat_punct(',') {
                    cursor.expect_punct(']')?;
                    break;
                }
            }
            Ok(Value::Array(values))
        },
        TokenKind::Punct('{') => {
            let mut entries = Vec::new();
            while !cursor.eat_punct('}') {
                let key_line = cursor.line();
                let key = match cursor.next().map(|t| t.kind) {
                    Some(TokenKind::String(key) | TokenKind::Ident(key)) => key,
                    _ => exn::bail!(ErrorKind::syntax(key_line, "expected map key")),
                };
                cursor.expect_punct(':')?;
                entries.push((key, parse_value(cursor)?));
                if !cursor.eat_punct(',') {
                    cursor.expect_punct('}')?;
                    break;
                }
            }
            Ok(Value::Map(entries))
        },
        TokenKind::Punct(c) => exn::bail!(ErrorKind::syntax(line, format!("unexpected `{c}`"))),
    }
}
