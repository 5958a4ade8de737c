//! Tokenizer shared by the qmltypes and QML document parsers.
//!
//! Both formats use the same surface syntax (identifiers, string literals,
//! numbers, punctuation, C++-style comments). The parsers above this only
//! look at declarations, so the lexer does not need to understand
//! JavaScript beyond not tripping over its string literals and comments.

use crate::error::{ErrorKind, Result};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    String(String),
    /// Numeric literal as written (`2`, `2.15`, `0x1f`)
    Number(String),
    Punct(char),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// 1-based line the token starts on
    pub line: usize,
}
impl Token {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(ident) if ident == name)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Read a string literal up to its closing `quote`. Returns `None` if the
/// input ends first, or if a non-template literal runs into a line break.
fn read_string(quote: char, chars: &mut Peekable<Chars<'_>>, line: &mut usize) -> Option<String> {
    let mut value = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                '\n' => *line += 1,
                escaped => value.push(escaped),
            },
            '\n' if quote != '`' => return None,
            '\n' => {
                *line += 1;
                value.push('\n');
            },
            c if c == quote => return Some(value),
            c => value.push(c),
        }
    }
    None
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {},
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            },
            '/' if chars.peek() == Some(&'*') => {
                let start = line;
                chars.next();
                let mut previous = '\0';
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    if previous == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    previous = c;
                }
                if !closed {
                    exn::bail!(ErrorKind::syntax(start, "unterminated block comment"));
                }
            },
            '"' | '\'' | '`' => {
                let start = line;
                let value = read_string(c, &mut chars, &mut line)
                    .ok_or_else(|| exn::Exn::from(ErrorKind::syntax(start, "unterminated string literal")))?;
                tokens.push(Token { kind: TokenKind::String(value), line: start });
            },
            c if c.is_ascii_digit() => {
                let mut value = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '.' || next == '_' {
                        value.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token { kind: TokenKind::Number(value), line });
            },
            c if is_ident_start(c) => {
                let mut value = String::from(c);
                while let Some(&next) = chars.peek() {
                    if is_ident_continue(next) {
                        value.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token { kind: TokenKind::Ident(value), line });
            },
            c => tokens.push(Token { kind: TokenKind::Punct(c), line }),
        }
    }
    Ok(tokens)
}

/// Forward-only view over a token list with the helpers both parsers share.
pub(crate) struct Cursor {
    tokens: Vec<Token>,
    position: usize,
}
impl Cursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, position: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Line of the next token, or of the last token at end of input.
    pub fn line(&self) -> usize {
        self.peek().or_else(|| self.tokens.last()).map_or(1, |t| t.line)
    }

    /// Line of the most recently consumed token.
    pub fn previous_line(&self) -> Option<usize> {
        self.position.checked_sub(1).and_then(|i| self.tokens.get(i)).map(|t| t.line)
    }

    pub fn eat_punct(&mut self, c: char) -> bool {
        let matched = self.peek().is_some_and(|t| t.is_punct(c));
        if matched {
            self.position += 1;
        }
        matched
    }

    pub fn eat_ident(&mut self, name: &str) -> bool {
        let matched = self.peek().is_some_and(|t| t.is_ident(name));
        if matched {
            self.position += 1;
        }
        matched
    }

    pub fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.eat_punct(c) {
            return Ok(());
        }
        exn::bail!(ErrorKind::syntax(self.line(), format!("expected `{c}`")))
    }

    pub fn expect_ident(&mut self) -> Result<String> {
        match self.peek().and_then(Token::ident) {
            Some(ident) => {
                let ident = ident.to_string();
                self.position += 1;
                Ok(ident)
            },
            None => exn::bail!(ErrorKind::syntax(self.line(), "expected identifier")),
        }
    }

    /// Dotted name such as `QtQuick.Controls` or `Controls.Button`.
    pub fn expect_qualified_ident(&mut self) -> Result<String> {
        let mut name = self.expect_ident()?;
        while self.peek().is_some_and(|t| t.is_punct('.')) && self.peek_nth(1).and_then(Token::ident).is_some() {
            self.position += 1;
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        Ok(name)
    }

    /// Consume one bracketed group starting at the next token, which must be
    /// `(`, `[` or `{`, through its matching close.
    pub fn skip_group(&mut self) -> Result<()> {
        let start = self.line();
        let mut depth = 0usize;
        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Punct('(' | '[' | '{') => depth += 1,
                TokenKind::Punct(')' | ']' | '}') => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                },
                _ => {},
            }
            if depth == 0 {
                return Ok(());
            }
        }
        exn::bail!(ErrorKind::syntax(start, "unbalanced brackets"))
    }
}
