//! Regex-based tokenizer (§4.3) over the fixed HTSQL symbol set.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::syntax::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Reference(String), // `$name`
    String(String),
    Integer(String),
    Decimal(String),
    Float(String),
    Symbol(&'static str),
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Symbols ordered longest-first so the greedy scan prefers `->` over `-`,
/// `!==`/`!=` over `!`, etc. (§4.3's fixed symbol set, plus the two-/three-
/// character operators the grammar needs).
const SYMBOLS: &[&str] = &[
    "!==", "!~", "!=", "->", ":=", "==", "<=", ">=", "~", "<", ">", "=", "!",
    "&", "|", ".", ",", "?", "^", "/", "*", "+", "-", "(", ")", "{", "}", ":",
    "$", "@", "[", "]",
];

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{Alphabetic}_][\p{Alphabetic}\p{Number}_]*").unwrap())
}

fn float_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+[eE][+-]?[0-9]+").unwrap())
}

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?|^\.[0-9]+").unwrap())
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+").unwrap())
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer { source, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.rest().chars().next() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self) -> Result<Token> {
        let start = self.pos;
        debug_assert!(self.rest().starts_with('\''));
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.rest().chars().next() {
                None => {
                    return Err(Error::syntax("unterminated string literal")
                        .with_frame("lexing", Some(Span::new(start, self.pos))))
                }
                Some('\'') => {
                    self.pos += 1;
                    if self.rest().starts_with('\'') {
                        value.push('\'');
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Some(ch) => {
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        Ok(Token {
            kind: TokenKind::String(value),
            span: Span::new(start, self.pos),
        })
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let start = self.pos;
        if self.rest().is_empty() {
            return Ok(Token {
                kind: TokenKind::End,
                span: Span::new(start, start),
            });
        }

        if self.rest().starts_with('\'') {
            return self.lex_string();
        }

        if self.rest().starts_with('$') {
            if let Some(m) = ident_re().find(&self.rest()[1..]) {
                let name = m.as_str().to_string();
                self.pos += 1 + m.end();
                return Ok(Token {
                    kind: TokenKind::Reference(name),
                    span: Span::new(start, self.pos),
                });
            }
        }

        if let Some(m) = float_re().find(self.rest()) {
            let text = m.as_str().to_string();
            self.pos += m.end();
            return Ok(Token {
                kind: TokenKind::Float(text),
                span: Span::new(start, self.pos),
            });
        }
        if let Some(m) = decimal_re().find(self.rest()) {
            let text = m.as_str().to_string();
            self.pos += m.end();
            return Ok(Token {
                kind: TokenKind::Decimal(text),
                span: Span::new(start, self.pos),
            });
        }
        if let Some(m) = integer_re().find(self.rest()) {
            let text = m.as_str().to_string();
            self.pos += m.end();
            return Ok(Token {
                kind: TokenKind::Integer(text),
                span: Span::new(start, self.pos),
            });
        }
        if let Some(m) = ident_re().find(self.rest()) {
            let text = m.as_str().to_string();
            self.pos += m.end();
            return Ok(Token {
                kind: TokenKind::Identifier(text),
                span: Span::new(start, self.pos),
            });
        }
        for symbol in SYMBOLS {
            if self.rest().starts_with(symbol) {
                self.pos += symbol.len();
                return Ok(Token {
                    kind: TokenKind::Symbol(symbol),
                    span: Span::new(start, self.pos),
                });
            }
        }

        let found = self.rest().chars().next().unwrap();
        Err(Error::syntax(format!("unexpected character '{found}'"))
            .with_frame("lexing", Some(Span::new(start, start + found.len_utf8()))))
    }

    /// Tokenizes the whole source, appending a trailing `End` token.
    pub fn tokenize(source: &'a str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_end = token.kind == TokenKind::End;
            tokens.push(token);
            if is_end {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_identifiers_and_symbols() {
        let kinds = kinds("school{code}");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier("school".into()),
                TokenKind::Symbol("{"),
                TokenKind::Identifier("code".into()),
                TokenKind::Symbol("}"),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn tokenizes_string_with_doubled_quote_escape() {
        let kinds = kinds("'o''brien'");
        assert_eq!(kinds, vec![TokenKind::String("o'brien".into()), TokenKind::End]);
    }

    #[test]
    fn tokenizes_numbers() {
        let kinds = kinds("10 3.5 1e10");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Integer("10".into()),
                TokenKind::Decimal("3.5".into()),
                TokenKind::Float("1e10".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn tokenizes_reference() {
        let kinds = kinds("$x");
        assert_eq!(kinds, vec![TokenKind::Reference("x".into()), TokenKind::End]);
    }

    #[test]
    fn greedily_prefers_longer_operators() {
        let kinds = kinds("a->b");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Symbol("->"),
                TokenKind::Identifier("b".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(Lexer::tokenize("school#").is_err());
    }
}
