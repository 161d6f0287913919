//! Recursive-descent / precedence-climbing parser (§4.3) from [`Token`]
//! stream to [`Syntax`] tree.
//!
//! The precedence ladder in §4.3, low to high, is `|`, `&`, `!` prefix,
//! comparisons, additive, multiplicative, unary sign, `?` (filter), `^`
//! (project), compose `.`, postfix `+`/`-` (direction), selection `{}`,
//! location `[]`, unpack `*`. Read literally as one ladder this would put
//! `?`/`^`/`.` *above* additive and multiplicative, so `a + b ? c` would
//! parse as `a + (b ? c)` — which is exactly how the flow operators behave
//! in practice: `?`, `^`, `.` chain together over whole flow expressions
//! (table references, attribute paths, function calls), while `|`, `&`,
//! comparisons and arithmetic combine scalar values *within* the argument
//! of a flow operator (the predicate of `?`, the kernel of `^`, a function
//! argument). There is no single expression context where both axes
//! compete for the same operand, so they're implemented as two tiers: a
//! scalar-expression ladder (`parse_scalar`) used for predicates, kernels,
//! and call arguments, and a flow ladder (`parse_flow`) gluing `.`/`?`/`^`/
//! postfix decorators left-to-right over atoms drawn from the scalar
//! ladder's primary level. This is a documented Open Question resolution
//! (see DESIGN.md) rather than a literal transcription of the ladder.

use crate::error::{Error, Result};
use crate::syntax::ast::{Syntax, SyntaxKind};
use crate::syntax::lexer::{Lexer, Token, TokenKind};
use crate::syntax::Span;

pub fn parse(source: &str) -> Result<Syntax> {
    let tokens = Lexer::tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let body = if parser.peek_symbol("/") {
        parser.advance();
        if parser.at_end() {
            Syntax::new(SyntaxKind::Void, Span::new(0, source.len()))
        } else {
            parser.parse_flow()?
        }
    } else {
        parser.parse_flow()?
    };
    parser.expect_end()?;
    let span = body.span;
    Ok(Syntax::new(SyntaxKind::Collect { base: Box::new(body) }, span))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        matches!(self.tokens[self.pos].kind, TokenKind::End)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_symbol(&self, sym: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Symbol(s) if *s == sym)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_symbol(&mut self, sym: &'static str) -> Result<Token> {
        if self.peek_symbol(sym) {
            Ok(self.advance())
        } else {
            self.unexpected(format!("'{sym}'"))
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            self.unexpected("end of query".to_string())
        }
    }

    fn unexpected<T>(&self, expected: String) -> Result<T> {
        let tok = self.peek();
        let found = describe(&tok.kind);
        Err(Error::syntax(format!("expected {expected}, found {found}"))
            .with_frame("parsing", Some(tok.span)))
    }

    // ---- flow ladder: `.` `?` `^` bound left-to-right over atoms, with
    // postfix decorators (`{}` select, `[]` locate, trailing `+`/`-`
    // direction, `*` unpack) folded onto each atom as it's parsed. ----

    fn parse_flow(&mut self) -> Result<Syntax> {
        let mut left = self.parse_decorated_atom()?;
        loop {
            if self.peek_symbol(".") {
                self.advance();
                let right = self.parse_decorated_atom()?;
                let span = left.span.join(right.span);
                left = Syntax::new(
                    SyntaxKind::Compose {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                );
            } else if self.peek_symbol("?") {
                self.advance();
                let predicate = self.parse_scalar()?;
                let span = left.span.join(predicate.span);
                left = Syntax::new(
                    SyntaxKind::Filter {
                        base: Box::new(left),
                        predicate: Box::new(predicate),
                    },
                    span,
                );
            } else if self.peek_symbol("^") {
                self.advance();
                let kernel = self.parse_scalar()?;
                let span = left.span.join(kernel.span);
                left = Syntax::new(
                    SyntaxKind::Project {
                        base: Box::new(left),
                        kernel: Box::new(kernel),
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Ok(left)
    }

    /// Parses one atom and folds any trailing postfix decorators
    /// (`{...}` selection, `[...]` location, `+`/`-` direction, `*`
    /// unpack) onto it, tightest-binding first.
    fn parse_decorated_atom(&mut self) -> Result<Syntax> {
        let mut atom = self.parse_atom()?;
        loop {
            if self.peek_symbol("{") {
                let record = self.parse_record()?;
                let span = atom.span.join(record.span);
                atom = Syntax::new(
                    SyntaxKind::Select {
                        base: Box::new(atom),
                        record: Box::new(record),
                    },
                    span,
                );
            } else if self.peek_symbol("[") {
                self.advance();
                let identity = if self.peek_symbol("]") {
                    Syntax::new(SyntaxKind::Identity { arms: Vec::new(), is_hard: false }, atom.span)
                } else {
                    self.parse_comma_list()?
                };
                let end = self.expect_symbol("]")?;
                let span = atom.span.join(end.span);
                atom = Syntax::new(
                    SyntaxKind::Locate {
                        base: Box::new(atom),
                        identity: Box::new(identity),
                    },
                    span,
                );
            } else if self.peek_symbol("*") {
                let tok = self.advance();
                let span = atom.span.join(tok.span);
                atom = Syntax::new(SyntaxKind::Unpack { base: Box::new(atom), index: None }, span);
            } else if self.peek_symbol("+") || self.peek_symbol("-") {
                let is_ascending = self.peek_symbol("+");
                let tok = self.advance();
                let span = atom.span.join(tok.span);
                atom = Syntax::new(SyntaxKind::Direction { base: Box::new(atom), is_ascending }, span);
            } else {
                break;
            }
        }
        Ok(atom)
    }

    /// A comma-separated list of flow expressions, used inside `{...}`
    /// selections and `[...]` locations.
    fn parse_comma_list(&mut self) -> Result<Vec<Syntax>> {
        let mut arms = vec![self.parse_flow_or_assign()?];
        while self.peek_symbol(",") {
            self.advance();
            arms.push(self.parse_flow_or_assign()?);
        }
        Ok(arms)
    }

    /// A selection element may be a plain flow expression or a `lhs :=
    /// rhs` assignment (naming a calculated attribute).
    fn parse_flow_or_assign(&mut self) -> Result<Syntax> {
        let lhs = self.parse_flow()?;
        if self.peek_symbol(":=") {
            self.advance();
            let rhs = self.parse_flow()?;
            let span = lhs.span.join(rhs.span);
            Ok(Syntax::new(
                SyntaxKind::Assign { lhs: Box::new(lhs), rhs: Box::new(rhs) },
                span,
            ))
        } else {
            Ok(lhs)
        }
    }

    fn parse_record(&mut self) -> Result<Syntax> {
        let open = self.expect_symbol("{")?;
        let arms = if self.peek_symbol("}") {
            Vec::new()
        } else {
            self.parse_comma_list()?
        };
        let close = self.expect_symbol("}")?;
        Ok(Syntax::new(SyntaxKind::Record { arms }, open.span.join(close.span)))
    }

    // ---- scalar ladder: used for predicates, kernels, and call
    // arguments. `|`, `&`, `!`, comparisons, `+`/`-`, `*`/`/`, unary
    // sign, bottoming out at a decorated flow atom. ----

    fn parse_scalar(&mut self) -> Result<Syntax> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Syntax> {
        let mut left = self.parse_and()?;
        while self.peek_symbol("|") {
            self.advance();
            let right = self.parse_and()?;
            left = binary("|", left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Syntax> {
        let mut left = self.parse_not()?;
        while self.peek_symbol("&") {
            self.advance();
            let right = self.parse_not()?;
            left = binary("&", left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Syntax> {
        if self.peek_symbol("!") {
            let tok = self.advance();
            let arm = self.parse_not()?;
            let span = tok.span.join(arm.span);
            Ok(Syntax::new(SyntaxKind::Prefix { sym: "!".to_string(), arm: Box::new(arm) }, span))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Syntax> {
        let left = self.parse_additive()?;
        const CMP_OPS: &[&str] = &["!==", "!=", "==", "<=", ">=", "!~", "~", "<", ">", "="];
        for op in CMP_OPS {
            if self.peek_symbol(op) {
                self.advance();
                let right = self.parse_additive()?;
                return Ok(binary(op, left, right));
            }
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Syntax> {
        let mut left = self.parse_multiplicative()?;
        loop {
            if self.peek_symbol("+") {
                self.advance();
                let right = self.parse_multiplicative()?;
                left = binary("+", left, right);
            } else if self.peek_symbol("-") {
                self.advance();
                let right = self.parse_multiplicative()?;
                left = binary("-", left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Syntax> {
        let mut left = self.parse_unary()?;
        loop {
            if self.peek_symbol("*") {
                self.advance();
                let right = self.parse_unary()?;
                left = binary("*", left, right);
            } else if self.peek_symbol("/") {
                self.advance();
                let right = self.parse_unary()?;
                left = binary("/", left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Syntax> {
        if self.peek_symbol("-") {
            let tok = self.advance();
            let arm = self.parse_unary()?;
            let span = tok.span.join(arm.span);
            Ok(Syntax::new(SyntaxKind::Prefix { sym: "-".to_string(), arm: Box::new(arm) }, span))
        } else {
            self.parse_flow()
        }
    }

    fn parse_atom(&mut self) -> Result<Syntax> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Integer(text) => {
                self.advance();
                Ok(Syntax::new(SyntaxKind::Integer { text }, tok.span))
            }
            TokenKind::Decimal(text) => {
                self.advance();
                Ok(Syntax::new(SyntaxKind::Decimal { text }, tok.span))
            }
            TokenKind::Float(text) => {
                self.advance();
                Ok(Syntax::new(SyntaxKind::Float { text }, tok.span))
            }
            TokenKind::String(text) => {
                self.advance();
                Ok(Syntax::new(SyntaxKind::String { text }, tok.span))
            }
            TokenKind::Reference(id) => {
                self.advance();
                Ok(Syntax::new(SyntaxKind::Reference { id }, tok.span))
            }
            TokenKind::Identifier(id) => {
                self.advance();
                if self.peek_symbol("(") {
                    self.parse_call(id, tok.span)
                } else {
                    Ok(Syntax::new(SyntaxKind::Identifier { text: id }, tok.span))
                }
            }
            TokenKind::Symbol(":") => {
                self.advance();
                let name_tok = self.peek().clone();
                let id = match name_tok.kind {
                    TokenKind::Identifier(id) => {
                        self.advance();
                        id
                    }
                    _ => return self.unexpected("an identifier after ':'".to_string()),
                };
                let (args, span) = if self.peek_symbol("(") {
                    let (args, end) = self.parse_args()?;
                    (args, tok.span.join(end))
                } else {
                    (Vec::new(), tok.span.join(name_tok.span))
                };
                Ok(Syntax::new(
                    SyntaxKind::Pipe {
                        id,
                        larm: Box::new(Syntax::new(SyntaxKind::Void, tok.span)),
                        rarms: args,
                        is_flow: true,
                        is_open: false,
                    },
                    span,
                ))
            }
            TokenKind::Symbol("(") => {
                self.advance();
                let inner = self.parse_flow_or_assign()?;
                let close = self.expect_symbol(")")?;
                let span = tok.span.join(close.span);
                Ok(Syntax::new(SyntaxKind::Group { base: Box::new(inner) }, span))
            }
            TokenKind::Symbol("{") => self.parse_record(),
            TokenKind::Symbol("/") => {
                self.advance();
                let base = self.parse_decorated_atom()?;
                let span = tok.span.join(base.span);
                Ok(Syntax::new(SyntaxKind::Collect { base: Box::new(base) }, span))
            }
            ref kind => self.unexpected(format!("unexpected {}", describe(kind))),
        }
    }

    fn parse_call(&mut self, id: String, start: Span) -> Result<Syntax> {
        let (args, end) = self.parse_args()?;
        Ok(Syntax::new(SyntaxKind::Function { id, args }, start.join(end)))
    }

    fn parse_args(&mut self) -> Result<(Vec<Syntax>, Span)> {
        let open = self.expect_symbol("(")?;
        let args = if self.peek_symbol(")") {
            Vec::new()
        } else {
            self.parse_comma_list()?
        };
        let close = self.expect_symbol(")")?;
        Ok((args, open.span.join(close.span)))
    }
}

fn binary(sym: &str, left: Syntax, right: Syntax) -> Syntax {
    let span = left.span.join(right.span);
    Syntax::new(
        SyntaxKind::Operator {
            sym: sym.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Identifier(s) => format!("identifier '{s}'"),
        TokenKind::Reference(s) => format!("reference '${s}'"),
        TokenKind::String(s) => format!("string '{s}'"),
        TokenKind::Integer(s) => format!("integer '{s}'"),
        TokenKind::Decimal(s) => format!("decimal '{s}'"),
        TokenKind::Float(s) => format!("float '{s}'"),
        TokenKind::Symbol(s) => format!("'{s}'"),
        TokenKind::End => "end of query".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_body(source: &str) -> Syntax {
        let top = parse(source).unwrap();
        match top.kind {
            SyntaxKind::Collect { base } => *base,
            other => panic!("expected a Collect wrapper, got {other:?}"),
        }
    }

    #[test]
    fn parses_bare_table_reference() {
        let body = parse_body("/school");
        assert!(matches!(body.kind, SyntaxKind::Identifier { text } if text == "school"));
    }

    #[test]
    fn parses_selection_with_function_call() {
        let body = parse_body("/school{code, count(department)}");
        let SyntaxKind::Select { base, record } = body.kind else {
            panic!("expected Select");
        };
        assert!(matches!(base.kind, SyntaxKind::Identifier { text } if text == "school"));
        let SyntaxKind::Record { arms } = record.kind else {
            panic!("expected Record");
        };
        assert_eq!(arms.len(), 2);
        assert!(matches!(&arms[0].kind, SyntaxKind::Identifier { text } if text == "code"));
        assert!(matches!(&arms[1].kind, SyntaxKind::Function { id, .. } if id == "count"));
    }

    #[test]
    fn parses_filter_with_comparison_predicate_then_compose() {
        let body = parse_body("/school?code='eng'.limit(1)");
        let SyntaxKind::Compose { left, right } = body.kind else {
            panic!("expected Compose");
        };
        let SyntaxKind::Filter { base, predicate } = left.kind else {
            panic!("expected Filter");
        };
        assert!(matches!(base.kind, SyntaxKind::Identifier { text } if text == "school"));
        assert!(matches!(predicate.kind, SyntaxKind::Operator { sym, .. } if sym == "="));
        assert!(matches!(right.kind, SyntaxKind::Function { id, .. } if id == "limit"));
    }

    #[test]
    fn parses_project_then_compose_limit() {
        let body = parse_body("/school^code.limit(5)");
        let SyntaxKind::Compose { left, right } = body.kind else {
            panic!("expected Compose");
        };
        assert!(matches!(left.kind, SyntaxKind::Project { .. }));
        assert!(matches!(right.kind, SyntaxKind::Function { id, .. } if id == "limit"));
    }

    #[test]
    fn parses_nested_segment_inside_selection() {
        let body = parse_body("/school{code, /department{code}}");
        let SyntaxKind::Select { record, .. } = body.kind else {
            panic!("expected Select");
        };
        let SyntaxKind::Record { arms } = record.kind else {
            panic!("expected Record");
        };
        assert_eq!(arms.len(), 2);
        assert!(matches!(&arms[1].kind, SyntaxKind::Collect { .. }));
    }

    #[test]
    fn empty_query_is_void() {
        let top = parse("/").unwrap();
        let SyntaxKind::Collect { base } = top.kind else {
            panic!("expected Collect");
        };
        assert!(matches!(base.kind, SyntaxKind::Void));
    }

    #[test]
    fn postfix_direction_decorates_selection_element() {
        let body = parse_body("/department{code+}");
        let SyntaxKind::Select { record, .. } = body.kind else {
            panic!("expected Select");
        };
        let SyntaxKind::Record { arms } = record.kind else {
            panic!("expected Record");
        };
        assert!(matches!(&arms[0].kind, SyntaxKind::Direction { is_ascending: true, .. }));
    }

    #[test]
    fn reports_syntax_error_with_span_on_malformed_query() {
        let err = parse("/school{").unwrap_err();
        assert!(err.span().is_some());
    }
}
