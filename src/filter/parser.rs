//! Recursive-descent parser over the token stream from [`super::lexer`],
//! producing the [`Expr`] tree. Precedence, tightest to
//! loosest: `not` > relational > `and` > `or`; parentheses override.

use super::ast::{CompareOp, Expr, Literal, PathExpr};
use super::lexer::{Lexer, Token};
use crate::error::ScimError;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    pub fn parse(source: &'a str) -> Result<Expr, ScimError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser { tokens, pos: 0, source };
        let expr = parser.parse_or()?;
        parser.expect_eof()?;
        Ok(expr)
    }

    /// Parse a bare path expression (no relational/logical grammar), used
    /// for `attributes`/`excludedAttributes`/`sortBy` query parameters —
    /// those are resolved through the same attribute-path grammar a
    /// filter's left-hand side uses, just without the relational/logical
    /// operators around it.
    pub fn parse_path_only(source: &'a str) -> Result<PathExpr, ScimError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser { tokens, pos: 0, source };
        let path = parser.parse_path()?;
        parser.expect_eof()?;
        Ok(path)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_eof(&self) -> Result<(), ScimError> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(self.err(format!("unexpected trailing token {other:?}"))),
        }
    }

    fn err(&self, message: String) -> ScimError {
        ScimError::InvalidFilter {
            expression: self.source.to_string(),
            message,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ScimError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ScimError> {
        let mut lhs = self.parse_not()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ScimError> {
        if matches!(self.peek(), Token::Not) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ScimError> {
        match self.peek() {
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Path(_) => self.parse_attr_expr(),
            other => Err(self.err(format!("expected filter expression, found {other:?}"))),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ScimError> {
        let tok = self.advance();
        if tok == expected {
            Ok(())
        } else {
            Err(self.err(format!("expected {expected:?}, found {tok:?}")))
        }
    }

    fn parse_path(&mut self) -> Result<PathExpr, ScimError> {
        match self.advance() {
            Token::Path(raw) => Ok(super::compile_path(&raw)),
            other => Err(self.err(format!("expected attribute path, found {other:?}"))),
        }
    }

    /// `attrPath ("[" filter "]")? (("pr") | (compareOp compValue))?`
    fn parse_attr_expr(&mut self) -> Result<Expr, ScimError> {
        let path = self.parse_path()?;

        if matches!(self.peek(), Token::LBracket) {
            self.advance();
            let sub = self.parse_or()?;
            self.expect(Token::RBracket)?;
            return Ok(Expr::ValuePath(path, Box::new(sub)));
        }

        match self.advance() {
            Token::Pr => Ok(Expr::Present(path)),
            Token::Eq => self.finish_compare(path, CompareOp::Eq),
            Token::Ne => self.finish_compare(path, CompareOp::Ne),
            Token::Co => self.finish_compare(path, CompareOp::Co),
            Token::Sw => self.finish_compare(path, CompareOp::Sw),
            Token::Ew => self.finish_compare(path, CompareOp::Ew),
            Token::Gt => self.finish_compare(path, CompareOp::Gt),
            Token::Ge => self.finish_compare(path, CompareOp::Ge),
            Token::Lt => self.finish_compare(path, CompareOp::Lt),
            Token::Le => self.finish_compare(path, CompareOp::Le),
            other => Err(self.err(format!(
                "expected 'pr' or a comparison operator after path, found {other:?}"
            ))),
        }
    }

    fn finish_compare(&mut self, path: PathExpr, op: CompareOp) -> Result<Expr, ScimError> {
        let literal = self.parse_literal()?;
        Ok(Expr::Compare(path, op, literal))
    }

    fn parse_literal(&mut self) -> Result<Literal, ScimError> {
        match self.advance() {
            Token::Str(s) => Ok(Literal::Str(s)),
            Token::Number(n) => Ok(Literal::Number(n)),
            Token::Bool(b) => Ok(Literal::Bool(b)),
            Token::DateTime(s) => Ok(Literal::DateTime(s)),
            Token::Null => Ok(Literal::Null),
            other => Err(self.err(format!("expected a literal value, found {other:?}"))),
        }
    }
}
