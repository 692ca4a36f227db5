//! Recursive-descent parser for constraint expressions.
//!
//! Precedence, loosest first:
//!
//! ```text
//! or        :=  and ( ("||" | "or") and )*
//! and       :=  cmp ( ("&&" | "and") cmp )*
//! cmp       :=  add ( ("==" | "!=" | "<" | "<=" | ">" | ">=") add )?
//! add       :=  mul ( ("+" | "-") mul )*
//! mul       :=  unary ( ("*" | "/" | "%") unary )*
//! unary     :=  ("!" | "not" | "-") unary | postfix
//! postfix   :=  primary ( "." ident [ "(" args ")" ] | "[" or "]" )*
//! primary   :=  literal | ident [ "(" args ")" ] | "(" or ")"
//! ```
//!
//! Comparisons do not chain: `a < b < c` is a syntax error.

use dbc_core::Value;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::lexer::{Lexer, SpannedToken, Token};
use super::SyntaxError;

/// Maximum depth of the expression tree. Every parenthesis, unary operator,
/// postfix step and folded binary operator counts one level, so evaluation
/// and tree walks never recurse deeper than this.
pub const MAX_NESTING: usize = 64;

/// Parses a complete expression.
pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        index: 0,
        depth: 0,
    };
    if parser.peek() == &Token::Eof {
        return Err(SyntaxError::new("empty expression", 0));
    }
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    index: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.index)
            .map_or(&Token::Eof, |t| &t.token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.position)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), SyntaxError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", expected.describe())))
        }
    }

    fn expect_eof(&mut self) -> Result<(), SyntaxError> {
        if self.peek() == &Token::Eof {
            Ok(())
        } else {
            Err(self.unexpected("expected end of expression"))
        }
    }

    fn unexpected(&self, context: &str) -> SyntaxError {
        SyntaxError::new(
            format!("{context}, found {}", self.peek().describe()),
            self.position(),
        )
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(SyntaxError::new(
                format!("expression nesting exceeds {MAX_NESTING} levels"),
                self.position(),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.leave_levels(1);
    }

    fn leave_levels(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        let mut folded = 0;
        while self.eat(&Token::Or) {
            self.enter()?;
            folded += 1;
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        self.leave_levels(folded);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_comparison()?;
        let mut folded = 0;
        while self.eat(&Token::And) {
            self.enter()?;
            folded += 1;
            let right = self.parse_comparison()?;
            left = binary(BinaryOp::And, left, right);
        }
        self.leave_levels(folded);
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_additive()?;
        let Some(op) = comparison_op(self.peek()) else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_additive()?;
        if comparison_op(self.peek()).is_some() {
            return Err(self.unexpected("comparisons cannot be chained"));
        }
        Ok(binary(op, left, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        let mut folded = 0;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.enter()?;
            folded += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        self.leave_levels(folded);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        let mut folded = 0;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            self.enter()?;
            folded += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        self.leave_levels(folded);
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Token::Not => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        let mut chain = 0;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    self.enter()?;
                    chain += 1;
                    let Token::Ident(name) = self.peek().clone() else {
                        return Err(self.unexpected("expected member name after `.`"));
                    };
                    self.advance();
                    if self.peek() == &Token::LParen {
                        let args = self.parse_args()?;
                        expr = Expr::Call {
                            receiver: Some(Box::new(expr)),
                            name,
                            args,
                        };
                    } else {
                        expr = Expr::Member {
                            target: Box::new(expr),
                            member: name,
                        };
                    }
                }
                Token::LBracket => {
                    self.advance();
                    self.enter()?;
                    chain += 1;
                    let index = self.parse_or()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => {
                    self.leave_levels(chain);
                    return Ok(expr);
                }
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(Token::LParen)?;
        self.enter()?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(Token::RParen)?;
                break;
            }
        }
        self.leave();
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().clone() {
            Token::Int(v) => {
                self.advance();
                Ok(Expr::Literal(Value::Int(v)))
            }
            Token::Float(v) => {
                self.advance();
                Ok(Expr::Literal(Value::Float(v)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            Token::Ident(name) => {
                self.advance();
                if self.peek() == &Token::LParen {
                    let args = self.parse_args()?;
                    Ok(Expr::Call {
                        receiver: None,
                        name,
                        args,
                    })
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            Token::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_or()?;
                self.leave();
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expected a value")),
        }
    }
}

fn comparison_op(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::EqEq => Some(BinaryOp::Eq),
        Token::NotEq => Some(BinaryOp::Ne),
        Token::Lt => Some(BinaryOp::Lt),
        Token::Le => Some(BinaryOp::Le),
        Token::Gt => Some(BinaryOp::Gt),
        Token::Ge => Some(BinaryOp::Ge),
        _ => None,
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
