// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Precedence-climbing parser producing a [`Node`] tree.

use serde_json::Value;

use super::lexer::{tokenize, Spanned, Token};
use super::ExprError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_token(token: &Token) -> Option<Self> {
        Some(match token {
            Token::OrOr => BinaryOp::Or,
            Token::AndAnd => BinaryOp::And,
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::NotEq,
            Token::Lt => BinaryOp::Lt,
            Token::LtEq => BinaryOp::LtEq,
            Token::Gt => BinaryOp::Gt,
            Token::GtEq => BinaryOp::GtEq,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Rem,
            _ => return None,
        })
    }

    /// Binding power; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Literal(Value),
    Ident(String),
    Member(Box<Node>, String),
    Index(Box<Node>, Box<Node>),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Conditional(Box<Node>, Box<Node>, Box<Node>),
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
    Call(String, Vec<Node>),
}

pub(crate) fn parse(source: &str) -> Result<Node, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.chars().count(),
    };
    let node = parser.conditional()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(ExprError::Syntax {
            position: extra.position,
            message: format!("unexpected {:?}", extra.token),
        });
    }
    Ok(node)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|s| s.position).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", expected)))
        }
    }

    fn error(&self, message: String) -> ExprError {
        ExprError::Syntax {
            position: self.position(),
            message,
        }
    }

    fn conditional(&mut self) -> Result<Node, ExprError> {
        let condition = self.binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then = self.conditional()?;
        self.expect(Token::Colon)?;
        let otherwise = self.conditional()?;
        Ok(Node::Conditional(
            Box::new(condition),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Node, ExprError> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek().and_then(BinaryOp::from_token) {
            let precedence = op.precedence();
            if precedence <= min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.binary(precedence)?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        if self.eat(&Token::Bang) {
            return Ok(Node::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Node::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Node, ExprError> {
        let mut node = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(name)) => node = Node::Member(Box::new(node), name),
                    _ => return Err(self.error("expected field name after '.'".to_string())),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.conditional()?;
                self.expect(Token::RBracket)?;
                node = Node::Index(Box::new(node), Box::new(index));
            } else {
                return Ok(node);
            }
        }
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        let position = self.position();
        let token = self
            .advance()
            .ok_or_else(|| self.error("unexpected end of expression".to_string()))?;

        match token {
            Token::Int(n) => Ok(Node::Literal(Value::from(n))),
            Token::Float(f) => Ok(Node::Literal(Value::from(f))),
            Token::Str(s) => Ok(Node::Literal(Value::String(s))),
            Token::True => Ok(Node::Literal(Value::Bool(true))),
            Token::False => Ok(Node::Literal(Value::Bool(false))),
            Token::Null => Ok(Node::Literal(Value::Null)),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.list(Token::RParen)?;
                    Ok(Node::Call(name, args))
                } else {
                    Ok(Node::Ident(name))
                }
            }
            Token::LParen => {
                let inner = self.conditional()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => Ok(Node::Array(self.list(Token::RBracket)?)),
            Token::LBrace => self.object(),
            other => Err(ExprError::Syntax {
                position,
                message: format!("unexpected {:?}", other),
            }),
        }
    }

    fn list(&mut self, close: Token) -> Result<Vec<Node>, ExprError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.conditional()?);
            if self.eat(&close) {
                return Ok(items);
            }
            self.expect(Token::Comma)?;
        }
    }

    fn object(&mut self) -> Result<Node, ExprError> {
        let mut fields = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Node::Object(fields));
        }
        loop {
            let key = match self.advance() {
                Some(Token::Ident(key)) | Some(Token::Str(key)) => key,
                _ => return Err(self.error("expected object key".to_string())),
            };
            self.expect(Token::Colon)?;
            fields.push((key, self.conditional()?));
            if self.eat(&Token::RBrace) {
                return Ok(Node::Object(fields));
            }
            self.expect(Token::Comma)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Node> {
        Box::new(Node::Ident(name.to_string()))
    }

    fn int(n: i64) -> Box<Node> {
        Box::new(Node::Literal(Value::from(n)))
    }

    #[test]
    fn test_precedence_multiplication_binds_tighter() {
        let node = parse("a + b * 2").unwrap();
        assert_eq!(
            node,
            Node::Binary(
                BinaryOp::Add,
                ident("a"),
                Box::new(Node::Binary(BinaryOp::Mul, ident("b"), int(2)))
            )
        );
    }

    #[test]
    fn test_left_associativity() {
        let node = parse("10 - 3 - 2").unwrap();
        assert_eq!(
            node,
            Node::Binary(
                BinaryOp::Sub,
                Box::new(Node::Binary(BinaryOp::Sub, int(10), int(3))),
                int(2)
            )
        );
    }

    #[test]
    fn test_logical_precedence() {
        let node = parse("a || b && c").unwrap();
        assert!(matches!(node, Node::Binary(BinaryOp::Or, _, _)));
    }

    #[test]
    fn test_object_and_member_access() {
        let node = parse("{name: input.user['first'], tags: []}").unwrap();
        match node {
            Node::Object(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].0, "name");
                assert!(matches!(fields[0].1, Node::Index(_, _)));
                assert_eq!(fields[1].1, Node::Array(vec![]));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors() {
        let test_cases = vec!["", "a +", "(a", "a b", "{1: 2}", "x.", "a ? b"];
        for source in test_cases {
            assert!(
                matches!(parse(source), Err(ExprError::Syntax { .. })),
                "expected syntax error for '{}'",
                source
            );
        }
    }
}
