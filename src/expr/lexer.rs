// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Tokenizer for the expression language.

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
}

/// A token together with the char offset it started at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let token = match c {
            '(' => single(&mut i, Token::LParen),
            ')' => single(&mut i, Token::RParen),
            '[' => single(&mut i, Token::LBracket),
            ']' => single(&mut i, Token::RBracket),
            '{' => single(&mut i, Token::LBrace),
            '}' => single(&mut i, Token::RBrace),
            ',' => single(&mut i, Token::Comma),
            ':' => single(&mut i, Token::Colon),
            '.' => single(&mut i, Token::Dot),
            '?' => single(&mut i, Token::Question),
            '+' => single(&mut i, Token::Plus),
            '-' => single(&mut i, Token::Minus),
            '*' => single(&mut i, Token::Star),
            '/' => single(&mut i, Token::Slash),
            '%' => single(&mut i, Token::Percent),
            '!' if peek(&chars, i + 1) == Some('=') => double(&mut i, Token::NotEq),
            '!' => single(&mut i, Token::Bang),
            '=' if peek(&chars, i + 1) == Some('=') => double(&mut i, Token::EqEq),
            '<' if peek(&chars, i + 1) == Some('=') => double(&mut i, Token::LtEq),
            '<' => single(&mut i, Token::Lt),
            '>' if peek(&chars, i + 1) == Some('=') => double(&mut i, Token::GtEq),
            '>' => single(&mut i, Token::Gt),
            '&' if peek(&chars, i + 1) == Some('&') => double(&mut i, Token::AndAnd),
            '|' if peek(&chars, i + 1) == Some('|') => double(&mut i, Token::OrOr),
            '\'' | '"' => lex_string(&chars, &mut i)?,
            c if c.is_ascii_digit() => lex_number(&chars, &mut i)?,
            c if c.is_alphabetic() || c == '_' || c == '$' => lex_word(&chars, &mut i),
            other => {
                return Err(ExprError::Syntax {
                    position: start,
                    message: format!("unexpected character '{}'", other),
                })
            }
        };

        out.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(out)
}

fn peek(chars: &[char], i: usize) -> Option<char> {
    chars.get(i).copied()
}

fn single(i: &mut usize, token: Token) -> Token {
    *i += 1;
    token
}

fn double(i: &mut usize, token: Token) -> Token {
    *i += 2;
    token
}

fn lex_string(chars: &[char], i: &mut usize) -> Result<Token, ExprError> {
    let start = *i;
    let quote = chars[*i];
    *i += 1;

    let mut value = String::new();
    while *i < chars.len() {
        let c = chars[*i];
        if c == quote {
            *i += 1;
            return Ok(Token::Str(value));
        }
        if c == '\\' {
            let escaped = peek(chars, *i + 1).ok_or_else(|| ExprError::Syntax {
                position: *i,
                message: "dangling escape".to_string(),
            })?;
            value.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            *i += 2;
            continue;
        }
        value.push(c);
        *i += 1;
    }

    Err(ExprError::Syntax {
        position: start,
        message: "unterminated string".to_string(),
    })
}

fn lex_number(chars: &[char], i: &mut usize) -> Result<Token, ExprError> {
    let start = *i;
    let mut is_float = false;
    while *i < chars.len() {
        let c = chars[*i];
        if c.is_ascii_digit() || c == '_' {
            *i += 1;
        } else if c == '.' && !is_float && peek(chars, *i + 1).is_some_and(|n| n.is_ascii_digit()) {
            is_float = true;
            *i += 1;
        } else {
            break;
        }
    }

    let text: String = chars[start..*i].iter().filter(|c| **c != '_').collect();
    let invalid = |_| ExprError::Syntax {
        position: start,
        message: format!("invalid number '{}'", text),
    };
    if is_float {
        text.parse::<f64>().map(Token::Float).map_err(invalid)
    } else {
        text.parse::<i64>().map(Token::Int).map_err(|_| ExprError::Syntax {
            position: start,
            message: format!("integer '{}' out of range", text),
        })
    }
}

fn lex_word(chars: &[char], i: &mut usize) -> Token {
    let start = *i;
    while *i < chars.len() && (chars[*i].is_alphanumeric() || chars[*i] == '_' || chars[*i] == '$') {
        *i += 1;
    }
    let word: String = chars[start..*i].iter().collect();
    match word.as_str() {
        "true" => Token::True,
        "false" => Token::False,
        "null" | "nil" => Token::Null,
        "and" => Token::AndAnd,
        "or" => Token::OrOr,
        "not" => Token::Bang,
        _ => Token::Ident(word),
    }
}
