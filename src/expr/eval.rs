// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Number, Value};

use super::parser::{BinaryOp, Node, UnaryOp};
use super::ExprError;

pub(crate) fn eval(node: &Node, scope: &Map<String, Value>) -> Result<Value, ExprError> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Ident(name) => Ok(scope.get(name).cloned().unwrap_or(Value::Null)),
        Node::Member(target, field) => Ok(member(eval(target, scope)?, field)),
        Node::Index(target, index) => index_into(eval(target, scope)?, eval(index, scope)?),
        Node::Unary(op, operand) => unary(*op, eval(operand, scope)?),
        Node::Binary(BinaryOp::And, left, right) => {
            if !truthy(&eval(left, scope)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&eval(right, scope)?)?))
        }
        Node::Binary(BinaryOp::Or, left, right) => {
            if truthy(&eval(left, scope)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&eval(right, scope)?)?))
        }
        Node::Binary(op, left, right) => binary(*op, eval(left, scope)?, eval(right, scope)?),
        Node::Conditional(condition, then, otherwise) => {
            if truthy(&eval(condition, scope)?)? {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Node::Array(items) => items
            .iter()
            .map(|item| eval(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Object(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (key, value) in fields {
                map.insert(key.clone(), eval(value, scope)?);
            }
            Ok(Value::Object(map))
        }
        Node::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, args)
        }
    }
}

/// `null` and `false` are falsy, `true` is truthy; anything else is a type error.
fn truthy(value: &Value) -> Result<bool, ExprError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(ExprError::Type(format!(
            "expected a boolean, found {}",
            type_name(other)
        ))),
    }
}

fn member(target: Value, field: &str) -> Value {
    match target {
        Value::Object(mut map) => map.remove(field).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn index_into(target: Value, index: Value) -> Result<Value, ExprError> {
    match (target, index) {
        (Value::Array(mut items), Value::Number(n)) => {
            let i = n
                .as_i64()
                .ok_or_else(|| ExprError::Type(format!("array index {} is not an integer", n)))?;
            let len = items.len() as i64;
            let resolved = if i < 0 { len + i } else { i };
            if resolved < 0 || resolved >= len {
                return Ok(Value::Null);
            }
            Ok(items.swap_remove(resolved as usize))
        }
        (Value::Object(mut map), Value::String(key)) => Ok(map.remove(&key).unwrap_or(Value::Null)),
        (Value::Null, _) => Ok(Value::Null),
        (target, index) => Err(ExprError::Type(format!(
            "cannot index {} with {}",
            type_name(&target),
            type_name(&index)
        ))),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, ExprError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!truthy(&value)?)),
        UnaryOp::Neg => match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
                    Ok(Value::from(i))
                } else {
                    float(-n.as_f64().unwrap_or_default())
                }
            }
            other => Err(ExprError::Type(format!("cannot negate {}", type_name(&other)))),
        },
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(&left, &right))),
        BinaryOp::NotEq => Ok(Value::Bool(!equals(&left, &right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => compare(op, &left, &right),
        BinaryOp::Add => match (&left, &right) {
            (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!(
                "{}{}",
                to_display(&left),
                to_display(&right)
            ))),
            (Value::Array(a), Value::Array(b)) => {
                Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => arithmetic(op, &left, &right),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, &left, &right)
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators are handled by eval"),
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => left == right,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
            a.partial_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(ExprError::Type(format!(
                "cannot compare {} with {}",
                type_name(left),
                type_name(right)
            )))
        }
    };

    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::LtEq => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(ExprError::Type(format!(
            "cannot apply {:?} to {} and {}",
            op,
            type_name(left),
            type_name(right)
        )));
    };

    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        let exact = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div | BinaryOp::Rem if b == 0 => return Err(ExprError::DivisionByZero),
            BinaryOp::Div if a.checked_rem(b) == Some(0) => a.checked_div(b),
            BinaryOp::Rem => a.checked_rem(b),
            _ => None,
        };
        if let Some(result) = exact {
            return Ok(Value::from(result));
        }
    }

    let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => return Err(ExprError::DivisionByZero),
        BinaryOp::Div => a / b,
        _ => a % b,
    };
    float(result)
}

fn float(f: f64) -> Result<Value, ExprError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ExprError::Type(format!("{} is not a finite number", f)))
}

fn call(name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    match (name, args.as_slice()) {
        ("len", [value]) => {
            let len = match value {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                Value::Null => 0,
                other => {
                    return Err(ExprError::Type(format!(
                        "len() is undefined for {}",
                        type_name(other)
                    )))
                }
            };
            Ok(Value::from(len as u64))
        }
        ("string", [value]) => Ok(Value::String(to_display(value))),
        ("len", _) | ("string", _) => Err(ExprError::Type(format!(
            "{}() takes exactly one argument, got {}",
            name,
            args.len()
        ))),
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}

/// Renders a value the way string concatenation and `log` show it.
pub(crate) fn to_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
