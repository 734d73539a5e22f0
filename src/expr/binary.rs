//! Operators: arithmetic, concatenation, comparison, boolean logic,
//! unary prefixes, the conditional, and casts.
//!
//! Coercion follows the engine's loose-typing rules: arithmetic promotes
//! to float on overflow or float operands, `==` compares numerically when
//! either side is numeric, `===` never coerces.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::core::value::Value;
use crate::env::Env;
use crate::env::error::EvalResult;
use crate::expr::{Expr, ExprRef, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Neq,
    Identical,
    NotIdentical,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Concat => ".",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

pub struct BinaryExpr {
    op: BinaryOp,
    left: ExprRef,
    right: ExprRef,
    location: Location,
}

impl BinaryExpr {
    pub fn new(op: BinaryOp, left: ExprRef, right: ExprRef, location: Location) -> Self {
        Self {
            op,
            left,
            right,
            location,
        }
    }
}

/// True when arithmetic on the pair must go through floats.
fn needs_double(a: &Value, b: &Value) -> bool {
    let is_double_ish = |v: &Value| match v {
        Value::Double(_) => true,
        Value::String(_) => v.is_numeric() && v.to_double().fract() != 0.0,
        _ => false,
    };
    is_double_ish(a) || is_double_ish(b)
}

fn add(a: &Value, b: &Value) -> Value {
    // array + array is the union, left operand wins on key conflicts
    if let (Value::Array(left), Value::Array(right)) = (a, b) {
        let mut merged = left.copy();
        for (key, slot) in &right.entries {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), slot.get().copy());
            }
        }
        return Value::Array(Rc::new(merged));
    }
    if needs_double(a, b) {
        return Value::Double(a.to_double() + b.to_double());
    }
    match a.to_long().checked_add(b.to_long()) {
        Some(sum) => Value::Long(sum),
        None => Value::Double(a.to_double() + b.to_double()),
    }
}

fn sub(a: &Value, b: &Value) -> Value {
    if needs_double(a, b) {
        return Value::Double(a.to_double() - b.to_double());
    }
    match a.to_long().checked_sub(b.to_long()) {
        Some(diff) => Value::Long(diff),
        None => Value::Double(a.to_double() - b.to_double()),
    }
}

fn mul(a: &Value, b: &Value) -> Value {
    if needs_double(a, b) {
        return Value::Double(a.to_double() * b.to_double());
    }
    match a.to_long().checked_mul(b.to_long()) {
        Some(product) => Value::Long(product),
        None => Value::Double(a.to_double() * b.to_double()),
    }
}

/// Loose equality, the `==` table.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => a.to_bool() == b.to_bool(),
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Null, _) | (_, Value::Null) => a.to_bool() == b.to_bool(),
        (Value::String(x), Value::String(y)) => {
            if a.is_numeric() && b.is_numeric() {
                a.to_double() == b.to_double()
            } else {
                x == y
            }
        }
        (Value::String(_), Value::Long(_) | Value::Double(_))
        | (Value::Long(_) | Value::Double(_), Value::String(_)) => a.to_double() == b.to_double(),
        _ => a == b,
    }
}

/// Strict equality, the `===` table: same type, same value, no coercion.
pub fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Long(x), Value::Long(y)) => x == y,
        (Value::Double(x), Value::Double(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len()
                && x.entries
                    .iter()
                    .zip(y.entries.iter())
                    .all(|((ka, sa), (kb, sb))| ka == kb && identical(&sa.get(), &sb.get()))
        }
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// Relational comparison: numeric when either side is numeric, bytewise for
/// string pairs.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) if !(a.is_numeric() && b.is_numeric()) => x.cmp(y),
        _ => a
            .to_double()
            .partial_cmp(&b.to_double())
            .unwrap_or(Ordering::Equal),
    }
}

impl Expr for BinaryExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        // boolean operators short-circuit before touching the right side
        match self.op {
            BinaryOp::And => {
                if !self.left.eval(env)?.to_bool() {
                    return Ok(Value::Bool(false));
                }
                return Ok(Value::Bool(self.right.eval(env)?.to_bool()));
            }
            BinaryOp::Or => {
                if self.left.eval(env)?.to_bool() {
                    return Ok(Value::Bool(true));
                }
                return Ok(Value::Bool(self.right.eval(env)?.to_bool()));
            }
            _ => {}
        }

        let a = self.left.eval(env)?;
        let b = self.right.eval(env)?;
        Ok(match self.op {
            BinaryOp::Add => add(&a, &b),
            BinaryOp::Sub => sub(&a, &b),
            BinaryOp::Mul => mul(&a, &b),
            BinaryOp::Div => {
                let divisor = b.to_double();
                if divisor == 0.0 {
                    env.warning(&self.location, "Division by zero");
                    Value::Bool(false)
                } else if let (Value::Long(x), Value::Long(y)) = (&a, &b) {
                    if x % y == 0 {
                        Value::Long(x / y)
                    } else {
                        Value::Double(*x as f64 / *y as f64)
                    }
                } else {
                    Value::Double(a.to_double() / divisor)
                }
            }
            BinaryOp::Mod => {
                let divisor = b.to_long();
                if divisor == 0 {
                    env.warning(&self.location, "Modulo by zero");
                    Value::Bool(false)
                } else {
                    Value::Long(a.to_long().wrapping_rem(divisor))
                }
            }
            BinaryOp::Concat => {
                let mut bytes = a.to_string_bytes();
                bytes.extend_from_slice(&b.to_string_bytes());
                Value::String(Rc::new(bytes))
            }
            BinaryOp::Eq => Value::Bool(loose_eq(&a, &b)),
            BinaryOp::Neq => Value::Bool(!loose_eq(&a, &b)),
            BinaryOp::Identical => Value::Bool(identical(&a, &b)),
            BinaryOp::NotIdentical => Value::Bool(!identical(&a, &b)),
            BinaryOp::Lt => Value::Bool(compare(&a, &b) == Ordering::Less),
            BinaryOp::Le => Value::Bool(compare(&a, &b) != Ordering::Greater),
            BinaryOp::Gt => Value::Bool(compare(&a, &b) == Ordering::Greater),
            BinaryOp::Ge => Value::Bool(compare(&a, &b) != Ordering::Less),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        })
    }

    fn concat_parts(&self) -> Option<(&ExprRef, &ExprRef)> {
        if self.op == BinaryOp::Concat {
            Some((&self.left, &self.right))
        } else {
            None
        }
    }
}

impl fmt::Display for BinaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.op.symbol(), self.right)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum UnaryOp {
    Neg,
    Not,
}

pub struct UnaryExpr {
    op: UnaryOp,
    operand: ExprRef,
    location: Location,
}

impl UnaryExpr {
    pub fn new(op: UnaryOp, operand: ExprRef, location: Location) -> Self {
        Self {
            op,
            operand,
            location,
        }
    }
}

impl Expr for UnaryExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let value = self.operand.eval(env)?;
        Ok(match self.op {
            UnaryOp::Not => Value::Bool(!value.to_bool()),
            UnaryOp::Neg => match &value {
                Value::Double(d) => Value::Double(-d),
                other => match other.to_long().checked_neg() {
                    Some(n) => Value::Long(n),
                    None => Value::Double(-other.to_double()),
                },
            },
        })
    }
}

impl fmt::Display for UnaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            UnaryOp::Neg => write!(f, "-{}", self.operand),
            UnaryOp::Not => write!(f, "!{}", self.operand),
        }
    }
}

/// `cond ? then : else`; only the taken branch is evaluated.
pub struct ConditionalExpr {
    cond: ExprRef,
    then: ExprRef,
    otherwise: ExprRef,
    location: Location,
}

impl ConditionalExpr {
    pub fn new(cond: ExprRef, then: ExprRef, otherwise: ExprRef, location: Location) -> Self {
        Self {
            cond,
            then,
            otherwise,
            location,
        }
    }
}

impl Expr for ConditionalExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        if self.cond.eval(env)?.to_bool() {
            self.then.eval(env)
        } else {
            self.otherwise.eval(env)
        }
    }
}

impl fmt::Display for ConditionalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} ? {} : {})", self.cond, self.then, self.otherwise)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CastKind {
    Bool,
    Int,
    Float,
    String,
    Array,
}

pub struct CastExpr {
    kind: CastKind,
    operand: ExprRef,
    location: Location,
}

impl CastExpr {
    pub fn new(kind: CastKind, operand: ExprRef, location: Location) -> Self {
        Self {
            kind,
            operand,
            location,
        }
    }
}

impl Expr for CastExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let value = self.operand.eval(env)?;
        Ok(match self.kind {
            CastKind::Bool => Value::Bool(value.to_bool()),
            CastKind::Int => Value::Long(value.to_long()),
            CastKind::Float => Value::Double(value.to_double()),
            CastKind::String => Value::String(Rc::new(value.to_string_bytes())),
            CastKind::Array => match value {
                arr @ Value::Array(_) => arr,
                Value::Null => Value::empty_array(),
                other => {
                    let mut data = crate::core::value::ArrayData::new();
                    data.push(other);
                    Value::Array(Rc::new(data))
                }
            },
        })
    }
}

impl fmt::Display for CastExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            CastKind::Bool => "bool",
            CastKind::Int => "int",
            CastKind::Float => "float",
            CastKind::String => "string",
            CastKind::Array => "array",
        };
        write!(f, "({}) {}", name, self.operand)
    }
}
