//! Assignment forms: `=`, `=&`, `list()`, `isset`.

use std::fmt;

use crate::core::value::Value;
use crate::env::Env;
use crate::env::error::EvalResult;
use crate::expr::{ArgSlot, Expr, ExprRef, Location};
use crate::core::var::Var;
use crate::core::value::ArrayKey;

/// `target = value`. The right side is copied before the store so the
/// target never aliases the source, and the copied value is also the
/// expression's own result (`$a = $b = 1`).
pub struct AssignExpr {
    target: ExprRef,
    value: ExprRef,
    location: Location,
}

impl AssignExpr {
    pub fn new(target: ExprRef, value: ExprRef, location: Location) -> Self {
        Self {
            target,
            value,
            location,
        }
    }
}

impl Expr for AssignExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let value = self.value.eval_copy(env)?;
        self.target.eval_assign(env, value.clone())?;
        Ok(value)
    }
}

impl fmt::Display for AssignExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.target, self.value)
    }
}

/// `target =& source`: the target's binding is replaced with the source's
/// cell, so both names observe every later write.
pub struct AssignRefExpr {
    target: ExprRef,
    source: ExprRef,
    location: Location,
}

impl AssignRefExpr {
    pub fn new(target: ExprRef, source: ExprRef, location: Location) -> Self {
        Self {
            target,
            source,
            location,
        }
    }
}

impl Expr for AssignRefExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let var = self.source.eval_ref(env)?;
        self.target.eval_assign_ref(env, var.clone())?;
        Ok(var.get())
    }
}

impl fmt::Display for AssignRefExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} =& {}", self.target, self.source)
    }
}

/// `list($a, $b) = $arr`: positional destructuring; holes skip an index.
pub struct ListAssignExpr {
    targets: Vec<Option<ExprRef>>,
    value: ExprRef,
    location: Location,
}

impl ListAssignExpr {
    pub fn new(targets: Vec<Option<ExprRef>>, value: ExprRef, location: Location) -> Self {
        Self {
            targets,
            value,
            location,
        }
    }
}

impl Expr for ListAssignExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let value = self.value.eval_copy(env)?;
        if let Value::Array(arr) = &value {
            for (i, target) in self.targets.iter().enumerate() {
                let Some(target) = target else { continue };
                let element = arr
                    .get(&ArrayKey::Int(i as i64))
                    .unwrap_or(Value::Null)
                    .copy();
                target.eval_assign(env, element)?;
            }
        } else {
            for target in self.targets.iter().flatten() {
                target.eval_assign(env, Value::Null)?;
            }
        }
        Ok(value)
    }
}

impl fmt::Display for ListAssignExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list(")?;
        for (i, target) in self.targets.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if let Some(target) = target {
                write!(f, "{}", target)?;
            }
        }
        write!(f, ") = {}", self.value)
    }
}

/// Prefix `&expr` in argument position: forces the cell through to the
/// binder even for a by-value parameter.
pub struct RefExpr {
    operand: ExprRef,
    location: Location,
}

impl RefExpr {
    pub fn new(operand: ExprRef, location: Location) -> Self {
        Self { operand, location }
    }
}

impl Expr for RefExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        self.operand.eval(env)
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        self.operand.eval_ref(env)
    }

    fn eval_arg(&self, env: &mut Env, _is_top: bool) -> EvalResult<ArgSlot> {
        Ok(ArgSlot::Ref(self.operand.eval_ref(env)?))
    }
}

impl fmt::Display for RefExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&{}", self.operand)
    }
}

/// `isset(...)`: true only when every operand is bound and non-null.
/// Never reports undefined-variable notices.
pub struct IssetExpr {
    operands: Vec<ExprRef>,
    location: Location,
}

impl IssetExpr {
    pub fn new(operands: Vec<ExprRef>, location: Location) -> Self {
        Self { operands, location }
    }
}

impl Expr for IssetExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        for operand in &self.operands {
            if !operand.eval_isset(env)? {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    }
}

impl fmt::Display for IssetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "isset(")?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", operand)?;
        }
        write!(f, ")")
    }
}
