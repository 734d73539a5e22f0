//! Variable access: `$x`, `$$name` and `$this`.
//!
//! `VarExpr` is the canonical storage node; all of its mode overrides
//! operate on the scope's reference cell for the name.

use std::fmt;
use std::rc::Rc;

use crate::core::value::Value;
use crate::core::var::Var;
use crate::env::Env;
use crate::env::error::{ErrorKind, ErrorLevel, EvalResult};
use crate::expr::{ArgSlot, Expr, ExprRef, Location};

pub struct VarExpr {
    name: Rc<str>,
    location: Location,
}

impl VarExpr {
    pub fn new(name: impl Into<Rc<str>>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    pub fn name(&self) -> &Rc<str> {
        &self.name
    }
}

impl Expr for VarExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        match env.get_var(&self.name) {
            Some(var) => Ok(var.get()),
            None => {
                env.report(
                    ErrorLevel::Notice,
                    Some(ErrorKind::UndefinedVariable),
                    &self.location,
                    format!("Undefined variable: ${}", self.name),
                );
                Ok(Value::Null)
            }
        }
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        let var = env.get_var_or_create(&self.name);
        var.mark_ref();
        Ok(var)
    }

    fn eval_arg(&self, env: &mut Env, _is_top: bool) -> EvalResult<ArgSlot> {
        Ok(ArgSlot::Ref(env.get_var_or_create(&self.name)))
    }

    fn eval_assign(&self, env: &mut Env, value: Value) -> EvalResult<()> {
        env.get_var_or_create(&self.name).set(value);
        Ok(())
    }

    fn eval_assign_ref(&self, env: &mut Env, var: Var) -> EvalResult<()> {
        var.mark_ref();
        env.set_local(self.name.clone(), var);
        Ok(())
    }

    fn eval_unset(&self, env: &mut Env) -> EvalResult<()> {
        env.unset_var(&self.name);
        Ok(())
    }

    fn eval_array(&self, env: &mut Env) -> EvalResult<Var> {
        let var = env.get_var_or_create(&self.name);
        var.ensure_array();
        Ok(var)
    }

    fn eval_object(&self, env: &mut Env) -> EvalResult<Var> {
        let var = env.get_var_or_create(&self.name);
        var.ensure_object();
        Ok(var)
    }

    fn eval_isset(&self, env: &mut Env) -> EvalResult<bool> {
        Ok(env.get_var(&self.name).is_some_and(|var| !var.is_null()))
    }
}

impl fmt::Display for VarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)
    }
}

/// Variable-variable, `$$name`: the inner expression yields the variable
/// name at runtime, then every mode behaves like `VarExpr` on that name.
pub struct VarVarExpr {
    name_expr: ExprRef,
    location: Location,
}

impl VarVarExpr {
    pub fn new(name_expr: ExprRef, location: Location) -> Self {
        Self {
            name_expr,
            location,
        }
    }

    fn resolve(&self, env: &mut Env) -> EvalResult<VarExpr> {
        let name = self.name_expr.eval(env)?;
        let name: Rc<str> = String::from_utf8_lossy(&name.to_string_bytes())
            .into_owned()
            .into();
        Ok(VarExpr::new(name, self.location.clone()))
    }
}

impl Expr for VarVarExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        self.resolve(env)?.eval(env)
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        self.resolve(env)?.eval_ref(env)
    }

    fn eval_arg(&self, env: &mut Env, is_top: bool) -> EvalResult<ArgSlot> {
        self.resolve(env)?.eval_arg(env, is_top)
    }

    fn eval_assign(&self, env: &mut Env, value: Value) -> EvalResult<()> {
        self.resolve(env)?.eval_assign(env, value)
    }

    fn eval_assign_ref(&self, env: &mut Env, var: Var) -> EvalResult<()> {
        self.resolve(env)?.eval_assign_ref(env, var)
    }

    fn eval_unset(&self, env: &mut Env) -> EvalResult<()> {
        self.resolve(env)?.eval_unset(env)
    }

    fn eval_array(&self, env: &mut Env) -> EvalResult<Var> {
        self.resolve(env)?.eval_array(env)
    }

    fn eval_object(&self, env: &mut Env) -> EvalResult<Var> {
        self.resolve(env)?.eval_object(env)
    }

    fn eval_isset(&self, env: &mut Env) -> EvalResult<bool> {
        self.resolve(env)?.eval_isset(env)
    }
}

impl fmt::Display for VarVarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}}}", self.name_expr)
    }
}

/// The receiver register. Read-only as a variable: `$this` cannot be
/// assigned, unset, or rebound.
pub struct ThisExpr {
    location: Location,
}

impl ThisExpr {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

impl Expr for ThisExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        Ok(env.this().clone())
    }

    fn eval_isset(&self, env: &mut Env) -> EvalResult<bool> {
        Ok(!env.this().is_null())
    }
}

impl fmt::Display for ThisExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$this")
    }
}
