//! Object property access: `$this->f`, `$obj->f` and `$obj->$name`.

use std::fmt;
use std::rc::Rc;

use crate::core::value::Value;
use crate::core::var::Var;
use crate::env::Env;
use crate::expr::{Expr, ExprRef, Location};
use crate::env::error::EvalResult;

fn read_field(env: &mut Env, obj: &Value, name: &str, location: &Location) -> Value {
    match obj.as_object() {
        Some(handle) => match handle.borrow().get_field(name) {
            Some(value) => value,
            None => {
                env.notice(location, format!("Undefined property: ->{}", name));
                Value::Null
            }
        },
        None => {
            env.warning(
                location,
                format!("Attempt to read property '{}' on {}", name, obj.type_name()),
            );
            Value::Null
        }
    }
}

fn field_isset(obj: &Value, name: &str) -> bool {
    obj.as_object()
        .and_then(|handle| handle.borrow().get_field(name))
        .is_some_and(|value| !value.is_null())
}

/// `$this->name`, with the receiver taken from the environment register.
pub struct ThisFieldExpr {
    name: Rc<str>,
    location: Location,
}

impl ThisFieldExpr {
    pub fn new(name: impl Into<Rc<str>>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    fn cell(&self, env: &mut Env) -> Option<Var> {
        let handle = env.this().as_object()?.clone();
        let var = handle.borrow_mut().field_var(self.name.clone());
        Some(var)
    }
}

impl Expr for ThisFieldExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let this = env.this().clone();
        if this.is_null() {
            env.warning(&self.location, "Using $this when not in object context");
            return Ok(Value::Null);
        }
        Ok(read_field(env, &this, &self.name, &self.location))
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        match self.cell(env) {
            Some(var) => {
                var.mark_ref();
                Ok(var)
            }
            None => {
                env.warning(&self.location, "Using $this when not in object context");
                Ok(Var::new_ref(Value::Null))
            }
        }
    }

    fn eval_assign(&self, env: &mut Env, value: Value) -> EvalResult<()> {
        match self.cell(env) {
            Some(var) => var.set(value),
            None => env.warning(&self.location, "Using $this when not in object context"),
        }
        Ok(())
    }

    fn eval_assign_ref(&self, env: &mut Env, var: Var) -> EvalResult<()> {
        match env.this().as_object().cloned() {
            Some(handle) => {
                var.mark_ref();
                handle.borrow_mut().properties.insert(self.name.clone(), var);
            }
            None => env.warning(&self.location, "Using $this when not in object context"),
        }
        Ok(())
    }

    fn eval_unset(&self, env: &mut Env) -> EvalResult<()> {
        if let Some(handle) = env.this().as_object() {
            handle.borrow_mut().remove_field(&self.name);
        }
        Ok(())
    }

    fn eval_array(&self, env: &mut Env) -> EvalResult<Var> {
        match self.cell(env) {
            Some(var) => {
                var.ensure_array();
                Ok(var)
            }
            None => Ok(Var::new(Value::empty_array())),
        }
    }

    fn eval_object(&self, env: &mut Env) -> EvalResult<Var> {
        match self.cell(env) {
            Some(var) => {
                var.ensure_object();
                Ok(var)
            }
            None => Ok(Var::new(Value::new_object(None))),
        }
    }

    fn eval_isset(&self, env: &mut Env) -> EvalResult<bool> {
        Ok(field_isset(env.this(), &self.name))
    }
}

impl fmt::Display for ThisFieldExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$this->{}", self.name)
    }
}

/// `obj->name` with a statically known property name.
pub struct FieldGetExpr {
    obj: ExprRef,
    name: Rc<str>,
    location: Location,
}

impl FieldGetExpr {
    pub fn new(obj: ExprRef, name: impl Into<Rc<str>>, location: Location) -> Self {
        Self {
            obj,
            name: name.into(),
            location,
        }
    }

    /// Property cell through the write path: the base is coerced toward an
    /// object, vivifying a null base.
    fn cell(&self, env: &mut Env) -> EvalResult<Option<Var>> {
        let base = self.obj.eval_object(env)?;
        match base.object_handle() {
            Some(handle) => Ok(Some(handle.borrow_mut().field_var(self.name.clone()))),
            None => {
                env.warning(
                    &self.location,
                    format!(
                        "Attempt to assign property '{}' on {}",
                        self.name,
                        base.get().type_name()
                    ),
                );
                Ok(None)
            }
        }
    }
}

impl Expr for FieldGetExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let obj = self.obj.eval(env)?;
        Ok(read_field(env, &obj, &self.name, &self.location))
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        match self.cell(env)? {
            Some(var) => {
                var.mark_ref();
                Ok(var)
            }
            None => Ok(Var::new_ref(Value::Null)),
        }
    }

    fn eval_assign(&self, env: &mut Env, value: Value) -> EvalResult<()> {
        if let Some(var) = self.cell(env)? {
            var.set(value);
        }
        Ok(())
    }

    fn eval_assign_ref(&self, env: &mut Env, var: Var) -> EvalResult<()> {
        let base = self.obj.eval_object(env)?;
        if let Some(handle) = base.object_handle() {
            var.mark_ref();
            handle.borrow_mut().properties.insert(self.name.clone(), var);
        }
        Ok(())
    }

    fn eval_unset(&self, env: &mut Env) -> EvalResult<()> {
        let obj = self.obj.eval(env)?;
        if let Some(handle) = obj.as_object() {
            handle.borrow_mut().remove_field(&self.name);
        }
        Ok(())
    }

    fn eval_array(&self, env: &mut Env) -> EvalResult<Var> {
        match self.cell(env)? {
            Some(var) => {
                var.ensure_array();
                Ok(var)
            }
            None => Ok(Var::new(Value::empty_array())),
        }
    }

    fn eval_object(&self, env: &mut Env) -> EvalResult<Var> {
        match self.cell(env)? {
            Some(var) => {
                var.ensure_object();
                Ok(var)
            }
            None => Ok(Var::new(Value::new_object(None))),
        }
    }

    fn eval_isset(&self, env: &mut Env) -> EvalResult<bool> {
        // an unset base is simply not set, no notice
        if !self.obj.eval_isset(env)? {
            return Ok(false);
        }
        let obj = self.obj.eval(env)?;
        Ok(field_isset(&obj, &self.name))
    }
}

impl fmt::Display for FieldGetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.obj, self.name)
    }
}

/// `obj->$name`: the property name itself is computed at runtime, then the
/// access delegates to the static-name node.
pub struct FieldVarGetExpr {
    obj: ExprRef,
    name_expr: ExprRef,
    location: Location,
}

impl FieldVarGetExpr {
    pub fn new(obj: ExprRef, name_expr: ExprRef, location: Location) -> Self {
        Self {
            obj,
            name_expr,
            location,
        }
    }

    fn resolve(&self, env: &mut Env) -> EvalResult<FieldGetExpr> {
        let name = self.name_expr.eval(env)?;
        let name: Rc<str> = String::from_utf8_lossy(&name.to_string_bytes())
            .into_owned()
            .into();
        Ok(FieldGetExpr::new(
            self.obj.clone(),
            name,
            self.location.clone(),
        ))
    }
}

impl Expr for FieldVarGetExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        self.resolve(env)?.eval(env)
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        self.resolve(env)?.eval_ref(env)
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

impl fmt::Display for FieldVarGetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{{{}}}", self.obj, self.name_expr)
    }
}
