//! Static class fields: `A::$x`, `self::$x`, `static::$x`.
//!
//! The descriptor only declares the field; the storage cell lives on the
//! environment, so two concurrent executions never see each other's
//! statics.

use std::fmt;
use std::rc::Rc;

use crate::core::value::Value;
use crate::core::var::Var;
use crate::env::Env;
use crate::env::error::EvalResult;
use crate::expr::{ClassNameRef, Expr, Location};

pub struct StaticFieldExpr {
    class: ClassNameRef,
    name: Rc<str>,
    location: Location,
}

impl StaticFieldExpr {
    pub fn new(class: ClassNameRef, name: impl Into<Rc<str>>, location: Location) -> Self {
        Self {
            class,
            name: name.into(),
            location,
        }
    }

    fn cell(&self, env: &mut Env) -> EvalResult<Option<Var>> {
        match self.class.resolve(env, &self.location) {
            Some(class) => Ok(Some(env.static_field_var(&class, &self.name, &self.location)?)),
            None => Ok(None),
        }
    }
}

impl Expr for StaticFieldExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        match self.cell(env)? {
            Some(var) => Ok(var.get()),
            None => Ok(Value::Null),
        }
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
        if let Some(class) = self.class.resolve(env, &self.location) {
            var.mark_ref();
            env.rebind_static_field(&class, &self.name, var);
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
        match self.class.resolve(env, &self.location) {
            Some(class) => match class.find_static_decl(&self.name) {
                Some(_) => Ok(!env
                    .static_field_var(&class, &self.name, &self.location)?
                    .is_null()),
                None => Ok(false),
            },
            None => Ok(false),
        }
    }
}

impl fmt::Display for StaticFieldExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::${}", self.class, self.name)
    }
}
