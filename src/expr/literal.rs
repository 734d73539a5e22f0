use std::fmt;

use crate::core::value::Value;
use crate::env::Env;
use crate::env::error::EvalResult;
use crate::expr::{Expr, Location};

/// Constant value baked in at load time.
pub struct LiteralExpr {
    value: Value,
    location: Location,
}

impl LiteralExpr {
    pub fn new(value: Value, location: Location) -> Self {
        Self { value, location }
    }
}

impl Expr for LiteralExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, _env: &mut Env) -> EvalResult {
        Ok(self.value.clone())
    }

    fn literal_value(&self) -> Option<&Value> {
        Some(&self.value)
    }
}

impl fmt::Display for LiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => write!(f, "'{}'", String::from_utf8_lossy(s)),
            other => write!(f, "{}", other),
        }
    }
}
