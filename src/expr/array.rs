//! Array subscripts and array literals.
//!
//! `ArrayGetExpr` is the workhorse storage node: reads go through the plain
//! value, writes go through the base's storage cell so chains like
//! `$a[0][1] = $v` vivify intermediate arrays in place.

use std::fmt;
use std::rc::Rc;

use crate::core::value::{ArrayData, ArrayKey, Value};
use crate::core::var::Var;
use crate::env::Env;
use crate::env::error::EvalResult;
use crate::expr::{ArgSlot, Expr, ExprRef, Location};

pub struct ArrayGetExpr {
    array: ExprRef,
    /// `None` is the append form `$a[]`, valid only in write positions.
    index: Option<ExprRef>,
    location: Location,
}

impl ArrayGetExpr {
    pub fn new(array: ExprRef, index: Option<ExprRef>, location: Location) -> Self {
        Self {
            array,
            index,
            location,
        }
    }

    fn key(&self, env: &mut Env) -> EvalResult<Option<ArrayKey>> {
        match &self.index {
            Some(index) => Ok(Some(ArrayKey::from_value(&index.eval(env)?))),
            None => Ok(None),
        }
    }
}

impl Expr for ArrayGetExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let Some(key) = self.key(env)? else {
            env.warning(&self.location, "Cannot use [] for reading");
            return Ok(Value::Null);
        };
        let base = self.array.eval(env)?;
        match base {
            Value::Array(arr) => match arr.get(&key) {
                Some(value) => Ok(value),
                None => {
                    env.notice(&self.location, format!("Undefined array key {}", key));
                    Ok(Value::Null)
                }
            },
            Value::String(s) => {
                let idx = match &key {
                    ArrayKey::Int(i) => *i,
                    ArrayKey::Str(k) => {
                        Value::String(k.clone()).to_long()
                    }
                };
                if idx >= 0 && (idx as usize) < s.len() {
                    Ok(Value::string(vec![s[idx as usize]]))
                } else {
                    env.notice(
                        &self.location,
                        format!("Uninitialized string offset {}", idx),
                    );
                    Ok(Value::string(""))
                }
            }
            Value::Null => Ok(Value::Null),
            other => {
                env.warning(
                    &self.location,
                    format!("Cannot access offset on {}", other.type_name()),
                );
                Ok(Value::Null)
            }
        }
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        let key = self.key(env)?;
        let base = self.array.eval_array(env)?;
        let cell = base.with_array_mut(|arr| match key {
            Some(key) => arr.ref_entry(key),
            None => arr.append_ref(),
        });
        match cell {
            Some(var) => Ok(var),
            None => {
                env.warning(
                    &self.location,
                    "Cannot use a scalar value as an array",
                );
                Ok(Var::new_ref(Value::Null))
            }
        }
    }

    fn eval_arg(&self, env: &mut Env, _is_top: bool) -> EvalResult<ArgSlot> {
        let key = self.key(env)?;
        let base = self.array.eval_arg(env, false)?;
        match (base, key) {
            // A null or array base can surface the entry's cell, letting the
            // binder alias it for a by-reference parameter.
            (ArgSlot::Ref(var), Some(key)) if var.is_null() || var.with_array(|_| ()).is_some() => {
                var.ensure_array();
                match var.with_array_mut(|arr| arr.entry_cell(key)) {
                    Some(cell) => Ok(ArgSlot::Ref(cell)),
                    None => Ok(ArgSlot::Value(Value::Null)),
                }
            }
            _ => self.eval(env).map(ArgSlot::Value),
        }
    }

    fn eval_assign(&self, env: &mut Env, value: Value) -> EvalResult<()> {
        let key = self.key(env)?;
        let base = self.array.eval_array(env)?;
        let written = base
            .with_array_mut(|arr| match key {
                Some(key) => {
                    arr.insert(key, value.clone());
                }
                None => {
                    arr.push(value.clone());
                }
            })
            .is_some();
        if !written {
            env.warning(&self.location, "Cannot use a scalar value as an array");
        }
        Ok(())
    }

    fn eval_assign_ref(&self, env: &mut Env, var: Var) -> EvalResult<()> {
        let key = self.key(env)?;
        let base = self.array.eval_array(env)?;
        let written = base
            .with_array_mut(|arr| match key {
                Some(key) => arr.set_ref(key, var.clone()),
                None => {
                    let key = arr.push(Value::Null);
                    arr.set_ref(key, var.clone());
                }
            })
            .is_some();
        if !written {
            env.warning(&self.location, "Cannot use a scalar value as an array");
        }
        Ok(())
    }

    fn eval_unset(&self, env: &mut Env) -> EvalResult<()> {
        let Some(key) = self.key(env)? else {
            return Ok(());
        };
        if let ArgSlot::Ref(var) = self.array.eval_arg(env, false)? {
            var.with_array_mut(|arr| arr.remove(&key));
        }
        Ok(())
    }

    fn eval_array(&self, env: &mut Env) -> EvalResult<Var> {
        let key = self.key(env)?;
        let base = self.array.eval_array(env)?;
        let cell = base.with_array_mut(|arr| {
            let key = match key {
                Some(key) => key,
                None => arr.push(Value::Null),
            };
            arr.entry_cell(key)
        });
        match cell {
            Some(var) => {
                var.ensure_array();
                Ok(var)
            }
            None => {
                env.warning(&self.location, "Cannot use a scalar value as an array");
                Ok(Var::new(Value::empty_array()))
            }
        }
    }

    fn eval_object(&self, env: &mut Env) -> EvalResult<Var> {
        let key = self.key(env)?;
        let base = self.array.eval_array(env)?;
        let cell = base.with_array_mut(|arr| {
            let key = match key {
                Some(key) => key,
                None => arr.push(Value::Null),
            };
            arr.entry_cell(key)
        });
        match cell {
            Some(var) => {
                var.ensure_object();
                Ok(var)
            }
            None => {
                env.warning(&self.location, "Cannot use a scalar value as an array");
                Ok(Var::new(Value::new_object(None)))
            }
        }
    }

    fn eval_isset(&self, env: &mut Env) -> EvalResult<bool> {
        let Some(key) = self.key(env)? else {
            return Ok(false);
        };
        // check the base through the isset chain first; an unset base is
        // simply not set, no notice
        if !self.array.eval_isset(env)? {
            return Ok(false);
        }
        let base = self.array.eval(env)?;
        match base {
            Value::Array(arr) => Ok(arr.get(&key).is_some_and(|v| !v.is_null())),
            Value::String(s) => {
                let idx = match &key {
                    ArrayKey::Int(i) => *i,
                    ArrayKey::Str(k) => Value::String(k.clone()).to_long(),
                };
                Ok(idx >= 0 && (idx as usize) < s.len())
            }
            _ => Ok(false),
        }
    }
}

impl fmt::Display for ArrayGetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.index {
            Some(index) => write!(f, "{}[{}]", self.array, index),
            None => write!(f, "{}[]", self.array),
        }
    }
}

/// One `array(...)` literal entry. A reference entry binds the source's
/// cell into the fresh array.
pub struct ArrayEntry {
    pub key: Option<ExprRef>,
    pub value: ExprRef,
    pub by_ref: bool,
}

pub struct ArrayLiteralExpr {
    entries: Vec<ArrayEntry>,
    location: Location,
}

impl ArrayLiteralExpr {
    pub fn new(entries: Vec<ArrayEntry>, location: Location) -> Self {
        Self { entries, location }
    }
}

impl Expr for ArrayLiteralExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let mut data = ArrayData::with_capacity(self.entries.len());
        for entry in &self.entries {
            let key = match &entry.key {
                Some(key) => Some(ArrayKey::from_value(&key.eval(env)?)),
                None => None,
            };
            if entry.by_ref {
                let var = entry.value.eval_ref(env)?;
                match key {
                    Some(key) => data.set_ref(key, var),
                    None => {
                        let key = data.push(Value::Null);
                        data.set_ref(key, var);
                    }
                }
            } else {
                let value = entry.value.eval_copy(env)?;
                match key {
                    Some(key) => data.insert(key, value),
                    None => {
                        data.push(value);
                    }
                }
            }
        }
        Ok(Value::Array(Rc::new(data)))
    }
}

impl fmt::Display for ArrayLiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array(")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if let Some(key) = &entry.key {
                write!(f, "{} => ", key)?;
            }
            if entry.by_ref {
                write!(f, "&")?;
            }
            write!(f, "{}", entry.value)?;
        }
        write!(f, ")")
    }
}
