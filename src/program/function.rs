//! User-function descriptors and the argument-binding protocol.
//!
//! Binding happens in two phases: actuals are evaluated in the caller's
//! scope (by-reference parameters take the actual's storage cell, by-value
//! parameters take a detached copy), then the callee scope is entered and
//! any omitted parameters are filled from their defaults, evaluated inside
//! that fresh scope. A missing required argument or a failed class hint
//! aborts before the callee scope exists.

use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::core::value::Value;
use crate::core::var::Var;
use crate::env::Env;
use crate::env::error::{ErrorKind, EvalResult};
use crate::env::stack::CallStackEntry;
use crate::expr::{ArgSlot, ExprRef, Location};
use crate::program::arg::Arg;
use crate::stmt::{self, Flow, Stmt};

/// Raw bound-argument values, sized for the common short call.
pub type ArgValues = SmallVec<[Value; 8]>;

/// What a finished call hands back to the call site.
enum Outcome {
    Value(Value),
    Ref(Var),
}

pub struct Function {
    name: Rc<str>,
    args: Vec<Arg>,
    body: Vec<Stmt>,
    is_static: bool,
    returns_reference: bool,
    declaring_class: Option<Rc<str>>,
    location: Location,
}

impl Function {
    pub fn new(name: impl Into<Rc<str>>, args: Vec<Arg>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            args,
            body,
            is_static: false,
            returns_reference: false,
            declaring_class: None,
            location: Location::UNKNOWN,
        }
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Declare `function &f()`: value-position callers still get a value,
    /// reference-position callers get the live cell.
    pub fn with_returns_reference(mut self) -> Self {
        self.returns_reference = true;
        self
    }

    pub fn with_declaring_class(mut self, class: Rc<str>) -> Self {
        self.declaring_class = Some(class);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn returns_reference(&self) -> bool {
        self.returns_reference
    }

    pub fn declaring_class(&self) -> Option<&Rc<str>> {
        self.declaring_class.as_ref()
    }

    fn qualified_name(&self) -> Rc<str> {
        match &self.declaring_class {
            Some(class) => format!("{}::{}", class, self.name).into(),
            None => self.name.clone(),
        }
    }

    // ---- public call surface ---------------------------------------------

    pub fn call(
        self: &Rc<Self>,
        env: &mut Env,
        args: &[ExprRef],
        location: &Location,
    ) -> EvalResult<Value> {
        match self.call_impl(env, Value::Null, args, location)? {
            Outcome::Value(value) => Ok(value),
            // value position: the cell's payload is copied out
            Outcome::Ref(var) => Ok(var.get().copy()),
        }
    }

    pub fn call_ref(
        self: &Rc<Self>,
        env: &mut Env,
        args: &[ExprRef],
        location: &Location,
    ) -> EvalResult<Var> {
        match self.call_impl(env, Value::Null, args, location)? {
            Outcome::Ref(var) => Ok(var),
            Outcome::Value(value) => Ok(Var::new_ref(value)),
        }
    }

    pub fn call_method(
        self: &Rc<Self>,
        env: &mut Env,
        this: Value,
        location: &Location,
        args: &[ExprRef],
    ) -> EvalResult<Value> {
        match self.call_impl(env, this, args, location)? {
            Outcome::Value(value) => Ok(value),
            Outcome::Ref(var) => Ok(var.get().copy()),
        }
    }

    pub fn call_method_ref(
        self: &Rc<Self>,
        env: &mut Env,
        this: Value,
        location: &Location,
        args: &[ExprRef],
    ) -> EvalResult<Var> {
        match self.call_impl(env, this, args, location)? {
            Outcome::Ref(var) => Ok(var),
            Outcome::Value(value) => Ok(Var::new_ref(value)),
        }
    }

    /// Call with already-evaluated values, for host invocations and the
    /// dynamic-dispatch fallback. By-reference parameters get detached
    /// cells; there is no caller storage to alias.
    pub fn call_values(
        self: &Rc<Self>,
        env: &mut Env,
        this: Value,
        values: &[Value],
        location: &Location,
    ) -> EvalResult<Value> {
        if self.missing_required(env, values.len(), location) {
            return Ok(Value::Null);
        }
        let mut scope = HashMap::new();
        let mut raw: ArgValues = SmallVec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            let value = value.copy();
            raw.push(value.clone());
            if let Some(param) = self.args.get(i) {
                let var = if param.is_reference() {
                    Var::new_ref(value)
                } else {
                    Var::new(value)
                };
                scope.insert(param.name().clone(), var);
            }
        }
        let flow = self.enter_and_run(env, this, scope, raw, values.len(), location)?;
        Ok(match flow {
            Flow::Return(value) => value,
            Flow::ReturnRef(var) => var.get().copy(),
            _ => Value::Null,
        })
    }

    // ---- binding ---------------------------------------------------------

    /// Report and abort when a required parameter has no actual. Runs
    /// before the callee scope exists.
    fn missing_required(&self, env: &mut Env, provided: usize, location: &Location) -> bool {
        for (i, param) in self.args.iter().enumerate().skip(provided) {
            if param.default().is_none() {
                env.error(
                    location,
                    ErrorKind::MissingArgument,
                    format!(
                        "Missing argument {} (${}) for {}()",
                        i + 1,
                        param.name(),
                        self.qualified_name()
                    ),
                );
                return true;
            }
        }
        false
    }

    fn call_impl(
        self: &Rc<Self>,
        env: &mut Env,
        this: Value,
        args: &[ExprRef],
        location: &Location,
    ) -> EvalResult<Outcome> {
        if self.missing_required(env, args.len(), location) {
            return Ok(Outcome::Value(Value::Null));
        }

        // phase one: evaluate actuals in the caller's scope
        let mut scope = HashMap::new();
        let mut raw: ArgValues = SmallVec::with_capacity(args.len());
        for (i, actual) in args.iter().enumerate() {
            match self.args.get(i) {
                Some(param) if param.is_reference() => {
                    let var = match actual.eval_arg(env, true)? {
                        ArgSlot::Ref(var) => {
                            var.mark_ref();
                            var
                        }
                        ArgSlot::Value(value) => Var::new_ref(value),
                    };
                    raw.push(var.get());
                    scope.insert(param.name().clone(), var);
                }
                Some(param) => {
                    let value = actual.eval(env)?;
                    if let Some(class) = param.expected_class() {
                        if !conforms(env, &value, class) {
                            env.error(
                                location,
                                ErrorKind::TypeMismatch,
                                format!(
                                    "Argument {} passed to {}() must be an instance of {}, {} given",
                                    i + 1,
                                    self.qualified_name(),
                                    class,
                                    value.type_name()
                                ),
                            );
                            return Ok(Outcome::Value(Value::Null));
                        }
                    }
                    let value = value.copy();
                    raw.push(value.clone());
                    scope.insert(param.name().clone(), Var::new(value));
                }
                // extra actuals are still evaluated and kept for
                // func_get_args, they just bind no name
                None => raw.push(actual.eval(env)?.copy()),
            }
        }

        let flow = self.enter_and_run(env, this, scope, raw, args.len(), location)?;
        Ok(match flow {
            Flow::Return(value) => Outcome::Value(value),
            Flow::ReturnRef(var) => {
                if self.returns_reference {
                    Outcome::Ref(var)
                } else {
                    Outcome::Value(var.get().copy())
                }
            }
            _ => Outcome::Value(Value::Null),
        })
    }

    /// Phase two: enter the callee scope, fill defaults, run the body.
    /// Every register is restored on all exit paths, including a fatal
    /// unwind.
    fn enter_and_run(
        self: &Rc<Self>,
        env: &mut Env,
        this: Value,
        scope: HashMap<Rc<str>, Var>,
        raw: ArgValues,
        provided: usize,
        location: &Location,
    ) -> EvalResult<Flow> {
        env.push_scope(scope);
        let callee_this = if self.is_static {
            Value::Null
        } else {
            this.clone()
        };
        let prev_this = env.set_this(callee_this);
        let prev_self = env.set_self_scope(self.declaring_class.clone());
        let raw_vec: Vec<Value> = raw.into_iter().collect();
        let prev_args = env.set_func_args(raw_vec.clone());

        let entry = CallStackEntry::new(self.qualified_name(), this, raw_vec, location.clone());
        let me = self.clone();
        let result = env.with_call(entry, move |env| {
            // omitted parameters take their defaults, evaluated in the
            // callee's own scope
            for param in me.args.iter().skip(provided) {
                let value = match param.default() {
                    Some(default) => default.eval(env)?.copy(),
                    None => Value::Null,
                };
                let var = if param.is_reference() {
                    Var::new_ref(value)
                } else {
                    Var::new(value)
                };
                env.set_local(param.name().clone(), var);
            }
            stmt::execute(&me.body, env)
        });

        env.set_func_args(prev_args);
        env.set_self_scope(prev_self);
        env.set_this(prev_this);
        env.pop_scope();
        result
    }
}

/// Class type-hint check: null satisfies any hint (optional object
/// semantics), otherwise the object's class chain must reach the hint.
fn conforms(env: &Env, value: &Value, class: &str) -> bool {
    match value {
        Value::Null => true,
        Value::Object(handle) => {
            let class_name = handle.borrow().class_name.clone();
            class_name
                .and_then(|name| env.find_class(&name))
                .is_some_and(|descriptor| descriptor.is_a(class))
        }
        _ => false,
    }
}
