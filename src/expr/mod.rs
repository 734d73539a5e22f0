//! Expression nodes and the multi-mode evaluation contract.
//!
//! Every node implements `Expr`; most inherit the default mode bodies and
//! only override what their syntactic role requires. PHP decides
//! value-vs-reference passing at the *callee* declaration, so argument
//! expressions are evaluated through `eval_arg`, which hands the decision
//! to the call binder once the callee's parameter list is known.
//!
//! The storage-denoting nodes (variables, fields, array elements, static
//! fields and their dynamic-name variants) override the storage modes:
//! `eval_ref`, `eval_assign`, `eval_assign_ref`, `eval_unset`, `eval_array`,
//! `eval_object`, `eval_isset`. Everything else inherits defaults that
//! report the fault and degrade.

use std::fmt;
use std::rc::Rc;

use crate::core::value::Value;
use crate::core::var::Var;
use crate::env::Env;
use crate::env::class::PhpClass;
use crate::env::error::{ErrorKind, EvalResult};

pub mod array;
pub mod assign;
pub mod binary;
pub mod call;
pub mod factory;
pub mod field;
pub mod literal;
pub mod static_field;
pub mod var;

pub use factory::ExprFactory;

/// Source position carried by every node, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Location {
    pub file: Option<Rc<str>>,
    pub line: u32,
}

impl Location {
    pub const UNKNOWN: Location = Location {
        file: None,
        line: 0,
    };

    pub fn new(file: Rc<str>, line: u32) -> Location {
        Location {
            file: Some(file),
            line,
        }
    }

    pub fn is_known(&self) -> bool {
        self.file.is_some() || self.line != 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), line) => write!(f, "{}:{}", file, line),
            (None, 0) => write!(f, "<unknown>"),
            (None, line) => write!(f, "line {}", line),
        }
    }
}

/// Result of evaluating a call argument before the callee's convention is
/// known: storage expressions surface their cell, everything else a value.
#[derive(Debug, Clone)]
pub enum ArgSlot {
    Value(Value),
    Ref(Var),
}

impl ArgSlot {
    pub fn into_value(self) -> Value {
        match self {
            ArgSlot::Value(v) => v,
            ArgSlot::Ref(var) => var.get(),
        }
    }
}

pub type ExprRef = Rc<dyn Expr>;

pub trait Expr: fmt::Display {
    fn location(&self) -> &Location;

    /// Produce a value for read use. Storage nodes must not expose their
    /// internal cell through this mode.
    fn eval(&self, env: &mut Env) -> EvalResult;

    /// Produce a value guaranteed independent of aliasable storage.
    fn eval_copy(&self, env: &mut Env) -> EvalResult {
        Ok(self.eval(env)?.copy())
    }

    /// Produce the reference cell for the node's storage location, creating
    /// the storage if needed. Non-storage nodes report the fault and promote
    /// their transient value to a detached cell.
    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        env.error(
            self.location(),
            ErrorKind::InvalidReferenceTarget,
            format!("cannot take a reference to {}", self),
        );
        Ok(Var::new_ref(self.eval(env)?))
    }

    /// Evaluate as a call argument; the binder decides value vs reference.
    fn eval_arg(&self, env: &mut Env, _is_top: bool) -> EvalResult<ArgSlot> {
        Ok(ArgSlot::Value(self.eval(env)?))
    }

    /// Write `value` into the node's storage location.
    fn eval_assign(&self, env: &mut Env, _value: Value) -> EvalResult<()> {
        env.error(
            self.location(),
            ErrorKind::InvalidAssignmentTarget,
            format!("{} is an invalid left-hand side of an assignment", self),
        );
        Ok(())
    }

    /// Rebind the node's storage location to an existing cell (`=&`).
    fn eval_assign_ref(&self, env: &mut Env, _var: Var) -> EvalResult<()> {
        env.error(
            self.location(),
            ErrorKind::InvalidAssignmentTarget,
            format!("{} cannot be bound by reference", self),
        );
        Ok(())
    }

    /// Remove the node's storage binding.
    fn eval_unset(&self, env: &mut Env) -> EvalResult<()> {
        env.error(
            self.location(),
            ErrorKind::InvalidUnsetTarget,
            format!("cannot unset {}", self),
        );
        Ok(())
    }

    /// Storage cell coerced toward an array, auto-vivifying a null slot.
    /// Used when writing through a nested index.
    fn eval_array(&self, env: &mut Env) -> EvalResult<Var> {
        env.error(
            self.location(),
            ErrorKind::InvalidReferenceTarget,
            format!("cannot use {} as an array", self),
        );
        Ok(Var::new(Value::empty_array()))
    }

    /// Storage cell coerced toward an object, auto-vivifying a null slot.
    fn eval_object(&self, env: &mut Env) -> EvalResult<Var> {
        env.error(
            self.location(),
            ErrorKind::InvalidReferenceTarget,
            format!("cannot use {} as an object", self),
        );
        Ok(Var::new(Value::new_object(None)))
    }

    /// `isset` semantics: non-storage expressions are simply not set.
    fn eval_isset(&self, _env: &mut Env) -> EvalResult<bool> {
        Ok(false)
    }

    /// Constant literal payload, when the node is one. Drives the load-time
    /// concatenation folding in the factory.
    fn literal_value(&self) -> Option<&Value> {
        None
    }

    /// Operands of a concatenation node, for the factory's folding rewrite.
    fn concat_parts(&self) -> Option<(&ExprRef, &ExprRef)> {
        None
    }
}

/// Class position of a `Name::…` construct. `StaticCls` is late static
/// binding: it resolves against the calling class recorded on the
/// environment, not against any lexical scope.
#[derive(Debug, Clone)]
pub enum ClassNameRef {
    Named(Rc<str>),
    SelfCls,
    ParentCls,
    StaticCls,
}

impl ClassNameRef {
    /// Resolve to a class descriptor, reporting the applicable fault and
    /// returning `None` when unresolvable.
    pub fn resolve(&self, env: &mut Env, location: &Location) -> Option<Rc<PhpClass>> {
        match self {
            ClassNameRef::Named(name) => match env.find_class(name) {
                Some(class) => Some(class),
                None => {
                    env.error(
                        location,
                        ErrorKind::UnknownClass,
                        format!("{} is an unknown class", name),
                    );
                    None
                }
            },
            ClassNameRef::SelfCls => match env.self_scope() {
                Some(name) => env.find_class(&name).or_else(|| {
                    env.error(
                        location,
                        ErrorKind::UnknownClass,
                        format!("{} is an unknown class", name),
                    );
                    None
                }),
                None => {
                    env.error(
                        location,
                        ErrorKind::NoCallingClassContext,
                        "cannot use self outside of a class method",
                    );
                    None
                }
            },
            ClassNameRef::ParentCls => {
                let Some(name) = env.self_scope() else {
                    env.error(
                        location,
                        ErrorKind::NoCallingClassContext,
                        "cannot use parent outside of a class method",
                    );
                    return None;
                };
                let parent = env.find_class(&name).and_then(|class| class.parent());
                if parent.is_none() {
                    env.error(
                        location,
                        ErrorKind::UnknownClass,
                        format!("{} has no parent class", name),
                    );
                }
                parent
            }
            ClassNameRef::StaticCls => {
                let class = env.calling_class();
                if class.is_none() {
                    env.error(
                        location,
                        ErrorKind::NoCallingClassContext,
                        "no calling class context for static::",
                    );
                }
                class
            }
        }
    }
}

impl fmt::Display for ClassNameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassNameRef::Named(name) => f.write_str(name),
            ClassNameRef::SelfCls => f.write_str("self"),
            ClassNameRef::ParentCls => f.write_str("parent"),
            ClassNameRef::StaticCls => f.write_str("static"),
        }
    }
}
