//! Class descriptors and inheritance-aware method dispatch.
//!
//! A `PhpClass` is built once at class-definition time and immutable
//! afterwards; concurrent executions share it read-only. Dispatch records
//! the calling class on the environment around the body so `static::`
//! resolves against the class the call actually went through, not the class
//! that lexically declared the method.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::value::{ArrayData, ObjectData, Value};
use crate::core::var::Var;
use crate::env::Env;
use crate::env::error::{ErrorKind, EvalResult};
use crate::env::method_map::{self, MethodMap};
use crate::expr::{ExprRef, Location};
use crate::program::function::Function;

/// Declared instance field with its optional default expression.
#[derive(Clone)]
pub struct FieldDecl {
    pub name: Rc<str>,
    pub default: Option<ExprRef>,
}

/// Declared static field. The field's storage lives on the environment,
/// keyed by the declaring class, so descriptors stay shareable.
#[derive(Clone)]
pub struct StaticFieldDecl {
    pub name: Rc<str>,
    pub default: Option<ExprRef>,
}

pub struct PhpClass {
    name: Rc<str>,
    parent: Option<Rc<PhpClass>>,
    interfaces: Vec<Rc<str>>,
    methods: MethodMap,
    call_fallback: Option<Rc<Function>>,
    fields: Vec<FieldDecl>,
    static_fields: Vec<StaticFieldDecl>,
}

impl PhpClass {
    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn parent(&self) -> Option<Rc<PhpClass>> {
        self.parent.clone()
    }

    /// Method lookup walking the inheritance chain, nearest class first.
    pub fn get_method(&self, hash: u32, name: &str) -> Option<Rc<Function>> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(fun) = class.methods.get(hash, name) {
                return Some(fun.clone());
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// Nearest dynamic-dispatch fallback in the chain.
    pub fn find_call_fallback(&self) -> Option<Rc<Function>> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(fallback) = &class.call_fallback {
                return Some(fallback.clone());
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// Ancestry query over class names and interface names,
    /// case-insensitively.
    pub fn is_a(&self, name: &str) -> bool {
        if self.name.eq_ignore_ascii_case(name) {
            return true;
        }
        if self
            .interfaces
            .iter()
            .any(|iface| iface.eq_ignore_ascii_case(name))
        {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.is_a(name),
            None => false,
        }
    }

    /// Declared instance fields, root class first, so a subclass default
    /// overrides its parent's.
    fn field_chain(&self) -> Vec<FieldDecl> {
        let mut chain = Vec::new();
        if let Some(parent) = &self.parent {
            chain.extend(parent.field_chain());
        }
        chain.extend(self.fields.iter().cloned());
        chain
    }

    /// Find a static field declaration, returning the declaring class name
    /// (inherited statics share the declaring class's storage).
    pub fn find_static_decl(&self, name: &str) -> Option<(Rc<str>, StaticFieldDecl)> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(decl) = class.static_fields.iter().find(|d| &*d.name == name) {
                return Some((class.name.clone(), decl.clone()));
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// Dispatch a method call, with the dynamic-dispatch fallback and the
    /// calling-class bookkeeping. The receiver is whatever the call site
    /// supplied; a static callee ignores it.
    pub fn call_method(
        self: &Rc<Self>,
        env: &mut Env,
        this: Value,
        hash: u32,
        name: &str,
        location: &Location,
        args: &[ExprRef],
    ) -> EvalResult<Value> {
        let prev = env.set_calling_class(Some(self.clone()));
        let result = (|| {
            if let Some(fun) = self.get_method(hash, name) {
                fun.call_method(env, this, location, args)
            } else if let Some(fallback) = self.find_call_fallback() {
                let packed = pack_fallback_args(env, name, args)?;
                fallback.call_values(env, this, &packed, location)
            } else {
                Ok(env.error(
                    location,
                    ErrorKind::UnknownMethod,
                    format!("Call to undefined method {}::{}", self.name, name),
                ))
            }
        })();
        env.set_calling_class(prev);
        result
    }

    /// Reference-mode dispatch; only a `returns_reference` callee yields an
    /// aliasable cell, everything else is promoted.
    pub fn call_method_ref(
        self: &Rc<Self>,
        env: &mut Env,
        this: Value,
        hash: u32,
        name: &str,
        location: &Location,
        args: &[ExprRef],
    ) -> EvalResult<Var> {
        let prev = env.set_calling_class(Some(self.clone()));
        let result = (|| {
            if let Some(fun) = self.get_method(hash, name) {
                fun.call_method_ref(env, this, location, args)
            } else if let Some(fallback) = self.find_call_fallback() {
                let packed = pack_fallback_args(env, name, args)?;
                Ok(Var::new_ref(
                    fallback.call_values(env, this, &packed, location)?,
                ))
            } else {
                let sentinel = env.error(
                    location,
                    ErrorKind::UnknownMethod,
                    format!("Call to undefined method {}::{}", self.name, name),
                );
                Ok(Var::new_ref(sentinel))
            }
        })();
        env.set_calling_class(prev);
        result
    }

    /// `new`: allocate the object, initialize declared fields from the
    /// whole chain, then run the constructor through normal dispatch.
    pub fn instantiate(
        self: &Rc<Self>,
        env: &mut Env,
        location: &Location,
        args: &[ExprRef],
    ) -> EvalResult<Value> {
        let handle = Rc::new(RefCell::new(ObjectData::new(Some(self.name.clone()))));
        let object = Value::Object(handle.clone());
        for decl in self.field_chain() {
            let value = match &decl.default {
                Some(expr) => expr.eval(env)?.copy(),
                None => Value::Null,
            };
            handle.borrow_mut().field_var(decl.name.clone()).set(value);
        }

        let ctor_hash = method_map::hash("__construct");
        if self.get_method(ctor_hash, "__construct").is_some() {
            self.call_method(env, object.clone(), ctor_hash, "__construct", location, args)?;
        }
        Ok(object)
    }
}

fn pack_fallback_args(env: &mut Env, name: &str, args: &[ExprRef]) -> EvalResult<Vec<Value>> {
    let mut packed = ArrayData::with_capacity(args.len());
    for arg in args {
        packed.push(arg.eval(env)?.copy());
    }
    Ok(vec![
        Value::string(name),
        Value::Array(Rc::new(packed)),
    ])
}

/// One-time class construction; `build` publishes an immutable descriptor.
pub struct ClassBuilder {
    name: Rc<str>,
    parent: Option<Rc<PhpClass>>,
    interfaces: Vec<Rc<str>>,
    methods: MethodMap,
    call_fallback: Option<Rc<Function>>,
    fields: Vec<FieldDecl>,
    static_fields: Vec<StaticFieldDecl>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            interfaces: Vec::new(),
            methods: MethodMap::new(),
            call_fallback: None,
            fields: Vec::new(),
            static_fields: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: Rc<PhpClass>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn implements(mut self, interface: impl Into<Rc<str>>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add a method; `__call` also registers as the dynamic-dispatch
    /// fallback for this class.
    pub fn method(mut self, function: Function) -> Self {
        let function = function.with_declaring_class(self.name.clone());
        let name = function.name().clone();
        let function = Rc::new(function);
        if name.eq_ignore_ascii_case("__call") {
            self.call_fallback = Some(function.clone());
        }
        self.methods.put(name, function);
        self
    }

    pub fn field(mut self, name: impl Into<Rc<str>>, default: Option<ExprRef>) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            default,
        });
        self
    }

    pub fn static_field(mut self, name: impl Into<Rc<str>>, default: Option<ExprRef>) -> Self {
        self.static_fields.push(StaticFieldDecl {
            name: name.into(),
            default,
        });
        self
    }

    pub fn build(self) -> Rc<PhpClass> {
        Rc::new(PhpClass {
            name: self.name,
            parent: self.parent,
            interfaces: self.interfaces,
            methods: self.methods,
            call_fallback: self.call_fallback,
            fields: self.fields,
            static_fields: self.static_fields,
        })
    }
}
