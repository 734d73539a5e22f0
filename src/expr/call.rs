//! Call sites: free functions, instance methods, class-qualified methods,
//! dynamic calls, `new`, and `func_get_args`.
//!
//! Method call sites precompute the case-folded name hash at construction,
//! so dispatch narrows to a bucket without rehashing per call.

use std::fmt;
use std::rc::Rc;

use crate::core::value::{ArrayData, Value};
use crate::core::var::Var;
use crate::env::Env;
use crate::env::error::{ErrorKind, EvalResult};
use crate::env::method_map;
use crate::expr::{ClassNameRef, Expr, ExprRef, Location};

fn join_args(f: &mut fmt::Formatter<'_>, args: &[ExprRef]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

/// `foo(...)` with a statically known name, resolved per call against the
/// program's function table.
pub struct CallExpr {
    name: Rc<str>,
    args: Vec<ExprRef>,
    location: Location,
}

impl CallExpr {
    pub fn new(name: impl Into<Rc<str>>, args: Vec<ExprRef>, location: Location) -> Self {
        Self {
            name: name.into(),
            args,
            location,
        }
    }
}

impl Expr for CallExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        match env.find_function(&self.name) {
            Some(fun) => fun.call(env, &self.args, &self.location),
            None => Ok(env.error(
                &self.location,
                ErrorKind::UnknownFunction,
                format!("Call to undefined function {}()", self.name),
            )),
        }
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        match env.find_function(&self.name) {
            Some(fun) => fun.call_ref(env, &self.args, &self.location),
            None => {
                let sentinel = env.error(
                    &self.location,
                    ErrorKind::UnknownFunction,
                    format!("Call to undefined function {}()", self.name),
                );
                Ok(Var::new_ref(sentinel))
            }
        }
    }
}

impl fmt::Display for CallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        join_args(f, &self.args)?;
        write!(f, ")")
    }
}

/// `$f(...)`: the callee name is computed at runtime. A `"Class::method"`
/// string dispatches as a class-qualified call.
pub struct DynamicCallExpr {
    name_expr: ExprRef,
    args: Vec<ExprRef>,
    location: Location,
}

impl DynamicCallExpr {
    pub fn new(name_expr: ExprRef, args: Vec<ExprRef>, location: Location) -> Self {
        Self {
            name_expr,
            args,
            location,
        }
    }
}

impl Expr for DynamicCallExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let name = self.name_expr.eval(env)?;
        let name = String::from_utf8_lossy(&name.to_string_bytes()).into_owned();

        if let Some((class_name, method)) = name.split_once("::") {
            let Some(class) = env.find_class(class_name) else {
                return Ok(env.error(
                    &self.location,
                    ErrorKind::UnknownClass,
                    format!("{} is an unknown class", class_name),
                ));
            };
            let this = env.this().clone();
            return class.call_method(
                env,
                this,
                method_map::hash(method),
                method,
                &self.location,
                &self.args,
            );
        }

        match env.find_function(&name) {
            Some(fun) => fun.call(env, &self.args, &self.location),
            None => Ok(env.error(
                &self.location,
                ErrorKind::UnknownFunction,
                format!("Call to undefined function {}()", name),
            )),
        }
    }
}

impl fmt::Display for DynamicCallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name_expr)?;
        join_args(f, &self.args)?;
        write!(f, ")")
    }
}

/// `$obj->m(...)`.
pub struct MethodCallExpr {
    obj: ExprRef,
    name: Rc<str>,
    hash: u32,
    args: Vec<ExprRef>,
    location: Location,
}

impl MethodCallExpr {
    pub fn new(
        obj: ExprRef,
        name: impl Into<Rc<str>>,
        args: Vec<ExprRef>,
        location: Location,
    ) -> Self {
        let name = name.into();
        let hash = method_map::hash(&name);
        Self {
            obj,
            name,
            hash,
            args,
            location,
        }
    }

    fn receiver_class(&self, env: &mut Env, obj: &Value) -> Option<Rc<crate::env::class::PhpClass>> {
        let Some(handle) = obj.as_object() else {
            env.warning(
                &self.location,
                format!(
                    "Call to a member function {}() on {}",
                    self.name,
                    obj.type_name()
                ),
            );
            return None;
        };
        let class_name = handle.borrow().class_name.clone();
        match class_name.and_then(|name| env.find_class(&name)) {
            Some(class) => Some(class),
            None => {
                env.error(
                    &self.location,
                    ErrorKind::UnknownMethod,
                    format!("Call to undefined method {}()", self.name),
                );
                None
            }
        }
    }
}

impl Expr for MethodCallExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let obj = self.obj.eval(env)?;
        let Some(class) = self.receiver_class(env, &obj) else {
            return Ok(Value::Null);
        };
        class.call_method(env, obj, self.hash, &self.name, &self.location, &self.args)
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        let obj = self.obj.eval(env)?;
        let Some(class) = self.receiver_class(env, &obj) else {
            return Ok(Var::new_ref(Value::Null));
        };
        class.call_method_ref(env, obj, self.hash, &self.name, &self.location, &self.args)
    }
}

impl fmt::Display for MethodCallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}(", self.obj, self.name)?;
        join_args(f, &self.args)?;
        write!(f, ")")
    }
}

/// `A::m(...)`, `parent::m(...)`, `static::m(...)`.
///
/// The live receiver is threaded through, so `parent::__construct()` inside
/// a constructor still operates on the object under construction.
pub struct StaticMethodExpr {
    class: ClassNameRef,
    name: Rc<str>,
    hash: u32,
    args: Vec<ExprRef>,
    location: Location,
}

impl StaticMethodExpr {
    pub fn new(
        class: ClassNameRef,
        name: impl Into<Rc<str>>,
        args: Vec<ExprRef>,
        location: Location,
    ) -> Self {
        let name = name.into();
        let hash = method_map::hash(&name);
        Self {
            class,
            name,
            hash,
            args,
            location,
        }
    }
}

impl Expr for StaticMethodExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let Some(class) = self.class.resolve(env, &self.location) else {
            return Ok(Value::Null);
        };
        let this = env.this().clone();
        class.call_method(env, this, self.hash, &self.name, &self.location, &self.args)
    }

    fn eval_ref(&self, env: &mut Env) -> EvalResult<Var> {
        let Some(class) = self.class.resolve(env, &self.location) else {
            return Ok(Var::new_ref(Value::Null));
        };
        let this = env.this().clone();
        class.call_method_ref(env, this, self.hash, &self.name, &self.location, &self.args)
    }
}

impl fmt::Display for StaticMethodExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.class, self.name)?;
        join_args(f, &self.args)?;
        write!(f, ")")
    }
}

/// `new A(...)`.
pub struct NewExpr {
    class: ClassNameRef,
    args: Vec<ExprRef>,
    location: Location,
}

impl NewExpr {
    pub fn new(class: ClassNameRef, args: Vec<ExprRef>, location: Location) -> Self {
        Self {
            class,
            args,
            location,
        }
    }
}

impl Expr for NewExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        match self.class.resolve(env, &self.location) {
            Some(class) => class.instantiate(env, &self.location, &self.args),
            None => Ok(Value::Null),
        }
    }
}

impl fmt::Display for NewExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new {}(", self.class)?;
        join_args(f, &self.args)?;
        write!(f, ")")
    }
}

/// `func_get_args()`: the raw bound values of the running call.
pub struct FuncArgsExpr {
    location: Location,
}

impl FuncArgsExpr {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

impl Expr for FuncArgsExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let mut data = ArrayData::with_capacity(env.call_args().len());
        for value in env.call_args().to_vec() {
            data.push(value.copy());
        }
        Ok(Value::Array(Rc::new(data)))
    }
}

impl fmt::Display for FuncArgsExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func_get_args()")
    }
}
