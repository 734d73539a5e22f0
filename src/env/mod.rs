//! Per-invocation execution environment.
//!
//! An `Env` owns everything mutable about one script invocation: variable
//! scopes, the receiver and calling-class registers, static-field storage,
//! the diagnostic call stack, collected diagnostics and buffered output.
//! The compiled `Program` it runs against is shared and read-only, so any
//! number of environments can execute the same program at once, each on its
//! own thread.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::core::value::Value;
use crate::core::var::Var;
use crate::env::class::PhpClass;
use crate::env::error::{Diagnostic, ErrorHandler, ErrorKind, ErrorLevel, EvalResult, Fatal};
use crate::env::stack::CallStackEntry;
use crate::expr::Location;
use crate::program::Program;
use crate::program::function::Function;

pub mod class;
pub mod error;
pub mod method_map;
pub mod stack;

/// Sink for `echo` and friends.
pub trait OutputWriter {
    fn write(&mut self, bytes: &[u8]);
}

/// Buffers output in memory; the environment's default sink.
#[derive(Default)]
pub struct CaptureWriter {
    buffer: Vec<u8>,
}

impl OutputWriter for CaptureWriter {
    fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}

/// Streams output straight to stdout.
#[derive(Default)]
pub struct StdoutWriter;

impl OutputWriter for StdoutWriter {
    fn write(&mut self, bytes: &[u8]) {
        use std::io::Write;
        let _ = std::io::stdout().write_all(bytes);
    }
}

enum Output {
    Capture(CaptureWriter),
    Writer(Box<dyn OutputWriter>),
}

pub struct Env {
    program: Rc<Program>,
    global_scope: HashMap<Rc<str>, Var>,
    scopes: Vec<HashMap<Rc<str>, Var>>,
    this: Value,
    calling_class: Option<Rc<PhpClass>>,
    self_scope: Option<Rc<str>>,
    func_args: Vec<Value>,
    stack: Vec<CallStackEntry>,
    statics: HashMap<String, Var>,
    start: Instant,
    timeout: Option<Duration>,
    diagnostics: Vec<Diagnostic>,
    handler: Option<Box<dyn ErrorHandler>>,
    output: Output,
}

impl Env {
    pub fn new(program: Rc<Program>) -> Env {
        Env {
            program,
            global_scope: HashMap::new(),
            scopes: Vec::new(),
            this: Value::Null,
            calling_class: None,
            self_scope: None,
            func_args: Vec::new(),
            stack: Vec::new(),
            statics: HashMap::new(),
            start: Instant::now(),
            timeout: None,
            diagnostics: Vec::new(),
            handler: None,
            output: Output::Capture(CaptureWriter::default()),
        }
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    // ---- variable scopes -------------------------------------------------

    fn current_scope(&self) -> &HashMap<Rc<str>, Var> {
        self.scopes.last().unwrap_or(&self.global_scope)
    }

    fn current_scope_mut(&mut self) -> &mut HashMap<Rc<str>, Var> {
        self.scopes.last_mut().unwrap_or(&mut self.global_scope)
    }

    /// Look up a variable in the current scope only; function scopes are
    /// fully isolated from the globals.
    pub fn get_var(&self, name: &str) -> Option<Var> {
        self.current_scope().get(name).cloned()
    }

    pub fn get_var_or_create(&mut self, name: &Rc<str>) -> Var {
        self.current_scope_mut()
            .entry(name.clone())
            .or_insert_with(|| Var::new(Value::Null))
            .clone()
    }

    /// Bind `name` to `var` in the current scope, replacing any previous
    /// binding. This is the `=&` rebinding primitive.
    pub fn set_local(&mut self, name: Rc<str>, var: Var) {
        self.current_scope_mut().insert(name, var);
    }

    pub fn unset_var(&mut self, name: &str) {
        self.current_scope_mut().remove(name);
    }

    /// The global cell for `name`, created on demand. Used by `global`
    /// declarations inside function bodies.
    pub fn global_var(&mut self, name: &Rc<str>) -> Var {
        self.global_scope
            .entry(name.clone())
            .or_insert_with(|| Var::new(Value::Null))
            .clone()
    }

    pub fn push_scope(&mut self, scope: HashMap<Rc<str>, Var>) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) -> Option<HashMap<Rc<str>, Var>> {
        self.scopes.pop()
    }

    // ---- call registers --------------------------------------------------

    pub fn this(&self) -> &Value {
        &self.this
    }

    pub fn set_this(&mut self, this: Value) -> Value {
        std::mem::replace(&mut self.this, this)
    }

    /// The class a method call is currently dispatched through; the anchor
    /// for late static binding.
    pub fn calling_class(&self) -> Option<Rc<PhpClass>> {
        self.calling_class.clone()
    }

    pub fn set_calling_class(&mut self, class: Option<Rc<PhpClass>>) -> Option<Rc<PhpClass>> {
        std::mem::replace(&mut self.calling_class, class)
    }

    /// The class that lexically declared the running method; the anchor for
    /// `self::` and `parent::`.
    pub fn self_scope(&self) -> Option<Rc<str>> {
        self.self_scope.clone()
    }

    pub fn set_self_scope(&mut self, name: Option<Rc<str>>) -> Option<Rc<str>> {
        std::mem::replace(&mut self.self_scope, name)
    }

    /// Raw bound-argument values of the running call, for `func_get_args`.
    pub fn set_func_args(&mut self, args: Vec<Value>) -> Vec<Value> {
        std::mem::replace(&mut self.func_args, args)
    }

    pub fn call_args(&self) -> &[Value] {
        &self.func_args
    }

    // ---- resolution ------------------------------------------------------

    pub fn find_function(&self, name: &str) -> Option<Rc<Function>> {
        self.program.find_function(name)
    }

    pub fn find_class(&self, name: &str) -> Option<Rc<PhpClass>> {
        self.program.find_class(name)
    }

    /// Host entry point: invoke a defined function with plain values.
    pub fn call_function(&mut self, name: &str, args: &[Value]) -> EvalResult<Value> {
        match self.find_function(name) {
            Some(fun) => fun.call_values(self, Value::Null, args, &Location::UNKNOWN),
            None => Ok(self.error(
                &Location::UNKNOWN,
                ErrorKind::UnknownFunction,
                format!("Call to undefined function {}()", name),
            )),
        }
    }

    // ---- static fields ---------------------------------------------------

    /// Storage cell for `Class::$name`, lazily initialized from the
    /// declaration's default on first touch. Inherited statics resolve to
    /// the declaring class's cell, so parent and child see one storage.
    pub fn static_field_var(
        &mut self,
        class: &Rc<PhpClass>,
        name: &str,
        location: &Location,
    ) -> EvalResult<Var> {
        let Some((owner, decl)) = class.find_static_decl(name) else {
            self.error(
                location,
                ErrorKind::UndefinedVariable,
                format!("access to undeclared static property {}::${}", class.name(), name),
            );
            return Ok(Var::new(Value::Null));
        };
        let key = format!("{}::{}", owner, name);
        if let Some(var) = self.statics.get(&key) {
            return Ok(var.clone());
        }
        let initial = match &decl.default {
            Some(expr) => expr.eval(self)?.copy(),
            None => Value::Null,
        };
        let var = Var::new(initial);
        self.statics.insert(key, var.clone());
        Ok(var)
    }

    /// Replace the storage of `Class::$name` with an existing cell (`=&` on
    /// a static field). No-op when the field is not declared.
    pub fn rebind_static_field(&mut self, class: &Rc<PhpClass>, name: &str, var: Var) -> bool {
        match class.find_static_decl(name) {
            Some((owner, _)) => {
                self.statics.insert(format!("{}::{}", owner, name), var);
                true
            }
            None => false,
        }
    }

    // ---- call stack and cancellation -------------------------------------

    /// Run `f` with `entry` on the diagnostic stack. The pop happens on
    /// every exit path, including a fatal unwind, so the stack stays
    /// balanced. The cooperative timeout check runs before the body.
    pub fn with_call<R>(
        &mut self,
        entry: CallStackEntry,
        f: impl FnOnce(&mut Env) -> EvalResult<R>,
    ) -> EvalResult<R> {
        self.stack.push(entry);
        let result = match self.check_timeout() {
            Ok(()) => f(self),
            Err(fatal) => Err(fatal),
        };
        self.stack.pop();
        result
    }

    pub fn backtrace(&self) -> &[CallStackEntry] {
        &self.stack
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.start = Instant::now();
        self.timeout = Some(timeout);
    }

    /// Cooperative cancellation point: call bodies and loop iterations pass
    /// through here.
    pub fn check_timeout(&self) -> Result<(), Fatal> {
        if let Some(timeout) = self.timeout {
            if self.start.elapsed() >= timeout {
                return Err(Fatal::ExecutionTimeout(timeout.as_millis() as u64));
            }
        }
        Ok(())
    }

    // ---- diagnostics -----------------------------------------------------

    pub fn set_error_handler(&mut self, handler: Box<dyn ErrorHandler>) {
        self.handler = Some(handler);
    }

    pub fn report(
        &mut self,
        level: ErrorLevel,
        kind: Option<ErrorKind>,
        location: &Location,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            level,
            kind,
            message: message.into(),
            location: location.clone(),
        };
        if let Some(handler) = &mut self.handler {
            handler.report(&diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn notice(&mut self, location: &Location, message: impl Into<String>) {
        self.report(ErrorLevel::Notice, None, location, message);
    }

    pub fn warning(&mut self, location: &Location, message: impl Into<String>) {
        self.report(ErrorLevel::Warning, None, location, message);
    }

    /// Report a recoverable error and hand back the null sentinel the
    /// faulting expression evaluates to.
    pub fn error(
        &mut self,
        location: &Location,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Value {
        self.report(ErrorLevel::Error, Some(kind), location, message);
        Value::Null
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    // ---- output ----------------------------------------------------------

    /// Route output to a host-supplied sink instead of the capture buffer.
    pub fn set_output_writer(&mut self, writer: Box<dyn OutputWriter>) {
        self.output = Output::Writer(writer);
    }

    pub fn echo(&mut self, bytes: &[u8]) {
        match &mut self.output {
            Output::Capture(capture) => capture.write(bytes),
            Output::Writer(writer) => writer.write(bytes),
        }
    }

    /// Drain the capture buffer. Empty when a custom writer is installed.
    pub fn take_output(&mut self) -> Vec<u8> {
        match &mut self.output {
            Output::Capture(capture) => std::mem::take(&mut capture.buffer),
            Output::Writer(_) => Vec::new(),
        }
    }
}
