//! The compiled program: function and class catalogs plus the top-level
//! statement list.
//!
//! A `Program` is frozen at build time and shared behind `Rc`; all
//! execution-time mutation lives on `Env`. Function names resolve exactly
//! first, then case-insensitively unless strict mode is on; class names are
//! always case-insensitive.

use std::collections::HashMap;
use std::rc::Rc;

use crate::env::class::PhpClass;
use crate::stmt::Stmt;

pub mod arg;
pub mod function;

pub use arg::Arg;
pub use function::Function;

pub struct Program {
    functions: HashMap<Rc<str>, Rc<Function>>,
    functions_lower: HashMap<String, Rc<Function>>,
    classes: HashMap<String, Rc<PhpClass>>,
    main: Vec<Stmt>,
    strict: bool,
}

impl Program {
    pub fn find_function(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(fun) = self.functions.get(name) {
            return Some(fun.clone());
        }
        if self.strict {
            return None;
        }
        self.functions_lower.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn find_class(&self, name: &str) -> Option<Rc<PhpClass>> {
        self.classes.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn main(&self) -> &[Stmt] {
        &self.main
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// Accumulates definitions, then freezes them into a shareable `Program`.
pub struct ProgramBuilder {
    functions: HashMap<Rc<str>, Rc<Function>>,
    functions_lower: HashMap<String, Rc<Function>>,
    classes: HashMap<String, Rc<PhpClass>>,
    main: Vec<Stmt>,
    strict: bool,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            functions_lower: HashMap::new(),
            classes: HashMap::new(),
            main: Vec::new(),
            strict: false,
        }
    }

    pub fn function(mut self, function: Function) -> Self {
        let function = Rc::new(function);
        self.functions_lower
            .insert(function.name().to_ascii_lowercase(), function.clone());
        self.functions.insert(function.name().clone(), function);
        self
    }

    pub fn class(mut self, class: Rc<PhpClass>) -> Self {
        self.classes
            .insert(class.name().to_ascii_lowercase(), class);
        self
    }

    pub fn main(mut self, main: Vec<Stmt>) -> Self {
        self.main = main;
        self
    }

    /// Disable the case-insensitive function-name fallback.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build(self) -> Rc<Program> {
        Rc::new(Program {
            functions: self.functions,
            functions_lower: self.functions_lower,
            classes: self.classes,
            main: self.main,
            strict: self.strict,
        })
    }
}
