use std::rc::Rc;

use crate::core::value::Value;
use crate::expr::Location;

/// One frame of the diagnostic call stack. Pushed by the call binder before
/// a body runs and popped unconditionally when it exits; never consulted for
/// control flow.
#[derive(Debug, Clone)]
pub struct CallStackEntry {
    /// Callee as written at the call site, e.g. `foo` or `A::m`.
    pub function: Rc<str>,
    /// Receiver at the time of the call (null for free functions).
    pub this: Value,
    /// Bound argument values, for backtraces.
    pub args: Vec<Value>,
    pub location: Location,
}

impl CallStackEntry {
    pub fn new(function: Rc<str>, this: Value, args: Vec<Value>, location: Location) -> Self {
        Self {
            function,
            this,
            args,
            location,
        }
    }
}
