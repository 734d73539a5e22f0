//! Script-fault taxonomy and the host diagnostics surface.
//!
//! Most evaluation-time faults are reported and degrade to a null sentinel
//! so execution can continue past a single bad expression; only `Fatal`
//! conditions unwind the invocation.

use std::fmt;
use thiserror::Error;

use crate::expr::Location;

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    Notice,
    Warning,
    Error,
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorLevel::Notice => "Notice",
            ErrorLevel::Warning => "Warning",
            ErrorLevel::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Recoverable script-fault kinds. All of these degrade to a sentinel value
/// after being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAssignmentTarget,
    InvalidReferenceTarget,
    InvalidUnsetTarget,
    MissingArgument,
    TypeMismatch,
    UnknownFunction,
    UnknownMethod,
    UnknownClass,
    NoCallingClassContext,
    UndefinedVariable,
}

/// A single reported fault, with the source location when known.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    pub kind: Option<ErrorKind>,
    pub message: String,
    pub location: Location,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_known() {
            write!(f, "{}: {} in {}", self.level, self.message, self.location)
        } else {
            write!(f, "{}: {}", self.level, self.message)
        }
    }
}

/// Host hook for runtime notices and errors. The env always records
/// diagnostics for introspection; a handler additionally sees them as they
/// happen.
pub trait ErrorHandler {
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Writes every diagnostic to stderr.
#[derive(Default)]
pub struct StderrErrorHandler;

impl ErrorHandler for StderrErrorHandler {
    fn report(&mut self, diagnostic: &Diagnostic) {
        eprintln!("{}", diagnostic);
    }
}

/// Forwards diagnostics to a callback, for hosts that present them
/// elsewhere.
pub struct CapturingErrorHandler<F: FnMut(&Diagnostic)> {
    callback: F,
}

impl<F: FnMut(&Diagnostic)> CapturingErrorHandler<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut(&Diagnostic)> ErrorHandler for CapturingErrorHandler<F> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        (self.callback)(diagnostic)
    }
}

/// Unrecoverable faults. These unwind the whole invocation through every
/// evaluation entry point; the call stack is popped on the way out.
#[derive(Debug, Error)]
pub enum Fatal {
    #[error("maximum execution time of {0} ms exceeded")]
    ExecutionTimeout(u64),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type EvalResult<T = crate::core::value::Value> = Result<T, Fatal>;
