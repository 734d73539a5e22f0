//! One-shot program execution for hosts.
//!
//! Each call builds a fresh `Env` against the shared program, seeds the
//! configured globals, runs the top-level statements under the wall-clock
//! budget, and hands back the produced value together with buffered output
//! and collected diagnostics.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::core::value::Value;
use crate::env::Env;
use crate::env::error::{Diagnostic, Fatal};
use crate::program::Program;
use crate::stmt::{self, Flow};

pub struct ExecutionConfig {
    /// Wall-clock budget in milliseconds; checked cooperatively at call and
    /// loop boundaries.
    pub timeout_ms: u64,
    /// Values seeded into the global scope before the first statement.
    pub globals: HashMap<Rc<str>, Value>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            globals: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct ExecutionResult {
    /// Value of a top-level `return`, null otherwise.
    pub value: Value,
    pub output: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// A fatal fault, together with whatever the run had produced before it
/// unwound.
#[derive(Debug, Error)]
#[error("{fatal}")]
pub struct ExecutionError {
    pub fatal: Fatal,
    pub output: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn execute(program: &Rc<Program>) -> Result<ExecutionResult, ExecutionError> {
    execute_with_config(program, ExecutionConfig::default())
}

pub fn execute_with_config(
    program: &Rc<Program>,
    config: ExecutionConfig,
) -> Result<ExecutionResult, ExecutionError> {
    let started = Instant::now();
    let mut env = Env::new(program.clone());
    env.set_timeout(Duration::from_millis(config.timeout_ms));
    for (name, value) in config.globals {
        env.get_var_or_create(&name).set(value.copy());
    }

    let flow = match stmt::execute(program.main(), &mut env) {
        Ok(flow) => flow,
        Err(fatal) => {
            return Err(ExecutionError {
                fatal,
                output: env.take_output(),
                diagnostics: env.take_diagnostics(),
            });
        }
    };
    let value = match flow {
        Flow::Return(value) => value,
        Flow::ReturnRef(var) => var.get().copy(),
        _ => Value::Null,
    };

    Ok(ExecutionResult {
        value,
        output: env.take_output(),
        diagnostics: env.take_diagnostics(),
        duration: started.elapsed(),
    })
}
