//! Shared helpers for the integration tests.
//!
//! Tests build programs directly through `ExprFactory` and
//! `ProgramBuilder`, run them through the executor, and assert on the
//! returned value, buffered output, and collected diagnostics.
#![allow(dead_code)]

use std::rc::Rc;

use php_embed::core::value::{ArrayKey, Value};
use php_embed::env::error::ErrorKind;
use php_embed::executor::{self, ExecutionResult};
use php_embed::program::Program;

pub fn run(program: &Rc<Program>) -> ExecutionResult {
    executor::execute(program).expect("execution failed")
}

/// The returned value of a program expected to complete cleanly.
pub fn run_value(program: &Rc<Program>) -> Value {
    run(program).value
}

pub fn has_diagnostic(result: &ExecutionResult, kind: ErrorKind) -> bool {
    result
        .diagnostics
        .iter()
        .any(|diagnostic| diagnostic.kind == Some(kind))
}

/// Integer element of an array value, panicking on shape mismatches.
pub fn array_long(value: &Value, key: i64) -> i64 {
    match value {
        Value::Array(arr) => arr
            .get(&ArrayKey::Int(key))
            .unwrap_or_else(|| panic!("missing key {}", key))
            .to_long(),
        other => panic!("expected array, got {}", other.type_name()),
    }
}

pub fn array_len(value: &Value) -> usize {
    match value {
        Value::Array(arr) => arr.len(),
        other => panic!("expected array, got {}", other.type_name()),
    }
}
