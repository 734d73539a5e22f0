//! An embeddable PHP expression-evaluation and call-binding engine.
//!
//! The crate models the interpreted core of a PHP runtime: a tree of
//! expression nodes with PHP's multi-mode evaluation contract (value,
//! copy, reference, argument, assignment, isset), a function and method
//! call binder that implements declaration-driven by-value/by-reference
//! argument passing, and a class catalog with inheritance-chain dispatch,
//! a `__call` fallback, and late static binding.
//!
//! A compiled [`program::Program`] is immutable and shareable; each
//! invocation runs in its own [`env::Env`], which owns the variable
//! scopes, receiver and calling-class registers, static-field storage,
//! diagnostics, output buffer, and the cooperative wall-clock budget.
//!
//! ```
//! use php_embed::expr::ExprFactory;
//! use php_embed::program::{Arg, Function, ProgramBuilder};
//! use php_embed::stmt::Stmt;
//! use php_embed::core::value::Value;
//! use php_embed::executor;
//!
//! let f = ExprFactory::new();
//! let program = ProgramBuilder::new()
//!     .function(Function::new(
//!         "double",
//!         vec![Arg::by_value("x")],
//!         vec![Stmt::Return(Some(f.binary(
//!             php_embed::expr::binary::BinaryOp::Add,
//!             f.var("x"),
//!             f.var("x"),
//!         )))],
//!     ))
//!     .main(vec![Stmt::Return(Some(f.call("double", vec![f.long(21)])))])
//!     .build();
//!
//! let result = executor::execute(&program).unwrap();
//! assert_eq!(result.value, Value::Long(42));
//! ```

pub mod core;
pub mod env;
pub mod executor;
pub mod expr;
pub mod program;
pub mod stmt;

pub use crate::core::value::Value;
pub use crate::core::var::Var;
pub use crate::env::Env;
pub use crate::env::error::{Diagnostic, ErrorKind, ErrorLevel, EvalResult, Fatal};
pub use crate::executor::{ExecutionConfig, ExecutionError, ExecutionResult};
pub use crate::expr::{Expr, ExprFactory, ExprRef, Location};
pub use crate::program::{Arg, Function, Program, ProgramBuilder};
