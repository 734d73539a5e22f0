//! Statements and control flow.
//!
//! Bodies are plain statement lists; `execute` threads a `Flow` signal
//! upward so `return`, `break` and `continue` unwind exactly as far as they
//! should. Loops are cooperative cancellation points.

use std::rc::Rc;

use crate::core::value::Value;
use crate::core::var::Var;
use crate::env::Env;
use crate::env::error::EvalResult;
use crate::expr::ExprRef;

/// Control-flow signal produced by a statement.
pub enum Flow {
    Next,
    Break,
    Continue,
    Return(Value),
    /// `return` from a `&`-returning function: the live cell itself.
    ReturnRef(Var),
}

pub enum Stmt {
    Expr(ExprRef),
    Block(Vec<Stmt>),
    Echo(Vec<ExprRef>),
    If {
        cond: ExprRef,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    While {
        cond: ExprRef,
        body: Vec<Stmt>,
    },
    Return(Option<ExprRef>),
    /// Return the expression's storage cell instead of a copy.
    ReturnRef(ExprRef),
    Unset(Vec<ExprRef>),
    /// Bind the named global cells into the current function scope.
    Global(Vec<Rc<str>>),
    Break,
    Continue,
}

impl Stmt {
    pub fn execute(&self, env: &mut Env) -> EvalResult<Flow> {
        match self {
            Stmt::Expr(expr) => {
                expr.eval(env)?;
                Ok(Flow::Next)
            }
            Stmt::Block(stmts) => execute(stmts, env),
            Stmt::Echo(parts) => {
                for part in parts {
                    let value = part.eval(env)?;
                    let bytes = value.to_string_bytes();
                    env.echo(&bytes);
                }
                Ok(Flow::Next)
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if cond.eval(env)?.to_bool() {
                    execute(then, env)
                } else {
                    execute(otherwise, env)
                }
            }
            Stmt::While { cond, body } => {
                loop {
                    env.check_timeout()?;
                    if !cond.eval(env)?.to_bool() {
                        break;
                    }
                    match execute(body, env)? {
                        Flow::Next | Flow::Continue => {}
                        Flow::Break => break,
                        ret => return Ok(ret),
                    }
                }
                Ok(Flow::Next)
            }
            Stmt::Return(expr) => match expr {
                Some(expr) => Ok(Flow::Return(expr.eval_copy(env)?)),
                None => Ok(Flow::Return(Value::Null)),
            },
            Stmt::ReturnRef(expr) => Ok(Flow::ReturnRef(expr.eval_ref(env)?)),
            Stmt::Unset(targets) => {
                for target in targets {
                    target.eval_unset(env)?;
                }
                Ok(Flow::Next)
            }
            Stmt::Global(names) => {
                for name in names {
                    let cell = env.global_var(name);
                    cell.mark_ref();
                    env.set_local(name.clone(), cell);
                }
                Ok(Flow::Next)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
        }
    }
}

/// Run a statement list, stopping at the first non-`Next` signal.
pub fn execute(stmts: &[Stmt], env: &mut Env) -> EvalResult<Flow> {
    for stmt in stmts {
        match stmt.execute(env)? {
            Flow::Next => {}
            other => return Ok(other),
        }
    }
    Ok(Flow::Next)
}
