//! Call-stack bookkeeping: frame names, nesting, and balance on both
//! normal return and fatal unwind.

mod common;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use php_embed::core::value::Value;
use php_embed::env::Env;
use php_embed::env::error::{EvalResult, Fatal};
use php_embed::env::class::ClassBuilder;
use php_embed::expr::{ClassNameRef, Expr, ExprFactory, ExprRef, Location};
use php_embed::program::{Function, ProgramBuilder};
use php_embed::stmt::Stmt;

/// Test-only expression that snapshots the backtrace when evaluated.
struct BacktraceSnapExpr {
    seen: Rc<RefCell<Vec<Vec<String>>>>,
    location: Location,
}

impl BacktraceSnapExpr {
    fn new(seen: Rc<RefCell<Vec<Vec<String>>>>) -> ExprRef {
        Rc::new(Self {
            seen,
            location: Location::UNKNOWN,
        })
    }
}

impl Expr for BacktraceSnapExpr {
    fn location(&self) -> &Location {
        &self.location
    }

    fn eval(&self, env: &mut Env) -> EvalResult {
        let frames = env
            .backtrace()
            .iter()
            .map(|entry| entry.function.to_string())
            .collect();
        self.seen.borrow_mut().push(frames);
        Ok(Value::Null)
    }
}

impl fmt::Display for BacktraceSnapExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<snapshot>")
    }
}

#[test]
fn nested_calls_stack_their_frames_in_order() {
    let f = ExprFactory::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let inner = Function::new("inner", vec![], vec![Stmt::Expr(BacktraceSnapExpr::new(seen.clone()))]);
    let outer = Function::new(
        "outer",
        vec![],
        vec![Stmt::Expr(f.call("inner", vec![]))],
    );
    let program = ProgramBuilder::new()
        .function(inner)
        .function(outer)
        .main(vec![Stmt::Expr(f.call("outer", vec![]))])
        .build();

    let mut env = Env::new(program);
    env.call_function("outer", &[]).expect("call failed");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], vec!["outer", "inner"]);
    assert_eq!(env.stack_depth(), 0, "stack must be balanced after return");
}

#[test]
fn method_frames_carry_the_qualified_name() {
    let f = ExprFactory::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let c = ClassBuilder::new("Widget")
        .method(Function::new(
            "render",
            vec![],
            vec![Stmt::Expr(BacktraceSnapExpr::new(seen.clone()))],
        ))
        .build();
    let program = ProgramBuilder::new()
        .class(c)
        .main(vec![
            Stmt::Expr(f.assign(
                f.var("w"),
                f.new_object(ClassNameRef::Named("Widget".into()), vec![]),
            )),
            Stmt::Expr(f.method_call(f.var("w"), "render", vec![])),
        ])
        .build();

    php_embed::executor::execute(&program).expect("execution failed");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], vec!["Widget::render"]);
}

#[test]
fn fatal_unwind_still_pops_every_frame() {
    let f = ExprFactory::new();
    // function spin() { while (true) {} }
    let spin = Function::new(
        "spin",
        vec![],
        vec![Stmt::While {
            cond: f.bool(true),
            body: vec![],
        }],
    );
    let program = ProgramBuilder::new().function(spin).main(vec![]).build();

    let mut env = Env::new(program);
    env.set_timeout(Duration::from_millis(20));
    let result = env.call_function("spin", &[]);
    assert!(matches!(result, Err(Fatal::ExecutionTimeout(_))));
    assert_eq!(env.stack_depth(), 0, "stack must be balanced after unwind");
}

#[test]
fn frame_records_bound_argument_values() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let take = Function::new(
        "take",
        vec![php_embed::program::Arg::by_value("x")],
        vec![Stmt::Expr(BacktraceSnapExpr::new(seen.clone()))],
    );
    let program = ProgramBuilder::new().function(take).main(vec![]).build();

    let mut env = Env::new(program);
    env.call_function("take", &[Value::Long(5)]).expect("call failed");

    // the snapshot ran inside exactly one frame
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0], vec!["take"]);
}
