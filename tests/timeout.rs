//! Cooperative wall-clock cancellation.

mod common;

use php_embed::env::error::Fatal;
use php_embed::executor::{self, ExecutionConfig};
use php_embed::expr::ExprFactory;
use php_embed::program::{Function, ProgramBuilder};
use php_embed::stmt::Stmt;

#[test]
fn infinite_loop_hits_the_budget() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .main(vec![Stmt::While {
            cond: f.bool(true),
            body: vec![],
        }])
        .build();
    let config = ExecutionConfig {
        timeout_ms: 50,
        ..Default::default()
    };
    let err = executor::execute_with_config(&program, config).unwrap_err();
    assert!(matches!(err.fatal, Fatal::ExecutionTimeout(50)));
}

#[test]
fn call_heavy_loop_hits_the_budget_at_a_call_boundary() {
    let f = ExprFactory::new();
    let noop = Function::new("noop", vec![], vec![]);
    let program = ProgramBuilder::new()
        .function(noop)
        .main(vec![Stmt::While {
            cond: f.bool(true),
            body: vec![Stmt::Expr(f.call("noop", vec![]))],
        }])
        .build();
    let config = ExecutionConfig {
        timeout_ms: 50,
        ..Default::default()
    };
    let err = executor::execute_with_config(&program, config).unwrap_err();
    assert!(matches!(err.fatal, Fatal::ExecutionTimeout(_)));
}

#[test]
fn timed_out_run_still_surfaces_output_and_diagnostics() {
    let f = ExprFactory::new();
    // echo "tick"; $ghost;  -- then spin until the budget fires
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Echo(vec![f.string("tick")]),
            Stmt::Expr(f.var("ghost")),
            Stmt::While {
                cond: f.bool(true),
                body: vec![],
            },
        ])
        .build();
    let config = ExecutionConfig {
        timeout_ms: 50,
        ..Default::default()
    };
    let err = executor::execute_with_config(&program, config).unwrap_err();
    assert!(matches!(err.fatal, Fatal::ExecutionTimeout(_)));
    assert_eq!(err.output, b"tick");
    assert!(err.diagnostics.iter().any(|d| d.message.contains("ghost")));
}

#[test]
fn short_programs_finish_under_the_default_budget() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .main(vec![Stmt::Return(Some(f.long(1)))])
        .build();
    assert!(executor::execute(&program).is_ok());
}
