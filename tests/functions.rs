//! Function definition, resolution, and recursion.

mod common;

use common::{has_diagnostic, run, run_value};
use php_embed::core::value::Value;
use php_embed::env::error::ErrorKind;
use php_embed::expr::ExprFactory;
use php_embed::expr::binary::BinaryOp;
use php_embed::program::{Arg, Function, ProgramBuilder};
use php_embed::stmt::Stmt;

#[test]
fn recursive_fibonacci() {
    let f = ExprFactory::new();
    // function fib($n) { if ($n < 2) return $n;
    //                    return fib($n - 1) + fib($n - 2); }
    let fib = Function::new(
        "fib",
        vec![Arg::by_value("n")],
        vec![
            Stmt::If {
                cond: f.binary(BinaryOp::Lt, f.var("n"), f.long(2)),
                then: vec![Stmt::Return(Some(f.var("n")))],
                otherwise: vec![],
            },
            Stmt::Return(Some(f.binary(
                BinaryOp::Add,
                f.call(
                    "fib",
                    vec![f.binary(BinaryOp::Sub, f.var("n"), f.long(1))],
                ),
                f.call(
                    "fib",
                    vec![f.binary(BinaryOp::Sub, f.var("n"), f.long(2))],
                ),
            ))),
        ],
    );
    let program = ProgramBuilder::new()
        .function(fib)
        .main(vec![Stmt::Return(Some(f.call("fib", vec![f.long(10)])))])
        .build();
    assert_eq!(run_value(&program), Value::Long(55));
}

#[test]
fn function_names_resolve_case_insensitively() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .function(Function::new(
            "MyFunc",
            vec![],
            vec![Stmt::Return(Some(f.long(7)))],
        ))
        .main(vec![Stmt::Return(Some(f.call("myfunc", vec![])))])
        .build();
    assert_eq!(run_value(&program), Value::Long(7));
}

#[test]
fn strict_mode_disables_case_fallback() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .strict(true)
        .function(Function::new(
            "MyFunc",
            vec![],
            vec![Stmt::Return(Some(f.long(7)))],
        ))
        .main(vec![Stmt::Return(Some(f.call("myfunc", vec![])))])
        .build();
    let result = run(&program);
    assert_eq!(result.value, Value::Null);
    assert!(has_diagnostic(&result, ErrorKind::UnknownFunction));
}

#[test]
fn exact_name_still_resolves_in_strict_mode() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .strict(true)
        .function(Function::new(
            "MyFunc",
            vec![],
            vec![Stmt::Return(Some(f.long(7)))],
        ))
        .main(vec![Stmt::Return(Some(f.call("MyFunc", vec![])))])
        .build();
    assert_eq!(run_value(&program), Value::Long(7));
}

#[test]
fn unknown_function_degrades_to_null() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .main(vec![Stmt::Return(Some(f.call("nothing", vec![])))])
        .build();
    let result = run(&program);
    assert_eq!(result.value, Value::Null);
    assert!(has_diagnostic(&result, ErrorKind::UnknownFunction));
}

#[test]
fn dynamic_call_through_string_variable() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .function(Function::new(
            "greet",
            vec![],
            vec![Stmt::Return(Some(f.string("hi")))],
        ))
        .main(vec![
            Stmt::Expr(f.assign(f.var("fn"), f.string("greet"))),
            Stmt::Return(Some(f.dynamic_call(f.var("fn"), vec![]))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::string("hi"));
}

#[test]
fn global_statement_aliases_the_global_cell() {
    let f = ExprFactory::new();
    // function bump() { global $n; $n = $n + 1; }
    // $n = 10; bump(); bump(); return $n;
    let bump = Function::new(
        "bump",
        vec![],
        vec![
            Stmt::Global(vec!["n".into()]),
            Stmt::Expr(f.assign(
                f.var("n"),
                f.binary(BinaryOp::Add, f.var("n"), f.long(1)),
            )),
        ],
    );
    let program = ProgramBuilder::new()
        .function(bump)
        .main(vec![
            Stmt::Expr(f.assign(f.var("n"), f.long(10))),
            Stmt::Expr(f.call("bump", vec![])),
            Stmt::Expr(f.call("bump", vec![])),
            Stmt::Return(Some(f.var("n"))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(12));
}

#[test]
fn echo_writes_to_captured_output() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Echo(vec![f.string("hello "), f.long(42)]),
        ])
        .build();
    let result = run(&program);
    assert_eq!(result.output, b"hello 42");
}
