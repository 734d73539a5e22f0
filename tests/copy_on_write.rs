//! Copy semantics at store points: arrays detach, objects share handles.

mod common;

use common::run_value;
use php_embed::core::value::Value;
use php_embed::expr::ExprFactory;
use php_embed::program::{Arg, Function, ProgramBuilder};
use php_embed::stmt::Stmt;

#[test]
fn array_assignment_detaches() {
    let f = ExprFactory::new();
    // $a[0] = 1; $b = $a; $a[0] = 2; return $b[0];
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(1))),
            Stmt::Expr(f.assign(f.var("b"), f.var("a"))),
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(2))),
            Stmt::Return(Some(f.array_get(f.var("b"), f.long(0)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(1));
}

#[test]
fn nested_write_does_not_leak_into_earlier_copy() {
    let f = ExprFactory::new();
    // $a[0][0] = 1; $b = $a; $a[0][1] = 2; return isset($b[0][1]);
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(
                f.array_get(f.array_get(f.var("a"), f.long(0)), f.long(0)),
                f.long(1),
            )),
            Stmt::Expr(f.assign(f.var("b"), f.var("a"))),
            Stmt::Expr(f.assign(
                f.array_get(f.array_get(f.var("a"), f.long(0)), f.long(1)),
                f.long(2),
            )),
            Stmt::Return(Some(f.isset(vec![f.array_get(
                f.array_get(f.var("b"), f.long(0)),
                f.long(1),
            )]))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Bool(false));
}

#[test]
fn by_value_array_argument_is_private_to_the_callee() {
    let f = ExprFactory::new();
    // function stomp($arr) { $arr[0] = 99; }
    let stomp = Function::new(
        "stomp",
        vec![Arg::by_value("arr")],
        vec![Stmt::Expr(f.assign(
            f.array_get(f.var("arr"), f.long(0)),
            f.long(99),
        ))],
    );
    let program = ProgramBuilder::new()
        .function(stomp)
        .main(vec![
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(1))),
            Stmt::Expr(f.call("stomp", vec![f.var("a")])),
            Stmt::Return(Some(f.array_get(f.var("a"), f.long(0)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(1));
}

#[test]
fn object_assignment_shares_the_handle() {
    let f = ExprFactory::new();
    // $o->x = 1; $p = $o; $p->x = 2; return $o->x;
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.field(f.var("o"), "x"), f.long(1))),
            Stmt::Expr(f.assign(f.var("p"), f.var("o"))),
            Stmt::Expr(f.assign(f.field(f.var("p"), "x"), f.long(2))),
            Stmt::Return(Some(f.field(f.var("o"), "x"))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(2));
}

#[test]
fn return_value_is_detached_from_callee_locals() {
    let f = ExprFactory::new();
    // function make() { $x[0] = 1; return $x; }
    let make = Function::new(
        "make",
        vec![],
        vec![
            Stmt::Expr(f.assign(f.array_get(f.var("x"), f.long(0)), f.long(1))),
            Stmt::Return(Some(f.var("x"))),
        ],
    );
    let program = ProgramBuilder::new()
        .function(make)
        .main(vec![
            Stmt::Expr(f.assign(f.var("a"), f.call("make", vec![]))),
            Stmt::Expr(f.assign(f.var("b"), f.call("make", vec![]))),
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(5))),
            Stmt::Return(Some(f.array_get(f.var("b"), f.long(0)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(1));
}
