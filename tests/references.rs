//! Reference binding: `=&`, references into arrays, and the share/copy
//! split on array duplication.

mod common;

use common::run_value;
use php_embed::core::value::Value;
use php_embed::expr::ExprFactory;
use php_embed::program::ProgramBuilder;
use php_embed::stmt::Stmt;

#[test]
fn rebinding_aliases_two_names() {
    let f = ExprFactory::new();
    // $a = 1; $b =& $a; $a = 5; return $b;
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.var("a"), f.long(1))),
            Stmt::Expr(f.assign_ref(f.var("b"), f.var("a"))),
            Stmt::Expr(f.assign(f.var("a"), f.long(5))),
            Stmt::Return(Some(f.var("b"))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(5));
}

#[test]
fn writes_flow_both_directions() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.var("a"), f.long(1))),
            Stmt::Expr(f.assign_ref(f.var("b"), f.var("a"))),
            Stmt::Expr(f.assign(f.var("b"), f.long(9))),
            Stmt::Return(Some(f.var("a"))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(9));
}

#[test]
fn reference_into_array_element() {
    let f = ExprFactory::new();
    // $a[0] = 1; $r =& $a[0]; $r = 7; return $a[0];
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(1))),
            Stmt::Expr(f.assign_ref(f.var("r"), f.array_get(f.var("a"), f.long(0)))),
            Stmt::Expr(f.assign(f.var("r"), f.long(7))),
            Stmt::Return(Some(f.array_get(f.var("a"), f.long(0)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(7));
}

#[test]
fn array_copy_shares_reference_entries() {
    let f = ExprFactory::new();
    // $a[0] = 1; $r =& $a[0]; $b = $a; $r = 9; return $b[0];
    // A reference entry survives the copy and stays aliased.
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(1))),
            Stmt::Expr(f.assign_ref(f.var("r"), f.array_get(f.var("a"), f.long(0)))),
            Stmt::Expr(f.assign(f.var("b"), f.var("a"))),
            Stmt::Expr(f.assign(f.var("r"), f.long(9))),
            Stmt::Return(Some(f.array_get(f.var("b"), f.long(0)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(9));
}

#[test]
fn unset_breaks_one_alias_only() {
    let f = ExprFactory::new();
    // $a = 1; $b =& $a; unset($b); $a survives.
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.var("a"), f.long(1))),
            Stmt::Expr(f.assign_ref(f.var("b"), f.var("a"))),
            Stmt::Unset(vec![f.var("b")]),
            Stmt::Return(Some(f.var("a"))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(1));
}

#[test]
fn reference_to_object_property() {
    let f = ExprFactory::new();
    // $o->x = 1; $r =& $o->x; $r = 4; return $o->x;
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.field(f.var("o"), "x"), f.long(1))),
            Stmt::Expr(f.assign_ref(f.var("r"), f.field(f.var("o"), "x"))),
            Stmt::Expr(f.assign(f.var("r"), f.long(4))),
            Stmt::Return(Some(f.field(f.var("o"), "x"))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(4));
}
