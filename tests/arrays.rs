//! Array subscripts: vivification, append, key canonicalization, unset,
//! isset, string offsets.

mod common;

use common::{has_diagnostic, run, run_value};
use php_embed::core::value::Value;
use php_embed::env::error::ErrorKind;
use php_embed::expr::ExprFactory;
use php_embed::expr::array::ArrayEntry;
use php_embed::program::ProgramBuilder;
use php_embed::stmt::Stmt;

#[test]
fn nested_write_vivifies_intermediate_arrays() {
    let f = ExprFactory::new();
    // $a[0][1] = 5; return $a[0][1];
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(
                f.array_get(f.array_get(f.var("a"), f.long(0)), f.long(1)),
                f.long(5),
            )),
            Stmt::Return(Some(f.array_get(
                f.array_get(f.var("a"), f.long(0)),
                f.long(1),
            ))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(5));
}

#[test]
fn append_uses_auto_increment_keys() {
    let f = ExprFactory::new();
    // $a[] = 10; $a[] = 20; return $a[1];
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.array_append(f.var("a")), f.long(10))),
            Stmt::Expr(f.assign(f.array_append(f.var("a")), f.long(20))),
            Stmt::Return(Some(f.array_get(f.var("a"), f.long(1)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(20));
}

#[test]
fn numeric_string_keys_canonicalize_to_integers() {
    let f = ExprFactory::new();
    // $a["5"] = "x"; return $a[5];
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(
                f.array_get(f.var("a"), f.string("5")),
                f.string("x"),
            )),
            Stmt::Return(Some(f.array_get(f.var("a"), f.long(5)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::string("x"));
}

#[test]
fn leading_zero_keys_stay_strings() {
    let f = ExprFactory::new();
    // $a["05"] = 1; isset($a[5]) is false.
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.string("05")), f.long(1))),
            Stmt::Return(Some(f.isset(vec![f.array_get(f.var("a"), f.long(5))]))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Bool(false));
}

#[test]
fn unset_removes_the_entry() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(1))),
            Stmt::Unset(vec![f.array_get(f.var("a"), f.long(0))]),
            Stmt::Return(Some(f.isset(vec![f.array_get(f.var("a"), f.long(0))]))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Bool(false));
}

#[test]
fn reading_a_missing_key_notices_and_yields_null() {
    let f = ExprFactory::new();
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(1))),
            Stmt::Return(Some(f.array_get(f.var("a"), f.long(7)))),
        ])
        .build();
    let result = run(&program);
    assert_eq!(result.value, Value::Null);
    assert!(result.diagnostics.iter().any(|d| d.message.contains("Undefined array key")));
}

#[test]
fn string_offset_read() {
    let f = ExprFactory::new();
    // $s = "abc"; return $s[1];
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.var("s"), f.string("abc"))),
            Stmt::Return(Some(f.array_get(f.var("s"), f.long(1)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::string("b"));
}

#[test]
fn array_literal_with_keys_and_reference_entry() {
    let f = ExprFactory::new();
    // $x = 1;
    // $a = array("k" => 2, &$x);
    // $x = 9; return $a[0];
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.var("x"), f.long(1))),
            Stmt::Expr(f.assign(
                f.var("a"),
                f.array_literal(vec![
                    ArrayEntry {
                        key: Some(f.string("k")),
                        value: f.long(2),
                        by_ref: false,
                    },
                    ArrayEntry {
                        key: None,
                        value: f.var("x"),
                        by_ref: true,
                    },
                ]),
            )),
            Stmt::Expr(f.assign(f.var("x"), f.long(9))),
            Stmt::Return(Some(f.array_get(f.var("a"), f.long(0)))),
        ])
        .build();
    assert_eq!(run_value(&program), Value::Long(9));
}

#[test]
fn scalar_base_rejects_array_write() {
    let f = ExprFactory::new();
    // $a = 3; $a[0] = 1; $a stays 3.
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign(f.var("a"), f.long(3))),
            Stmt::Expr(f.assign(f.array_get(f.var("a"), f.long(0)), f.long(1))),
            Stmt::Return(Some(f.var("a"))),
        ])
        .build();
    let result = run(&program);
    assert_eq!(result.value, Value::Long(3));
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("scalar")));
}

#[test]
fn invalid_reference_target_reports_and_degrades() {
    let f = ExprFactory::new();
    // $r =& (1 + 2); still evaluates, reports, and leaves $r detached
    let program = ProgramBuilder::new()
        .main(vec![
            Stmt::Expr(f.assign_ref(
                f.var("r"),
                f.binary(php_embed::expr::binary::BinaryOp::Add, f.long(1), f.long(2)),
            )),
            Stmt::Return(Some(f.var("r"))),
        ])
        .build();
    let result = run(&program);
    assert_eq!(result.value, Value::Long(3));
    assert!(has_diagnostic(&result, ErrorKind::InvalidReferenceTarget));
}
