//! Expression construction with location stamping and load-time folding.
//!
//! The loader drives one factory per source file, bumping the line as it
//! goes; every node it builds carries that position. Concatenation goes
//! through `concat`, which flattens the chain and folds adjacent literals
//! once, at build time.

use std::rc::Rc;

use crate::core::value::Value;
use crate::expr::array::{ArrayEntry, ArrayGetExpr, ArrayLiteralExpr};
use crate::expr::assign::{AssignExpr, AssignRefExpr, IssetExpr, ListAssignExpr, RefExpr};
use crate::expr::binary::{
    BinaryExpr, BinaryOp, CastExpr, CastKind, ConditionalExpr, UnaryExpr, UnaryOp,
};
use crate::expr::call::{
    CallExpr, DynamicCallExpr, FuncArgsExpr, MethodCallExpr, NewExpr, StaticMethodExpr,
};
use crate::expr::field::{FieldGetExpr, FieldVarGetExpr, ThisFieldExpr};
use crate::expr::literal::LiteralExpr;
use crate::expr::static_field::StaticFieldExpr;
use crate::expr::var::{ThisExpr, VarExpr, VarVarExpr};
use crate::expr::{ClassNameRef, ExprRef, Location};

#[derive(Default)]
pub struct ExprFactory {
    file: Option<Rc<str>>,
    line: u32,
}

impl ExprFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_file(&mut self, file: impl Into<Rc<str>>) {
        self.file = Some(file.into());
    }

    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    fn location(&self) -> Location {
        Location {
            file: self.file.clone(),
            line: self.line,
        }
    }

    // ---- literals --------------------------------------------------------

    pub fn literal(&self, value: Value) -> ExprRef {
        Rc::new(LiteralExpr::new(value, self.location()))
    }

    pub fn null(&self) -> ExprRef {
        self.literal(Value::Null)
    }

    pub fn bool(&self, value: bool) -> ExprRef {
        self.literal(Value::Bool(value))
    }

    pub fn long(&self, value: i64) -> ExprRef {
        self.literal(Value::Long(value))
    }

    pub fn double(&self, value: f64) -> ExprRef {
        self.literal(Value::Double(value))
    }

    pub fn string(&self, value: impl Into<Vec<u8>>) -> ExprRef {
        self.literal(Value::string(value))
    }

    // ---- variables and properties ----------------------------------------

    pub fn var(&self, name: impl Into<Rc<str>>) -> ExprRef {
        Rc::new(VarExpr::new(name, self.location()))
    }

    pub fn var_var(&self, name_expr: ExprRef) -> ExprRef {
        Rc::new(VarVarExpr::new(name_expr, self.location()))
    }

    pub fn this_var(&self) -> ExprRef {
        Rc::new(ThisExpr::new(self.location()))
    }

    pub fn this_field(&self, name: impl Into<Rc<str>>) -> ExprRef {
        Rc::new(ThisFieldExpr::new(name, self.location()))
    }

    pub fn field(&self, obj: ExprRef, name: impl Into<Rc<str>>) -> ExprRef {
        Rc::new(FieldGetExpr::new(obj, name, self.location()))
    }

    pub fn field_var(&self, obj: ExprRef, name_expr: ExprRef) -> ExprRef {
        Rc::new(FieldVarGetExpr::new(obj, name_expr, self.location()))
    }

    pub fn static_field(&self, class: ClassNameRef, name: impl Into<Rc<str>>) -> ExprRef {
        Rc::new(StaticFieldExpr::new(class, name, self.location()))
    }

    // ---- arrays ----------------------------------------------------------

    pub fn array_get(&self, array: ExprRef, index: ExprRef) -> ExprRef {
        Rc::new(ArrayGetExpr::new(array, Some(index), self.location()))
    }

    /// The append form `$a[]`.
    pub fn array_append(&self, array: ExprRef) -> ExprRef {
        Rc::new(ArrayGetExpr::new(array, None, self.location()))
    }

    pub fn array_literal(&self, entries: Vec<ArrayEntry>) -> ExprRef {
        Rc::new(ArrayLiteralExpr::new(entries, self.location()))
    }

    // ---- operators -------------------------------------------------------

    pub fn binary(&self, op: BinaryOp, left: ExprRef, right: ExprRef) -> ExprRef {
        if op == BinaryOp::Concat {
            return self.concat(left, right);
        }
        Rc::new(BinaryExpr::new(op, left, right, self.location()))
    }

    /// Build a concatenation, folding adjacent literal operands. The chain
    /// is flattened first so `('a' . 'b') . $x . 'c' . 'd'` becomes
    /// `'ab' . $x . 'cd'`; non-literal operands keep their order.
    pub fn concat(&self, left: ExprRef, right: ExprRef) -> ExprRef {
        let mut parts = Vec::new();
        flatten_concat(&left, &mut parts);
        flatten_concat(&right, &mut parts);

        let mut folded: Vec<ExprRef> = Vec::with_capacity(parts.len());
        for part in parts {
            let merged = match (folded.last(), part.literal_value()) {
                (Some(prev), Some(value)) => prev.literal_value().map(|prev_value| {
                    let mut bytes = prev_value.to_string_bytes();
                    bytes.extend_from_slice(&value.to_string_bytes());
                    self.literal(Value::String(Rc::new(bytes)))
                }),
                _ => None,
            };
            match merged {
                Some(combined) => {
                    folded.pop();
                    folded.push(combined);
                }
                None => folded.push(part),
            }
        }

        let mut iter = folded.into_iter();
        let first = iter.next().unwrap_or_else(|| self.string(""));
        iter.fold(first, |acc, part| {
            Rc::new(BinaryExpr::new(
                BinaryOp::Concat,
                acc,
                part,
                self.location(),
            )) as ExprRef
        })
    }

    pub fn unary(&self, op: UnaryOp, operand: ExprRef) -> ExprRef {
        Rc::new(UnaryExpr::new(op, operand, self.location()))
    }

    pub fn conditional(&self, cond: ExprRef, then: ExprRef, otherwise: ExprRef) -> ExprRef {
        Rc::new(ConditionalExpr::new(cond, then, otherwise, self.location()))
    }

    pub fn cast(&self, kind: CastKind, operand: ExprRef) -> ExprRef {
        Rc::new(CastExpr::new(kind, operand, self.location()))
    }

    // ---- assignment ------------------------------------------------------

    pub fn assign(&self, target: ExprRef, value: ExprRef) -> ExprRef {
        Rc::new(AssignExpr::new(target, value, self.location()))
    }

    pub fn assign_ref(&self, target: ExprRef, source: ExprRef) -> ExprRef {
        Rc::new(AssignRefExpr::new(target, source, self.location()))
    }

    pub fn list_assign(&self, targets: Vec<Option<ExprRef>>, value: ExprRef) -> ExprRef {
        Rc::new(ListAssignExpr::new(targets, value, self.location()))
    }

    /// `&expr` in an argument list.
    pub fn by_ref(&self, operand: ExprRef) -> ExprRef {
        Rc::new(RefExpr::new(operand, self.location()))
    }

    pub fn isset(&self, operands: Vec<ExprRef>) -> ExprRef {
        Rc::new(IssetExpr::new(operands, self.location()))
    }

    // ---- calls -----------------------------------------------------------

    pub fn call(&self, name: impl Into<Rc<str>>, args: Vec<ExprRef>) -> ExprRef {
        Rc::new(CallExpr::new(name, args, self.location()))
    }

    pub fn dynamic_call(&self, name_expr: ExprRef, args: Vec<ExprRef>) -> ExprRef {
        Rc::new(DynamicCallExpr::new(name_expr, args, self.location()))
    }

    pub fn method_call(
        &self,
        obj: ExprRef,
        name: impl Into<Rc<str>>,
        args: Vec<ExprRef>,
    ) -> ExprRef {
        Rc::new(MethodCallExpr::new(obj, name, args, self.location()))
    }

    pub fn static_call(
        &self,
        class: ClassNameRef,
        name: impl Into<Rc<str>>,
        args: Vec<ExprRef>,
    ) -> ExprRef {
        Rc::new(StaticMethodExpr::new(class, name, args, self.location()))
    }

    pub fn new_object(&self, class: ClassNameRef, args: Vec<ExprRef>) -> ExprRef {
        Rc::new(NewExpr::new(class, args, self.location()))
    }

    pub fn func_get_args(&self) -> ExprRef {
        Rc::new(FuncArgsExpr::new(self.location()))
    }
}

fn flatten_concat(expr: &ExprRef, out: &mut Vec<ExprRef>) {
    match expr.concat_parts() {
        Some((left, right)) => {
            flatten_concat(left, out);
            flatten_concat(right, out);
        }
        None => out.push(expr.clone()),
    }
}
