use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::value::{ArrayData, ObjectHandle, Value};

#[derive(Debug)]
struct VarCell {
    value: Value,
    is_ref: bool,
}

/// The aliasable reference cell. Two names bound by reference hold clones of
/// the same `Var`; mutation through one is visible through all. The `is_ref`
/// mark records that the cell has been aliased, which is what array copy
/// consults to decide between copying and sharing an entry.
#[derive(Debug, Clone)]
pub struct Var(Rc<RefCell<VarCell>>);

impl Var {
    pub fn new(value: Value) -> Var {
        Var(Rc::new(RefCell::new(VarCell {
            value,
            is_ref: false,
        })))
    }

    pub fn new_ref(value: Value) -> Var {
        Var(Rc::new(RefCell::new(VarCell {
            value,
            is_ref: true,
        })))
    }

    pub fn get(&self) -> Value {
        self.0.borrow().value.clone()
    }

    pub fn set(&self, value: Value) {
        self.0.borrow_mut().value = value;
    }

    pub fn is_ref(&self) -> bool {
        self.0.borrow().is_ref
    }

    pub fn mark_ref(&self) {
        self.0.borrow_mut().is_ref = true;
    }

    /// Two handles to the same cell.
    pub fn ptr_eq(a: &Var, b: &Var) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn is_null(&self) -> bool {
        self.0.borrow().value.is_null()
    }

    /// Coerce the cell toward array storage: null vivifies an empty array.
    /// Returns false when the cell holds a non-array scalar, which callers
    /// report as an invalid write target.
    pub fn ensure_array(&self) -> bool {
        let mut cell = self.0.borrow_mut();
        match &cell.value {
            Value::Array(_) => true,
            Value::Null => {
                cell.value = Value::empty_array();
                true
            }
            _ => false,
        }
    }

    /// Coerce the cell toward object storage: null vivifies a bare object.
    pub fn ensure_object(&self) -> bool {
        let mut cell = self.0.borrow_mut();
        match &cell.value {
            Value::Object(_) => true,
            Value::Null => {
                cell.value = Value::new_object(None);
                true
            }
            _ => false,
        }
    }

    /// Mutate the contained array in place. The `Rc::make_mut` here is the
    /// copy-on-write point: a payload still shared with a transient reader
    /// is detached before the write lands.
    pub fn with_array_mut<R>(&self, f: impl FnOnce(&mut ArrayData) -> R) -> Option<R> {
        let mut cell = self.0.borrow_mut();
        match &mut cell.value {
            Value::Array(arr) => Some(f(Rc::make_mut(arr))),
            _ => None,
        }
    }

    pub fn with_array<R>(&self, f: impl FnOnce(&ArrayData) -> R) -> Option<R> {
        let cell = self.0.borrow();
        match &cell.value {
            Value::Array(arr) => Some(f(arr)),
            _ => None,
        }
    }

    pub fn object_handle(&self) -> Option<ObjectHandle> {
        match &self.0.borrow().value {
            Value::Object(handle) => Some(handle.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.borrow().value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_observe_mutation() {
        let a = Var::new_ref(Value::Long(1));
        let b = a.clone();
        b.set(Value::Long(2));
        assert_eq!(a.get(), Value::Long(2));
        assert!(Var::ptr_eq(&a, &b));
    }

    #[test]
    fn ensure_array_vivifies_null_only() {
        let v = Var::new(Value::Null);
        assert!(v.ensure_array());
        assert!(v.get().is_array());

        let s = Var::new(Value::Long(3));
        assert!(!s.ensure_array());
        assert_eq!(s.get(), Value::Long(3));
    }

    #[test]
    fn array_write_detaches_shared_payload() {
        let v = Var::new(Value::empty_array());
        v.with_array_mut(|arr| arr.push(Value::Long(1)));
        let transient = v.get();
        v.with_array_mut(|arr| {
            arr.insert(crate::core::value::ArrayKey::Int(0), Value::Long(9))
        });
        match transient {
            Value::Array(arr) => {
                assert_eq!(
                    arr.get(&crate::core::value::ArrayKey::Int(0)),
                    Some(Value::Long(1))
                )
            }
            _ => panic!("expected array"),
        }
        match v.get() {
            Value::Array(arr) => {
                assert_eq!(
                    arr.get(&crate::core::value::ArrayKey::Int(0)),
                    Some(Value::Long(9))
                )
            }
            _ => panic!("expected array"),
        }
    }
}
