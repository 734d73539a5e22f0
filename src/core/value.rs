use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::var::Var;

/// Key type for PHP arrays. Integer-like keys are canonicalized to `Int`
/// the way the engine's hash tables do it.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum ArrayKey {
    Int(i64),
    Str(Rc<Vec<u8>>),
}

impl ArrayKey {
    /// Coerce a runtime value into an array key following PHP's
    /// key-normalization rules: null becomes "", bools and floats become
    /// ints, decimal integer strings become ints.
    pub fn from_value(value: &Value) -> ArrayKey {
        match value {
            Value::Null => ArrayKey::Str(Rc::new(Vec::new())),
            Value::Bool(b) => ArrayKey::Int(*b as i64),
            Value::Long(i) => ArrayKey::Int(*i),
            Value::Double(d) => ArrayKey::Int(*d as i64),
            Value::String(s) => {
                if let Ok(text) = std::str::from_utf8(s) {
                    if let Ok(i) = text.parse::<i64>() {
                        // "08" is not a canonical integer key
                        if i.to_string() == *text {
                            return ArrayKey::Int(i);
                        }
                    }
                }
                ArrayKey::Str(s.clone())
            }
            other => ArrayKey::Int(other.to_long()),
        }
    }

    pub fn from_str(s: &str) -> ArrayKey {
        ArrayKey::from_value(&Value::string(s))
    }
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(i) => write!(f, "{}", i),
            ArrayKey::Str(s) => write!(f, "'{}'", String::from_utf8_lossy(s)),
        }
    }
}

/// An array entry: plain entries hold a value, entries that have been bound
/// by reference hold a shared cell. This is the `Value | Shared<Cell>` union
/// that keeps aliasing explicit instead of hiding it behind pointers.
#[derive(Debug, Clone)]
pub enum ArraySlot {
    Value(Value),
    Ref(Var),
}

impl ArraySlot {
    pub fn get(&self) -> Value {
        match self {
            ArraySlot::Value(v) => v.clone(),
            ArraySlot::Ref(var) => var.get(),
        }
    }

    /// Write through the slot: a reference entry updates the shared cell so
    /// every alias observes the mutation.
    pub fn set(&mut self, value: Value) {
        match self {
            ArraySlot::Value(v) => *v = value,
            ArraySlot::Ref(var) => var.set(value),
        }
    }
}

/// Array payload with the cached next auto-increment index, mirroring the
/// engine hash table's `nNextFreeElement`.
#[derive(Debug, Clone, Default)]
pub struct ArrayData {
    pub entries: IndexMap<ArrayKey, ArraySlot>,
    next_free: i64,
}

impl ArrayData {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            next_free: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            next_free: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ArrayKey) -> Option<Value> {
        self.entries.get(key).map(ArraySlot::get)
    }

    pub fn contains_key(&self, key: &ArrayKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a value, updating the auto-increment watermark.
    pub fn insert(&mut self, key: ArrayKey, value: Value) {
        if let ArrayKey::Int(i) = &key {
            if *i >= self.next_free {
                self.next_free = i + 1;
            }
        }
        match self.entries.get_mut(&key) {
            Some(slot) => slot.set(value),
            None => {
                self.entries.insert(key, ArraySlot::Value(value));
            }
        }
    }

    /// Append with the next auto-increment key.
    pub fn push(&mut self, value: Value) -> ArrayKey {
        let key = ArrayKey::Int(self.next_free);
        self.next_free += 1;
        self.entries.insert(key.clone(), ArraySlot::Value(value));
        key
    }

    pub fn remove(&mut self, key: &ArrayKey) {
        self.entries.shift_remove(key);
    }

    /// Reference cell for an entry, upgrading a plain entry in place and
    /// auto-vivifying a null entry when the key is absent.
    pub fn ref_entry(&mut self, key: ArrayKey) -> Var {
        if let ArrayKey::Int(i) = &key {
            if *i >= self.next_free {
                self.next_free = i + 1;
            }
        }
        let slot = self
            .entries
            .entry(key)
            .or_insert_with(|| ArraySlot::Value(Value::Null));
        match slot {
            ArraySlot::Ref(var) => var.clone(),
            ArraySlot::Value(v) => {
                let var = Var::new_ref(v.clone());
                *slot = ArraySlot::Ref(var.clone());
                var
            }
        }
    }

    /// Storage cell for an entry without marking it a reference: nested
    /// writes (`$a[0][1] = ...`) go through this so later copies of the
    /// array still detach the entry.
    pub fn entry_cell(&mut self, key: ArrayKey) -> Var {
        if let ArrayKey::Int(i) = &key {
            if *i >= self.next_free {
                self.next_free = i + 1;
            }
        }
        let slot = self
            .entries
            .entry(key)
            .or_insert_with(|| ArraySlot::Value(Value::Null));
        match slot {
            ArraySlot::Ref(var) => var.clone(),
            ArraySlot::Value(v) => {
                let var = Var::new(v.clone());
                *slot = ArraySlot::Ref(var.clone());
                var
            }
        }
    }

    /// Install an existing cell as a reference entry (`$a[k] =& $b`).
    pub fn set_ref(&mut self, key: ArrayKey, var: Var) {
        if let ArrayKey::Int(i) = &key {
            if *i >= self.next_free {
                self.next_free = i + 1;
            }
        }
        var.mark_ref();
        self.entries.insert(key, ArraySlot::Ref(var));
    }

    /// Reference cell for a fresh appended entry (`$a[] =& ...`).
    pub fn append_ref(&mut self) -> Var {
        let key = ArrayKey::Int(self.next_free);
        self.next_free += 1;
        let var = Var::new_ref(Value::Null);
        self.entries.insert(key, ArraySlot::Ref(var.clone()));
        var
    }

    /// Copy for store: plain entries are copied, reference entries keep
    /// aliasing the same cell (PHP reference-in-array semantics). An
    /// unmarked storage cell from `entry_cell` is a plain entry here.
    pub fn copy(&self) -> ArrayData {
        let mut entries = IndexMap::with_capacity(self.entries.len());
        for (key, slot) in &self.entries {
            let copied = match slot {
                ArraySlot::Value(v) => ArraySlot::Value(v.copy()),
                ArraySlot::Ref(var) if var.is_ref() => ArraySlot::Ref(var.clone()),
                ArraySlot::Ref(var) => ArraySlot::Value(var.get().copy()),
            };
            entries.insert(key.clone(), copied);
        }
        ArrayData {
            entries,
            next_free: self.next_free,
        }
    }
}

impl PartialEq for ArrayData {
    fn eq(&self, other: &Self) -> bool {
        // next_free is cached metadata, not part of the value
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((ka, sa), (kb, sb))| ka == kb && sa.get() == sb.get())
    }
}

/// Object payload. The class is recorded by name so the value layer stays
/// independent of the class catalog; an object with no class is a bare
/// record, which is what field auto-vivification produces.
#[derive(Debug)]
pub struct ObjectData {
    pub class_name: Option<Rc<str>>,
    pub properties: IndexMap<Rc<str>, Var>,
}

impl ObjectData {
    pub fn new(class_name: Option<Rc<str>>) -> Self {
        Self {
            class_name,
            properties: IndexMap::new(),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.properties.get(name).map(Var::get)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Property cell, auto-vivifying a null property if absent.
    pub fn field_var(&mut self, name: Rc<str>) -> Var {
        self.properties
            .entry(name)
            .or_insert_with(|| Var::new(Value::Null))
            .clone()
    }

    pub fn remove_field(&mut self, name: &str) {
        self.properties.shift_remove(name);
    }
}

pub type ObjectHandle = Rc<RefCell<ObjectData>>;

/// Tagged runtime value. Strings are byte arrays; arrays and strings share
/// their payload through `Rc` until a store point copies them.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(Rc<Vec<u8>>),
    Array(Rc<ArrayData>),
    Object(ObjectHandle),
}

impl Value {
    pub fn string(s: impl Into<Vec<u8>>) -> Value {
        Value::String(Rc::new(s.into()))
    }

    pub fn empty_array() -> Value {
        Value::Array(Rc::new(ArrayData::new()))
    }

    pub fn new_object(class_name: Option<Rc<str>>) -> Value {
        Value::Object(Rc::new(RefCell::new(ObjectData::new(class_name))))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Long(_) => "int",
            Value::Double(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_object(&self) -> Option<&ObjectHandle> {
        match self {
            Value::Object(handle) => Some(handle),
            _ => None,
        }
    }

    /// Store-time copy: arrays are duplicated (reference entries keep their
    /// cells), objects are shared by handle, scalars are cheap clones.
    pub fn copy(&self) -> Value {
        match self {
            Value::Array(arr) => Value::Array(Rc::new(arr.copy())),
            other => other.clone(),
        }
    }

    /// Truthiness following `zend_is_true`: "" and "0" are false, empty
    /// arrays are false, objects are always true.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Long(i) => *i != 0,
            Value::Double(d) => *d != 0.0 && !d.is_nan(),
            Value::String(s) => !(s.is_empty() || (s.len() == 1 && s[0] == b'0')),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn to_long(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => *b as i64,
            Value::Long(i) => *i,
            Value::Double(d) => *d as i64,
            Value::String(s) => parse_numeric_string(s).0,
            Value::Array(arr) => (!arr.is_empty()) as i64,
            Value::Object(_) => 1,
        }
    }

    pub fn to_double(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => *b as i64 as f64,
            Value::Long(i) => *i as f64,
            Value::Double(d) => *d,
            Value::String(s) => {
                let (long, is_double) = parse_numeric_string(s);
                if is_double {
                    std::str::from_utf8(s)
                        .ok()
                        .and_then(|t| t.trim().parse::<f64>().ok())
                        .unwrap_or(long as f64)
                } else {
                    long as f64
                }
            }
            Value::Array(arr) => (!arr.is_empty()) as i64 as f64,
            Value::Object(_) => 1.0,
        }
    }

    /// Printable conversion following `zend_make_printable_zval`.
    pub fn to_string_bytes(&self) -> Vec<u8> {
        match self {
            Value::Null => Vec::new(),
            Value::Bool(b) => {
                if *b {
                    b"1".to_vec()
                } else {
                    Vec::new()
                }
            }
            Value::Long(i) => i.to_string().into_bytes(),
            Value::Double(d) => {
                if d.fract() == 0.0 && d.is_finite() {
                    format!("{:.0}", d).into_bytes()
                } else {
                    format!("{}", d).into_bytes()
                }
            }
            Value::String(s) => s.to_vec(),
            Value::Array(_) => b"Array".to_vec(),
            Value::Object(_) => b"Object".to_vec(),
        }
    }

    /// True when the string parses fully as a number; drives `==` on
    /// string/number operand pairs.
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Long(_) | Value::Double(_) => true,
            Value::String(s) => std::str::from_utf8(s)
                .map(|t| {
                    let t = t.trim();
                    !t.is_empty() && (t.parse::<i64>().is_ok() || t.parse::<f64>().is_ok())
                })
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Long(a), Value::Double(b)) | (Value::Double(b), Value::Long(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_string_bytes()))
    }
}

/// Parse a numeric string prefix, returning `(long value, is_double)`.
fn parse_numeric_string(s: &[u8]) -> (i64, bool) {
    let Ok(text) = std::str::from_utf8(s) else {
        return (0, false);
    };
    let text = text.trim_start();
    if text.is_empty() {
        return (0, false);
    }
    if let Ok(i) = text.parse::<i64>() {
        return (i, false);
    }
    if let Ok(d) = text.parse::<f64>() {
        return (d as i64, true);
    }
    // Leading-numeric strings ("12abc") take their numeric prefix
    let mut end = 0;
    let bytes = text.as_bytes();
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    (text[..end].parse::<i64>().unwrap_or(0), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_long_parses_numeric_prefix() {
        assert_eq!(Value::string("42").to_long(), 42);
        assert_eq!(Value::string("  8 legs").to_long(), 8);
        assert_eq!(Value::string("abc").to_long(), 0);
        assert_eq!(Value::string("3.9").to_long(), 3);
    }

    #[test]
    fn truthiness_matches_php() {
        assert!(!Value::string("0").to_bool());
        assert!(!Value::string("").to_bool());
        assert!(Value::string("0.0").to_bool());
        assert!(!Value::empty_array().to_bool());
        assert!(Value::Double(0.5).to_bool());
    }

    #[test]
    fn array_keys_canonicalize() {
        assert_eq!(ArrayKey::from_value(&Value::string("5")), ArrayKey::Int(5));
        assert_eq!(
            ArrayKey::from_value(&Value::string("05")),
            ArrayKey::Str(Rc::new(b"05".to_vec()))
        );
        assert_eq!(ArrayKey::from_value(&Value::Bool(true)), ArrayKey::Int(1));
        assert_eq!(
            ArrayKey::from_value(&Value::Null),
            ArrayKey::Str(Rc::new(Vec::new()))
        );
    }

    #[test]
    fn push_tracks_next_free() {
        let mut arr = ArrayData::new();
        arr.insert(ArrayKey::Int(5), Value::Long(1));
        assert_eq!(arr.push(Value::Long(2)), ArrayKey::Int(6));
        assert_eq!(arr.push(Value::Long(3)), ArrayKey::Int(7));
    }

    #[test]
    fn array_copy_detaches_value_entries() {
        let mut arr = ArrayData::new();
        arr.push(Value::Long(1));
        let copy = arr.copy();
        arr.insert(ArrayKey::Int(0), Value::Long(99));
        assert_eq!(copy.get(&ArrayKey::Int(0)), Some(Value::Long(1)));
    }

    #[test]
    fn entry_cell_writes_through_but_copies_detach() {
        let mut arr = ArrayData::new();
        arr.push(Value::Long(1));
        let cell = arr.entry_cell(ArrayKey::Int(0));
        cell.set(Value::Long(2));
        assert_eq!(arr.get(&ArrayKey::Int(0)), Some(Value::Long(2)));

        let copy = arr.copy();
        cell.set(Value::Long(9));
        assert_eq!(copy.get(&ArrayKey::Int(0)), Some(Value::Long(2)));
    }

    #[test]
    fn array_copy_shares_ref_entries() {
        let mut arr = ArrayData::new();
        arr.push(Value::Long(1));
        let cell = arr.ref_entry(ArrayKey::Int(0));
        let copy = arr.copy();
        cell.set(Value::Long(7));
        assert_eq!(copy.get(&ArrayKey::Int(0)), Some(Value::Long(7)));
    }
}
