//! The tagged runtime value and its per-kind operations.
//!
//! Scalars (`Int`, `Float`, `Str`, `Undefined`, `Null`) are held by value;
//! arrays, computed values and functions are reference-counted handles, so
//! `Clone` is always a shallow copy: two clones of an array observe each
//! other's writes. Hosts that want isolation must rebuild the container.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::vm::{ByteCode, Context};

mod map;
mod ops;

pub mod methods;


pub use map::ValueMap;
pub use ops::{BinOpFn, BIN_OPERATORS};

/// Host-provided native function. Errors are reported by setting the
/// context error slot and returning `None`; a `None` return with no error
/// becomes `Undefined`.
pub type NativeFn = fn(&mut Context, &[Value]) -> Option<Value>;

#[derive(Debug)]
pub struct ArrayData {
    pub list: Vec<Value>,
}

/// A lazily evaluated expression with optional attached attributes.
///
/// The attribute map is created on the first attribute write. Compiled
/// bytecode is cached after the first evaluation and reused by every later
/// one; the source text is immutable once the cache is populated.
pub struct ComputedData {
    pub expr: String,
    pub attrs: RefCell<Option<ValueMap>>,
    code: OnceCell<Rc<[ByteCode]>>,
}

pub struct FunctionData {
    pub expr: String,
    pub name: String,
    pub params: Vec<String>,
    code: OnceCell<Rc<[ByteCode]>>,
}

pub struct NativeFunctionData {
    pub name: String,
    pub params: Vec<String>,
    pub func: NativeFn,
}

#[derive(Clone, Default)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    #[default]
    Undefined,
    Null,
    Computed(Rc<ComputedData>),
    Array(Rc<RefCell<ArrayData>>),
    Function(Rc<FunctionData>),
    NativeFunction(Rc<NativeFunctionData>),
}

impl Value {
    pub fn str<S: AsRef<str>>(s: S) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(ArrayData { list: values })))
    }

    pub fn computed<S: Into<String>>(expr: S) -> Self {
        Value::Computed(Rc::new(ComputedData {
            expr: expr.into(),
            attrs: RefCell::new(None),
            code: OnceCell::new(),
        }))
    }

    pub fn function<S: Into<String>>(expr: S, name: S, params: Vec<String>) -> Self {
        Value::Function(Rc::new(FunctionData {
            expr: expr.into(),
            name: name.into(),
            params,
            code: OnceCell::new(),
        }))
    }

    pub fn native_function<S: Into<String>>(name: S, params: Vec<String>, func: NativeFn) -> Self {
        Value::NativeFunction(Rc::new(NativeFunctionData {
            name: name.into(),
            params,
            func,
        }))
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int64",
            Value::Float(_) => "float64",
            Value::Str(_) => "str",
            Value::Undefined => "undefined",
            Value::Null => "none",
            Value::Computed(_) => "computed",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
            Value::NativeFunction(_) => "nfunction",
        }
    }

    /// Truthiness: nonzero ints and nonempty strings are true, everything
    /// else (including floats and arrays) is false.
    #[inline]
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            _ => false,
        }
    }

    #[inline]
    pub fn read_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn read_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn read_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn read_array(&self) -> Option<&Rc<RefCell<ArrayData>>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn read_computed(&self) -> Option<&Rc<ComputedData>> {
        match self {
            Value::Computed(c) => Some(c),
            _ => None,
        }
    }

}

impl ComputedData {
    #[inline]
    pub(crate) fn cached_code(&self) -> Option<Rc<[ByteCode]>> {
        self.code.get().cloned()
    }

    #[inline]
    pub(crate) fn cache_code(&self, code: Rc<[ByteCode]>) {
        let _ = self.code.set(code);
    }

    /// Whether the first evaluation has already compiled this expression.
    pub fn is_compiled(&self) -> bool {
        self.code.get().is_some()
    }
}

impl FunctionData {
    #[inline]
    pub(crate) fn cached_code(&self) -> Option<Rc<[ByteCode]>> {
        self.code.get().cloned()
    }

    #[inline]
    pub(crate) fn cache_code(&self, code: Rc<[ByteCode]>) {
        let _ = self.code.set(code);
    }

    pub fn is_compiled(&self) -> bool {
        self.code.get().is_some()
    }
}

// Structural equality for host code and tests. Language-level `==` goes
// through `op_comp_eq`, which compares container handles instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || a.borrow().list == b.borrow().list
            }
            (Value::Computed(a), Value::Computed(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Canonical text form: decimal ints, shortest-round-trip floats,
/// `[...]` placeholders for nested arrays, `&(expr)` for computed values.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*i))
            }
            Value::Float(x) => {
                let mut buf = ryu::Buffer::new();
                f.write_str(buf.format(*x))
            }
            Value::Str(s) => f.write_str(s.as_ref()),
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Array(arr) => {
                let arr = arr.borrow();
                f.write_str("[")?;
                for (index, item) in arr.list.iter().enumerate() {
                    if matches!(item, Value::Array(_)) {
                        f.write_str("[...]")?;
                    } else {
                        write!(f, "{item}")?;
                    }
                    if index != arr.list.len() - 1 {
                        f.write_str(", ")?;
                    }
                }
                f.write_str("]")
            }
            Value::Computed(cd) => write!(f, "&({})", cd.expr),
            Value::Function(fd) => write!(f, "function {}", fd.name),
            Value::NativeFunction(nd) => write!(f, "nfunction {}", nd.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({:?})", s.as_ref()),
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Computed(cd) => write!(f, "Computed(&({}))", cd.expr),
            Value::Array(_) => write!(f, "Array({})", self.to_string()),
            Value::Function(fd) => write!(f, "Function({})", fd.name),
            Value::NativeFunction(nd) => write!(f, "NativeFunction({})", nd.name),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s.as_ref()),
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Array(arr) => {
                let arr = arr.borrow();
                let mut seq = serializer.serialize_seq(Some(arr.list.len()))?;
                for item in arr.list.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Computed(_) | Value::Function(_) | Value::NativeFunction(_) => {
                serializer.serialize_str(&self.to_string())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::array(v)
    }
}
