//! Per-kind operator implementations.
//!
//! Every entry point mirrors the dispatch contract of the interpreter: a
//! `Some` result is pushed, a `None` with the context error set halts, and
//! a `None` with no error means "unrecognized operands" and is reported by
//! the caller as a type mismatch. Int overflow wraps; floats follow IEEE.

use std::rc::Rc;

use crate::op::BinOp;
use crate::val::{Value, ValueMap};
use crate::vm::{Context, VmError, MAX_ARRAY_LEN};

pub type BinOpFn = fn(&Value, &mut Context, &Value) -> Option<Value>;

/// Runtime operator table; `BinOp::index` / the `BinOp` opcode index here.
pub const BIN_OPERATORS: [BinOpFn; BinOp::COUNT] = [
    Value::op_add,
    Value::op_sub,
    Value::op_multiply,
    Value::op_divide,
    Value::op_modulus,
    Value::op_power,
    Value::op_comp_lt,
    Value::op_comp_le,
    Value::op_comp_eq,
    Value::op_comp_ne,
    Value::op_comp_ge,
    Value::op_comp_gt,
];

#[inline]
fn bool_value(b: bool) -> Value {
    Value::Int(b as i64)
}

impl Value {
    pub fn op_add(&self, ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_add(*b))),
            (Value::Int(a), Value::Float(b)) => Some(Value::Float(*a as f64 + b)),
            (Value::Float(a), Value::Int(b)) => Some(Value::Float(a + *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a + b)),
            (Value::Str(a), Value::Str(b)) => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Some(Value::Str(Rc::from(joined)))
            }
            (Value::Array(a), Value::Array(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                let length = a.list.len() + b.list.len();
                if length > MAX_ARRAY_LEN {
                    ctx.set_error(VmError::ArrayTooLarge);
                    return None;
                }
                let mut joined = Vec::with_capacity(length);
                joined.extend(a.list.iter().cloned());
                joined.extend(b.list.iter().cloned());
                Some(Value::array(joined))
            }
            _ => None,
        }
    }

    pub fn op_sub(&self, _ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_sub(*b))),
            (Value::Int(a), Value::Float(b)) => Some(Value::Float(*a as f64 - b)),
            (Value::Float(a), Value::Int(b)) => Some(Value::Float(a - *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a - b)),
            _ => None,
        }
    }

    pub fn op_multiply(&self, ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_mul(*b))),
            (Value::Int(a), Value::Float(b)) => Some(Value::Float(*a as f64 * b)),
            (Value::Float(a), Value::Int(b)) => Some(Value::Float(a * *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a * b)),
            (Value::Int(_), Value::Array(_)) => other.array_repeat(ctx, self),
            (Value::Array(_), _) => self.array_repeat(ctx, other),
            _ => None,
        }
    }

    pub fn op_divide(&self, ctx: &mut Context, other: &Value) -> Option<Value> {
        let divisor_is_zero = match other {
            Value::Int(b) => *b == 0,
            Value::Float(b) => *b == 0.0,
            _ => false,
        };
        if divisor_is_zero && matches!(self, Value::Int(_) | Value::Float(_)) {
            if ctx.flags.ignore_div0 {
                return Some(Value::Undefined);
            }
            ctx.set_error(VmError::DivideByZero);
            return None;
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_div(*b))),
            (Value::Int(a), Value::Float(b)) => Some(Value::Float(*a as f64 / b)),
            (Value::Float(a), Value::Int(b)) => Some(Value::Float(a / *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a / b)),
            _ => None,
        }
    }

    /// Defined on Int % Int only.
    pub fn op_modulus(&self, ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    if ctx.flags.ignore_div0 {
                        return Some(Value::Undefined);
                    }
                    ctx.set_error(VmError::DivideByZero);
                    return None;
                }
                Some(Value::Int(a.wrapping_rem(*b)))
            }
            _ => None,
        }
    }

    /// Exponentiation goes through f64; Int ** Int truncates back to Int.
    pub fn op_power(&self, _ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                Some(Value::Int((*a as f64).powf(*b as f64) as i64))
            }
            (Value::Int(a), Value::Float(b)) => Some(Value::Float((*a as f64).powf(*b))),
            (Value::Float(a), Value::Int(b)) => Some(Value::Float(a.powf(*b as f64))),
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a.powf(*b))),
            _ => None,
        }
    }

    pub fn op_comp_lt(&self, _ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(bool_value(a < b)),
            (Value::Int(a), Value::Float(b)) => Some(bool_value((*a as f64) < *b)),
            (Value::Float(a), Value::Int(b)) => Some(bool_value(*a < *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(bool_value(a < b)),
            _ => None,
        }
    }

    pub fn op_comp_le(&self, _ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(bool_value(a <= b)),
            (Value::Int(a), Value::Float(b)) => Some(bool_value(*a as f64 <= *b)),
            (Value::Float(a), Value::Int(b)) => Some(bool_value(*a <= *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(bool_value(a <= b)),
            _ => None,
        }
    }

    /// Equality: same-tag scalars compare payloads, same-tag containers
    /// compare handles, Int/Float mixes widen, everything else is false.
    pub fn op_comp_eq(&self, _ctx: &mut Context, other: &Value) -> Option<Value> {
        let eq = match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Computed(a), Value::Computed(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Int(a), Value::Float(b)) => *a as f64 == *b,
            (Value::Float(a), Value::Int(b)) => *a == *b as f64,
            _ => false,
        };
        Some(bool_value(eq))
    }

    pub fn op_comp_ne(&self, ctx: &mut Context, other: &Value) -> Option<Value> {
        let eq = self.op_comp_eq(ctx, other)?;
        Some(bool_value(!eq.as_bool()))
    }

    pub fn op_comp_ge(&self, _ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(bool_value(a >= b)),
            (Value::Int(a), Value::Float(b)) => Some(bool_value(*a as f64 >= *b)),
            (Value::Float(a), Value::Int(b)) => Some(bool_value(*a >= *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(bool_value(a >= b)),
            _ => None,
        }
    }

    pub fn op_comp_gt(&self, _ctx: &mut Context, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(bool_value(a > b)),
            (Value::Int(a), Value::Float(b)) => Some(bool_value(*a as f64 > *b)),
            (Value::Float(a), Value::Int(b)) => Some(bool_value(*a > *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(bool_value(a > b)),
            _ => None,
        }
    }

    pub fn op_positive(&self) -> Option<Value> {
        match self {
            Value::Int(i) => Some(Value::Int(*i)),
            Value::Float(f) => Some(Value::Float(*f)),
            _ => None,
        }
    }

    pub fn op_negation(&self) -> Option<Value> {
        match self {
            Value::Int(i) => Some(Value::Int(i.wrapping_neg())),
            Value::Float(f) => Some(Value::Float(-f)),
            _ => None,
        }
    }

    /// Attribute write; only computed values carry attributes. The stored
    /// value is a shallow clone, the map is created on first write.
    pub fn set_attr(&self, name: &str, val: &Value) -> Option<Value> {
        match self {
            Value::Computed(cd) => {
                let mut attrs = cd.attrs.borrow_mut();
                attrs
                    .get_or_insert_with(ValueMap::new)
                    .put(name, val.clone());
                Some(val.clone())
            }
            _ => None,
        }
    }

    /// Attribute read. Computed values read their own map; functions read
    /// the current scope's parameter bindings. Missing names are
    /// `Undefined`, unsupported receivers are `None`.
    pub fn get_attr(&self, ctx: &mut Context, name: &str) -> Option<Value> {
        match self {
            Value::Computed(cd) => {
                let attrs = cd.attrs.borrow();
                let ret = attrs.as_ref().and_then(|m| m.get(name).cloned());
                Some(ret.unwrap_or(Value::Undefined))
            }
            Value::Function(_) => {
                let ret = ctx.attrs.get(name).cloned();
                Some(ret.unwrap_or(Value::Undefined))
            }
            _ => None,
        }
    }

    /// Length of an array (elements) or string (bytes).
    pub fn length(&self, ctx: &mut Context) -> Option<i64> {
        match self {
            Value::Array(arr) => Some(arr.borrow().list.len() as i64),
            Value::Str(s) => Some(s.len() as i64),
            _ => {
                ctx.set_error(VmError::TypeMismatch(format!(
                    "{} has no length",
                    self.type_name()
                )));
                None
            }
        }
    }

    pub fn array_get_item(&self, ctx: &mut Context, index: i64) -> Option<Value> {
        match self {
            Value::Array(arr) => {
                let arr = arr.borrow();
                let index = get_real_index(ctx, index, arr.list.len() as i64)?;
                Some(arr.list[index as usize].clone())
            }
            _ => {
                ctx.set_error(VmError::TypeMismatch(format!(
                    "{} cannot be indexed",
                    self.type_name()
                )));
                None
            }
        }
    }

    pub fn array_set_item(&self, ctx: &mut Context, index: i64, val: &Value) -> bool {
        match self {
            Value::Array(arr) => {
                let mut arr = arr.borrow_mut();
                let len = arr.list.len() as i64;
                match get_real_index(ctx, index, len) {
                    Some(index) => {
                        arr.list[index as usize] = val.clone();
                        true
                    }
                    None => false,
                }
            }
            _ => {
                ctx.set_error(VmError::TypeMismatch(format!(
                    "{} cannot be indexed",
                    self.type_name()
                )));
                false
            }
        }
    }

    /// `self[a:b]` with both endpoints resolved; see `get_slice_ex` for the
    /// `Undefined`-endpoint defaults.
    pub fn get_slice(&self, ctx: &mut Context, a: i64, b: i64) -> Option<Value> {
        let length = self.length(ctx)?;
        let mut a = clamp_real_index(a, length);
        let b = clamp_real_index(b, length);
        if a > b {
            a = b;
        }
        match self {
            Value::Str(s) => {
                let bytes = &s.as_bytes()[a as usize..b as usize];
                Some(Value::Str(Rc::from(String::from_utf8_lossy(bytes).as_ref())))
            }
            Value::Array(arr) => {
                let arr = arr.borrow();
                Some(Value::array(arr.list[a as usize..b as usize].to_vec()))
            }
            _ => {
                ctx.set_error(VmError::TypeMismatch(format!(
                    "{} cannot be sliced",
                    self.type_name()
                )));
                None
            }
        }
    }

    /// Slice read with `Undefined` endpoints defaulting to the full range.
    pub fn get_slice_ex(&self, ctx: &mut Context, a: &Value, b: &Value) -> Option<Value> {
        let length = self.length(ctx)?;
        let a = match a {
            Value::Undefined => 0,
            _ => match a.read_int() {
                Some(v) => v,
                None => {
                    ctx.set_error(VmError::TypeMismatch(
                        "slice start must be an integer".to_string(),
                    ));
                    return None;
                }
            },
        };
        let b = match b {
            Value::Undefined => length,
            _ => match b.read_int() {
                Some(v) => v,
                None => {
                    ctx.set_error(VmError::TypeMismatch(
                        "slice end must be an integer".to_string(),
                    ));
                    return None;
                }
            },
        };
        self.get_slice(ctx, a, b)
    }

    /// Replaces `self[a:b]` with the elements of `val` (which must be an
    /// array), growing or shrinking the target in place.
    pub fn set_slice(&self, ctx: &mut Context, a: i64, b: i64, val: &Value) -> bool {
        let arr = match self {
            Value::Array(arr) => arr,
            _ => {
                ctx.set_error(VmError::TypeMismatch(format!(
                    "{} cannot be slice-assigned",
                    self.type_name()
                )));
                return false;
            }
        };
        let replacement = match val {
            Value::Array(other) => other.borrow().list.clone(),
            _ => {
                ctx.set_error(VmError::TypeMismatch(
                    "slice assignment requires an array".to_string(),
                ));
                return false;
            }
        };
        let mut arr = arr.borrow_mut();
        let length = arr.list.len() as i64;
        let mut a = clamp_real_index(a, length);
        let b = clamp_real_index(b, length);
        if a > b {
            a = b;
        }
        arr.list.splice(a as usize..b as usize, replacement);
        true
    }

    pub fn set_slice_ex(&self, ctx: &mut Context, a: &Value, b: &Value, val: &Value) -> bool {
        let length = match self {
            Value::Array(arr) => arr.borrow().list.len() as i64,
            _ => {
                ctx.set_error(VmError::TypeMismatch(format!(
                    "{} cannot be slice-assigned",
                    self.type_name()
                )));
                return false;
            }
        };
        let a = match a {
            Value::Undefined => 0,
            _ => match a.read_int() {
                Some(v) => v,
                None => {
                    ctx.set_error(VmError::TypeMismatch(
                        "slice start must be an integer".to_string(),
                    ));
                    return false;
                }
            },
        };
        let b = match b {
            Value::Undefined => length,
            _ => match b.read_int() {
                Some(v) => v,
                None => {
                    ctx.set_error(VmError::TypeMismatch(
                        "slice end must be an integer".to_string(),
                    ));
                    return false;
                }
            },
        };
        self.set_slice(ctx, a, b, val)
    }

    /// `array * n`: n copies of the array, each element cloned. Negative
    /// counts yield an empty array.
    pub fn array_repeat(&self, ctx: &mut Context, times: &Value) -> Option<Value> {
        let times = times.read_int()?;
        let arr = self.read_array()?;
        let arr = arr.borrow();
        let length = (arr.list.len() as i64).saturating_mul(times.max(0));
        if length > MAX_ARRAY_LEN as i64 {
            ctx.set_error(VmError::ArrayTooLarge);
            return None;
        }
        let mut out = Vec::with_capacity(length as usize);
        for i in 0..length {
            out.push(arr.list[i as usize % arr.list.len()].clone());
        }
        Some(Value::array(out))
    }
}

/// Wrap-once index resolution: a negative index has the length added, then
/// anything outside `[0, len)` is out of range.
fn get_real_index(ctx: &mut Context, index: i64, length: i64) -> Option<i64> {
    let real = if index < 0 { length + index } else { index };
    if real < 0 || real >= length {
        ctx.set_error(VmError::IndexOutOfRange {
            index,
            len: length,
        });
        return None;
    }
    Some(real)
}

/// Slice-endpoint resolution: negative indices wrap once, then the result
/// clamps into `[0, len]`.
fn clamp_real_index(index: i64, length: i64) -> i64 {
    let real = if index < 0 { length + index } else { index };
    real.clamp(0, length)
}
