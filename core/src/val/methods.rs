//! Method dispatch for `value.name(args)` calls.
//!
//! A process-wide registry keyed by type name, preloaded with the array
//! dice helpers `kh`/`kl`. Hosts may register additional methods; unknown
//! names resolve to `Undefined` rather than failing.

use std::collections::HashMap;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::val::Value;
use crate::vm::Context;

/// Method implementations are plain `fn` pointers so the registry can be
/// shared across threads even though values themselves cannot.
pub type NativeMethodFn = fn(&mut Context, &Value, &[Value]) -> Option<Value>;

static METHOD_REGISTRY: Lazy<DashMap<String, HashMap<String, NativeMethodFn>>> = Lazy::new(|| {
    let registry = DashMap::new();
    let mut array_methods: HashMap<String, NativeMethodFn> = HashMap::new();
    array_methods.insert("kh".to_string(), array_keep_high as NativeMethodFn);
    array_methods.insert("kl".to_string(), array_keep_low as NativeMethodFn);
    registry.insert("array".to_string(), array_methods);
    registry
});

/// Register a method for a type name (see `Value::type_name`).
pub fn register_method(type_name: &str, method: &str, func: NativeMethodFn) {
    METHOD_REGISTRY
        .entry(type_name.to_string())
        .or_default()
        .insert(method.to_string(), func);
}

fn find_method(receiver: &Value, method: &str) -> Option<NativeMethodFn> {
    METHOD_REGISTRY
        .get(receiver.type_name())
        .and_then(|methods| methods.get(method).copied())
}

impl Value {
    /// Invoke a method by name. Unknown receiver/method pairs yield
    /// `Undefined`; `None` means the method itself set an error.
    pub fn call_method(&self, ctx: &mut Context, name: &str, args: &[Value]) -> Option<Value> {
        match find_method(self, name) {
            Some(func) => func(ctx, self, args),
            None => Some(Value::Undefined),
        }
    }
}

/// Max over the numeric elements, as Float only when a Float was seen.
/// Non-numeric elements are skipped; an all-skipped array folds to Int 0.
fn array_keep_high(_ctx: &mut Context, receiver: &Value, _args: &[Value]) -> Option<Value> {
    Some(array_keep(receiver, true))
}

/// Min over the numeric elements, symmetric with `kh`.
fn array_keep_low(_ctx: &mut Context, receiver: &Value, _args: &[Value]) -> Option<Value> {
    Some(array_keep(receiver, false))
}

fn array_keep(receiver: &Value, high: bool) -> Value {
    let arr = match receiver.read_array() {
        Some(arr) => arr.borrow(),
        None => return Value::Undefined,
    };

    let mut best = 0.0f64;
    let mut is_float = false;
    let mut is_first = true;

    for item in arr.list.iter() {
        let val = match item {
            Value::Int(i) => *i as f64,
            Value::Float(f) => {
                is_float = true;
                *f
            }
            _ => continue,
        };
        if is_first {
            is_first = false;
            best = val;
        } else if (high && val > best) || (!high && val < best) {
            best = val;
        }
    }

    if is_float {
        Value::Float(best)
    } else {
        Value::Int(best as i64)
    }
}
