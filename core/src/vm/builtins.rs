//! Predeclared names: math constants and a handful of native functions.
//!
//! The table is immutable after initialization. Values hold `Rc`, so the
//! "process-wide" table is materialized once per thread. Name loads consult
//! it only after the host callback has declined.

use once_cell::unsync::OnceCell;

use crate::val::{NativeFn, Value, ValueMap};
use crate::vm::{Context, VmError};

thread_local! {
    static BUILTINS: OnceCell<ValueMap> = const { OnceCell::new() };
}

pub fn builtin_value(name: &str) -> Option<Value> {
    BUILTINS.with(|cell| cell.get_or_init(build_table).get(name).cloned())
}

fn build_table() -> ValueMap {
    let mut table = ValueMap::new();
    table.put("PI", Value::Float(std::f64::consts::PI));
    table.put("E", Value::Float(std::f64::consts::E));

    let one_arg = |name: &str, func: NativeFn| {
        Value::native_function(name, vec!["x".to_string()], func)
    };
    table.put("ceil", one_arg("ceil", native_ceil));
    table.put("floor", one_arg("floor", native_floor));
    table.put("round", one_arg("round", native_round));
    table.put("abs", one_arg("abs", native_abs));
    table.put("int", one_arg("int", native_int));
    table.put("float", one_arg("float", native_float));
    table.put("str", one_arg("str", native_str));
    table.put("typeOf", one_arg("typeOf", native_type_of));
    table
}

fn want_number(ctx: &mut Context, name: &str, v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => {
            ctx.set_error(VmError::TypeMismatch(format!(
                "{name} expects a number, got {}",
                v.type_name()
            )));
            None
        }
    }
}

fn native_ceil(ctx: &mut Context, args: &[Value]) -> Option<Value> {
    if let Value::Int(i) = &args[0] {
        return Some(Value::Int(*i));
    }
    want_number(ctx, "ceil", &args[0]).map(|f| Value::Int(f.ceil() as i64))
}

fn native_floor(ctx: &mut Context, args: &[Value]) -> Option<Value> {
    if let Value::Int(i) = &args[0] {
        return Some(Value::Int(*i));
    }
    want_number(ctx, "floor", &args[0]).map(|f| Value::Int(f.floor() as i64))
}

fn native_round(ctx: &mut Context, args: &[Value]) -> Option<Value> {
    if let Value::Int(i) = &args[0] {
        return Some(Value::Int(*i));
    }
    want_number(ctx, "round", &args[0]).map(|f| Value::Int(f.round() as i64))
}

fn native_abs(ctx: &mut Context, args: &[Value]) -> Option<Value> {
    match &args[0] {
        Value::Int(i) => Some(Value::Int(i.wrapping_abs())),
        Value::Float(f) => Some(Value::Float(f.abs())),
        other => {
            ctx.set_error(VmError::TypeMismatch(format!(
                "abs expects a number, got {}",
                other.type_name()
            )));
            None
        }
    }
}

fn native_int(ctx: &mut Context, args: &[Value]) -> Option<Value> {
    match &args[0] {
        Value::Int(i) => Some(Value::Int(*i)),
        Value::Float(f) => Some(Value::Int(*f as i64)),
        Value::Str(s) => match s.trim().parse::<i64>() {
            Ok(i) => Some(Value::Int(i)),
            Err(_) => {
                ctx.set_error(VmError::TypeMismatch(format!(
                    "cannot convert {:?} to an integer",
                    s.as_ref()
                )));
                None
            }
        },
        other => {
            ctx.set_error(VmError::TypeMismatch(format!(
                "cannot convert {} to an integer",
                other.type_name()
            )));
            None
        }
    }
}

fn native_float(ctx: &mut Context, args: &[Value]) -> Option<Value> {
    match &args[0] {
        Value::Int(i) => Some(Value::Float(*i as f64)),
        Value::Float(f) => Some(Value::Float(*f)),
        Value::Str(s) => match s.trim().parse::<f64>() {
            Ok(f) => Some(Value::Float(f)),
            Err(_) => {
                ctx.set_error(VmError::TypeMismatch(format!(
                    "cannot convert {:?} to a float",
                    s.as_ref()
                )));
                None
            }
        },
        other => {
            ctx.set_error(VmError::TypeMismatch(format!(
                "cannot convert {} to a float",
                other.type_name()
            )));
            None
        }
    }
}

fn native_str(_ctx: &mut Context, args: &[Value]) -> Option<Value> {
    Some(Value::str(args[0].to_string()))
}

fn native_type_of(_ctx: &mut Context, args: &[Value]) -> Option<Value> {
    Some(Value::str(args[0].type_name()))
}
