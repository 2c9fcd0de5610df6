pub(super) use std::cell::RefCell;
pub(super) use std::collections::HashMap;
pub(super) use std::rc::Rc;

pub(super) use crate::val::Value;
pub(super) use crate::vm::{Context, VmError};

/// Evaluate one expression in a fresh context.
pub(super) fn eval(src: &str) -> Result<Value, VmError> {
    Context::new().run(src)
}

/// A context whose variables live in a host-side map, installed through
/// the two name callbacks. Sub-evaluations inherit the callbacks, so
/// variables are visible across computed/function bodies.
pub(super) fn ctx_with_host_vars() -> (Context, Rc<RefCell<HashMap<String, Value>>>) {
    let vars: Rc<RefCell<HashMap<String, Value>>> = Rc::new(RefCell::new(HashMap::new()));
    let mut ctx = Context::new();

    let store_vars = vars.clone();
    ctx.value_store_name_func = Some(Rc::new(RefCell::new(move |name: &str, value: Value| {
        store_vars.borrow_mut().insert(name.to_string(), value);
    })));

    let load_vars = vars.clone();
    ctx.value_load_name_func = Some(Rc::new(RefCell::new(move |name: &str| {
        load_vars.borrow().get(name).cloned()
    })));

    (ctx, vars)
}

mod flags;
mod functions;
mod semantics;
