use super::*;
use crate::vm::{computed_execute, func_invoke, invoke_native, COMPUTED_OP_TAX, FUNCTION_OP_TAX};

#[test]
fn computed_execute_caches_bytecode() {
    let comp = Value::computed("1 + 2");
    let cd = comp.read_computed().unwrap().clone();
    assert!(!cd.is_compiled());

    let mut ctx = Context::new();
    assert_eq!(computed_execute(&mut ctx, &comp), Some(Value::Int(3)));
    assert!(cd.is_compiled());
    let first = cd.cached_code().unwrap();

    // The second run reuses the cached program: same allocation, no
    // recompile.
    assert_eq!(computed_execute(&mut ctx, &comp), Some(Value::Int(3)));
    let second = cd.cached_code().unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn function_bytecode_cached_across_calls() {
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("f = func(a){ a * 2 }").unwrap();
    assert_eq!(ctx.run("f(4)").unwrap(), Value::Int(8));
    assert_eq!(ctx.run("f(5)").unwrap(), Value::Int(10));
}

#[test]
fn computed_op_count_propagates() {
    let comp = Value::computed("1 + 2");
    let mut ctx = Context::new();
    ctx.num_op_count = 40;
    computed_execute(&mut ctx, &comp).unwrap();
    // Entry tax, one binary op inside, one op for the evaluation itself.
    assert_eq!(ctx.num_op_count, 40 + COMPUTED_OP_TAX + 2);
}

#[test]
fn function_op_count_propagates() {
    let f = Value::function("a + a", "dbl", vec!["a".to_string()]);
    let mut ctx = Context::new();
    let before = ctx.num_op_count;
    assert_eq!(
        func_invoke(&mut ctx, &f, vec![Value::Int(3)]),
        Some(Value::Int(6))
    );
    assert!(ctx.num_op_count >= before + FUNCTION_OP_TAX + 1);
}

#[test]
fn nested_evaluations_keep_raising_the_count() {
    // Each read of `a` pays the computed tax on top of the parent's count;
    // the counter is monotonic across runs of the same context.
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("a = &(1+1)").unwrap();
    let mut last = ctx.num_op_count;
    for _ in 0..10 {
        ctx.run("a").unwrap();
        assert!(ctx.num_op_count > last);
        last = ctx.num_op_count;
    }
}

#[test]
fn self_referential_computed_is_stopped() {
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("a = &(a)").unwrap();
    let err = ctx.run("a").unwrap_err();
    assert!(
        matches!(err, VmError::DepthExceeded | VmError::OpBudgetExceeded),
        "unexpected error: {err:?}"
    );
}

#[test]
fn arity_mismatch() {
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("f = func(a,b){ a+b }").unwrap();
    assert_eq!(
        ctx.run("f(1)"),
        Err(VmError::ArityMismatch {
            expected: 2,
            got: 1
        })
    );
    assert_eq!(
        ctx.run("f(1,2,3)"),
        Err(VmError::ArityMismatch {
            expected: 2,
            got: 3
        })
    );
}

#[test]
fn function_parse_error_surfaces_on_first_call() {
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("f = func(a){ a + }").unwrap();
    assert!(matches!(ctx.run("f(1)"), Err(VmError::Parse(_))));
}

#[test]
fn function_body_sees_only_its_params_and_host_vars() {
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("base = 10; f = func(a){ base + a }").unwrap();
    assert_eq!(ctx.run("f(5)").unwrap(), Value::Int(15));
}

#[test]
fn functions_calling_functions() {
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("dbl = func(a){ a*2 }; quad = func(a){ dbl(dbl(a)) }")
        .unwrap();
    assert_eq!(ctx.run("quad(3)").unwrap(), Value::Int(12));
}

#[test]
fn calling_a_non_function_fails() {
    assert!(matches!(eval("(3)(1)"), Err(VmError::TypeMismatch(_))));
}

#[test]
fn native_function_bypasses_interpreter() {
    fn double(_ctx: &mut Context, args: &[Value]) -> Option<Value> {
        args[0].read_int().map(|i| Value::Int(i * 2))
    }
    let f = Value::native_function("double", vec!["x".to_string()], double);

    let mut ctx = Context::new();
    assert_eq!(
        invoke_native(&mut ctx, &f, &[Value::Int(21)]),
        Some(Value::Int(42))
    );
    // Arity is checked before the host sees the call.
    assert_eq!(invoke_native(&mut ctx, &f, &[]), None);
    assert!(matches!(ctx.error, Some(VmError::ArityMismatch { .. })));
}

#[test]
fn native_nil_return_becomes_undefined() {
    fn noop(_ctx: &mut Context, _args: &[Value]) -> Option<Value> {
        None
    }
    let f = Value::native_function("noop", vec![], noop);
    let mut ctx = Context::new();
    assert_eq!(invoke_native(&mut ctx, &f, &[]), Some(Value::Undefined));
}

#[test]
fn native_function_called_from_script() {
    fn triple(_ctx: &mut Context, args: &[Value]) -> Option<Value> {
        args[0].read_int().map(|i| Value::Int(i * 3))
    }
    let (mut ctx, vars) = ctx_with_host_vars();
    vars.borrow_mut().insert(
        "triple".to_string(),
        Value::native_function("triple", vec!["x".to_string()], triple),
    );
    assert_eq!(ctx.run("triple(7)").unwrap(), Value::Int(21));
}

#[test]
fn raw_ref_skips_execution() {
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("a = &(1d6)").unwrap();
    let raw = ctx.run("&a").unwrap();
    assert!(matches!(raw, Value::Computed(_)));
    assert_eq!(ctx.run("typeOf(&a)").unwrap(), Value::str("computed"));
}

#[test]
fn computed_literal_in_function_body_keeps_its_cache() {
    // The computed literal inside the body is baked into the cached
    // bytecode, so repeated calls share one computed value.
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("f = func(){ c = &(2+2); c }").unwrap();
    assert_eq!(ctx.run("f()").unwrap(), Value::Int(4));
    assert_eq!(ctx.run("f()").unwrap(), Value::Int(4));
}
