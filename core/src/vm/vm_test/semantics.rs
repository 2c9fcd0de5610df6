use super::*;

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Int(7));
    assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Int(9));
    assert_eq!(eval("2 ** 3 ** 2").unwrap(), Value::Int(512));
    assert_eq!(eval("7 % 4").unwrap(), Value::Int(3));
    assert_eq!(eval("1 + 2.5").unwrap(), Value::Float(3.5));
}

#[test]
fn string_concat() {
    assert_eq!(eval(r#""ab" + "cd""#).unwrap(), Value::str("abcd"));
}

#[test]
fn array_repeat() {
    let expected: Vec<Value> = [1, 2, 3, 1, 2, 3].iter().map(|&i| Value::Int(i)).collect();
    assert_eq!(eval("[1,2,3] * 2").unwrap(), Value::array(expected));
}

#[test]
fn negative_index() {
    assert_eq!(eval("[10,20,30][-1]").unwrap(), Value::Int(30));
    assert_eq!(eval("[10,20,30][0]").unwrap(), Value::Int(10));
    assert!(matches!(
        eval("[10,20,30][3]"),
        Err(VmError::IndexOutOfRange { .. })
    ));
}

#[test]
fn divide_by_zero_is_an_error() {
    assert_eq!(eval("(1/0)"), Err(VmError::DivideByZero));

    let mut ctx = Context::new();
    ctx.flags.ignore_div0 = true;
    assert_eq!(ctx.run("(1/0)").unwrap(), Value::Undefined);
}

#[test]
fn computed_value_reads_its_attrs() {
    // Read of `a` executes the computed body, which sees the attribute
    // written through `a.x`.
    assert_eq!(eval("a = &(x+1); a.x = 5; a").unwrap(), Value::Int(6));
}

#[test]
fn user_function_call() {
    assert_eq!(eval("f = func(a,b){ a+b }; f(2,3)").unwrap(), Value::Int(5));
}

#[test]
fn comparisons_yield_ints() {
    assert_eq!(eval("1 < 2").unwrap(), Value::Int(1));
    assert_eq!(eval("2 <= 1").unwrap(), Value::Int(0));
    assert_eq!(eval("2 == 2.0").unwrap(), Value::Int(1));
    assert_eq!(eval("2 != 2").unwrap(), Value::Int(0));
}

#[test]
fn comparing_unordered_kinds_fails() {
    assert!(matches!(
        eval(r#""a" < "b""#),
        Err(VmError::TypeMismatch(_))
    ));
    assert!(matches!(eval("null < 1"), Err(VmError::TypeMismatch(_))));
}

#[test]
fn array_equality_is_by_handle() {
    assert_eq!(eval("[1,2] == [1,2]").unwrap(), Value::Int(0));
    assert_eq!(eval("a = [1,2]; a == a").unwrap(), Value::Int(1));
}

#[test]
fn unary_signs() {
    assert_eq!(eval("-(-5)").unwrap(), Value::Int(5));
    assert_eq!(eval("+3.5").unwrap(), Value::Float(3.5));
    assert!(matches!(eval(r#"-"x""#), Err(VmError::TypeMismatch(_))));
}

#[test]
fn slices_end_to_end() {
    assert_eq!(
        eval("[10,20,30,40][1:3]").unwrap(),
        Value::array(vec![Value::Int(20), Value::Int(30)])
    );
    assert_eq!(eval(r#""abcdef"[1:3]"#).unwrap(), Value::str("bc"));
    assert_eq!(eval(r#""abcdef"[4:2]"#).unwrap(), Value::str(""));
    assert_eq!(eval(r#""abcdef"[-2:]"#).unwrap(), Value::str("ef"));
    assert_eq!(eval(r#""abcdef"[:99]"#).unwrap(), Value::str("abcdef"));
}

#[test]
fn slice_assignment_resizes() {
    assert_eq!(
        eval("a = [1,2,3,4]; a[1:3] = [9]; a").unwrap(),
        Value::array(vec![Value::Int(1), Value::Int(9), Value::Int(4)])
    );
    assert!(matches!(
        eval("a = [1,2]; a[0:1] = 5"),
        Err(VmError::TypeMismatch(_))
    ));
}

#[test]
fn element_assignment_is_shallow() {
    // The stored element is a handle clone; mutating the source array is
    // visible through the destination.
    assert_eq!(
        eval("b = [5]; a = [0]; a[0] = b; b[0] = 7; a[0][0]").unwrap(),
        Value::Int(7)
    );
}

#[test]
fn array_growth_cap() {
    assert_eq!(eval("([1]*256 + [1]*256)").unwrap().length(&mut Context::new()), Some(512));
    assert_eq!(eval("[1]*256 + [1]*257"), Err(VmError::ArrayTooLarge));
    assert_eq!(eval("[1]*513"), Err(VmError::ArrayTooLarge));
}

#[test]
fn method_calls() {
    assert_eq!(eval("[1,5,3].kh()").unwrap(), Value::Int(5));
    assert_eq!(eval("[1,5,3].kl()").unwrap(), Value::Int(1));
    assert_eq!(eval("[1,2.5].kh()").unwrap(), Value::Float(2.5));
    assert_eq!(eval("[1].unknown()").unwrap(), Value::Undefined);
}

#[test]
fn builtins_resolve_after_host() {
    assert_eq!(eval("ceil(1.2)").unwrap(), Value::Int(2));
    assert_eq!(eval("floor(PI)").unwrap(), Value::Int(3));
    assert_eq!(eval("abs(-4)").unwrap(), Value::Int(4));
    assert_eq!(eval("int(2.9)").unwrap(), Value::Int(2));
    assert_eq!(eval(r#"int("12")"#).unwrap(), Value::Int(12));
    assert_eq!(eval(r#"str(12) + "!""#).unwrap(), Value::str("12!"));
    assert_eq!(eval("typeOf([1])").unwrap(), Value::str("array"));

    // A host binding shadows the builtin of the same name.
    let (mut ctx, _) = ctx_with_host_vars();
    ctx.run("PI = 3").unwrap();
    assert_eq!(ctx.run("PI").unwrap(), Value::Int(3));
}

#[test]
fn unknown_names_are_undefined() {
    assert_eq!(eval("nosuchthing").unwrap(), Value::Undefined);
}

#[test]
fn assignment_yields_the_value() {
    assert_eq!(eval("a = 5").unwrap(), Value::Int(5));
    assert_eq!(eval("a = b = 2; a + b").unwrap(), Value::Int(4));
}

#[test]
fn rest_input_and_matched() {
    let mut ctx = Context::new();
    ctx.run("1+1 leftover tail").unwrap();
    assert_eq!(ctx.matched, "1+1");
    assert_eq!(ctx.rest_input, " leftover tail");
    assert_eq!(ctx.ret, Some(Value::Int(2)));

    let mut ctx = Context::new();
    ctx.run("2*3 @@@").unwrap();
    assert_eq!(ctx.matched, "2*3");
    assert_eq!(ctx.rest_input, " @@@");
}

#[test]
fn parse_errors_surface() {
    assert!(matches!(eval("1 +"), Err(VmError::Parse(_))));
    assert!(matches!(eval(""), Err(VmError::Parse(_))));
}

#[test]
fn op_budget_halts_runaway_rolls() {
    let mut ctx = Context::new();
    ctx.flags.dice_min_mode = true;
    assert_eq!(ctx.run("40000d6"), Err(VmError::OpBudgetExceeded));
    assert!(ctx.num_op_count > crate::vm::OP_BUDGET);
}

#[test]
fn stack_is_balanced_after_success() {
    let mut ctx = Context::new();
    ctx.run("a = 1; a + 2; [a, 2]; 9").unwrap();
    // One value per finished evaluation.
    assert_eq!(ctx.stack_top(), Some(&Value::Int(9)));
}

#[test]
fn errors_halt_immediately() {
    // The second statement never runs: the store callback would have seen
    // it.
    let (mut ctx, vars) = ctx_with_host_vars();
    assert_eq!(ctx.run("x = 1/0; y = 2"), Err(VmError::DivideByZero));
    assert!(vars.borrow().get("y").is_none());
}

#[test]
fn context_reuse_after_reset() {
    let mut ctx = Context::new();
    assert!(ctx.run("1/0").is_err());
    // `run` clears error/ret/top on entry.
    assert_eq!(ctx.run("1+1").unwrap(), Value::Int(2));
}
