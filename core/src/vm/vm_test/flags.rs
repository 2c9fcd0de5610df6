use super::*;

#[test]
fn dice_min_and_max_modes() {
    let mut ctx = Context::new();
    ctx.flags.dice_min_mode = true;
    assert_eq!(ctx.run("4d6").unwrap(), Value::Int(4));

    let mut ctx = Context::new();
    ctx.flags.dice_max_mode = true;
    assert_eq!(ctx.run("4d6").unwrap(), Value::Int(24));
    assert_eq!(ctx.run("4d6kh3").unwrap(), Value::Int(18));
    assert_eq!(ctx.run("2d10kl1").unwrap(), Value::Int(10));
}

#[test]
fn dice_modes_reach_sub_evaluations() {
    let mut ctx = Context::new();
    ctx.flags.dice_max_mode = true;
    assert_eq!(ctx.run("a = &(2d6); a + 1").unwrap(), Value::Int(13));
}

#[test]
fn default_dice_side_num() {
    let mut ctx = Context::new();
    ctx.flags.dice_max_mode = true;
    ctx.flags.default_dice_side_num = 6;
    assert_eq!(ctx.run("3d").unwrap(), Value::Int(18));

    // Unset: bare rolls are percentile.
    let mut ctx = Context::new();
    ctx.flags.dice_max_mode = true;
    assert_eq!(ctx.run("2d").unwrap(), Value::Int(200));
}

#[test]
fn default_dice_side_expr_wins() {
    let mut ctx = Context::new();
    ctx.flags.dice_max_mode = true;
    ctx.flags.default_dice_side_num = 6;
    ctx.flags.default_dice_side_expr = "4 + 4".to_string();
    assert_eq!(ctx.run("3d").unwrap(), Value::Int(24));

    let mut ctx = Context::new();
    ctx.flags.dice_max_mode = true;
    ctx.flags.default_dice_side_expr = r#""eight""#.to_string();
    assert!(matches!(ctx.run("3d"), Err(VmError::TypeMismatch(_))));
}

#[test]
fn disable_load_varname() {
    let mut ctx = Context::new();
    ctx.flags.disable_load_varname = true;
    assert_eq!(ctx.run("attack").unwrap(), Value::str("attack"));

    // Known names still resolve normally.
    assert_eq!(ctx.run("x = 3; x").unwrap(), Value::Int(3));
}

#[test]
fn ignore_div0_in_nested_evaluation() {
    let mut ctx = Context::new();
    ctx.flags.ignore_div0 = true;
    assert_eq!(ctx.run("a = &(1/0); a").unwrap(), Value::Undefined);
}
