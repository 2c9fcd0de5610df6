//! The dice-roll primitive.
//!
//! Each rolled die consumes one unit of the evaluation budget, which is
//! what bounds pathological rolls like `99999999d6`. `DiceMinMode` and
//! `DiceMaxMode` pin every die to its lowest/highest face.

use rand::Rng;

use crate::vm::{Context, RollFlags, VmError};


/// One die. Faces are 1..=sides.
pub fn roll_die(flags: &RollFlags, sides: i64) -> i64 {
    if flags.dice_min_mode {
        1
    } else if flags.dice_max_mode {
        sides
    } else {
        rand::thread_rng().gen_range(1..=sides)
    }
}

fn check_params(ctx: &mut Context, count: i64, sides: i64) -> bool {
    if sides < 1 {
        ctx.set_error(VmError::TypeMismatch(format!(
            "dice must have at least one face, got {sides}"
        )));
        return false;
    }
    if count < 0 {
        ctx.set_error(VmError::TypeMismatch(format!(
            "dice count cannot be negative, got {count}"
        )));
        return false;
    }
    true
}

/// `count` dice summed.
pub fn roll_sum(ctx: &mut Context, count: i64, sides: i64) -> Option<i64> {
    if !check_params(ctx, count, sides) {
        return None;
    }
    let mut sum = 0i64;
    for _ in 0..count {
        if !ctx.count_op() {
            return None;
        }
        sum = sum.wrapping_add(roll_die(&ctx.flags, sides));
    }
    Some(sum)
}

/// `count` dice, keeping the highest (or lowest) `keep` before summing.
/// The keep count clamps into `[0, count]`.
pub fn roll_keep(ctx: &mut Context, count: i64, sides: i64, keep: i64, high: bool) -> Option<i64> {
    if !check_params(ctx, count, sides) {
        return None;
    }
    let mut rolls = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        if !ctx.count_op() {
            return None;
        }
        rolls.push(roll_die(&ctx.flags, sides));
    }
    rolls.sort_unstable();
    let keep = keep.clamp(0, count) as usize;
    let kept = if high {
        &rolls[rolls.len() - keep..]
    } else {
        &rolls[..keep]
    };
    Some(kept.iter().fold(0i64, |acc, v| acc.wrapping_add(*v)))
}
