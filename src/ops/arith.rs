//! Integer and floating arithmetic (§4.3). Operands and destination are all
//! addressed by the same slot-offset immediates `regcache::read_slot`/
//! `write_slot` understands (plain slot or cached register, §4.5) — one
//! handler body covers every operand placement a compiler might choose,
//! which is where this reimplementation folds wasm3's `_rs`/`_sr`/`_ss`
//! handler families into a single function per operation.

use crate::codestream::Outcome;
use crate::engine::Engine;
use crate::frame::Frame;
use crate::regcache;
use crate::trap::Trap;
use crate::value::{slot_from_f32, slot_from_f64, slot_from_i32, slot_from_i64, slot_to_f32, slot_to_f64, slot_to_i32, slot_to_i64};

macro_rules! int_binop {
    ($name:ident, $to:ident, $from:ident, |$a:ident, $b:ident| $body:expr) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let a_off = engine.fetch_i32(frame);
            let b_off = engine.fetch_i32(frame);
            let dst_off = engine.fetch_i32(frame);
            let $a = $to(regcache::read_slot(&engine.stack, frame, frame.sp, a_off));
            let $b = $to(regcache::read_slot(&engine.stack, frame, frame.sp, b_off));
            let result = $from($body);
            regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, result);
            Outcome::Continue
        }
    };
}

macro_rules! int_binop_trap {
    ($name:ident, $to:ident, $from:ident, |$a:ident, $b:ident| $body:expr) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let a_off = engine.fetch_i32(frame);
            let b_off = engine.fetch_i32(frame);
            let dst_off = engine.fetch_i32(frame);
            let $a = $to(regcache::read_slot(&engine.stack, frame, frame.sp, a_off));
            let $b = $to(regcache::read_slot(&engine.stack, frame, frame.sp, b_off));
            match $body {
                Ok(r) => {
                    let result = $from(r);
                    regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, result);
                    Outcome::Continue
                }
                Err(trap) => Outcome::Trap(trap),
            }
        }
    };
}

macro_rules! int_unop {
    ($name:ident, $to:ident, $from:ident, |$a:ident| $body:expr) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let a_off = engine.fetch_i32(frame);
            let dst_off = engine.fetch_i32(frame);
            let $a = $to(regcache::read_slot(&engine.stack, frame, frame.sp, a_off));
            let result = $from($body);
            regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, result);
            Outcome::Continue
        }
    };
}

macro_rules! float_binop {
    ($name:ident, $to:ident, $from:ident, |$a:ident, $b:ident| $body:expr) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let a_off = engine.fetch_i32(frame);
            let b_off = engine.fetch_i32(frame);
            let dst_off = engine.fetch_i32(frame);
            let $a = $to(regcache::read_slot(&engine.stack, frame, frame.sp, a_off));
            let $b = $to(regcache::read_slot(&engine.stack, frame, frame.sp, b_off));
            let result = $from($body);
            regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, result);
            Outcome::Continue
        }
    };
}

macro_rules! float_unop {
    ($name:ident, $to:ident, $from:ident, |$a:ident| $body:expr) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let a_off = engine.fetch_i32(frame);
            let dst_off = engine.fetch_i32(frame);
            let $a = $to(regcache::read_slot(&engine.stack, frame, frame.sp, a_off));
            let result = $from($body);
            regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, result);
            Outcome::Continue
        }
    };
}

// --- i32 --------------------------------------------------------------
int_binop!(i32_add, slot_to_i32, slot_from_i32, |a, b| a.wrapping_add(b));
int_binop!(i32_sub, slot_to_i32, slot_from_i32, |a, b| a.wrapping_sub(b));
int_binop!(i32_mul, slot_to_i32, slot_from_i32, |a, b| a.wrapping_mul(b));
int_binop!(i32_and, slot_to_i32, slot_from_i32, |a, b| a & b);
int_binop!(i32_or, slot_to_i32, slot_from_i32, |a, b| a | b);
int_binop!(i32_xor, slot_to_i32, slot_from_i32, |a, b| a ^ b);
int_binop!(i32_shl, slot_to_i32, slot_from_i32, |a, b| a.wrapping_shl(b as u32 & 31));
int_binop!(i32_shr_s, slot_to_i32, slot_from_i32, |a, b| a.wrapping_shr(b as u32 & 31));
int_binop!(i32_shr_u, slot_to_i32, slot_from_i32, |a, b| {
    ((a as u32).wrapping_shr(b as u32 & 31)) as i32
});
int_binop!(i32_rotl, slot_to_i32, slot_from_i32, |a, b| {
    (a as u32).rotate_left(b as u32 & 31) as i32
});
int_binop!(i32_rotr, slot_to_i32, slot_from_i32, |a, b| {
    (a as u32).rotate_right(b as u32 & 31) as i32
});
int_binop_trap!(i32_div_s, slot_to_i32, slot_from_i32, |a, b| {
    if b == 0 {
        Err(Trap::DivideByZero)
    } else if a == i32::MIN && b == -1 {
        Err(Trap::IntegerOverflow)
    } else {
        Ok(a.wrapping_div(b))
    }
});
int_binop_trap!(i32_div_u, slot_to_i32, slot_from_i32, |a, b| {
    if b == 0 {
        Err(Trap::DivideByZero)
    } else {
        Ok(((a as u32) / (b as u32)) as i32)
    }
});
int_binop_trap!(i32_rem_s, slot_to_i32, slot_from_i32, |a, b| {
    if b == 0 {
        Err(Trap::DivideByZero)
    } else if a == i32::MIN && b == -1 {
        Ok(0)
    } else {
        Ok(a.wrapping_rem(b))
    }
});
int_binop_trap!(i32_rem_u, slot_to_i32, slot_from_i32, |a, b| {
    if b == 0 {
        Err(Trap::DivideByZero)
    } else {
        Ok(((a as u32) % (b as u32)) as i32)
    }
});
int_unop!(i32_clz, slot_to_i32, slot_from_i32, |a| (a as u32).leading_zeros() as i32);
int_unop!(i32_ctz, slot_to_i32, slot_from_i32, |a| (a as u32).trailing_zeros() as i32);
int_unop!(i32_popcnt, slot_to_i32, slot_from_i32, |a| (a as u32).count_ones() as i32);

// --- i64 --------------------------------------------------------------
int_binop!(i64_add, slot_to_i64, slot_from_i64, |a, b| a.wrapping_add(b));
int_binop!(i64_sub, slot_to_i64, slot_from_i64, |a, b| a.wrapping_sub(b));
int_binop!(i64_mul, slot_to_i64, slot_from_i64, |a, b| a.wrapping_mul(b));
int_binop!(i64_and, slot_to_i64, slot_from_i64, |a, b| a & b);
int_binop!(i64_or, slot_to_i64, slot_from_i64, |a, b| a | b);
int_binop!(i64_xor, slot_to_i64, slot_from_i64, |a, b| a ^ b);
int_binop!(i64_shl, slot_to_i64, slot_from_i64, |a, b| a.wrapping_shl(b as u32 & 63));
int_binop!(i64_shr_s, slot_to_i64, slot_from_i64, |a, b| a.wrapping_shr(b as u32 & 63));
int_binop!(i64_shr_u, slot_to_i64, slot_from_i64, |a, b| {
    ((a as u64).wrapping_shr(b as u32 & 63)) as i64
});
int_binop!(i64_rotl, slot_to_i64, slot_from_i64, |a, b| {
    (a as u64).rotate_left(b as u32 & 63) as i64
});
int_binop!(i64_rotr, slot_to_i64, slot_from_i64, |a, b| {
    (a as u64).rotate_right(b as u32 & 63) as i64
});
int_binop_trap!(i64_div_s, slot_to_i64, slot_from_i64, |a, b| {
    if b == 0 {
        Err(Trap::DivideByZero)
    } else if a == i64::MIN && b == -1 {
        Err(Trap::IntegerOverflow)
    } else {
        Ok(a.wrapping_div(b))
    }
});
int_binop_trap!(i64_div_u, slot_to_i64, slot_from_i64, |a, b| {
    if b == 0 {
        Err(Trap::DivideByZero)
    } else {
        Ok(((a as u64) / (b as u64)) as i64)
    }
});
int_binop_trap!(i64_rem_s, slot_to_i64, slot_from_i64, |a, b| {
    if b == 0 {
        Err(Trap::DivideByZero)
    } else if a == i64::MIN && b == -1 {
        Ok(0)
    } else {
        Ok(a.wrapping_rem(b))
    }
});
int_binop_trap!(i64_rem_u, slot_to_i64, slot_from_i64, |a, b| {
    if b == 0 {
        Err(Trap::DivideByZero)
    } else {
        Ok(((a as u64) % (b as u64)) as i64)
    }
});
int_unop!(i64_clz, slot_to_i64, slot_from_i64, |a| (a as u64).leading_zeros() as i64);
int_unop!(i64_ctz, slot_to_i64, slot_from_i64, |a| (a as u64).trailing_zeros() as i64);
int_unop!(i64_popcnt, slot_to_i64, slot_from_i64, |a| (a as u64).count_ones() as i64);

// --- f32 ----------------------------------------------------------------
float_binop!(f32_add, slot_to_f32, slot_from_f32, |a, b| a + b);
float_binop!(f32_sub, slot_to_f32, slot_from_f32, |a, b| a - b);
float_binop!(f32_mul, slot_to_f32, slot_from_f32, |a, b| a * b);
float_binop!(f32_div, slot_to_f32, slot_from_f32, |a, b| a / b);
// WebAssembly min/max propagate NaN and distinguish -0.0 from +0.0 (§8).
float_binop!(f32_min, slot_to_f32, slot_from_f32, |a, b| {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_negative() || b.is_sign_negative() {
            -0.0
        } else {
            0.0
        }
    } else {
        a.min(b)
    }
});
float_binop!(f32_max, slot_to_f32, slot_from_f32, |a, b| {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_positive() || b.is_sign_positive() {
            0.0
        } else {
            -0.0
        }
    } else {
        a.max(b)
    }
});
float_binop!(f32_copysign, slot_to_f32, slot_from_f32, |a, b| a.copysign(b));
float_unop!(f32_abs, slot_to_f32, slot_from_f32, |a| a.abs());
float_unop!(f32_neg, slot_to_f32, slot_from_f32, |a| -a);
float_unop!(f32_sqrt, slot_to_f32, slot_from_f32, |a| a.sqrt());
float_unop!(f32_ceil, slot_to_f32, slot_from_f32, |a| a.ceil());
float_unop!(f32_floor, slot_to_f32, slot_from_f32, |a| a.floor());
float_unop!(f32_trunc, slot_to_f32, slot_from_f32, |a| a.trunc());
float_unop!(f32_nearest, slot_to_f32, slot_from_f32, |a| round_ties_even_f32(a));

// --- f64 ----------------------------------------------------------------
float_binop!(f64_add, slot_to_f64, slot_from_f64, |a, b| a + b);
float_binop!(f64_sub, slot_to_f64, slot_from_f64, |a, b| a - b);
float_binop!(f64_mul, slot_to_f64, slot_from_f64, |a, b| a * b);
float_binop!(f64_div, slot_to_f64, slot_from_f64, |a, b| a / b);
float_binop!(f64_min, slot_to_f64, slot_from_f64, |a, b| {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_negative() || b.is_sign_negative() {
            -0.0
        } else {
            0.0
        }
    } else {
        a.min(b)
    }
});
float_binop!(f64_max, slot_to_f64, slot_from_f64, |a, b| {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_positive() || b.is_sign_positive() {
            0.0
        } else {
            -0.0
        }
    } else {
        a.max(b)
    }
});
float_binop!(f64_copysign, slot_to_f64, slot_from_f64, |a, b| a.copysign(b));
float_unop!(f64_abs, slot_to_f64, slot_from_f64, |a| a.abs());
float_unop!(f64_neg, slot_to_f64, slot_from_f64, |a| -a);
float_unop!(f64_sqrt, slot_to_f64, slot_from_f64, |a| a.sqrt());
float_unop!(f64_ceil, slot_to_f64, slot_from_f64, |a| a.ceil());
float_unop!(f64_floor, slot_to_f64, slot_from_f64, |a| a.floor());
float_unop!(f64_trunc, slot_to_f64, slot_from_f64, |a| a.trunc());
float_unop!(f64_nearest, slot_to_f64, slot_from_f64, |a| round_ties_even_f64(a));

/// WebAssembly `nearest` rounds half-to-even, unlike `f32::round` (half away
/// from zero).
fn round_ties_even_f32(a: f32) -> f32 {
    let r = a.round();
    if (a - a.trunc()).abs() == 0.5 && r as i64 % 2 != 0 {
        r - r.signum()
    } else {
        r
    }
}

fn round_ties_even_f64(a: f64) -> f64 {
    let r = a.round();
    if (a - a.trunc()).abs() == 0.5 && r as i64 % 2 != 0 {
        r - r.signum()
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::memory::Memory;
    use crate::module::Module;

    fn run_binop(op: crate::codestream::HandlerFn, a: i32, b: i32) -> i32 {
        let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
        let mut frame = Frame::new(0, 0);
        engine.stack.set(0, 0, slot_from_i32(a));
        engine.stack.set(0, 1, slot_from_i32(b));
        engine.module.code.i32(0).i32(1).i32(2);
        match op(&mut engine, &mut frame) {
            Outcome::Continue => slot_to_i32(engine.stack.get(0, 2)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn add_wraps_on_overflow() {
        assert_eq!(run_binop(i32_add, i32::MAX, 1), i32::MIN);
    }

    #[test]
    fn div_s_traps_with_overflow_on_min_int_by_minus_one() {
        let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
        let mut frame = Frame::new(0, 0);
        engine.stack.set(0, 0, slot_from_i32(i32::MIN));
        engine.stack.set(0, 1, slot_from_i32(-1));
        engine.module.code.i32(0).i32(1).i32(2);
        assert!(matches!(i32_div_s(&mut engine, &mut frame), Outcome::Trap(Trap::IntegerOverflow)));
    }

    #[test]
    fn div_s_traps_with_divide_by_zero_on_zero_divisor() {
        let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
        let mut frame = Frame::new(0, 0);
        engine.stack.set(0, 0, slot_from_i32(1));
        engine.stack.set(0, 1, slot_from_i32(0));
        engine.module.code.i32(0).i32(1).i32(2);
        assert!(matches!(i32_div_s(&mut engine, &mut frame), Outcome::Trap(Trap::DivideByZero)));
    }

    #[test]
    fn min_returns_nan_when_either_operand_is_nan() {
        let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
        let mut frame = Frame::new(0, 0);
        engine.stack.set(0, 0, slot_from_f32(f32::NAN));
        engine.stack.set(0, 1, slot_from_f32(1.0));
        engine.module.code.i32(0).i32(1).i32(2);
        match f32_min(&mut engine, &mut frame) {
            Outcome::Continue => assert!(slot_to_f32(engine.stack.get(0, 2)).is_nan()),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn min_distinguishes_negative_zero() {
        let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
        let mut frame = Frame::new(0, 0);
        engine.stack.set(0, 0, slot_from_f32(0.0));
        engine.stack.set(0, 1, slot_from_f32(-0.0));
        engine.module.code.i32(0).i32(1).i32(2);
        match f32_min(&mut engine, &mut frame) {
            Outcome::Continue => assert!(slot_to_f32(engine.stack.get(0, 2)).is_sign_negative()),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
