//! Comparisons (§4.3): always write a 0/1 `i32` result slot.

use crate::codestream::Outcome;
use crate::engine::Engine;
use crate::frame::Frame;
use crate::regcache;
use crate::value::{slot_from_i32, slot_to_f32, slot_to_f64, slot_to_i32, slot_to_i64};

macro_rules! cmp {
    ($name:ident, $to:ident, |$a:ident, $b:ident| $body:expr) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let a_off = engine.fetch_i32(frame);
            let b_off = engine.fetch_i32(frame);
            let dst_off = engine.fetch_i32(frame);
            let $a = $to(regcache::read_slot(&engine.stack, frame, frame.sp, a_off));
            let $b = $to(regcache::read_slot(&engine.stack, frame, frame.sp, b_off));
            let result = slot_from_i32($body as i32);
            regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, result);
            Outcome::Continue
        }
    };
}

macro_rules! eqz {
    ($name:ident, $to:ident) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let a_off = engine.fetch_i32(frame);
            let dst_off = engine.fetch_i32(frame);
            let a = $to(regcache::read_slot(&engine.stack, frame, frame.sp, a_off));
            let result = slot_from_i32((a == 0) as i32);
            regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, result);
            Outcome::Continue
        }
    };
}

eqz!(i32_eqz, slot_to_i32);
cmp!(i32_eq, slot_to_i32, |a, b| a == b);
cmp!(i32_ne, slot_to_i32, |a, b| a != b);
cmp!(i32_lt_s, slot_to_i32, |a, b| a < b);
cmp!(i32_lt_u, slot_to_i32, |a, b| (a as u32) < (b as u32));
cmp!(i32_gt_s, slot_to_i32, |a, b| a > b);
cmp!(i32_gt_u, slot_to_i32, |a, b| (a as u32) > (b as u32));
cmp!(i32_le_s, slot_to_i32, |a, b| a <= b);
cmp!(i32_le_u, slot_to_i32, |a, b| (a as u32) <= (b as u32));
cmp!(i32_ge_s, slot_to_i32, |a, b| a >= b);
cmp!(i32_ge_u, slot_to_i32, |a, b| (a as u32) >= (b as u32));

eqz!(i64_eqz, slot_to_i64);
cmp!(i64_eq, slot_to_i64, |a, b| a == b);
cmp!(i64_ne, slot_to_i64, |a, b| a != b);
cmp!(i64_lt_s, slot_to_i64, |a, b| a < b);
cmp!(i64_lt_u, slot_to_i64, |a, b| (a as u64) < (b as u64));
cmp!(i64_gt_s, slot_to_i64, |a, b| a > b);
cmp!(i64_gt_u, slot_to_i64, |a, b| (a as u64) > (b as u64));
cmp!(i64_le_s, slot_to_i64, |a, b| a <= b);
cmp!(i64_le_u, slot_to_i64, |a, b| (a as u64) <= (b as u64));
cmp!(i64_ge_s, slot_to_i64, |a, b| a >= b);
cmp!(i64_ge_u, slot_to_i64, |a, b| (a as u64) >= (b as u64));

// Float comparisons: any NaN operand makes every relation but `ne` false
// (§8), which IEEE-754 partial ordering on `f32`/`f64` already gives us.
cmp!(f32_eq, slot_to_f32, |a, b| a == b);
cmp!(f32_ne, slot_to_f32, |a, b| a != b);
cmp!(f32_lt, slot_to_f32, |a, b| a < b);
cmp!(f32_gt, slot_to_f32, |a, b| a > b);
cmp!(f32_le, slot_to_f32, |a, b| a <= b);
cmp!(f32_ge, slot_to_f32, |a, b| a >= b);

cmp!(f64_eq, slot_to_f64, |a, b| a == b);
cmp!(f64_ne, slot_to_f64, |a, b| a != b);
cmp!(f64_lt, slot_to_f64, |a, b| a < b);
cmp!(f64_gt, slot_to_f64, |a, b| a > b);
cmp!(f64_le, slot_to_f64, |a, b| a <= b);
cmp!(f64_ge, slot_to_f64, |a, b| a >= b);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::memory::Memory;
    use crate::module::Module;
    use crate::value::slot_from_f32;

    #[test]
    fn nan_compares_false_except_ne() {
        let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
        let mut frame = Frame::new(0, 0);
        engine.stack.set(0, 0, slot_from_f32(f32::NAN));
        engine.stack.set(0, 1, slot_from_f32(1.0));
        engine.module.code.i32(0).i32(1).i32(2);
        f32_lt(&mut engine, &mut frame);
        assert_eq!(slot_to_i32(engine.stack.get(0, 2)), 0);

        let mut frame = Frame::new(0, 0);
        f32_ne(&mut engine, &mut frame);
        assert_eq!(slot_to_i32(engine.stack.get(0, 2)), 1);
    }
}
