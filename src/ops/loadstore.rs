//! Bounds-checked, little-endian loads and stores (§4.3, §6). Each handler
//! reads a dynamic base address from a slot, a static `offset` immediate
//! from the code stream (the `memarg.offset` a compiler folded in), and
//! either writes a loaded value to a destination slot or reads a value
//! slot to store.

use crate::codestream::Outcome;
use crate::engine::Engine;
use crate::frame::Frame;
use crate::regcache;
use crate::value::{slot_from_f32, slot_from_f64, slot_from_i32, slot_from_i64, slot_to_f32, slot_to_f64, slot_to_i32, slot_to_i64};

macro_rules! load_op {
    ($name:ident, $mem_fn:ident, $from:ident) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let base_off = engine.fetch_i32(frame);
            let offset = engine.fetch_u32(frame);
            let dst_off = engine.fetch_i32(frame);
            let base = regcache::read_slot(&engine.stack, frame, frame.sp, base_off) as u32 as u64;
            match engine.memory.$mem_fn(base, offset) {
                Ok(v) => {
                    regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, $from(v));
                    Outcome::Continue
                }
                Err(t) => Outcome::Trap(t),
            }
        }
    };
}

macro_rules! store_op {
    ($name:ident, $mem_fn:ident, $to:ident) => {
        pub fn $name(engine: &mut Engine, frame: &mut Frame) -> Outcome {
            let base_off = engine.fetch_i32(frame);
            let offset = engine.fetch_u32(frame);
            let value_off = engine.fetch_i32(frame);
            let base = regcache::read_slot(&engine.stack, frame, frame.sp, base_off) as u32 as u64;
            let value = $to(regcache::read_slot(&engine.stack, frame, frame.sp, value_off));
            match engine.memory.$mem_fn(base, offset, value) {
                Ok(()) => Outcome::Continue,
                Err(t) => Outcome::Trap(t),
            }
        }
    };
}

load_op!(i32_load, load_i32, slot_from_i32);
load_op!(i32_load8_s, load_i8_s, slot_from_i32);
load_op!(i32_load8_u, load_i8_u, slot_from_i32);
load_op!(i32_load16_s, load_i16_s, slot_from_i32);
load_op!(i32_load16_u, load_i16_u, slot_from_i32);
load_op!(i64_load, load_i64, slot_from_i64);
load_op!(i64_load8_s, load_i8_s64, slot_from_i64);
load_op!(i64_load8_u, load_i8_u64, slot_from_i64);
load_op!(i64_load16_s, load_i16_s64, slot_from_i64);
load_op!(i64_load16_u, load_i16_u64, slot_from_i64);
load_op!(i64_load32_s, load_i32_s64, slot_from_i64);
load_op!(i64_load32_u, load_i32_u64, slot_from_i64);
load_op!(f32_load, load_f32, slot_from_f32);
load_op!(f64_load, load_f64, slot_from_f64);

store_op!(i32_store, store_i32, slot_to_i32);
store_op!(i32_store8, store_i8, slot_to_i32);
store_op!(i32_store16, store_i16, slot_to_i32);
store_op!(i64_store, store_i64, slot_to_i64);
store_op!(i64_store8, store_i8, slot_to_i32);
store_op!(i64_store16, store_i16, slot_to_i32);
store_op!(i64_store32, store_i32_narrow, slot_to_i64);
store_op!(f32_store, store_f32, slot_to_f32);
store_op!(f64_store, store_f64, slot_to_f64);
