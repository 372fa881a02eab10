//! `global.get`/`global.set` (§4.3). Global *declaration* (mutability,
//! initializer) belongs to module loading and is out of scope (§1); the
//! execution core only reads and writes the raw slot the module carries.

use crate::codestream::Outcome;
use crate::engine::Engine;
use crate::frame::Frame;
use crate::regcache;

pub fn global_get(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let global_idx = engine.fetch_global_idx(frame);
    let dst_off = engine.fetch_i32(frame);
    let value = engine.module.globals[global_idx as usize];
    regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, value);
    Outcome::Continue
}

pub fn global_set(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let global_idx = engine.fetch_global_idx(frame);
    let src_off = engine.fetch_i32(frame);
    let value = regcache::read_slot(&engine.stack, frame, frame.sp, src_off);
    engine.module.globals[global_idx as usize] = value;
    Outcome::Continue
}
