//! `memory.size`/`grow`/`copy`/`fill` (§4.3, §5). `grow` is the one
//! operation in the whole operator library that can relocate `Memory`'s
//! backing buffer; every handler that runs after it re-borrows `Memory`
//! fresh rather than caching a pointer (see `memory.rs`'s module doc).

use crate::codestream::Outcome;
use crate::engine::Engine;
use crate::frame::Frame;
use crate::regcache;
use crate::value::{slot_from_i32, slot_to_i32};

pub fn memory_size(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let dst_off = engine.fetch_i32(frame);
    let pages = engine.memory.pages() as i32;
    regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, slot_from_i32(pages));
    Outcome::Continue
}

pub fn memory_grow(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let delta_off = engine.fetch_i32(frame);
    let dst_off = engine.fetch_i32(frame);
    let delta = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, delta_off));
    let old_pages = engine.memory.grow(delta);
    regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, slot_from_i32(old_pages));
    Outcome::Continue
}

pub fn memory_copy(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let dst_off = engine.fetch_i32(frame);
    let src_off = engine.fetch_i32(frame);
    let len_off = engine.fetch_i32(frame);
    let dst = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, dst_off)) as u32 as u64;
    let src = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, src_off)) as u32 as u64;
    let len = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, len_off)) as u32 as u64;
    match engine.memory.copy_within(dst, src, len) {
        Ok(()) => Outcome::Continue,
        Err(t) => Outcome::Trap(t),
    }
}

pub fn memory_fill(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let dst_off = engine.fetch_i32(frame);
    let val_off = engine.fetch_i32(frame);
    let len_off = engine.fetch_i32(frame);
    let dst = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, dst_off)) as u32 as u64;
    let value = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, val_off)) as u32;
    let len = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, len_off)) as u32 as u64;
    match engine.memory.fill(dst, value, len) {
        Ok(()) => Outcome::Continue,
        Err(t) => Outcome::Trap(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::memory::Memory;
    use crate::module::Module;

    #[test]
    fn grow_returns_old_page_count() {
        let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
        let mut frame = Frame::new(0, 0);
        engine.stack.set(0, 0, slot_from_i32(1));
        engine.module.code.i32(0).i32(1);
        memory_grow(&mut engine, &mut frame);
        assert_eq!(slot_to_i32(engine.stack.get(0, 1)), 1);
        assert_eq!(engine.memory.pages(), 2);
    }
}
