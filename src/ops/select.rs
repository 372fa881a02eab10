//! `select` (§4.3): picks one of two raw slots by a boolean condition.
//! WebAssembly's value-typed `select` is erased to this at the slot level
//! since every value already occupies one full-width slot (ref-typed
//! `select` is out of scope, §1).

use crate::codestream::Outcome;
use crate::engine::Engine;
use crate::frame::Frame;
use crate::regcache;
use crate::value::slot_to_i32;

pub fn select(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let cond_off = engine.fetch_i32(frame);
    let a_off = engine.fetch_i32(frame);
    let b_off = engine.fetch_i32(frame);
    let dst_off = engine.fetch_i32(frame);
    let cond = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, cond_off));
    let chosen_off = if cond != 0 { a_off } else { b_off };
    let value = regcache::read_slot(&engine.stack, frame, frame.sp, chosen_off);
    regcache::write_slot(&mut engine.stack, frame, frame.sp, dst_off, value);
    Outcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::memory::Memory;
    use crate::module::Module;
    use crate::value::slot_from_i32;

    #[test]
    fn nonzero_condition_picks_first_operand() {
        let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
        let mut frame = Frame::new(0, 0);
        engine.stack.set(0, 0, slot_from_i32(1));
        engine.stack.set(0, 1, slot_from_i32(10));
        engine.stack.set(0, 2, slot_from_i32(20));
        engine.module.code.i32(0).i32(1).i32(2).i32(3);
        select(&mut engine, &mut frame);
        assert_eq!(slot_to_i32(engine.stack.get(0, 3)), 10);
    }
}
