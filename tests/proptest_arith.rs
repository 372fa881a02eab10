//! Property-based conformance sweeps for the arithmetic operators (§4.3,
//! §8) against Rust's own wrapping/IEEE-754 semantics as the oracle.

use proptest::prelude::*;
use wex_core::codestream::HandlerFn;
use wex_core::config::EngineConfig;
use wex_core::memory::Memory;
use wex_core::module::Module;
use wex_core::ops::arith::{i32_add, i32_mul, i32_sub};
use wex_core::value::{slot_from_i32, slot_to_i32};
use wex_core::{Engine, Frame};

fn run_binop(op: HandlerFn, a: i32, b: i32) -> i32 {
    let mut engine = Engine::new(Module::default(), Memory::new(1, None), EngineConfig::default());
    let mut frame = Frame::new(0, 0);
    engine.stack.set(0, 0, slot_from_i32(a));
    engine.stack.set(0, 1, slot_from_i32(b));
    engine.module.code.i32(0).i32(1).i32(2);
    op(&mut engine, &mut frame);
    slot_to_i32(engine.stack.get(0, 2))
}

proptest! {
    #[test]
    fn i32_add_matches_wrapping_add(a: i32, b: i32) {
        prop_assert_eq!(run_binop(i32_add, a, b), a.wrapping_add(b));
    }

    #[test]
    fn i32_sub_matches_wrapping_sub(a: i32, b: i32) {
        prop_assert_eq!(run_binop(i32_sub, a, b), a.wrapping_sub(b));
    }

    #[test]
    fn i32_mul_matches_wrapping_mul(a: i32, b: i32) {
        prop_assert_eq!(run_binop(i32_mul, a, b), a.wrapping_mul(b));
    }
}
