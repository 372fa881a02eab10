//! The local-register cache optimization (§4.5): an optional fast path that
//! shadows up to 4 integer and 7 floating locals in `Registers` instead of
//! round-tripping them through the slot stack on every access.
//!
//! Disabled (the `regcache` feature off, or `EngineConfig::regcache` false
//! at run time), every slot access goes straight through `Stack`; callers
//! never need to branch on this, since `slotenc::is_encoded` already tells
//! them whether an offset names a register or a plain slot.

use crate::frame::Frame;
use crate::regs::{MAX_FP_REGS, MAX_INT_REGS};
use crate::slotenc::{self, RegFile};
use crate::stack::Stack;
use crate::value::{RawSlot, ValType};

/// Reads a slot, transparently following an encoded register offset back to
/// its cached value (§4.5).
#[inline]
pub fn read_slot(stack: &Stack, frame: &Frame, sp: usize, offset: i32) -> RawSlot {
    if slotenc::is_encoded(offset) {
        let enc = slotenc::decode(offset);
        match enc.file {
            RegFile::Int => frame.regs.get_int(enc.reg),
            RegFile::Float => frame.regs.get_fp(enc.reg).to_bits(),
        }
    } else {
        stack.get(sp, offset)
    }
}

/// Writes a slot. When the offset names a register, updates both the
/// register *and* its backing slot — the coherence invariant every write
/// must uphold (§4.5).
#[inline]
pub fn write_slot(stack: &mut Stack, frame: &mut Frame, sp: usize, offset: i32, value: RawSlot) {
    if slotenc::is_encoded(offset) {
        let enc = slotenc::decode(offset);
        match enc.file {
            RegFile::Int => frame.regs.set_int(enc.reg, value),
            RegFile::Float => frame.regs.set_fp(enc.reg, f64::from_bits(value)),
        }
        stack.set(sp, enc.backing_slot as i32, value);
    } else {
        stack.set(sp, offset, value);
    }
}

/// Primes the register cache from a function's designated locals (§3,
/// §4.5): called wherever the cache was just cleared (`Entry`, after a
/// `Call`/`CallIndirect` returns, a `Loop` header) so a cached register
/// actually holds its local's current value instead of reading back as the
/// zero `Registers::clear` left behind. Integer-typed locals fill `int`
/// registers in order, floating-typed locals fill `fp` registers in order;
/// each stops once its file's capacity is used, exactly like
/// `Registers::set_int`/`set_fp` silently drop an out-of-range index.
pub fn reload_locals(stack: &Stack, frame: &mut Frame, sp: usize, cached_locals: &[(u32, ValType)]) {
    let mut int_reg = 0u8;
    let mut fp_reg = 0u8;
    for &(slot, ty) in cached_locals {
        match ty {
            ValType::I32 | ValType::I64 => {
                if (int_reg as usize) < MAX_INT_REGS {
                    let value = stack.get(sp, slot as i32);
                    frame.regs.set_int(int_reg, value);
                    int_reg += 1;
                }
            }
            ValType::F32 | ValType::F64 => {
                if (fp_reg as usize) < MAX_FP_REGS {
                    let value = stack.get(sp, slot as i32);
                    frame.regs.set_fp(fp_reg, f64::from_bits(value));
                    fp_reg += 1;
                }
            }
        }
    }
}

/// Derives the `(file, reg, backing_slot)` triples `assert_coherent` checks
/// from a function's `cached_locals`, using the exact same file/register
/// assignment `reload_locals` primed them with.
#[cfg(feature = "debug-regcache")]
pub fn backing_slots(cached_locals: &[(u32, ValType)]) -> Vec<(RegFile, u8, u32)> {
    let mut out = Vec::new();
    let mut int_reg = 0u8;
    let mut fp_reg = 0u8;
    for &(slot, ty) in cached_locals {
        match ty {
            ValType::I32 | ValType::I64 => {
                if (int_reg as usize) < MAX_INT_REGS {
                    out.push((RegFile::Int, int_reg, slot));
                    int_reg += 1;
                }
            }
            ValType::F32 | ValType::F64 => {
                if (fp_reg as usize) < MAX_FP_REGS {
                    out.push((RegFile::Float, fp_reg, slot));
                    fp_reg += 1;
                }
            }
        }
    }
    out
}

/// Debug-only coherence check: every cached register must agree with its
/// backing slot. Wired in behind `debug-regcache` at call/loop boundaries.
#[cfg(feature = "debug-regcache")]
pub fn assert_coherent(stack: &Stack, frame: &Frame, sp: usize, backing_slots: &[(RegFile, u8, u32)]) {
    for &(file, reg, backing_slot) in backing_slots {
        let cached = match file {
            RegFile::Int => frame.regs.get_int(reg),
            RegFile::Float => frame.regs.get_fp(reg).to_bits(),
        };
        let backing = stack.get(sp, backing_slot as i32);
        assert_eq!(cached, backing, "register {reg:?}/{file:?} diverged from backing slot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_offsets_pass_through_to_the_stack() {
        let mut stack = Stack::new(8);
        let mut frame = Frame::new(0, 0);
        write_slot(&mut stack, &mut frame, 0, 2, 42);
        assert_eq!(read_slot(&stack, &frame, 0, 2), 42);
    }

    #[test]
    fn encoded_offsets_update_register_and_backing_slot() {
        let mut stack = Stack::new(8);
        let mut frame = Frame::new(0, 0);
        let offset = slotenc::encode(RegFile::Int, 1, 3);
        write_slot(&mut stack, &mut frame, 0, offset, 99);
        assert_eq!(frame.regs.get_int(1), 99);
        assert_eq!(stack.get(0, 3), 99);
        assert_eq!(read_slot(&stack, &frame, 0, offset), 99);
    }
}
