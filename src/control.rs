//! The control engine (§4.4): function entry/exit, calls, loops, branches.
//!
//! Everything here is either a flat jump (`frame.pc = target`, handled by
//! the trampoline driver in `engine.rs` without native recursion) or a
//! genuine nested call (`Call`/`CallIndirect`/`CallRawFunction`/`Entry`'s
//! caller), which recurses through `Engine::run` exactly as deep as the
//! WebAssembly call stack itself does.

use crate::codestream::{CodeCell, Outcome};
use crate::engine::Engine;
use crate::frame::Frame;
use crate::regcache;
use crate::trap::Trap;
use crate::value::slot_to_i32;

#[cfg(feature = "backtrace")]
use crate::backtrace::BacktraceFrame;

/// Function entry (§4.4): checks the frame fits the stack, zeroes locals,
/// copies the constant pool, and clears the register cache before the body
/// runs.
pub fn entry(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let func_idx = engine.fetch_func_idx(frame);
    let desc = engine.module.functions[func_idx as usize].clone();

    if let Err(t) = engine.stack.check_overflow(frame.sp, desc.total_slots()) {
        return Outcome::Trap(t);
    }
    engine
        .stack
        .zero_locals(frame.sp, desc.local_base(), desc.local_slots);
    engine
        .stack
        .copy_constants(frame.sp, desc.const_base(), &desc.constants);
    frame.regs.clear();
    regcache::reload_locals(&engine.stack, frame, frame.sp, &desc.cached_locals);
    #[cfg(feature = "debug-regcache")]
    if engine.config.debug_regcache {
        let backing = regcache::backing_slots(&desc.cached_locals);
        regcache::assert_coherent(&engine.stack, frame, frame.sp, &backing);
    }

    #[cfg(feature = "backtrace")]
    if engine.config.backtrace {
        engine.backtrace.push(BacktraceFrame {
            func_idx,
            code_addr: desc.code_addr,
        });
    }

    Outcome::Continue
}

/// Shared machinery for `Call`/`CallIndirect`: recurse into the callee's
/// code at a fresh frame based at `callee_sp`, then invalidate the caller's
/// register cache (§4.5: no register survives a call) before reloading it
/// from the caller's own descriptor (§4.4 "reload the register cache from
/// the caller's descriptor") so locals the caller still has cached survive
/// a call that didn't touch them.
fn do_call(engine: &mut Engine, frame: &mut Frame, func_idx: u32, callee_sp: usize, caller_func_idx: u32) -> Outcome {
    if engine.recursion_depth >= engine.config.max_recursion_depth {
        return Outcome::Trap(Trap::CallStackExhausted);
    }
    let code_addr = engine.module.functions[func_idx as usize].code_addr;
    engine.recursion_depth += 1;
    let result = engine.run(Frame::new(code_addr, callee_sp));
    engine.recursion_depth -= 1;
    #[cfg(feature = "backtrace")]
    if engine.config.backtrace {
        engine.backtrace.pop();
    }
    match result {
        Ok(_) => {
            frame.regs.clear();
            let cached_locals = &engine.module.functions[caller_func_idx as usize].cached_locals;
            regcache::reload_locals(&engine.stack, frame, frame.sp, cached_locals);
            #[cfg(feature = "debug-regcache")]
            if engine.config.debug_regcache {
                let backing = regcache::backing_slots(cached_locals);
                regcache::assert_coherent(&engine.stack, frame, frame.sp, &backing);
            }
            Outcome::Continue
        }
        Err(t) => Outcome::Trap(t),
    }
}

/// A statically resolved call (§4.4): the callee is known at compile time,
/// so only the frame base needs to come from an immediate. `caller_func_idx`
/// is a post-call immediate (§4.4) naming the descriptor the register cache
/// should reload from once the callee returns.
pub fn call(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let func_idx = engine.fetch_func_idx(frame);
    let callee_sp_off = engine.fetch_i32(frame);
    let caller_func_idx = engine.fetch_func_idx(frame);
    let callee_sp = (frame.sp as isize + callee_sp_off as isize) as usize;
    do_call(engine, frame, func_idx, callee_sp, caller_func_idx)
}

/// Dynamically resolved call through `table` (§4.4): checked in order —
/// undefined element, uninitialized element, then type mismatch — all
/// *before* the callee's frame is ever entered, so a failed check has no
/// observable side effect.
pub fn call_indirect(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let type_idx = engine.fetch_type_idx(frame);
    let elem_off = engine.fetch_i32(frame);
    let callee_sp_off = engine.fetch_i32(frame);
    let caller_func_idx = engine.fetch_func_idx(frame);

    let elem_index = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, elem_off));
    let elem_index = elem_index as u32 as usize;

    let func_idx = match engine.module.table.get(elem_index) {
        None => return Outcome::Trap(Trap::UndefinedElement),
        Some(None) => return Outcome::Trap(Trap::UninitializedElement),
        Some(Some(func_idx)) => *func_idx,
    };
    if engine.module.functions[func_idx as usize].type_idx != type_idx {
        return Outcome::Trap(Trap::IndirectCallTypeMismatch);
    }

    let callee_sp = (frame.sp as isize + callee_sp_off as isize) as usize;
    do_call(engine, frame, func_idx, callee_sp, caller_func_idx)
}

/// The host bridge (§4.4, §5): bounces out to a registered Rust closure,
/// saving and restoring `stack_base` so a host call that recursively
/// invokes an exported function starts its own frame at the right base.
pub fn call_raw_function(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let host_idx = engine.fetch_func_idx(frame);
    let arg_base_off = engine.fetch_i32(frame);
    let arg_count = engine.fetch_u32(frame);
    let result_base_off = engine.fetch_i32(frame);

    let arg_start = (frame.sp as isize + arg_base_off as isize) as usize;
    let args = engine.stack.frame(arg_start, arg_count as usize).to_vec();

    let saved_base = engine.stack_base;
    engine.stack_base = frame.sp;

    let mut f = std::mem::replace(
        &mut engine.host_fns[host_idx as usize],
        Box::new(|_, _| Err(Trap::Host("reentrant CallRawFunction"))),
    );
    let outcome = f(engine, &args);
    engine.host_fns[host_idx as usize] = f;
    engine.stack_base = saved_base;

    match outcome {
        Ok(results) => {
            let result_start = (frame.sp as isize + result_base_off as isize) as usize;
            for (i, v) in results.into_iter().enumerate() {
                engine.stack.set(result_start, i as i32, v);
            }
            frame.regs.clear();
            Outcome::Continue
        }
        Err(t) => Outcome::Trap(t),
    }
}

/// A loop header (§4.4): clears the register cache (nothing can be proven
/// live across a backedge), then reloads it from the enclosing function's
/// designated locals (§4.5) — a loop-carried local must read back as
/// itself on every iteration, not as whatever `Registers::clear` leaves.
/// Falls through into the body; iterating the loop is just `ContinueLoop`
/// resetting `frame.pc`, handled by `Engine::run`, not recursion.
pub fn r#loop(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let func_idx = engine.fetch_func_idx(frame);
    frame.regs.clear();
    let cached_locals = &engine.module.functions[func_idx as usize].cached_locals;
    regcache::reload_locals(&engine.stack, frame, frame.sp, cached_locals);
    #[cfg(feature = "debug-regcache")]
    if engine.config.debug_regcache {
        let backing = regcache::backing_slots(cached_locals);
        regcache::assert_coherent(&engine.stack, frame, frame.sp, &backing);
    }
    Outcome::Continue
}

pub fn continue_loop(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let target = engine.fetch_addr(frame);
    Outcome::LoopBack(target)
}

pub fn continue_loop_if(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let cond_off = engine.fetch_i32(frame);
    let target = engine.fetch_addr(frame);
    let cond = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, cond_off));
    if cond != 0 {
        Outcome::LoopBack(target)
    } else {
        Outcome::Continue
    }
}

pub fn branch(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let target = engine.fetch_addr(frame);
    frame.pc = target;
    Outcome::Continue
}

pub fn branch_if(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let cond_off = engine.fetch_i32(frame);
    let target = engine.fetch_addr(frame);
    let cond = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, cond_off));
    if cond != 0 {
        frame.pc = target;
    }
    Outcome::Continue
}

/// `if`/`else` (§4.4): a single forward branch to the `else` target (which
/// may equal the matching `end`'s address when there's no `else` clause).
pub fn r#if(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let cond_off = engine.fetch_i32(frame);
    let else_addr = engine.fetch_addr(frame);
    let cond = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, cond_off));
    if cond == 0 {
        frame.pc = else_addr;
    }
    Outcome::Continue
}

/// `br_table` (§4.4): out-of-range *and* exactly-at-count indices both
/// clamp to the default target (§6).
pub fn branch_table(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let index_off = engine.fetch_i32(frame);
    let count = engine.fetch_u32(frame);
    let index = slot_to_i32(regcache::read_slot(&engine.stack, frame, frame.sp, index_off)) as u32;

    let mut chosen = None;
    for i in 0..count {
        let addr = engine.fetch_addr(frame);
        if index == i {
            chosen = Some(addr);
        }
    }
    let default_addr = engine.fetch_addr(frame);
    frame.pc = chosen.unwrap_or(default_addr);
    Outcome::Continue
}

pub fn r#return(_engine: &mut Engine, _frame: &mut Frame) -> Outcome {
    Outcome::Return
}

/// Function-body `end` (§4.4): in this code-stream shape a block that
/// doesn't end the function falls through as a plain `Continue` chain, so
/// the only `End` cell the engine ever dispatches is the function's own —
/// equivalent to `Return`.
pub fn end(_engine: &mut Engine, _frame: &mut Frame) -> Outcome {
    Outcome::Return
}

pub fn unreachable(_engine: &mut Engine, _frame: &mut Frame) -> Outcome {
    Outcome::Trap(Trap::UnreachableExecuted)
}

/// Cooperative suspension (§1, §4.4 `Yield`): the single point execution
/// can hand control back to the embedder mid-function.
pub fn yield_(engine: &mut Engine, _frame: &mut Frame) -> Outcome {
    if let Some(hook) = engine.yield_hook.as_mut() {
        if let Some(trap) = hook() {
            return Outcome::Trap(trap);
        }
    }
    Outcome::Continue
}

/// Lazy compilation (§4.4): the first dispatch resolves `func_idx` to its
/// `Entry` address and patches the cached `Addr` cell in place; later
/// dispatches see the cache already populated. Single-writer because the
/// engine is single-threaded per instance (§4.4 open question).
pub fn compile(engine: &mut Engine, frame: &mut Frame) -> Outcome {
    let func_idx = engine.fetch_func_idx(frame);
    let cache_cell_addr = frame.pc;
    let cached = engine.fetch_addr(frame);

    let target = if cached == usize::MAX {
        let resolved = engine.module.functions[func_idx as usize].code_addr;
        engine.module.code.cells[cache_cell_addr] = CodeCell::Addr(resolved);
        resolved
    } else {
        cached
    };
    frame.pc = target;
    Outcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codestream::HandlerFn;
    use crate::config::EngineConfig;
    use crate::func::{FuncType, FunctionDescriptor};
    use crate::memory::Memory;
    use crate::module::Module;
    use crate::value::{slot_from_i32, slot_to_i32};

    fn const_add_module() -> Module {
        // func 0: result = local[0] + local[1], addressed as the first two
        // slots after the (empty) return region.
        let mut module = Module::default();
        module.types.push(FuncType {
            params: vec![],
            results: vec![],
        });
        let code_addr = module.code.here();
        module
            .code
            .op(entry as HandlerFn)
            .func_idx(0)
            .op(crate::ops::arith::i32_add as HandlerFn)
            .i32(0)
            .i32(1)
            .i32(0)
            .op(r#return as HandlerFn);
        module.functions.push(FunctionDescriptor {
            type_idx: 0,
            code_addr,
            param_slots: 2,
            result_slots: 0,
            local_slots: 0,
            constants: vec![],
            scratch_slots: 0,
            cached_locals: vec![],
        });
        module
    }

    #[test]
    fn entry_then_add_then_return_computes_expected_value() {
        let module = const_add_module();
        let entry_addr = module.functions[0].code_addr;
        let mut engine = Engine::new(module, Memory::new(1, None), EngineConfig::default());
        engine.stack.set(0, 0, slot_from_i32(2));
        engine.stack.set(0, 1, slot_from_i32(40));
        let frame = Frame::new(entry_addr, 0);
        let frame = engine.run(frame).unwrap();
        assert_eq!(slot_to_i32(engine.stack.get(frame.sp, 0)), 42);
    }

    #[test]
    fn call_indirect_traps_on_type_mismatch_without_running_callee() {
        let mut module = const_add_module();
        module.types.push(FuncType {
            params: vec![],
            results: vec![crate::value::ValType::I32],
        });
        module.table.push(Some(0));

        module
            .code
            .op(call_indirect as HandlerFn)
            .type_idx(1) // callee's actual type_idx is 0, so this mismatches
            .i32(10)
            .i32(0)
            .func_idx(0); // caller_func_idx, irrelevant here since this traps first
        let caller_addr = module.code.here() - 5;

        let mut engine = Engine::new(module, Memory::new(1, None), EngineConfig::default());
        engine.stack.set(0, 10, slot_from_i32(0));
        let result = engine.run(Frame::new(caller_addr, 0));
        assert!(matches!(result, Err(Trap::IndirectCallTypeMismatch)));
    }

    #[test]
    fn branch_table_clamps_out_of_range_index_to_default() {
        let mut module = Module::default();
        module
            .code
            .op(branch_table as HandlerFn)
            .i32(0)
            .u32(2);
        let target_a = module.code.addr_placeholder();
        let target_b = module.code.addr_placeholder();
        let default_target = module.code.addr_placeholder();
        module.code.op(unreachable as HandlerFn); // target_a
        let reachable_a = module.code.here() - 1;
        module.code.op(r#return as HandlerFn); // target_b
        let reachable_b = module.code.here() - 1;
        module.code.op(r#return as HandlerFn); // default
        let default_pc = module.code.here() - 1;
        module.code.patch_addr(target_a, reachable_a);
        module.code.patch_addr(target_b, reachable_b);
        module.code.patch_addr(default_target, default_pc);

        let mut engine = Engine::new(module, Memory::new(1, None), EngineConfig::default());
        engine.stack.set(0, 0, slot_from_i32(99)); // out of range: clamps to default
        let result = engine.run(Frame::new(0, 0));
        assert!(result.is_ok());
    }

    #[test]
    fn compile_patches_its_cache_cell_once() {
        let module = const_add_module();
        let entry_addr = module.functions[0].code_addr;
        let mut module = module;
        module.code.op(compile as HandlerFn).func_idx(0);
        let cache_idx = module.code.addr_placeholder();
        module.code.patch_addr(cache_idx, usize::MAX);
        let compile_site = module.code.here() - 3;

        let mut engine = Engine::new(module, Memory::new(1, None), EngineConfig::default());
        engine.stack.set(0, 0, slot_from_i32(1));
        engine.stack.set(0, 1, slot_from_i32(1));
        engine.run(Frame::new(compile_site, 0)).unwrap();
        assert!(matches!(
            engine.module.code.cells[cache_idx],
            CodeCell::Addr(addr) if addr == entry_addr
        ));
    }
}
