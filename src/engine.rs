//! The execution core's top-level state (§3, §5) and the trampoline driver
//! that steps handlers until one returns `Return` or `Trap` (§4.1, §9).

use crate::codestream::{CodeCell, Outcome};
use crate::config::EngineConfig;
use crate::frame::Frame;
use crate::memory::Memory;
use crate::module::Module;
use crate::stack::Stack;
use crate::trap::Trap;
use crate::value::RawSlot;

#[cfg(feature = "backtrace")]
use crate::backtrace::Backtrace;

#[cfg(feature = "profile")]
use crate::trace::ProfileHook;

/// A host function callable via `CallRawFunction` (§4.4, §5). Takes and
/// returns raw slots; argument/result arity comes from the callee's
/// `FuncType` and is the embedder's responsibility to match (§1). `'static`
/// so `Engine` itself stays unparameterized; embedders share state with
/// `Rc<RefCell<_>>`/channels the way host closures usually do.
pub type HostFn = dyn FnMut(&mut Engine, &[RawSlot]) -> Result<Vec<RawSlot>, Trap>;

/// One cooperative suspension point (§1, §4.4 `Yield`): polled once per
/// `Yield` handler, never at arbitrary points mid-expression.
pub type YieldHook = dyn FnMut() -> Option<Trap>;

pub struct Engine {
    pub module: Module,
    pub memory: Memory,
    pub stack: Stack,
    pub config: EngineConfig,
    /// Saved by `CallRawFunction` so a host call that recursively invokes
    /// back into the instance starts its own frame at the right base (§4.4,
    /// §5 "host re-entrancy").
    pub stack_base: usize,
    /// Native recursion depth across `Call`/`CallIndirect`/`Loop`, bounded
    /// independently of the slot stack (§6 "Call stack exhausted").
    pub recursion_depth: usize,
    pub host_fns: Vec<Box<HostFn>>,
    pub yield_hook: Option<Box<YieldHook>>,
    #[cfg(feature = "backtrace")]
    pub backtrace: Backtrace,
    /// Sampled once per handler dispatch when set (§4.6), mirroring the
    /// teacher's `profile-any` gate.
    #[cfg(feature = "profile")]
    pub profile_hook: Option<Box<dyn ProfileHook>>,
}

impl Engine {
    pub fn new(module: Module, memory: Memory, config: EngineConfig) -> Self {
        let stack = Stack::new(config.max_stack_slots);
        Engine {
            module,
            memory,
            stack,
            config,
            stack_base: 0,
            recursion_depth: 0,
            host_fns: Vec::new(),
            yield_hook: None,
            #[cfg(feature = "backtrace")]
            backtrace: Backtrace::default(),
            #[cfg(feature = "profile")]
            profile_hook: None,
        }
    }

    pub fn register_host_fn(&mut self, f: Box<HostFn>) -> u32 {
        self.host_fns.push(f);
        (self.host_fns.len() - 1) as u32
    }

    #[inline]
    pub fn fetch_cell(&self, frame: &mut Frame) -> CodeCell {
        let cell = self.module.code.cells[frame.pc];
        frame.pc += 1;
        cell
    }

    pub fn fetch_i32(&self, frame: &mut Frame) -> i32 {
        match self.fetch_cell(frame) {
            CodeCell::I32(v) => v,
            other => panic!("expected I32 immediate, found {other:?}"),
        }
    }

    pub fn fetch_u32(&self, frame: &mut Frame) -> u32 {
        match self.fetch_cell(frame) {
            CodeCell::U32(v) => v,
            other => panic!("expected U32 immediate, found {other:?}"),
        }
    }

    pub fn fetch_i64(&self, frame: &mut Frame) -> i64 {
        match self.fetch_cell(frame) {
            CodeCell::I64(v) => v,
            other => panic!("expected I64 immediate, found {other:?}"),
        }
    }

    pub fn fetch_f32(&self, frame: &mut Frame) -> f32 {
        match self.fetch_cell(frame) {
            CodeCell::F32(v) => v,
            other => panic!("expected F32 immediate, found {other:?}"),
        }
    }

    pub fn fetch_f64(&self, frame: &mut Frame) -> f64 {
        match self.fetch_cell(frame) {
            CodeCell::F64(v) => v,
            other => panic!("expected F64 immediate, found {other:?}"),
        }
    }

    pub fn fetch_addr(&self, frame: &mut Frame) -> usize {
        match self.fetch_cell(frame) {
            CodeCell::Addr(v) => v,
            other => panic!("expected Addr immediate, found {other:?}"),
        }
    }

    pub fn fetch_func_idx(&self, frame: &mut Frame) -> u32 {
        match self.fetch_cell(frame) {
            CodeCell::FuncIdx(v) => v,
            other => panic!("expected FuncIdx immediate, found {other:?}"),
        }
    }

    pub fn fetch_type_idx(&self, frame: &mut Frame) -> u32 {
        match self.fetch_cell(frame) {
            CodeCell::TypeIdx(v) => v,
            other => panic!("expected TypeIdx immediate, found {other:?}"),
        }
    }

    pub fn fetch_table_idx(&self, frame: &mut Frame) -> u32 {
        match self.fetch_cell(frame) {
            CodeCell::TableIdx(v) => v,
            other => panic!("expected TableIdx immediate, found {other:?}"),
        }
    }

    pub fn fetch_global_idx(&self, frame: &mut Frame) -> u32 {
        match self.fetch_cell(frame) {
            CodeCell::GlobalIdx(v) => v,
            other => panic!("expected GlobalIdx immediate, found {other:?}"),
        }
    }

    /// Runs one frame to completion: dispatches handlers in a flat loop
    /// until `Return` or `Trap` (§4.1, §9's "trampoline" redesign flag).
    /// `Loop`'s body is just the next cells in the same code stream, so a
    /// loop iterating a million times never recurses natively — `LoopBack`
    /// is handled right here by resetting `frame.pc`, the same way a
    /// `Branch` does (§4.4, §8 "tail-chain depth").
    pub fn run(&mut self, mut frame: Frame) -> Result<Frame, Trap> {
        loop {
            let op = match self.module.code.cells[frame.pc] {
                CodeCell::Op(f) => f,
                other => panic!("expected an opcode cell, found {other:?}"),
            };
            frame.pc += 1;
            #[cfg(feature = "trace")]
            crate::trace::trace_dispatch(frame.pc - 1, frame.regs.r0, frame.sp);
            #[cfg(feature = "profile")]
            if let Some(hook) = self.profile_hook.as_mut() {
                hook.on_dispatch(frame.pc - 1);
            }
            match op(self, &mut frame) {
                Outcome::Continue => continue,
                Outcome::Return => return Ok(frame),
                Outcome::Trap(t) => return Err(t),
                Outcome::LoopBack(target) => {
                    frame.pc = target;
                    continue;
                }
            }
        }
    }
}
