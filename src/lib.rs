//! Threaded-code execution core for a WebAssembly interpreter.
//!
//! This crate is the engine *behind* an embedder: it dispatches a compiled
//! code stream, evaluates the operator library, and reports traps. Decoding
//! WebAssembly binaries, validating them, and wiring up an embedding API are
//! all out of scope — callers are expected to hand this crate an already
//! laid-out [`Module`] and drive it through [`Engine::run`].

pub mod backtrace;
pub mod codestream;
pub mod config;
pub mod control;
pub mod engine;
pub mod frame;
pub mod func;
pub mod memory;
pub mod module;
pub mod ops;
pub mod regcache;
pub mod regs;
pub mod slotenc;
pub mod stack;
pub mod trace;
pub mod trap;
pub mod value;

pub use config::EngineConfig;
pub use engine::Engine;
pub use frame::Frame;
pub use func::{FuncType, FunctionDescriptor};
pub use memory::Memory;
pub use module::Module;
pub use trap::Trap;
pub use value::{RawSlot, ValType};
