//! The compiled module shape the execution core consumes (§1: loading,
//! parsing, and validation themselves are out of scope). A `Module` is
//! assumed already validated: `call_indirect`'s type check is the only
//! cross-check this core still performs, because it happens at run time
//! against a runtime-supplied table index (§4.4).

use crate::codestream::CodeStream;
use crate::func::{FuncType, FunctionDescriptor};
use crate::value::RawSlot;

#[derive(Debug, Default)]
pub struct Module {
    pub code: CodeStream,
    pub types: Vec<FuncType>,
    pub functions: Vec<FunctionDescriptor>,
    /// `call_indirect`'s table: `None` is a null element (§4.4 "Undefined
    /// element"/"Uninitialized element" traps).
    pub table: Vec<Option<u32>>,
    pub globals: Vec<RawSlot>,
}

impl Module {
    pub fn func_type(&self, func_idx: u32) -> &FuncType {
        let desc = &self.functions[func_idx as usize];
        &self.types[desc.type_idx as usize]
    }
}
