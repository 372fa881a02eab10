//! The stable, comparable trap taxonomy handlers return on failure.

use derive_more::Display;

/// A trap descriptor returned by a handler in place of falsy success.
///
/// Traps are never recovered inside the engine (§7); they walk up the tail
/// chain unchanged until an embedder-level caller observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Trap {
    #[display(fmt = "out of bounds memory access")]
    MemoryOutOfBounds,
    #[display(fmt = "divide by zero")]
    DivideByZero,
    #[display(fmt = "integer overflow")]
    IntegerOverflow,
    #[display(fmt = "invalid conversion to integer")]
    InvalidConversionToInteger,
    #[display(fmt = "undefined element")]
    UndefinedElement,
    #[display(fmt = "uninitialized element")]
    UninitializedElement,
    #[display(fmt = "indirect call type mismatch")]
    IndirectCallTypeMismatch,
    #[display(fmt = "unreachable executed")]
    UnreachableExecuted,
    /// Raised both by the slot-stack overflow check at `Entry` (§4.4) and by
    /// the trampoline's native recursion-depth guard (§9).
    #[display(fmt = "call stack exhausted")]
    CallStackExhausted,
    /// Raised by the host-supplied cooperative yield callback.
    #[display(fmt = "yield cancelled: {_0}")]
    Yielded(&'static str),
    /// Originated by a host call bridged through `CallRawFunction`.
    #[display(fmt = "host trap: {_0}")]
    Host(&'static str),
}

impl Trap {
    /// The wire-visible string from §6, for embedders that want to match on text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Trap::MemoryOutOfBounds => "out of bounds memory access",
            Trap::DivideByZero => "divide by zero",
            Trap::IntegerOverflow => "integer overflow",
            Trap::InvalidConversionToInteger => "invalid conversion to integer",
            Trap::UndefinedElement => "undefined element",
            Trap::UninitializedElement => "uninitialized element",
            Trap::IndirectCallTypeMismatch => "indirect call type mismatch",
            Trap::UnreachableExecuted => "unreachable executed",
            Trap::CallStackExhausted => "call stack exhausted",
            Trap::Yielded(_) => "yield cancelled",
            Trap::Host(_) => "host trap",
        }
    }
}

/// Result of a handler: `Ok(())` is the "falsy" success return from §4.1.
pub type OpResult = Result<(), Trap>;
