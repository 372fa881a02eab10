//! Engine configuration: the knobs the ambient stack needs even though the
//! embedding API itself is out of scope (§1) — something has to decide
//! whether the register cache and debug validation run.

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Enable the local-register cache (§4.5). Requires the `regcache`
    /// feature; ignored otherwise.
    pub regcache: bool,
    /// After every register write, assert the backing slot agrees
    /// (§4.5 "coherence invariant"). Requires `debug-regcache`.
    pub debug_regcache: bool,
    /// Record call-boundary frames for `Backtrace` (§4.6). Requires
    /// `backtrace`.
    pub backtrace: bool,
    /// Total slot-stack capacity (§3).
    pub max_stack_slots: usize,
    /// Bound on *native* Rust recursion depth across `Call`/`CallIndirect`/
    /// `Loop` (§6 "Call stack exhausted"), independent of `max_stack_slots`.
    pub max_recursion_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            regcache: cfg!(feature = "regcache"),
            debug_regcache: cfg!(feature = "debug-regcache"),
            backtrace: cfg!(feature = "backtrace"),
            max_stack_slots: 64 * 1024,
            max_recursion_depth: 4096,
        }
    }
}
