//! Per-op trace and profile hooks (§4.6). Both are observation points that
//! sit beside dispatch without altering it; producing human-readable trace
//! output is the embedder's concern (§1), so this only emits structured
//! `tracing` events and raw counters.

#[cfg(feature = "profile")]
use dyn_clone::DynClone;

/// A sampling hook invoked once per handler dispatch when the `profile`
/// feature is enabled. Boxed and clonable so an `Engine` can be cloned
/// without losing its profiler, mirroring the teacher's `profile-any` gate.
#[cfg(feature = "profile")]
pub trait ProfileHook: DynClone {
    fn on_dispatch(&mut self, code_addr: usize);
}

#[cfg(feature = "profile")]
dyn_clone::clone_trait_object!(ProfileHook);

/// A simple per-address dispatch counter, usable as a `ProfileHook`.
#[cfg(feature = "profile")]
#[derive(Debug, Clone, Default)]
pub struct DispatchCounts {
    counts: std::collections::HashMap<usize, u64>,
}

#[cfg(feature = "profile")]
impl DispatchCounts {
    pub fn get(&self, code_addr: usize) -> u64 {
        self.counts.get(&code_addr).copied().unwrap_or(0)
    }
}

#[cfg(feature = "profile")]
impl ProfileHook for DispatchCounts {
    fn on_dispatch(&mut self, code_addr: usize) {
        *self.counts.entry(code_addr).or_insert(0) += 1;
    }
}

/// Emits a `tracing` event for one handler dispatch, gated behind `trace` so
/// it costs nothing in the default build.
#[cfg(feature = "trace")]
#[inline]
pub fn trace_dispatch(code_addr: usize, r0: u64, sp: usize) {
    tracing::trace!(code_addr, r0, sp, "dispatch");
}
