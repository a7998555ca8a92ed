//! Dynamic binary translator runtime for 32-bit ARM guests.
//!
//! [`Jit`] owns the guest-state block, the code cache and the dispatcher.
//! The consumer supplies a [`UserCallbacks`] implementation for guest
//! memory, time and events; `run` executes translated guest code until the
//! tick budget runs out or a halt is requested. Cache coherence for guest
//! code writes is the consumer's responsibility via
//! [`Jit::invalidate_range`] (there is no self-modifying-code detection).
//!
//! Exactly two operations are safe from other threads, both through
//! cloneable handles: [`HaltHandle::halt`] and the
//! [`InvalidationHandle`] requests. Each only sets flags; cache mutation
//! happens on the owner thread at safe points between block executions.

mod backend;
mod cache;
mod callbacks;
mod dispatch;
mod invalidate;
mod passes;
mod state;
mod translate;

pub use cache::{BlockDescriptor, BlockHandle};
pub use callbacks::UserCallbacks;
pub use invalidate::{HaltHandle, InvalidationHandle};
pub use state::{JitState, RSB_SIZE};
pub use translate::{translate, TranslationOptions};

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gale_a32::LocationDescriptor;

use cache::{CodeCache, FastDispatchTable};
use invalidate::Shared;
use state::{NO_CODE, RSB_EMPTY, RSB_SIZE as RSB_LEN};

/// Configuration for a [`Jit`] instance.
#[derive(Debug, Clone, Copy)]
pub struct UserConfig {
    /// Give UNPREDICTABLE encodings defined fallback semantics instead of
    /// bailing to the interpreter.
    pub define_unpredictable_behaviour: bool,
    /// UDF raises UndefinedInstruction instead of bailing to the
    /// interpreter.
    pub define_undefined_behaviour_in_udf: bool,
    /// Enable the direct-mapped fast-dispatch table.
    pub enable_fast_dispatch: bool,
    /// Capacity of the compiled-code arena in bytes.
    pub arena_capacity: usize,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            define_unpredictable_behaviour: false,
            define_undefined_behaviour_in_udf: false,
            enable_fast_dispatch: true,
            arena_capacity: 32 * 1024 * 1024,
        }
    }
}

/// The JIT facade: public entry points for running, halting, cache control
/// and context save/restore.
pub struct Jit<C: UserCallbacks> {
    pub(crate) callbacks: C,
    pub(crate) config: UserConfig,
    pub(crate) state: JitState,
    pub(crate) cache: CodeCache,
    pub(crate) fast_dispatch: FastDispatchTable,
    pub(crate) shared: Arc<Shared>,
    generation: u64,
    is_executing: bool,
}

impl<C: UserCallbacks> Jit<C> {
    pub fn new(config: UserConfig, callbacks: C) -> Jit<C> {
        Jit {
            callbacks,
            config,
            state: JitState::default(),
            cache: CodeCache::new(config.arena_capacity),
            fast_dispatch: FastDispatchTable::new(),
            shared: Arc::new(Shared::default()),
            generation: 0,
            is_executing: false,
        }
    }

    /// Execute guest code from the current guest state until the tick
    /// budget is exhausted or a halt is requested.
    ///
    /// Re-entrant calls are forbidden.
    pub fn run(&mut self) {
        assert!(!self.is_executing, "reentrant Jit::run");
        self.is_executing = true;
        // Requests queued while idle are serviced before any translation.
        self.perform_cache_invalidation();
        self.shared.halt_requested.store(false, Ordering::Release);

        self.dispatch();

        self.perform_cache_invalidation();
        self.is_executing = false;
    }

    /// Request that `run` return at the next block boundary. Callable from
    /// any thread and from callbacks invoked by executing code.
    pub fn halt(&self) {
        self.shared.halt_requested.store(true, Ordering::Release);
    }

    pub fn halt_handle(&self) -> HaltHandle {
        HaltHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn invalidation_handle(&self) -> InvalidationHandle {
        InvalidationHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Invalidate every translation overlapping the closed byte range
    /// `[start, start + length - 1]`.
    pub fn invalidate_range(&mut self, start: u32, length: usize) {
        self.invalidation_handle().invalidate_range(start, length);
        if !self.is_executing {
            self.perform_cache_invalidation();
        }
    }

    /// Queue a full cache flush; serviced immediately when not executing.
    pub fn clear_cache(&mut self) {
        self.invalidation_handle().clear_cache();
        if !self.is_executing {
            self.perform_cache_invalidation();
        }
    }

    /// Zero-initialize the guest-state block. The code cache is retained.
    pub fn reset(&mut self) {
        assert!(!self.is_executing, "Jit::reset while executing");
        self.state = JitState::default();
    }

    pub fn regs(&self) -> &[u32; 16] {
        &self.state.regs
    }

    pub fn regs_mut(&mut self) -> &mut [u32; 16] {
        &mut self.state.regs
    }

    pub fn ext_regs(&self) -> &[u32; 64] {
        &self.state.ext_regs
    }

    pub fn ext_regs_mut(&mut self) -> &mut [u32; 64] {
        &mut self.state.ext_regs
    }

    pub fn ext_reg(&self, reg: gale_a32::ExtReg) -> u32 {
        self.state.ext_regs[reg.index()]
    }

    pub fn set_ext_reg(&mut self, reg: gale_a32::ExtReg, value: u32) {
        self.state.ext_regs[reg.index()] = value;
    }

    pub fn cpsr(&self) -> u32 {
        self.state.cpsr()
    }

    pub fn set_cpsr(&mut self, value: u32) {
        self.state.set_cpsr(value);
    }

    pub fn fpscr(&self) -> u32 {
        self.state.fpscr()
    }

    pub fn set_fpscr(&mut self, value: u32) {
        self.state.set_fpscr(value);
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    pub fn is_executing(&self) -> bool {
        self.is_executing
    }

    /// Snapshot the guest-state block plus the cache generation.
    pub fn save_context(&self) -> Context {
        Context {
            regs: self.state.regs,
            ext_regs: self.state.ext_regs,
            cpsr: self.state.cpsr(),
            fpscr: self.state.fpscr(),
            invalid_cache_generation: self.generation,
            rsb: RsbSnapshot {
                ptr: self.state.rsb_ptr,
                location_descriptors: self.state.rsb_location_descriptors,
                codeptrs: self.state.rsb_codeptrs,
            },
        }
    }

    /// Restore a context. The RSB is carried over only when the cache
    /// generation still matches; its code pointers may otherwise name
    /// invalidated blocks.
    pub fn load_context(&mut self, ctx: &Context) {
        self.state.regs = ctx.regs;
        self.state.ext_regs = ctx.ext_regs;
        self.state.set_cpsr(ctx.cpsr);
        self.state.set_fpscr(ctx.fpscr);
        if ctx.invalid_cache_generation == self.generation {
            self.state.rsb_ptr = ctx.rsb.ptr;
            self.state.rsb_location_descriptors = ctx.rsb.location_descriptors;
            self.state.rsb_codeptrs = ctx.rsb.codeptrs;
        } else {
            self.state.reset_rsb();
        }
    }

    /// Human-readable listing of the compiled block at `descriptor`, for
    /// debugging.
    pub fn disassemble(&self, descriptor: LocationDescriptor) -> String {
        use std::fmt::Write;

        let Some(bd) = self.cache.forward.get(&descriptor) else {
            return format!("no compiled block at {descriptor}");
        };
        let block = self.cache.arena.block(bd.entrypoint);
        let mut out = format!(
            "address: {}\nsize: {} bytes\nguest bytes: {}\n",
            bd.entrypoint.index(),
            bd.size_in_host_bytes,
            bd.size_in_guest_bytes,
        );
        if block.cond != gale_a32::Cond::Al {
            let _ = writeln!(out, "guard: {:?} else {:?}", block.cond, block.cond_failed);
        }
        for (i, op) in block.ops.iter().enumerate() {
            let _ = writeln!(out, "  %{i:<3} = {op:?}");
        }
        let _ = writeln!(out, "  -> {:?}", block.terminal);
        out
    }

    /// Service queued invalidation requests. Called at safe points only.
    pub(crate) fn perform_cache_invalidation(&mut self) {
        let (full, ranges) = {
            let mut pending = self.shared.pending.lock().unwrap();
            if pending.is_empty() {
                return;
            }
            let full = pending.full_flush;
            let ranges = pending.ranges.ranges();
            pending.full_flush = false;
            pending.ranges.clear();
            (full, ranges)
        };

        if full {
            self.full_flush();
        } else {
            self.partial_flush(&ranges);
        }
    }

    pub(crate) fn full_flush(&mut self) {
        self.cache.clear();
        self.fast_dispatch.clear();
        self.state.reset_rsb();
        self.generation += 1;
        tracing::debug!(generation = self.generation, "full code-cache flush");
    }

    fn partial_flush(&mut self, ranges: &[(u32, u32)]) {
        let affected = self.cache.ranges.invalidate_ranges(ranges);
        for location in &affected {
            if let Some(bd) = self.cache.forward.remove(location) {
                self.cache.arena.invalidate(bd.entrypoint);
            }
        }
        self.state.reset_rsb();
        self.fast_dispatch.clear();
        self.generation += 1;
        tracing::debug!(
            blocks = affected.len(),
            generation = self.generation,
            "partial cache invalidation"
        );
    }
}

/// Serializable snapshot of the guest-state block plus the cache generation
/// at save time. No code pointers are persisted: the RSB travels only
/// inside the process, and only across matching generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    regs: [u32; 16],
    #[serde(with = "ext_regs_serde")]
    ext_regs: [u32; 64],
    cpsr: u32,
    fpscr: u32,
    invalid_cache_generation: u64,
    #[serde(skip)]
    rsb: RsbSnapshot,
}

impl Context {
    pub fn regs(&self) -> &[u32; 16] {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut [u32; 16] {
        &mut self.regs
    }

    pub fn ext_regs(&self) -> &[u32; 64] {
        &self.ext_regs
    }

    pub fn ext_regs_mut(&mut self) -> &mut [u32; 64] {
        &mut self.ext_regs
    }

    pub fn cpsr(&self) -> u32 {
        self.cpsr
    }

    pub fn set_cpsr(&mut self, value: u32) {
        self.cpsr = value;
    }

    pub fn fpscr(&self) -> u32 {
        self.fpscr
    }

    pub fn set_fpscr(&mut self, value: u32) {
        self.fpscr = value;
    }
}

#[derive(Debug, Clone, Copy)]
struct RsbSnapshot {
    ptr: usize,
    location_descriptors: [u64; RSB_LEN],
    codeptrs: [u64; RSB_LEN],
}

impl Default for RsbSnapshot {
    fn default() -> Self {
        RsbSnapshot {
            ptr: 0,
            location_descriptors: [RSB_EMPTY; RSB_LEN],
            codeptrs: [NO_CODE; RSB_LEN],
        }
    }
}

mod ext_regs_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(regs: &[u32; 64], serializer: S) -> Result<S::Ok, S::Error> {
        regs.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u32; 64], D::Error> {
        let values = Vec::<u32>::deserialize(deserializer)?;
        values
            .try_into()
            .map_err(|_| D::Error::custom("expected 64 extension registers"))
    }
}
