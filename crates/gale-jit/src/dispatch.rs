//! The dispatcher: picks the next block at every block boundary, translating
//! on miss, with the RSB and fast-dispatch fast paths in front of the full
//! lookup.

use std::sync::atomic::Ordering;

use gale_a32::LocationDescriptor;

use crate::backend::{self, BlockExit, ExecContext};
use crate::cache::{BlockDescriptor, BlockHandle, MIN_ARENA_HEADROOM};
use crate::state::{NO_CODE, RSB_MASK};
use crate::translate::{translate, TranslationOptions};
use crate::{passes, Jit, UserCallbacks};

/// What the previous block's exit tells the next dispatch entry.
enum Hint {
    None,
    /// Statically linked successor; `fast` skips the tick-budget check at
    /// this one boundary.
    Chained {
        target: LocationDescriptor,
        fast: bool,
    },
    Rsb,
    FastDispatch,
}

impl<C: UserCallbacks> Jit<C> {
    /// The block-boundary loop. Runs until the tick budget is exhausted or a
    /// halt is requested; the halt flag is polled before every block entry,
    /// chained transfers included.
    pub(crate) fn dispatch(&mut self) {
        let cycles_to_run = self.callbacks.get_ticks_remaining();
        let mut remaining = i64::try_from(cycles_to_run).unwrap_or(i64::MAX);
        let mut hint = Hint::None;

        loop {
            if self.shared.halt_requested.load(Ordering::Acquire) {
                break;
            }
            let skip_budget_check = matches!(hint, Hint::Chained { fast: true, .. });
            if remaining <= 0 && !skip_budget_check {
                break;
            }

            let handle = self.select_block(std::mem::replace(&mut hint, Hint::None));
            let (exit, charged) = {
                let block = self.cache.arena.block(handle);
                let mut ctx = ExecContext {
                    state: &mut self.state,
                    callbacks: &mut self.callbacks,
                    halt: &self.shared.halt_requested,
                    forward: &self.cache.forward,
                };
                backend::execute(block, &mut ctx)
            };
            remaining -= i64::try_from(charged).unwrap_or(i64::MAX);
            // The consumer accounts cycles on every block exit.
            self.callbacks.add_ticks(charged);

            hint = match exit {
                BlockExit::Dispatch => Hint::None,
                BlockExit::Link { target, fast } => {
                    self.state.commit_location(target);
                    Hint::Chained { target, fast }
                }
                BlockExit::PopRsbHint => Hint::Rsb,
                BlockExit::FastDispatchHint => Hint::FastDispatch,
            };
        }
    }

    fn select_block(&mut self, hint: Hint) -> BlockHandle {
        // 0. Fall-through link: the guest location is already committed.
        if let Hint::Chained { target, .. } = hint {
            if let Some(descriptor) = self.cache.forward.get(&target) {
                return descriptor.entrypoint;
            }
            return self.translate_and_emit(target);
        }

        let location = self.state.current_location();
        let hash = location.unique_hash();

        // 1. RSB fast path, for return-like transfers only.
        if matches!(hint, Hint::Rsb) {
            let new_ptr = self.state.rsb_ptr.wrapping_sub(1) & RSB_MASK;
            if self.state.rsb_location_descriptors[new_ptr] == hash
                && self.state.rsb_codeptrs[new_ptr] != NO_CODE
            {
                self.state.rsb_ptr = new_ptr;
                return BlockHandle(self.state.rsb_codeptrs[new_ptr] as u32);
            }
        }

        // 2. Fast-dispatch table.
        if self.config.enable_fast_dispatch {
            if let Some(handle) = self.fast_dispatch.lookup(hash) {
                return handle;
            }
        }

        // 3. Full lookup, updating the fast-dispatch slot.
        let handle = match self.cache.forward.get(&location) {
            Some(descriptor) => descriptor.entrypoint,
            None => self.translate_and_emit(location),
        };
        if self.config.enable_fast_dispatch {
            self.fast_dispatch.insert(hash, handle);
        }
        handle
    }

    /// Translate, optimize, lower and register the block at `location`.
    pub(crate) fn translate_and_emit(&mut self, location: LocationDescriptor) -> BlockHandle {
        if self.cache.arena.space_remaining() < MIN_ARENA_HEADROOM {
            tracing::debug!("code arena below reserved headroom, flushing");
            self.full_flush();
        }

        let options = TranslationOptions {
            define_unpredictable_behaviour: self.config.define_unpredictable_behaviour,
            define_undefined_behaviour_in_udf: self.config.define_undefined_behaviour_in_udf,
        };
        let callbacks = &mut self.callbacks;
        let mut block = translate(location, options, &mut |vaddr| {
            callbacks.memory_read_code(vaddr)
        });
        passes::run_pipeline(&mut block, options, &mut self.callbacks);

        let compiled = backend::lower(&block);
        let size_in_guest_bytes = compiled.guest_len;
        let size_in_host_bytes = compiled.host_size_bytes();
        let handle = self.cache.arena.insert(compiled);
        self.cache.forward.insert(
            location,
            BlockDescriptor {
                entrypoint: handle,
                size_in_host_bytes,
                size_in_guest_bytes,
                guest_start_pc: location.pc(),
            },
        );
        let end = location
            .pc()
            .wrapping_add(size_in_guest_bytes.saturating_sub(1));
        self.cache.ranges.add(location.pc(), end, location);
        handle
    }
}
