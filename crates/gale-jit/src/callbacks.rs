use gale_a32::Exception;

use crate::JitState;

/// The consumer's side of the world: guest memory, time, and the events the
/// guest can raise.
///
/// Data accesses may have side effects (MMIO). `memory_read_code` must be
/// side-effect free and stable for a given address until that address is
/// passed to `invalidate_range`.
pub trait UserCallbacks {
    fn memory_read_code(&mut self, vaddr: u32) -> u32;

    fn memory_read_8(&mut self, vaddr: u32) -> u8;
    fn memory_read_16(&mut self, vaddr: u32) -> u16;
    fn memory_read_32(&mut self, vaddr: u32) -> u32;
    fn memory_read_64(&mut self, vaddr: u32) -> u64;

    fn memory_write_8(&mut self, vaddr: u32, value: u8);
    fn memory_write_16(&mut self, vaddr: u32, value: u16);
    fn memory_write_32(&mut self, vaddr: u32, value: u32);
    fn memory_write_64(&mut self, vaddr: u32, value: u64);

    /// Account for cycles consumed since the last call; invoked on return
    /// from block execution.
    fn add_ticks(&mut self, ticks: u64);

    /// Remaining tick budget; execution returns to the host once a block
    /// boundary sees it exhausted.
    fn get_ticks_remaining(&mut self) -> u64;

    /// Guest executed SVC.
    fn call_supervisor(&mut self, swi: u32);

    /// Breakpoint, undefined or unpredictable instruction at `pc`.
    fn exception_raised(&mut self, pc: u32, exception: Exception);

    /// Step `num_insts` guest instructions at `pc` with the consumer's
    /// interpreter. The guest-state block is handed over for the duration;
    /// the interpreter must leave the PC pointing at the next instruction
    /// to execute.
    fn interpreter_fallback(&mut self, pc: u32, num_insts: usize, state: &mut JitState);

    /// Whether `vaddr` lies in memory the consumer guarantees immutable;
    /// enables the constant-memory-read optimization.
    fn is_read_only_memory(&mut self, _vaddr: u32) -> bool {
        false
    }
}
