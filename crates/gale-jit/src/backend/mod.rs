//! Lowering of optimized IR into the executable form the dispatcher runs.
//!
//! The host machine-code emitter proper is an external collaborator; this
//! backend keeps its architectural shape (lowered op list with resolved
//! operand slots, a patchable entry, sizes accounted against the arena) and
//! runs the result directly.

mod exec;

pub(crate) use exec::{execute, BlockExit, ExecContext};

use gale_a32::{Cond, LocationDescriptor};
use gale_ir::{Block, Opcode, Terminal, Value};

/// A lowered operand: a result slot of an earlier op, or an immediate.
/// Register names and exception codes lower to immediates.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Src {
    Slot(u32),
    Imm(u64),
}

/// One lowered micro-op. Operand slots are resolved; op `i` writes slot `i`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExecOp {
    pub op: Opcode,
    pub a: Src,
    pub b: Src,
    pub c: Src,
}

/// Fixed prologue/terminal overhead charged per block, on top of the ops.
const BLOCK_BASE_BYTES: usize = 64;

/// The executable form of a translated block, stored in the code arena.
#[derive(Debug, Clone)]
pub(crate) struct CompiledBlock {
    pub entry: LocationDescriptor,
    pub cond: Cond,
    pub cond_failed: Option<LocationDescriptor>,
    pub cond_failed_cycle_count: u64,
    pub ops: Vec<ExecOp>,
    pub terminal: Terminal,
    pub cycle_count: u64,
    pub guest_len: u32,
    /// Entry patched to fall straight back to the dispatcher after a
    /// partial invalidation; the storage is reclaimed at the next full
    /// flush.
    pub invalidated: bool,
}

impl CompiledBlock {
    pub fn host_size_bytes(&self) -> usize {
        BLOCK_BASE_BYTES + self.ops.len() * std::mem::size_of::<ExecOp>()
    }
}

/// Lower an optimized, verified IR block.
pub(crate) fn lower(block: &Block) -> CompiledBlock {
    // Tombstones are dropped here, so slots are dense.
    let mut slot_of = vec![u32::MAX; block.len()];
    let mut ops = Vec::with_capacity(block.live_count());

    for (id, inst) in block.iter_live() {
        let resolve = |value: Value| -> Src {
            match value {
                Value::Void => Src::Imm(0),
                Value::Inst(src) => {
                    let slot = slot_of[src.index()];
                    debug_assert_ne!(slot, u32::MAX, "use of a removed instruction");
                    Src::Slot(slot)
                }
                Value::ImmU1(v) => Src::Imm(u64::from(v)),
                Value::ImmU8(v) => Src::Imm(u64::from(v)),
                Value::ImmU16(v) => Src::Imm(u64::from(v)),
                Value::ImmU32(v) => Src::Imm(u64::from(v)),
                Value::ImmU64(v) => Src::Imm(v),
                Value::Reg(r) => Src::Imm(r.index() as u64),
            }
        };

        let mut srcs = [Src::Imm(0); 3];
        for (i, arg) in inst.args().iter().enumerate() {
            srcs[i] = resolve(*arg);
        }
        slot_of[id.index()] = ops.len() as u32;
        ops.push(ExecOp {
            op: inst.opcode(),
            a: srcs[0],
            b: srcs[1],
            c: srcs[2],
        });
    }

    CompiledBlock {
        entry: block.location,
        cond: block.cond,
        cond_failed: block.cond_failed,
        cond_failed_cycle_count: block.cond_failed_cycle_count,
        ops,
        terminal: block
            .terminal()
            .cloned()
            .expect("cannot lower a block without a terminal"),
        cycle_count: block.cycle_count,
        guest_len: (block.cycle_count as u32).saturating_mul(4),
        invalidated: false,
    }
}
