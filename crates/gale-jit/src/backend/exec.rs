use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use gale_a32::{Cond, Exception, LocationDescriptor, Psr};
use gale_ir::{eval, Opcode, Terminal};

use crate::cache::BlockDescriptor;
use crate::state::{JitState, NO_CODE};
use crate::UserCallbacks;

use super::{CompiledBlock, Src};

/// How a block handed control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockExit {
    /// Full dispatch (or the block was invalidated / a halt was seen).
    Dispatch,
    /// Statically known successor; `fast` skips the tick-budget check.
    Link {
        target: LocationDescriptor,
        fast: bool,
    },
    /// Try the return stack buffer for the successor.
    PopRsbHint,
    /// Try the fast-dispatch table for the successor.
    FastDispatchHint,
}

pub(crate) struct ExecContext<'a> {
    pub state: &'a mut JitState,
    pub callbacks: &'a mut dyn UserCallbacks,
    pub halt: &'a AtomicBool,
    /// Forward map, for resolving RSB push targets at push time.
    pub forward: &'a HashMap<LocationDescriptor, BlockDescriptor>,
}

/// Auxiliary results of one executed op.
#[derive(Debug, Clone, Copy, Default)]
struct Aux {
    carry: bool,
    overflow: bool,
    ge: u32,
}

/// Run one compiled block against the guest state. Returns the exit and the
/// cycles consumed.
pub(crate) fn execute(block: &CompiledBlock, ctx: &mut ExecContext<'_>) -> (BlockExit, u64) {
    if block.invalidated {
        return (BlockExit::Dispatch, 0);
    }

    // Condition guard: a failed guard transfers to the recorded fall-through
    // location, charging the cycles of the skipped instructions.
    if block.cond != Cond::Al && !block.cond.passed(ctx.state.cpsr_nzcv) {
        let target = block
            .cond_failed
            .expect("conditional block without a fall-through location");
        return (
            BlockExit::Link {
                target,
                fast: false,
            },
            block.cond_failed_cycle_count,
        );
    }

    let mut slots = vec![0u64; block.ops.len()];
    let mut aux = vec![Aux::default(); block.ops.len()];

    for (i, op) in block.ops.iter().enumerate() {
        let get = |src: Src| -> u64 {
            match src {
                Src::Slot(slot) => slots[slot as usize],
                Src::Imm(v) => v,
            }
        };
        let get32 = |src: Src| get(src) as u32;
        let get1 = |src: Src| get(src) != 0;
        let slot_aux = |src: Src| -> Aux {
            match src {
                Src::Slot(slot) => aux[slot as usize],
                Src::Imm(_) => Aux::default(),
            }
        };

        let mut result = 0u64;
        let mut result_aux = Aux::default();

        match op.op {
            Opcode::Void => unreachable!("tombstones are not lowered"),

            Opcode::GetRegister => result = u64::from(ctx.state.regs[get(op.a) as usize]),
            Opcode::SetRegister => ctx.state.regs[get(op.a) as usize] = get32(op.b),
            Opcode::GetCpsr => result = u64::from(ctx.state.cpsr()),
            Opcode::SetCpsrNzcvq => {
                let v = get32(op.a);
                ctx.state.cpsr_nzcv = v & 0xF000_0000;
                ctx.state.cpsr_q = v & Psr::Q_MASK != 0;
            }
            Opcode::SetGeFlags => ctx.state.cpsr_ge = get32(op.a) & 0xF,
            Opcode::GetCFlag => result = u64::from(ctx.state.cpsr_nzcv >> 29 & 1),
            Opcode::SetNFlag => set_nzcv_bit(ctx.state, 31, get1(op.a)),
            Opcode::SetZFlag => set_nzcv_bit(ctx.state, 30, get1(op.a)),
            Opcode::SetCFlag => set_nzcv_bit(ctx.state, 29, get1(op.a)),
            Opcode::SetVFlag => set_nzcv_bit(ctx.state, 28, get1(op.a)),
            Opcode::OrQFlag => ctx.state.cpsr_q |= get1(op.a),
            Opcode::BranchWritePC => ctx.state.regs[15] = get32(op.a) & !0b11,
            Opcode::BXWritePC => {
                let v = get32(op.a);
                if v & 1 != 0 {
                    ctx.state.cpsr_et |= Psr::T_MASK;
                    ctx.state.regs[15] = v & !0b1;
                } else {
                    ctx.state.cpsr_et &= !Psr::T_MASK;
                    ctx.state.regs[15] = v & !0b11;
                }
            }
            Opcode::SetCheckBit => ctx.state.check_bit = get1(op.a),

            Opcode::Add32 | Opcode::Sub32 => {
                let (r, carry, overflow) = if op.op == Opcode::Add32 {
                    eval::add_with_carry(get32(op.a), get32(op.b), get1(op.c))
                } else {
                    eval::sub_with_carry(get32(op.a), get32(op.b), get1(op.c))
                };
                result = u64::from(r);
                result_aux.carry = carry;
                result_aux.overflow = overflow;
            }
            Opcode::Mul32 => result = u64::from(get32(op.a).wrapping_mul(get32(op.b))),
            Opcode::And32 => result = u64::from(get32(op.a) & get32(op.b)),
            Opcode::Eor32 => result = u64::from(get32(op.a) ^ get32(op.b)),
            Opcode::Orr32 => result = u64::from(get32(op.a) | get32(op.b)),
            Opcode::Not32 => result = u64::from(!get32(op.a)),

            Opcode::LogicalShiftLeft
            | Opcode::LogicalShiftRight
            | Opcode::ArithmeticShiftRight
            | Opcode::RotateRight => {
                let amount = get(op.b) as u32;
                let (r, carry) = match op.op {
                    Opcode::LogicalShiftLeft => eval::lsl_c(get32(op.a), amount, get1(op.c)),
                    Opcode::LogicalShiftRight => eval::lsr_c(get32(op.a), amount, get1(op.c)),
                    Opcode::ArithmeticShiftRight => eval::asr_c(get32(op.a), amount, get1(op.c)),
                    _ => eval::ror_c(get32(op.a), amount, get1(op.c)),
                };
                result = u64::from(r);
                result_aux.carry = carry;
            }
            Opcode::RotateRightExtended => {
                let (r, carry) = eval::rrx_c(get32(op.a), get1(op.b));
                result = u64::from(r);
                result_aux.carry = carry;
            }

            Opcode::SignExtendByteToWord => result = u64::from(get(op.a) as u8 as i8 as i32 as u32),
            Opcode::SignExtendHalfToWord => {
                result = u64::from(get(op.a) as u16 as i16 as i32 as u32)
            }
            Opcode::ZeroExtendByteToWord => result = u64::from(get(op.a) as u8),
            Opcode::ZeroExtendHalfToWord => result = u64::from(get(op.a) as u16),
            Opcode::LeastSignificantByte => result = u64::from(get32(op.a) as u8),
            Opcode::LeastSignificantHalf => result = u64::from(get32(op.a) as u16),
            Opcode::MostSignificantHalf => result = u64::from((get32(op.a) >> 16) as u16),
            Opcode::MostSignificantBit => result = u64::from(get32(op.a) >> 31),
            Opcode::IsZero => result = u64::from(get32(op.a) == 0),
            Opcode::CountLeadingZeros => result = u64::from(get32(op.a).leading_zeros()),

            Opcode::PackedAddSubU16 => {
                let (r, ge) = eval::packed_add_sub_u16(get32(op.a), get32(op.b));
                result = u64::from(r);
                result_aux.ge = ge;
            }
            Opcode::PackedAddSubS16 => {
                let (r, ge) = eval::packed_add_sub_s16(get32(op.a), get32(op.b));
                result = u64::from(r);
                result_aux.ge = ge;
            }
            Opcode::PackedSubAddU16 => {
                let (r, ge) = eval::packed_sub_add_u16(get32(op.a), get32(op.b));
                result = u64::from(r);
                result_aux.ge = ge;
            }
            Opcode::PackedSubAddS16 => {
                let (r, ge) = eval::packed_sub_add_s16(get32(op.a), get32(op.b));
                result = u64::from(r);
                result_aux.ge = ge;
            }
            Opcode::PackedHalvingAddSubS16 => {
                result = u64::from(eval::packed_halving_add_sub_s16(get32(op.a), get32(op.b)))
            }
            Opcode::PackedHalvingSubAddS16 => {
                result = u64::from(eval::packed_halving_sub_add_s16(get32(op.a), get32(op.b)))
            }

            Opcode::GetCarryFromOp => result = u64::from(slot_aux(op.a).carry),
            Opcode::GetOverflowFromOp => result = u64::from(slot_aux(op.a).overflow),
            Opcode::GetGeFromOp => result = u64::from(slot_aux(op.a).ge),

            Opcode::ReadMemory8 => result = u64::from(ctx.callbacks.memory_read_8(get32(op.a))),
            Opcode::ReadMemory16 => result = u64::from(ctx.callbacks.memory_read_16(get32(op.a))),
            Opcode::ReadMemory32 => result = u64::from(ctx.callbacks.memory_read_32(get32(op.a))),
            Opcode::ReadMemory64 => result = ctx.callbacks.memory_read_64(get32(op.a)),
            Opcode::WriteMemory8 => ctx.callbacks.memory_write_8(get32(op.a), get(op.b) as u8),
            Opcode::WriteMemory16 => ctx.callbacks.memory_write_16(get32(op.a), get(op.b) as u16),
            Opcode::WriteMemory32 => ctx.callbacks.memory_write_32(get32(op.a), get32(op.b)),
            Opcode::WriteMemory64 => ctx.callbacks.memory_write_64(get32(op.a), get(op.b)),

            Opcode::PushRsb => {
                let hash = get(op.a);
                let target = LocationDescriptor::from_unique_hash(hash);
                let code = ctx
                    .forward
                    .get(&target)
                    .map(|bd| u64::from(bd.entrypoint.index()))
                    .unwrap_or(NO_CODE);
                ctx.state.rsb_push(hash, code);
            }
            Opcode::CallSupervisor => ctx.callbacks.call_supervisor(get32(op.a)),
            Opcode::ExceptionRaised => {
                let pc = get32(op.a);
                let exception =
                    Exception::from_code(get(op.b) as u8).expect("bad exception code in IR");
                ctx.state.regs[15] = pc;
                ctx.callbacks.exception_raised(pc, exception);
            }
        }

        slots[i] = result;
        aux[i] = result_aux;
    }

    let exit = run_terminal(&block.terminal, ctx);
    (exit, block.cycle_count)
}

fn set_nzcv_bit(state: &mut JitState, bit: u32, value: bool) {
    if value {
        state.cpsr_nzcv |= 1 << bit;
    } else {
        state.cpsr_nzcv &= !(1 << bit);
    }
}

fn run_terminal(terminal: &Terminal, ctx: &mut ExecContext<'_>) -> BlockExit {
    match terminal {
        Terminal::Interpret {
            next,
            num_instructions,
        } => {
            ctx.state.commit_location(*next);
            ctx.callbacks
                .interpreter_fallback(next.pc(), *num_instructions, ctx.state);
            BlockExit::Dispatch
        }
        Terminal::ReturnToDispatch => BlockExit::Dispatch,
        Terminal::LinkBlock { target } => BlockExit::Link {
            target: *target,
            fast: false,
        },
        Terminal::LinkBlockFast { target } => BlockExit::Link {
            target: *target,
            fast: true,
        },
        Terminal::PopRsbHint => BlockExit::PopRsbHint,
        Terminal::FastDispatchHint => BlockExit::FastDispatchHint,
        Terminal::If { cond, then_, else_ } => {
            if cond.passed(ctx.state.cpsr_nzcv) {
                run_terminal(then_, ctx)
            } else {
                run_terminal(else_, ctx)
            }
        }
        Terminal::CheckBit { then_, else_ } => {
            if ctx.state.check_bit {
                run_terminal(then_, ctx)
            } else {
                run_terminal(else_, ctx)
            }
        }
        Terminal::CheckHalt(inner) => {
            if ctx.halt.load(Ordering::Acquire) {
                BlockExit::Dispatch
            } else {
                run_terminal(inner, ctx)
            }
        }
    }
}
