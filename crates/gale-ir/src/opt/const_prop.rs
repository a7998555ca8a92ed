use std::collections::HashMap;

use crate::{eval, Block, InstId, Opcode, Terminal, Value};

/// Auxiliary results remembered for a folded instruction, so the pseudo-op
/// readers that reference it can fold too.
#[derive(Clone, Copy, Default)]
struct FoldedAux {
    carry: Option<bool>,
    overflow: Option<bool>,
    ge: Option<u32>,
}

/// Evaluate pure ops over constant inputs and fold conditional terminals
/// with constant predicates.
pub fn constant_propagation(block: &mut Block) {
    let mut folded: HashMap<InstId, FoldedAux> = HashMap::new();

    for idx in 0..block.len() {
        let id = InstId::new(idx);
        let inst = block.inst(id);
        if inst.is_dead() {
            continue;
        }
        let opcode = inst.opcode();
        let args: Vec<Value> = inst.args().to_vec();

        // Auxiliary-result readers over an op folded earlier in this sweep.
        let aux_of = |args: &[Value]| args[0].inst().and_then(|src| folded.get(&src).copied());
        let replacement = match opcode {
            Opcode::GetCarryFromOp => aux_of(&args).and_then(|a| a.carry).map(Value::u1),
            Opcode::GetOverflowFromOp => aux_of(&args).and_then(|a| a.overflow).map(Value::u1),
            Opcode::GetGeFromOp => aux_of(&args).and_then(|a| a.ge).map(Value::u32),
            _ => match fold(opcode, &args) {
                Some((value, aux)) => {
                    folded.insert(id, aux);
                    Some(value)
                }
                None => None,
            },
        };

        if let Some(value) = replacement {
            block.replace_uses(id, value);
            block.inst_mut(id).invalidate();
        }
    }

    fold_terminal(block);
}

/// Evaluate one pure op whose operands are all immediates.
fn fold(opcode: Opcode, args: &[Value]) -> Option<(Value, FoldedAux)> {
    let u32_arg = |i: usize| args.get(i).and_then(Value::imm_u32);
    let u8_arg = |i: usize| args.get(i).and_then(Value::imm_u8);
    let u1_arg = |i: usize| args.get(i).and_then(Value::imm_u1);
    let mut aux = FoldedAux::default();

    let value = match opcode {
        Opcode::Add32 | Opcode::Sub32 => {
            let (a, b, c) = (u32_arg(0)?, u32_arg(1)?, u1_arg(2)?);
            let (result, carry, overflow) = if opcode == Opcode::Add32 {
                eval::add_with_carry(a, b, c)
            } else {
                eval::sub_with_carry(a, b, c)
            };
            aux.carry = Some(carry);
            aux.overflow = Some(overflow);
            Value::u32(result)
        }
        Opcode::Mul32 => Value::u32(u32_arg(0)?.wrapping_mul(u32_arg(1)?)),
        Opcode::And32 => Value::u32(u32_arg(0)? & u32_arg(1)?),
        Opcode::Eor32 => Value::u32(u32_arg(0)? ^ u32_arg(1)?),
        Opcode::Orr32 => Value::u32(u32_arg(0)? | u32_arg(1)?),
        Opcode::Not32 => Value::u32(!u32_arg(0)?),
        Opcode::LogicalShiftLeft
        | Opcode::LogicalShiftRight
        | Opcode::ArithmeticShiftRight
        | Opcode::RotateRight => {
            let (v, n, c) = (u32_arg(0)?, u8_arg(1)?, u1_arg(2)?);
            let (result, carry) = match opcode {
                Opcode::LogicalShiftLeft => eval::lsl_c(v, n.into(), c),
                Opcode::LogicalShiftRight => eval::lsr_c(v, n.into(), c),
                Opcode::ArithmeticShiftRight => eval::asr_c(v, n.into(), c),
                _ => eval::ror_c(v, n.into(), c),
            };
            aux.carry = Some(carry);
            Value::u32(result)
        }
        Opcode::RotateRightExtended => {
            let (result, carry) = eval::rrx_c(u32_arg(0)?, u1_arg(1)?);
            aux.carry = Some(carry);
            Value::u32(result)
        }
        Opcode::SignExtendByteToWord => {
            Value::u32(i32::from(args[0].imm_u8()? as i8) as u32)
        }
        Opcode::SignExtendHalfToWord => match args[0] {
            Value::ImmU16(v) => Value::u32(i32::from(v as i16) as u32),
            _ => return None,
        },
        Opcode::ZeroExtendByteToWord => Value::u32(u32::from(u8_arg(0)?)),
        Opcode::ZeroExtendHalfToWord => match args[0] {
            Value::ImmU16(v) => Value::u32(u32::from(v)),
            _ => return None,
        },
        Opcode::LeastSignificantByte => Value::u8(u32_arg(0)? as u8),
        Opcode::LeastSignificantHalf => Value::u16(u32_arg(0)? as u16),
        Opcode::MostSignificantHalf => Value::u16((u32_arg(0)? >> 16) as u16),
        Opcode::MostSignificantBit => Value::u1(u32_arg(0)? >> 31 != 0),
        Opcode::IsZero => Value::u1(u32_arg(0)? == 0),
        Opcode::CountLeadingZeros => Value::u32(u32_arg(0)?.leading_zeros()),
        _ => return None,
    };
    Some((value, aux))
}

/// Fold `If` terminals whose condition is statically known.
fn fold_terminal(block: &mut Block) {
    use gale_a32::Cond;

    let Some(terminal) = block.terminal() else {
        return;
    };
    if let Terminal::If { cond, then_, else_ } = terminal {
        let chosen = match cond {
            Cond::Al => Some((**then_).clone()),
            Cond::Nv => Some((**else_).clone()),
            _ => None,
        };
        if let Some(t) = chosen {
            block.replace_terminal(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IrBuilder;
    use gale_a32::{Cond, Fpscr, LocationDescriptor, Psr, Reg};

    fn builder() -> IrBuilder {
        IrBuilder::new(LocationDescriptor::new(0, Psr::new(0x1D0), Fpscr::new(0)))
    }

    #[test]
    fn folds_constant_arithmetic_and_its_aux_readers() {
        let mut ir = builder();
        let sum = ir.add_with_carry(Value::u32(0x7FFF_FFFF), Value::u32(1), Value::u1(false));
        let v = ir.overflow_from(sum);
        ir.set_v_flag(v);
        ir.set_register(Reg::R0, sum);
        let mut block = ir.into_block();

        constant_propagation(&mut block);

        let set_v = block
            .iter_live()
            .find(|(_, i)| i.opcode() == Opcode::SetVFlag)
            .unwrap()
            .1;
        assert_eq!(set_v.arg(0), Value::u1(true));
        let set_r0 = block
            .iter_live()
            .find(|(_, i)| i.opcode() == Opcode::SetRegister)
            .unwrap()
            .1;
        assert_eq!(set_r0.arg(1), Value::u32(0x8000_0000));
        assert_eq!(block.live_count(), 2);
    }

    #[test]
    fn leaves_dynamic_values_alone() {
        let mut ir = builder();
        let a = ir.get_register(Reg::R1);
        let sum = ir.add_with_carry(a, Value::u32(1), Value::u1(false));
        ir.set_register(Reg::R0, sum);
        let mut block = ir.into_block();

        constant_propagation(&mut block);

        assert_eq!(block.live_count(), 3);
    }

    #[test]
    fn is_idempotent() {
        let mut ir = builder();
        let x = ir.eor(Value::u32(0xFF00), Value::u32(0x00FF));
        let shifted = ir.lsl(x, Value::u8(4), Value::u1(false));
        let c = ir.carry_from(shifted);
        ir.set_c_flag(c);
        ir.set_register(Reg::R5, shifted);
        let mut block = ir.into_block();

        constant_propagation(&mut block);
        let after_once: Vec<String> = block.iter_live().map(|(_, i)| i.to_string()).collect();
        constant_propagation(&mut block);
        let after_twice: Vec<String> = block.iter_live().map(|(_, i)| i.to_string()).collect();
        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn folds_if_terminal_with_constant_predicate() {
        let mut ir = builder();
        let loc = ir.current_location;
        ir.set_terminal(Terminal::If {
            cond: Cond::Al,
            then_: Box::new(Terminal::LinkBlock {
                target: loc.with_pc(0x100),
            }),
            else_: Box::new(Terminal::ReturnToDispatch),
        });
        let mut block = ir.into_block();

        constant_propagation(&mut block);

        assert_eq!(
            block.terminal(),
            Some(&Terminal::LinkBlock {
                target: loc.with_pc(0x100)
            })
        );
    }
}
