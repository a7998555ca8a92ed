use thiserror::Error;

use crate::{Block, Opcode, Terminal, Type, Value};

/// IR invariant violation. These are compiler bugs, not guest-input errors;
/// the runtime aborts on them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("inst %{inst} operand {arg}: expected {expected}, got {got}")]
    TypeMismatch {
        inst: usize,
        arg: usize,
        expected: Type,
        got: Type,
    },
    #[error("inst %{inst} operand {arg} references a later instruction")]
    ForwardReference { inst: usize, arg: usize },
    #[error("inst %{inst} operand {arg} references a removed instruction")]
    DeadReference { inst: usize, arg: usize },
    #[error("inst %{inst} reads an auxiliary result its operand does not produce")]
    MissingAux { inst: usize },
    #[error("block has no terminal")]
    MissingTerminal,
    #[error("interpret terminal covers zero instructions")]
    EmptyInterpret,
    #[error("terminal nesting depth {depth} exceeds the sane bound")]
    DegenerateTerminal { depth: usize },
}

const MAX_TERMINAL_DEPTH: usize = 8;

/// Check SSA discipline, operand types, auxiliary-result wiring and
/// terminal well-formedness. A failure is fatal to the caller.
pub fn verify(block: &Block) -> Result<(), VerifyError> {
    for (id, inst) in block.iter_live() {
        let info = inst.opcode().info();

        for (arg_idx, arg) in inst.args().iter().enumerate() {
            if let Value::Inst(target) = arg {
                if target.index() >= id.index() {
                    return Err(VerifyError::ForwardReference {
                        inst: id.index(),
                        arg: arg_idx,
                    });
                }
                if block.inst(*target).is_dead() {
                    return Err(VerifyError::DeadReference {
                        inst: id.index(),
                        arg: arg_idx,
                    });
                }
            }
            let got = arg.type_in(block);
            let expected = info.args[arg_idx];
            if got != expected {
                return Err(VerifyError::TypeMismatch {
                    inst: id.index(),
                    arg: arg_idx,
                    expected,
                    got,
                });
            }
        }

        if matches!(
            inst.opcode(),
            Opcode::GetCarryFromOp | Opcode::GetOverflowFromOp | Opcode::GetGeFromOp
        ) {
            let produces = inst
                .arg(0)
                .inst()
                .map(|src| block.inst(src).opcode().produces_aux(inst.opcode()))
                .unwrap_or(false);
            if !produces {
                return Err(VerifyError::MissingAux { inst: id.index() });
            }
        }
    }

    let Some(terminal) = block.terminal() else {
        return Err(VerifyError::MissingTerminal);
    };
    verify_terminal(terminal)
}

fn verify_terminal(terminal: &Terminal) -> Result<(), VerifyError> {
    let depth = terminal.depth();
    if depth > MAX_TERMINAL_DEPTH {
        return Err(VerifyError::DegenerateTerminal { depth });
    }
    verify_terminal_inner(terminal)
}

fn verify_terminal_inner(terminal: &Terminal) -> Result<(), VerifyError> {
    match terminal {
        Terminal::Interpret {
            num_instructions, ..
        } => {
            if *num_instructions == 0 {
                return Err(VerifyError::EmptyInterpret);
            }
            Ok(())
        }
        Terminal::If { then_, else_, .. } | Terminal::CheckBit { then_, else_ } => {
            verify_terminal_inner(then_)?;
            verify_terminal_inner(else_)
        }
        Terminal::CheckHalt(inner) => verify_terminal_inner(inner),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Inst, IrBuilder};
    use gale_a32::{Fpscr, LocationDescriptor, Psr, Reg};

    fn builder() -> IrBuilder {
        IrBuilder::new(LocationDescriptor::new(0, Psr::new(0x1D0), Fpscr::new(0)))
    }

    #[test]
    fn accepts_a_well_formed_block() {
        let mut ir = builder();
        let a = ir.get_register(Reg::R0);
        let sum = ir.add_with_carry(a, Value::u32(1), Value::u1(false));
        let c = ir.carry_from(sum);
        ir.set_c_flag(c);
        ir.set_register(Reg::R0, sum);
        ir.set_terminal(Terminal::ReturnToDispatch);
        assert_eq!(verify(ir.block()), Ok(()));
    }

    #[test]
    fn rejects_type_mismatches() {
        let mut ir = builder();
        let a = ir.get_register(Reg::R0);
        ir.block_mut()
            .push_inst(Inst::new(Opcode::SetCFlag, &[a])); // u32 where u1 expected
        ir.set_terminal(Terminal::ReturnToDispatch);
        assert!(matches!(
            verify(ir.block()),
            Err(VerifyError::TypeMismatch { expected: Type::U1, got: Type::U32, .. })
        ));
    }

    #[test]
    fn rejects_aux_reads_from_ops_without_that_aux() {
        let mut ir = builder();
        let a = ir.get_register(Reg::R0);
        let b = ir.and(a, Value::u32(0xFF));
        ir.block_mut()
            .push_inst(Inst::new(Opcode::GetCarryFromOp, &[b]));
        ir.set_terminal(Terminal::ReturnToDispatch);
        assert!(matches!(verify(ir.block()), Err(VerifyError::MissingAux { .. })));
    }

    #[test]
    fn rejects_dangling_references() {
        let mut ir = builder();
        let a = ir.get_register(Reg::R0);
        ir.set_register(Reg::R1, a);
        ir.set_terminal(Terminal::ReturnToDispatch);
        let id = a.inst().unwrap();
        ir.block_mut().inst_mut(id).invalidate();
        assert!(matches!(
            verify(ir.block()),
            Err(VerifyError::DeadReference { .. })
        ));
    }

    #[test]
    fn rejects_missing_terminal() {
        let ir = builder();
        assert_eq!(verify(ir.block()), Err(VerifyError::MissingTerminal));
    }
}
