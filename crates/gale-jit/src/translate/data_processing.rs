use gale_a32::decoder::Fields;
use gale_a32::{Reg, ShiftType};
use gale_ir::{Terminal, Value};

use super::ArmTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DpOp {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl DpOp {
    fn is_compare(self) -> bool {
        matches!(self, DpOp::Tst | DpOp::Teq | DpOp::Cmp | DpOp::Cmn)
    }

    fn has_operand1(self) -> bool {
        !matches!(self, DpOp::Mov | DpOp::Mvn)
    }

    fn is_arithmetic(self) -> bool {
        matches!(
            self,
            DpOp::Sub | DpOp::Rsb | DpOp::Add | DpOp::Adc | DpOp::Sbc | DpOp::Rsc | DpOp::Cmp | DpOp::Cmn
        )
    }
}

/// Immediate form: the operand is `imm8` rotated right by `2 * rot`; a
/// non-zero rotation redefines the shifter carry-out.
fn dp_imm(t: &mut ArmTranslator, f: &Fields<'_>, op: DpOp) -> bool {
    let set_flags = op.is_compare() || f.bit('S');
    let imm32 = f.get('v').rotate_right(2 * f.get('r'));
    let operand2 = Value::u32(imm32);
    let shifter_carry = if f.get('r') == 0 {
        None
    } else {
        Some(Value::u1(imm32 >> 31 != 0))
    };
    let operand1 = op
        .has_operand1()
        .then(|| t.read_reg_or_pc(f.reg('n')));
    let dest = (!op.is_compare()).then(|| f.reg('d'));
    dp_common(t, op, set_flags, dest, operand1, operand2, shifter_carry)
}

/// Register form with an immediate shift.
fn dp_reg(t: &mut ArmTranslator, f: &Fields<'_>, op: DpOp) -> bool {
    let set_flags = op.is_compare() || f.bit('S');
    let shift = ShiftType::from_bits(f.get('r'));
    let rm = t.read_reg_or_pc(f.reg('m'));
    let carry_in = t.ir.get_c_flag();
    let (operand2, carry) = t.ir.emit_imm_shift(rm, shift, f.get('v'), carry_in);
    let operand1 = op
        .has_operand1()
        .then(|| t.read_reg_or_pc(f.reg('n')));
    let dest = (!op.is_compare()).then(|| f.reg('d'));
    dp_common(t, op, set_flags, dest, operand1, operand2, Some(carry))
}

/// Register-shifted-register form. PC operands are UNPREDICTABLE; the
/// defined fallback reads the PC like any other operand.
fn dp_rsr(t: &mut ArmTranslator, f: &Fields<'_>, op: DpOp) -> bool {
    let set_flags = op.is_compare() || f.bit('S');
    let uses_pc = [f.reg('m'), f.reg('s')]
        .into_iter()
        .chain(op.has_operand1().then(|| f.reg('n')))
        .chain((!op.is_compare()).then(|| f.reg('d')))
        .any(|r| r == Reg::PC);
    if uses_pc && !t.options.define_unpredictable_behaviour {
        return t.unpredictable_instruction();
    }

    let shift = ShiftType::from_bits(f.get('r'));
    let rm = t.read_reg_or_pc(f.reg('m'));
    let rs = t.read_reg_or_pc(f.reg('s'));
    let amount = t.ir.least_significant_byte(rs);
    let carry_in = t.ir.get_c_flag();
    let (operand2, carry) = t.ir.emit_reg_shift(rm, shift, amount, carry_in);
    let operand1 = op
        .has_operand1()
        .then(|| t.read_reg_or_pc(f.reg('n')));
    let dest = (!op.is_compare()).then(|| f.reg('d'));
    dp_common(t, op, set_flags, dest, operand1, operand2, Some(carry))
}

fn dp_common(
    t: &mut ArmTranslator,
    op: DpOp,
    set_flags: bool,
    dest: Option<Reg>,
    operand1: Option<Value>,
    operand2: Value,
    shifter_carry: Option<Value>,
) -> bool {
    let rn = operand1.unwrap_or(Value::Void);
    let result = match op {
        DpOp::And | DpOp::Tst => t.ir.and(rn, operand2),
        DpOp::Eor | DpOp::Teq => t.ir.eor(rn, operand2),
        DpOp::Orr => t.ir.orr(rn, operand2),
        DpOp::Bic => {
            let mask = t.ir.not(operand2);
            t.ir.and(rn, mask)
        }
        DpOp::Mov => operand2,
        DpOp::Mvn => t.ir.not(operand2),
        DpOp::Add | DpOp::Cmn => t.ir.add_with_carry(rn, operand2, Value::u1(false)),
        DpOp::Sub | DpOp::Cmp => t.ir.sub_with_carry(rn, operand2, Value::u1(true)),
        DpOp::Rsb => t.ir.sub_with_carry(operand2, rn, Value::u1(true)),
        DpOp::Adc => {
            let c = t.ir.get_c_flag();
            t.ir.add_with_carry(rn, operand2, c)
        }
        DpOp::Sbc => {
            let c = t.ir.get_c_flag();
            t.ir.sub_with_carry(rn, operand2, c)
        }
        DpOp::Rsc => {
            let c = t.ir.get_c_flag();
            t.ir.sub_with_carry(operand2, rn, c)
        }
    };

    if let Some(d) = dest {
        if d == Reg::PC {
            if set_flags {
                // SUBS PC, LR-class exception return; not a user-mode
                // operation.
                return t.unpredictable_instruction();
            }
            t.ir.branch_write_pc(result);
            t.ir.set_terminal(Terminal::ReturnToDispatch);
            return false;
        }
        t.ir.set_register(d, result);
    }

    if set_flags {
        let n = t.ir.most_significant_bit(result);
        t.ir.set_n_flag(n);
        let z = t.ir.is_zero(result);
        t.ir.set_z_flag(z);
        if op.is_arithmetic() {
            let c = t.ir.carry_from(result);
            t.ir.set_c_flag(c);
            let v = t.ir.overflow_from(result);
            t.ir.set_v_flag(v);
        } else if let Some(carry) = shifter_carry {
            t.ir.set_c_flag(carry);
        }
    }
    true
}

macro_rules! dp_handlers {
    ($($imm:ident, $reg:ident, $rsr:ident => $op:ident;)*) => {
        $(
            pub(super) fn $imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
                dp_imm(t, f, DpOp::$op)
            }
            pub(super) fn $reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
                dp_reg(t, f, DpOp::$op)
            }
            pub(super) fn $rsr(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
                dp_rsr(t, f, DpOp::$op)
            }
        )*
    };
}

dp_handlers! {
    and_imm, and_reg, and_rsr => And;
    eor_imm, eor_reg, eor_rsr => Eor;
    sub_imm, sub_reg, sub_rsr => Sub;
    rsb_imm, rsb_reg, rsb_rsr => Rsb;
    add_imm, add_reg, add_rsr => Add;
    adc_imm, adc_reg, adc_rsr => Adc;
    sbc_imm, sbc_reg, sbc_rsr => Sbc;
    rsc_imm, rsc_reg, rsc_rsr => Rsc;
    tst_imm, tst_reg, tst_rsr => Tst;
    teq_imm, teq_reg, teq_rsr => Teq;
    cmp_imm, cmp_reg, cmp_rsr => Cmp;
    cmn_imm, cmn_reg, cmn_rsr => Cmn;
    orr_imm, orr_reg, orr_rsr => Orr;
    mov_imm, mov_reg, mov_rsr => Mov;
    bic_imm, bic_reg, bic_rsr => Bic;
    mvn_imm, mvn_reg, mvn_rsr => Mvn;
}
