use gale_a32::decoder::Fields;
use gale_a32::{Psr, Reg};
use gale_ir::Value;

use super::ArmTranslator;

const MASK_F: u32 = 0b1000;
const MASK_S: u32 = 0b0100;

// MRS <Rd>, CPSR
pub(super) fn mrs(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let d = f.reg('d');
    if d == Reg::PC {
        return t.unpredictable_instruction();
    }
    let cpsr = t.ir.get_cpsr();
    t.ir.set_register(d, cpsr);
    true
}

// MSR CPSR_<fields>, #<imm>
//
// User mode can write the flags (f) and status (s) fields; the execution
// state and control fields are privileged and ignored.
pub(super) fn msr_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let mask = f.get('m');
    let imm32 = f.get('v').rotate_right(2 * f.get('r'));
    if mask & MASK_F != 0 {
        t.ir
            .set_cpsr_nzcvq(Value::u32(imm32 & (Psr::NZCV_MASK | Psr::Q_MASK)));
    }
    if mask & MASK_S != 0 {
        t.ir.set_ge_flags(Value::u32((imm32 >> 16) & 0xF));
    }
    true
}

// MSR CPSR_<fields>, <Rn>
pub(super) fn msr_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let n = f.reg('n');
    if n == Reg::PC {
        return t.unpredictable_instruction();
    }
    let mask = f.get('m');
    let value = t.ir.get_register(n);
    if mask & MASK_F != 0 {
        let flags = t.ir.and(value, Value::u32(Psr::NZCV_MASK | Psr::Q_MASK));
        t.ir.set_cpsr_nzcvq(flags);
    }
    if mask & MASK_S != 0 {
        let shifted = t.ir.lsr(value, Value::u8(16), Value::u1(false));
        let nibble = t.ir.and(shifted, Value::u32(0xF));
        t.ir.set_ge_flags(nibble);
    }
    true
}
