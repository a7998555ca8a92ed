use gale_a32::decoder::Fields;
use gale_a32::Reg;
use gale_ir::Value;

use super::ArmTranslator;

fn rotated_operand(t: &mut ArmTranslator, f: &Fields<'_>) -> Option<(Reg, Value)> {
    let d = f.reg('d');
    let m = f.reg('m');
    if d == Reg::PC || m == Reg::PC {
        return None;
    }
    let rm = t.ir.get_register(m);
    let rotation = f.get('r') * 8;
    let rotated = if rotation == 0 {
        rm
    } else {
        t.ir.ror(rm, Value::u8(rotation as u8), Value::u1(false))
    };
    Some((d, rotated))
}

// SXTB <Rd>, <Rm>{, ROR #n}
pub(super) fn sxtb(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, value)) = rotated_operand(t, f) else {
        return t.unpredictable_instruction();
    };
    let byte = t.ir.least_significant_byte(value);
    let result = t.ir.sign_extend_byte(byte);
    t.ir.set_register(d, result);
    true
}

// SXTH <Rd>, <Rm>{, ROR #n}
pub(super) fn sxth(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, value)) = rotated_operand(t, f) else {
        return t.unpredictable_instruction();
    };
    let half = t.ir.least_significant_half(value);
    let result = t.ir.sign_extend_half(half);
    t.ir.set_register(d, result);
    true
}

// UXTB <Rd>, <Rm>{, ROR #n}
pub(super) fn uxtb(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, value)) = rotated_operand(t, f) else {
        return t.unpredictable_instruction();
    };
    let byte = t.ir.least_significant_byte(value);
    let result = t.ir.zero_extend_byte(byte);
    t.ir.set_register(d, result);
    true
}

// UXTH <Rd>, <Rm>{, ROR #n}
pub(super) fn uxth(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, value)) = rotated_operand(t, f) else {
        return t.unpredictable_instruction();
    };
    let half = t.ir.least_significant_half(value);
    let result = t.ir.zero_extend_half(half);
    t.ir.set_register(d, result);
    true
}
