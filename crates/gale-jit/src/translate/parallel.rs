use gale_a32::decoder::Fields;
use gale_a32::Reg;
use gale_ir::Value;

use super::ArmTranslator;

fn operands(t: &mut ArmTranslator, f: &Fields<'_>) -> Option<(Reg, Value, Value)> {
    let d = f.reg('d');
    let n = f.reg('n');
    let m = f.reg('m');
    if d == Reg::PC || n == Reg::PC || m == Reg::PC {
        return None;
    }
    let rn = t.ir.get_register(n);
    let rm = t.ir.get_register(m);
    Some((d, rn, rm))
}

// SASX <Rd>, <Rn>, <Rm>
pub(super) fn sasx(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, rn, rm)) = operands(t, f) else {
        return t.unpredictable_instruction();
    };
    let result = t.ir.packed_add_sub_s16(rn, rm);
    t.ir.set_register(d, result);
    let ge = t.ir.ge_from(result);
    t.ir.set_ge_flags(ge);
    true
}

// SSAX <Rd>, <Rn>, <Rm>
pub(super) fn ssax(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, rn, rm)) = operands(t, f) else {
        return t.unpredictable_instruction();
    };
    let result = t.ir.packed_sub_add_s16(rn, rm);
    t.ir.set_register(d, result);
    let ge = t.ir.ge_from(result);
    t.ir.set_ge_flags(ge);
    true
}

// UASX <Rd>, <Rn>, <Rm>
pub(super) fn uasx(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, rn, rm)) = operands(t, f) else {
        return t.unpredictable_instruction();
    };
    let result = t.ir.packed_add_sub_u16(rn, rm);
    t.ir.set_register(d, result);
    let ge = t.ir.ge_from(result);
    t.ir.set_ge_flags(ge);
    true
}

// USAX <Rd>, <Rn>, <Rm>
pub(super) fn usax(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, rn, rm)) = operands(t, f) else {
        return t.unpredictable_instruction();
    };
    let result = t.ir.packed_sub_add_u16(rn, rm);
    t.ir.set_register(d, result);
    let ge = t.ir.ge_from(result);
    t.ir.set_ge_flags(ge);
    true
}

// SHASX <Rd>, <Rn>, <Rm>: halving form, GE flags unaffected.
pub(super) fn shasx(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, rn, rm)) = operands(t, f) else {
        return t.unpredictable_instruction();
    };
    let result = t.ir.packed_halving_add_sub_s16(rn, rm);
    t.ir.set_register(d, result);
    true
}

// SHSAX <Rd>, <Rn>, <Rm>
pub(super) fn shsax(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let Some((d, rn, rm)) = operands(t, f) else {
        return t.unpredictable_instruction();
    };
    let result = t.ir.packed_halving_sub_add_s16(rn, rm);
    t.ir.set_register(d, result);
    true
}
