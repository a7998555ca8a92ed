use gale_a32::decoder::Fields;
use gale_a32::Reg;
use gale_ir::Value;

use super::ArmTranslator;

// MUL{S} <Rd>, <Rm>, <Rs>
pub(super) fn mul(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let d = f.reg('d');
    let s = f.reg('s');
    let m = f.reg('m');
    if d == Reg::PC || s == Reg::PC || m == Reg::PC {
        return t.unpredictable_instruction();
    }

    let rm = t.ir.get_register(m);
    let rs = t.ir.get_register(s);
    let result = t.ir.mul(rm, rs);
    t.ir.set_register(d, result);
    if f.bit('S') {
        set_nz(t, result);
    }
    true
}

// MLA{S} <Rd>, <Rm>, <Rs>, <Ra>
pub(super) fn mla(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let d = f.reg('d');
    let a = f.reg('a');
    let s = f.reg('s');
    let m = f.reg('m');
    if d == Reg::PC || a == Reg::PC || s == Reg::PC || m == Reg::PC {
        return t.unpredictable_instruction();
    }

    let rm = t.ir.get_register(m);
    let rs = t.ir.get_register(s);
    let product = t.ir.mul(rm, rs);
    let ra = t.ir.get_register(a);
    let result = t.ir.add_with_carry(product, ra, Value::u1(false));
    t.ir.set_register(d, result);
    if f.bit('S') {
        set_nz(t, result);
    }
    true
}

// SMUAD{X} <Rd>, <Rn>, <Rm>: dual signed halfword multiply, products added.
// A signed overflow of the addition sets Q.
pub(super) fn smuad(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let d = f.reg('d');
    let n = f.reg('n');
    let m = f.reg('m');
    if d == Reg::PC || n == Reg::PC || m == Reg::PC {
        return t.unpredictable_instruction();
    }

    let rn = t.ir.get_register(n);
    let mut rm = t.ir.get_register(m);
    if f.bit('M') {
        rm = t.ir.ror(rm, Value::u8(16), Value::u1(false));
    }

    let n_lo_half = t.ir.least_significant_half(rn);
    let n_lo = t.ir.sign_extend_half(n_lo_half);
    let n_hi_half = t.ir.most_significant_half(rn);
    let n_hi = t.ir.sign_extend_half(n_hi_half);
    let m_lo_half = t.ir.least_significant_half(rm);
    let m_lo = t.ir.sign_extend_half(m_lo_half);
    let m_hi_half = t.ir.most_significant_half(rm);
    let m_hi = t.ir.sign_extend_half(m_hi_half);

    let lo_product = t.ir.mul(n_lo, m_lo);
    let hi_product = t.ir.mul(n_hi, m_hi);
    let sum = t.ir.add_with_carry(lo_product, hi_product, Value::u1(false));
    t.ir.set_register(d, sum);
    let q = t.ir.overflow_from(sum);
    t.ir.or_q_flag(q);
    true
}

fn set_nz(t: &mut ArmTranslator, result: Value) {
    let n = t.ir.most_significant_bit(result);
    t.ir.set_n_flag(n);
    let z = t.ir.is_zero(result);
    t.ir.set_z_flag(z);
}
