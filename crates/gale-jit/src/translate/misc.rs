use gale_a32::decoder::Fields;
use gale_a32::Reg;

use super::ArmTranslator;

// CLZ <Rd>, <Rm>
pub(super) fn clz(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let d = f.reg('d');
    let m = f.reg('m');
    if d == Reg::PC || m == Reg::PC {
        return t.unpredictable_instruction();
    }
    let rm = t.ir.get_register(m);
    let result = t.ir.count_leading_zeros(rm);
    t.ir.set_register(d, result);
    true
}

// PLD and friends: memory hints have no architectural effect here.
pub(super) fn hint(_t: &mut ArmTranslator, _f: &Fields<'_>) -> bool {
    true
}
