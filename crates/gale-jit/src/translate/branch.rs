use gale_a32::decoder::Fields;
use gale_a32::Reg;
use gale_ir::{Terminal, Value};

use super::ArmTranslator;

fn branch_target(t: &ArmTranslator, imm24: u32) -> u32 {
    let offset = ((imm24 << 8) as i32) >> 6; // sign-extend, times four
    t.ir
        .current_location
        .pc()
        .wrapping_add(8)
        .wrapping_add(offset as u32)
}

// B <label>
pub(super) fn b(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let target = branch_target(t, f.get('v'));
    let target = t.ir.current_location.with_pc(target);
    t.ir.set_terminal(Terminal::LinkBlock { target });
    false
}

// BL <label>
pub(super) fn bl(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let return_location = t.ir.current_location.advance_pc(4);
    t.ir.push_rsb(return_location);
    t.ir
        .set_register(Reg::LR, Value::u32(return_location.pc()));
    let target = branch_target(t, f.get('v'));
    let target = t.ir.current_location.with_pc(target);
    t.ir.set_terminal(Terminal::LinkBlock { target });
    false
}

// BX <Rm>
pub(super) fn bx(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let m = f.reg('m');
    let value = t.read_reg_or_pc(m);
    t.ir.bx_write_pc(value);
    // Returns through LR hit the return stack; anything else goes through
    // the fast-dispatch table.
    t.ir.set_terminal(if m == Reg::LR {
        Terminal::PopRsbHint
    } else {
        Terminal::FastDispatchHint
    });
    false
}

// BLX <Rm>
pub(super) fn blx_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let m = f.reg('m');
    if m == Reg::PC {
        return t.unpredictable_instruction();
    }
    let return_location = t.ir.current_location.advance_pc(4);
    t.ir.push_rsb(return_location);
    t.ir
        .set_register(Reg::LR, Value::u32(return_location.pc()));
    let value = t.ir.get_register(m);
    t.ir.bx_write_pc(value);
    t.ir.set_terminal(Terminal::FastDispatchHint);
    false
}
