use gale_a32::decoder::Fields;
use gale_a32::{Cond, Exception};
use gale_ir::{Terminal, Value};

use super::ArmTranslator;

// BKPT #<imm16>
pub(super) fn bkpt(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    if f.cond() != Cond::Al && !t.options.define_unpredictable_behaviour {
        return t.unpredictable_instruction();
    }
    // UNPREDICTABLE: the instruction executes conditionally.

    t.ir.exception_raised(Exception::Breakpoint);
    t.ir
        .set_terminal(Terminal::CheckHalt(Box::new(Terminal::ReturnToDispatch)));
    false
}

// SVC<c> #<imm24>
pub(super) fn svc(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let imm32 = f.get('v');
    let return_location = t.ir.current_location.advance_pc(4);
    t.ir.push_rsb(return_location);
    t.ir.branch_write_pc(Value::u32(return_location.pc()));
    t.ir.call_supervisor(Value::u32(imm32));
    t.ir
        .set_terminal(Terminal::CheckHalt(Box::new(Terminal::PopRsbHint)));
    false
}

// UDF #<imm16>
pub(super) fn udf(t: &mut ArmTranslator, _f: &Fields<'_>) -> bool {
    if t.options.define_undefined_behaviour_in_udf {
        t.undefined_instruction()
    } else {
        t.interpret_this_instruction()
    }
}
