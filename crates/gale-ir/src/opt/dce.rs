use crate::{Block, InstId, Value};

/// Remove pure instructions whose results are never used.
///
/// A single backward sweep: removing an instruction decrements its
/// operands' use counts, so whole dead chains disappear in one pass.
pub fn dead_code_elimination(block: &mut Block) {
    let mut uses = block.use_counts();

    for idx in (0..block.len()).rev() {
        let id = InstId::new(idx);
        let inst = block.inst(id);
        if inst.is_dead() || !inst.opcode().is_pure() || uses[idx] > 0 {
            continue;
        }
        let args: Vec<Value> = inst.args().to_vec();
        block.inst_mut(id).invalidate();
        for arg in args {
            if let Value::Inst(arg_id) = arg {
                uses[arg_id.index()] -= 1;
            }
        }
    }
}
