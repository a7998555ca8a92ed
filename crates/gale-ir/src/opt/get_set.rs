use crate::{Block, InstId, Opcode, Value};

/// Per-storage-cell tracking state.
#[derive(Default, Clone, Copy)]
struct Tracked {
    /// Value known to be in the cell at this point of the sweep.
    value: Option<Value>,
    /// The most recent set, while nothing has observed it yet.
    unread_set: Option<InstId>,
}

impl Tracked {
    fn write(&mut self, block: &mut Block, setter: InstId, value: Value) {
        if let Some(prev) = self.unread_set.take() {
            block.inst_mut(prev).invalidate();
        }
        self.value = Some(value);
        self.unread_set = Some(setter);
    }

    fn read(&mut self, block: &mut Block, getter: InstId) {
        match self.value {
            // The get is folded away entirely, so it does not count as an
            // observation of the tracked set; a later overwrite may still
            // drop that set.
            Some(v) => {
                block.replace_uses(getter, v);
                block.inst_mut(getter).invalidate();
            }
            None => {
                self.value = Some(Value::Inst(getter));
                self.unread_set = None;
            }
        }
    }

    fn observe(&mut self) {
        self.unread_set = None;
    }
}

const FLAG_N: usize = 0;
const FLAG_Z: usize = 1;
const FLAG_C: usize = 2;
const FLAG_V: usize = 3;
const FLAG_GE: usize = 4;

/// Fold redundant register and flag read/write pairs.
///
/// A get after a set forwards the set's source value; a second get forwards
/// the first; a set that is overwritten before anything observes it is
/// dropped. Supervisor calls and exception raises count as observers, since
/// the consumer runs between micro-ops at those points.
pub fn get_set_elimination(block: &mut Block) {
    let mut regs = [Tracked::default(); 15];
    let mut flags = [Tracked::default(); 5];

    for idx in 0..block.len() {
        let id = InstId::new(idx);
        let inst = block.inst(id);
        if inst.is_dead() {
            continue;
        }
        let opcode = inst.opcode();
        let arg0 = inst.args().first().copied();
        let arg1 = inst.args().get(1).copied();

        match opcode {
            Opcode::SetRegister => {
                let reg = arg0.and_then(|a| a.reg()).expect("set_register operand");
                regs[reg.index()].write(block, id, arg1.expect("set_register value"));
            }
            Opcode::GetRegister => {
                let reg = arg0.and_then(|a| a.reg()).expect("get_register operand");
                regs[reg.index()].read(block, id);
            }
            Opcode::SetNFlag => flags[FLAG_N].write(block, id, arg0.unwrap()),
            Opcode::SetZFlag => flags[FLAG_Z].write(block, id, arg0.unwrap()),
            Opcode::SetCFlag => flags[FLAG_C].write(block, id, arg0.unwrap()),
            Opcode::SetVFlag => flags[FLAG_V].write(block, id, arg0.unwrap()),
            Opcode::SetGeFlags => flags[FLAG_GE].write(block, id, arg0.unwrap()),
            Opcode::GetCFlag => flags[FLAG_C].read(block, id),
            Opcode::SetCpsrNzcvq => {
                // Writes N,Z,C,V (and Q) wholesale: pending per-flag sets are
                // dead, and the individual values are no longer known.
                for flag in &mut flags[FLAG_N..=FLAG_V] {
                    if let Some(prev) = flag.unread_set.take() {
                        block.inst_mut(prev).invalidate();
                    }
                    flag.value = None;
                }
            }
            Opcode::GetCpsr | Opcode::CallSupervisor | Opcode::ExceptionRaised => {
                for reg in &mut regs {
                    reg.observe();
                }
                for flag in &mut flags {
                    flag.observe();
                }
            }
            _ => {}
        }
    }
}
