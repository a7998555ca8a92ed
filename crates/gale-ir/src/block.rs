use core::fmt;

use gale_a32::{Cond, LocationDescriptor};

use crate::{Inst, InstId, Opcode, Terminal, Value};

/// A translated basic block.
///
/// `cond` guards the whole instruction list: emitted code enters the body
/// only when the condition holds against the flags at block entry, and
/// otherwise transfers to `cond_failed`, charging
/// `cond_failed_cycle_count` cycles for the skipped instructions.
#[derive(Debug, Clone)]
pub struct Block {
    pub location: LocationDescriptor,
    pub cond: Cond,
    pub cond_failed: Option<LocationDescriptor>,
    pub cond_failed_cycle_count: u64,
    pub cycle_count: u64,
    insts: Vec<Inst>,
    terminal: Option<Terminal>,
}

impl Block {
    pub fn new(location: LocationDescriptor) -> Block {
        Block {
            location,
            cond: Cond::Al,
            cond_failed: None,
            cond_failed_cycle_count: 0,
            cycle_count: 0,
            insts: Vec::new(),
            terminal: None,
        }
    }

    pub fn push_inst(&mut self, inst: Inst) -> InstId {
        let id = InstId::new(self.insts.len());
        self.insts.push(inst);
        id
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.index()]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Inst {
        &mut self.insts[id.index()]
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    /// All instruction slots, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = (InstId, &Inst)> {
        self.insts
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstId::new(i), inst))
    }

    /// Live instructions only.
    pub fn iter_live(&self) -> impl Iterator<Item = (InstId, &Inst)> {
        self.iter().filter(|(_, inst)| !inst.is_dead())
    }

    pub fn live_count(&self) -> usize {
        self.iter_live().count()
    }

    /// Rewrite every use of `from` to `to`.
    pub fn replace_uses(&mut self, from: InstId, to: Value) {
        for inst in &mut self.insts {
            for arg in inst.args_mut() {
                if *arg == Value::Inst(from) {
                    *arg = to;
                }
            }
        }
    }

    /// Per-instruction use counts over the live instructions.
    pub fn use_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.insts.len()];
        for (_, inst) in self.iter_live() {
            for arg in inst.args() {
                if let Value::Inst(id) = arg {
                    counts[id.index()] += 1;
                }
            }
        }
        counts
    }

    pub fn terminal(&self) -> Option<&Terminal> {
        self.terminal.as_ref()
    }

    pub fn has_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn set_terminal(&mut self, terminal: Terminal) {
        assert!(self.terminal.is_none(), "block already has a terminal");
        self.terminal = Some(terminal);
    }

    /// Swap the terminal in place (the interpret-merge pass grows one).
    pub fn replace_terminal(&mut self, terminal: Terminal) {
        self.terminal = Some(terminal);
    }

    /// True when the block's only observable behaviour is its terminal:
    /// every live instruction is an `ExceptionRaised` or pure.
    pub fn is_interpret_only(&self) -> bool {
        matches!(self.terminal, Some(Terminal::Interpret { .. }))
            && self
                .iter_live()
                .all(|(_, inst)| inst.opcode() == Opcode::ExceptionRaised || inst.opcode().is_pure())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "block {} cond {:?}:", self.location, self.cond)?;
        for (id, inst) in self.iter_live() {
            writeln!(f, "  %{} = {}", id.index(), inst)?;
        }
        match &self.terminal {
            Some(t) => writeln!(f, "  -> {t:?}"),
            None => writeln!(f, "  -> <unset>"),
        }
    }
}
