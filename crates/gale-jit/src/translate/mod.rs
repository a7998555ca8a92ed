//! Front-end translator: lifts a contiguous run of guest instructions into
//! one IR block.
//!
//! Translation walks guest words from the starting descriptor, dispatching
//! each through the decode tables to a visitor method that emits IR. A block
//! ends at a control-flow instruction, at the size cap, when a conditional
//! run closes, or when the visitor bails to the interpreter.

use std::sync::OnceLock;

use gale_a32::decoder::{DecodeTable, Fields};
use gale_a32::{Cond, Exception, LocationDescriptor, Reg};
use gale_ir::{Block, IrBuilder, Terminal, Value};

mod branch;
mod data_processing;
mod exception_generating;
mod extension;
mod load_store;
mod misc;
mod multiply;
mod parallel;
mod status_register;
mod tables;

/// Translation-policy record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationOptions {
    /// Give UNPREDICTABLE encodings a documented fallback behaviour instead
    /// of bailing to the interpreter.
    pub define_unpredictable_behaviour: bool,
    /// Make UDF raise UndefinedInstruction instead of bailing to the
    /// interpreter.
    pub define_undefined_behaviour_in_udf: bool,
}

/// Heuristic size cap per block.
pub(crate) const MAX_BLOCK_INSTRUCTIONS: u64 = 64;

pub(crate) type Handler = fn(&mut ArmTranslator, &Fields<'_>) -> bool;

fn arm_table() -> &'static DecodeTable<Handler> {
    static TABLE: OnceLock<DecodeTable<Handler>> = OnceLock::new();
    TABLE.get_or_init(tables::arm_table)
}

fn unconditional_table() -> &'static DecodeTable<Handler> {
    static TABLE: OnceLock<DecodeTable<Handler>> = OnceLock::new();
    TABLE.get_or_init(tables::unconditional_table)
}

/// Translate one basic block starting at `descriptor`.
///
/// `read_code` is the consumer's instruction fetch; it must be stable for a
/// given address until that address is invalidated.
pub fn translate(
    descriptor: LocationDescriptor,
    options: TranslationOptions,
    read_code: &mut dyn FnMut(u32) -> u32,
) -> Block {
    // Thumb state is maintained in the descriptor but not translated.
    if descriptor.thumb() {
        let mut block = Block::new(descriptor);
        block.cycle_count = 1;
        block.set_terminal(Terminal::Interpret {
            next: descriptor,
            num_instructions: 1,
        });
        return block;
    }

    let mut t = ArmTranslator {
        ir: IrBuilder::new(descriptor),
        options,
        cond_state: ConditionalState::None,
    };

    loop {
        t.ir.wrote_flags = false;
        let word = read_code(t.ir.current_location.pc());
        match t.translate_instruction(word) {
            Step::Continue => {
                t.ir.block_mut().cycle_count += 1;
                t.ir.current_location = t.ir.current_location.advance_pc(4);
                // A flag write would stale the entry guard for the rest of a
                // conditional run, so the run ends after this instruction.
                let in_cond_run = matches!(t.cond_state, ConditionalState::Translating);
                if (in_cond_run && t.ir.wrote_flags)
                    || t.ir.block().cycle_count >= MAX_BLOCK_INSTRUCTIONS
                {
                    let next = t.ir.current_location;
                    t.ir.set_terminal(Terminal::LinkBlock { target: next });
                    break;
                }
            }
            Step::End => {
                t.ir.block_mut().cycle_count += 1;
                t.ir.current_location = t.ir.current_location.advance_pc(4);
                break;
            }
            Step::StopBefore => {
                let here = t.ir.current_location;
                t.ir.set_terminal(Terminal::LinkBlock { target: here });
                break;
            }
        }
    }

    let block = t.ir.into_block();
    debug_assert!(block.has_terminal());
    tracing::trace!(
        location = %block.location,
        instructions = block.cycle_count,
        micro_ops = block.live_count(),
        "translated block"
    );
    block
}

enum Step {
    /// Keep translating at the next PC.
    Continue,
    /// The instruction terminated the block (terminal already set).
    End,
    /// The block must end *before* this instruction; nothing was emitted.
    StopBefore,
}

enum ConditionalState {
    None,
    Translating,
}

pub(crate) struct ArmTranslator {
    pub(crate) ir: IrBuilder,
    pub(crate) options: TranslationOptions,
    cond_state: ConditionalState,
}

impl ArmTranslator {
    fn translate_instruction(&mut self, word: u32) -> Step {
        if word >> 28 == 0xF {
            return self.translate_unconditional(word);
        }

        let cond = Cond::from_bits(word >> 28);
        if !self.begin_instruction(cond) {
            return Step::StopBefore;
        }

        let cont = match arm_table().decode_conditional(word) {
            Some(matcher) => (matcher.handler())(self, &matcher.fields(word)),
            None => self.undefined_instruction(),
        };
        if cont {
            Step::Continue
        } else {
            Step::End
        }
    }

    fn translate_unconditional(&mut self, word: u32) -> Step {
        // A conditional run never extends over the unconditional space.
        if matches!(self.cond_state, ConditionalState::Translating) {
            return Step::StopBefore;
        }
        let cont = match unconditional_table().decode(word) {
            Some(matcher) => (matcher.handler())(self, &matcher.fields(word)),
            None => self.undefined_instruction(),
        };
        if cont {
            Step::Continue
        } else {
            Step::End
        }
    }

    /// Handle the encoded condition. Returns false when the block has to end
    /// before the current instruction.
    fn begin_instruction(&mut self, cond: Cond) -> bool {
        match self.cond_state {
            ConditionalState::None => {
                if cond == Cond::Al {
                    return true;
                }
                // A guard covers the whole block, so a conditional
                // instruction can only start one on an empty block.
                if self.ir.block().cycle_count > 0 {
                    return false;
                }
                let failed = self.ir.current_location.advance_pc(4);
                let block = self.ir.block_mut();
                block.cond = cond;
                block.cond_failed = Some(failed);
                block.cond_failed_cycle_count = 1;
                self.cond_state = ConditionalState::Translating;
                true
            }
            ConditionalState::Translating => {
                if cond != self.ir.block().cond {
                    return false;
                }
                let failed = self.ir.current_location.advance_pc(4);
                let block = self.ir.block_mut();
                block.cond_failed = Some(failed);
                block.cond_failed_cycle_count += 1;
                true
            }
        }
    }

    /// Read a register, materializing the PC as `instruction address + 8`.
    pub(crate) fn read_reg_or_pc(&mut self, reg: Reg) -> Value {
        if reg == Reg::PC {
            self.ir.read_pc()
        } else {
            self.ir.get_register(reg)
        }
    }

    /// Unknown or architecturally undefined encoding: raise through the
    /// consumer and return to the dispatcher.
    pub(crate) fn undefined_instruction(&mut self) -> bool {
        tracing::warn!(
            pc = format_args!("{:#010x}", self.ir.current_location.pc()),
            "undefined instruction"
        );
        self.ir.exception_raised(Exception::UndefinedInstruction);
        self.ir
            .set_terminal(Terminal::CheckHalt(Box::new(Terminal::ReturnToDispatch)));
        false
    }

    /// UNPREDICTABLE encoding with no defined fallback: bail so the
    /// consumer's interpreter can step it.
    pub(crate) fn unpredictable_instruction(&mut self) -> bool {
        self.interpret_this_instruction()
    }

    pub(crate) fn interpret_this_instruction(&mut self) -> bool {
        let next = self.ir.current_location;
        self.ir.set_terminal(Terminal::Interpret {
            next,
            num_instructions: 1,
        });
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gale_a32::{Fpscr, Psr};
    use gale_ir::Opcode;

    const B_DOT: u32 = 0xEAFF_FFFE;

    fn loc(pc: u32) -> LocationDescriptor {
        LocationDescriptor::new(pc, Psr::new(0x1D0), Fpscr::new(0))
    }

    fn translate_words(words: &[u32]) -> Block {
        let mem = words.to_vec();
        translate(loc(0), TranslationOptions::default(), &mut |vaddr| {
            mem.get(vaddr as usize / 4).copied().unwrap_or(B_DOT)
        })
    }

    #[test]
    fn blocks_end_at_branches() {
        let block = translate_words(&[0xE3A0_0005, B_DOT]);
        assert_eq!(block.cycle_count, 2);
        assert_eq!(
            block.terminal(),
            Some(&Terminal::LinkBlock { target: loc(4) })
        );
    }

    #[test]
    fn conditional_run_carries_guard_and_fall_through() {
        // moveq r1, #1; moveq r2, #2; movne r3, #3
        let block = translate_words(&[0x03A0_1001, 0x03A0_2002, 0x13A0_3003]);
        assert_eq!(block.cond, Cond::Eq);
        assert_eq!(block.cond_failed, Some(loc(8)));
        assert_eq!(block.cond_failed_cycle_count, 2);
        assert_eq!(block.cycle_count, 2);
        assert_eq!(
            block.terminal(),
            Some(&Terminal::LinkBlock { target: loc(8) })
        );
    }

    #[test]
    fn flag_writer_ends_a_conditional_run() {
        // addeqs r0, r0, #1; moveq r1, #1
        let block = translate_words(&[0x0290_0001, 0x03A0_1001]);
        assert_eq!(block.cond, Cond::Eq);
        assert_eq!(block.cycle_count, 1);
        assert_eq!(
            block.terminal(),
            Some(&Terminal::LinkBlock { target: loc(4) })
        );
    }

    #[test]
    fn conditional_instruction_cannot_join_a_started_block() {
        // mov r0, #5; moveq r1, #1
        let block = translate_words(&[0xE3A0_0005, 0x03A0_1001]);
        assert_eq!(block.cond, Cond::Al);
        assert_eq!(block.cycle_count, 1);
        assert_eq!(
            block.terminal(),
            Some(&Terminal::LinkBlock { target: loc(4) })
        );
    }

    #[test]
    fn translation_stops_at_the_size_cap() {
        let block = translate_words(&[0xE3A0_0000; 100]);
        assert_eq!(block.cycle_count, MAX_BLOCK_INSTRUCTIONS);
        assert_eq!(
            block.terminal(),
            Some(&Terminal::LinkBlock {
                target: loc(4 * MAX_BLOCK_INSTRUCTIONS as u32)
            })
        );
    }

    #[test]
    fn thumb_locations_bail_to_the_interpreter() {
        let thumb = LocationDescriptor::new(0x100, Psr::new(0x1F0), Fpscr::new(0));
        let block = translate(thumb, TranslationOptions::default(), &mut |_| B_DOT);
        assert_eq!(
            block.terminal(),
            Some(&Terminal::Interpret {
                next: thumb,
                num_instructions: 1
            })
        );
    }

    #[test]
    fn memory_hints_translate_to_nothing() {
        // pld [r1]; mov r0, #5; b .
        let block = translate_words(&[0xF5D1_F000, 0xE3A0_0005, B_DOT]);
        assert_eq!(block.cycle_count, 3);
    }

    #[test]
    fn unknown_encodings_raise_undefined() {
        // cdp p0, ... : coprocessor space, not translated.
        let block = translate_words(&[0xEE00_0000]);
        assert!(block
            .iter_live()
            .any(|(_, inst)| inst.opcode() == Opcode::ExceptionRaised));
        assert_eq!(
            block.terminal(),
            Some(&Terminal::CheckHalt(Box::new(Terminal::ReturnToDispatch)))
        );
    }

    #[test]
    fn udf_policy_selects_the_fallback() {
        let strict = translate_words(&[0xE7F0_00F0]);
        assert!(matches!(
            strict.terminal(),
            Some(Terminal::Interpret { .. })
        ));

        let mem = [0xE7F0_00F0u32];
        let defined = translate(
            loc(0),
            TranslationOptions {
                define_undefined_behaviour_in_udf: true,
                ..Default::default()
            },
            &mut |vaddr| mem.get(vaddr as usize / 4).copied().unwrap_or(B_DOT),
        );
        assert!(defined
            .iter_live()
            .any(|(_, inst)| inst.opcode() == Opcode::ExceptionRaised));
    }
}
