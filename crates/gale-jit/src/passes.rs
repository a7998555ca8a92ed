//! Optimizer passes that need the consumer callbacks.

use gale_ir::{opt, Block, InstId, Opcode, Terminal, Value};

use crate::translate::{translate, TranslationOptions, MAX_BLOCK_INSTRUCTIONS};
use crate::UserCallbacks;

/// Substitute loads from constant addresses in read-only memory with the
/// loaded value.
pub(crate) fn constant_memory_reads(block: &mut Block, callbacks: &mut dyn UserCallbacks) {
    let candidates: Vec<(InstId, Opcode, u32)> = block
        .iter_live()
        .filter_map(|(id, inst)| {
            let opcode = inst.opcode();
            if !matches!(
                opcode,
                Opcode::ReadMemory8
                    | Opcode::ReadMemory16
                    | Opcode::ReadMemory32
                    | Opcode::ReadMemory64
            ) {
                return None;
            }
            inst.arg(0).imm_u32().map(|addr| (id, opcode, addr))
        })
        .collect();

    for (id, opcode, addr) in candidates {
        if !callbacks.is_read_only_memory(addr) {
            continue;
        }
        let value = match opcode {
            Opcode::ReadMemory8 => Value::u8(callbacks.memory_read_8(addr)),
            Opcode::ReadMemory16 => Value::u16(callbacks.memory_read_16(addr)),
            Opcode::ReadMemory32 => Value::u32(callbacks.memory_read_32(addr)),
            _ => Value::u64(callbacks.memory_read_64(addr)),
        };
        block.replace_uses(id, value);
        block.inst_mut(id).invalidate();
    }
}

/// Grow an *Interpret* terminal over following instructions that would also
/// bail, so the consumer steps one longer run instead of bouncing through
/// the dispatcher per instruction.
pub(crate) fn merge_interpret_blocks(
    block: &mut Block,
    options: TranslationOptions,
    callbacks: &mut dyn UserCallbacks,
) {
    let Some(Terminal::Interpret {
        next,
        num_instructions,
    }) = block.terminal().cloned()
    else {
        return;
    };

    let mut num = num_instructions;
    while (num as u64) < MAX_BLOCK_INSTRUCTIONS {
        let probe_location = next.advance_pc(num as u32 * 4);
        let probe = translate(probe_location, options, &mut |vaddr| {
            callbacks.memory_read_code(vaddr)
        });
        let probe_bails = probe.is_interpret_only()
            && matches!(
                probe.terminal(),
                Some(Terminal::Interpret { next: n, .. }) if *n == probe_location
            );
        if !probe_bails {
            break;
        }
        num += 1;
    }

    if num != num_instructions {
        tracing::trace!(
            location = %next,
            merged = num - num_instructions,
            "merged interpreter run"
        );
        block.cycle_count += (num - num_instructions) as u64;
        block.replace_terminal(Terminal::Interpret {
            next,
            num_instructions: num,
        });
    }
}

/// The fixed pipeline applied to every freshly translated block, in order.
/// A verification failure is a fatal bug in the translator or a pass, not a
/// guest-input error.
pub(crate) fn run_pipeline(
    block: &mut Block,
    options: TranslationOptions,
    callbacks: &mut dyn UserCallbacks,
) {
    opt::get_set_elimination(block);
    opt::dead_code_elimination(block);
    constant_memory_reads(block, callbacks);
    opt::constant_propagation(block);
    opt::dead_code_elimination(block);
    merge_interpret_blocks(block, options, callbacks);
    if let Err(err) = opt::verify(block) {
        panic!("IR verification failed at {}: {err}", block.location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gale_a32::{Exception, Fpscr, LocationDescriptor, Psr, Reg};
    use gale_ir::IrBuilder;

    /// Little-endian ROM below `rom_limit`, RAM above it.
    struct RomEnv {
        rom_limit: u32,
        mem: Vec<u8>,
    }

    impl RomEnv {
        fn new(rom_limit: u32) -> RomEnv {
            RomEnv {
                rom_limit,
                mem: vec![0; 0x1000],
            }
        }
    }

    impl UserCallbacks for RomEnv {
        fn memory_read_code(&mut self, vaddr: u32) -> u32 {
            self.memory_read_32(vaddr)
        }

        fn memory_read_8(&mut self, vaddr: u32) -> u8 {
            self.mem[vaddr as usize % self.mem.len()]
        }

        fn memory_read_16(&mut self, vaddr: u32) -> u16 {
            u16::from(self.memory_read_8(vaddr)) | u16::from(self.memory_read_8(vaddr + 1)) << 8
        }

        fn memory_read_32(&mut self, vaddr: u32) -> u32 {
            u32::from(self.memory_read_16(vaddr)) | u32::from(self.memory_read_16(vaddr + 2)) << 16
        }

        fn memory_read_64(&mut self, vaddr: u32) -> u64 {
            u64::from(self.memory_read_32(vaddr)) | u64::from(self.memory_read_32(vaddr + 4)) << 32
        }

        fn memory_write_8(&mut self, vaddr: u32, value: u8) {
            let at = vaddr as usize % self.mem.len();
            self.mem[at] = value;
        }

        fn memory_write_16(&mut self, _vaddr: u32, _value: u16) {}
        fn memory_write_32(&mut self, _vaddr: u32, _value: u32) {}
        fn memory_write_64(&mut self, _vaddr: u32, _value: u64) {}
        fn add_ticks(&mut self, _ticks: u64) {}

        fn get_ticks_remaining(&mut self) -> u64 {
            0
        }

        fn call_supervisor(&mut self, _swi: u32) {}
        fn exception_raised(&mut self, _pc: u32, _exception: Exception) {}
        fn interpreter_fallback(&mut self, _pc: u32, _num: usize, _state: &mut crate::JitState) {}

        fn is_read_only_memory(&mut self, vaddr: u32) -> bool {
            vaddr < self.rom_limit
        }
    }

    fn builder() -> IrBuilder {
        IrBuilder::new(LocationDescriptor::new(0, Psr::new(0x1D0), Fpscr::new(0)))
    }

    #[test]
    fn rom_loads_become_constants() {
        let mut env = RomEnv::new(0x100);
        env.mem[0x40..0x44].copy_from_slice(&0x1122_3344u32.to_le_bytes());

        let mut ir = builder();
        let data = ir.read_memory_32(Value::u32(0x40));
        ir.set_register(Reg::R0, data);
        ir.set_terminal(Terminal::ReturnToDispatch);
        let mut block = ir.into_block();

        constant_memory_reads(&mut block, &mut env);

        let set = block
            .iter_live()
            .find(|(_, inst)| inst.opcode() == Opcode::SetRegister)
            .unwrap()
            .1;
        assert_eq!(set.arg(1), Value::u32(0x1122_3344));
        assert!(!block
            .iter_live()
            .any(|(_, inst)| inst.opcode() == Opcode::ReadMemory32));
    }

    #[test]
    fn ram_loads_are_left_alone() {
        let mut env = RomEnv::new(0x100);

        let mut ir = builder();
        let data = ir.read_memory_32(Value::u32(0x800));
        ir.set_register(Reg::R0, data);
        ir.set_terminal(Terminal::ReturnToDispatch);
        let mut block = ir.into_block();

        constant_memory_reads(&mut block, &mut env);

        assert!(block
            .iter_live()
            .any(|(_, inst)| inst.opcode() == Opcode::ReadMemory32));
    }

    #[test]
    fn interpret_runs_merge_across_consecutive_bails() {
        // Two UDFs then an ordinary instruction.
        let mut env = RomEnv::new(0);
        for (i, word) in [0xE7F0_00F0u32, 0xE7F0_00F0, 0xE3A0_0005]
            .iter()
            .enumerate()
        {
            env.mem[4 * i..4 * i + 4].copy_from_slice(&word.to_le_bytes());
        }

        let options = TranslationOptions::default();
        let mut block = translate(
            LocationDescriptor::new(0, Psr::new(0x1D0), Fpscr::new(0)),
            options,
            &mut |vaddr| env.memory_read_code(vaddr),
        );
        merge_interpret_blocks(&mut block, options, &mut env);

        assert!(matches!(
            block.terminal(),
            Some(Terminal::Interpret {
                num_instructions: 2,
                ..
            })
        ));
        assert_eq!(block.cycle_count, 2);
    }
}
