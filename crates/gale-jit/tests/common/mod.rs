#![allow(dead_code)] // each test binary uses a different slice of this

use gale_a32::Exception;
use gale_jit::{Jit, JitState, UserCallbacks, UserConfig};

pub const MEM_SIZE: usize = 64 * 1024;

/// Flat little-endian RAM plus recorders for everything the core reports.
pub struct TestEnv {
    pub mem: Vec<u8>,
    /// Tick budget handed out by `get_ticks_remaining`.
    pub ticks: u64,
    pub ticks_added: u64,
    /// One entry per `add_ticks` call, i.e. per block exit.
    pub add_ticks_calls: Vec<u64>,
    /// Addresses below this bound count as read-only memory.
    pub rom_limit: u32,
    pub supervisor_calls: Vec<u32>,
    pub exceptions: Vec<(u32, Exception)>,
    pub fallback_calls: Vec<(u32, usize)>,
}

impl Default for TestEnv {
    fn default() -> Self {
        TestEnv {
            mem: vec![0; MEM_SIZE],
            ticks: 0,
            ticks_added: 0,
            add_ticks_calls: Vec::new(),
            rom_limit: 0,
            supervisor_calls: Vec::new(),
            exceptions: Vec::new(),
            fallback_calls: Vec::new(),
        }
    }
}

impl TestEnv {
    pub fn with_code(words: &[u32]) -> TestEnv {
        let mut env = TestEnv::default();
        env.write_code(0, words);
        env
    }

    pub fn write_code(&mut self, addr: u32, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            let at = addr as usize + 4 * i;
            self.mem[at..at + 4].copy_from_slice(&word.to_le_bytes());
        }
    }

    pub fn read_u32(&self, vaddr: u32) -> u32 {
        let at = self.offset(vaddr, 4);
        u32::from_le_bytes(self.mem[at..at + 4].try_into().unwrap())
    }

    pub fn write_u32(&mut self, vaddr: u32, value: u32) {
        let at = self.offset(vaddr, 4);
        self.mem[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn offset(&self, vaddr: u32, len: usize) -> usize {
        let at = vaddr as usize % self.mem.len();
        assert!(at + len <= self.mem.len(), "access past test memory");
        at
    }
}

impl UserCallbacks for TestEnv {
    fn memory_read_code(&mut self, vaddr: u32) -> u32 {
        self.memory_read_32(vaddr)
    }

    fn memory_read_8(&mut self, vaddr: u32) -> u8 {
        self.mem[self.offset(vaddr, 1)]
    }

    fn memory_read_16(&mut self, vaddr: u32) -> u16 {
        let at = self.offset(vaddr, 2);
        u16::from_le_bytes(self.mem[at..at + 2].try_into().unwrap())
    }

    fn memory_read_32(&mut self, vaddr: u32) -> u32 {
        let at = self.offset(vaddr, 4);
        u32::from_le_bytes(self.mem[at..at + 4].try_into().unwrap())
    }

    fn memory_read_64(&mut self, vaddr: u32) -> u64 {
        let at = self.offset(vaddr, 8);
        u64::from_le_bytes(self.mem[at..at + 8].try_into().unwrap())
    }

    fn memory_write_8(&mut self, vaddr: u32, value: u8) {
        let at = self.offset(vaddr, 1);
        self.mem[at] = value;
    }

    fn memory_write_16(&mut self, vaddr: u32, value: u16) {
        let at = self.offset(vaddr, 2);
        self.mem[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn memory_write_32(&mut self, vaddr: u32, value: u32) {
        let at = self.offset(vaddr, 4);
        self.mem[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn memory_write_64(&mut self, vaddr: u32, value: u64) {
        let at = self.offset(vaddr, 8);
        self.mem[at..at + 8].copy_from_slice(&value.to_le_bytes());
    }

    fn add_ticks(&mut self, ticks: u64) {
        self.ticks_added += ticks;
        self.add_ticks_calls.push(ticks);
    }

    fn get_ticks_remaining(&mut self) -> u64 {
        self.ticks
    }

    fn call_supervisor(&mut self, swi: u32) {
        self.supervisor_calls.push(swi);
    }

    fn exception_raised(&mut self, pc: u32, exception: Exception) {
        self.exceptions.push((pc, exception));
    }

    fn interpreter_fallback(&mut self, pc: u32, num_insts: usize, state: &mut JitState) {
        self.fallback_calls.push((pc, num_insts));
        // Stand-in interpreter: skip the instructions.
        state.regs[15] = pc.wrapping_add(4 * num_insts as u32);
    }

    fn is_read_only_memory(&mut self, vaddr: u32) -> bool {
        vaddr < self.rom_limit
    }
}

pub const CPSR_USER: u32 = 0x0000_01D0;

/// A jit over test RAM, CPSR in the usual user-ish state.
pub fn jit_with_code(words: &[u32], ticks: u64) -> Jit<TestEnv> {
    let mut env = TestEnv::with_code(words);
    env.ticks = ticks;
    let mut jit = Jit::new(UserConfig::default(), env);
    jit.set_cpsr(CPSR_USER);
    jit
}
