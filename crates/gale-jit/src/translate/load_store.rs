use gale_a32::decoder::Fields;
use gale_a32::{Reg, ShiftType};
use gale_ir::{Terminal, Value};

use super::ArmTranslator;

#[derive(Clone, Copy)]
struct AddrMode {
    pre: bool,
    add: bool,
    writeback: bool,
}

impl AddrMode {
    fn from_fields(f: &Fields<'_>) -> AddrMode {
        AddrMode {
            pre: f.bit('p'),
            add: f.bit('u'),
            writeback: f.bit('w'),
        }
    }

    /// Post-indexed forms always write the offset address back.
    fn writes_back(self) -> bool {
        !self.pre || self.writeback
    }
}

/// Compute the access address and the optional base writeback value.
fn address(
    t: &mut ArmTranslator,
    base: Value,
    offset: Value,
    mode: AddrMode,
) -> (Value, Option<Value>) {
    let offset_addr = if mode.add {
        t.ir.add_with_carry(base, offset, Value::u1(false))
    } else {
        t.ir.sub_with_carry(base, offset, Value::u1(true))
    };
    let addr = if mode.pre { offset_addr } else { base };
    let writeback = mode.writes_back().then_some(offset_addr);
    (addr, writeback)
}

/// Common unpredictable cases for a single transfer: writeback clobbering
/// the base register or using the PC as a base for writeback forms.
fn base_unpredictable(n: Reg, d: Reg, mode: AddrMode, is_load: bool) -> bool {
    if mode.writes_back() && n == Reg::PC {
        return true;
    }
    is_load && mode.writes_back() && d == n
}

enum Transfer {
    Word,
    Byte,
    Half,
    SignedByte,
    SignedHalf,
}

fn load(t: &mut ArmTranslator, f: &Fields<'_>, offset: Value, kind: Transfer) -> bool {
    let mode = AddrMode::from_fields(f);
    let n = f.reg('n');
    let d = f.reg('d');
    if base_unpredictable(n, d, mode, true) {
        return t.unpredictable_instruction();
    }
    if d == Reg::PC && !matches!(kind, Transfer::Word) {
        return t.unpredictable_instruction();
    }

    let base = t.read_reg_or_pc(n);
    let (addr, writeback) = address(t, base, offset, mode);
    let data = match kind {
        Transfer::Word => t.ir.read_memory_32(addr),
        Transfer::Byte => {
            let byte = t.ir.read_memory_8(addr);
            t.ir.zero_extend_byte(byte)
        }
        Transfer::Half => {
            let half = t.ir.read_memory_16(addr);
            t.ir.zero_extend_half(half)
        }
        Transfer::SignedByte => {
            let byte = t.ir.read_memory_8(addr);
            t.ir.sign_extend_byte(byte)
        }
        Transfer::SignedHalf => {
            let half = t.ir.read_memory_16(addr);
            t.ir.sign_extend_half(half)
        }
    };
    if let Some(wb) = writeback {
        t.ir.set_register(n, wb);
    }

    if d == Reg::PC {
        t.ir.bx_write_pc(data);
        // Popping a return address off the stack is the common shape here.
        t.ir.set_terminal(if n == Reg::SP {
            Terminal::PopRsbHint
        } else {
            Terminal::FastDispatchHint
        });
        return false;
    }
    t.ir.set_register(d, data);
    true
}

fn store(t: &mut ArmTranslator, f: &Fields<'_>, offset: Value, kind: Transfer) -> bool {
    let mode = AddrMode::from_fields(f);
    let n = f.reg('n');
    let d = f.reg('d');
    if base_unpredictable(n, d, mode, false) {
        return t.unpredictable_instruction();
    }
    if d == Reg::PC && !matches!(kind, Transfer::Word) {
        return t.unpredictable_instruction();
    }

    let base = t.read_reg_or_pc(n);
    let value = t.read_reg_or_pc(d);
    let (addr, writeback) = address(t, base, offset, mode);
    match kind {
        Transfer::Word => t.ir.write_memory_32(addr, value),
        Transfer::Byte => {
            let byte = t.ir.least_significant_byte(value);
            t.ir.write_memory_8(addr, byte);
        }
        Transfer::Half => {
            let half = t.ir.least_significant_half(value);
            t.ir.write_memory_16(addr, half);
        }
        Transfer::SignedByte | Transfer::SignedHalf => unreachable!("no signed stores"),
    }
    if let Some(wb) = writeback {
        t.ir.set_register(n, wb);
    }
    true
}

/// Scaled register offset for the word/byte forms.
fn register_offset(t: &mut ArmTranslator, f: &Fields<'_>) -> Option<Value> {
    let m = f.reg('m');
    if m == Reg::PC {
        return None;
    }
    let rm = t.ir.get_register(m);
    let shift = ShiftType::from_bits(f.get('r'));
    let (offset, _carry) = t
        .ir
        .emit_imm_shift(rm, shift, f.get('v'), Value::u1(false));
    Some(offset)
}

// LDR / STR / LDRB / STRB, immediate offset.
pub(super) fn ldr_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    load(t, f, Value::u32(f.get('v')), Transfer::Word)
}

pub(super) fn str_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    store(t, f, Value::u32(f.get('v')), Transfer::Word)
}

pub(super) fn ldrb_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    load(t, f, Value::u32(f.get('v')), Transfer::Byte)
}

pub(super) fn strb_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    store(t, f, Value::u32(f.get('v')), Transfer::Byte)
}

// LDR / STR / LDRB / STRB, scaled register offset.
pub(super) fn ldr_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    match register_offset(t, f) {
        Some(offset) => load(t, f, offset, Transfer::Word),
        None => t.unpredictable_instruction(),
    }
}

pub(super) fn str_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    match register_offset(t, f) {
        Some(offset) => store(t, f, offset, Transfer::Word),
        None => t.unpredictable_instruction(),
    }
}

pub(super) fn ldrb_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    match register_offset(t, f) {
        Some(offset) => load(t, f, offset, Transfer::Byte),
        None => t.unpredictable_instruction(),
    }
}

pub(super) fn strb_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    match register_offset(t, f) {
        Some(offset) => store(t, f, offset, Transfer::Byte),
        None => t.unpredictable_instruction(),
    }
}

// Halfword and signed transfers, immediate (split imm4H:imm4L) offset.
pub(super) fn ldrh_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    load(t, f, Value::u32(f.get('v')), Transfer::Half)
}

pub(super) fn strh_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    store(t, f, Value::u32(f.get('v')), Transfer::Half)
}

pub(super) fn ldrsb_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    load(t, f, Value::u32(f.get('v')), Transfer::SignedByte)
}

pub(super) fn ldrsh_imm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    load(t, f, Value::u32(f.get('v')), Transfer::SignedHalf)
}

// Halfword and signed transfers, register offset.
fn plain_register_offset(t: &mut ArmTranslator, f: &Fields<'_>) -> Option<Value> {
    let m = f.reg('m');
    if m == Reg::PC {
        return None;
    }
    Some(t.ir.get_register(m))
}

pub(super) fn ldrh_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    match plain_register_offset(t, f) {
        Some(offset) => load(t, f, offset, Transfer::Half),
        None => t.unpredictable_instruction(),
    }
}

pub(super) fn strh_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    match plain_register_offset(t, f) {
        Some(offset) => store(t, f, offset, Transfer::Half),
        None => t.unpredictable_instruction(),
    }
}

pub(super) fn ldrsb_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    match plain_register_offset(t, f) {
        Some(offset) => load(t, f, offset, Transfer::SignedByte),
        None => t.unpredictable_instruction(),
    }
}

pub(super) fn ldrsh_reg(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    match plain_register_offset(t, f) {
        Some(offset) => load(t, f, offset, Transfer::SignedHalf),
        None => t.unpredictable_instruction(),
    }
}

/// The four LDM/STM addressing modes reduce to a lowest address and a
/// writeback delta, both computable at translate time.
fn block_transfer_offsets(f: &Fields<'_>) -> (i32, i32, u32) {
    let count = f.get('r').count_ones() as i32;
    let (lowest, delta) = match (f.bit('u'), f.bit('p')) {
        (true, false) => (0, 4 * count),       // IA
        (true, true) => (4, 4 * count),        // IB
        (false, false) => (4 - 4 * count, -4 * count), // DA
        (false, true) => (-4 * count, -4 * count),     // DB
    };
    (lowest, delta, f.get('r'))
}

// LDM{IA,IB,DA,DB} <Rn>{!}, <registers>
pub(super) fn ldm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let n = f.reg('n');
    let list = f.get('r');
    let writeback = f.bit('w');
    if n == Reg::PC || list == 0 {
        return t.unpredictable_instruction();
    }
    if writeback && list & (1 << n.index()) != 0 {
        return t.unpredictable_instruction();
    }

    let (lowest, delta, _) = block_transfer_offsets(f);
    let base = t.ir.get_register(n);
    let mut pc_value = None;
    let mut slot = 0;
    for reg_index in 0..16 {
        if list & (1 << reg_index) == 0 {
            continue;
        }
        let offset = lowest + 4 * slot;
        let addr = t
            .ir
            .add_with_carry(base, Value::u32(offset as u32), Value::u1(false));
        let data = t.ir.read_memory_32(addr);
        if reg_index == 15 {
            pc_value = Some(data);
        } else {
            t.ir.set_register(Reg::from_bits(reg_index), data);
        }
        slot += 1;
    }
    if writeback {
        let new_base = t
            .ir
            .add_with_carry(base, Value::u32(delta as u32), Value::u1(false));
        t.ir.set_register(n, new_base);
    }

    if let Some(pc) = pc_value {
        t.ir.bx_write_pc(pc);
        t.ir.set_terminal(if writeback && n == Reg::SP {
            Terminal::PopRsbHint
        } else {
            Terminal::FastDispatchHint
        });
        return false;
    }
    true
}

// STM{IA,IB,DA,DB} <Rn>{!}, <registers>
pub(super) fn stm(t: &mut ArmTranslator, f: &Fields<'_>) -> bool {
    let n = f.reg('n');
    let list = f.get('r');
    if n == Reg::PC || list == 0 {
        return t.unpredictable_instruction();
    }

    let (lowest, delta, _) = block_transfer_offsets(f);
    let base = t.ir.get_register(n);
    let mut slot = 0;
    for reg_index in 0..16 {
        if list & (1 << reg_index) == 0 {
            continue;
        }
        let offset = lowest + 4 * slot;
        let addr = t
            .ir
            .add_with_carry(base, Value::u32(offset as u32), Value::u1(false));
        let value = t.read_reg_or_pc(Reg::from_bits(reg_index));
        t.ir.write_memory_32(addr, value);
        slot += 1;
    }
    if f.bit('w') {
        let new_base = t
            .ir
            .add_with_carry(base, Value::u32(delta as u32), Value::u1(false));
        t.ir.set_register(n, new_base);
    }
    true
}
