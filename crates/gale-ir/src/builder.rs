use gale_a32::{Exception, LocationDescriptor, Reg, ShiftType};

use crate::{Block, Inst, Opcode, Terminal, Value};

/// Append-only construction interface over a [`Block`].
///
/// `current_location` tracks the virtual PC as the translator walks guest
/// instructions; `wrote_flags` is set whenever an op that writes any of the
/// condition flags is emitted, which the translator uses to end conditional
/// runs whose guard could go stale.
pub struct IrBuilder {
    block: Block,
    pub current_location: LocationDescriptor,
    pub wrote_flags: bool,
}

impl IrBuilder {
    pub fn new(location: LocationDescriptor) -> IrBuilder {
        IrBuilder {
            block: Block::new(location),
            current_location: location,
            wrote_flags: false,
        }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn block_mut(&mut self) -> &mut Block {
        &mut self.block
    }

    pub fn into_block(self) -> Block {
        self.block
    }

    /// Guest PC value observable by the current instruction (ARM state
    /// reads the PC eight bytes ahead).
    pub fn read_pc(&self) -> Value {
        Value::u32(self.current_location.pc().wrapping_add(8))
    }

    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.block.set_terminal(terminal);
    }

    /// Append an op and return its result value.
    pub fn emit(&mut self, opcode: Opcode, args: &[Value]) -> Value {
        #[cfg(debug_assertions)]
        {
            let info = opcode.info();
            for (i, arg) in args.iter().enumerate() {
                debug_assert_eq!(
                    arg.type_in(&self.block),
                    info.args[i],
                    "{} operand {i} has the wrong type",
                    info.name
                );
            }
        }
        let id = self.block.push_inst(Inst::new(opcode, args));
        Value::Inst(id)
    }

    // --- guest-state accessors ------------------------------------------

    pub fn get_register(&mut self, reg: Reg) -> Value {
        assert!(reg != Reg::PC, "the PC is materialized, not read");
        self.emit(Opcode::GetRegister, &[Value::Reg(reg)])
    }

    pub fn set_register(&mut self, reg: Reg, value: Value) {
        assert!(reg != Reg::PC, "PC writes go through the *WritePC ops");
        self.emit(Opcode::SetRegister, &[Value::Reg(reg), value]);
    }

    pub fn get_cpsr(&mut self) -> Value {
        self.emit(Opcode::GetCpsr, &[])
    }

    pub fn set_cpsr_nzcvq(&mut self, value: Value) {
        self.wrote_flags = true;
        self.emit(Opcode::SetCpsrNzcvq, &[value]);
    }

    pub fn set_ge_flags(&mut self, nibble: Value) {
        self.emit(Opcode::SetGeFlags, &[nibble]);
    }

    pub fn get_c_flag(&mut self) -> Value {
        self.emit(Opcode::GetCFlag, &[])
    }

    pub fn set_n_flag(&mut self, value: Value) {
        self.wrote_flags = true;
        self.emit(Opcode::SetNFlag, &[value]);
    }

    pub fn set_z_flag(&mut self, value: Value) {
        self.wrote_flags = true;
        self.emit(Opcode::SetZFlag, &[value]);
    }

    pub fn set_c_flag(&mut self, value: Value) {
        self.wrote_flags = true;
        self.emit(Opcode::SetCFlag, &[value]);
    }

    pub fn set_v_flag(&mut self, value: Value) {
        self.wrote_flags = true;
        self.emit(Opcode::SetVFlag, &[value]);
    }

    pub fn or_q_flag(&mut self, value: Value) {
        self.emit(Opcode::OrQFlag, &[value]);
    }

    pub fn branch_write_pc(&mut self, value: Value) {
        self.emit(Opcode::BranchWritePC, &[value]);
    }

    pub fn bx_write_pc(&mut self, value: Value) {
        self.emit(Opcode::BXWritePC, &[value]);
    }

    pub fn set_check_bit(&mut self, value: Value) {
        self.emit(Opcode::SetCheckBit, &[value]);
    }

    pub fn push_rsb(&mut self, return_location: LocationDescriptor) {
        self.emit(Opcode::PushRsb, &[Value::u64(return_location.unique_hash())]);
    }

    pub fn call_supervisor(&mut self, imm: Value) {
        self.emit(Opcode::CallSupervisor, &[imm]);
    }

    pub fn exception_raised(&mut self, exception: Exception) {
        let pc = Value::u32(self.current_location.pc());
        self.emit(
            Opcode::ExceptionRaised,
            &[pc, Value::u8(exception.code())],
        );
    }

    // --- integer computation --------------------------------------------

    pub fn add_with_carry(&mut self, a: Value, b: Value, carry_in: Value) -> Value {
        self.emit(Opcode::Add32, &[a, b, carry_in])
    }

    pub fn sub_with_carry(&mut self, a: Value, b: Value, carry_in: Value) -> Value {
        self.emit(Opcode::Sub32, &[a, b, carry_in])
    }

    pub fn mul(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::Mul32, &[a, b])
    }

    pub fn and(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::And32, &[a, b])
    }

    pub fn eor(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::Eor32, &[a, b])
    }

    pub fn orr(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::Orr32, &[a, b])
    }

    pub fn not(&mut self, a: Value) -> Value {
        self.emit(Opcode::Not32, &[a])
    }

    pub fn carry_from(&mut self, op: Value) -> Value {
        debug_assert!(op.inst().is_some());
        self.emit(Opcode::GetCarryFromOp, &[op])
    }

    pub fn overflow_from(&mut self, op: Value) -> Value {
        debug_assert!(op.inst().is_some());
        self.emit(Opcode::GetOverflowFromOp, &[op])
    }

    pub fn ge_from(&mut self, op: Value) -> Value {
        debug_assert!(op.inst().is_some());
        self.emit(Opcode::GetGeFromOp, &[op])
    }

    pub fn sign_extend_byte(&mut self, v: Value) -> Value {
        self.emit(Opcode::SignExtendByteToWord, &[v])
    }

    pub fn sign_extend_half(&mut self, v: Value) -> Value {
        self.emit(Opcode::SignExtendHalfToWord, &[v])
    }

    pub fn zero_extend_byte(&mut self, v: Value) -> Value {
        self.emit(Opcode::ZeroExtendByteToWord, &[v])
    }

    pub fn zero_extend_half(&mut self, v: Value) -> Value {
        self.emit(Opcode::ZeroExtendHalfToWord, &[v])
    }

    pub fn least_significant_byte(&mut self, v: Value) -> Value {
        self.emit(Opcode::LeastSignificantByte, &[v])
    }

    pub fn least_significant_half(&mut self, v: Value) -> Value {
        self.emit(Opcode::LeastSignificantHalf, &[v])
    }

    pub fn most_significant_half(&mut self, v: Value) -> Value {
        self.emit(Opcode::MostSignificantHalf, &[v])
    }

    pub fn most_significant_bit(&mut self, v: Value) -> Value {
        self.emit(Opcode::MostSignificantBit, &[v])
    }

    pub fn is_zero(&mut self, v: Value) -> Value {
        self.emit(Opcode::IsZero, &[v])
    }

    pub fn count_leading_zeros(&mut self, v: Value) -> Value {
        self.emit(Opcode::CountLeadingZeros, &[v])
    }

    // --- shifts -----------------------------------------------------------

    pub fn lsl(&mut self, v: Value, amount: Value, carry_in: Value) -> Value {
        self.emit(Opcode::LogicalShiftLeft, &[v, amount, carry_in])
    }

    pub fn lsr(&mut self, v: Value, amount: Value, carry_in: Value) -> Value {
        self.emit(Opcode::LogicalShiftRight, &[v, amount, carry_in])
    }

    pub fn asr(&mut self, v: Value, amount: Value, carry_in: Value) -> Value {
        self.emit(Opcode::ArithmeticShiftRight, &[v, amount, carry_in])
    }

    pub fn ror(&mut self, v: Value, amount: Value, carry_in: Value) -> Value {
        self.emit(Opcode::RotateRight, &[v, amount, carry_in])
    }

    pub fn rrx(&mut self, v: Value, carry_in: Value) -> Value {
        self.emit(Opcode::RotateRightExtended, &[v, carry_in])
    }

    /// Immediate-shift operand: decodes the `imm5`/type encoding, including
    /// the `#0` special cases (`LSR #0` means `#32`, `ROR #0` means RRX).
    /// Returns the shifted value and the shifter carry-out.
    pub fn emit_imm_shift(
        &mut self,
        value: Value,
        shift: ShiftType,
        imm5: u32,
        carry_in: Value,
    ) -> (Value, Value) {
        debug_assert!(imm5 < 32);
        match (shift, imm5) {
            (ShiftType::Lsl, 0) => (value, carry_in),
            (ShiftType::Lsl, n) => {
                let result = self.lsl(value, Value::u8(n as u8), carry_in);
                let carry = self.carry_from(result);
                (result, carry)
            }
            (ShiftType::Lsr, n) => {
                let n = if n == 0 { 32 } else { n };
                let result = self.lsr(value, Value::u8(n as u8), carry_in);
                let carry = self.carry_from(result);
                (result, carry)
            }
            (ShiftType::Asr, n) => {
                let n = if n == 0 { 32 } else { n };
                let result = self.asr(value, Value::u8(n as u8), carry_in);
                let carry = self.carry_from(result);
                (result, carry)
            }
            (ShiftType::Ror, 0) => {
                let result = self.rrx(value, carry_in);
                let carry = self.carry_from(result);
                (result, carry)
            }
            (ShiftType::Ror, n) => {
                let result = self.ror(value, Value::u8(n as u8), carry_in);
                let carry = self.carry_from(result);
                (result, carry)
            }
        }
    }

    /// Register-shift operand: the amount is the bottom byte of a register
    /// and may exceed 31; the shift ops define the full 0..=255 range.
    pub fn emit_reg_shift(
        &mut self,
        value: Value,
        shift: ShiftType,
        amount: Value,
        carry_in: Value,
    ) -> (Value, Value) {
        let result = match shift {
            ShiftType::Lsl => self.lsl(value, amount, carry_in),
            ShiftType::Lsr => self.lsr(value, amount, carry_in),
            ShiftType::Asr => self.asr(value, amount, carry_in),
            ShiftType::Ror => self.ror(value, amount, carry_in),
        };
        let carry = self.carry_from(result);
        (result, carry)
    }

    // --- packed halfword ops ----------------------------------------------

    pub fn packed_add_sub_u16(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::PackedAddSubU16, &[a, b])
    }

    pub fn packed_add_sub_s16(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::PackedAddSubS16, &[a, b])
    }

    pub fn packed_sub_add_u16(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::PackedSubAddU16, &[a, b])
    }

    pub fn packed_sub_add_s16(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::PackedSubAddS16, &[a, b])
    }

    pub fn packed_halving_add_sub_s16(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::PackedHalvingAddSubS16, &[a, b])
    }

    pub fn packed_halving_sub_add_s16(&mut self, a: Value, b: Value) -> Value {
        self.emit(Opcode::PackedHalvingSubAddS16, &[a, b])
    }

    // --- guest memory -----------------------------------------------------

    pub fn read_memory_8(&mut self, addr: Value) -> Value {
        self.emit(Opcode::ReadMemory8, &[addr])
    }

    pub fn read_memory_16(&mut self, addr: Value) -> Value {
        self.emit(Opcode::ReadMemory16, &[addr])
    }

    pub fn read_memory_32(&mut self, addr: Value) -> Value {
        self.emit(Opcode::ReadMemory32, &[addr])
    }

    pub fn read_memory_64(&mut self, addr: Value) -> Value {
        self.emit(Opcode::ReadMemory64, &[addr])
    }

    pub fn write_memory_8(&mut self, addr: Value, value: Value) {
        self.emit(Opcode::WriteMemory8, &[addr, value]);
    }

    pub fn write_memory_16(&mut self, addr: Value, value: Value) {
        self.emit(Opcode::WriteMemory16, &[addr, value]);
    }

    pub fn write_memory_32(&mut self, addr: Value, value: Value) {
        self.emit(Opcode::WriteMemory32, &[addr, value]);
    }

    pub fn write_memory_64(&mut self, addr: Value, value: Value) {
        self.emit(Opcode::WriteMemory64, &[addr, value]);
    }
}
