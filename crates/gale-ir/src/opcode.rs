use crate::Type;

/// Auxiliary results an instruction computes alongside its primary result.
///
/// Consumers read them through the `GetCarryFromOp` / `GetOverflowFromOp` /
/// `GetGeFromOp` pseudo-ops, which reference the producing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aux {
    pub carry: bool,
    pub overflow: bool,
    pub ge: bool,
}

/// Static signature of an opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub name: &'static str,
    pub result: Type,
    pub args: &'static [Type],
    /// Free of observable effects; an instance whose result (and auxiliary
    /// results) have no uses may be removed.
    pub pure: bool,
    pub aux: Aux,
    /// Index of a flag argument that the op both consumes and then clobbers
    /// with its own flag output. An emitter's register allocator must treat
    /// the operand as read-then-clobbered ("use-scratch"), never as a plain
    /// use that stays live across the op.
    pub scratch_flag_arg: Option<usize>,
}

impl OpcodeInfo {
    fn new(name: &'static str, result: Type, args: &'static [Type]) -> OpcodeInfo {
        OpcodeInfo {
            name,
            result,
            args,
            pure: false,
            aux: Aux::default(),
            scratch_flag_arg: None,
        }
    }

    fn pure(mut self) -> OpcodeInfo {
        self.pure = true;
        self
    }

    fn carry(mut self) -> OpcodeInfo {
        self.aux.carry = true;
        self
    }

    fn overflow(mut self) -> OpcodeInfo {
        self.aux.overflow = true;
        self
    }

    fn ge(mut self) -> OpcodeInfo {
        self.aux.ge = true;
        self
    }

    fn scratch(mut self, arg: usize) -> OpcodeInfo {
        self.scratch_flag_arg = Some(arg);
        self
    }
}

/// Micro-op opcodes.
///
/// Guest-state accessors are prefixed with what they touch; everything else
/// is a pure value computation except the memory ops (routed through the
/// consumer callbacks, so reads may have MMIO side effects) and the
/// effect-only ops at the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Tombstone left behind by the optimizer; never referenced.
    Void,

    // Guest-state accessors.
    GetRegister,
    SetRegister,
    GetCpsr,
    SetCpsrNzcvq,
    SetGeFlags,
    GetCFlag,
    SetNFlag,
    SetZFlag,
    SetCFlag,
    SetVFlag,
    OrQFlag,
    BranchWritePC,
    BXWritePC,
    SetCheckBit,

    // Integer computation.
    Add32,
    Sub32,
    Mul32,
    And32,
    Eor32,
    Orr32,
    Not32,
    LogicalShiftLeft,
    LogicalShiftRight,
    ArithmeticShiftRight,
    RotateRight,
    RotateRightExtended,
    SignExtendByteToWord,
    SignExtendHalfToWord,
    ZeroExtendByteToWord,
    ZeroExtendHalfToWord,
    LeastSignificantByte,
    LeastSignificantHalf,
    MostSignificantHalf,
    MostSignificantBit,
    IsZero,
    CountLeadingZeros,

    // Parallel (packed halfword) computation.
    PackedAddSubU16,
    PackedAddSubS16,
    PackedSubAddU16,
    PackedSubAddS16,
    PackedHalvingAddSubS16,
    PackedHalvingSubAddS16,

    // Auxiliary-result readers.
    GetCarryFromOp,
    GetOverflowFromOp,
    GetGeFromOp,

    // Guest memory, through the consumer callbacks.
    ReadMemory8,
    ReadMemory16,
    ReadMemory32,
    ReadMemory64,
    WriteMemory8,
    WriteMemory16,
    WriteMemory32,
    WriteMemory64,

    // Effect-only ops.
    PushRsb,
    CallSupervisor,
    ExceptionRaised,
}

use Type::{Reg, Void, U1, U16, U32, U64, U8};

impl Opcode {
    #[rustfmt::skip]
    pub fn info(self) -> OpcodeInfo {
        let op = OpcodeInfo::new;
        match self {
            Opcode::Void => op("void", Void, &[]),

            Opcode::GetRegister => op("get_register", U32, &[Reg]).pure(),
            Opcode::SetRegister => op("set_register", Void, &[Reg, U32]),
            Opcode::GetCpsr => op("get_cpsr", U32, &[]).pure(),
            Opcode::SetCpsrNzcvq => op("set_cpsr_nzcvq", Void, &[U32]),
            Opcode::SetGeFlags => op("set_ge_flags", Void, &[U32]),
            Opcode::GetCFlag => op("get_c_flag", U1, &[]).pure(),
            Opcode::SetNFlag => op("set_n_flag", Void, &[U1]),
            Opcode::SetZFlag => op("set_z_flag", Void, &[U1]),
            Opcode::SetCFlag => op("set_c_flag", Void, &[U1]),
            Opcode::SetVFlag => op("set_v_flag", Void, &[U1]),
            Opcode::OrQFlag => op("or_q_flag", Void, &[U1]),
            Opcode::BranchWritePC => op("branch_write_pc", Void, &[U32]),
            Opcode::BXWritePC => op("bx_write_pc", Void, &[U32]),
            Opcode::SetCheckBit => op("set_check_bit", Void, &[U1]),

            Opcode::Add32 => op("add32", U32, &[U32, U32, U1]).pure().carry().overflow().scratch(2),
            Opcode::Sub32 => op("sub32", U32, &[U32, U32, U1]).pure().carry().overflow().scratch(2),
            Opcode::Mul32 => op("mul32", U32, &[U32, U32]).pure(),
            Opcode::And32 => op("and32", U32, &[U32, U32]).pure(),
            Opcode::Eor32 => op("eor32", U32, &[U32, U32]).pure(),
            Opcode::Orr32 => op("orr32", U32, &[U32, U32]).pure(),
            Opcode::Not32 => op("not32", U32, &[U32]).pure(),
            Opcode::LogicalShiftLeft => op("lsl", U32, &[U32, U8, U1]).pure().carry().scratch(2),
            Opcode::LogicalShiftRight => op("lsr", U32, &[U32, U8, U1]).pure().carry().scratch(2),
            Opcode::ArithmeticShiftRight => op("asr", U32, &[U32, U8, U1]).pure().carry().scratch(2),
            Opcode::RotateRight => op("ror", U32, &[U32, U8, U1]).pure().carry().scratch(2),
            Opcode::RotateRightExtended => op("rrx", U32, &[U32, U1]).pure().carry().scratch(1),
            Opcode::SignExtendByteToWord => op("sext_byte", U32, &[U8]).pure(),
            Opcode::SignExtendHalfToWord => op("sext_half", U32, &[U16]).pure(),
            Opcode::ZeroExtendByteToWord => op("zext_byte", U32, &[U8]).pure(),
            Opcode::ZeroExtendHalfToWord => op("zext_half", U32, &[U16]).pure(),
            Opcode::LeastSignificantByte => op("lsbyte", U8, &[U32]).pure(),
            Opcode::LeastSignificantHalf => op("lshalf", U16, &[U32]).pure(),
            Opcode::MostSignificantHalf => op("mshalf", U16, &[U32]).pure(),
            Opcode::MostSignificantBit => op("msbit", U1, &[U32]).pure(),
            Opcode::IsZero => op("is_zero", U1, &[U32]).pure(),
            Opcode::CountLeadingZeros => op("clz", U32, &[U32]).pure(),

            Opcode::PackedAddSubU16 => op("packed_asx_u16", U32, &[U32, U32]).pure().ge(),
            Opcode::PackedAddSubS16 => op("packed_asx_s16", U32, &[U32, U32]).pure().ge(),
            Opcode::PackedSubAddU16 => op("packed_sax_u16", U32, &[U32, U32]).pure().ge(),
            Opcode::PackedSubAddS16 => op("packed_sax_s16", U32, &[U32, U32]).pure().ge(),
            Opcode::PackedHalvingAddSubS16 => op("packed_halving_asx_s16", U32, &[U32, U32]).pure(),
            Opcode::PackedHalvingSubAddS16 => op("packed_halving_sax_s16", U32, &[U32, U32]).pure(),

            Opcode::GetCarryFromOp => op("carry_of", U1, &[U32]).pure(),
            Opcode::GetOverflowFromOp => op("overflow_of", U1, &[U32]).pure(),
            Opcode::GetGeFromOp => op("ge_of", U32, &[U32]).pure(),

            Opcode::ReadMemory8 => op("read_memory8", U8, &[U32]),
            Opcode::ReadMemory16 => op("read_memory16", U16, &[U32]),
            Opcode::ReadMemory32 => op("read_memory32", U32, &[U32]),
            Opcode::ReadMemory64 => op("read_memory64", U64, &[U32]),
            Opcode::WriteMemory8 => op("write_memory8", Void, &[U32, U8]),
            Opcode::WriteMemory16 => op("write_memory16", Void, &[U32, U16]),
            Opcode::WriteMemory32 => op("write_memory32", Void, &[U32, U32]),
            Opcode::WriteMemory64 => op("write_memory64", Void, &[U32, U64]),

            Opcode::PushRsb => op("push_rsb", Void, &[U64]),
            Opcode::CallSupervisor => op("call_supervisor", Void, &[U32]),
            Opcode::ExceptionRaised => op("exception_raised", Void, &[U32, U8]),
        }
    }

    pub fn is_pure(self) -> bool {
        self.info().pure
    }

    /// True for ops whose auxiliary results include the requested kind.
    pub fn produces_aux(self, reader: Opcode) -> bool {
        let aux = self.info().aux;
        match reader {
            Opcode::GetCarryFromOp => aux.carry,
            Opcode::GetOverflowFromOp => aux.overflow,
            Opcode::GetGeFromOp => aux.ge,
            _ => false,
        }
    }
}
