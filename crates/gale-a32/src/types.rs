use core::fmt;

/// ARM core register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[rustfmt::skip]
pub enum Reg {
    R0, R1, R2, R3, R4, R5, R6, R7,
    R8, R9, R10, R11, R12, R13, R14, R15,
}

impl Reg {
    pub const SP: Reg = Reg::R13;
    pub const LR: Reg = Reg::R14;
    pub const PC: Reg = Reg::R15;

    /// Build a register from a 4-bit encoding field.
    pub fn from_bits(bits: u32) -> Reg {
        assert!(bits < 16, "register field out of range: {bits}");
        #[rustfmt::skip]
        const TABLE: [Reg; 16] = [
            Reg::R0, Reg::R1, Reg::R2, Reg::R3, Reg::R4, Reg::R5, Reg::R6, Reg::R7,
            Reg::R8, Reg::R9, Reg::R10, Reg::R11, Reg::R12, Reg::R13, Reg::R14, Reg::R15,
        ];
        TABLE[bits as usize]
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reg::R13 => write!(f, "sp"),
            Reg::R14 => write!(f, "lr"),
            Reg::R15 => write!(f, "pc"),
            r => write!(f, "r{}", r.index()),
        }
    }
}

/// VFP extension register viewed as a 32-bit single (`s0`..`s63`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtReg(u8);

impl ExtReg {
    pub fn new(index: u8) -> ExtReg {
        assert!(index < 64, "extension register out of range: {index}");
        ExtReg(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExtReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// ARM condition field.
///
/// `NV` is not a real condition on ARMv5+; words with a `0b1111` condition
/// field belong to the unconditional instruction space and never reach
/// condition evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[rustfmt::skip]
pub enum Cond {
    Eq, Ne, Cs, Cc, Mi, Pl, Vs, Vc,
    Hi, Ls, Ge, Lt, Gt, Le, Al, Nv,
}

impl Cond {
    pub fn from_bits(bits: u32) -> Cond {
        assert!(bits < 16, "condition field out of range: {bits}");
        #[rustfmt::skip]
        const TABLE: [Cond; 16] = [
            Cond::Eq, Cond::Ne, Cond::Cs, Cond::Cc, Cond::Mi, Cond::Pl, Cond::Vs, Cond::Vc,
            Cond::Hi, Cond::Ls, Cond::Ge, Cond::Lt, Cond::Gt, Cond::Le, Cond::Al, Cond::Nv,
        ];
        TABLE[bits as usize]
    }

    /// Evaluate against an NZCV word (flags in bits 31..28).
    pub fn passed(self, nzcv: u32) -> bool {
        let n = nzcv & (1 << 31) != 0;
        let z = nzcv & (1 << 30) != 0;
        let c = nzcv & (1 << 29) != 0;
        let v = nzcv & (1 << 28) != 0;
        match self {
            Cond::Eq => z,
            Cond::Ne => !z,
            Cond::Cs => c,
            Cond::Cc => !c,
            Cond::Mi => n,
            Cond::Pl => !n,
            Cond::Vs => v,
            Cond::Vc => !v,
            Cond::Hi => c && !z,
            Cond::Ls => !c || z,
            Cond::Ge => n == v,
            Cond::Lt => n != v,
            Cond::Gt => !z && n == v,
            Cond::Le => z || n != v,
            Cond::Al => true,
            Cond::Nv => false,
        }
    }
}

/// Shift applied to a data-processing operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftType {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftType {
    pub fn from_bits(bits: u32) -> ShiftType {
        match bits & 0b11 {
            0b00 => ShiftType::Lsl,
            0b01 => ShiftType::Lsr,
            0b10 => ShiftType::Asr,
            _ => ShiftType::Ror,
        }
    }
}

/// Guest-visible exceptional event, surfaced to the consumer through the
/// `exception_raised` callback. Not a host-side error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Exception {
    /// BKPT was executed.
    Breakpoint = 0,
    /// An encoding with no defined behaviour was executed.
    UndefinedInstruction = 1,
    /// An UNPREDICTABLE encoding was executed under the strict policy.
    UnpredictableInstruction = 2,
}

impl Exception {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Exception> {
        match code {
            0 => Some(Exception::Breakpoint),
            1 => Some(Exception::UndefinedInstruction),
            2 => Some(Exception::UnpredictableInstruction),
            _ => None,
        }
    }
}
