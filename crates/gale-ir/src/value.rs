use core::fmt;

use gale_a32::Reg;

use crate::{InstId, Type};

/// A micro-op operand: an immediate, a register name, or a reference to the
/// result of an earlier instruction in the same block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Void,
    Inst(InstId),
    ImmU1(bool),
    ImmU8(u8),
    ImmU16(u16),
    ImmU32(u32),
    ImmU64(u64),
    Reg(Reg),
}

impl Value {
    pub fn u1(v: bool) -> Value {
        Value::ImmU1(v)
    }

    pub fn u8(v: u8) -> Value {
        Value::ImmU8(v)
    }

    pub fn u16(v: u16) -> Value {
        Value::ImmU16(v)
    }

    pub fn u32(v: u32) -> Value {
        Value::ImmU32(v)
    }

    pub fn u64(v: u64) -> Value {
        Value::ImmU64(v)
    }

    /// Type of the operand itself; `Inst` references resolve through the
    /// defining opcode, which requires the owning block.
    pub fn type_in(&self, block: &crate::Block) -> Type {
        match *self {
            Value::Void => Type::Void,
            Value::Inst(id) => block.inst(id).opcode().info().result,
            Value::ImmU1(_) => Type::U1,
            Value::ImmU8(_) => Type::U8,
            Value::ImmU16(_) => Type::U16,
            Value::ImmU32(_) => Type::U32,
            Value::ImmU64(_) => Type::U64,
            Value::Reg(_) => Type::Reg,
        }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(
            self,
            Value::ImmU1(_)
                | Value::ImmU8(_)
                | Value::ImmU16(_)
                | Value::ImmU32(_)
                | Value::ImmU64(_)
        )
    }

    pub fn inst(&self) -> Option<InstId> {
        match *self {
            Value::Inst(id) => Some(id),
            _ => None,
        }
    }

    pub fn imm_u1(&self) -> Option<bool> {
        match *self {
            Value::ImmU1(v) => Some(v),
            _ => None,
        }
    }

    pub fn imm_u8(&self) -> Option<u8> {
        match *self {
            Value::ImmU8(v) => Some(v),
            _ => None,
        }
    }

    pub fn imm_u32(&self) -> Option<u32> {
        match *self {
            Value::ImmU32(v) => Some(v),
            _ => None,
        }
    }

    pub fn reg(&self) -> Option<Reg> {
        match *self {
            Value::Reg(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Void => write!(f, "-"),
            Value::Inst(id) => write!(f, "%{}", id.index()),
            Value::ImmU1(v) => write!(f, "#{}", v as u8),
            Value::ImmU8(v) => write!(f, "#{v}"),
            Value::ImmU16(v) => write!(f, "#{v:#x}"),
            Value::ImmU32(v) => write!(f, "#{v:#x}"),
            Value::ImmU64(v) => write!(f, "#{v:#x}"),
            Value::Reg(r) => write!(f, "{r}"),
        }
    }
}
