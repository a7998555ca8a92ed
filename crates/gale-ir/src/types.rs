use core::fmt;

/// Result/operand type of a micro-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value (effect-only ops and the tombstone).
    Void,
    /// A core register name carried as an operand.
    Reg,
    U1,
    U8,
    U16,
    U32,
    U64,
    /// 128-bit vector lane group; reserved for the extension-register file.
    U128,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Type::Void => "void",
            Type::Reg => "reg",
            Type::U1 => "u1",
            Type::U8 => "u8",
            Type::U16 => "u16",
            Type::U32 => "u32",
            Type::U64 => "u64",
            Type::U128 => "u128",
        };
        f.write_str(s)
    }
}
