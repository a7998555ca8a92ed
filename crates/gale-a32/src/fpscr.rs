use bitflags::bitflags;

bitflags! {
    /// Cumulative FP exception bits of the FPSCR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FpscrExc: u32 {
        /// Invalid operation.
        const IOC = 1 << 0;
        /// Division by zero.
        const DZC = 1 << 1;
        /// Overflow.
        const OFC = 1 << 2;
        /// Underflow.
        const UFC = 1 << 3;
        /// Inexact.
        const IXC = 1 << 4;
        /// Input denormal.
        const IDC = 1 << 7;
    }
}

/// View over a raw FPSCR word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fpscr(u32);

impl Fpscr {
    /// FP condition flags (used by VCMP/VMRS, preserved verbatim).
    pub const NZCV_MASK: u32 = 0xF000_0000;
    /// Everything that changes how FP instructions execute: AHP, DN, FZ,
    /// RMode, Stride and Len.
    pub const MODE_MASK: u32 = 0x07F7_0000;
    /// The subset of the mode bits a translation is specialized on:
    /// RMode (23:22), Stride (21:20) and Len (18:16).
    pub const LOCATION_MODE_MASK: u32 = 0x00F7_0000;
    /// Cumulative exception bits.
    pub const EXC_MASK: u32 = 0x0000_009F;

    pub fn new(value: u32) -> Fpscr {
        Fpscr(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn nzcv(self) -> u32 {
        self.0 & Self::NZCV_MASK
    }

    pub fn mode(self) -> u32 {
        self.0 & Self::MODE_MASK
    }

    pub fn location_mode(self) -> u32 {
        self.0 & Self::LOCATION_MODE_MASK
    }

    pub fn exceptions(self) -> FpscrExc {
        FpscrExc::from_bits_truncate(self.0 & Self::EXC_MASK)
    }

    /// Rounding mode field (RMode, bits 23:22).
    pub fn rmode(self) -> u32 {
        (self.0 >> 22) & 0b11
    }

    /// Vector length field (Len, bits 18:16).
    pub fn len(self) -> u32 {
        (self.0 >> 16) & 0b111
    }
}
