use std::fmt;

use crate::ControllerError;

/// Number of byte-wide general registers (`R0..R15`).
pub const GENERAL_REGISTER_COUNT: usize = 16;
/// Highest valid code/data segment number.
pub const MAX_SEGMENT: u8 = 0x0F;
/// Number of exception levels with their own link/PSW backup registers.
pub const EXCEPTION_LEVELS: u8 = 3;

/// `PSW` bit for carry.
pub const PSW_C: u8 = 1 << 7;
/// `PSW` bit for zero result.
pub const PSW_Z: u8 = 1 << 6;
/// `PSW` bit for negative result.
pub const PSW_S: u8 = 1 << 5;
/// `PSW` bit for signed overflow.
pub const PSW_OV: u8 = 1 << 4;
/// `PSW` bit for master interrupt enable.
pub const PSW_MIE: u8 = 1 << 3;
/// `PSW` bit for half carry.
pub const PSW_HC: u8 = 1 << 2;
/// `PSW` mask for the current exception level.
pub const PSW_ELEVEL_MASK: u8 = 0b11;

/// Named control registers exposed by the emulation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Code segment register.
    Csr,
    /// Program counter.
    Pc,
    /// Stack pointer.
    Sp,
    /// Data segment register.
    Dsr,
    /// Effective address register.
    Ea,
    /// Program status word.
    Psw,
    /// Link code segment register.
    Lcsr,
    /// Link register.
    Lr,
    /// Exception link code segment register for level `1..=3`.
    Ecsr(u8),
    /// Exception link register for level `1..=3`.
    Elr(u8),
    /// Exception PSW backup for level `1..=3`.
    Epsw(u8),
}

impl Register {
    /// Bit width of the register.
    #[must_use]
    pub const fn width_bits(self) -> u8 {
        match self {
            Self::Csr | Self::Lcsr | Self::Ecsr(_) => 4,
            Self::Dsr | Self::Psw | Self::Epsw(_) => 8,
            Self::Pc | Self::Sp | Self::Ea | Self::Lr | Self::Elr(_) => 16,
        }
    }

    /// Mask of architecturally significant bits.
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self.width_bits() {
            4 => 0x000F,
            8 => 0x00FF,
            _ => 0xFFFF,
        }
    }
}

/// Program status word bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Psw(pub u8);

impl Psw {
    /// Raw register value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Carry flag.
    #[must_use]
    pub const fn carry(self) -> bool {
        self.0 & PSW_C != 0
    }

    /// Zero flag.
    #[must_use]
    pub const fn zero(self) -> bool {
        self.0 & PSW_Z != 0
    }

    /// Sign flag.
    #[must_use]
    pub const fn sign(self) -> bool {
        self.0 & PSW_S != 0
    }

    /// Overflow flag.
    #[must_use]
    pub const fn overflow(self) -> bool {
        self.0 & PSW_OV != 0
    }

    /// Master interrupt enable.
    #[must_use]
    pub const fn interrupts_enabled(self) -> bool {
        self.0 & PSW_MIE != 0
    }

    /// Half carry flag.
    #[must_use]
    pub const fn half_carry(self) -> bool {
        self.0 & PSW_HC != 0
    }

    /// Current exception level (`0..=3`).
    #[must_use]
    pub const fn exception_level(self) -> u8 {
        self.0 & PSW_ELEVEL_MASK
    }
}

impl fmt::Display for Psw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}  {:08b}", self.0, self.0)
    }
}

/// A `segment:offset` location in code memory, e.g. `CSR:PC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CodeAddress {
    /// Code segment (`0..=0xF`).
    pub segment: u8,
    /// Word-aligned offset within the segment.
    pub offset: u16,
}

impl CodeAddress {
    /// Creates a location without validation.
    #[must_use]
    pub const fn new(segment: u8, offset: u16) -> Self {
        Self { segment, offset }
    }

    /// Creates a location, rejecting segments above `0xF` and odd offsets.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidSegment`] or
    /// [`ControllerError::UnalignedCodeAddress`].
    pub const fn checked(segment: u8, offset: u16) -> Result<Self, ControllerError> {
        if segment > MAX_SEGMENT {
            return Err(ControllerError::InvalidSegment { segment });
        }
        if offset & 1 != 0 {
            return Err(ControllerError::UnalignedCodeAddress { address: offset });
        }
        Ok(Self { segment, offset })
    }

    /// Packs the location as `segment << 16 | offset`.
    #[must_use]
    pub fn linear(self) -> u32 {
        (u32::from(self.segment) << 16) | u32::from(self.offset)
    }

    /// Location `words` code words further on, wrapping within the segment.
    #[must_use]
    pub const fn advance_words(self, words: u16) -> Self {
        Self {
            segment: self.segment,
            offset: self.offset.wrapping_add(words.wrapping_mul(2)),
        }
    }
}

impl fmt::Display for CodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:04X}H", self.segment, self.offset)
    }
}
