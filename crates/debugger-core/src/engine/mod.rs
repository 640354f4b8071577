//! Contract for the external emulation engine driven by the controller.
//!
//! The engine owns instruction semantics and the emulated memory image; the
//! controller only sequences it and observes it through these primitives.

use std::path::Path;

use crate::{InitError, MemoryFault, Register, StepResult, GENERAL_REGISTER_COUNT};

/// In-memory reference engine used by tests and headless hosts.
pub mod memory_engine;

pub use memory_engine::MemoryEngine;

/// Fixed access widths supported by the engine's data accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataWidth {
    /// 8-bit access.
    Byte = 1,
    /// 16-bit access.
    Word = 2,
    /// 32-bit access.
    Dword = 4,
    /// 64-bit access.
    Qword = 8,
}

impl DataWidth {
    /// Widths in greedy splitting order, largest first.
    pub const DESCENDING: [Self; 4] = [Self::Qword, Self::Dword, Self::Word, Self::Byte];

    /// Access size in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Mask covering the low `bytes() * 8` bits.
    #[must_use]
    pub const fn value_mask(self) -> u64 {
        match self {
            Self::Qword => u64::MAX,
            Self::Dword => 0xFFFF_FFFF,
            Self::Word => 0xFFFF,
            Self::Byte => 0xFF,
        }
    }
}

/// Emulation engine primitives consumed by the controller.
///
/// Data values are returned in engine-native (little-endian) order: byte `n`
/// of an access sits in bits `8n..8n+8` of the returned value.
pub trait Engine {
    /// Creates an engine and loads the ROM image.
    ///
    /// # Errors
    ///
    /// Returns [`InitError`] when memory cannot be allocated or the ROM is
    /// missing or unreadable.
    fn init(rom_path: &Path) -> Result<Self, InitError>
    where
        Self: Sized;

    /// Applies the CPU reset sequence (vectors, control registers).
    fn reset(&mut self);

    /// Clears registers and volatile memory to their power-on values.
    fn zero(&mut self);

    /// Executes exactly one instruction.
    fn step(&mut self) -> StepResult;

    /// Reads `width` bytes of data memory at `segment:address`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault`] for unmapped addresses.
    fn read_data(&self, segment: u8, address: u16, width: DataWidth) -> Result<u64, MemoryFault>;

    /// Writes the low `width` bytes of `value` to `segment:address`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault`] for unmapped addresses.
    fn write_data(
        &mut self,
        segment: u8,
        address: u16,
        width: DataWidth,
        value: u64,
    ) -> Result<(), MemoryFault>;

    /// Reads one code word at `segment:address`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault`] for addresses outside the code image.
    fn read_code_word(&self, segment: u8, address: u16) -> Result<u16, MemoryFault>;

    /// Reads a named register, zero-extended.
    fn read_register(&self, register: Register) -> u16;

    /// Writes a named register; bits outside [`Register::mask`] are ignored.
    fn write_register(&mut self, register: Register, value: u16);

    /// Returns the byte-wide general register file `R0..R15`.
    fn general_registers(&self) -> [u8; GENERAL_REGISTER_COUNT];

    /// Releases engine resources. The engine is not used afterwards.
    fn free(&mut self) {}
}
