use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::Path;

use crate::engine::{DataWidth, Engine};
use crate::memory::SEGMENT_BYTES;
use crate::{
    InitError, MemoryFault, Register, StepResult, EXCEPTION_LEVELS, GENERAL_REGISTER_COUNT,
};

const SEGMENT_COUNT: usize = 16;

/// Flat-memory engine without instruction semantics.
///
/// Every `step()` advances `PC` by one word and reports the next scripted
/// [`StepResult`] (or [`StepResult::Ok`] once the script is exhausted). Data
/// segments are mapped individually; code words come from the ROM image with
/// code segment `n` at ROM offset `n * 0x10000`.
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    data: Vec<Option<Box<[u8]>>>,
    rom: Vec<u8>,
    gr: [u8; GENERAL_REGISTER_COUNT],
    csr: u8,
    pc: u16,
    sp: u16,
    dsr: u8,
    ea: u16,
    psw: u8,
    lcsr: u8,
    lr: u16,
    ecsr: [u8; EXCEPTION_LEVELS as usize],
    elr: [u16; EXCEPTION_LEVELS as usize],
    epsw: [u8; EXCEPTION_LEVELS as usize],
    script: VecDeque<StepResult>,
    steps: u64,
    freed: bool,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::from_rom(Vec::new())
    }
}

impl MemoryEngine {
    /// Creates an engine backed by `rom` with data segment 0 mapped.
    #[must_use]
    pub fn from_rom(rom: Vec<u8>) -> Self {
        let mut data = vec![None; SEGMENT_COUNT];
        data[0] = Some(vec![0; SEGMENT_BYTES].into_boxed_slice());
        Self {
            data,
            rom,
            gr: [0; GENERAL_REGISTER_COUNT],
            csr: 0,
            pc: 0,
            sp: 0,
            dsr: 0,
            ea: 0,
            psw: 0,
            lcsr: 0,
            lr: 0,
            ecsr: [0; EXCEPTION_LEVELS as usize],
            elr: [0; EXCEPTION_LEVELS as usize],
            epsw: [0; EXCEPTION_LEVELS as usize],
            script: VecDeque::new(),
            steps: 0,
            freed: false,
        }
    }

    /// Maps a zero-filled data segment.
    pub fn map_segment(&mut self, segment: u8) {
        if let Some(slot) = self.data.get_mut(usize::from(segment)) {
            slot.get_or_insert_with(|| vec![0; SEGMENT_BYTES].into_boxed_slice());
        }
    }

    /// Unmaps a data segment; accesses to it fault afterwards.
    pub fn unmap_segment(&mut self, segment: u8) {
        if let Some(slot) = self.data.get_mut(usize::from(segment)) {
            *slot = None;
        }
    }

    /// Queues results returned by subsequent `step()` calls.
    pub fn script_steps(&mut self, results: impl IntoIterator<Item = StepResult>) {
        self.script.extend(results);
    }

    /// Number of `step()` calls since construction.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Returns `true` once `free()` has been called.
    #[must_use]
    pub const fn is_freed(&self) -> bool {
        self.freed
    }

    /// Sets general register `Rn`.
    pub fn set_general_register(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.gr.get_mut(index) {
            *slot = value;
        }
    }

    fn segment(&self, segment: u8, address: u16) -> Result<&[u8], MemoryFault> {
        self.data
            .get(usize::from(segment))
            .and_then(Option::as_deref)
            .ok_or_else(|| MemoryFault::new(segment, address))
    }

    fn code_word(&self, segment: u8, address: u16) -> Option<u16> {
        let offset = usize::from(segment) * SEGMENT_BYTES + usize::from(address & !1);
        let lo = *self.rom.get(offset)?;
        let hi = *self.rom.get(offset + 1)?;
        Some(u16::from_le_bytes([lo, hi]))
    }
}

impl Engine for MemoryEngine {
    fn init(rom_path: &Path) -> Result<Self, InitError> {
        match std::fs::read(rom_path) {
            Ok(rom) => Ok(Self::from_rom(rom)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(InitError::RomNotFound {
                path: rom_path.to_path_buf(),
            }),
            Err(source) => Err(InitError::Io {
                path: rom_path.to_path_buf(),
                source,
            }),
        }
    }

    fn reset(&mut self) {
        self.sp = self.code_word(0, 0x0000).unwrap_or(0);
        self.pc = self.code_word(0, 0x0002).unwrap_or(0);
        self.csr = 0;
        self.psw = 0;
        self.dsr = 0;
    }

    fn zero(&mut self) {
        self.gr = [0; GENERAL_REGISTER_COUNT];
        self.csr = 0;
        self.pc = 0;
        self.sp = 0;
        self.dsr = 0;
        self.ea = 0;
        self.psw = 0;
        self.lcsr = 0;
        self.lr = 0;
        self.ecsr = [0; EXCEPTION_LEVELS as usize];
        self.elr = [0; EXCEPTION_LEVELS as usize];
        self.epsw = [0; EXCEPTION_LEVELS as usize];
    }

    fn step(&mut self) -> StepResult {
        self.steps += 1;
        self.pc = self.pc.wrapping_add(2);
        self.script.pop_front().unwrap_or(StepResult::Ok)
    }

    fn read_data(&self, segment: u8, address: u16, width: DataWidth) -> Result<u64, MemoryFault> {
        let memory = self.segment(segment, address)?;
        let mut bytes = [0u8; 8];
        let mut at = address;
        for byte in bytes.iter_mut().take(width.bytes()) {
            *byte = memory[usize::from(at)];
            at = at.wrapping_add(1);
        }
        Ok(u64::from_le_bytes(bytes))
    }

    fn write_data(
        &mut self,
        segment: u8,
        address: u16,
        width: DataWidth,
        value: u64,
    ) -> Result<(), MemoryFault> {
        let memory = self
            .data
            .get_mut(usize::from(segment))
            .and_then(Option::as_deref_mut)
            .ok_or_else(|| MemoryFault::new(segment, address))?;
        let mut at = address;
        for byte in value.to_le_bytes().iter().take(width.bytes()) {
            memory[usize::from(at)] = *byte;
            at = at.wrapping_add(1);
        }
        Ok(())
    }

    fn read_code_word(&self, segment: u8, address: u16) -> Result<u16, MemoryFault> {
        self.code_word(segment, address)
            .ok_or_else(|| MemoryFault::new(segment, address))
    }

    fn read_register(&self, register: Register) -> u16 {
        let level = |n: u8| usize::from(n.saturating_sub(1)).min(EXCEPTION_LEVELS as usize - 1);
        match register {
            Register::Csr => u16::from(self.csr),
            Register::Pc => self.pc,
            Register::Sp => self.sp,
            Register::Dsr => u16::from(self.dsr),
            Register::Ea => self.ea,
            Register::Psw => u16::from(self.psw),
            Register::Lcsr => u16::from(self.lcsr),
            Register::Lr => self.lr,
            Register::Ecsr(n) => u16::from(self.ecsr[level(n)]),
            Register::Elr(n) => self.elr[level(n)],
            Register::Epsw(n) => u16::from(self.epsw[level(n)]),
        }
    }

    fn write_register(&mut self, register: Register, value: u16) {
        let value = value & register.mask();
        let byte = value.to_le_bytes()[0];
        let level = |n: u8| usize::from(n.saturating_sub(1)).min(EXCEPTION_LEVELS as usize - 1);
        match register {
            Register::Csr => self.csr = byte,
            Register::Pc => self.pc = value,
            Register::Sp => self.sp = value,
            Register::Dsr => self.dsr = byte,
            Register::Ea => self.ea = value,
            Register::Psw => self.psw = byte,
            Register::Lcsr => self.lcsr = byte,
            Register::Lr => self.lr = value,
            Register::Ecsr(n) => self.ecsr[level(n)] = byte,
            Register::Elr(n) => self.elr[level(n)] = value,
            Register::Epsw(n) => self.epsw[level(n)] = byte,
        }
    }

    fn general_registers(&self) -> [u8; GENERAL_REGISTER_COUNT] {
        self.gr
    }

    fn free(&mut self) {
        self.freed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryEngine;
    use crate::engine::{DataWidth, Engine};
    use crate::{InitError, MemoryFault, Register, StepResult};
    use std::path::Path;

    #[test]
    fn data_accesses_are_little_endian() {
        let mut engine = MemoryEngine::default();
        engine
            .write_data(0, 0x8000, DataWidth::Dword, 0x1122_3344)
            .expect("segment 0 is mapped");
        assert_eq!(engine.read_data(0, 0x8000, DataWidth::Byte), Ok(0x44));
        assert_eq!(engine.read_data(0, 0x8002, DataWidth::Word), Ok(0x1122));
    }

    #[test]
    fn unmapped_segments_fault() {
        let mut engine = MemoryEngine::default();
        assert_eq!(
            engine.read_data(2, 0x0010, DataWidth::Word),
            Err(MemoryFault::new(2, 0x0010))
        );
        engine.map_segment(2);
        assert_eq!(engine.read_data(2, 0x0010, DataWidth::Word), Ok(0));
    }

    #[test]
    fn reset_loads_stack_and_entry_vectors() {
        let mut engine = MemoryEngine::from_rom(vec![0x00, 0x8E, 0x34, 0x12]);
        engine.reset();
        assert_eq!(engine.read_register(Register::Sp), 0x8E00);
        assert_eq!(engine.read_register(Register::Pc), 0x1234);
        assert_eq!(engine.read_code_word(0, 0x0004), Err(MemoryFault::new(0, 4)));
    }

    #[test]
    fn scripted_steps_advance_pc() {
        let mut engine = MemoryEngine::default();
        engine.script_steps([StepResult::ReadOnlyWrite]);
        assert_eq!(engine.step(), StepResult::ReadOnlyWrite);
        assert_eq!(engine.step(), StepResult::Ok);
        assert_eq!(engine.read_register(Register::Pc), 4);
        assert_eq!(engine.steps(), 2);
    }

    #[test]
    fn register_writes_are_masked() {
        let mut engine = MemoryEngine::default();
        engine.write_register(Register::Csr, 0x1F);
        engine.write_register(Register::Epsw(3), 0x1FF);
        assert_eq!(engine.read_register(Register::Csr), 0xF);
        assert_eq!(engine.read_register(Register::Epsw(3)), 0xFF);
    }

    #[test]
    fn missing_rom_is_reported() {
        let err = MemoryEngine::init(Path::new("/nonexistent/rom.bin"))
            .expect_err("rom does not exist");
        assert!(matches!(err, InitError::RomNotFound { .. }));
    }
}
