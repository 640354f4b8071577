//! Key matrix mapping and per-step keyboard emulation.

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::Engine;
use crate::memory::map::{
    INJECT_COLUMN, INJECT_READY, INJECT_ROW, IRQ_KEY, IRQ_KEY_BIT, KEY_INPUT, KEY_OUTPUT,
    SFR_SEGMENT,
};
use crate::memory::MemoryView;
use crate::MemoryFault;

/// Rows and columns of the scan matrix.
pub const MATRIX_SIZE: u8 = 8;

/// How key presses reach the emulated firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum KeyboardMode {
    /// Emulate the `KO`/`KI` scan matrix.
    #[default]
    Matrix,
    /// Write row/column flags straight into firmware RAM.
    Direct,
}

/// What pressing a logical key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyBinding {
    /// Closes the switch at `KI` bit `row`, `KO` bit `column`.
    Matrix {
        /// Input row (`0..8`).
        row: u8,
        /// Output column (`0..8`).
        column: u8,
    },
    /// Resets the core instead of touching the matrix.
    Reset,
}

/// Logical key name to binding map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMatrix {
    bindings: BTreeMap<String, KeyBinding>,
}

impl KeyMatrix {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to matrix position (`row`, `column`).
    ///
    /// Returns `false` and leaves the map unchanged when either coordinate is
    /// outside the 8x8 matrix.
    pub fn bind(&mut self, key: impl Into<String>, row: u8, column: u8) -> bool {
        if row >= MATRIX_SIZE || column >= MATRIX_SIZE {
            return false;
        }
        self.bindings
            .insert(key.into(), KeyBinding::Matrix { row, column });
        true
    }

    /// Binds `key` to the core reset sentinel.
    pub fn bind_reset(&mut self, key: impl Into<String>) {
        self.bindings.insert(key.into(), KeyBinding::Reset);
    }

    /// Looks up a key.
    #[must_use]
    pub fn binding(&self, key: &str) -> Option<KeyBinding> {
        self.bindings.get(key).copied()
    }

    /// Number of bound keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` when no key is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Held keys plus the edge detector for direct injection.
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    mode: KeyboardMode,
    held: BTreeSet<(u8, u8)>,
    ready_seen: bool,
}

impl Keyboard {
    /// Creates a keyboard in `mode` with no keys held.
    #[must_use]
    pub fn new(mode: KeyboardMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Current injection mode.
    #[must_use]
    pub const fn mode(&self) -> KeyboardMode {
        self.mode
    }

    /// Marks matrix position (`row`, `column`) as held.
    pub fn press(&mut self, row: u8, column: u8) {
        self.held.insert((row, column));
    }

    /// Releases matrix position (`row`, `column`).
    pub fn release(&mut self, row: u8, column: u8) {
        self.held.remove(&(row, column));
    }

    /// Releases every held key.
    pub fn release_all(&mut self) {
        self.held.clear();
    }

    /// Returns `true` while any key is held.
    #[must_use]
    pub fn any_held(&self) -> bool {
        !self.held.is_empty()
    }

    /// Clears held keys and the ready edge detector.
    pub fn reset(&mut self) {
        self.held.clear();
        self.ready_seen = false;
    }

    /// Runs one scan according to the current mode.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] from SFR accesses.
    pub fn tick<E: Engine + ?Sized>(
        &mut self,
        view: &mut MemoryView<'_, E>,
    ) -> Result<(), MemoryFault> {
        match self.mode {
            KeyboardMode::Matrix => self.scan_matrix(view),
            KeyboardMode::Direct => self.inject_direct(view),
        }
    }

    /// Computes the active-low `KI` byte for column select `ko`.
    #[must_use]
    pub fn input_rows(&self, ko: u8) -> u8 {
        self.held
            .iter()
            .filter(|(_, column)| ko & (1 << column) != 0)
            .fold(0xFF, |ki, (row, _)| ki & !(1 << row))
    }

    fn scan_matrix<E: Engine + ?Sized>(
        &self,
        view: &mut MemoryView<'_, E>,
    ) -> Result<(), MemoryFault> {
        let ko = view.read_u8(SFR_SEGMENT, KEY_OUTPUT)?;
        view.write_u8(SFR_SEGMENT, KEY_INPUT, self.input_rows(ko))?;
        if self.any_held() {
            let irq = view.read_u8(SFR_SEGMENT, IRQ_KEY)?;
            view.write_u8(SFR_SEGMENT, IRQ_KEY, irq | IRQ_KEY_BIT)?;
        }
        Ok(())
    }

    fn inject_direct<E: Engine + ?Sized>(
        &mut self,
        view: &mut MemoryView<'_, E>,
    ) -> Result<(), MemoryFault> {
        let ready = view.read_u8(SFR_SEGMENT, INJECT_READY)? != 0;
        if ready && !self.ready_seen {
            view.write_u8(SFR_SEGMENT, INJECT_ROW, 0)?;
            view.write_u8(SFR_SEGMENT, INJECT_COLUMN, 0)?;
        }
        self.ready_seen = ready;

        if self.any_held() {
            let (rows, columns) = self
                .held
                .iter()
                .fold((0u8, 0u8), |(rows, columns), (row, column)| {
                    (rows | (1 << row), columns | (1 << column))
                });
            view.write_u8(SFR_SEGMENT, INJECT_ROW, rows)?;
            view.write_u8(SFR_SEGMENT, INJECT_COLUMN, columns)?;
        }
        Ok(())
    }
}
