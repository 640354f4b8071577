//! Immutable memory windows and their hex-dump rendering.

use std::fmt::Write as _;

use crate::engine::Engine;
use crate::memory::MemoryView;
use crate::MemoryFault;

/// Bytes per hex-dump line.
pub const DUMP_LINE_BYTES: usize = 16;

/// Formats one hex-dump line: `AAAA  XX XX ..  ascii`.
///
/// Bytes outside `0x20..=0x7E` show as `.` in the ASCII column.
#[must_use]
pub fn format_dump_line(address: u16, bytes: &[u8]) -> String {
    let mut line = format!("{address:04X}  ");
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{byte:02X}");
    }
    line.push_str("  ");
    line.extend(bytes.iter().map(|byte| {
        if (0x20..=0x7E).contains(byte) {
            char::from(*byte)
        } else {
            '.'
        }
    }));
    line
}

/// A byte window captured at one observation point.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemorySnapshot {
    segment: u8,
    base: u16,
    bytes: Vec<u8>,
}

impl MemorySnapshot {
    /// Wraps already-read bytes.
    #[must_use]
    pub const fn new(segment: u8, base: u16, bytes: Vec<u8>) -> Self {
        Self {
            segment,
            base,
            bytes,
        }
    }

    /// Reads `len` bytes at `segment:base`.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] when the window is unmapped.
    pub fn capture<E: Engine + ?Sized>(
        view: &MemoryView<'_, E>,
        segment: u8,
        base: u16,
        len: usize,
    ) -> Result<Self, MemoryFault> {
        Ok(Self::new(segment, base, view.read(segment, base, len)?))
    }

    /// Segment the window was read from.
    #[must_use]
    pub const fn segment(&self) -> u8 {
        self.segment
    }

    /// Address of the first byte.
    #[must_use]
    pub const fn base(&self) -> u16 {
        self.base
    }

    /// Captured bytes in storage order.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of hex-dump lines, counting a trailing partial line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.bytes.len().div_ceil(DUMP_LINE_BYTES)
    }

    /// Renders hex-dump line `index`.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<String> {
        let chunk = self.bytes.chunks(DUMP_LINE_BYTES).nth(index)?;
        Some(format_dump_line(self.line_address(index), chunk))
    }

    /// Renders every line.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.bytes
            .chunks(DUMP_LINE_BYTES)
            .enumerate()
            .map(|(i, chunk)| format_dump_line(self.line_address(i), chunk))
    }

    /// Renders the whole dump, one line per 16 bytes.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }

    /// Returns `true` when `other` covers the same window.
    #[must_use]
    pub fn same_window(&self, other: &Self) -> bool {
        self.segment == other.segment
            && self.base == other.base
            && self.bytes.len() == other.bytes.len()
    }

    /// Line indices whose content differs from `previous`.
    ///
    /// Every line is reported when `previous` covers a different window.
    #[must_use]
    pub fn changed_lines(&self, previous: &Self) -> Vec<usize> {
        if !self.same_window(previous) {
            return (0..self.line_count()).collect();
        }
        self.bytes
            .chunks(DUMP_LINE_BYTES)
            .zip(previous.bytes.chunks(DUMP_LINE_BYTES))
            .enumerate()
            .filter(|(_, (now, before))| now != before)
            .map(|(i, _)| i)
            .collect()
    }

    fn line_address(&self, index: usize) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let offset = (index * DUMP_LINE_BYTES) as u16;
        self.base.wrapping_add(offset)
    }
}
