//! Typed accessors over the engine's fixed-width data primitives.

use crate::engine::{DataWidth, Engine};
use crate::MemoryFault;

/// Interpretation order for multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ByteOrder {
    /// Engine storage order; used for raw buffers and SFR values.
    #[default]
    Little,
    /// Most-significant byte first; used for register-style display.
    Big,
}

impl ByteOrder {
    /// Assembles up to eight storage-order bytes into a value.
    #[must_use]
    pub fn assemble(self, bytes: &[u8]) -> u64 {
        let fold = |acc: u64, byte: &u8| (acc << 8) | u64::from(*byte);
        match self {
            Self::Little => bytes.iter().rev().fold(0, fold),
            Self::Big => bytes.iter().fold(0, fold),
        }
    }
}

/// Splits `len` bytes greedily into engine access widths, largest first.
#[must_use]
pub fn split_widths(len: usize) -> Vec<DataWidth> {
    let mut remaining = len;
    let mut widths = Vec::new();
    for width in DataWidth::DESCENDING {
        while remaining >= width.bytes() {
            widths.push(width);
            remaining -= width.bytes();
        }
    }
    widths
}

/// Byte-granular view over an engine's data and code memory.
///
/// Reads starting at an odd address are widened by one leading byte so the
/// engine only ever sees word-aligned multi-byte accesses; the extra byte is
/// dropped before returning.
pub struct MemoryView<'a, E: ?Sized> {
    engine: &'a mut E,
}

impl<'a, E: Engine + ?Sized> MemoryView<'a, E> {
    /// Wraps an engine.
    pub const fn new(engine: &'a mut E) -> Self {
        Self { engine }
    }

    /// Returns the wrapped engine.
    pub const fn engine(&mut self) -> &mut E {
        self.engine
    }

    /// Reads `len` bytes at `segment:address` in storage order.
    ///
    /// # Errors
    ///
    /// Propagates the engine's [`MemoryFault`] for the first failing chunk.
    pub fn read(&self, segment: u8, address: u16, len: usize) -> Result<Vec<u8>, MemoryFault> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let skip = usize::from(address & 1);
        let start = address & !1;
        let total = len + skip;

        let mut bytes = Vec::with_capacity(total);
        let mut offset = 0usize;
        for width in split_widths(total) {
            #[allow(clippy::cast_possible_truncation)]
            let at = start.wrapping_add(offset as u16);
            let value = self.engine.read_data(segment, at, width)?;
            bytes.extend_from_slice(&value.to_le_bytes()[..width.bytes()]);
            offset += width.bytes();
        }
        if skip == 1 {
            bytes.remove(0);
        }
        Ok(bytes)
    }

    /// Reads a `len`-byte field (at most 8) and assembles it in `order`.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] from [`Self::read`].
    pub fn read_value(
        &self,
        segment: u8,
        address: u16,
        len: usize,
        order: ByteOrder,
    ) -> Result<u64, MemoryFault> {
        let bytes = self.read(segment, address, len.min(8))?;
        Ok(order.assemble(&bytes))
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`].
    pub fn read_u8(&self, segment: u8, address: u16) -> Result<u8, MemoryFault> {
        let value = self.read_value(segment, address, 1, ByteOrder::Little)?;
        Ok(value.to_le_bytes()[0])
    }

    /// Reads a 16-bit field interpreted in `order`.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`].
    pub fn read_u16(
        &self,
        segment: u8,
        address: u16,
        order: ByteOrder,
    ) -> Result<u16, MemoryFault> {
        let value = self.read_value(segment, address, 2, order)?;
        let [lo, hi, ..] = value.to_le_bytes();
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Writes the low `len` bytes (at most 8) of `value` in storage order.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] for the first failing chunk.
    pub fn write(
        &mut self,
        segment: u8,
        address: u16,
        len: usize,
        value: u64,
    ) -> Result<(), MemoryFault> {
        let bytes = value.to_le_bytes();
        self.write_bytes(segment, address, &bytes[..len.min(8)])
    }

    /// Writes `bytes` in storage order starting at `segment:address`.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] for the first failing chunk.
    pub fn write_bytes(
        &mut self,
        segment: u8,
        address: u16,
        bytes: &[u8],
    ) -> Result<(), MemoryFault> {
        let widths = if address & 1 == 1 && !bytes.is_empty() {
            let mut widths = vec![DataWidth::Byte];
            widths.extend(split_widths(bytes.len() - 1));
            widths
        } else {
            split_widths(bytes.len())
        };
        let mut offset = 0usize;
        for width in widths {
            let chunk = &bytes[offset..offset + width.bytes()];
            #[allow(clippy::cast_possible_truncation)]
            let at = address.wrapping_add(offset as u16);
            self.engine
                .write_data(segment, at, width, ByteOrder::Little.assemble(chunk))?;
            offset += width.bytes();
        }
        Ok(())
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`].
    pub fn write_u8(&mut self, segment: u8, address: u16, value: u8) -> Result<(), MemoryFault> {
        self.engine
            .write_data(segment, address, DataWidth::Byte, u64::from(value))
    }

    /// Writes a 16-bit value in storage order.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`].
    pub fn write_u16(&mut self, segment: u8, address: u16, value: u16) -> Result<(), MemoryFault> {
        self.write_bytes(segment, address, &value.to_le_bytes())
    }

    /// Reads one code word.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`].
    pub fn read_code_word(&self, segment: u8, address: u16) -> Result<u16, MemoryFault> {
        self.engine.read_code_word(segment, address)
    }

    /// Reads `N` consecutive code words, zero-filling unmapped words.
    #[must_use]
    pub fn code_words_or_zero<const N: usize>(&self, segment: u8, address: u16) -> [u16; N] {
        let mut words = [0u16; N];
        for (i, word) in words.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let at = address.wrapping_add((i as u16).wrapping_mul(2));
            *word = self.engine.read_code_word(segment, at).unwrap_or(0);
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::{split_widths, ByteOrder, MemoryView};
    use crate::engine::{DataWidth, Engine, MemoryEngine};
    use crate::MemoryFault;
    use rstest::rstest;

    fn engine_with_ramp(base: u16, len: u16) -> MemoryEngine {
        let mut engine = MemoryEngine::default();
        for i in 0..len {
            engine
                .write_data(0, base + i, DataWidth::Byte, u64::from(i))
                .expect("segment 0 is mapped");
        }
        engine
    }

    #[rstest]
    #[case(0, vec![])]
    #[case(1, vec![DataWidth::Byte])]
    #[case(7, vec![DataWidth::Dword, DataWidth::Word, DataWidth::Byte])]
    #[case(12, vec![DataWidth::Qword, DataWidth::Dword])]
    #[case(17, vec![DataWidth::Qword, DataWidth::Qword, DataWidth::Byte])]
    fn widths_split_largest_first(#[case] len: usize, #[case] expected: Vec<DataWidth>) {
        assert_eq!(split_widths(len), expected);
    }

    #[test]
    fn byte_order_assembles_both_ways() {
        assert_eq!(ByteOrder::Little.assemble(&[0x34, 0x12]), 0x1234);
        assert_eq!(ByteOrder::Big.assemble(&[0x34, 0x12]), 0x3412);
    }

    #[test]
    fn aligned_read_returns_storage_order() {
        let mut engine = engine_with_ramp(0x8000, 16);
        let view = MemoryView::new(&mut engine);
        let bytes = view.read(0, 0x8000, 16).expect("mapped");
        assert_eq!(bytes, (0u8..16).collect::<Vec<_>>());
    }

    #[test]
    fn odd_read_drops_leading_alignment_byte() {
        let mut engine = engine_with_ramp(0x8000, 16);
        let view = MemoryView::new(&mut engine);
        assert_eq!(view.read(0, 0x8003, 5).expect("mapped"), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn typed_reads_honour_requested_order() {
        let mut engine = engine_with_ramp(0x8000, 4);
        let view = MemoryView::new(&mut engine);
        assert_eq!(view.read_u16(0, 0x8000, ByteOrder::Little), Ok(0x0100));
        assert_eq!(view.read_u16(0, 0x8000, ByteOrder::Big), Ok(0x0001));
        assert_eq!(view.read_u16(0, 0x8001, ByteOrder::Little), Ok(0x0201));
    }

    #[test]
    fn faults_surface_for_unmapped_segments() {
        let mut engine = MemoryEngine::default();
        let view = MemoryView::new(&mut engine);
        assert_eq!(view.read(4, 0x0010, 2), Err(MemoryFault::new(4, 0x0010)));
    }

    #[test]
    fn writes_round_trip_through_odd_addresses() {
        let mut engine = MemoryEngine::default();
        let mut view = MemoryView::new(&mut engine);
        view.write(0, 0x9001, 4, 0xDDCC_BBAA).expect("mapped");
        assert_eq!(
            view.read(0, 0x9000, 6).expect("mapped"),
            vec![0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0x00]
        );
        view.write_u16(0, 0x9010, 0xBEEF).expect("mapped");
        assert_eq!(view.read_u8(0, 0x9010), Ok(0xEF));
    }

    #[test]
    fn speculative_code_reads_zero_fill_past_rom() {
        let mut engine = MemoryEngine::from_rom(vec![0x01, 0x02]);
        let view = MemoryView::new(&mut engine);
        assert_eq!(view.code_words_or_zero::<3>(0, 0), [0x0201, 0, 0]);
    }
}
