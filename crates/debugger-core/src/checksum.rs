//! ROM image checksum as computed by the firmware self-test.

use std::fmt;

use crate::engine::Engine;
use crate::MemoryFault;

/// Code segment summed over its full range.
pub const CHECKSUM_FULL_SEGMENT: u8 = 8;
/// Code segment summed up to [`CHECKSUM_STORED_AT`].
pub const CHECKSUM_PARTIAL_SEGMENT: u8 = 1;
/// Offset of the stored checksum word in [`CHECKSUM_PARTIAL_SEGMENT`].
pub const CHECKSUM_STORED_AT: u16 = 0xFFFC;

const FULL_SEGMENT_END: u16 = 0xFFFE;
const PARTIAL_SEGMENT_END: u16 = 0xFFFA;

/// Stored and recomputed ROM checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ChecksumReport {
    /// Checksum word stored in the image.
    pub expected: u16,
    /// Checksum recomputed from the image.
    pub calculated: u16,
}

impl ChecksumReport {
    /// Returns `true` when the stored and computed values agree.
    #[must_use]
    pub const fn matches(self) -> bool {
        self.expected == self.calculated
    }
}

impl fmt::Display for ChecksumReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Expected checksum: {:04X}\nCalculated checksum: {:04X}",
            self.expected, self.calculated
        )
    }
}

fn sum_segment<E: Engine + ?Sized>(
    engine: &E,
    segment: u8,
    end: u16,
    sum: u16,
) -> Result<u16, MemoryFault> {
    let mut sum = sum;
    for address in (0..end).step_by(2) {
        let word = engine.read_code_word(segment, address)?;
        sum = sum.wrapping_add(word.swap_bytes());
    }
    Ok(sum)
}

/// Recomputes the ROM checksum.
///
/// Code words are summed with their bytes swapped; the checksum is the
/// negated 16-bit sum.
///
/// # Errors
///
/// Propagates [`MemoryFault`] when a summed code word is outside the image.
pub fn rom_checksum<E: Engine + ?Sized>(engine: &E) -> Result<ChecksumReport, MemoryFault> {
    let sum = sum_segment(engine, CHECKSUM_FULL_SEGMENT, FULL_SEGMENT_END, 0)?;
    let sum = sum_segment(engine, CHECKSUM_PARTIAL_SEGMENT, PARTIAL_SEGMENT_END, sum)?;
    let expected = engine.read_code_word(CHECKSUM_PARTIAL_SEGMENT, CHECKSUM_STORED_AT)?;
    Ok(ChecksumReport {
        expected,
        calculated: sum.wrapping_neg(),
    })
}

#[cfg(test)]
mod tests {
    use super::{rom_checksum, ChecksumReport};
    use crate::engine::MemoryEngine;
    use crate::memory::SEGMENT_BYTES;
    use crate::MemoryFault;

    fn rom_with(words: &[(usize, u16)]) -> Vec<u8> {
        let mut rom = vec![0u8; 9 * SEGMENT_BYTES];
        for (offset, word) in words {
            rom[*offset..*offset + 2].copy_from_slice(&word.to_le_bytes());
        }
        rom
    }

    #[test]
    fn blank_image_sums_to_zero() {
        let engine = MemoryEngine::from_rom(rom_with(&[]));
        let report = rom_checksum(&engine).expect("image covers both segments");
        assert_eq!(
            report,
            ChecksumReport {
                expected: 0,
                calculated: 0
            }
        );
        assert!(report.matches());
    }

    #[test]
    fn words_are_byte_swapped_and_negated() {
        let seg1 = SEGMENT_BYTES;
        let seg8 = 8 * SEGMENT_BYTES;
        let engine = MemoryEngine::from_rom(rom_with(&[
            (seg8, 0x0100),
            (seg1 + 0x10, 0x0200),
            (seg1 + 0xFFFC, 0xFFFD),
        ]));
        let report = rom_checksum(&engine).expect("image covers both segments");
        assert_eq!(report.calculated, 0x0003_u16.wrapping_neg());
        assert_eq!(report.expected, 0xFFFD);
        assert!(report.matches());
        assert_eq!(
            report.to_string(),
            "Expected checksum: FFFD\nCalculated checksum: FFFD"
        );
    }

    #[test]
    fn checksum_word_and_tail_are_excluded() {
        let seg1 = SEGMENT_BYTES;
        let engine = MemoryEngine::from_rom(rom_with(&[(seg1 + 0xFFFA, 0x1234)]));
        let report = rom_checksum(&engine).expect("image covers both segments");
        assert_eq!(report.calculated, 0);
    }

    #[test]
    fn short_image_faults() {
        let engine = MemoryEngine::from_rom(vec![0; SEGMENT_BYTES]);
        assert_eq!(rom_checksum(&engine), Err(MemoryFault::new(8, 0)));
    }
}
