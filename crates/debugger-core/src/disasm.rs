//! Labelling of the current instruction through an external disassembler.

use crate::engine::Engine;
use crate::memory::MemoryView;
use crate::CodeAddress;

/// Result of decoding one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Disassembly {
    /// Mnemonic and operands, e.g. `"MOV ER0, #1234h"`.
    pub text: String,
    /// Instruction length in code words.
    pub len_words: u8,
    /// The instruction is a `DSR` prefix that applies to the next one.
    pub dsr_prefix: bool,
}

/// Read-only instruction decoder supplied by the host.
pub trait Disassembler: Send {
    /// Decodes the instruction whose first word is `words[0]`.
    fn disassemble(&self, words: [u16; 3]) -> Disassembly;
}

/// A disassembled instruction at a code location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionLabel {
    /// Location of the first word.
    pub at: CodeAddress,
    /// Raw words fed to the disassembler for the first decode.
    pub words: [u16; 3],
    /// Full text, including the prefixed instruction when present.
    pub text: String,
}

/// Disassembles the instruction at `at`.
///
/// Code reads are speculative: unmapped words decode as zero. When the first
/// decode is a `DSR` prefix, the instruction after it is decoded too and the
/// two texts are joined.
#[must_use]
pub fn label_instruction<E: Engine + ?Sized>(
    view: &MemoryView<'_, E>,
    disassembler: &dyn Disassembler,
    at: CodeAddress,
) -> InstructionLabel {
    let words = view.code_words_or_zero::<3>(at.segment, at.offset);
    let first = disassembler.disassemble(words);
    let text = if first.dsr_prefix {
        let next_at = at.advance_words(u16::from(first.len_words.max(1)));
        let next_words = view.code_words_or_zero::<3>(next_at.segment, next_at.offset);
        let next = disassembler.disassemble(next_words);
        format!("{} {}", first.text, next.text)
    } else {
        first.text
    };
    InstructionLabel { at, words, text }
}
