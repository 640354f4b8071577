//! Memory access primitives and fixed address map.

/// Fixed SFR and display window addresses.
pub mod map;
/// Alignment-splitting typed view over engine memory.
pub mod view;

pub use map::{WindowDescriptor, BUFFER_WINDOW, DISPLAY_ROWS, DISPLAY_ROW_BYTES, LCD_WINDOW};
pub use view::{split_widths, ByteOrder, MemoryView};

/// Size in bytes of one data or code segment.
pub const SEGMENT_BYTES: usize = u16::MAX as usize + 1;
