//! Decoding of the packed LCD framebuffer into icons and a pixel grid.
//!
//! Row 0 of a capture drives the status bar; rows 1..32 hold the dot-matrix
//! body, eight pixels per byte, most significant bit leftmost.

use std::fmt::Write as _;

use crate::engine::Engine;
use crate::memory::map::SFR_SEGMENT;
use crate::memory::{
    MemoryView, WindowDescriptor, BUFFER_WINDOW, DISPLAY_ROWS, DISPLAY_ROW_BYTES, LCD_WINDOW,
};
use crate::MemoryFault;

/// Number of status-bar icons.
pub const STATUS_ICON_COUNT: usize = 18;
/// Rows of the dot-matrix body.
pub const BODY_ROWS: usize = DISPLAY_ROWS - 1;
/// Columns of the dot-matrix body.
pub const BODY_COLUMNS: usize = DISPLAY_ROW_BYTES * 8;

/// Raw display capture: 32 rows of 12 bytes.
pub type RawFrame = [[u8; DISPLAY_ROW_BYTES]; DISPLAY_ROWS];

/// Status-bar indicator glyphs, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum StatusIcon {
    Shift,
    Alpha,
    Memory,
    Store,
    Recall,
    Statistics,
    Complex,
    Matrix,
    Vector,
    Degree,
    Radian,
    Gradian,
    Fix,
    Sci,
    Math,
    Down,
    Up,
    Disp,
}

impl StatusIcon {
    /// All icons in display order.
    pub const ALL: [Self; STATUS_ICON_COUNT] = [
        Self::Shift,
        Self::Alpha,
        Self::Memory,
        Self::Store,
        Self::Recall,
        Self::Statistics,
        Self::Complex,
        Self::Matrix,
        Self::Vector,
        Self::Degree,
        Self::Radian,
        Self::Gradian,
        Self::Fix,
        Self::Sci,
        Self::Math,
        Self::Down,
        Self::Up,
        Self::Disp,
    ];

    /// Position of the icon in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// `(byte index in row 0, bit mask)` that drives the icon.
    #[must_use]
    pub const fn source(self) -> (usize, u8) {
        match self {
            Self::Shift => (0x0, 1 << 4),
            Self::Alpha => (0x0, 1 << 2),
            Self::Memory => (0x1, 1 << 4),
            Self::Store => (0x1, 1 << 1),
            Self::Recall => (0x2, 1 << 6),
            Self::Statistics => (0x3, 1 << 6),
            Self::Complex => (0x4, 1 << 7),
            Self::Matrix => (0x5, 1 << 6),
            Self::Vector => (0x5, 1 << 1),
            Self::Degree => (0x7, 1 << 5),
            Self::Radian => (0x7, 1 << 1),
            Self::Gradian => (0x8, 1 << 4),
            Self::Fix => (0x8, 1 << 0),
            Self::Sci => (0x9, 1 << 5),
            Self::Math => (0xA, 1 << 6),
            Self::Down => (0xA, 1 << 3),
            Self::Up => (0xB, 1 << 7),
            Self::Disp => (0xB, 1 << 4),
        }
    }

    /// Short label as printed on the calculator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shift => "S",
            Self::Alpha => "A",
            Self::Memory => "M",
            Self::Store => "STO",
            Self::Recall => "RCL",
            Self::Statistics => "STAT",
            Self::Complex => "CMPLX",
            Self::Matrix => "MAT",
            Self::Vector => "VCT",
            Self::Degree => "D",
            Self::Radian => "R",
            Self::Gradian => "G",
            Self::Fix => "FIX",
            Self::Sci => "SCI",
            Self::Math => "Math",
            Self::Down => "v",
            Self::Up => "^",
            Self::Disp => "Disp",
        }
    }
}

/// Which emulated window a display frame is captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DisplaySource {
    /// Live LCD controller output.
    #[default]
    Lcd,
    /// Software-managed off-screen buffer.
    Buffer,
}

impl DisplaySource {
    /// Address layout of the source window.
    #[must_use]
    pub const fn window(self) -> WindowDescriptor {
        match self {
            Self::Lcd => LCD_WINDOW,
            Self::Buffer => BUFFER_WINDOW,
        }
    }
}

/// Decoded display image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayFrame {
    /// Icon states indexed by [`StatusIcon::index`].
    pub status_icons: [bool; STATUS_ICON_COUNT],
    /// Body pixels, `pixels[row][column]`.
    pub pixels: [[bool; BODY_COLUMNS]; BODY_ROWS],
}

impl Default for DisplayFrame {
    fn default() -> Self {
        Self {
            status_icons: [false; STATUS_ICON_COUNT],
            pixels: [[false; BODY_COLUMNS]; BODY_ROWS],
        }
    }
}

impl DisplayFrame {
    /// Returns `true` when `icon` is lit.
    #[must_use]
    pub const fn icon(&self, icon: StatusIcon) -> bool {
        self.status_icons[icon.index()]
    }

    /// Lit icons in display order.
    pub fn lit_icons(&self) -> impl Iterator<Item = StatusIcon> + '_ {
        StatusIcon::ALL
            .into_iter()
            .filter(move |icon| self.icon(*icon))
    }

    /// Icon states packed as a bitmask, bit `n` for `StatusIcon::ALL[n]`.
    #[must_use]
    pub fn status_mask(&self) -> u32 {
        self.status_icons
            .iter()
            .enumerate()
            .filter(|(_, lit)| **lit)
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    /// Returns the body pixel at `row`, `column`; out of range is unlit.
    #[must_use]
    pub fn pixel(&self, row: usize, column: usize) -> bool {
        self.pixels
            .get(row)
            .and_then(|line| line.get(column))
            .copied()
            .unwrap_or(false)
    }

    /// Renders the frame as text: icon labels, then `#`/`.` body rows.
    #[must_use]
    pub fn render_text(&self) -> String {
        let labels: Vec<&str> = self.lit_icons().map(StatusIcon::label).collect();
        let mut out = labels.join(" ");
        for line in &self.pixels {
            out.push('\n');
            for lit in line {
                out.push(if *lit { '#' } else { '.' });
            }
        }
        out
    }
}

/// Decodes a raw capture. Pure: equal inputs always give equal frames.
#[must_use]
pub fn decode(rows: &RawFrame) -> DisplayFrame {
    let mut frame = DisplayFrame::default();
    let status = &rows[0];
    for icon in StatusIcon::ALL {
        let (byte, mask) = icon.source();
        frame.status_icons[icon.index()] = status[byte] & mask != 0;
    }
    for (line, raw) in frame.pixels.iter_mut().zip(&rows[1..]) {
        for (column, pixel) in line.iter_mut().enumerate() {
            let bit = 7 - (column % 8);
            *pixel = raw[column / 8] & (1 << bit) != 0;
        }
    }
    frame
}

/// Reads a raw capture of `source` from emulated memory.
///
/// # Errors
///
/// Propagates [`MemoryFault`] when the window is unmapped.
pub fn capture<E: Engine + ?Sized>(
    view: &MemoryView<'_, E>,
    source: DisplaySource,
) -> Result<RawFrame, MemoryFault> {
    let window = source.window();
    let mut rows = [[0u8; DISPLAY_ROW_BYTES]; DISPLAY_ROWS];
    for (i, row) in rows.iter_mut().enumerate() {
        let bytes = view.read(SFR_SEGMENT, window.row_address(i), DISPLAY_ROW_BYTES)?;
        row.copy_from_slice(&bytes);
    }
    Ok(rows)
}

/// Formats a raw capture as hex rows, for logging.
#[must_use]
pub fn format_raw(rows: &RawFrame) -> String {
    let mut out = String::new();
    for row in rows {
        for byte in row {
            let _ = write!(out, "{byte:02X}");
        }
        out.push('\n');
    }
    out
}

/// Decoder that memoizes the most recent frame.
///
/// Consecutive renders of an unchanged screen skip the bit expansion.
#[derive(Debug, Clone, Default)]
pub struct DisplayDecoder {
    last: Option<(RawFrame, DisplayFrame)>,
}

impl DisplayDecoder {
    /// Creates a decoder with an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Decodes `rows`, reusing the cached frame when the input is unchanged.
    pub fn decode(&mut self, rows: &RawFrame) -> DisplayFrame {
        if let Some((raw, frame)) = &self.last {
            if raw == rows {
                return frame.clone();
            }
        }
        let frame = decode(rows);
        self.last = Some((*rows, frame.clone()));
        frame
    }
}
