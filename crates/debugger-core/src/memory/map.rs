//! Fixed special-function-register and display window addresses.
//!
//! All addresses live in data segment 0 and hold engine-native
//! (little-endian) values.

/// Data segment holding the SFR block and display windows.
pub const SFR_SEGMENT: u8 = 0;

/// Standby acceptor status register (`STPACP`).
pub const STPACP: u16 = 0xF008;
/// Standby control register (`SBYCON`).
pub const SBYCON: u16 = 0xF009;
/// `SBYCON` value requesting stop mode.
pub const STANDBY_STOP_CODE: u8 = 0x02;
/// Level-1 acceptor pattern for `STPACP`.
pub const STPACP_LEVEL1_MASK: u8 = 0x50;
/// Level-2 acceptor pattern for `STPACP`.
pub const STPACP_LEVEL2_MASK: u8 = 0xA0;

/// Interrupt request flag register carrying the key interrupt.
pub const IRQ_KEY: u16 = 0xF014;
/// Key interrupt bit in [`IRQ_KEY`].
pub const IRQ_KEY_BIT: u8 = 0x02;
/// Interrupt request flag register carrying the timer wake interrupt.
pub const IRQ_TIMER: u16 = 0xF016;
/// Timer wake bit in [`IRQ_TIMER`].
pub const IRQ_TIMER_BIT: u8 = 0x20;

/// Timer compare target (`TM0D`), 16-bit.
pub const TIMER_TARGET: u16 = 0xF020;
/// Timer counter (`TM0C`), 16-bit.
pub const TIMER_COUNTER: u16 = 0xF022;

/// Key input rows (`KI`), active low.
pub const KEY_INPUT: u16 = 0xF040;
/// Key output column select (`KO`).
pub const KEY_OUTPUT: u16 = 0xF046;

/// Direct key-injection ready flag.
pub const INJECT_READY: u16 = 0x8E00;
/// Direct key-injection row byte.
pub const INJECT_ROW: u16 = 0x8E01;
/// Direct key-injection column byte.
pub const INJECT_COLUMN: u16 = 0x8E02;

/// First row of the LCD controller window.
pub const LCD_WINDOW_BASE: u16 = 0xF800;
/// Byte distance between LCD controller rows.
pub const LCD_WINDOW_STRIDE: u16 = 0x10;
/// First row of the software off-screen buffer.
pub const BUFFER_WINDOW_BASE: u16 = 0x87D0;
/// Byte distance between off-screen buffer rows.
pub const BUFFER_WINDOW_STRIDE: u16 = 0x0C;

/// Raw rows captured per display frame (status bar plus body).
pub const DISPLAY_ROWS: usize = 32;
/// Raw bytes captured per display row.
pub const DISPLAY_ROW_BYTES: usize = 12;

/// Describes one captured display window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowDescriptor {
    /// Address of row 0.
    pub base: u16,
    /// Byte distance between consecutive rows.
    pub stride: u16,
}

impl WindowDescriptor {
    /// Address of `row` within the window.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn row_address(self, row: usize) -> u16 {
        self.base.wrapping_add(self.stride.wrapping_mul(row as u16))
    }
}

/// The LCD controller output window.
pub const LCD_WINDOW: WindowDescriptor = WindowDescriptor {
    base: LCD_WINDOW_BASE,
    stride: LCD_WINDOW_STRIDE,
};

/// The software-managed off-screen buffer window.
pub const BUFFER_WINDOW: WindowDescriptor = WindowDescriptor {
    base: BUFFER_WINDOW_BASE,
    stride: BUFFER_WINDOW_STRIDE,
};
