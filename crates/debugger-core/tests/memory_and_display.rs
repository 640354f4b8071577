//! Memory view alignment, hex-dump rendering and display decoding.

#![allow(clippy::pedantic, clippy::nursery)]

use debugger_core::display::decode;
use debugger_core::memory::map::DISPLAY_ROW_BYTES;
use debugger_core::{
    ControllerConfig, DisplayDecoder, DisplaySource, ExecutionController, MemoryEngine,
    MemorySnapshot, MemoryView, RawFrame, StatusIcon,
};
use log as _;
use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
#[cfg(feature = "serde")]
use serde_json as _;
use thiserror as _;

fn raw_frame() -> impl Strategy<Value = RawFrame> {
    prop::array::uniform32(prop::array::uniform12(any::<u8>()))
}

proptest! {
    #[test]
    fn odd_reads_match_aligned_reads_minus_the_first_byte(
        fill in prop::collection::vec(any::<u8>(), 96),
        offset in 0u16..24,
        len in 1usize..32,
    ) {
        let mut engine = MemoryEngine::default();
        let mut view = MemoryView::new(&mut engine);
        view.write_bytes(0, 0x9000, &fill).expect("mapped");

        let address = 0x9000 + offset * 2 + 1;
        let odd = view.read(0, address, len).expect("mapped");
        let aligned = view.read(0, address - 1, len + 1).expect("mapped");
        prop_assert_eq!(&odd[..], &aligned[1..]);
        let start = usize::from(address - 0x9000);
        prop_assert_eq!(&odd[..], &fill[start..start + len]);
    }

    #[test]
    fn decoding_is_deterministic_and_cache_independent(
        first in raw_frame(),
        second in raw_frame(),
    ) {
        let mut decoder = DisplayDecoder::new();
        let fresh = decode(&first);
        prop_assert_eq!(decoder.decode(&first), fresh.clone());
        decoder.decode(&second);
        prop_assert_eq!(decoder.decode(&first), fresh.clone());
        prop_assert_eq!(decode(&first), fresh);
    }
}

#[test]
fn ramp_window_renders_the_reference_dump_line() {
    let mut engine = MemoryEngine::default();
    let mut view = MemoryView::new(&mut engine);
    let ramp: Vec<u8> = (0..16).collect();
    view.write_bytes(0, 0x8000, &ramp).expect("mapped");
    let snapshot = MemorySnapshot::capture(&view, 0, 0x8000, 16).expect("mapped");
    assert_eq!(
        snapshot.render(),
        "8000  00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F  ................"
    );
}

#[test]
fn controller_snapshots_diff_against_the_previous_capture() {
    let mut ctl = ExecutionController::new(MemoryEngine::default(), ControllerConfig::default());
    let before = ctl.snapshot(0, 0x8000, 0x40).expect("mapped");
    ctl.write_byte(0, 0x8021, b'A').expect("mapped");
    let after = ctl.snapshot(0, 0x8000, 0x40).expect("mapped");
    assert_eq!(after.changed_lines(&before), vec![2]);
    assert_eq!(
        after.line(2).as_deref(),
        Some("8020  00 41 00 00 00 00 00 00 00 00 00 00 00 00 00 00  .A..............")
    );
}

#[test]
fn lcd_and_buffer_windows_decode_identically() {
    let mut ctl = ExecutionController::new(MemoryEngine::default(), ControllerConfig::default());
    // Status row: SHIFT and Disp. Body row 0: leftmost and rightmost pixels.
    let rows: [(u16, u16); 2] = [(0xF800, 0xF810), (0x87D0, 0x87DC)];
    for (status, body) in rows {
        ctl.write_byte(0, status, 0x10).expect("mapped");
        ctl.write_byte(0, status + 0x0B, 0x10).expect("mapped");
        ctl.write_byte(0, body, 0x80).expect("mapped");
        #[allow(clippy::cast_possible_truncation)]
        let last = body + (DISPLAY_ROW_BYTES as u16 - 1);
        ctl.write_byte(0, last, 0x01).expect("mapped");
    }

    let lcd = ctl.display_frame(DisplaySource::Lcd).expect("mapped");
    let buffer = ctl.display_frame(DisplaySource::Buffer).expect("mapped");
    assert_eq!(lcd, buffer);
    assert_eq!(
        lcd.lit_icons().collect::<Vec<_>>(),
        vec![StatusIcon::Shift, StatusIcon::Disp]
    );
    assert!(lcd.pixel(0, 0));
    assert!(lcd.pixel(0, 95));
    assert!(!lcd.pixel(0, 1));
    assert!(!lcd.pixel(1, 0));
}
