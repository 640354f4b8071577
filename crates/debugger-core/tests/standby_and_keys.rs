//! Stop-mode handshake, timer wake and key delivery through the controller.

#![allow(clippy::pedantic, clippy::nursery)]

use debugger_core::memory::map::{
    INJECT_COLUMN, INJECT_READY, INJECT_ROW, IRQ_TIMER, SBYCON, STANDBY_STOP_CODE, STPACP,
    TIMER_COUNTER, TIMER_TARGET,
};
use debugger_core::{
    ControllerConfig, ExecutionController, KeyMatrix, KeyboardMode, MemoryEngine, Notification,
    StopState,
};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
#[cfg(feature = "serde")]
use serde_json as _;
use thiserror as _;

fn controller(mode: KeyboardMode) -> ExecutionController<MemoryEngine> {
    let engine = MemoryEngine::from_rom(vec![0xF0, 0x8D, 0x00, 0x01]);
    let config = ControllerConfig {
        keyboard_mode: mode,
        ..ControllerConfig::default()
    };
    ExecutionController::new(engine, config)
}

fn byte(ctl: &ExecutionController<MemoryEngine>, address: u16) -> u8 {
    ctl.snapshot(0, address, 1).expect("mapped").bytes()[0]
}

fn set_timer_target(ctl: &mut ExecutionController<MemoryEngine>, target: u16) {
    let [lo, hi] = target.to_le_bytes();
    ctl.write_byte(0, TIMER_TARGET, lo).expect("mapped");
    ctl.write_byte(0, TIMER_TARGET + 1, hi).expect("mapped");
}

fn enter_standby(ctl: &mut ExecutionController<MemoryEngine>) {
    ctl.write_byte(0, STPACP, 0x50).expect("mapped");
    ctl.step().expect("step");
    assert_eq!(
        ctl.stop_state(),
        StopState::Armed {
            level1: true,
            level2: false
        }
    );
    ctl.write_byte(0, STPACP, 0xF0).expect("mapped");
    ctl.write_byte(0, SBYCON, STANDBY_STOP_CODE).expect("mapped");
    let outcome = ctl.step().expect("step");
    assert_eq!(outcome.stop_state, StopState::Stopped);
}

#[test]
fn handshake_stops_the_core_and_clears_control_registers() {
    let mut ctl = controller(KeyboardMode::Matrix);
    set_timer_target(&mut ctl, 0xFFFF);
    enter_standby(&mut ctl);

    assert_eq!(byte(&ctl, SBYCON), 0);
    assert_eq!(byte(&ctl, STPACP), 0);
    assert!(ctl.drain_notifications().contains(&Notification::StandbyEntered));
    assert_eq!(ctl.diagnostics().standby_entries, 1);
}

#[test]
fn stopped_core_holds_steps_but_keeps_ticking_the_timer() {
    let mut ctl = controller(KeyboardMode::Matrix);
    set_timer_target(&mut ctl, 0xFFFF);
    enter_standby(&mut ctl);
    let steps = ctl.with_engine(|engine| engine.steps());
    let counter = ctl.snapshot(0, TIMER_COUNTER, 2).expect("mapped");

    let outcome = ctl.step().expect("held step");
    assert_eq!(outcome.result, None);
    assert_eq!(outcome.before, outcome.after);
    assert_eq!(ctl.with_engine(|engine| engine.steps()), steps);
    let after = ctl.snapshot(0, TIMER_COUNTER, 2).expect("mapped");
    assert_ne!(after.bytes(), counter.bytes());
}

#[test]
fn breakpoint_at_the_parked_location_fires_while_stopped() {
    let mut ctl = controller(KeyboardMode::Matrix);
    set_timer_target(&mut ctl, 0xFFFF);
    enter_standby(&mut ctl);
    let parked = ctl.register_report().expect("mapped").location;
    let _ = ctl.drain_notifications();
    let steps = ctl.with_engine(|engine| engine.steps());

    ctl.set_breakpoint(parked.segment, parked.offset)
        .expect("valid breakpoint");
    let outcome = ctl.step().expect("held step");
    assert_eq!(outcome.result, None);
    assert!(outcome.breakpoint_hit);
    assert!(outcome.requires_supervision());
    assert_eq!(
        ctl.drain_notifications(),
        vec![Notification::BreakpointHit { at: parked }]
    );
    assert_eq!(ctl.with_engine(|engine| engine.steps()), steps);
    assert_eq!(ctl.diagnostics().breakpoint_hits, 1);
}

#[test]
fn timer_compare_wakes_the_core_and_flags_irq_in_matrix_mode() {
    let mut ctl = controller(KeyboardMode::Matrix);
    set_timer_target(&mut ctl, 0xFFFF);
    enter_standby(&mut ctl);
    let _ = ctl.drain_notifications();

    set_timer_target(&mut ctl, 0);
    let outcome = ctl.step().expect("step");
    assert!(outcome.result.is_some());
    assert_eq!(ctl.stop_state(), StopState::Running);
    assert_eq!(byte(&ctl, IRQ_TIMER) & 0x20, 0x20);
    assert_eq!(ctl.drain_notifications(), vec![Notification::TimerWake]);
    assert_eq!(ctl.diagnostics().timer_wakes, 1);
}

#[test]
fn direct_mode_wake_does_not_raise_irq() {
    let mut ctl = controller(KeyboardMode::Direct);
    set_timer_target(&mut ctl, 0xFFFF);
    enter_standby(&mut ctl);
    set_timer_target(&mut ctl, 0);
    ctl.step().expect("step");
    assert_eq!(ctl.stop_state(), StopState::Running);
    assert_eq!(byte(&ctl, IRQ_TIMER), 0);
}

#[test]
fn status_pattern_on_the_same_sample_does_not_arm_level_two() {
    let mut ctl = controller(KeyboardMode::Matrix);
    set_timer_target(&mut ctl, 0xFFFF);
    ctl.write_byte(0, STPACP, 0xF0).expect("mapped");
    ctl.write_byte(0, SBYCON, STANDBY_STOP_CODE).expect("mapped");
    ctl.step().expect("step");
    assert_eq!(
        ctl.stop_state(),
        StopState::Armed {
            level1: true,
            level2: false
        }
    );
    assert_eq!(byte(&ctl, SBYCON), STANDBY_STOP_CODE);
}

#[test]
fn direct_injection_clears_on_ready_edge_and_held_keys_rewrite() {
    let mut ctl = controller(KeyboardMode::Direct);
    let mut keys = KeyMatrix::new();
    assert!(keys.bind("5", 1, 1));
    ctl.set_key_matrix(keys);

    ctl.write_byte(0, INJECT_ROW, 0xAA).expect("mapped");
    ctl.write_byte(0, INJECT_COLUMN, 0x55).expect("mapped");
    ctl.write_byte(0, INJECT_READY, 1).expect("mapped");
    ctl.step().expect("step");
    assert_eq!(byte(&ctl, INJECT_ROW), 0);
    assert_eq!(byte(&ctl, INJECT_COLUMN), 0);

    ctl.press_key("5").expect("bound");
    ctl.step().expect("step");
    assert_eq!(byte(&ctl, INJECT_ROW), 0x02);
    assert_eq!(byte(&ctl, INJECT_COLUMN), 0x02);

    ctl.release_key("5").expect("bound");
    ctl.write_byte(0, INJECT_ROW, 0x10).expect("mapped");
    ctl.step().expect("step");
    assert_eq!(byte(&ctl, INJECT_ROW), 0x10);
}
