//! Mode switching, free-run worker lifecycle and breakpoint detection.

#![allow(clippy::pedantic, clippy::nursery)]

use std::thread;
use std::time::{Duration, Instant};

use debugger_core::{
    CodeAddress, ControllerConfig, ControllerError, Engine, ExecutionController, ExecutionMode,
    MemoryEngine, Notification, Register, StepResult,
};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
#[cfg(feature = "serde")]
use serde_json as _;
use thiserror as _;

const ENTRY: u16 = 0x0100;

fn controller() -> ExecutionController<MemoryEngine> {
    // SP vector 8DF0, PC vector 0100.
    let engine = MemoryEngine::from_rom(vec![0xF0, 0x8D, 0x00, 0x01]);
    ExecutionController::new(engine, ControllerConfig::default())
}

fn wait_for_single_step(ctl: &ExecutionController<MemoryEngine>) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while ctl.mode() == ExecutionMode::FreeRun {
        assert!(Instant::now() < deadline, "worker never stopped");
        thread::sleep(Duration::from_millis(1));
    }
}

fn steps(ctl: &ExecutionController<MemoryEngine>) -> u64 {
    ctl.with_engine(|engine| engine.steps())
}

#[test]
fn illegal_instruction_in_free_run_ends_in_single_step_with_one_fault() {
    let mut ctl = controller();
    ctl.with_engine(|engine| {
        engine.script_steps([StepResult::Ok; 40]);
        engine.script_steps([StepResult::IllegalInstruction; 3]);
    });
    ctl.set_mode(ExecutionMode::FreeRun);
    wait_for_single_step(&ctl);
    assert_eq!(ctl.run_frame().expect("no fault"), None);

    let faults: Vec<_> = ctl
        .drain_notifications()
        .into_iter()
        .filter(|n| matches!(n, Notification::IllegalInstruction { .. }))
        .collect();
    assert_eq!(
        faults,
        vec![Notification::IllegalInstruction {
            at: CodeAddress::new(0, ENTRY + 41 * 2),
            was_free_running: true,
        }]
    );
    assert_eq!(steps(&ctl), 41);
    assert_eq!(ctl.diagnostics().illegal_instructions, 1);
}

#[test]
fn illegal_instruction_in_single_step_is_reported_once() {
    let mut ctl = controller();
    ctl.with_engine(|engine| engine.script_steps([StepResult::IllegalInstruction]));
    let outcome = ctl.step().expect("step");
    assert!(outcome.requires_supervision());
    assert_eq!(
        ctl.drain_notifications(),
        vec![Notification::IllegalInstruction {
            at: CodeAddress::new(0, ENTRY + 2),
            was_free_running: false,
        }]
    );
    assert_eq!(ctl.mode(), ExecutionMode::SingleStep);
}

#[test]
fn no_engine_mutation_after_switching_out_of_free_run() {
    let mut ctl = controller();
    ctl.set_mode(ExecutionMode::FreeRun);
    thread::sleep(Duration::from_millis(5));
    ctl.set_mode(ExecutionMode::SingleStep);
    let frozen = steps(&ctl);
    let pc = ctl.with_engine(|engine| engine.read_register(Register::Pc));

    thread::sleep(Duration::from_millis(20));
    assert_eq!(ctl.run_frame().expect("no fault"), None);
    assert_eq!(steps(&ctl), frozen);
    assert_eq!(ctl.with_engine(|engine| engine.read_register(Register::Pc)), pc);

    ctl.request_step().expect("single-step");
    ctl.run_frame().expect("no fault");
    assert_eq!(steps(&ctl), frozen + 1);
}

#[test]
fn setting_the_current_mode_is_a_no_op() {
    let mut ctl = controller();
    ctl.set_mode(ExecutionMode::SingleStep);
    assert_eq!(steps(&ctl), 0);
    ctl.set_mode(ExecutionMode::FreeRun);
    ctl.set_mode(ExecutionMode::FreeRun);
    assert_eq!(ctl.mode(), ExecutionMode::FreeRun);
    ctl.set_mode(ExecutionMode::SingleStep);
    assert_eq!(ctl.mode(), ExecutionMode::SingleStep);
}

#[rstest]
#[case(true, ExecutionMode::SingleStep)]
#[case(false, ExecutionMode::FreeRun)]
fn reset_enters_the_requested_mode(#[case] single_step: bool, #[case] expected: ExecutionMode) {
    let mut ctl = controller();
    ctl.step().expect("step");
    ctl.reset(single_step);
    assert_eq!(ctl.mode(), expected);
    ctl.set_mode(ExecutionMode::SingleStep);
    assert_eq!(ctl.mode(), ExecutionMode::SingleStep);
}

#[test]
fn pending_step_is_dropped_by_reset() {
    let mut ctl = controller();
    ctl.request_step().expect("single-step");
    ctl.reset(true);
    assert_eq!(ctl.run_frame().expect("no fault"), None);
    assert_eq!(steps(&ctl), 0);
}

#[test]
fn breakpoint_stops_free_run_on_first_hit() {
    let mut ctl = controller();
    ctl.set_breakpoint(0, ENTRY + 2 * 25).expect("valid breakpoint");
    ctl.set_mode(ExecutionMode::FreeRun);
    wait_for_single_step(&ctl);
    ctl.run_frame().expect("no fault");
    assert_eq!(steps(&ctl), 25);
    assert!(ctl
        .drain_notifications()
        .contains(&Notification::BreakpointHit {
            at: CodeAddress::new(0, ENTRY + 50)
        }));
}

#[test]
fn bus_fault_while_free_running_forces_single_step_once() {
    let mut ctl = controller();
    ctl.set_mode(ExecutionMode::FreeRun);
    thread::sleep(Duration::from_millis(5));
    ctl.with_engine(|engine| engine.unmap_segment(0));
    wait_for_single_step(&ctl);
    assert_eq!(ctl.run_frame().expect("nothing pending"), None);

    let faults: Vec<_> = ctl
        .drain_notifications()
        .into_iter()
        .filter(|n| matches!(n, Notification::BusFault(_)))
        .collect();
    assert_eq!(faults.len(), 1);
    assert!(matches!(faults[0], Notification::BusFault(fault) if fault.segment == 0));
    assert!(faults[0].forces_single_step());
}

#[test]
fn bus_fault_in_single_step_is_returned_from_the_frame() {
    let mut ctl = controller();
    ctl.with_engine(|engine| engine.unmap_segment(0));
    ctl.request_step().expect("single-step");
    let err = ctl.run_frame().expect_err("peripheral access faults");
    assert!(matches!(err, ControllerError::Memory(fault) if fault.segment == 0));
    assert_eq!(steps(&ctl), 0);
    assert_eq!(ctl.mode(), ExecutionMode::SingleStep);
    assert!(ctl.drain_notifications().is_empty());
}

#[test]
fn dropping_a_free_running_controller_joins_the_worker() {
    let mut ctl = controller();
    ctl.set_mode(ExecutionMode::FreeRun);
    drop(ctl);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn breakpoint_hits_on_first_matching_post_step_location(k in 1u16..64) {
        let mut ctl = controller();
        ctl.set_breakpoint(0, ENTRY + 2 * k).expect("valid breakpoint");
        for i in 1..=k {
            let outcome = ctl.step().expect("step");
            prop_assert_eq!(outcome.breakpoint_hit, i == k);
        }
        prop_assert_eq!(ctl.diagnostics().breakpoint_hits, 1);
    }
}
