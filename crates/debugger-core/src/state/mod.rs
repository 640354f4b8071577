//! Register model and controller-level execution states.

/// Named register identifiers, PSW bitfield and code locations.
pub mod registers;
/// Execution mode and low-power stop state machines.
pub mod run_state;

pub use registers::{
    CodeAddress, Psw, Register, EXCEPTION_LEVELS, GENERAL_REGISTER_COUNT, MAX_SEGMENT,
};
pub use run_state::{ExecutionMode, StopState};
