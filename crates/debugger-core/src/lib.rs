//! Execution and inspection controller for an nX-U8 emulation core.
//!
//! The instruction engine itself is an external collaborator behind the
//! [`Engine`] trait. This crate sequences it (single-step or a background
//! free-run worker), emulates the keyboard, timer and standby peripherals
//! around every step, and projects engine state into register panels, hex
//! dumps and decoded display frames.

/// Step results and error taxonomy.
pub mod fault;
pub use fault::{ControllerError, InitError, MemoryFault, Severity, StepResult};

/// Register model and execution states.
pub mod state;
pub use state::{
    CodeAddress, ExecutionMode, Psw, Register, StopState, EXCEPTION_LEVELS,
    GENERAL_REGISTER_COUNT, MAX_SEGMENT,
};

/// Engine contract and the in-memory reference engine.
pub mod engine;
pub use engine::{DataWidth, Engine, MemoryEngine};

/// Typed memory view and fixed address map.
pub mod memory;
pub use memory::{split_widths, ByteOrder, MemoryView, WindowDescriptor};

/// Status-bar and dot-matrix display decoding.
pub mod display;
pub use display::{
    DisplayDecoder, DisplayFrame, DisplaySource, RawFrame, StatusIcon, BODY_COLUMNS, BODY_ROWS,
    STATUS_ICON_COUNT,
};

/// Keyboard, timer and standby emulation.
pub mod peripherals;
pub use peripherals::{
    KeyBinding, KeyMatrix, Keyboard, KeyboardMode, PeripheralTicker, TickReport,
};

/// Execution counters.
pub mod diag;
pub use diag::ExecutionDiagnostics;

/// Instruction labelling through a host disassembler.
pub mod disasm;
pub use disasm::{label_instruction, Disassembler, Disassembly, InstructionLabel};

/// Memory windows and hex dumps.
pub mod snapshot;
pub use snapshot::{format_dump_line, MemorySnapshot, DUMP_LINE_BYTES};

/// Register panel.
pub mod report;
pub use report::{ExceptionContext, RegisterReport, ReportContext, STACK_WORDS_SHOWN};

/// ROM checksum.
pub mod checksum;
pub use checksum::{rom_checksum, ChecksumReport};

/// Host-facing value types.
pub mod api;
pub use api::{Breakpoint, ControllerConfig, Notification, StepOutcome};

/// Execution controller and free-run worker.
pub mod controller;
pub use controller::ExecutionController;

/// JSON host configuration.
#[cfg(feature = "serde")]
pub mod config;
#[cfg(feature = "serde")]
pub use config::{ConfigError, DebuggerConfig};
