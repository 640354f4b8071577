use std::path::PathBuf;

use thiserror::Error;

/// Severity classes used for step reporting and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Severity {
    /// Instruction retired normally.
    Normal,
    /// Recoverable condition; execution continues.
    Warning,
    /// Execution fault; the controller must fall back to single-step.
    Fault,
}

/// Result of one engine `step()` call, as reported by the emulation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum StepResult {
    /// Instruction executed without incident.
    Ok = 0,
    /// The instruction wrote to a read-only region; the write was dropped.
    ReadOnlyWrite = 1,
    /// An unimplemented instruction was skipped.
    UnimplementedSkipped = 2,
    /// The fetched word is not a valid instruction.
    IllegalInstruction = 3,
}

impl StepResult {
    /// Converts the result to the engine's stable return code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts an engine return code back into a step result.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::ReadOnlyWrite),
            2 => Some(Self::UnimplementedSkipped),
            3 => Some(Self::IllegalInstruction),
            _ => None,
        }
    }

    /// Returns the severity class for this result.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Ok => Severity::Normal,
            Self::ReadOnlyWrite | Self::UnimplementedSkipped => Severity::Warning,
            Self::IllegalInstruction => Severity::Fault,
        }
    }
}

/// Bus fault raised by the engine for an access to unmapped memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("bus fault accessing {segment:X}:{address:04X}H")]
pub struct MemoryFault {
    /// Segment of the failing access.
    pub segment: u8,
    /// Offset of the failing access.
    pub address: u16,
}

impl MemoryFault {
    /// Creates a fault for `segment:address`.
    #[must_use]
    pub const fn new(segment: u8, address: u16) -> Self {
        Self { segment, address }
    }
}

/// Fatal engine initialization failures.
#[derive(Debug, Error)]
pub enum InitError {
    /// The engine could not allocate emulated memory.
    #[error("unable to allocate RAM for emulated memory")]
    AllocationFailure,
    /// The ROM image does not exist.
    #[error("cannot open the ROM file {}", path.display())]
    RomNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// The ROM image exists but could not be read.
    #[error("failed to read the ROM file {}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl InitError {
    /// Maps the engine's numeric `init` return code to an error.
    ///
    /// Code `0` is success and yields `None`, as do unknown codes.
    #[must_use]
    pub fn from_code(code: u8, path: PathBuf) -> Option<Self> {
        match code {
            2 => Some(Self::AllocationFailure),
            3 => Some(Self::RomNotFound { path }),
            _ => None,
        }
    }
}

/// Errors returned by host-facing controller operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// A memory access failed.
    #[error(transparent)]
    Memory(#[from] MemoryFault),
    /// Code addresses must be even.
    #[error("code address {address:04X}H is not word aligned")]
    UnalignedCodeAddress {
        /// Rejected address.
        address: u16,
    },
    /// Code segments are 4 bits wide.
    #[error("segment {segment:X} is out of range")]
    InvalidSegment {
        /// Rejected segment.
        segment: u8,
    },
    /// Single steps can only be requested in single-step mode.
    #[error("single step requested while free running")]
    StepWhileFreeRunning,
    /// The logical key is not present in the key matrix.
    #[error("unknown key {0:?}")]
    UnknownKey(String),
}
