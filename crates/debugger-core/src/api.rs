//! Host-facing value types exchanged with the execution controller.

use crate::{CodeAddress, ControllerError, KeyboardMode, MemoryFault, StepResult, StopState};

/// The single active breakpoint: a word-aligned `CSR:PC` location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Breakpoint(CodeAddress);

impl Breakpoint {
    /// Creates a breakpoint at `segment:address`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidSegment`] for segments above `0xF`
    /// and [`ControllerError::UnalignedCodeAddress`] for odd addresses.
    pub fn new(segment: u8, address: u16) -> Result<Self, ControllerError> {
        CodeAddress::checked(segment, address).map(Self)
    }

    /// Location the breakpoint matches.
    #[must_use]
    pub const fn location(self) -> CodeAddress {
        self.0
    }

    /// Returns `true` when `location` is the breakpoint address.
    #[must_use]
    pub fn matches(self, location: CodeAddress) -> bool {
        self.0 == location
    }
}

/// Event reported to the host; never silently swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    /// Post-step `CSR:PC` matched the breakpoint; single-step was forced.
    BreakpointHit {
        /// Matched location.
        at: CodeAddress,
    },
    /// The engine hit an illegal instruction; single-step was forced.
    IllegalInstruction {
        /// `CSR:PC` after the failed step.
        at: CodeAddress,
        /// The controller was free running when the fault occurred.
        was_free_running: bool,
    },
    /// A write to a read-only region was dropped. Execution continued.
    ReadOnlyWrite {
        /// `CSR:PC` after the step.
        at: CodeAddress,
    },
    /// An unimplemented instruction was skipped. Execution continued.
    UnimplementedSkipped {
        /// Location of the skipped instruction.
        at: CodeAddress,
    },
    /// A peripheral or engine access faulted while free running; single-step
    /// was forced.
    BusFault(MemoryFault),
    /// The standby handshake stopped the core.
    StandbyEntered,
    /// The timer compare released the core from standby.
    TimerWake,
}

impl Notification {
    /// Returns `true` for notifications that force single-step mode.
    #[must_use]
    pub const fn forces_single_step(self) -> bool {
        matches!(
            self,
            Self::BreakpointHit { .. } | Self::IllegalInstruction { .. } | Self::BusFault(_)
        )
    }
}

/// Outcome of one controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepOutcome {
    /// `CSR:PC` before the step.
    pub before: CodeAddress,
    /// `CSR:PC` after the step.
    pub after: CodeAddress,
    /// Engine result, `None` when stop mode held the core.
    pub result: Option<StepResult>,
    /// The post-step location matched the breakpoint.
    pub breakpoint_hit: bool,
    /// Stop state after peripheral ticking.
    pub stop_state: StopState,
}

impl StepOutcome {
    /// Returns `true` when this step must leave the controller in single-step.
    #[must_use]
    pub fn requires_supervision(&self) -> bool {
        self.breakpoint_hit || self.result == Some(StepResult::IllegalInstruction)
    }
}

/// Controller construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerConfig {
    /// Key delivery mode for the peripheral ticker.
    pub keyboard_mode: KeyboardMode,
    /// Stack base for the register panel; defaults to code word `0:0000`.
    pub stack_base_override: Option<u16>,
}
