//! Saturating execution counters kept by the controller.

use crate::StepResult;

/// Counters accumulated since the last controller reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExecutionDiagnostics {
    /// Engine steps executed (held steps in stop mode are not counted).
    pub steps: u64,
    /// Steps that wrote to a read-only region.
    pub read_only_writes: u32,
    /// Unimplemented instructions skipped.
    pub unimplemented_skips: u32,
    /// Illegal instructions hit.
    pub illegal_instructions: u32,
    /// Breakpoint hits.
    pub breakpoint_hits: u32,
    /// Entries into stop mode.
    pub standby_entries: u32,
    /// Timer wakes out of stop mode.
    pub timer_wakes: u32,
}

impl ExecutionDiagnostics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one executed engine step.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_step(&mut self, result: StepResult) {
        self.steps = self.steps.saturating_add(1);
        match result {
            StepResult::Ok => {}
            StepResult::ReadOnlyWrite => {
                self.read_only_writes = self.read_only_writes.saturating_add(1);
            }
            StepResult::UnimplementedSkipped => {
                self.unimplemented_skips = self.unimplemented_skips.saturating_add(1);
            }
            StepResult::IllegalInstruction => {
                self.illegal_instructions = self.illegal_instructions.saturating_add(1);
            }
        }
    }

    /// Records a breakpoint hit.
    #[allow(clippy::missing_const_for_fn)]
    pub const fn record_breakpoint(&mut self) {
        self.breakpoint_hits = self.breakpoint_hits.saturating_add(1);
    }

    /// Records stop-mode transitions observed during a tick.
    #[allow(clippy::missing_const_for_fn)]
    pub const fn record_standby(&mut self, entered: bool, woke: bool) {
        if entered {
            self.standby_entries = self.standby_entries.saturating_add(1);
        }
        if woke {
            self.timer_wakes = self.timer_wakes.saturating_add(1);
        }
    }

    /// Resets all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
