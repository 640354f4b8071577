//! Standby (stop mode) acceptance sequencing.
//!
//! The firmware arms stop mode by writing `0x5x` then `0xAx` to `STPACP` and
//! then requests it through `SBYCON`.

use crate::engine::Engine;
use crate::memory::map::{
    SBYCON, SFR_SEGMENT, STANDBY_STOP_CODE, STPACP, STPACP_LEVEL1_MASK, STPACP_LEVEL2_MASK,
};
use crate::memory::MemoryView;
use crate::{MemoryFault, StopState};

/// Acceptor latches and the stop flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Standby {
    level1: bool,
    level2: bool,
    stopped: bool,
}

impl Standby {
    /// Creates a running, unarmed state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level1: false,
            level2: false,
            stopped: false,
        }
    }

    /// Current stop state.
    #[must_use]
    pub const fn state(&self) -> StopState {
        if self.stopped {
            StopState::Stopped
        } else if self.level1 || self.level2 {
            StopState::Armed {
                level1: self.level1,
                level2: self.level2,
            }
        } else {
            StopState::Running
        }
    }

    /// Returns `true` while core stepping is held.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Releases stop mode. Latches are left as they are.
    pub const fn wake(&mut self) {
        self.stopped = false;
    }

    /// Returns to running with both latches cleared.
    pub const fn reset(&mut self) {
        *self = Self::new();
    }

    /// Samples `STPACP`/`SBYCON` after a step.
    ///
    /// Returns `true` when stop mode was entered on this call.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] from SFR accesses.
    pub fn after_step<E: Engine + ?Sized>(
        &mut self,
        view: &mut MemoryView<'_, E>,
    ) -> Result<bool, MemoryFault> {
        let status = view.read_u8(SFR_SEGMENT, STPACP)?;
        self.observe_status(status);

        let control = view.read_u8(SFR_SEGMENT, SBYCON)?;
        if control == STANDBY_STOP_CODE && self.level1 && self.level2 {
            view.write_u8(SFR_SEGMENT, SBYCON, 0)?;
            view.write_u8(SFR_SEGMENT, STPACP, 0)?;
            self.level1 = false;
            self.level2 = false;
            self.stopped = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// Applies one `STPACP` sample to the acceptor latches.
    ///
    /// Level 2 can only latch on a sample after the one that latched level 1.
    pub const fn observe_status(&mut self, status: u8) {
        if self.level1 {
            if status & STPACP_LEVEL2_MASK == STPACP_LEVEL2_MASK {
                self.level2 = true;
            }
        } else if status & STPACP_LEVEL1_MASK == STPACP_LEVEL1_MASK {
            self.level1 = true;
        }
    }
}
