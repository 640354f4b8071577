/// Who drives stepping of the emulated core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecutionMode {
    /// Steps happen only on explicit host request.
    #[default]
    SingleStep,
    /// A background worker steps continuously.
    FreeRun,
}

/// Low-power state of the emulated CPU.
///
/// `Armed` records which acceptor levels have latched since the last reset
/// of the state; it never holds a latched level 2 without level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StopState {
    /// Core steps normally and no acceptor level has latched.
    #[default]
    Running,
    /// At least one acceptor level has latched.
    Armed {
        /// Level 1 (`0x50`) acceptor latched.
        level1: bool,
        /// Level 2 (`0xA0`) acceptor latched.
        level2: bool,
    },
    /// Core stepping is held until a timer-compare wake.
    Stopped,
}

impl StopState {
    /// Returns `true` while core stepping is held.
    #[must_use]
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns `(level1, level2)` acceptor latches.
    #[must_use]
    pub const fn latches(self) -> (bool, bool) {
        match self {
            Self::Armed { level1, level2 } => (level1, level2),
            Self::Running | Self::Stopped => (false, false),
        }
    }

    /// Returns `true` when both acceptor levels have latched.
    #[must_use]
    pub const fn fully_armed(self) -> bool {
        matches!(
            self,
            Self::Armed {
                level1: true,
                level2: true
            }
        )
    }
}
