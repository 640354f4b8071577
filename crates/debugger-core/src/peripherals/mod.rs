//! Per-step peripheral emulation around the engine's `step()`.
//!
//! Keyboard scan and timer run before the step; standby acceptance is sampled
//! after it. Everything goes through [`MemoryView`] SFR reads and writes.

/// Key matrix and keyboard scan emulation.
pub mod keyboard;
/// Standby acceptor handshake.
pub mod standby;
/// Free-running compare timer.
pub mod timer;

pub use keyboard::{KeyBinding, KeyMatrix, Keyboard, KeyboardMode};
pub use standby::Standby;
pub use timer::TimerSample;

use crate::engine::Engine;
use crate::memory::map::{IRQ_TIMER, IRQ_TIMER_BIT, SFR_SEGMENT};
use crate::memory::MemoryView;
use crate::{MemoryFault, StopState};

/// Peripheral state changes observed during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Stop mode was released by the timer compare.
    pub woke: bool,
    /// Stop mode was entered by the standby handshake.
    pub entered_standby: bool,
}

/// Keyboard, timer and standby emulation for one core.
#[derive(Debug, Clone, Default)]
pub struct PeripheralTicker {
    keyboard: Keyboard,
    standby: Standby,
}

impl PeripheralTicker {
    /// Creates a ticker using `mode` for key delivery.
    #[must_use]
    pub fn new(mode: KeyboardMode) -> Self {
        Self {
            keyboard: Keyboard::new(mode),
            standby: Standby::new(),
        }
    }

    /// Current stop state.
    #[must_use]
    pub const fn stop_state(&self) -> StopState {
        self.standby.state()
    }

    /// Mutable held-key state.
    pub const fn keyboard_mut(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    /// Returns to running, unarmed, with no keys held.
    pub fn reset(&mut self) {
        self.keyboard.reset();
        self.standby.reset();
    }

    /// Keyboard scan and timer tick, run before the engine step.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] from SFR accesses.
    pub fn before_step<E: Engine + ?Sized>(
        &mut self,
        view: &mut MemoryView<'_, E>,
    ) -> Result<TickReport, MemoryFault> {
        self.keyboard.tick(view)?;

        let sample = timer::tick(view)?;
        let mut report = TickReport::default();
        if sample.expired() && self.standby.is_stopped() {
            self.standby.wake();
            if self.keyboard.mode() == KeyboardMode::Matrix {
                let irq = view.read_u8(SFR_SEGMENT, IRQ_TIMER)?;
                view.write_u8(SFR_SEGMENT, IRQ_TIMER, irq | IRQ_TIMER_BIT)?;
            }
            log::info!(
                "timer wake at TM0C={:04X}H (target {:04X}H)",
                sample.counter,
                sample.target
            );
            report.woke = true;
        }
        Ok(report)
    }

    /// Standby acceptance, run after the engine step (or its skip).
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryFault`] from SFR accesses.
    pub fn after_step<E: Engine + ?Sized>(
        &mut self,
        view: &mut MemoryView<'_, E>,
        report: &mut TickReport,
    ) -> Result<(), MemoryFault> {
        if self.standby.after_step(view)? {
            log::info!("standby accepted, core stopped");
            report.entered_standby = true;
        }
        Ok(())
    }
}
