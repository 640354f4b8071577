//! 16-bit free-running timer with compare wake.

use crate::engine::Engine;
use crate::memory::map::{SFR_SEGMENT, TIMER_COUNTER, TIMER_TARGET};
use crate::memory::{ByteOrder, MemoryView};
use crate::MemoryFault;

/// Counter and target observed on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSample {
    /// Counter value after the increment.
    pub counter: u16,
    /// Compare target.
    pub target: u16,
}

impl TimerSample {
    /// Returns `true` when the counter has reached the target.
    #[must_use]
    pub const fn expired(self) -> bool {
        self.counter >= self.target
    }
}

/// Increments `TM0C` by one, wrapping, and returns it with `TM0D`.
///
/// # Errors
///
/// Propagates [`MemoryFault`] from SFR accesses.
pub fn tick<E: Engine + ?Sized>(view: &mut MemoryView<'_, E>) -> Result<TimerSample, MemoryFault> {
    let counter = view
        .read_u16(SFR_SEGMENT, TIMER_COUNTER, ByteOrder::Little)?
        .wrapping_add(1);
    view.write_u16(SFR_SEGMENT, TIMER_COUNTER, counter)?;
    let target = view.read_u16(SFR_SEGMENT, TIMER_TARGET, ByteOrder::Little)?;
    Ok(TimerSample { counter, target })
}

#[cfg(test)]
mod tests {
    use super::tick;
    use crate::engine::MemoryEngine;
    use crate::memory::map::{TIMER_COUNTER, TIMER_TARGET};
    use crate::memory::{ByteOrder, MemoryView};

    #[test]
    fn counter_increments_and_wraps() {
        let mut engine = MemoryEngine::default();
        let mut view = MemoryView::new(&mut engine);
        view.write_u16(0, TIMER_COUNTER, 0xFFFE).expect("mapped");
        view.write_u16(0, TIMER_TARGET, 0x0010).expect("mapped");

        let sample = tick(&mut view).expect("mapped");
        assert_eq!(sample.counter, 0xFFFF);
        assert!(sample.expired());

        let sample = tick(&mut view).expect("mapped");
        assert_eq!(sample.counter, 0x0000);
        assert!(!sample.expired());
        assert_eq!(
            view.read_u16(0, TIMER_COUNTER, ByteOrder::Little),
            Ok(0x0000)
        );
    }
}
