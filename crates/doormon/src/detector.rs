use crate::indicator::{Indicator, SharedIndicator};
use crate::trigger::{TriggerLatch, TriggerState};

/// The falling-edge detector.
///
/// The board arms a hardware interrupt on the falling transition of the
/// input line and calls [`EdgeDetector::on_falling_edge`] from its handler.
/// Everything reachable from the handler is lock-free or runs inside a
/// critical section: it never touches the store nor the network.
pub struct EdgeDetector<'a, I: Indicator> {
    latch: &'a TriggerLatch,
    indicator: &'a SharedIndicator<I>,
}

impl<'a, I: Indicator> EdgeDetector<'a, I> {
    /// Creates an [`EdgeDetector`].
    #[must_use]
    pub const fn new(latch: &'a TriggerLatch, indicator: &'a SharedIndicator<I>) -> Self {
        Self { latch, indicator }
    }

    /// Mirrors the restored [`TriggerState`] on the indicator.
    ///
    /// It must be called once, after the latch has been restored and before
    /// the interrupt is armed.
    pub fn init(&self) -> TriggerState {
        let state = self.latch.observe();
        self.indicator.show(state);
        state
    }

    /// Handles a falling edge.
    ///
    /// Returns `true` when this edge started a new triggered episode.
    #[inline]
    pub fn on_falling_edge(&self) -> bool {
        let started = self.latch.set_triggered();
        self.indicator.show(TriggerState::Triggered);
        started
    }
}
