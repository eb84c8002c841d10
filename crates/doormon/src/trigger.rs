use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;

use log::{info, warn};

use serde::Serialize;

use crate::error::Result;
use crate::indicator::{Indicator, SharedIndicator};
use crate::store::{StoreHandle, TriggerStore};

/// The latched state of the monitored line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "bool")]
pub enum TriggerState {
    /// No falling edge has been seen since the last reset.
    #[default]
    Untriggered,
    /// A falling edge has been seen since the last reset.
    Triggered,
}

impl TriggerState {
    /// Whether the state is [`TriggerState::Triggered`].
    #[must_use]
    pub const fn is_triggered(self) -> bool {
        matches!(self, Self::Triggered)
    }
}

impl From<bool> for TriggerState {
    fn from(triggered: bool) -> Self {
        if triggered {
            Self::Triggered
        } else {
            Self::Untriggered
        }
    }
}

impl From<TriggerState> for bool {
    fn from(state: TriggerState) -> Self {
        state.is_triggered()
    }
}

impl core::fmt::Display for TriggerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Untriggered => "untriggered",
            Self::Triggered => "triggered",
        }
        .fmt(f)
    }
}

/// The lock-free trigger flag.
///
/// It is the only datum written from interrupt context, hence it is
/// accessed through plain atomic loads and stores: no lock is ever taken
/// and no read-modify-write instruction is required from the target.
///
/// The interrupt handler only ever stores `true`, tasks only ever store
/// `false`. A [`TriggerLatch`] is `const`-constructible so that it can be
/// placed in a `static` reachable from the interrupt handler.
pub struct TriggerLatch(AtomicBool);

impl Default for TriggerLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerLatch {
    /// Creates an untriggered [`TriggerLatch`].
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Seeds the latch with a state restored at boot.
    pub fn restore(&self, state: TriggerState) {
        self.0.store(state.into(), Ordering::Release);
    }

    /// Returns the current state.
    #[must_use]
    pub fn observe(&self) -> TriggerState {
        self.0.load(Ordering::Acquire).into()
    }

    /// Latches the triggered state.
    ///
    /// Returns `true` when this call moved the latch out of
    /// [`TriggerState::Untriggered`]. Calling it again has no observable
    /// effect.
    pub fn set_triggered(&self) -> bool {
        let was_triggered = self.0.load(Ordering::Acquire);
        self.0.store(true, Ordering::Release);
        !was_triggered
    }

    /// Clears the latch.
    ///
    /// Returns `true` when the latch was triggered before this call.
    /// An edge latched concurrently with this call is cleared too.
    pub fn clear(&self) -> bool {
        let was_triggered = self.0.load(Ordering::Acquire);
        self.0.store(false, Ordering::Release);
        was_triggered
    }
}

/// The trigger latch as seen by tasks.
///
/// It binds the [`TriggerLatch`] to its indicator and to the store which
/// persists cleared states.
pub struct Trigger<'a, I, M, S>
where
    I: Indicator,
    M: RawMutex,
    S: TriggerStore,
{
    latch: &'a TriggerLatch,
    indicator: &'a SharedIndicator<I>,
    store: &'a StoreHandle<M, S>,
}

impl<I, M, S> Clone for Trigger<'_, I, M, S>
where
    I: Indicator,
    M: RawMutex,
    S: TriggerStore,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, M, S> Copy for Trigger<'_, I, M, S>
where
    I: Indicator,
    M: RawMutex,
    S: TriggerStore,
{
}

impl<'a, I, M, S> Trigger<'a, I, M, S>
where
    I: Indicator,
    M: RawMutex,
    S: TriggerStore,
{
    /// Creates a [`Trigger`].
    #[must_use]
    pub const fn new(
        latch: &'a TriggerLatch,
        indicator: &'a SharedIndicator<I>,
        store: &'a StoreHandle<M, S>,
    ) -> Self {
        Self {
            latch,
            indicator,
            store,
        }
    }

    /// Returns the current state without side effects.
    #[must_use]
    pub fn observe(&self) -> TriggerState {
        self.latch.observe()
    }

    /// Latches the triggered state and lights the indicator.
    ///
    /// Returns `true` when this call moved the latch out of
    /// [`TriggerState::Untriggered`].
    pub fn set_triggered(&self) -> bool {
        let changed = self.latch.set_triggered();
        self.indicator.show(TriggerState::Triggered);
        changed
    }

    /// Clears the latch, turns the indicator off and persists the cleared
    /// state before returning.
    ///
    /// The in-memory latch and the indicator are cleared even when the
    /// write fails. The error is returned so the caller can report it; until
    /// the next successful write, a restart may restore the old
    /// [`TriggerState::Triggered`] record.
    ///
    /// # Errors
    ///
    /// The cleared state could not be persisted.
    pub async fn clear(&self) -> Result<()> {
        // The flag is flipped while holding the store, so a synchronizer
        // pass can never persist a stale triggered state over this clear.
        let mut store = self.store.lock().await;

        if self.latch.clear() {
            info!("Trigger latch cleared");
        }
        self.indicator.show(TriggerState::Untriggered);

        store
            .persist(TriggerState::Untriggered)
            .await
            .inspect_err(|e| warn!("Unable to persist the cleared trigger state: {e}"))
    }
}
