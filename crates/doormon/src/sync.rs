use core::time::Duration;

use embassy_sync::blocking_mutex::raw::RawMutex;

use embedded_hal_async::delay::DelayNs;

use log::{debug, warn};

use crate::error::Error;
use crate::store::{StoreHandle, TriggerStore};
use crate::trigger::{TriggerLatch, TriggerState};

/// The outcome of a single synchronizer pass.
#[derive(Debug, PartialEq)]
pub enum SyncOutcome {
    /// The latch was untriggered, nothing has been written.
    Idle,
    /// The triggered state has been persisted.
    Persisted,
    /// Persisting the triggered state failed. The next pass retries.
    Failed(Error),
}

/// The persistence synchronizer.
///
/// While the latch is triggered, it persists that fact once per period, so
/// a power loss can lose a latched edge only during the first period after
/// the edge. It never persists the untriggered state: clearing is written
/// synchronously by [`crate::trigger::Trigger::clear`].
pub struct Synchronizer<'a, M: RawMutex, S: TriggerStore> {
    latch: &'a TriggerLatch,
    store: &'a StoreHandle<M, S>,
    period_ms: u32,
}

impl<'a, M: RawMutex, S: TriggerStore> Synchronizer<'a, M, S> {
    /// Creates a [`Synchronizer`] running once every `period`.
    #[must_use]
    pub fn new(latch: &'a TriggerLatch, store: &'a StoreHandle<M, S>, period: Duration) -> Self {
        let period_ms = u32::try_from(period.as_millis()).unwrap_or(u32::MAX).max(1);
        Self {
            latch,
            store,
            period_ms,
        }
    }

    /// Synchronizer period in milliseconds.
    #[must_use]
    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Runs a single pass.
    pub async fn tick(&self) -> SyncOutcome {
        // Observe under the store lock: a concurrent clear holds the same
        // lock while it flips the flag and writes the cleared record.
        let mut store = self.store.lock().await;

        if self.latch.observe() != TriggerState::Triggered {
            return SyncOutcome::Idle;
        }

        match store.persist(TriggerState::Triggered).await {
            Ok(()) => {
                debug!("Triggered state persisted");
                SyncOutcome::Persisted
            }
            Err(e) => {
                warn!("{e}, retrying in {} ms", self.period_ms);
                SyncOutcome::Failed(e)
            }
        }
    }

    /// Runs the synchronizer forever.
    pub async fn run<D: DelayNs>(&self, mut delay: D) -> ! {
        loop {
            let _ = self.tick().await;
            delay.delay_ms(self.period_ms).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use crate::error::ErrorKind;
    use crate::indicator::SharedIndicator;
    use crate::tests::{MemoryStore, RecordingIndicator, TokioDelay, handle};
    use crate::trigger::{Trigger, TriggerLatch, TriggerState};

    use super::{SyncOutcome, Synchronizer};

    const PERIOD: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn untriggered_latch_is_never_persisted() {
        let latch = TriggerLatch::new();
        let store = handle(MemoryStore::empty());
        let synchronizer = Synchronizer::new(&latch, &store, PERIOD);

        assert_eq!(synchronizer.tick().await, SyncOutcome::Idle);
        assert_eq!(synchronizer.tick().await, SyncOutcome::Idle);

        assert_eq!(store.into_inner().writes(), 0);
    }

    #[tokio::test]
    async fn triggered_latch_is_persisted_every_pass() {
        let latch = TriggerLatch::new();
        let store = handle(MemoryStore::empty());
        let synchronizer = Synchronizer::new(&latch, &store, PERIOD);

        let _ = latch.set_triggered();

        assert_eq!(synchronizer.tick().await, SyncOutcome::Persisted);
        assert_eq!(synchronizer.tick().await, SyncOutcome::Persisted);

        let memory = store.into_inner();
        assert_eq!(memory.value(), Some(true));
        assert_eq!(memory.writes(), 2);
    }

    #[tokio::test]
    async fn failures_are_retried_on_the_next_pass() {
        let latch = TriggerLatch::new();
        let store = handle(MemoryStore::empty().failing_saves(1));
        let synchronizer = Synchronizer::new(&latch, &store, PERIOD);

        let _ = latch.set_triggered();

        assert!(matches!(
            synchronizer.tick().await,
            SyncOutcome::Failed(e) if e.kind() == ErrorKind::Storage
        ));
        assert_eq!(synchronizer.tick().await, SyncOutcome::Persisted);

        assert_eq!(store.into_inner().value(), Some(true));
    }

    #[tokio::test]
    async fn cleared_latch_stops_the_synchronizer() {
        let latch = TriggerLatch::new();
        let indicator = SharedIndicator::<RecordingIndicator>::new();
        let store = handle(MemoryStore::empty());
        let trigger = Trigger::new(&latch, &indicator, &store);
        let synchronizer = Synchronizer::new(&latch, &store, PERIOD);

        let _ = trigger.set_triggered();
        assert_eq!(synchronizer.tick().await, SyncOutcome::Persisted);

        trigger.clear().await.unwrap();

        // A pass after the clear must not resurrect the triggered record.
        assert_eq!(synchronizer.tick().await, SyncOutcome::Idle);
        assert_eq!(store.into_inner().value(), Some(false));
    }

    #[tokio::test]
    async fn clear_waits_for_an_in_flight_pass() {
        let latch = TriggerLatch::new();
        let indicator = SharedIndicator::<RecordingIndicator>::new();
        let store = handle(MemoryStore::empty());
        let trigger = Trigger::new(&latch, &indicator, &store);
        let synchronizer = Synchronizer::new(&latch, &store, PERIOD);

        let _ = trigger.set_triggered();

        // A pass which has observed the triggered state and still holds the
        // store.
        let mut pass = store.lock().await;

        let clear = trigger.clear();
        tokio::pin!(clear);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut clear)
                .await
                .is_err()
        );

        // The flag is flipped only once the store has been acquired.
        assert_eq!(latch.observe(), TriggerState::Triggered);

        pass.persist(TriggerState::Triggered).await.unwrap();
        drop(pass);

        clear.await.unwrap();

        assert_eq!(latch.observe(), TriggerState::Untriggered);
        assert_eq!(synchronizer.tick().await, SyncOutcome::Idle);
        assert_eq!(
            store.lock().await.load().await.unwrap(),
            TriggerState::Untriggered
        );
    }

    #[tokio::test]
    async fn pass_racing_a_clear_never_persists_a_stale_trigger() {
        let latch = TriggerLatch::new();
        let indicator = SharedIndicator::<RecordingIndicator>::new();
        let store = handle(MemoryStore::empty());
        let trigger = Trigger::new(&latch, &indicator, &store);
        let synchronizer = Synchronizer::new(&latch, &store, PERIOD);

        let _ = trigger.set_triggered();

        // Both the pass and the clear wait on the store.
        let guard = store.lock().await;

        let tick = synchronizer.tick();
        let clear = trigger.clear();
        tokio::pin!(tick, clear);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut tick)
                .await
                .is_err()
        );
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut clear)
                .await
                .is_err()
        );

        drop(guard);

        let (outcome, cleared) = tokio::join!(tick, clear);

        assert!(matches!(
            outcome,
            SyncOutcome::Idle | SyncOutcome::Persisted
        ));
        assert!(cleared.is_ok());
        assert_eq!(latch.observe(), TriggerState::Untriggered);
        assert_eq!(
            store.lock().await.load().await.unwrap(),
            TriggerState::Untriggered
        );
    }

    #[tokio::test]
    async fn loss_window_is_one_period() {
        let latch = TriggerLatch::new();
        let store = handle(MemoryStore::empty());
        let synchronizer = Synchronizer::new(&latch, &store, PERIOD);

        let _ = latch.set_triggered();

        // Before any pass, a restart restores an untriggered latch.
        assert_eq!(
            store.lock().await.load().await.unwrap(),
            TriggerState::Untriggered
        );

        // After one pass, a restart restores the triggered latch.
        let _ = synchronizer.tick().await;
        assert_eq!(
            store.lock().await.load().await.unwrap(),
            TriggerState::Triggered
        );
    }

    #[tokio::test]
    async fn periodic_run() {
        let latch = TriggerLatch::new();
        let store = handle(MemoryStore::empty());
        let synchronizer = Synchronizer::new(&latch, &store, Duration::from_millis(5));

        let _ = latch.set_triggered();

        let _ = tokio::time::timeout(Duration::from_millis(50), synchronizer.run(TokioDelay)).await;

        assert_eq!(
            store.lock().await.load().await.unwrap(),
            TriggerState::Triggered
        );
    }

    #[test]
    fn period_is_clamped() {
        let latch = TriggerLatch::new();
        let store = handle(MemoryStore::empty());

        assert_eq!(
            Synchronizer::new(&latch, &store, Duration::ZERO).period_ms(),
            1
        );
        assert_eq!(
            Synchronizer::new(&latch, &store, Duration::from_secs(u64::MAX)).period_ms(),
            u32::MAX
        );
    }
}
