extern crate std;

use core::time::Duration;

use alloc::vec::Vec;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use embedded_hal_async::delay::DelayNs;

use crate::indicator::Indicator;
use crate::store::{RecordKey, StoreHandle, TriggerStore};
use crate::trigger::TriggerState;

pub(crate) type MemoryHandle = StoreHandle<CriticalSectionRawMutex, MemoryStore>;

pub(crate) fn record_key() -> RecordKey {
    RecordKey::new("doormon", "trigger").unwrap()
}

pub(crate) fn handle(store: MemoryStore) -> MemoryHandle {
    StoreHandle::new(store, record_key())
}

#[derive(Debug, PartialEq)]
pub(crate) struct MemoryError;

/// An in-memory store holding a single record.
#[derive(Default)]
pub(crate) struct MemoryStore {
    record: Option<(RecordKey, bool)>,
    failing_saves: usize,
    failing_loads: bool,
    writes: usize,
}

impl MemoryStore {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn with(value: bool) -> Self {
        Self {
            record: Some((record_key(), value)),
            ..Self::default()
        }
    }

    // The next `count` saves fail.
    pub(crate) fn failing_saves(mut self, count: usize) -> Self {
        self.failing_saves = count;
        self
    }

    pub(crate) fn failing_loads(mut self) -> Self {
        self.failing_loads = true;
        self
    }

    pub(crate) fn key(&self) -> Option<RecordKey> {
        self.record.map(|(key, _)| key)
    }

    pub(crate) fn value(&self) -> Option<bool> {
        self.record.map(|(_, value)| value)
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes
    }
}

impl TriggerStore for MemoryStore {
    type Error = MemoryError;

    async fn load(&mut self, key: &RecordKey) -> Result<Option<bool>, Self::Error> {
        if self.failing_loads {
            return Err(MemoryError);
        }
        Ok(self
            .record
            .filter(|(stored, _)| stored == key)
            .map(|(_, value)| value))
    }

    async fn save(&mut self, key: &RecordKey, value: bool) -> Result<(), Self::Error> {
        if self.failing_saves > 0 {
            self.failing_saves -= 1;
            return Err(MemoryError);
        }
        self.record = Some((*key, value));
        self.writes += 1;
        Ok(())
    }
}

/// An indicator recording every state it has shown.
#[derive(Default)]
pub(crate) struct RecordingIndicator(pub(crate) Vec<TriggerState>);

impl Indicator for RecordingIndicator {
    fn show(&mut self, state: TriggerState) {
        self.0.push(state);
    }
}

/// A delay backed by the `tokio` timer.
pub(crate) struct TokioDelay;

impl DelayNs for TokioDelay {
    async fn delay_ns(&mut self, ns: u32) {
        tokio::time::sleep(Duration::from_nanos(u64::from(ns))).await;
    }
}
