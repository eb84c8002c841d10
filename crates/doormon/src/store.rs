use core::fmt::Debug;

use alloc::format;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};

use log::{info, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::trigger::{TriggerLatch, TriggerState};

/// Maximum length of the namespace and of the key name of a [`RecordKey`].
pub const KEY_PART_LENGTH: usize = 15;

/// Length of a [`RecordKey`] in bytes.
pub const RECORD_KEY_LENGTH: usize = 2 * KEY_PART_LENGTH;

/// The key under which the trigger record is persisted.
///
/// It is laid out as the namespace followed by the key name, each one
/// zero-padded to [`KEY_PART_LENGTH`] bytes, so that records belonging to
/// different namespaces never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKey([u8; RECORD_KEY_LENGTH]);

impl RecordKey {
    /// Creates a [`RecordKey`] from a namespace and a key name.
    ///
    /// # Errors
    ///
    /// Either the namespace or the key name is empty or longer than
    /// [`KEY_PART_LENGTH`] bytes.
    pub fn new(namespace: &str, name: &str) -> Result<Self> {
        let mut bytes = [0; RECORD_KEY_LENGTH];
        Self::write_part(&mut bytes[..KEY_PART_LENGTH], "namespace", namespace)?;
        Self::write_part(&mut bytes[KEY_PART_LENGTH..], "key", name)?;
        Ok(Self(bytes))
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; RECORD_KEY_LENGTH] {
        &self.0
    }

    fn write_part(dest: &mut [u8], kind: &str, part: &str) -> Result<()> {
        if part.is_empty() || part.len() > KEY_PART_LENGTH {
            return Err(Error::new(
                ErrorKind::InvalidKey,
                format!("The {kind} `{part}` must be between 1 and {KEY_PART_LENGTH} bytes long"),
            ));
        }
        dest[..part.len()].copy_from_slice(part.as_bytes());
        Ok(())
    }
}

/// A flash-backed key/value store holding boolean records.
///
/// Implementations are not required to be safe for concurrent use: every
/// access goes through a [`StoreHandle`], which serializes callers.
#[allow(async_fn_in_trait)]
pub trait TriggerStore {
    /// The error raised by the underlying storage.
    type Error: Debug;

    /// Loads the record stored under `key`.
    ///
    /// Returns `None` when the record is absent.
    async fn load(&mut self, key: &RecordKey) -> core::result::Result<Option<bool>, Self::Error>;

    /// Stores and commits `value` under `key`.
    async fn save(&mut self, key: &RecordKey, value: bool)
    -> core::result::Result<(), Self::Error>;
}

/// Exclusive, scoped access to a [`TriggerStore`].
///
/// The store is shared by the persistence synchronizer and by the reset
/// path. Each of them acquires the store through [`StoreHandle::lock`] and
/// the access is released when the returned [`StoreGuard`] is dropped,
/// whatever the outcome of the operation.
pub struct StoreHandle<M: RawMutex, S: TriggerStore> {
    store: Mutex<M, S>,
    key: RecordKey,
}

impl<M: RawMutex, S: TriggerStore> StoreHandle<M, S> {
    /// Creates a [`StoreHandle`] for the record stored under `key`.
    #[must_use]
    pub const fn new(store: S, key: RecordKey) -> Self {
        Self {
            store: Mutex::new(store),
            key,
        }
    }

    /// Waits for exclusive access to the store.
    pub async fn lock(&self) -> StoreGuard<'_, M, S> {
        StoreGuard {
            store: self.store.lock().await,
            key: &self.key,
        }
    }

    /// Consumes the handle, returning the store.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.store.into_inner()
    }
}

/// Exclusive access to a [`TriggerStore`], released on drop.
pub struct StoreGuard<'a, M: RawMutex, S: TriggerStore> {
    store: MutexGuard<'a, M, S>,
    key: &'a RecordKey,
}

impl<M: RawMutex, S: TriggerStore> StoreGuard<'_, M, S> {
    /// Loads the persisted [`TriggerState`].
    ///
    /// An absent record is [`TriggerState::Untriggered`].
    ///
    /// # Errors
    ///
    /// The record could not be read.
    pub async fn load(&mut self) -> Result<TriggerState> {
        self.store
            .load(self.key)
            .await
            .map(|value| value.unwrap_or_default().into())
            .map_err(|e| storage_error("Unable to load the trigger record", &e))
    }

    /// Persists `state`.
    ///
    /// # Errors
    ///
    /// The record could not be written.
    pub async fn persist(&mut self, state: TriggerState) -> Result<()> {
        self.store
            .save(self.key, state.into())
            .await
            .map_err(|e| storage_error("Unable to persist the trigger record", &e))
    }
}

/// Seeds `latch` with the persisted [`TriggerState`].
///
/// This is the first step of the boot sequence. When the record cannot be
/// read the latch is left untouched and the error is returned, so the
/// caller can restart the device.
///
/// # Errors
///
/// The record could not be read.
pub async fn restore_latch<M: RawMutex, S: TriggerStore>(
    latch: &TriggerLatch,
    store: &StoreHandle<M, S>,
) -> Result<TriggerState> {
    let state = store
        .lock()
        .await
        .load()
        .await
        .inspect_err(|e| warn!("{e}"))?;

    latch.restore(state);
    info!("Trigger latch restored as {state}");

    Ok(state)
}

#[inline]
fn storage_error<E: Debug>(description: &str, e: &E) -> Error {
    Error::new(ErrorKind::Storage, format!("{description}: {e:?}"))
}
