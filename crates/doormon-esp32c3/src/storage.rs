use core::ops::Range;

use esp_hal::peripherals::FLASH;

use esp_storage::{FlashStorage, FlashStorageError};

use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Delay;

use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};
use sequential_storage::{Error as MapError, erase_all};

use log::{info, warn};

use doormon::store::{RECORD_KEY_LENGTH, RecordKey, StoreHandle, TriggerStore};
use doormon::sync::Synchronizer;

// The `nvs` partition of the default partition table.
const FLASH_RANGE: Range<u32> = 0x9000..0xF000;

// Large enough for a record key, a boolean value and the item header.
const BUFFER_LENGTH: usize = 64;

type RecordKeyBytes = [u8; RECORD_KEY_LENGTH];

/// The store shared by the reset path and the persistence synchronizer.
pub type FlashStoreHandle = StoreHandle<CriticalSectionRawMutex, FlashStore>;

/// A key/value store kept in the `nvs` flash partition.
pub struct FlashStore {
    flash: BlockingAsync<FlashStorage<'static>>,
    range: Range<u32>,
    cache: NoCache,
    buffer: [u8; BUFFER_LENGTH],
}

impl FlashStore {
    /// Creates a [`FlashStore`] over the `nvs` partition.
    #[must_use]
    pub fn new(flash: FLASH<'static>) -> Self {
        Self {
            flash: BlockingAsync::new(FlashStorage::new(flash)),
            range: FLASH_RANGE,
            cache: NoCache::new(),
            buffer: [0; BUFFER_LENGTH],
        }
    }

    async fn fetch(&mut self, key: &RecordKey) -> Result<Option<bool>, MapError<FlashStorageError>> {
        fetch_item::<RecordKeyBytes, bool, _>(
            &mut self.flash,
            self.range.clone(),
            &mut self.cache,
            &mut self.buffer,
            key.as_bytes(),
        )
        .await
    }
}

impl TriggerStore for FlashStore {
    type Error = MapError<FlashStorageError>;

    async fn load(&mut self, key: &RecordKey) -> Result<Option<bool>, Self::Error> {
        match self.fetch(key).await {
            Err(MapError::Corrupted { .. }) => {
                // The area is unusable as it is: start from an empty one.
                warn!("Flash records are corrupted, erasing them");
                erase_all(&mut self.flash, self.range.clone()).await?;
                info!("Flash records erased");
                Ok(None)
            }
            result => result,
        }
    }

    async fn save(&mut self, key: &RecordKey, value: bool) -> Result<(), Self::Error> {
        // Skip the write when the record already holds the value, since the
        // synchronizer saves the triggered state once per period.
        if self.fetch(key).await.ok().flatten() == Some(value) {
            return Ok(());
        }

        store_item::<RecordKeyBytes, bool, _>(
            &mut self.flash,
            self.range.clone(),
            &mut self.cache,
            &mut self.buffer,
            key.as_bytes(),
            &value,
        )
        .await
    }
}

/// Runs the persistence synchronizer.
#[embassy_executor::task]
pub async fn persistence_task(
    synchronizer: Synchronizer<'static, CriticalSectionRawMutex, FlashStore>,
) {
    info!(
        "Persistence synchronizer running every {} ms",
        synchronizer.period_ms()
    );
    synchronizer.run(Delay).await
}
