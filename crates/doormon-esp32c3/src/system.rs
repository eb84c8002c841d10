use embassy_time::Timer;

use log::error;

// Time left to the logger to flush before resetting.
const FLUSH_MILLISECONDS: u64 = 100;

/// Restarts the device.
///
/// Every in-memory state is lost, the persisted trigger record is kept.
pub fn restart() -> ! {
    error!("Restarting the device");
    esp_hal::system::software_reset()
}

/// Restarts the device after leaving the logger some time to flush.
pub async fn restart_after_flush() -> ! {
    Timer::after_millis(FLUSH_MILLISECONDS).await;
    restart()
}
