#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

extern crate alloc;

use alloc::format;

use core::fmt::Display;
use core::time::Duration;

use doormon::api::Api;
use doormon::config::Config;
use doormon::connection::LinkStatus;
use doormon::error::{Error as DoormonError, ErrorKind};
use doormon::indicator::Led;
use doormon::store::{RecordKey, StoreHandle, restore_latch};
use doormon::sync::Synchronizer;
use doormon::trigger::Trigger;

use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Io, Level, Output, OutputConfig, Pull};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;

use log::{error, info};

use embassy_executor::Spawner;
use embassy_time::with_timeout;

use static_cell::StaticCell;

use doormon_esp32c3::{
    error::Error,
    mdns::Mdns,
    net::NetworkStack,
    server::Server,
    storage::{FlashStore, FlashStoreHandle, persistence_task},
    system::restart,
    trigger::{EdgeTrigger, indicator, latch},
    wifi::{NetworkReadiness, Wifi},
};

const MAX_HEAP_SIZE: usize = 72 * 1024;

// Socket buffer size.
const TX_SIZE: usize = 1024;
// Server buffer size.
const RX_SIZE: usize = 2048;
// Maximum number of allowed headers in a request.
const MAXIMUM_HEADERS_COUNT: usize = 16;
// Keep-alive timeout.
const TIMEOUT: u32 = 15 * 1000;

// Readiness of the network, awaited by the boot sequence.
static READINESS: NetworkReadiness = NetworkReadiness::new();
// The trigger record store.
static STORE: StaticCell<FlashStoreHandle> = StaticCell::new();

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    error!("{info}");
    restart()
}

#[toml_cfg::toml_config]
struct DoormonConfig {
    #[default("")]
    ssid: &'static str,
    #[default("")]
    password: &'static str,
    #[default(5)]
    max_retries: u8,
    #[default(60)]
    connect_timeout_secs: u64,
    #[default(1000)]
    sync_period_ms: u64,
    #[default(80)]
    port: u16,
}

// Unwraps `result`, restarting the device on error.
fn or_restart<T, E: Display>(result: Result<T, E>, step: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("{step}: {e}");
            restart()
        }
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    esp_alloc::heap_allocator!(size: MAX_HEAP_SIZE);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    info!("ESP RTOS started!");

    let rng = Rng::new();

    // Retrieve device configuration.
    let device_config = DOORMON_CONFIG;
    let config = Config::new()
        .max_retries(device_config.max_retries)
        .connect_timeout(Duration::from_secs(device_config.connect_timeout_secs))
        .sync_period(Duration::from_millis(device_config.sync_period_ms))
        .port(device_config.port);

    // Restore the trigger latch from flash.
    let key = or_restart(
        RecordKey::new(config.namespace(), config.key()),
        "Invalid record key",
    );
    let store: &'static FlashStoreHandle =
        STORE.init(StoreHandle::new(FlashStore::new(peripherals.FLASH), key));
    let _ = or_restart(
        restore_latch(latch(), store).await,
        "Unable to restore the trigger latch",
    );

    // Output led, active low.
    let led = Output::new(peripherals.GPIO8, Level::High, OutputConfig::default());
    let _ = EdgeTrigger::init(Led::active_low(led));

    let (controller, device) = or_restart(
        Wifi::configure(peripherals.WIFI)
            .and_then(|wifi| wifi.station(device_config.ssid, device_config.password)),
        "Unable to configure Wi-Fi",
    )
    .split();

    // The value is 6 because the stack serves:
    // - 2 server sockets
    // - 1 mdns socket
    // - 1 dhcp socket
    // - 2 spare sockets
    let stack = or_restart(
        NetworkStack::build::<6>(rng, device, spawner),
        "Failed to create network stack",
    );

    or_restart(
        controller.run(stack, config.retries(), &READINESS, spawner),
        "Failed to run the Wi-Fi station",
    );

    let timeout = embassy_time::Duration::try_from(config.timeout())
        .unwrap_or(embassy_time::Duration::MAX);

    let address = or_restart(
        with_timeout(timeout, READINESS.wait())
            .await
            .map_err(|_| {
                DoormonError::new(
                    ErrorKind::Startup,
                    format!("No network address after {} s", config.timeout().as_secs()),
                )
            })
            .and_then(LinkStatus::address),
        "Network not ready",
    );

    info!("Network ready with address `{address}`");

    // Input line, idle high.
    let mut io = Io::new(peripherals.IO_MUX);
    let input = Input::new(
        peripherals.GPIO2,
        InputConfig::default().with_pull(Pull::Up),
    );
    EdgeTrigger::arm(&mut io, input);

    or_restart(
        spawner
            .spawn(persistence_task(Synchronizer::new(
                latch(),
                store,
                config.period(),
            )))
            .map_err(Error::from),
        "Failed to run the persistence synchronizer",
    );

    let api = Api::new(Trigger::new(latch(), indicator(), store));

    #[allow(clippy::large_futures)]
    let result = Server::<TX_SIZE, RX_SIZE, MAXIMUM_HEADERS_COUNT>::new(api, Mdns::new(rng))
        .port(config.server_port())
        .keepalive_timeout(TIMEOUT)
        .run(stack, address, spawner)
        .await;

    or_restart(result, "Server stopped")
}
