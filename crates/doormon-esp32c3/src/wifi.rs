use alloc::string::String;

use esp_hal::peripherals::WIFI;

use esp_radio::Controller;
use esp_radio::wifi::{
    AuthMethod, ClientConfig, Config, Interfaces, ModeConfig, WifiController, WifiDevice,
    WifiEvent,
};

use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use log::{error, info, warn};

use doormon::connection::{ConnectionAction, ConnectionEvent, ConnectionManager, Readiness};

use crate::error::Result;
use crate::mk_static;
use crate::system::restart_after_flush;

/// Readiness of the network, notified by the connection task.
pub type NetworkReadiness = Readiness<CriticalSectionRawMutex>;

/// The `Wi-Fi` controller.
pub struct Wifi {
    controller: WifiController<'static>,
    interfaces: Interfaces<'static>,
}

impl Wifi {
    /// Configures the `Wi-Fi` radio.
    ///
    /// # Errors
    ///
    /// Failure to initialize the radio or the `Wi-Fi` driver.
    pub fn configure(peripheral: WIFI<'static>) -> Result<Self> {
        let radio = mk_static!(Controller<'static>, esp_radio::init()?);
        let (controller, interfaces) = esp_radio::wifi::new(radio, peripheral, Config::default())?;

        Ok(Self {
            controller,
            interfaces,
        })
    }

    /// Configures the station interface to join the `ssid` network with a
    /// `WPA2` personal `password`.
    ///
    /// # Errors
    ///
    /// The station configuration has been rejected by the driver.
    pub fn station(mut self, ssid: &str, password: &str) -> Result<Station> {
        let config = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(String::from(ssid))
                .with_password(String::from(password))
                .with_auth_method(AuthMethod::Wpa2Personal),
        );
        self.controller.set_config(&config)?;

        info!("Station configured for SSID `{ssid}`");

        Ok(Station {
            controller: self.controller,
            device: self.interfaces.sta,
        })
    }
}

/// A configured, not yet started, station interface.
pub struct Station {
    controller: WifiController<'static>,
    device: WifiDevice<'static>,
}

impl Station {
    /// Takes the network device of the station.
    ///
    /// The returned [`StationController`] drives the connection once the
    /// network stack has been built on top of the device.
    #[must_use]
    pub fn split(self) -> (StationController, WifiDevice<'static>) {
        (StationController(self.controller), self.device)
    }
}

/// Drives the station connection.
pub struct StationController(WifiController<'static>);

impl StationController {
    /// Spawns the connection task.
    ///
    /// The task starts the station and notifies `readiness` once the network
    /// stack has an address, or once it gave up after `max_retries`
    /// consecutive failed attempts.
    ///
    /// # Errors
    ///
    /// Failure to spawn the connection task.
    pub fn run(
        self,
        stack: Stack<'static>,
        max_retries: u8,
        readiness: &'static NetworkReadiness,
        spawner: Spawner,
    ) -> Result<()> {
        spawner
            .spawn(connection_task(
                self.0,
                stack,
                ConnectionManager::new(max_retries),
                readiness,
            ))
            .map_err(core::convert::Into::into)
    }
}

#[embassy_executor::task]
async fn connection_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    mut manager: ConnectionManager,
    readiness: &'static NetworkReadiness,
) {
    info!("Starting the station");

    let mut event = match controller.start_async().await {
        Ok(()) => ConnectionEvent::StationStarted,
        Err(e) => {
            error!("Unable to start the station: {e:?}");
            restart_after_flush().await
        }
    };

    loop {
        let action = manager.handle(event);
        readiness.notify(action);

        event = match action {
            ConnectionAction::Connect => connect(&mut controller, stack).await,
            ConnectionAction::Ready(_) => {
                controller.wait_for_event(WifiEvent::StaDisconnected).await;
                ConnectionEvent::Disconnected
            }
            ConnectionAction::Restart => restart_after_flush().await,
            // The boot sequence restarts the device once it is notified.
            ConnectionAction::GiveUp | ConnectionAction::Ignore => {
                core::future::pending().await
            }
        };
    }
}

async fn connect(controller: &mut WifiController<'static>, stack: Stack<'static>) -> ConnectionEvent {
    if let Err(e) = controller.connect_async().await {
        warn!("connect to AP failed: {e:?}");
        return ConnectionEvent::Disconnected;
    }

    info!("Associated with the access point, waiting for an address");

    match select(
        stack.wait_config_up(),
        controller.wait_for_event(WifiEvent::StaDisconnected),
    )
    .await
    {
        Either::First(()) => stack.config_v4().map_or(ConnectionEvent::Disconnected, |config| {
            ConnectionEvent::GotAddress(config.address.address())
        }),
        Either::Second(()) => {
            warn!("connect to AP failed");
            ConnectionEvent::Disconnected
        }
    }
}
