use alloc::boxed::Box;

use esp_hal::rng::Rng;

use esp_radio::wifi::WifiDevice;

use embassy_executor::Spawner;
use embassy_net::{Config, DhcpConfig, Runner, Stack, StackResources};

use log::info;

use crate::error::Result;

// Hostname announced to the DHCP server.
const DHCP_HOSTNAME: &str = "doormon";

#[embassy_executor::task]
async fn task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

/// The network stack builder.
pub struct NetworkStack;

impl NetworkStack {
    /// Builds the [`NetworkStack`] on top of the station device.
    ///
    /// The stack obtains its address through `DHCP` once the station has
    /// joined the network.
    ///
    /// # Errors
    ///
    /// Failure to spawn the network stack task.
    pub fn build<const SOCKET_STACK_SIZE: usize>(
        rng: Rng,
        wifi_interface: WifiDevice<'static>,
        spawner: Spawner,
    ) -> Result<Stack<'static>> {
        let mut dhcp = DhcpConfig::default();
        dhcp.hostname = DHCP_HOSTNAME.try_into().ok();

        let config = Config::dhcpv4(dhcp);
        let seed = u64::from(rng.random()) << 32 | u64::from(rng.random());

        // FIXME: We need to use `Box::leak` and then `Box::new` because
        // `make_static` does not accept **ANY** kind of generic, not even const
        // generics.
        let resources = Box::leak(Box::new(StackResources::<SOCKET_STACK_SIZE>::new()));

        let (stack, runner) = embassy_net::new(wifi_interface, config, resources, seed);

        spawner.spawn(task(runner))?;

        info!("Network stack running");

        Ok(stack)
    }
}
