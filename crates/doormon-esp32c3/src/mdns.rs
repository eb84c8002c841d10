use core::cell::OnceCell;
use core::net::{Ipv4Addr, Ipv6Addr};

use esp_hal::rng::Rng;

use embassy_executor::Spawner;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;

use embassy_net::Stack;

use edge_mdns::HostAnswersMdnsHandler;
use edge_mdns::buf::VecBufAccess;
use edge_mdns::domain::base::Ttl;
use edge_mdns::host::{Host, Service, ServiceAnswers};
use edge_mdns::io::{self, IPV4_DEFAULT_SOCKET};

use edge_nal::UdpSplit;
use edge_nal_embassy::{Udp, UdpBuffers};

use log::{error, info};

use doormon::api::Route;

use crate::error::Result;

// Hostname
const HOSTNAME: &str = "doormon";
// Service instance name
const SERVICE: &str = "Doormon";
// Service type
const SERVICE_TYPE: &str = "_http";
// Transport protocol
const TRANSPORT_PROTOCOL: &str = "_tcp";
// Time-to-live for answers in seconds
const TIME_TO_LIVE: u32 = 60;

// mDNS buffer pool size
const MDNS_BUFFER_POOL_SIZE: usize = 2;
// Buffer length
const BUFFER_LENGTH: usize = 1500;
// Packet metadata length
const PACKET_METADATA_LENGTH: usize = 2;

static RNG: CriticalSectionMutex<OnceCell<Rng>> = CriticalSectionMutex::new(OnceCell::new());

// Paths of the API, advertised as `TXT` records.
const API_PATHS: &[(&str, &str)] = &[
    ("status", Route::Status.path()),
    ("reset", Route::Reset.path()),
];

/// The `mDNS-SD` responder advertising the HTTP API.
///
/// The API is announced as the `Doormon` instance of the `_http._tcp`
/// service on the `doormon.local` host, so a poller on the local network
/// can find the device without knowing its address.
pub struct Mdns {
    rng: Rng,
}

impl Mdns {
    /// Creates the [`Mdns`] responder.
    #[must_use]
    pub const fn new(rng: Rng) -> Self {
        Self { rng }
    }

    pub(crate) fn run(
        self,
        stack: Stack<'static>,
        address: Ipv4Addr,
        port: u16,
        spawner: Spawner,
    ) -> Result<()> {
        RNG.lock(|c| _ = c.set(self.rng));

        let host = Host {
            hostname: HOSTNAME,
            ipv4: address,
            ipv6: Ipv6Addr::UNSPECIFIED,
            ttl: Ttl::from_secs(TIME_TO_LIVE),
        };

        let service = Service {
            name: SERVICE,
            priority: 1,
            weight: 5,
            service: SERVICE_TYPE,
            protocol: TRANSPORT_PROTOCOL,
            port,
            service_subtypes: &[],
            txt_kvs: API_PATHS,
        };

        info!(
            "Advertising `{SERVICE}` as {SERVICE_TYPE}.{TRANSPORT_PROTOCOL} on `{HOSTNAME}.local` ({address}:{port})"
        );

        spawner
            .spawn(run_mdns_task(stack, host, service))
            .map_err(core::convert::Into::into)
    }
}

#[embassy_executor::task]
async fn run_mdns_task(stack: Stack<'static>, host: Host<'static>, service: Service<'static>) {
    let (recv_buf, send_buf) = (
        VecBufAccess::<NoopRawMutex, BUFFER_LENGTH>::new(),
        VecBufAccess::<NoopRawMutex, BUFFER_LENGTH>::new(),
    );

    let buffers: UdpBuffers<
        MDNS_BUFFER_POOL_SIZE,
        BUFFER_LENGTH,
        BUFFER_LENGTH,
        PACKET_METADATA_LENGTH,
    > = UdpBuffers::new();
    let udp = Udp::new(stack, &buffers);

    let mut socket =
        match io::bind(&udp, IPV4_DEFAULT_SOCKET, Some(Ipv4Addr::UNSPECIFIED), None).await {
            Ok(socket) => socket,
            Err(e) => {
                error!("Impossible to create the mDNS `UDP` socket: {e:?}");
                return;
            }
        };

    let (recv, send) = socket.split();

    // Notifies the responder that `Host` has changed, which never happens
    // since the address is fixed until the next restart.
    let signal = Signal::new();

    let mdns = io::Mdns::<NoopRawMutex, _, _, _, _>::new(
        Some(Ipv4Addr::UNSPECIFIED),
        // No IPv6 network is up and running
        None,
        recv,
        send,
        recv_buf,
        send_buf,
        |buf| {
            RNG.lock(|c| c.get().map(|r| r.clone().read(buf)));
        },
        &signal,
    );

    if let Err(e) = mdns
        .run(HostAnswersMdnsHandler::new(ServiceAnswers::new(
            &host, &service,
        )))
        .await
    {
        error!("mDNS-SD responder failed: {e:?}");
    }
}
