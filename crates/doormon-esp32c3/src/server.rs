use core::fmt::{Debug, Display};
use core::net::{Ipv4Addr, SocketAddr};

use edge_http::Method as HttpMethod;
use edge_http::io::server::{Connection, Handler, Server as EdgeServer};
use edge_nal::TcpBind;
use edge_nal_embassy::{Tcp, TcpBuffers};

use embassy_executor::Spawner;
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use embedded_io_async::{Read, Write};

use log::info;

use doormon::api::{Api, Method};

use crate::error::Error;
use crate::mdns::Mdns;
use crate::response::write_reply;
use crate::storage::FlashStore;
use crate::trigger::BoardIndicator;

// Default port.
const DEFAULT_SERVER_PORT: u16 = 80;

// The maximum number of clients the HTTP server can support simultaneously.
//
// Referring to the official ESP example at:
// https://github.com/esp-rs/esp-mbedtls/blob/main/examples/edge_server.rs#L56-L57,
// the server is configured to handle a maximum of 2 simultaneous
// open connections (sockets).
const NUMBER_OF_CLIENTS: usize = 2;

/// The API served by the board.
pub type DoormonApi = Api<'static, BoardIndicator, CriticalSectionRawMutex, FlashStore>;

/// The `doormon` server.
///
/// ## Parameters
///
/// - **`port`**
///   The TCP port on which the server listens for incoming connections.
///   Defaults to `80`.
///   See [`Server::port()`] to configure this.
///
/// - **`keepalive_timeout_ms`**
///   Optional timeout (in milliseconds) for detecting an idle persistent
///   HTTP keep-alive connection.
///   The default value is `None`, meaning that idle connections are never
///   closed due to inactivity.
///   See [`Server::keepalive_timeout()`] to configure this.
pub struct Server<const TX_SIZE: usize, const RX_SIZE: usize, const MAXIMUM_HEADERS_COUNT: usize> {
    // Server port.
    port: u16,
    // HTTP handler.
    handler: ServerHandler,
    // mDNS
    mdns: Mdns,
    // Keepalive timeout.
    keepalive_timeout_ms: Option<u32>,
}

impl<const TX_SIZE: usize, const RX_SIZE: usize, const MAXIMUM_HEADERS_COUNT: usize>
    Server<TX_SIZE, RX_SIZE, MAXIMUM_HEADERS_COUNT>
{
    /// Creates a [`Server`] for `api`.
    #[inline]
    #[must_use]
    pub const fn new(api: DoormonApi, mdns: Mdns) -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            handler: ServerHandler { api },
            mdns,
            keepalive_timeout_ms: None,
        }
    }

    /// Sets the port number for the server to listen on.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the timeout (in milliseconds) for persistent HTTP keep-alive connections.
    #[must_use]
    pub const fn keepalive_timeout(mut self, timeout_ms: u32) -> Self {
        self.keepalive_timeout_ms = Some(timeout_ms);
        self
    }

    /// Runs the [`Server`] and the [`Mdns`] task on `address`.
    ///
    /// It must be called only once the network is ready.
    ///
    /// # Errors
    ///
    /// - Failure to bind TCP protocol buffers to the underlying socket
    /// - Failure to spawn the `mDNS` task
    /// - Failure to run the server
    pub async fn run(
        self,
        stack: Stack<'static>,
        address: Ipv4Addr,
        spawner: Spawner,
    ) -> Result<(), Error> {
        let Server {
            port,
            handler,
            mdns,
            keepalive_timeout_ms,
        } = self;

        let buffers = TcpBuffers::<NUMBER_OF_CLIENTS, TX_SIZE, RX_SIZE>::new();
        let tcp = Tcp::new(stack, &buffers);

        let socket = SocketAddr::new(address.into(), port);

        let acceptor = tcp.bind(socket).await?;

        // Run mdns.
        //
        // NOTE: Use the same server port for the mDNS-SD service
        mdns.run(stack, address, port, spawner)?;

        info!("Starting server on address `{address}` and port `{port}`");

        Self::run_server(keepalive_timeout_ms, acceptor, handler).await
    }

    async fn run_server<A, H>(
        keepalive_timeout_ms: Option<u32>,
        acceptor: A,
        handler: H,
    ) -> Result<(), Error>
    where
        A: edge_nal::TcpAccept,
        H: Handler,
        Error: From<A::Error>,
    {
        let mut server = EdgeServer::<NUMBER_OF_CLIENTS, RX_SIZE, MAXIMUM_HEADERS_COUNT>::new();

        // Run server.
        server
            .run(keepalive_timeout_ms, acceptor, handler)
            .await
            .map_err(core::convert::Into::into)
    }
}

const fn method_map(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::Get,
        HttpMethod::Post => Method::Post,
        _ => Method::Other,
    }
}

struct ServerHandler {
    api: DoormonApi,
}

impl Handler for ServerHandler {
    type Error<E>
        = edge_http::io::Error<E>
    where
        E: Debug;

    async fn handle<T, const N: usize>(
        &self,
        _task_id: impl Display + Copy,
        conn: &mut Connection<'_, T, N>,
    ) -> Result<(), Self::Error<T::Error>>
    where
        T: Read + Write,
    {
        // The request body, if any, is ignored.
        let (headers, _body) = conn.split();

        info!("{:?} {}", headers.method, headers.path);

        let reply = self
            .api
            .handle(method_map(headers.method), headers.path)
            .await;
        write_reply(&reply, conn).await
    }
}
