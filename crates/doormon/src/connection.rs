use core::net::Ipv4Addr;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

use log::{error, info, warn};

use crate::error::{Error, ErrorKind, Result};

/// Station connection states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// The station has not been started yet.
    #[default]
    Idle,
    /// A connection attempt is in progress.
    Connecting,
    /// The station has joined the network and obtained an address.
    Connected,
    /// The station gave up joining the network.
    Failed,
}

impl core::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Failed => "Failed",
        }
        .fmt(f)
    }
}

/// Events raised by the station driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The station interface has been started.
    StationStarted,
    /// The station has been disconnected, or a connection attempt failed.
    Disconnected,
    /// The network stack obtained an address.
    GotAddress(Ipv4Addr),
}

/// What the station driver must do after an event has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Issue a connection attempt.
    Connect,
    /// Stop retrying and report the failure.
    GiveUp,
    /// Restart the whole device.
    Restart,
    /// The network is ready to serve requests.
    Ready(Ipv4Addr),
    /// Nothing to do.
    Ignore,
}

/// Counter of consecutive failed connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    count: u8,
    max: u8,
}

impl RetryCounter {
    /// Creates a [`RetryCounter`] allowing `max` consecutive attempts.
    #[must_use]
    pub const fn new(max: u8) -> Self {
        Self { count: 0, max }
    }

    /// Counts a failed attempt.
    ///
    /// Returns `true` when another attempt is allowed.
    pub fn increment(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        !self.is_exhausted()
    }

    /// Resets the counter after a successful connection.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Number of consecutive failed attempts.
    #[must_use]
    pub const fn count(&self) -> u8 {
        self.count
    }

    /// Maximum number of consecutive failed attempts.
    #[must_use]
    pub const fn max(&self) -> u8 {
        self.max
    }

    /// Whether no further attempt is allowed.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.count >= self.max
    }
}

/// The station connection state machine.
///
/// Until the station has joined the network once, a disconnection is
/// retried up to the configured number of attempts and then the manager
/// gives up. Once the station has been connected, a disconnection asks for
/// a device restart. [`ConnectionState::Failed`] is final: every event
/// received afterwards is ignored.
#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    ever_connected: bool,
    retries: RetryCounter,
}

impl ConnectionManager {
    /// Creates an idle [`ConnectionManager`] allowing `max_retries`
    /// consecutive failed attempts before giving up.
    #[must_use]
    pub const fn new(max_retries: u8) -> Self {
        Self {
            state: ConnectionState::Idle,
            ever_connected: false,
            retries: RetryCounter::new(max_retries),
        }
    }

    /// Handles a station event, returning what the driver must do next.
    pub fn handle(&mut self, event: ConnectionEvent) -> ConnectionAction {
        if self.state == ConnectionState::Failed {
            return ConnectionAction::Ignore;
        }

        match event {
            ConnectionEvent::StationStarted => self.station_started(),
            ConnectionEvent::Disconnected => self.disconnected(),
            ConnectionEvent::GotAddress(address) => self.got_address(address),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the station has ever been connected.
    #[must_use]
    pub const fn ever_connected(&self) -> bool {
        self.ever_connected
    }

    /// Whether requests can be served.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Consecutive failed attempts.
    #[must_use]
    pub const fn retries(&self) -> RetryCounter {
        self.retries
    }

    fn station_started(&mut self) -> ConnectionAction {
        if self.state == ConnectionState::Connected {
            return ConnectionAction::Ignore;
        }
        info!("Station started, connecting to the access point");
        self.state = ConnectionState::Connecting;
        ConnectionAction::Connect
    }

    fn disconnected(&mut self) -> ConnectionAction {
        if self.ever_connected {
            error!("Connection to the access point lost, restarting");
            self.state = ConnectionState::Idle;
            return ConnectionAction::Restart;
        }

        if self.retries.increment() {
            warn!(
                "retry connect to AP ({}/{})",
                self.retries.count(),
                self.retries.max()
            );
            self.state = ConnectionState::Connecting;
            ConnectionAction::Connect
        } else {
            error!(
                "Unable to connect to the access point after {} attempts",
                self.retries.count()
            );
            self.state = ConnectionState::Failed;
            ConnectionAction::GiveUp
        }
    }

    fn got_address(&mut self, address: Ipv4Addr) -> ConnectionAction {
        info!("Got IP: {address}");
        self.ever_connected = true;
        self.retries.reset();
        self.state = ConnectionState::Connected;
        ConnectionAction::Ready(address)
    }
}

/// The outcome of the connection phase of the boot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// The network is up with the given address.
    Ready(Ipv4Addr),
    /// The station gave up joining the network.
    Failed,
}

impl LinkStatus {
    /// Returns the address of a ready network.
    ///
    /// # Errors
    ///
    /// The station gave up joining the network.
    pub fn address(self) -> Result<Ipv4Addr> {
        match self {
            Self::Ready(address) => Ok(address),
            Self::Failed => Err(Error::new(
                ErrorKind::Connection,
                "Unable to join the network",
            )),
        }
    }
}

/// Releases the tasks waiting for the network to be ready.
pub struct Readiness<M: RawMutex>(Signal<M, LinkStatus>);

impl<M: RawMutex> Default for Readiness<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> Readiness<M> {
    /// Creates a [`Readiness`] nobody has notified yet.
    #[must_use]
    pub const fn new() -> Self {
        Self(Signal::new())
    }

    /// Forwards the outcome of a [`ConnectionAction`], if it has one.
    pub fn notify(&self, action: ConnectionAction) {
        match action {
            ConnectionAction::Ready(address) => self.0.signal(LinkStatus::Ready(address)),
            ConnectionAction::GiveUp => self.0.signal(LinkStatus::Failed),
            _ => {}
        }
    }

    /// Waits for the connection phase to end.
    pub async fn wait(&self) -> LinkStatus {
        self.0.wait().await
    }
}

#[cfg(test)]
mod tests {
    use core::net::Ipv4Addr;

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    use crate::error::ErrorKind;

    use super::{
        ConnectionAction, ConnectionEvent, ConnectionManager, ConnectionState, LinkStatus,
        Readiness, RetryCounter,
    };

    const MAX_RETRIES: u8 = 5;
    const ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 42);

    fn connected() -> ConnectionManager {
        let mut manager = ConnectionManager::new(MAX_RETRIES);
        let _ = manager.handle(ConnectionEvent::StationStarted);
        let _ = manager.handle(ConnectionEvent::GotAddress(ADDRESS));
        manager
    }

    #[test]
    fn retry_counter() {
        let mut counter = RetryCounter::new(2);

        assert!(counter.increment());
        assert!(!counter.increment());
        assert!(counter.is_exhausted());
        assert_eq!(counter.count(), 2);

        counter.reset();
        assert_eq!(counter.count(), 0);
        assert!(!counter.is_exhausted());
    }

    #[test]
    fn station_start_connects() {
        let mut manager = ConnectionManager::new(MAX_RETRIES);
        assert_eq!(manager.state(), ConnectionState::Idle);

        assert_eq!(
            manager.handle(ConnectionEvent::StationStarted),
            ConnectionAction::Connect
        );
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert!(!manager.is_ready());
    }

    #[test]
    fn address_acquisition() {
        let manager = connected();

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert!(manager.ever_connected());
        assert!(manager.is_ready());
    }

    #[test]
    fn bounded_retries_before_first_connection() {
        let mut manager = ConnectionManager::new(MAX_RETRIES);
        let _ = manager.handle(ConnectionEvent::StationStarted);

        for attempt in 1..MAX_RETRIES {
            assert_eq!(
                manager.handle(ConnectionEvent::Disconnected),
                ConnectionAction::Connect
            );
            assert_eq!(manager.retries().count(), attempt);
            assert_eq!(manager.state(), ConnectionState::Connecting);
        }

        assert_eq!(
            manager.handle(ConnectionEvent::Disconnected),
            ConnectionAction::GiveUp
        );
        assert_eq!(manager.state(), ConnectionState::Failed);
    }

    #[test]
    fn failed_is_final() {
        let mut manager = ConnectionManager::new(1);
        let _ = manager.handle(ConnectionEvent::StationStarted);
        assert_eq!(
            manager.handle(ConnectionEvent::Disconnected),
            ConnectionAction::GiveUp
        );

        // No further automatic retry.
        assert_eq!(
            manager.handle(ConnectionEvent::Disconnected),
            ConnectionAction::Ignore
        );
        assert_eq!(
            manager.handle(ConnectionEvent::StationStarted),
            ConnectionAction::Ignore
        );
        assert_eq!(
            manager.handle(ConnectionEvent::GotAddress(ADDRESS)),
            ConnectionAction::Ignore
        );
        assert_eq!(manager.state(), ConnectionState::Failed);
        assert!(!manager.ever_connected());
    }

    #[test]
    fn success_resets_the_retry_counter() {
        let mut manager = ConnectionManager::new(MAX_RETRIES);
        let _ = manager.handle(ConnectionEvent::StationStarted);
        let _ = manager.handle(ConnectionEvent::Disconnected);
        let _ = manager.handle(ConnectionEvent::Disconnected);
        assert_eq!(manager.retries().count(), 2);

        assert_eq!(
            manager.handle(ConnectionEvent::GotAddress(ADDRESS)),
            ConnectionAction::Ready(ADDRESS)
        );
        assert_eq!(manager.retries().count(), 0);
    }

    #[test]
    fn disconnection_after_first_connection_restarts() {
        let mut manager = connected();

        assert_eq!(
            manager.handle(ConnectionEvent::Disconnected),
            ConnectionAction::Restart
        );
        assert!(manager.ever_connected());
        assert!(!manager.is_ready());
    }

    #[test]
    fn zero_retries_gives_up_immediately() {
        let mut manager = ConnectionManager::new(0);
        let _ = manager.handle(ConnectionEvent::StationStarted);

        assert_eq!(
            manager.handle(ConnectionEvent::Disconnected),
            ConnectionAction::GiveUp
        );
    }

    #[tokio::test]
    async fn readiness_forwards_outcomes() {
        let readiness = Readiness::<CriticalSectionRawMutex>::new();

        readiness.notify(ConnectionAction::Connect);
        readiness.notify(ConnectionAction::Ready(ADDRESS));
        assert_eq!(readiness.wait().await, LinkStatus::Ready(ADDRESS));

        readiness.notify(ConnectionAction::GiveUp);
        assert_eq!(readiness.wait().await, LinkStatus::Failed);
    }

    #[test]
    fn link_status_address() {
        assert_eq!(LinkStatus::Ready(ADDRESS).address(), Ok(ADDRESS));
        assert_eq!(
            LinkStatus::Failed.address().unwrap_err().kind(),
            ErrorKind::Connection
        );
    }
}
