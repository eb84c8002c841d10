use core::time::Duration;

// Consecutive failed connection attempts tolerated before giving up.
const DEFAULT_MAX_RETRIES: u8 = 5;
// Upper bound on the boot-time wait for a network address.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
// Persistence synchronizer period.
const DEFAULT_SYNC_PERIOD: Duration = Duration::from_secs(1);
// Persisted record namespace.
const DEFAULT_NAMESPACE: &str = "doormon";
// Persisted record key.
const DEFAULT_KEY: &str = "triggered";
// HTTP server port.
const DEFAULT_PORT: u16 = 80;

/// Compile-time configuration of a `doormon` device.
///
/// Every value has a default, so only the fields that differ need to be
/// set through the builder methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    max_retries: u8,
    connect_timeout: Duration,
    sync_period: Duration,
    namespace: &'static str,
    key: &'static str,
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a [`Config`] with the default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            sync_period: DEFAULT_SYNC_PERIOD,
            namespace: DEFAULT_NAMESPACE,
            key: DEFAULT_KEY,
            port: DEFAULT_PORT,
        }
    }

    /// Sets the maximum number of consecutive connection attempts made
    /// before the device has ever joined the network.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u8) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the maximum time the boot sequence waits for a network address.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the persistence synchronizer period.
    ///
    /// A zero period is raised to one millisecond.
    #[must_use]
    pub const fn sync_period(mut self, period: Duration) -> Self {
        self.sync_period = if period.is_zero() {
            Duration::from_millis(1)
        } else {
            period
        };
        self
    }

    /// Sets the namespace and the key of the persisted record.
    #[must_use]
    pub const fn record(mut self, namespace: &'static str, key: &'static str) -> Self {
        self.namespace = namespace;
        self.key = key;
        self
    }

    /// Sets the HTTP server port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Maximum number of connection attempts.
    #[must_use]
    pub const fn retries(&self) -> u8 {
        self.max_retries
    }

    /// Boot-time connection timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Persistence synchronizer period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.sync_period
    }

    /// Persisted record namespace.
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Persisted record key.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// HTTP server port.
    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use super::Config;

    #[test]
    fn default_values() {
        let config = Config::default();

        assert_eq!(config.retries(), 5);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.period(), Duration::from_secs(1));
        assert_eq!(config.namespace(), "doormon");
        assert_eq!(config.key(), "triggered");
        assert_eq!(config.server_port(), 80);
    }

    #[test]
    fn builder_overrides() {
        let config = Config::new()
            .max_retries(3)
            .connect_timeout(Duration::from_secs(10))
            .sync_period(Duration::from_millis(250))
            .record("door", "latched")
            .port(8080);

        assert_eq!(config.retries(), 3);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.period(), Duration::from_millis(250));
        assert_eq!(config.namespace(), "door");
        assert_eq!(config.key(), "latched");
        assert_eq!(config.server_port(), 8080);
    }

    #[test]
    fn zero_sync_period() {
        let config = Config::new().sync_period(Duration::ZERO);
        assert_eq!(config.period(), Duration::from_millis(1));
    }
}
