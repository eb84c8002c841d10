use core::fmt::Debug;

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;

use esp_radio::InitializationError;
use esp_radio::wifi::WifiError;

use esp_storage::FlashStorageError;

use embassy_executor::SpawnError;

use edge_nal_embassy::TcpError;

/// All possible error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An error from the `doormon` kernel.
    Doormon(doormon::error::ErrorKind),
    /// `Wi-Fi` driver error.
    Wifi,
    /// Flash storage error.
    Storage,
    /// Network stack error.
    Network,
    /// HTTP server error.
    Server,
    /// Task spawning error.
    Spawn,
}

impl ErrorKind {
    pub(crate) const fn description(self) -> &'static str {
        match self {
            Self::Doormon(_) => "Doormon",
            Self::Wifi => "Wi-Fi",
            Self::Storage => "Storage",
            Self::Network => "Network",
            Self::Server => "Server",
            Self::Spawn => "Spawn",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.description().fmt(f)
    }
}

/// A firmware error.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    info: Cow<'static, str>,
}

impl Error {
    /// Creates an [`Error`] from an [`ErrorKind`] and a description.
    #[inline]
    pub fn new(kind: ErrorKind, info: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            info: info.into(),
        }
    }

    /// Returns the [`ErrorKind`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error description.
    #[must_use]
    pub fn info(&self) -> &str {
        &self.info
    }

    fn debug(kind: ErrorKind, description: &str, e: &impl Debug) -> Self {
        Self::new(kind, format!("{description}: {e:?}"))
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.kind, self.info)
    }
}

impl core::error::Error for Error {}

impl From<doormon::error::Error> for Error {
    fn from(e: doormon::error::Error) -> Self {
        Self::new(ErrorKind::Doormon(e.kind()), String::from(e.info()))
    }
}

impl From<InitializationError> for Error {
    fn from(e: InitializationError) -> Self {
        Self::debug(ErrorKind::Wifi, "Radio initialization failed", &e)
    }
}

impl From<WifiError> for Error {
    fn from(e: WifiError) -> Self {
        Self::debug(ErrorKind::Wifi, "Wi-Fi driver failure", &e)
    }
}

impl From<sequential_storage::Error<FlashStorageError>> for Error {
    fn from(e: sequential_storage::Error<FlashStorageError>) -> Self {
        Self::debug(ErrorKind::Storage, "Flash storage failure", &e)
    }
}

impl From<SpawnError> for Error {
    fn from(e: SpawnError) -> Self {
        Self::debug(ErrorKind::Spawn, "Unable to spawn a task", &e)
    }
}

impl From<TcpError> for Error {
    fn from(e: TcpError) -> Self {
        Self::debug(ErrorKind::Network, "TCP failure", &e)
    }
}

impl<E: Debug> From<edge_http::io::Error<E>> for Error {
    fn from(e: edge_http::io::Error<E>) -> Self {
        Self::debug(ErrorKind::Server, "HTTP server failure", &e)
    }
}

/// A specialized [`Result`] type for [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
