use alloc::borrow::Cow;

/// All possible error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading or writing the persisted trigger record failed.
    Storage,
    /// The network interface could not reach the connected state.
    Connection,
    /// The device could not complete its boot sequence.
    Startup,
    /// A response body could not be serialized.
    Serialization,
    /// A persisted record key is not valid.
    InvalidKey,
}

impl ErrorKind {
    pub(crate) const fn description(self) -> &'static str {
        match self {
            Self::Storage => "Storage",
            Self::Connection => "Connection",
            Self::Startup => "Startup",
            Self::Serialization => "Serialization",
            Self::InvalidKey => "Invalid Key",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.description().fmt(f)
    }
}

/// A `doormon` error.
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
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.kind, self.info)
    }
}

impl core::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::Serialization, alloc::format!("{e}"))
    }
}

/// A specialized [`Result`] type for [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::{Error, ErrorKind};

    #[test]
    fn error_display() {
        let error = Error::new(ErrorKind::Startup, "No network address after 60 s");

        assert_eq!(error.kind(), ErrorKind::Startup);
        assert_eq!(
            error.to_string(),
            "Startup: No network address after 60 s"
        );
        assert_eq!(
            Error::new(ErrorKind::InvalidKey, "empty").to_string(),
            "Invalid Key: empty"
        );
    }
}
