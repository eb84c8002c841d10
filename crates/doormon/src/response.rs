use alloc::borrow::Cow;
use alloc::string::ToString;
use alloc::vec::Vec;

use serde::Serialize;

/// The header sent along with a reply whose body could not be serialized.
///
/// It tells a client to discard the reply body.
pub const SERIALIZATION_ERROR: &str = "Serialization-Error";

const JSON: &[(&str, &str)] = &[("Content-Type", "application/json")];
const TEXT: &[(&str, &str)] = &[("Content-Type", "text/plain")];
const TEXT_SERIALIZATION_ERROR: &[(&str, &str)] =
    &[("Content-Type", "text/plain"), (SERIALIZATION_ERROR, "")];

/// An HTTP reply, independent of the server which sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    status: u16,
    message: &'static str,
    headers: &'static [(&'static str, &'static str)],
    body: Cow<'static, [u8]>,
}

impl Reply {
    /// A `200` reply carrying `value` as a JSON body.
    ///
    /// When `value` cannot be serialized, a `500` reply carrying the
    /// [`SERIALIZATION_ERROR`] header is returned instead.
    #[must_use]
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(200, "Ok", JSON, Cow::Owned(body)),
            Err(e) => Self::new(
                500,
                "Error",
                TEXT_SERIALIZATION_ERROR,
                Cow::Owned(Vec::from(e.to_string())),
            ),
        }
    }

    /// A `404` reply.
    #[must_use]
    pub const fn not_found() -> Self {
        Self::new(404, "Not Found", &[], Cow::Borrowed(&[]))
    }

    /// A `405` reply.
    #[must_use]
    pub const fn not_allowed() -> Self {
        Self::new(
            405,
            "Method Not Allowed",
            TEXT,
            Cow::Borrowed(b"Method not allowed"),
        )
    }

    /// Status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Status message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// Reply headers.
    #[must_use]
    pub const fn headers(&self) -> &'static [(&'static str, &'static str)] {
        self.headers
    }

    /// Reply body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    const fn new(
        status: u16,
        message: &'static str,
        headers: &'static [(&'static str, &'static str)],
        body: Cow<'static, [u8]>,
    ) -> Self {
        Self {
            status,
            message,
            headers,
            body,
        }
    }
}
