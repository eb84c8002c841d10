use embassy_sync::blocking_mutex::raw::RawMutex;

use log::info;

use serde::Serialize;

use crate::indicator::Indicator;
use crate::response::Reply;
use crate::store::TriggerStore;
use crate::trigger::{Trigger, TriggerState};

/// Request methods understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// Any other method.
    Other,
}

/// The API routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /status`
    Status,
    /// `GET /reset` and `POST /reset`
    Reset,
}

/// The result of matching a request against the API routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The request targets this route.
    Found(Route),
    /// The path exists, but not for the requested method.
    NotAllowed,
    /// No route has this path.
    NotFound,
}

impl Route {
    /// Matches a request against the API routes.
    ///
    /// A trailing `/` and the query string are ignored.
    #[must_use]
    pub fn resolve(method: Method, path: &str) -> Resolution {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        let path = path.strip_suffix('/').unwrap_or(path);

        let route = match path {
            "/status" => Self::Status,
            "/reset" => Self::Reset,
            _ => return Resolution::NotFound,
        };

        if route.allows(method) {
            Resolution::Found(route)
        } else {
            Resolution::NotAllowed
        }
    }

    /// Route path.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Status => "/status",
            Self::Reset => "/reset",
        }
    }

    const fn allows(self, method: Method) -> bool {
        match self {
            Self::Status => matches!(method, Method::Get),
            Self::Reset => matches!(method, Method::Get | Method::Post),
        }
    }
}

/// Body of a `/status` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBody {
    /// Whether a falling edge has been latched since the last reset.
    pub triggered: TriggerState,
}

/// Body of a `/reset` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetBody {
    /// Always `true`.
    pub reset: bool,
}

/// The HTTP API exposing the trigger latch.
///
/// It is independent of the HTTP server: the server maps each request to a
/// [`Method`] and a path, and writes back the returned [`Reply`].
pub struct Api<'a, I, M, S>
where
    I: Indicator,
    M: RawMutex,
    S: TriggerStore,
{
    trigger: Trigger<'a, I, M, S>,
}

impl<'a, I, M, S> Api<'a, I, M, S>
where
    I: Indicator,
    M: RawMutex,
    S: TriggerStore,
{
    /// Creates an [`Api`] for `trigger`.
    #[must_use]
    pub const fn new(trigger: Trigger<'a, I, M, S>) -> Self {
        Self { trigger }
    }

    /// Handles a request.
    pub async fn handle(&self, method: Method, path: &str) -> Reply {
        match Route::resolve(method, path) {
            Resolution::Found(Route::Status) => Reply::json(&self.status()),
            Resolution::Found(Route::Reset) => Reply::json(&self.reset().await),
            Resolution::NotAllowed => Reply::not_allowed(),
            Resolution::NotFound => Reply::not_found(),
        }
    }

    /// Returns the current state without side effects.
    #[must_use]
    pub fn status(&self) -> StatusBody {
        StatusBody {
            triggered: self.trigger.observe(),
        }
    }

    /// Clears the latch.
    ///
    /// The reply reports success even when the cleared state could not be
    /// persisted: the in-memory latch is cleared anyway and the failure is
    /// logged.
    pub async fn reset(&self) -> ResetBody {
        if self.trigger.clear().await.is_ok() {
            info!("Reset request served");
        }
        ResetBody { reset: true }
    }
}
