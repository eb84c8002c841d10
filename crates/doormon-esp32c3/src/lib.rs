//! `doormon-esp32c3` is a library crate for building the `doormon` firmware
//! on an `ESP32-C3` microcontroller.
//!
//! It binds the board-independent `doormon` crate to the board peripherals
//! and provides APIs to:
//!
//! - Latch falling edges of an input line from a `GPIO` interrupt
//! - Keep the trigger record in the `nvs` flash partition
//! - Connect the device to a `Wi-Fi` access point following the
//!   `doormon` connection policy
//! - Build the network stack
//! - Announce the device through the `mDNS-SD` discovery service
//! - Serve the `/status` and `/reset` routes over `HTTP`
//!
//! The firmware restarts the device whenever it cannot recover from an
//! error, so the persisted trigger record is the only state surviving a
//! failure.

#![no_std]
#![deny(missing_docs)]

extern crate alloc;

/// Error management.
pub mod error;
/// The `mDNS-SD` discovery service.
pub mod mdns;
/// The network stack builder.
pub mod net;
/// The firmware server.
pub mod server;
/// The flash store of the trigger record.
pub mod storage;
/// Device restart.
pub mod system;
/// The falling-edge trigger and the indicator LED.
pub mod trigger;
/// The `Wi-Fi` station.
pub mod wifi;

mod response;

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write($val);
        x
    }};
}

pub(crate) use mk_static;
