//! The state and concurrency kernel of a `doormon` device.
//!
//! A `doormon` device monitors a single digital input line, latches a
//! triggered event on its falling edge and exposes the latched state over a
//! local-network HTTP API, surviving power and connectivity losses without
//! losing the event.
//!
//! This crate provides APIs to:
//!
//! - Latch falling edges from interrupt context without taking any lock,
//!   and mirror the latched state on an indicator output.
//! - Persist the latched state through a key/value store, periodically while
//!   triggered and synchronously when cleared, and restore it at boot.
//! - Drive the station connection state machine, which bounds the attempts
//!   made before the device has ever joined the network and asks for a
//!   restart when an established link is lost.
//! - Answer the HTTP requests reading and clearing the latch, independently
//!   of the server which transports them.
//!
//! Board-specific drivers implement the [`store::TriggerStore`] and
//! [`indicator::Indicator`] traits and feed [`connection::ConnectionEvent`]s
//! to the state machine.
//!
//! This crate is `no_std`, but requires an allocator.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

/// The HTTP API exposing the trigger latch.
pub mod api;
/// Compile-time device configuration.
pub mod config;
/// The station connection state machine.
pub mod connection;
/// The falling-edge detector.
pub mod detector;
/// Error management.
pub mod error;
/// Indicator outputs mirroring the trigger state.
pub mod indicator;
/// HTTP replies.
pub mod response;
/// The persisted trigger record and its store.
pub mod store;
/// The persistence synchronizer.
pub mod sync;
/// The trigger latch.
pub mod trigger;

#[cfg(test)]
mod tests;
