//! Device Handle adaptation.
//!
//! A controller driver exposes a fixed table of seven operations plus two
//! callback registration points.  [`DeviceHandle`] is the only way the bridge
//! reaches hardware; it adapts buffer conventions and nothing else.
//!
//! # Implementations
//!
//! - [`ffi::FfiDevice`] wraps a C `NfcNciDevice` operation table.
//! - [`loopback::LoopbackController`] simulates a controller with its own
//!   driver thread (used by the service binary).
//! - [`mock::FakeDevice`] records calls and lets tests fire callbacks.
//!
//! # Lifetime
//!
//! The bridge never opens or closes the handle itself.  `open`/`close` invoke
//! entry points *within* the table; the handle's own lifecycle is owned by
//! whoever produced it.

use std::fmt;
use std::sync::Arc;

use nfc_core::NciFrame;
use thiserror::Error;

pub mod ffi;
pub mod loopback;
pub mod mock;

/// Receiver of the driver's two asynchronous callbacks.
///
/// Implementations are invoked on driver-owned threads, concurrently, with no
/// caller context.  They must not block and must not panic.
pub trait HalCallbackSink: Send + Sync {
    /// Control event callback: raw event and status codes.
    fn on_event(&self, event: u8, status: u8);

    /// Data callback: a frame borrowed from driver memory.
    fn on_data(&self, frame: NciFrame<'_>);
}

/// The operation table of one NFC controller.
///
/// Every method returns the driver's raw status unchanged.
pub trait DeviceHandle: Send + Sync {
    /// Opens the controller and wires its callback entry points to `callbacks`.
    fn open(&self, callbacks: Arc<dyn HalCallbackSink>) -> i32;
    fn write(&self, data: &[u8]) -> i32;
    fn core_initialized(&self, data: &[u8]) -> i32;
    fn pre_discover(&self) -> i32;
    fn close(&self) -> i32;
    fn control_granted(&self) -> i32;
    fn power_cycle(&self) -> i32;
}

/// Identifies one entry point of the operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOp {
    Open,
    Write,
    CoreInitialized,
    PreDiscover,
    Close,
    ControlGranted,
    PowerCycle,
}

impl DeviceOp {
    pub const ALL: [DeviceOp; 7] = [
        DeviceOp::Open,
        DeviceOp::Write,
        DeviceOp::CoreInitialized,
        DeviceOp::PreDiscover,
        DeviceOp::Close,
        DeviceOp::ControlGranted,
        DeviceOp::PowerCycle,
    ];

    /// Field name of the entry point in the C table.
    pub fn entry_point(self) -> &'static str {
        match self {
            DeviceOp::Open => "open",
            DeviceOp::Write => "write",
            DeviceOp::CoreInitialized => "core_initialized",
            DeviceOp::PreDiscover => "pre_discover",
            DeviceOp::Close => "close",
            DeviceOp::ControlGranted => "control_granted",
            DeviceOp::PowerCycle => "power_cycle",
        }
    }
}

impl fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

/// Errors raised while obtaining a device handle.
///
/// These are construction-time failures only.  Once a handle exists, its
/// operations report through their integer status.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The driver produced a null operation table.
    #[error("NFC controller handle is null")]
    NullHandle,

    /// The operation table is missing a required entry point.
    #[error("NFC controller table has no '{0}' entry point")]
    MissingEntryPoint(&'static str),

    /// No controller is configured under the requested instance name.
    #[error("no NFC controller configured for instance '{0}'")]
    UnknownInstance(String),
}
