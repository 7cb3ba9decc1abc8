//! # nfc-core
//!
//! Shared types for the NFC HAL bridge: the control event and status codes a
//! controller driver reports, the borrowed view over an inbound NCI data
//! buffer, and the two traits that describe the remote interface.
//!
//! This crate has no dependencies on OS APIs, driver tables, threads, or the
//! transport that carries calls from the NFC stack.
//!
//! # Architecture overview
//!
//! The NFC stack talks to the controller through a small remote interface
//! (`open`, `write`, `coreInitialized`, `prediscover`, `close`,
//! `controlGranted`, `powerCycle`).  The controller answers asynchronously:
//! control events (`OPEN_CPLT`, `CLOSE_CPLT`, ...) and inbound NCI frames
//! arrive on driver-owned threads and must be pushed back to whichever client
//! registered through `open`.
//!
//! - **`protocol`** – `NfcEvent`, `NfcStatus`, and `NciFrame`.  NCI payloads are
//!   opaque here; only their length and bytes are carried.
//!
//! - **`domain`** – the [`Nfc`] remote interface and the
//!   [`NfcClientCallback`] notification interface.

pub mod domain;
pub mod protocol;

pub use domain::interface::{Nfc, NfcClientCallback};
pub use protocol::events::{NfcEvent, NfcStatus};
pub use protocol::frame::NciFrame;
