//! Infrastructure layer for the NFC HAL bridge.
//!
//! Contains driver-facing adapters (the C operation table, the test fake, the
//! loopback simulator) and configuration file storage.

pub mod device;
pub mod storage;
