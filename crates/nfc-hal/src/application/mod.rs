//! Application layer for the NFC HAL bridge.
//!
//! Contains the bridge itself and the pieces it is built from:
//!
//! - **`registration`** – the single client slot shared by every dispatch site
//! - **`dispatch`** – the adapter the driver's callback entry points forward into
//! - **`bridge_service`** – [`NfcBridge`], the implementation of the remote interface
//! - **`factory`** – [`fetch_nfc`], the only way to obtain a bridge

pub mod bridge_service;
pub mod dispatch;
pub mod factory;
pub mod registration;

pub use bridge_service::NfcBridge;
pub use dispatch::CallbackDispatcher;
pub use factory::{fetch_nfc, ConfiguredProvider, DeviceProvider, FetchError, DEFAULT_INSTANCE};
pub use registration::{ClientRegistration, ClientSlot, DispatchSnapshot, RegistrationId};
