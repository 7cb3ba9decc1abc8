//! The remote NFC interface and its client notification counterpart.
//!
//! [`Nfc`] is what the transport layer calls into on behalf of the NFC stack.
//! [`NfcClientCallback`] is what the stack hands over in `open` so the bridge
//! can push controller events and inbound frames back to it.

use std::sync::Arc;

use crate::protocol::events::{NfcEvent, NfcStatus};

/// Client-side receiver of asynchronous controller notifications.
///
/// Both methods are invoked synchronously on whatever driver thread fired the
/// underlying callback, possibly concurrently with each other and with calls
/// the client is making into the bridge.  Implementations should return
/// quickly and must not block on the driver.
pub trait NfcClientCallback: Send + Sync {
    /// A control event fired by the controller.
    fn send_event(&self, event: NfcEvent, status: NfcStatus);

    /// An inbound NCI frame.  The buffer is already a copy owned by the client.
    fn send_data(&self, data: Vec<u8>);
}

/// The remote interface exposed to the NFC stack.
///
/// Every method blocks until the controller driver returns and relays the
/// driver's integer status unchanged.  Status codes are not interpreted here.
pub trait Nfc: Send + Sync {
    /// Registers `client` for notifications and opens the controller.
    fn open(&self, client: Arc<dyn NfcClientCallback>) -> i32;

    /// Sends an NCI frame to the controller.  Returns the driver's result,
    /// typically the number of bytes accepted.
    fn write(&self, data: &[u8]) -> i32;

    /// Tells the controller the stack finished core initialization.
    /// `data` is opaque configuration from the `CORE_INIT` response.
    fn core_initialized(&self, data: &[u8]) -> i32;

    fn prediscover(&self) -> i32;

    fn close(&self) -> i32;

    /// Grants the controller exclusive control after `REQUEST_CONTROL`.
    fn control_granted(&self) -> i32;

    fn power_cycle(&self) -> i32;
}
