//! NfcBridge: the remote NFC interface bound to one controller.
//!
//! Two directions run through this type:
//!
//! ```text
//! client call  → NfcBridge::<op>   → DeviceHandle::<op>  → status relayed verbatim
//! driver thread → CallbackDispatcher → registered client (send_event / send_data)
//! ```
//!
//! The bridge does not track or enforce the `Uninitialized → Open → Closed`
//! lifecycle.  Ordering of operations is the NFC stack's responsibility.
//!
//! # Registration policy
//!
//! - `open` replaces the registration *before* calling hardware open, so an
//!   `OPEN_CPLT` fired from inside the driver's open reaches the new client.
//!   The status is not interpreted, so the registration stands either way.
//! - `close` clears the registration *after* hardware close returns.  Events the
//!   driver fires while closing are still delivered; later ones are dropped.
//!   Only the registration that was current when `close` began is cleared: a
//!   client that reopens from its `CLOSE_CPLT` handler stays registered.

use std::fmt;
use std::sync::Arc;

use nfc_core::{Nfc, NfcClientCallback};
use tracing::{debug, info, warn};

use crate::application::dispatch::CallbackDispatcher;
use crate::application::registration::{ClientSlot, DispatchSnapshot, RegistrationId};
use crate::infrastructure::device::{DeviceHandle, DeviceOp, HalCallbackSink};

/// Implementation of [`Nfc`] over a single [`DeviceHandle`].
///
/// Obtain one through [`fetch_nfc`](crate::application::factory::fetch_nfc).
pub struct NfcBridge {
    instance: String,
    device: Arc<dyn DeviceHandle>,
    dispatcher: Arc<CallbackDispatcher>,
}

impl NfcBridge {
    pub(crate) fn new(instance: impl Into<String>, device: Arc<dyn DeviceHandle>) -> Self {
        let slot = Arc::new(ClientSlot::new());
        Self {
            instance: instance.into(),
            device,
            dispatcher: Arc::new(CallbackDispatcher::new(slot)),
        }
    }

    /// Instance name this bridge was fetched under.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// The currently registered client, if any.
    pub fn registration(&self) -> Option<RegistrationId> {
        self.dispatcher.slot().current_id()
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.dispatcher.stats()
    }

    /// Handles the transport reporting that a client process died.
    ///
    /// If `id` is still the active registration it is cleared and the
    /// controller is closed; the close status is returned.  A stale id (the
    /// client was already replaced or closed) is ignored.
    pub fn client_died(&self, id: RegistrationId) -> Option<i32> {
        if !self.dispatcher.slot().clear_if(id) {
            debug!(instance = %self.instance, registration = %id, "death notice for stale registration ignored");
            return None;
        }
        warn!(instance = %self.instance, registration = %id, "registered client died; closing controller");
        Some(self.relay(DeviceOp::Close, self.device.close()))
    }

    fn relay(&self, op: DeviceOp, status: i32) -> i32 {
        debug!(instance = %self.instance, %op, status, "hardware call returned");
        status
    }
}

impl fmt::Debug for NfcBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NfcBridge")
            .field("instance", &self.instance)
            .field("registration", &self.registration())
            .finish_non_exhaustive()
    }
}

impl Nfc for NfcBridge {
    fn open(&self, client: Arc<dyn NfcClientCallback>) -> i32 {
        let (id, replaced) = self.dispatcher.slot().register(client);
        match replaced {
            Some(previous) => info!(
                instance = %self.instance,
                registration = %id,
                replaced = %previous,
                "client registration replaced"
            ),
            None => info!(instance = %self.instance, registration = %id, "client registered"),
        }

        let callbacks: Arc<dyn HalCallbackSink> = self.dispatcher.clone();
        self.relay(DeviceOp::Open, self.device.open(callbacks))
    }

    fn write(&self, data: &[u8]) -> i32 {
        self.relay(DeviceOp::Write, self.device.write(data))
    }

    fn core_initialized(&self, data: &[u8]) -> i32 {
        self.relay(DeviceOp::CoreInitialized, self.device.core_initialized(data))
    }

    fn prediscover(&self) -> i32 {
        self.relay(DeviceOp::PreDiscover, self.device.pre_discover())
    }

    fn close(&self) -> i32 {
        // Only the registration this close ends is cleared; an `open` that
        // lands while hardware close is in flight keeps its client.
        let closing = self.dispatcher.slot().current_id();
        let status = self.relay(DeviceOp::Close, self.device.close());
        if let Some(id) = closing {
            if self.dispatcher.slot().clear_if(id) {
                info!(instance = %self.instance, registration = %id, "client registration cleared on close");
            } else {
                debug!(instance = %self.instance, registration = %id, "client re-registered during close; keeping the new one");
            }
        }
        status
    }

    fn control_granted(&self) -> i32 {
        self.relay(DeviceOp::ControlGranted, self.device.control_granted())
    }

    fn power_cycle(&self) -> i32 {
        self.relay(DeviceOp::PowerCycle, self.device.power_cycle())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
