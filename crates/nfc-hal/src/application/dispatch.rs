//! Callback dispatch: driver thread → registered client.
//!
//! [`CallbackDispatcher`] is the adapter object a device handle's callback
//! entry points forward into.  It captures the bridge's [`ClientSlot`] so the
//! driver-facing side never touches a global.
//!
//! Each dispatch reads the slot once.  With no client registered the
//! notification is dropped: never queued, never buffered, never an error.
//! Otherwise the client is invoked synchronously on the calling driver thread
//! and the dispatcher returns as soon as the client does.

use std::sync::Arc;

use nfc_core::{NciFrame, NfcEvent, NfcStatus};
use tracing::{debug, trace};

use crate::application::registration::{ClientSlot, DispatchSnapshot, DispatchStats};
use crate::infrastructure::device::HalCallbackSink;

/// Forwards driver callbacks to the currently registered client.
pub struct CallbackDispatcher {
    slot: Arc<ClientSlot>,
    stats: DispatchStats,
}

impl CallbackDispatcher {
    pub fn new(slot: Arc<ClientSlot>) -> Self {
        Self {
            slot,
            stats: DispatchStats::default(),
        }
    }

    pub fn slot(&self) -> &ClientSlot {
        &self.slot
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }
}

impl HalCallbackSink for CallbackDispatcher {
    fn on_event(&self, event: u8, status: u8) {
        let event = NfcEvent::from(event);
        let status = NfcStatus::from(status);

        let Some(registration) = self.slot.current() else {
            trace!(%event, %status, "no client registered; event dropped");
            self.stats.record_event_dropped();
            return;
        };

        debug!(registration = %registration.id(), %event, %status, "delivering event");
        registration.client().send_event(event, status);
        self.stats.record_event_delivered();
    }

    fn on_data(&self, frame: NciFrame<'_>) {
        let Some(registration) = self.slot.current() else {
            trace!(len = frame.len(), "no client registered; frame dropped");
            self.stats.record_frame_dropped();
            return;
        };

        // The frame borrows driver memory; the client gets its own copy.
        let len = frame.len();
        trace!(registration = %registration.id(), len, frame = %frame, "delivering frame");
        registration.client().send_data(frame.to_vec());
        self.stats.record_frame_delivered(len);
    }
}
