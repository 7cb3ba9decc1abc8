//! The single client registration shared by every dispatch site.
//!
//! `open` writes the slot; driver callback threads read it.  Reads clone the
//! current `Arc` under a short read guard and drop the guard before the client
//! is invoked, so no lock is ever held across a client callback and a client
//! may call back into the bridge from inside `send_event`/`send_data`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nfc_core::NfcClientCallback;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

/// Identity of one successful `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered client together with the id it was registered under.
pub struct ClientRegistration {
    id: RegistrationId,
    client: Arc<dyn NfcClientCallback>,
}

impl ClientRegistration {
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn client(&self) -> &dyn NfcClientCallback {
        self.client.as_ref()
    }
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Holder of at most one [`ClientRegistration`].
#[derive(Default)]
pub struct ClientSlot {
    current: RwLock<Option<Arc<ClientRegistration>>>,
}

impl ClientSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `client`, discarding any previous registration.
    ///
    /// Returns the new id and the id that was replaced, if any.
    pub fn register(
        &self,
        client: Arc<dyn NfcClientCallback>,
    ) -> (RegistrationId, Option<RegistrationId>) {
        let registration = Arc::new(ClientRegistration {
            id: RegistrationId::new(),
            client,
        });
        let id = registration.id;
        let previous = self.current.write().replace(registration);
        (id, previous.map(|p| p.id))
    }

    /// The current registration, if any.  The guard is released on return.
    pub fn current(&self) -> Option<Arc<ClientRegistration>> {
        self.current.read().clone()
    }

    pub fn current_id(&self) -> Option<RegistrationId> {
        self.current.read().as_ref().map(|r| r.id)
    }

    /// Removes the registration only if it is still `id`.
    ///
    /// Returns `false` when `id` was already replaced or cleared.
    pub fn clear_if(&self, id: RegistrationId) -> bool {
        let mut guard = self.current.write();
        match guard.as_ref() {
            Some(current) if current.id == id => {
                *guard = None;
                true
            }
            _ => false,
        }
    }
}

// ── Dispatch counters ─────────────────────────────────────────────────────────

/// Lock-free counters updated from driver callback threads.
#[derive(Debug, Default)]
pub struct DispatchStats {
    events_delivered: AtomicU64,
    events_dropped: AtomicU64,
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
    bytes_delivered: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    pub events_delivered: u64,
    pub events_dropped: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub bytes_delivered: u64,
}

impl DispatchStats {
    pub fn record_event_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_delivered(&self, len: usize) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes_delivered.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfc_core::{NfcEvent, NfcStatus};

    struct NullClient;

    impl NfcClientCallback for NullClient {
        fn send_event(&self, _event: NfcEvent, _status: NfcStatus) {}
        fn send_data(&self, _data: Vec<u8>) {}
    }

    fn client() -> Arc<dyn NfcClientCallback> {
        Arc::new(NullClient)
    }

    #[test]
    fn test_new_slot_is_empty() {
        let slot = ClientSlot::new();
        assert!(slot.current().is_none());
        assert!(slot.current_id().is_none());
    }

    #[test]
    fn test_register_installs_client() {
        // Arrange
        let slot = ClientSlot::new();

        // Act
        let (id, previous) = slot.register(client());

        // Assert
        assert!(previous.is_none());
        assert_eq!(slot.current_id(), Some(id));
        assert_eq!(slot.current().map(|r| r.id()), Some(id));
    }

    #[test]
    fn test_register_replaces_previous_client() {
        let slot = ClientSlot::new();
        let (first, _) = slot.register(client());

        let (second, replaced) = slot.register(client());

        assert_ne!(first, second);
        assert_eq!(replaced, Some(first));
        assert_eq!(slot.current_id(), Some(second));
    }

    #[test]
    fn test_clear_if_empties_slot_once() {
        let slot = ClientSlot::new();
        let (id, _) = slot.register(client());

        assert!(slot.clear_if(id));
        assert!(slot.current().is_none());
        assert!(!slot.clear_if(id));
    }

    #[test]
    fn test_clear_if_ignores_stale_id() {
        // Arrange: the first registration is replaced by a second
        let slot = ClientSlot::new();
        let (stale, _) = slot.register(client());
        let (live, _) = slot.register(client());

        // Act / Assert: the stale id must not evict the live client
        assert!(!slot.clear_if(stale));
        assert_eq!(slot.current_id(), Some(live));

        assert!(slot.clear_if(live));
        assert!(slot.current().is_none());
    }

    #[test]
    fn test_reader_keeps_registration_alive_after_replacement() {
        // A callback thread that already read the slot keeps its Arc even if
        // open replaces the registration meanwhile.
        let slot = ClientSlot::new();
        let (first, _) = slot.register(client());
        let held = slot.current().expect("registered");

        slot.register(client());

        assert_eq!(held.id(), first);
    }

    #[test]
    fn test_stats_snapshot_counts() {
        let stats = DispatchStats::default();
        stats.record_event_delivered();
        stats.record_event_dropped();
        stats.record_event_dropped();
        stats.record_frame_delivered(10);
        stats.record_frame_delivered(4);
        stats.record_frame_dropped();

        assert_eq!(
            stats.snapshot(),
            DispatchSnapshot {
                events_delivered: 1,
                events_dropped: 2,
                frames_delivered: 2,
                frames_dropped: 1,
                bytes_delivered: 14,
            }
        );
    }
}
