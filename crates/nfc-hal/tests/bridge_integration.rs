//! Integration tests for the NFC HAL bridge.
//!
//! Each test obtains a bridge through `fetch_nfc` over a `FakeDevice` and
//! drives the driver's callbacks the way a vendor driver thread would.

use std::collections::HashMap;
use std::ffi::{c_int, c_void};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use nfc_core::{Nfc, NfcClientCallback, NfcEvent, NfcStatus};
use nfc_hal::application::{fetch_nfc, NfcBridge, DEFAULT_INSTANCE};
use nfc_hal::infrastructure::device::ffi::{
    FfiDevice, NfcNciDevice, NfcStackCallback, NfcStackDataCallback,
};
use nfc_hal::infrastructure::device::mock::{DeviceCall, FakeDevice, REUSED_BUFFER_FILL};
use nfc_hal::infrastructure::device::{DeviceError, DeviceHandle, DeviceOp};

// ── Helpers ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Delivery {
    Event(NfcEvent, NfcStatus),
    Data(Vec<u8>),
}

/// Records every delivery together with the thread it arrived on.
#[derive(Default)]
struct RecordingClient {
    log: Mutex<Vec<(Delivery, ThreadId)>>,
}

impl RecordingClient {
    fn deliveries(&self) -> Vec<Delivery> {
        self.log.lock().iter().map(|(d, _)| d.clone()).collect()
    }

    fn threads(&self) -> Vec<ThreadId> {
        self.log.lock().iter().map(|(_, t)| *t).collect()
    }
}

impl NfcClientCallback for RecordingClient {
    fn send_event(&self, event: NfcEvent, status: NfcStatus) {
        self.log
            .lock()
            .push((Delivery::Event(event, status), thread::current().id()));
    }

    fn send_data(&self, data: Vec<u8>) {
        self.log
            .lock()
            .push((Delivery::Data(data), thread::current().id()));
    }
}

fn fetch_over_fake() -> (Arc<NfcBridge>, Arc<FakeDevice>) {
    let device = Arc::new(FakeDevice::new());
    let shared = device.clone();
    let provider = move |_: &str| -> Result<Arc<dyn DeviceHandle>, DeviceError> {
        Ok(shared.clone())
    };
    let bridge = fetch_nfc(DEFAULT_INSTANCE, &provider).expect("fetch over fake device");
    (bridge, device)
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn test_end_to_end_open_event_write_close() {
    // Arrange
    let (bridge, device) = fetch_over_fake();
    device.set_status(DeviceOp::Open, 0);
    device.set_status(DeviceOp::Write, 2);
    device.set_status(DeviceOp::Close, 0);
    let client = Arc::new(RecordingClient::default());

    // Act / Assert: open
    assert_eq!(bridge.open(client.clone()), 0);
    assert_eq!(device.call_count(DeviceOp::Open), 1);

    // Act / Assert: a driver event reaches the client exactly once
    assert!(device.fire_event(NfcEvent::OPEN_CPLT, NfcStatus::OK));
    assert_eq!(
        client.deliveries(),
        vec![Delivery::Event(NfcEvent::OpenCplt, NfcStatus::Ok)]
    );

    // Act / Assert: write is relayed with the exact buffer
    assert_eq!(bridge.write(&[0x01, 0x02]), 2);

    // Act / Assert: close
    assert_eq!(bridge.close(), 0);
    assert_eq!(
        device.calls(),
        vec![
            DeviceCall::Open,
            DeviceCall::Write(vec![0x01, 0x02]),
            DeviceCall::Close
        ]
    );
}

#[test]
fn test_callbacks_without_open_deliver_nothing() {
    // Arrange: wire the dispatcher through one client, then close so the
    // slot is empty while the driver keeps firing.
    let (bridge, device) = fetch_over_fake();
    let client = Arc::new(RecordingClient::default());
    bridge.open(client.clone());
    bridge.close();

    // Act
    device.fire_event(NfcEvent::ERROR, NfcStatus::FAILED);
    device.fire_data(&[0x60, 0x00]);

    // Assert
    assert!(client.deliveries().is_empty());
    let stats = bridge.stats();
    assert_eq!(stats.events_dropped, 1);
    assert_eq!(stats.frames_dropped, 1);
}

#[test]
fn test_fire_before_any_open_is_harmless() {
    let (bridge, device) = fetch_over_fake();

    assert!(!device.fire_event(NfcEvent::OPEN_CPLT, NfcStatus::OK));
    assert!(!device.fire_data(&[0x01]));
    assert!(bridge.registration().is_none());
}

#[test]
fn test_most_recent_open_wins() {
    // Arrange
    let (bridge, device) = fetch_over_fake();
    let clients: Vec<Arc<RecordingClient>> =
        (0..3).map(|_| Arc::new(RecordingClient::default())).collect();

    // Act
    for client in &clients {
        bridge.open(client.clone());
    }
    device.fire_event(NfcEvent::PRE_DISCOVER_CPLT, NfcStatus::OK);

    // Assert
    assert!(clients[0].deliveries().is_empty());
    assert!(clients[1].deliveries().is_empty());
    assert_eq!(
        clients[2].deliveries(),
        vec![Delivery::Event(NfcEvent::PreDiscoverCplt, NfcStatus::Ok)]
    );
}

#[test]
fn test_data_is_copied_before_driver_reuses_buffer() {
    // Arrange
    let (bridge, device) = fetch_over_fake();
    let client = Arc::new(RecordingClient::default());
    bridge.open(client.clone());
    let frame = [0x61, 0x05, 0x04, 0x01, 0x02, 0x03, 0x04];

    // Act: the fake overwrites its buffer with REUSED_BUFFER_FILL afterwards
    device.fire_data(&frame);

    // Assert: the driver's buffer was overwritten, the client's copy was not
    assert_eq!(
        device.recycled_buffer(),
        Some(vec![REUSED_BUFFER_FILL; frame.len()])
    );
    assert_eq!(client.deliveries(), vec![Delivery::Data(frame.to_vec())]);
    assert_eq!(bridge.stats().bytes_delivered, frame.len() as u64);
}

#[test]
fn test_unknown_codes_pass_through_unchanged() {
    let (bridge, device) = fetch_over_fake();
    let client = Arc::new(RecordingClient::default());
    bridge.open(client.clone());

    device.fire_event(0x42, 0x99);

    assert_eq!(
        client.deliveries(),
        vec![Delivery::Event(NfcEvent::Unknown(0x42), NfcStatus::Unknown(0x99))]
    );
}

#[test]
fn test_delivery_happens_on_the_firing_thread() {
    // Arrange
    let (bridge, device) = fetch_over_fake();
    let client = Arc::new(RecordingClient::default());
    bridge.open(client.clone());

    // Act
    let driver_thread = thread::scope(|s| {
        s.spawn(|| {
            device.fire_event(NfcEvent::REQUEST_CONTROL, NfcStatus::OK);
            device.fire_data(&[0xAA]);
            thread::current().id()
        })
        .join()
        .expect("driver thread")
    });

    // Assert
    assert_eq!(client.threads(), vec![driver_thread, driver_thread]);
    assert_ne!(driver_thread, thread::current().id());
}

#[test]
fn test_concurrent_callbacks_are_delivered_one_to_one() {
    const THREADS: u8 = 8;
    const PER_THREAD: u8 = 50;

    // Arrange
    let (bridge, device) = fetch_over_fake();
    let client = Arc::new(RecordingClient::default());
    bridge.open(client.clone());

    // Act: every callback carries a (thread, sequence) marker
    thread::scope(|s| {
        for t in 0..THREADS {
            let device = &device;
            s.spawn(move || {
                for n in 0..PER_THREAD {
                    device.fire_event(t, n);
                    device.fire_data(&[t, n, 0xC0, 0xDE]);
                }
            });
        }
    });

    // Assert: each marker arrives exactly once, in per-thread order
    let mut events: HashMap<u8, Vec<u8>> = HashMap::new();
    let mut frames: HashMap<u8, Vec<u8>> = HashMap::new();
    for delivery in client.deliveries() {
        match delivery {
            Delivery::Event(event, status) => {
                events.entry(event.code()).or_default().push(status.code());
            }
            Delivery::Data(data) => {
                assert_eq!(data.len(), 4);
                assert_eq!(&data[2..], &[0xC0, 0xDE]);
                frames.entry(data[0]).or_default().push(data[1]);
            }
        }
    }
    let expected: Vec<u8> = (0..PER_THREAD).collect();
    for t in 0..THREADS {
        assert_eq!(events.get(&t), Some(&expected), "events from thread {t}");
        assert_eq!(frames.get(&t), Some(&expected), "frames from thread {t}");
    }
    let stats = bridge.stats();
    assert_eq!(stats.events_delivered, u64::from(THREADS) * u64::from(PER_THREAD));
    assert_eq!(stats.frames_delivered, u64::from(THREADS) * u64::from(PER_THREAD));
}

#[test]
fn test_null_handle_is_refused_by_factory() {
    let provider = |_: &str| -> Result<Arc<dyn DeviceHandle>, DeviceError> {
        // SAFETY: a null table is rejected before it is dereferenced.
        let device = unsafe { FfiDevice::from_raw(std::ptr::null::<NfcNciDevice>()) }?;
        Ok(Arc::new(device))
    };

    let result = fetch_nfc(DEFAULT_INSTANCE, &provider);

    assert!(result.is_err());
}

#[test]
fn test_client_death_closes_and_stops_delivery() {
    // Arrange
    let (bridge, device) = fetch_over_fake();
    let client = Arc::new(RecordingClient::default());
    bridge.open(client.clone());
    let id = bridge.registration().expect("registered");

    // Act
    let status = bridge.client_died(id);
    device.fire_event(NfcEvent::HCI_NETWORK_RESET, NfcStatus::OK);

    // Assert
    assert_eq!(status, Some(0));
    assert_eq!(device.call_count(DeviceOp::Close), 1);
    assert!(client.deliveries().is_empty());
}

// ── C driver shared by several bridges ────────────────────────────────────────

/// Minimal C driver: remembers the callbacks from its last `open`.
#[repr(C)]
struct StubDriver {
    table: NfcNciDevice,
    wired: Mutex<Option<(usize, NfcStackCallback, NfcStackDataCallback)>>,
}

unsafe extern "C" fn stub_open(
    dev: *const NfcNciDevice,
    context: *mut c_void,
    p_cback: NfcStackCallback,
    p_data_cback: NfcStackDataCallback,
) -> c_int {
    let driver = &*(dev as *const StubDriver);
    *driver.wired.lock() = Some((context as usize, p_cback, p_data_cback));
    0
}

unsafe extern "C" fn stub_buffer(_dev: *const NfcNciDevice, len: u16, _p: *const u8) -> c_int {
    c_int::from(len)
}

unsafe extern "C" fn stub_command(_dev: *const NfcNciDevice) -> c_int {
    0
}

impl StubDriver {
    fn new() -> Box<Self> {
        Box::new(Self {
            table: NfcNciDevice {
                open: Some(stub_open),
                write: Some(stub_buffer),
                core_initialized: Some(stub_buffer),
                pre_discover: Some(stub_command),
                close: Some(stub_command),
                control_granted: Some(stub_command),
                power_cycle: Some(stub_command),
            },
            wired: Mutex::new(None),
        })
    }

    fn fire_event(&self, event: u8, status: u8) {
        let (context, cb, _) = self.wired.lock().expect("driver opened");
        // SAFETY: the context came from FfiDevice::open and the device is alive.
        unsafe { cb(context as *mut c_void, event, status) }
    }
}

#[test]
fn test_second_bridge_over_shared_controller_receives_callbacks() {
    // Arrange: one controller handle served to every fetch
    let driver = StubDriver::new();
    // SAFETY: `driver` outlives the device and every bridge below.
    let device: Arc<dyn DeviceHandle> =
        Arc::new(unsafe { FfiDevice::from_raw(&driver.table) }.expect("complete table"));
    let provider = move |_: &str| -> Result<Arc<dyn DeviceHandle>, DeviceError> {
        Ok(device.clone())
    };
    let first = fetch_nfc(DEFAULT_INSTANCE, &provider).expect("first bridge");
    let second = fetch_nfc(DEFAULT_INSTANCE, &provider).expect("second bridge");
    let a = Arc::new(RecordingClient::default());
    let b = Arc::new(RecordingClient::default());

    // Act
    assert_eq!(first.open(a.clone()), 0);
    first.close();
    assert_eq!(second.open(b.clone()), 0);
    driver.fire_event(NfcEvent::OPEN_CPLT, NfcStatus::OK);

    // Assert
    assert!(a.deliveries().is_empty());
    assert_eq!(
        b.deliveries(),
        vec![Delivery::Event(NfcEvent::OpenCplt, NfcStatus::Ok)]
    );
    assert_eq!(first.stats().events_dropped, 0);
    second.close();
}
