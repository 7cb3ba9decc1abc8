//! Fake device handle for unit and integration testing.
//!
//! Records every operation, returns configurable statuses, and lets tests
//! fire the driver's event and data callbacks from any thread, as if the
//! controller had produced them.

use std::collections::HashMap;
use std::sync::Arc;

use nfc_core::NciFrame;
use parking_lot::Mutex;

use super::{DeviceHandle, DeviceOp, HalCallbackSink};

/// Byte pattern written over a data buffer after its callback returns.
pub const REUSED_BUFFER_FILL: u8 = 0xEE;

/// One recorded call into the fake's operation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Open,
    Write(Vec<u8>),
    CoreInitialized(Vec<u8>),
    PreDiscover,
    Close,
    ControlGranted,
    PowerCycle,
}

impl DeviceCall {
    pub fn op(&self) -> DeviceOp {
        match self {
            DeviceCall::Open => DeviceOp::Open,
            DeviceCall::Write(_) => DeviceOp::Write,
            DeviceCall::CoreInitialized(_) => DeviceOp::CoreInitialized,
            DeviceCall::PreDiscover => DeviceOp::PreDiscover,
            DeviceCall::Close => DeviceOp::Close,
            DeviceCall::ControlGranted => DeviceOp::ControlGranted,
            DeviceCall::PowerCycle => DeviceOp::PowerCycle,
        }
    }
}

/// A fake [`DeviceHandle`].
///
/// Unless overridden with [`set_status`](Self::set_status), `write` returns the
/// number of bytes it was given and every other operation returns `0`.
#[derive(Default)]
pub struct FakeDevice {
    calls: Mutex<Vec<DeviceCall>>,
    statuses: Mutex<HashMap<DeviceOp, i32>>,
    callbacks: Mutex<Option<Arc<dyn HalCallbackSink>>>,
    on_open: Mutex<Option<(u8, u8)>>,
    on_close: Mutex<Option<(u8, u8)>>,
    recycled: Mutex<Option<Vec<u8>>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the status returned by `op`.
    pub fn set_status(&self, op: DeviceOp, status: i32) {
        self.statuses.lock().insert(op, status);
    }

    /// Fires `(event, status)` synchronously from inside the next `open`.
    pub fn fire_on_open(&self, event: u8, status: u8) {
        *self.on_open.lock() = Some((event, status));
    }

    /// Fires `(event, status)` synchronously from inside the next `close`.
    pub fn fire_on_close(&self, event: u8, status: u8) {
        *self.on_close.lock() = Some((event, status));
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, op: DeviceOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    /// The driver buffer behind the last `fire_data`, as it looks after reuse.
    pub fn recycled_buffer(&self) -> Option<Vec<u8>> {
        self.recycled.lock().clone()
    }

    /// Whether `open` has wired the callback entry points.
    pub fn is_wired(&self) -> bool {
        self.callbacks.lock().is_some()
    }

    /// Fires the event callback on the calling thread.
    ///
    /// Returns `false` if `open` has never wired the callbacks.
    pub fn fire_event(&self, event: u8, status: u8) -> bool {
        match self.wired() {
            Some(callbacks) => {
                callbacks.on_event(event, status);
                true
            }
            None => false,
        }
    }

    /// Fires the data callback on the calling thread.
    ///
    /// The bytes are staged in a driver-owned buffer that is overwritten with
    /// [`REUSED_BUFFER_FILL`] once the callback returns, the way a real driver
    /// recycles its receive buffer.
    pub fn fire_data(&self, data: &[u8]) -> bool {
        let Some(callbacks) = self.wired() else {
            return false;
        };
        let mut driver_buffer = data.to_vec();
        callbacks.on_data(NciFrame::new(&driver_buffer));
        driver_buffer.fill(REUSED_BUFFER_FILL);
        *self.recycled.lock() = Some(driver_buffer);
        true
    }

    fn wired(&self) -> Option<Arc<dyn HalCallbackSink>> {
        self.callbacks.lock().clone()
    }

    fn record(&self, call: DeviceCall) -> i32 {
        let op = call.op();
        let default = match &call {
            DeviceCall::Write(data) => data.len() as i32,
            _ => 0,
        };
        self.calls.lock().push(call);
        self.statuses.lock().get(&op).copied().unwrap_or(default)
    }
}

impl DeviceHandle for FakeDevice {
    fn open(&self, callbacks: Arc<dyn HalCallbackSink>) -> i32 {
        *self.callbacks.lock() = Some(callbacks);
        let pending = self.on_open.lock().take();
        if let Some((event, status)) = pending {
            self.fire_event(event, status);
        }
        self.record(DeviceCall::Open)
    }

    fn write(&self, data: &[u8]) -> i32 {
        self.record(DeviceCall::Write(data.to_vec()))
    }

    fn core_initialized(&self, data: &[u8]) -> i32 {
        self.record(DeviceCall::CoreInitialized(data.to_vec()))
    }

    fn pre_discover(&self) -> i32 {
        self.record(DeviceCall::PreDiscover)
    }

    fn close(&self) -> i32 {
        let pending = self.on_close.lock().take();
        if let Some((event, status)) = pending {
            self.fire_event(event, status);
        }
        self.record(DeviceCall::Close)
    }

    fn control_granted(&self) -> i32 {
        self.record(DeviceCall::ControlGranted)
    }

    fn power_cycle(&self) -> i32 {
        self.record(DeviceCall::PowerCycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        events: Mutex<Vec<(u8, u8)>>,
        frames: Mutex<Vec<Vec<u8>>>,
    }

    impl HalCallbackSink for CountingSink {
        fn on_event(&self, event: u8, status: u8) {
            self.events.lock().push((event, status));
        }

        fn on_data(&self, frame: NciFrame<'_>) {
            self.frames.lock().push(frame.to_vec());
        }
    }

    #[test]
    fn test_fire_before_open_reports_unwired() {
        let device = FakeDevice::new();

        assert!(!device.is_wired());
        assert!(!device.fire_event(0, 0));
        assert!(!device.fire_data(&[0x01]));
    }

    #[test]
    fn test_open_wires_callbacks() {
        // Arrange
        let device = FakeDevice::new();
        let sink = Arc::new(CountingSink::default());

        // Act
        device.open(sink.clone());
        device.fire_event(3, 0);
        device.fire_data(&[0x61, 0x05]);

        // Assert
        assert!(device.is_wired());
        assert_eq!(*sink.events.lock(), vec![(3, 0)]);
        assert_eq!(*sink.frames.lock(), vec![vec![0x61, 0x05]]);
        assert_eq!(device.recycled_buffer(), Some(vec![REUSED_BUFFER_FILL; 2]));
    }

    #[test]
    fn test_default_statuses() {
        let device = FakeDevice::new();

        assert_eq!(device.write(&[1, 2, 3, 4]), 4);
        assert_eq!(device.pre_discover(), 0);
        assert_eq!(device.power_cycle(), 0);
    }

    #[test]
    fn test_status_override_applies_to_one_op() {
        let device = FakeDevice::new();
        device.set_status(DeviceOp::ControlGranted, -3);

        assert_eq!(device.control_granted(), -3);
        assert_eq!(device.pre_discover(), 0);
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let device = FakeDevice::new();

        device.core_initialized(&[9]);
        device.write(&[1]);
        device.close();

        assert_eq!(
            device.calls(),
            vec![
                DeviceCall::CoreInitialized(vec![9]),
                DeviceCall::Write(vec![1]),
                DeviceCall::Close
            ]
        );
        assert_eq!(device.call_count(DeviceOp::Write), 1);
    }
}
