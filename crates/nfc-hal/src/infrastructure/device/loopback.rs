//! Simulated NFC controller.
//!
//! Behaves like a driver with its own callback thread: every completion event
//! and every echoed frame is delivered from a dedicated `nfc-loopback-drv`
//! thread, never from the caller's thread.  Written frames are echoed back
//! through the data callback when `echo_writes` is set.
//!
//! | Operation          | Event fired on the driver thread |
//! |--------------------|----------------------------------|
//! | `open`             | `OPEN_CPLT` after `open_delay`   |
//! | `core_initialized` | `POST_INIT_CPLT`                 |
//! | `pre_discover`     | `PRE_DISCOVER_CPLT`              |
//! | `control_granted`  | `RELEASE_CONTROL`                |
//! | `power_cycle`      | `OPEN_CPLT`                      |
//! | `close`            | `CLOSE_CPLT`, delivered before `close` returns |

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nfc_core::{NciFrame, NfcEvent, NfcStatus};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::{DeviceHandle, HalCallbackSink};
use crate::infrastructure::storage::config::ControllerConfig;

/// Status returned by operations issued while the controller is not open.
pub const NOT_OPEN: i32 = -1;

/// Tunables for the simulated controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackSettings {
    /// Delay before `OPEN_CPLT` is fired.
    pub open_delay: Duration,
    /// Echo every written frame back through the data callback.
    pub echo_writes: bool,
}

impl Default for LoopbackSettings {
    fn default() -> Self {
        Self {
            open_delay: Duration::from_millis(20),
            echo_writes: true,
        }
    }
}

impl From<&ControllerConfig> for LoopbackSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            open_delay: Duration::from_millis(config.open_delay_ms),
            echo_writes: config.echo_writes,
        }
    }
}

enum DriverTask {
    Event { event: u8, status: u8, delay: Duration },
    Data(Vec<u8>),
    Shutdown,
}

struct DriverThread {
    tx: Sender<DriverTask>,
    handle: JoinHandle<()>,
}

/// A [`DeviceHandle`] that simulates a controller in-process.
pub struct LoopbackController {
    settings: LoopbackSettings,
    driver: Mutex<Option<DriverThread>>,
}

impl LoopbackController {
    pub fn new(settings: LoopbackSettings) -> Self {
        Self {
            settings,
            driver: Mutex::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.driver.lock().is_some()
    }

    /// Queues a task on the driver thread.  Returns `false` if not open.
    fn post(&self, task: DriverTask) -> bool {
        match self.driver.lock().as_ref() {
            Some(driver) => driver.tx.send(task).is_ok(),
            None => false,
        }
    }

    fn post_event(&self, event: u8) -> i32 {
        let task = DriverTask::Event {
            event,
            status: NfcStatus::OK,
            delay: Duration::ZERO,
        };
        if self.post(task) {
            0
        } else {
            NOT_OPEN
        }
    }

    fn stop(driver: DriverThread) {
        let _ = driver.tx.send(DriverTask::Shutdown);
        if driver.handle.thread().id() == thread::current().id() {
            // close() issued from inside a callback; the loop exits on its own.
            return;
        }
        if driver.handle.join().is_err() {
            error!("loopback driver thread panicked");
        }
    }
}

impl Default for LoopbackController {
    fn default() -> Self {
        Self::new(LoopbackSettings::default())
    }
}

impl DeviceHandle for LoopbackController {
    fn open(&self, callbacks: Arc<dyn HalCallbackSink>) -> i32 {
        let previous = self.driver.lock().take();
        if let Some(previous) = previous {
            warn!("loopback controller reopened; restarting driver thread");
            Self::stop(previous);
        }

        let (tx, rx) = mpsc::channel();
        let handle = match thread::Builder::new()
            .name("nfc-loopback-drv".to_string())
            .spawn(move || run_driver(rx, callbacks))
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("failed to spawn loopback driver thread: {e}");
                return NOT_OPEN;
            }
        };

        let _ = tx.send(DriverTask::Event {
            event: NfcEvent::OPEN_CPLT,
            status: NfcStatus::OK,
            delay: self.settings.open_delay,
        });
        *self.driver.lock() = Some(DriverThread { tx, handle });
        debug!(open_delay = ?self.settings.open_delay, "loopback controller open");
        0
    }

    fn write(&self, data: &[u8]) -> i32 {
        if !self.is_open() {
            return NOT_OPEN;
        }
        if self.settings.echo_writes && !self.post(DriverTask::Data(data.to_vec())) {
            return NOT_OPEN;
        }
        i32::try_from(data.len()).unwrap_or(i32::MAX)
    }

    fn core_initialized(&self, _data: &[u8]) -> i32 {
        self.post_event(NfcEvent::POST_INIT_CPLT)
    }

    fn pre_discover(&self) -> i32 {
        self.post_event(NfcEvent::PRE_DISCOVER_CPLT)
    }

    fn close(&self) -> i32 {
        // Take the driver out before joining so callbacks that re-enter this
        // controller do not contend on the slot lock.
        let Some(driver) = self.driver.lock().take() else {
            return NOT_OPEN;
        };
        let _ = driver.tx.send(DriverTask::Event {
            event: NfcEvent::CLOSE_CPLT,
            status: NfcStatus::OK,
            delay: Duration::ZERO,
        });
        Self::stop(driver);
        debug!("loopback controller closed");
        0
    }

    fn control_granted(&self) -> i32 {
        self.post_event(NfcEvent::RELEASE_CONTROL)
    }

    fn power_cycle(&self) -> i32 {
        self.post_event(NfcEvent::OPEN_CPLT)
    }
}

impl Drop for LoopbackController {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            Self::stop(driver);
        }
    }
}

fn run_driver(rx: Receiver<DriverTask>, callbacks: Arc<dyn HalCallbackSink>) {
    while let Ok(task) = rx.recv() {
        match task {
            DriverTask::Event { event, status, delay } => {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                callbacks.on_event(event, status);
            }
            DriverTask::Data(mut buffer) => {
                callbacks.on_data(NciFrame::new(&buffer));
                // Receive buffers are recycled once the callback returns.
                buffer.fill(0);
            }
            DriverTask::Shutdown => break,
        }
    }
}
