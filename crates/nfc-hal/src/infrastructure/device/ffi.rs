//! C operation table adapter.
//!
//! A vendor driver exposes its controller as a `#[repr(C)]` table of function
//! pointers.  The driver's two callbacks are plain C function pointers, so
//! they cannot capture state; instead the driver is handed an opaque
//! `context` pointer at `open` and passes it back on every callback.
//! [`event_trampoline`] and [`data_trampoline`] turn that pointer back into
//! the [`HalCallbackSink`] the bridge registered.
//!
//! # What is a function-pointer table? (for beginners)
//!
//! C has no traits.  A C library that wants "an object with methods" hands
//! out a struct whose fields are function pointers, and the caller passes the
//! struct itself back as the first argument of every call:
//!
//! ```text
//! struct nfc_nci_device {
//!     int (*open)(const nfc_nci_device *dev, void *context,
//!                 stack_cback cb, stack_data_cback data_cb);
//!     int (*write)(const nfc_nci_device *dev, uint16_t len, const uint8_t *p);
//!     ...
//! };
//! ```
//!
//! [`NfcNciDevice`] mirrors that layout field for field; `#[repr(C)]` tells
//! the compiler not to reorder the fields.  `Option<fn>` is used because a
//! null function pointer in C becomes `None` in Rust, which
//! [`FfiDevice::from_raw`] checks once so later calls never have to.
//!
//! # Why a context pointer?
//!
//! A Rust closure can carry state; a C function pointer cannot.  The driver
//! therefore stores an opaque `void *context` next to the callbacks and hands
//! it back on every call.  Here the context is the address of a boxed,
//! lock-protected slot holding the current sink.  The box never moves, so the
//! address the driver keeps stays valid; the slot's contents are swapped on
//! every `open`, so a reopen with a new sink is seen by the very next
//! callback.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for the driver FFI boundary.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

use std::ffi::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::slice;
use std::sync::Arc;

use nfc_core::NciFrame;
use parking_lot::RwLock;
use tracing::{debug, error};

use super::{DeviceError, DeviceHandle, DeviceOp, HalCallbackSink};

/// Status returned without calling the driver when a payload is longer than
/// the table's `u16` length field can express.
pub const FRAME_TOO_LONG: i32 = -1;

/// Event callback: `(context, event, status)`.
pub type NfcStackCallback = unsafe extern "C" fn(context: *mut c_void, event: u8, status: u8);

/// Data callback: `(context, data_len, p_data)`.  `p_data` is driver memory,
/// valid only until the callback returns.
pub type NfcStackDataCallback =
    unsafe extern "C" fn(context: *mut c_void, data_len: u16, p_data: *const u8);

pub type OpenFn = unsafe extern "C" fn(
    dev: *const NfcNciDevice,
    context: *mut c_void,
    p_cback: NfcStackCallback,
    p_data_cback: NfcStackDataCallback,
) -> c_int;

/// Shared by `write` and `core_initialized`.
pub type BufferFn =
    unsafe extern "C" fn(dev: *const NfcNciDevice, data_len: u16, p_data: *const u8) -> c_int;

pub type CommandFn = unsafe extern "C" fn(dev: *const NfcNciDevice) -> c_int;

/// The driver's operation table, laid out as the C header declares it.
///
/// Drivers that need private state embed this struct as the *first* field of
/// a larger `#[repr(C)]` struct and cast `dev` back on entry.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct NfcNciDevice {
    pub open: Option<OpenFn>,
    pub write: Option<BufferFn>,
    pub core_initialized: Option<BufferFn>,
    pub pre_discover: Option<CommandFn>,
    pub close: Option<CommandFn>,
    pub control_granted: Option<CommandFn>,
    pub power_cycle: Option<CommandFn>,
}

/// Entry points resolved once at construction so calls never re-check them.
struct EntryPoints {
    open: OpenFn,
    write: BufferFn,
    core_initialized: BufferFn,
    pre_discover: CommandFn,
    close: CommandFn,
    control_granted: CommandFn,
    power_cycle: CommandFn,
}

fn require<F>(entry: Option<F>, op: DeviceOp) -> Result<F, DeviceError> {
    entry.ok_or(DeviceError::MissingEntryPoint(op.entry_point()))
}

/// The sink the trampolines forward into.  Replaced on every `open`.
type SinkCell = RwLock<Option<Arc<dyn HalCallbackSink>>>;

/// [`DeviceHandle`] over a C [`NfcNciDevice`] table.
pub struct FfiDevice {
    table: NonNull<NfcNciDevice>,
    entry: EntryPoints,
    /// Boxed so the driver's `context` pointer stays stable across reopens
    /// while the sink inside it is swapped.
    callbacks: Box<SinkCell>,
}

// SAFETY: the driver contract requires every entry point to be callable from
// any thread, and the table itself is never written through this pointer.
unsafe impl Send for FfiDevice {}
// SAFETY: see `Send`; shared access only ever reads the table.
unsafe impl Sync for FfiDevice {}

impl FfiDevice {
    /// Wraps a driver's operation table.
    ///
    /// # Errors
    ///
    /// [`DeviceError::NullHandle`] if `table` is null, or
    /// [`DeviceError::MissingEntryPoint`] if any entry point is absent.
    ///
    /// # Safety
    ///
    /// A non-null `table` must point to an initialized [`NfcNciDevice`] that
    /// stays valid for the whole life of the returned `FfiDevice`.  The driver
    /// must stop firing callbacks (i.e. be closed) before the `FfiDevice` is
    /// dropped, because the callback context is owned here.
    pub unsafe fn from_raw(table: *const NfcNciDevice) -> Result<Self, DeviceError> {
        let table = NonNull::new(table as *mut NfcNciDevice).ok_or(DeviceError::NullHandle)?;
        // SAFETY: non-null and valid per the caller contract.
        let raw = table.as_ref();
        let entry = EntryPoints {
            open: require(raw.open, DeviceOp::Open)?,
            write: require(raw.write, DeviceOp::Write)?,
            core_initialized: require(raw.core_initialized, DeviceOp::CoreInitialized)?,
            pre_discover: require(raw.pre_discover, DeviceOp::PreDiscover)?,
            close: require(raw.close, DeviceOp::Close)?,
            control_granted: require(raw.control_granted, DeviceOp::ControlGranted)?,
            power_cycle: require(raw.power_cycle, DeviceOp::PowerCycle)?,
        };
        Ok(Self {
            table,
            entry,
            callbacks: Box::new(RwLock::new(None)),
        })
    }

    fn call_with_buffer(&self, op: DeviceOp, f: BufferFn, data: &[u8]) -> i32 {
        let Ok(len) = u16::try_from(data.len()) else {
            error!(%op, len = data.len(), "payload exceeds u16 length field; not forwarded");
            return FRAME_TOO_LONG;
        };
        let ptr = if data.is_empty() { ptr::null() } else { data.as_ptr() };
        // SAFETY: `ptr` is null with length 0, or points at `len` readable bytes
        // that outlive this synchronous call.
        unsafe { f(self.table.as_ptr(), len, ptr) }
    }

    fn call(&self, f: CommandFn) -> i32 {
        // SAFETY: the table is valid for our lifetime per `from_raw`.
        unsafe { f(self.table.as_ptr()) }
    }
}

impl DeviceHandle for FfiDevice {
    fn open(&self, callbacks: Arc<dyn HalCallbackSink>) -> i32 {
        if self.callbacks.write().replace(callbacks).is_some() {
            debug!("controller reopened; callback sink replaced");
        }
        let cell: &SinkCell = &self.callbacks;
        let context = cell as *const SinkCell as *mut c_void;

        // SAFETY: `context` points into the Box owned by `self.callbacks`, which
        // is never moved or replaced and lives as long as `self`.
        unsafe {
            (self.entry.open)(
                self.table.as_ptr(),
                context,
                event_trampoline,
                data_trampoline,
            )
        }
    }

    fn write(&self, data: &[u8]) -> i32 {
        self.call_with_buffer(DeviceOp::Write, self.entry.write, data)
    }

    fn core_initialized(&self, data: &[u8]) -> i32 {
        self.call_with_buffer(DeviceOp::CoreInitialized, self.entry.core_initialized, data)
    }

    fn pre_discover(&self) -> i32 {
        self.call(self.entry.pre_discover)
    }

    fn close(&self) -> i32 {
        self.call(self.entry.close)
    }

    fn control_granted(&self) -> i32 {
        self.call(self.entry.control_granted)
    }

    fn power_cycle(&self) -> i32 {
        self.call(self.entry.power_cycle)
    }
}

// ── Trampolines ───────────────────────────────────────────────────────────────

/// Recovers the sink most recently wired by [`FfiDevice::open`].
///
/// The `Arc` is cloned out so the read guard is released before the sink
/// runs; a sink may reopen the device from inside its callback.
///
/// # Safety
///
/// `context` must be null or the pointer passed to the driver's `open`.
unsafe fn sink_from_context(context: *mut c_void) -> Option<Arc<dyn HalCallbackSink>> {
    let cell = (context as *const SinkCell).as_ref()?;
    cell.read().clone()
}

/// Event callback handed to the driver.
///
/// # Safety
///
/// Called by the driver on its own thread with the `context` from `open`.
/// Panics raised by the sink are contained here and never unwind into C.
pub unsafe extern "C" fn event_trampoline(context: *mut c_void, event: u8, status: u8) {
    // SAFETY: the driver echoes back the context it was given in `open`.
    let Some(sink) = sink_from_context(context) else {
        return;
    };
    if panic::catch_unwind(AssertUnwindSafe(|| sink.on_event(event, status))).is_err() {
        error!(event, status, "event callback panicked; contained at driver boundary");
    }
}

/// Data callback handed to the driver.
///
/// # Safety
///
/// As [`event_trampoline`]; additionally `p_data` must be null or point to
/// `data_len` bytes readable until this function returns.
pub unsafe extern "C" fn data_trampoline(context: *mut c_void, data_len: u16, p_data: *const u8) {
    // SAFETY: the driver echoes back the context it was given in `open`.
    let Some(sink) = sink_from_context(context) else {
        return;
    };
    let frame = if p_data.is_null() || data_len == 0 {
        NciFrame::empty()
    } else {
        // SAFETY: driver guarantees `data_len` readable bytes for the call.
        NciFrame::new(slice::from_raw_parts(p_data, usize::from(data_len)))
    };
    if panic::catch_unwind(AssertUnwindSafe(|| sink.on_data(frame))).is_err() {
        error!(data_len, "data callback panicked; contained at driver boundary");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
