//! Control event and status codes reported by an NFC controller driver.
//!
//! The driver fires events as raw bytes.  Both enums convert losslessly in
//! each direction: codes this crate does not name are kept as `Unknown(code)`
//! so a notification always carries exactly the pair the hardware fired.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Event codes ───────────────────────────────────────────────────────────────

/// Control event kind carried by an event notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NfcEvent {
    /// Hardware open finished.
    OpenCplt,
    /// Hardware close finished.
    CloseCplt,
    /// Post-`coreInitialized` configuration finished.
    PostInitCplt,
    /// Pre-discovery configuration finished.
    PreDiscoverCplt,
    /// The controller asks the stack for exclusive control.
    RequestControl,
    /// The controller hands control back to the stack.
    ReleaseControl,
    /// Unrecoverable controller error.
    Error,
    /// The controller reset its HCI network.
    HciNetworkReset,
    /// A code with no named variant.
    Unknown(u8),
}

impl NfcEvent {
    pub const OPEN_CPLT: u8 = 0;
    pub const CLOSE_CPLT: u8 = 1;
    pub const POST_INIT_CPLT: u8 = 2;
    pub const PRE_DISCOVER_CPLT: u8 = 3;
    pub const REQUEST_CONTROL: u8 = 4;
    pub const RELEASE_CONTROL: u8 = 5;
    pub const ERROR: u8 = 6;
    pub const HCI_NETWORK_RESET: u8 = 7;

    /// Raw code as fired by the driver.
    pub fn code(self) -> u8 {
        u8::from(self)
    }
}

impl From<u8> for NfcEvent {
    fn from(value: u8) -> Self {
        match value {
            Self::OPEN_CPLT => NfcEvent::OpenCplt,
            Self::CLOSE_CPLT => NfcEvent::CloseCplt,
            Self::POST_INIT_CPLT => NfcEvent::PostInitCplt,
            Self::PRE_DISCOVER_CPLT => NfcEvent::PreDiscoverCplt,
            Self::REQUEST_CONTROL => NfcEvent::RequestControl,
            Self::RELEASE_CONTROL => NfcEvent::ReleaseControl,
            Self::ERROR => NfcEvent::Error,
            Self::HCI_NETWORK_RESET => NfcEvent::HciNetworkReset,
            other => NfcEvent::Unknown(other),
        }
    }
}

impl From<NfcEvent> for u8 {
    fn from(event: NfcEvent) -> Self {
        match event {
            NfcEvent::OpenCplt => NfcEvent::OPEN_CPLT,
            NfcEvent::CloseCplt => NfcEvent::CLOSE_CPLT,
            NfcEvent::PostInitCplt => NfcEvent::POST_INIT_CPLT,
            NfcEvent::PreDiscoverCplt => NfcEvent::PRE_DISCOVER_CPLT,
            NfcEvent::RequestControl => NfcEvent::REQUEST_CONTROL,
            NfcEvent::ReleaseControl => NfcEvent::RELEASE_CONTROL,
            NfcEvent::Error => NfcEvent::ERROR,
            NfcEvent::HciNetworkReset => NfcEvent::HCI_NETWORK_RESET,
            NfcEvent::Unknown(code) => code,
        }
    }
}

impl fmt::Display for NfcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NfcEvent::OpenCplt => f.write_str("OPEN_CPLT"),
            NfcEvent::CloseCplt => f.write_str("CLOSE_CPLT"),
            NfcEvent::PostInitCplt => f.write_str("POST_INIT_CPLT"),
            NfcEvent::PreDiscoverCplt => f.write_str("PRE_DISCOVER_CPLT"),
            NfcEvent::RequestControl => f.write_str("REQUEST_CONTROL"),
            NfcEvent::ReleaseControl => f.write_str("RELEASE_CONTROL"),
            NfcEvent::Error => f.write_str("ERROR"),
            NfcEvent::HciNetworkReset => f.write_str("HCI_NETWORK_RESET"),
            NfcEvent::Unknown(code) => write!(f, "EVENT_0x{code:02X}"),
        }
    }
}

// ── Status codes ──────────────────────────────────────────────────────────────

/// Status carried alongside an [`NfcEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NfcStatus {
    Ok,
    Failed,
    /// The transport to the controller failed.
    ErrTransport,
    /// The controller did not answer a command in time.
    ErrCmdTimeout,
    Refused,
    /// A code with no named variant.
    Unknown(u8),
}

impl NfcStatus {
    pub const OK: u8 = 0;
    pub const FAILED: u8 = 1;
    pub const ERR_TRANSPORT: u8 = 2;
    pub const ERR_CMD_TIMEOUT: u8 = 3;
    pub const REFUSED: u8 = 4;

    /// Raw code as fired by the driver.
    pub fn code(self) -> u8 {
        u8::from(self)
    }
}

impl From<u8> for NfcStatus {
    fn from(value: u8) -> Self {
        match value {
            Self::OK => NfcStatus::Ok,
            Self::FAILED => NfcStatus::Failed,
            Self::ERR_TRANSPORT => NfcStatus::ErrTransport,
            Self::ERR_CMD_TIMEOUT => NfcStatus::ErrCmdTimeout,
            Self::REFUSED => NfcStatus::Refused,
            other => NfcStatus::Unknown(other),
        }
    }
}

impl From<NfcStatus> for u8 {
    fn from(status: NfcStatus) -> Self {
        match status {
            NfcStatus::Ok => NfcStatus::OK,
            NfcStatus::Failed => NfcStatus::FAILED,
            NfcStatus::ErrTransport => NfcStatus::ERR_TRANSPORT,
            NfcStatus::ErrCmdTimeout => NfcStatus::ERR_CMD_TIMEOUT,
            NfcStatus::Refused => NfcStatus::REFUSED,
            NfcStatus::Unknown(code) => code,
        }
    }
}

impl fmt::Display for NfcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NfcStatus::Ok => f.write_str("OK"),
            NfcStatus::Failed => f.write_str("FAILED"),
            NfcStatus::ErrTransport => f.write_str("ERR_TRANSPORT"),
            NfcStatus::ErrCmdTimeout => f.write_str("ERR_CMD_TIMEOUT"),
            NfcStatus::Refused => f.write_str("REFUSED"),
            NfcStatus::Unknown(code) => write!(f, "STATUS_0x{code:02X}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
