//! Non-owning view over an inbound NCI data buffer.
//!
//! A controller driver hands inbound frames to its data callback as a raw
//! pointer and length.  The memory belongs to the driver and may be reused as
//! soon as the callback returns, so a frame is only ever *borrowed*.
//!
//! # Validity contract
//!
//! An [`NciFrame`] is valid only for the duration of the callback that
//! produced it.  The lifetime parameter enforces this within Rust code; anything
//! that must outlive the callback (forwarding to a client, queueing, logging
//! asynchronously) takes a copy with [`NciFrame::to_vec`] first.

use std::fmt;

/// Number of bytes shown by the `Display` hex dump before it is elided.
pub const DISPLAY_LIMIT: usize = 32;

/// Borrowed view of one inbound NCI frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NciFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> NciFrame<'a> {
    /// Wraps a driver-owned buffer.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// An empty frame (the driver fired the data callback with length 0).
    pub fn empty() -> NciFrame<'static> {
        NciFrame { bytes: &[] }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies the frame out of driver memory.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl<'a> From<&'a [u8]> for NciFrame<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

/// Space-separated upper-case hex, elided after [`DISPLAY_LIMIT`] bytes.
impl fmt::Display for NciFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.bytes.len().min(DISPLAY_LIMIT);
        for (i, byte) in self.bytes[..shown].iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        if self.bytes.len() > shown {
            write!(f, " ..(+{} bytes)", self.bytes.len() - shown)?;
        }
        Ok(())
    }
}
