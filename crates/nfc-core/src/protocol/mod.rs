//! Protocol module containing control event codes and the inbound frame view.

pub mod events;
pub mod frame;

pub use events::{NfcEvent, NfcStatus};
pub use frame::NciFrame;
