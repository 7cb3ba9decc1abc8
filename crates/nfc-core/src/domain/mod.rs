//! Domain layer: the two interfaces the bridge sits between.
//!
//! Nothing here knows about driver tables, threads, or locking.  The bridge
//! implementation lives in the `nfc-hal` crate.

/// The remote interface and the client notification interface.
pub mod interface;
