//! Service factory: resolves an instance name to a ready [`NfcBridge`].
//!
//! The factory asks a [`DeviceProvider`] for the controller behind the name
//! and binds a fresh bridge to it.  A provider failure (unknown name, null
//! table, incomplete table) becomes a [`FetchError`]; no bridge is created.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::application::bridge_service::NfcBridge;
use crate::infrastructure::device::loopback::{LoopbackController, LoopbackSettings};
use crate::infrastructure::device::{DeviceError, DeviceHandle};
use crate::infrastructure::storage::config::{ControllerConfig, ControllerKind};

/// Instance name used when the caller does not supply one.
pub const DEFAULT_INSTANCE: &str = "default";

/// Source of controller handles, keyed by instance name.
pub trait DeviceProvider: Send + Sync {
    fn open_device(&self, name: &str) -> Result<Arc<dyn DeviceHandle>, DeviceError>;
}

impl<F> DeviceProvider for F
where
    F: Fn(&str) -> Result<Arc<dyn DeviceHandle>, DeviceError> + Send + Sync,
{
    fn open_device(&self, name: &str) -> Result<Arc<dyn DeviceHandle>, DeviceError> {
        self(name)
    }
}

/// Errors returned by [`fetch_nfc`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("NFC controller '{name}' is unavailable: {source}")]
    DeviceUnavailable {
        name: String,
        #[source]
        source: DeviceError,
    },
}

/// Returns a bridge bound to the controller registered under `name`.
///
/// Each call yields an independent bridge with its own client registration.
///
/// # Errors
///
/// [`FetchError::DeviceUnavailable`] if the provider cannot open the
/// controller.
pub fn fetch_nfc(name: &str, provider: &dyn DeviceProvider) -> Result<Arc<NfcBridge>, FetchError> {
    let device = provider.open_device(name).map_err(|source| {
        error!(instance = name, "failed to open NFC controller: {source}");
        FetchError::DeviceUnavailable {
            name: name.to_string(),
            source,
        }
    })?;
    info!(instance = name, "NFC bridge created");
    Ok(Arc::new(NfcBridge::new(name, device)))
}

// ── Configured provider ───────────────────────────────────────────────────────

/// Serves exactly one instance name, backed by the configured controller.
#[derive(Debug, Clone)]
pub struct ConfiguredProvider {
    instance: String,
    controller: ControllerConfig,
}

impl ConfiguredProvider {
    pub fn new(instance: impl Into<String>, controller: ControllerConfig) -> Self {
        Self {
            instance: instance.into(),
            controller,
        }
    }
}

impl DeviceProvider for ConfiguredProvider {
    fn open_device(&self, name: &str) -> Result<Arc<dyn DeviceHandle>, DeviceError> {
        if name != self.instance {
            return Err(DeviceError::UnknownInstance(name.to_string()));
        }
        match self.controller.kind {
            ControllerKind::Loopback => Ok(Arc::new(LoopbackController::new(
                LoopbackSettings::from(&self.controller),
            ))),
        }
    }
}
