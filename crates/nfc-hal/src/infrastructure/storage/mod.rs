//! Storage infrastructure: TOML configuration for the service binary.

pub mod config;

pub use config::{load_config, ConfigError, ControllerConfig, ControllerKind, HalConfig, ServiceConfig};
