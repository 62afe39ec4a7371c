//! # switchboard-core
//!
//! Device logic shared by the relay-lights and climate-dashboard firmware.
//!
//! This crate provides:
//! - The light registry (named relay outputs)
//! - The provisioning controller (access point + station bring-up, credential
//!   persistence, bounded join, name advertisement)
//! - The climate monitor and LED indicator
//! - Framework-agnostic HTTP handler logic
//! - Simulated drivers for host builds and tests
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! making it usable on both Linux (tokio) and ESP32 (esp-idf) targets. All
//! hardware is reached through the driver traits ([`RadioDriver`],
//! [`CredentialStore`], [`NameAdvertiser`], [`OutputLines`],
//! [`ClimateSensor`], [`Clock`]).

pub mod climate;
pub mod config;
pub mod credentials;
pub mod device;
pub mod handlers;
pub mod lights;
pub mod pages;
pub mod provisioning;
pub mod simulated;
pub mod status;

pub use climate::{ClimateMonitor, ClimateReading, ClimateSensor, Indicator, SensorError};
pub use config::{ClimateConfig, ConfigError, LightSpec, ProvisioningConfig, RelayConfig};
pub use credentials::{CredentialStore, NetworkCredentials, StorageError};
pub use device::{ClimateDevice, RelayDevice};
pub use handlers::{
    respond, ClimateHandlers, DeviceError, RelayHandlers, Reply, SaveWifiForm, ToggleQuery,
};
pub use lights::{LightError, LightRegistry, LineError, OutputLines, PinId};
pub use provisioning::{
    AdvertiseError, Clock, JoinMode, JoinOutcome, JoinState, NameAdvertiser, ProvisioningController,
    ProvisioningDrivers, ProvisioningError, RadioDriver, RadioError, SystemClock,
};
pub use status::serialize_status;
