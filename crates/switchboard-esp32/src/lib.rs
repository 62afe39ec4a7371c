//! ESP32 drivers for the switchboard devices.
//!
//! This crate implements the driver traits from `switchboard-core` on top of
//! esp-idf-svc and registers the shared handler logic on `EspHttpServer`:
//! - [`wifi::EspRadio`]: access point plus station on one radio
//! - [`nvs::NvsCredentialStore`]: credentials in the `wifi` NVS namespace
//! - [`mdns::EspNameAdvertiser`]: `<name>.local` and `_http._tcp`
//! - [`gpio::GpioLines`]: relay and LED outputs
//! - [`dht::Dht11Sensor`]: temperature and humidity
//! - [`http`]: route registration for both programs
//!
//! # Example
//!
//! ```ignore
//! let radio = EspRadio::new(peripherals.modem, sysloop, Some(nvs.clone()))?;
//! let store = NvsCredentialStore::new(nvs)?;
//! let device = Arc::new(Mutex::new(RelayDevice::new(&config, lines, drivers)?));
//! let _server = http::start_relay_server(device, config.provisioning.http_port)?;
//! ```

pub mod dht;
pub mod gpio;
pub mod http;
pub mod mdns;
pub mod nvs;
pub mod wifi;
