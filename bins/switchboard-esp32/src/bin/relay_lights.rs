//! Relay-lights firmware.
//!
//! Boots the management access point, joins the stored network if there is
//! one and serves the light dashboard and WiFi settings on port 80.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use esp_idf_svc::{
    eventloop::EspSystemEventLoop, hal::prelude::Peripherals, log::EspLogger,
    nvs::EspDefaultNvsPartition,
};
use log::info;
use switchboard_core::{ProvisioningDrivers, RelayConfig, RelayDevice, SystemClock};
use switchboard_esp32::{
    gpio::BoardPins, http::start_relay_server, mdns::EspNameAdvertiser,
    nvs::NvsCredentialStore, wifi::EspRadio,
};

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let config = RelayConfig::default();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut pins = BoardPins::new(peripherals.pins);
    let lines = pins.take_outputs(config.lights.iter().map(|light| light.pin))?;

    let drivers = ProvisioningDrivers {
        radio: Box::new(EspRadio::new(peripherals.modem, sysloop, Some(nvs.clone()))?),
        store: Box::new(NvsCredentialStore::new(nvs)?),
        advertiser: Box::new(EspNameAdvertiser::new()),
        clock: Box::new(SystemClock),
    };

    let mut device = RelayDevice::new(&config, Box::new(lines), drivers)?;
    let outcome = device.bootstrap()?;
    info!(
        "relay lights up, joined: {}, name: {}",
        outcome.is_joined(),
        device.provisioning.device_name()
    );

    let http_port = config.provisioning.http_port;
    let _server = start_relay_server(Arc::new(Mutex::new(device)), http_port)?;

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}
