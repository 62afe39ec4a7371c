//! Climate-dashboard firmware.
//!
//! Runs its own access point, samples the DHT11 every couple of seconds and
//! serves readings plus an LED toggle on port 80.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use esp_idf_svc::{
    eventloop::EspSystemEventLoop, hal::prelude::Peripherals, log::EspLogger,
    nvs::EspDefaultNvsPartition,
};
use log::{error, info};
use switchboard_core::{ClimateConfig, ClimateDevice, RadioDriver};
use switchboard_esp32::{
    dht::Dht11Sensor, gpio::BoardPins, http::start_climate_server, wifi::EspRadio,
};

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let config = ClimateConfig::default();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut radio = EspRadio::new(peripherals.modem, sysloop, Some(nvs))?;
    let ap_ip = radio.start_access_point(&config.access_point.ssid, &config.access_point.password)?;
    info!("access point '{}' up at {}", config.access_point.ssid, ap_ip);

    let mut pins = BoardPins::new(peripherals.pins);
    let sensor = Dht11Sensor::new(pins.take(config.sensor_pin)?)?;
    let lines = pins.take_outputs([config.led_pin])?;

    let device = Arc::new(Mutex::new(ClimateDevice::new(
        &config,
        Box::new(sensor),
        Box::new(lines),
    )?));
    let _server = start_climate_server(device.clone(), config.http_port)?;

    loop {
        match device.lock() {
            Ok(mut device) => device.tick(Instant::now()),
            Err(_) => error!("climate device state poisoned"),
        }
        thread::sleep(Duration::from_millis(100));
    }
}
