//! DHT11 temperature and humidity sensor.

use dht_sensor::dht11;
use esp_idf_hal::{
    delay::Ets,
    gpio::{AnyIOPin, InputOutput, PinDriver, Pull},
};
use switchboard_core::{ClimateReading, ClimateSensor, SensorError};

pub struct Dht11Sensor {
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
    delay: Ets,
}

impl Dht11Sensor {
    /// Open-drain data line with the internal pull-up, idle high.
    pub fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_pull(Pull::Up)?;
        pin.set_high()?;
        Ok(Self { pin, delay: Ets })
    }
}

impl ClimateSensor for Dht11Sensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.pin
            .set_high()
            .map_err(|e| SensorError::Read(format!("line not released: {e}")))?;

        let reading = dht11::blocking::read(&mut self.delay, &mut self.pin)
            .map_err(|e| SensorError::Read(format!("{e:?}")))?;

        Ok(ClimateReading {
            temperature: f32::from(reading.temperature),
            humidity: f32::from(reading.relative_humidity),
        })
    }
}
