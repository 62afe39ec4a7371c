//! Climate dashboard: periodic temperature/humidity sampling and the LED
//! indicator.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::lights::{LineError, OutputLines, PinId};

/// One temperature (°C) and relative humidity (%) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateReading {
    pub temperature: f32,
    pub humidity: f32,
}

impl ClimateReading {
    fn is_valid(&self) -> bool {
        !self.temperature.is_nan() && !self.humidity.is_nan()
    }
}

impl Default for ClimateReading {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            humidity: 0.0,
        }
    }
}

/// Errors reported by a climate sensor.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The bus transaction failed (timeout, checksum).
    #[error("Sensor read failed: {0}")]
    Read(String),

    /// The sensor answered but one of the values is not a number.
    #[error("Sensor returned NaN")]
    NotANumber,
}

/// Temperature/humidity sensor (DHT11 on the board).
pub trait ClimateSensor: Send {
    fn read(&mut self) -> Result<ClimateReading, SensorError>;
}

/// Samples the sensor no more often than the configured interval and keeps
/// the last good reading.
pub struct ClimateMonitor {
    sensor: Box<dyn ClimateSensor>,
    interval: Duration,
    last_sample: Option<Instant>,
    reading: ClimateReading,
}

impl ClimateMonitor {
    pub fn new(sensor: Box<dyn ClimateSensor>, interval: Duration) -> Self {
        Self {
            sensor,
            interval,
            last_sample: None,
            reading: ClimateReading::default(),
        }
    }

    /// Sample if the interval has passed since the previous attempt.
    ///
    /// The first call always samples. Returns whether a read was attempted.
    pub fn sample_if_due(&mut self, now: Instant) -> bool {
        let due = self
            .last_sample
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last_sample = Some(now);
            self.sample();
        }
        due
    }

    /// Read the sensor now. Failures keep the previous values.
    pub fn sample(&mut self) {
        let result = self.sensor.read().and_then(|reading| {
            if reading.is_valid() {
                Ok(reading)
            } else {
                Err(SensorError::NotANumber)
            }
        });

        match result {
            Ok(reading) => {
                debug!(
                    temperature = reading.temperature,
                    humidity = reading.humidity,
                    "climate sample"
                );
                self.reading = reading;
            }
            Err(err) => warn!(%err, "failed to read climate sensor, keeping previous values"),
        }
    }

    /// Last good reading (zeros until the first success).
    pub fn reading(&self) -> ClimateReading {
        self.reading
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl fmt::Debug for ClimateMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClimateMonitor")
            .field("interval", &self.interval)
            .field("reading", &self.reading)
            .finish_non_exhaustive()
    }
}

/// Single LED on one output line.
pub struct Indicator {
    pin: PinId,
    on: bool,
    lines: Box<dyn OutputLines>,
}

impl Indicator {
    /// Drive the LED off and take ownership of its line.
    pub fn new(pin: PinId, mut lines: Box<dyn OutputLines>) -> Result<Self, LineError> {
        lines.set_level(pin, false)?;
        Ok(Self {
            pin,
            on: false,
            lines,
        })
    }

    /// Flip the LED; the state only changes if the line accepted the level.
    pub fn toggle(&mut self) -> Result<bool, LineError> {
        let next = !self.on;
        self.lines.set_level(self.pin, next)?;
        self.on = next;
        Ok(next)
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// `ON` or `OFF`.
    pub fn label(&self) -> &'static str {
        if self.on {
            "ON"
        } else {
            "OFF"
        }
    }
}

impl fmt::Debug for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indicator")
            .field("pin", &self.pin)
            .field("on", &self.on)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedLines;
    use std::collections::VecDeque;

    struct ScriptedSensor {
        script: VecDeque<Result<ClimateReading, SensorError>>,
    }

    impl ScriptedSensor {
        fn new(script: Vec<Result<ClimateReading, SensorError>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    impl ClimateSensor for ScriptedSensor {
        fn read(&mut self) -> Result<ClimateReading, SensorError> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(SensorError::Read("script exhausted".to_string())))
        }
    }

    fn reading(temperature: f32, humidity: f32) -> ClimateReading {
        ClimateReading {
            temperature,
            humidity,
        }
    }

    #[test]
    fn test_nan_keeps_previous_values() {
        let sensor = ScriptedSensor::new(vec![
            Ok(reading(21.0, 40.0)),
            Ok(reading(f32::NAN, 41.0)),
            Ok(reading(22.0, f32::NAN)),
        ]);
        let mut monitor = ClimateMonitor::new(Box::new(sensor), Duration::from_secs(2));

        monitor.sample();
        monitor.sample();
        monitor.sample();

        assert_eq!(monitor.reading(), reading(21.0, 40.0));
    }

    #[test]
    fn test_read_error_keeps_previous_values() {
        let sensor = ScriptedSensor::new(vec![
            Ok(reading(19.0, 55.0)),
            Err(SensorError::Read("timeout".to_string())),
        ]);
        let mut monitor = ClimateMonitor::new(Box::new(sensor), Duration::from_secs(2));

        monitor.sample();
        monitor.sample();

        assert_eq!(monitor.reading(), reading(19.0, 55.0));
    }

    #[test]
    fn test_starts_at_zero() {
        let monitor = ClimateMonitor::new(
            Box::new(ScriptedSensor::new(Vec::new())),
            Duration::from_secs(2),
        );

        assert_eq!(monitor.reading(), reading(0.0, 0.0));
    }

    #[test]
    fn test_sampling_respects_interval() {
        let sensor = ScriptedSensor::new(vec![
            Ok(reading(20.0, 50.0)),
            Ok(reading(23.0, 48.0)),
        ]);
        let mut monitor = ClimateMonitor::new(Box::new(sensor), Duration::from_secs(2));
        let t0 = Instant::now();

        assert!(monitor.sample_if_due(t0));
        assert!(!monitor.sample_if_due(t0 + Duration::from_millis(1999)));
        assert_eq!(monitor.reading(), reading(20.0, 50.0));

        assert!(monitor.sample_if_due(t0 + Duration::from_secs(2)));
        assert_eq!(monitor.reading(), reading(23.0, 48.0));
    }

    #[test]
    fn test_indicator_toggle_drives_pin() {
        let lines = SimulatedLines::new();
        let mut led = Indicator::new(PinId(2), Box::new(lines.clone())).unwrap();
        assert_eq!(led.label(), "OFF");
        assert_eq!(lines.level(PinId(2)), Some(false));

        assert!(led.toggle().unwrap());
        assert_eq!(led.label(), "ON");
        assert_eq!(lines.level(PinId(2)), Some(true));

        assert!(!led.toggle().unwrap());
        assert_eq!(led.label(), "OFF");
    }

    #[test]
    fn test_reading_json_shape() {
        let json = serde_json::to_value(reading(23.5, 41.0)).unwrap();

        assert_eq!(json, serde_json::json!({ "temperature": 23.5, "humidity": 41.0 }));
    }
}
