//! Compiled-in device configuration.
//!
//! Both firmware programs boot from these defaults. The host simulator can
//! override any field from a JSON file; missing fields keep their defaults.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::lights::{PinId, MAX_LIGHTS};

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),

    /// The configuration file is not valid JSON for this schema.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Values parsed but make no sense together.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Credentials of the device's own access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointConfig {
    pub ssid: String,
    pub password: String,
}

/// One entry of the light table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSpec {
    pub name: String,
    pub pin: PinId,
}

impl LightSpec {
    pub fn new(name: &str, pin: u8) -> Self {
        Self {
            name: name.to_string(),
            pin: PinId(pin),
        }
    }
}

/// Network bring-up settings for the relay-lights firmware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvisioningConfig {
    /// Management access point; always running.
    pub access_point: AccessPointConfig,

    /// Hostname advertised when no device name was ever saved.
    pub fallback_device_name: String,

    /// Wall-clock budget for one station join attempt.
    pub join_timeout_ms: u64,

    /// Interval between join status polls.
    pub join_poll_interval_ms: u64,

    /// HTTP port, also announced in the `_http._tcp` service record.
    pub http_port: u16,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            access_point: AccessPointConfig {
                ssid: "ESP32_Lights".to_string(),
                password: "12345678".to_string(),
            },
            fallback_device_name: "esp32-lights".to_string(),
            join_timeout_ms: 12_000,
            join_poll_interval_ms: 500,
            http_port: 80,
        }
    }
}

impl ProvisioningConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Never zero, so a join loop always makes progress.
    pub fn join_poll_interval(&self) -> Duration {
        Duration::from_millis(self.join_poll_interval_ms.max(1))
    }
}

/// Overlay `patch` onto `base`. Objects merge key by key; anything else,
/// arrays included, replaces the base value.
fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

/// Parse `overrides` on top of `T::default()`, at any nesting depth.
fn with_defaults<T>(overrides: Value) -> Result<T, ConfigError>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(T::default())?;
    if !overrides.is_null() {
        merge(&mut value, overrides);
    }
    Ok(serde_json::from_value(value)?)
}

/// Relay-lights firmware configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub provisioning: ProvisioningConfig,
    pub lights: Vec<LightSpec>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            provisioning: ProvisioningConfig::default(),
            lights: vec![
                LightSpec::new("kitchen", 23),
                LightSpec::new("bedroom", 22),
                LightSpec::new("living", 21),
                LightSpec::new("bathroom", 19),
                LightSpec::new("porch", 18),
            ],
        }
    }
}

impl RelayConfig {
    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Like [`RelayConfig::from_json`] for an already parsed document.
    /// `null` yields the defaults.
    pub fn from_value(overrides: Value) -> Result<Self, ConfigError> {
        let config: Self = with_defaults(overrides)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Check values that would break the join loop or the light table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.provisioning;
        if p.join_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "joinPollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if p.join_timeout_ms < p.join_poll_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "joinTimeoutMs ({}) is shorter than one poll interval ({})",
                p.join_timeout_ms, p.join_poll_interval_ms
            )));
        }
        if p.fallback_device_name.is_empty() {
            return Err(ConfigError::Invalid(
                "fallbackDeviceName must not be empty".to_string(),
            ));
        }
        if self.lights.len() > MAX_LIGHTS {
            return Err(ConfigError::Invalid(format!(
                "{} lights configured, the board has {MAX_LIGHTS} relays",
                self.lights.len()
            )));
        }
        Ok(())
    }
}

const MIN_SENSOR_INTERVAL_MS: u64 = 1_000;

/// Climate-dashboard firmware configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClimateConfig {
    pub access_point: AccessPointConfig,

    /// Minimum spacing between sensor reads (DHT11 needs about 2 s).
    pub sensor_interval_ms: u64,

    /// DHT11 data line.
    pub sensor_pin: PinId,

    /// On-board LED.
    pub led_pin: PinId,

    pub http_port: u16,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            access_point: AccessPointConfig {
                ssid: "ESP32_Dashboard".to_string(),
                password: "12345678".to_string(),
            },
            sensor_interval_ms: 2_000,
            sensor_pin: PinId(4),
            led_pin: PinId(2),
            http_port: 80,
        }
    }
}

impl ClimateConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(overrides: Value) -> Result<Self, ConfigError> {
        let config: Self = with_defaults(overrides)?;
        config.validate()?;
        Ok(config)
    }

    /// The DHT11 cannot be read faster than once a second, and the LED
    /// needs its own line.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor_interval_ms < MIN_SENSOR_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "sensorIntervalMs ({}) is below the sensor minimum of {MIN_SENSOR_INTERVAL_MS}",
                self.sensor_interval_ms
            )));
        }
        if self.sensor_pin == self.led_pin {
            return Err(ConfigError::Invalid(format!(
                "sensorPin and ledPin are both {}",
                self.led_pin
            )));
        }
        Ok(())
    }

    pub fn sensor_interval(&self) -> Duration {
        Duration::from_millis(self.sensor_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();

        assert_eq!(config.provisioning.join_timeout(), Duration::from_secs(12));
        assert_eq!(config.provisioning.join_poll_interval(), Duration::from_millis(500));
        assert_eq!(config.lights.len(), MAX_LIGHTS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "provisioning": { "fallbackDeviceName": "garden", "httpPort": 8080 },
            "lights": [ { "name": "shed", "pin": 5 } ]
        }"#;

        let config = RelayConfig::from_json(json).unwrap();

        assert_eq!(config.provisioning.fallback_device_name, "garden");
        assert_eq!(config.provisioning.http_port, 8080);
        assert_eq!(config.provisioning.join_timeout_ms, 12_000);
        assert_eq!(config.provisioning.access_point.ssid, "ESP32_Lights");
        assert_eq!(config.lights, vec![LightSpec::new("shed", 5)]);
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let json = r#"{ "provisioning": { "joinPollIntervalMs": 0 } }"#;

        assert!(matches!(
            RelayConfig::from_json(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_budget_shorter_than_poll() {
        let json = r#"{ "provisioning": { "joinTimeoutMs": 100, "joinPollIntervalMs": 500 } }"#;

        assert!(matches!(
            RelayConfig::from_json(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_partial_access_point_keeps_ssid() {
        let json = r#"{ "provisioning": { "accessPoint": { "password": "letmein1" } } }"#;

        let config = RelayConfig::from_json(json).unwrap();

        assert_eq!(config.provisioning.access_point.ssid, "ESP32_Lights");
        assert_eq!(config.provisioning.access_point.password, "letmein1");
    }

    #[test]
    fn test_null_document_is_default() {
        assert_eq!(RelayConfig::from_value(Value::Null).unwrap(), RelayConfig::default());
        assert_eq!(ClimateConfig::from_value(Value::Null).unwrap(), ClimateConfig::default());
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = ProvisioningConfig {
            join_poll_interval_ms: 0,
            ..ProvisioningConfig::default()
        };

        assert_eq!(config.join_poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_climate_partial_override() {
        let json = r#"{ "accessPoint": { "ssid": "Greenhouse" }, "sensorIntervalMs": 5000 }"#;

        let config = ClimateConfig::from_json(json).unwrap();

        assert_eq!(config.access_point.ssid, "Greenhouse");
        assert_eq!(config.access_point.password, "12345678");
        assert_eq!(config.sensor_interval(), Duration::from_secs(5));
        assert_eq!(config.led_pin, PinId(2));
    }

    #[test]
    fn test_climate_rejects_fast_sampling() {
        assert!(matches!(
            ClimateConfig::from_json(r#"{ "sensorIntervalMs": 200 }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_climate_rejects_shared_pin() {
        assert!(matches!(
            ClimateConfig::from_json(r#"{ "sensorPin": 2 }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_climate_defaults_match_board() {
        let config = ClimateConfig::default();

        assert_eq!(config.access_point.ssid, "ESP32_Dashboard");
        assert_eq!(config.sensor_pin, PinId(4));
        assert_eq!(config.led_pin, PinId(2));
        assert_eq!(config.sensor_interval(), Duration::from_secs(2));
    }
}
