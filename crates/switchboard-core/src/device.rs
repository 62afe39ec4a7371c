//! Device state owned by each firmware program.
//!
//! One instance is created at boot and lives until power loss. Handlers get
//! it by reference; nothing here is global.

use std::time::Instant;

use crate::climate::{ClimateMonitor, ClimateSensor, Indicator};
use crate::config::{ClimateConfig, RelayConfig};
use crate::lights::{LightError, LightRegistry, LineError, OutputLines};
use crate::provisioning::{
    JoinOutcome, ProvisioningController, ProvisioningDrivers, ProvisioningError,
};

/// Relay-lights firmware state.
#[derive(Debug)]
pub struct RelayDevice {
    pub lights: LightRegistry,
    pub provisioning: ProvisioningController,
}

impl RelayDevice {
    /// Build the light table and the provisioning controller.
    ///
    /// Nothing touches the radio until [`RelayDevice::bootstrap`].
    pub fn new(
        config: &RelayConfig,
        lines: Box<dyn OutputLines>,
        drivers: ProvisioningDrivers,
    ) -> Result<Self, LightError> {
        Ok(Self {
            lights: LightRegistry::new(&config.lights, lines)?,
            provisioning: ProvisioningController::new(config.provisioning.clone(), drivers),
        })
    }

    pub fn bootstrap(&mut self) -> Result<JoinOutcome, ProvisioningError> {
        self.provisioning.bootstrap()
    }
}

/// Climate-dashboard firmware state.
#[derive(Debug)]
pub struct ClimateDevice {
    pub monitor: ClimateMonitor,
    pub led: Indicator,
}

impl ClimateDevice {
    pub fn new(
        config: &ClimateConfig,
        sensor: Box<dyn ClimateSensor>,
        lines: Box<dyn OutputLines>,
    ) -> Result<Self, LineError> {
        Ok(Self {
            monitor: ClimateMonitor::new(sensor, config.sensor_interval()),
            led: Indicator::new(config.led_pin, lines)?,
        })
    }

    /// Background work for one pass of the main loop.
    pub fn tick(&mut self, now: Instant) {
        self.monitor.sample_if_due(now);
    }
}
