//! Light registry.
//!
//! A fixed table of named relay outputs, built once at boot from the
//! compiled-in light table. Names are matched case-insensitively and the
//! table order is the order used everywhere the lights are listed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::LightSpec;

/// Number of relay channels on the board.
pub const MAX_LIGHTS: usize = 5;

/// Hardware output line (the GPIO number on ESP32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(pub u8);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// A hardware line could not be driven.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LineError(pub String);

/// Errors raised by the light registry.
#[derive(Debug, Error)]
pub enum LightError {
    /// No light with this name (case-insensitive).
    #[error("Unknown light: {0}")]
    NotFound(String),

    /// Two table entries share a name.
    #[error("Duplicate light name: {0}")]
    DuplicateName(String),

    /// Two table entries share an output line.
    #[error("{0} is assigned to more than one light")]
    DuplicatePin(PinId),

    /// The table has more entries than the board has relays.
    #[error("Too many lights: {0} (the board has {MAX_LIGHTS} relays)")]
    TooMany(usize),

    /// The output line refused the new level.
    #[error("Failed to drive {pin}: {source}")]
    Line {
        pin: PinId,
        #[source]
        source: LineError,
    },
}

/// Digital output lines the relays hang off.
pub trait OutputLines: Send {
    /// Drive `pin` high (`true`) or low (`false`).
    fn set_level(&mut self, pin: PinId, high: bool) -> Result<(), LineError>;
}

/// One named relay output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Light {
    name: String,
    pin: PinId,
    on: bool,
}

impl Light {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

/// Registry of all lights, in table order.
pub struct LightRegistry {
    lights: Vec<Light>,
    lines: Box<dyn OutputLines>,
}

impl LightRegistry {
    /// Build the registry and drive every line low.
    ///
    /// Rejects tables with more than [`MAX_LIGHTS`] entries, duplicate names
    /// (compared case-insensitively) or a pin used twice.
    pub fn new(table: &[LightSpec], mut lines: Box<dyn OutputLines>) -> Result<Self, LightError> {
        if table.len() > MAX_LIGHTS {
            return Err(LightError::TooMany(table.len()));
        }

        let mut lights: Vec<Light> = Vec::with_capacity(table.len());
        for spec in table {
            if lights.iter().any(|l| l.name.eq_ignore_ascii_case(&spec.name)) {
                return Err(LightError::DuplicateName(spec.name.clone()));
            }
            if lights.iter().any(|l| l.pin == spec.pin) {
                return Err(LightError::DuplicatePin(spec.pin));
            }

            lines
                .set_level(spec.pin, false)
                .map_err(|source| LightError::Line { pin: spec.pin, source })?;

            lights.push(Light {
                name: spec.name.clone(),
                pin: spec.pin,
                on: false,
            });
        }

        Ok(Self { lights, lines })
    }

    /// Light names in table order.
    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.lights.iter().map(|l| l.name.as_str())
    }

    /// All lights in table order.
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Current state of the named light.
    pub fn get(&self, name: &str) -> Result<bool, LightError> {
        self.lights
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(|l| l.on)
            .ok_or_else(|| LightError::NotFound(name.to_string()))
    }

    /// Flip the named light and drive its line to match.
    ///
    /// If the line cannot be driven the stored state is left as it was.
    pub fn toggle(&mut self, name: &str) -> Result<bool, LightError> {
        let light = self
            .lights
            .iter_mut()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| LightError::NotFound(name.to_string()))?;

        let pin = light.pin;
        let next = !light.on;
        self.lines
            .set_level(pin, next)
            .map_err(|source| LightError::Line { pin, source })?;
        light.on = next;

        debug!(light = %light.name, %pin, on = next, "light toggled");
        Ok(next)
    }
}

impl fmt::Debug for LightRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightRegistry")
            .field("lights", &self.lights)
            .finish_non_exhaustive()
    }
}
