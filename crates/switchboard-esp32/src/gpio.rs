//! Digital lines for relays, the LED and the DHT11.
//!
//! Pins are handed out by GPIO number, so the boards are wired from the
//! configured tables instead of from hardcoded peripherals.

use anyhow::{anyhow, Result};
use esp_idf_hal::gpio::{AnyIOPin, IOPin, Output, PinDriver, Pins};
use switchboard_core::{LineError, OutputLines, PinId};

/// General-purpose GPIOs not tied up by flash, UART0 or PSRAM.
pub struct BoardPins {
    free: Vec<(PinId, AnyIOPin)>,
}

impl BoardPins {
    pub fn new(pins: Pins) -> Self {
        let free = vec![
            (PinId(0), pins.gpio0.downgrade()),
            (PinId(2), pins.gpio2.downgrade()),
            (PinId(4), pins.gpio4.downgrade()),
            (PinId(5), pins.gpio5.downgrade()),
            (PinId(12), pins.gpio12.downgrade()),
            (PinId(13), pins.gpio13.downgrade()),
            (PinId(14), pins.gpio14.downgrade()),
            (PinId(15), pins.gpio15.downgrade()),
            (PinId(18), pins.gpio18.downgrade()),
            (PinId(19), pins.gpio19.downgrade()),
            (PinId(21), pins.gpio21.downgrade()),
            (PinId(22), pins.gpio22.downgrade()),
            (PinId(23), pins.gpio23.downgrade()),
            (PinId(25), pins.gpio25.downgrade()),
            (PinId(26), pins.gpio26.downgrade()),
            (PinId(27), pins.gpio27.downgrade()),
            (PinId(32), pins.gpio32.downgrade()),
            (PinId(33), pins.gpio33.downgrade()),
        ];
        Self { free }
    }

    /// Take one pin. Each GPIO can be taken once.
    pub fn take(&mut self, id: PinId) -> Result<AnyIOPin> {
        let index = self
            .free
            .iter()
            .position(|(pin, _)| *pin == id)
            .ok_or_else(|| anyhow!("{id} is not a free general-purpose pin"))?;
        Ok(self.free.swap_remove(index).1)
    }

    /// Take every pin in `ids` as an output.
    pub fn take_outputs(&mut self, ids: impl IntoIterator<Item = PinId>) -> Result<GpioLines> {
        let pins = ids
            .into_iter()
            .map(|id| -> Result<_> { Ok((id, self.take(id)?)) })
            .collect::<Result<Vec<_>>>()?;
        GpioLines::new(pins)
    }
}

/// A fixed set of output pins, addressed by GPIO number.
pub struct GpioLines {
    pins: Vec<(PinId, PinDriver<'static, AnyIOPin, Output>)>,
}

impl GpioLines {
    /// Take ownership of `pins`. Levels are left for the caller to set.
    pub fn new(pins: impl IntoIterator<Item = (PinId, AnyIOPin)>) -> Result<Self> {
        let pins = pins
            .into_iter()
            .map(|(id, pin)| -> Result<_> { Ok((id, PinDriver::output(pin)?)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pins })
    }
}

impl OutputLines for GpioLines {
    fn set_level(&mut self, pin: PinId, high: bool) -> Result<(), LineError> {
        let (_, driver) = self
            .pins
            .iter_mut()
            .find(|(id, _)| *id == pin)
            .ok_or_else(|| LineError(format!("{pin} is not wired as an output")))?;

        let result = if high {
            driver.set_high()
        } else {
            driver.set_low()
        };
        result.map_err(|e| LineError(format!("{pin}: {e}")))
    }
}
