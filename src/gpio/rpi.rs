use anyhow::{Context, Result};
use rppal::gpio::{Gpio, OutputPin};
use std::collections::HashMap;
use tracing::{debug, trace};

use super::{Level, PinActuator, PinNumbering};

/// Drives the Raspberry Pi header through `rppal`.
pub struct RpiActuator {
    gpio: Gpio,
    numbering: PinNumbering,
    outputs: HashMap<u8, OutputPin>,
}

impl RpiActuator {
    pub fn new(numbering: PinNumbering) -> Result<Self> {
        let gpio = Gpio::new().context("opening gpio peripheral")?;
        Ok(Self {
            gpio,
            numbering,
            outputs: HashMap::new(),
        })
    }
}

impl PinActuator for RpiActuator {
    fn reset(&mut self) -> Result<()> {
        for pin in self.outputs.values_mut() {
            pin.set_low();
        }
        // Dropping an OutputPin restores its previous mode.
        self.outputs.clear();
        debug!("gpio reset");
        Ok(())
    }

    fn declare_output(&mut self, line: u8) -> Result<()> {
        let bcm = self.numbering.to_bcm(line)?;
        let pin = self
            .gpio
            .get(bcm)
            .with_context(|| format!("claiming GPIO{bcm} for line {line}"))?
            .into_output_low();
        self.outputs.insert(line, pin);
        debug!(line, bcm, "output claimed");
        Ok(())
    }

    fn write(&mut self, line: u8, level: Level) -> Result<()> {
        let pin = self
            .outputs
            .get_mut(&line)
            .with_context(|| format!("line {line} was not declared as an output"))?;
        match level {
            Level::High => pin.set_high(),
            Level::Low => pin.set_low(),
        }
        trace!(line, %level, "gpio write");
        Ok(())
    }
}
