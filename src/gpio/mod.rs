//! Output-line actuation.
//!
//! The dispatcher only ever talks to a [`PinActuator`]. On a Raspberry Pi the
//! `rpi` feature provides [`rpi::RpiActuator`] backed by `rppal`; everywhere else
//! (and in tests) the [`SimulatedActuator`] records writes in memory.

pub mod numbering;
pub mod pins;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod simulated;

use anyhow::{Context, Result};
use std::fmt;
use tracing::{debug, info};

pub use numbering::PinNumbering;
pub use pins::{PinMap, Target};
pub use simulated::{PinWrite, SimulatedActuator, WriteLog};

/// Logic level of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("low"),
            Level::High => f.write_str("high"),
        }
    }
}

/// Driver for the output lines. Lines are addressed by the identifier found in
/// the [`PinMap`]; translating that to a hardware number is the driver's job.
pub trait PinActuator: Send {
    /// Release every line claimed so far and return the header to its idle state.
    fn reset(&mut self) -> Result<()>;

    /// Claim `line` as an output, initially driven low.
    fn declare_output(&mut self, line: u8) -> Result<()>;

    /// Drive a previously declared line to `level`.
    fn write(&mut self, line: u8, level: Level) -> Result<()>;
}

impl<A: PinActuator + ?Sized> PinActuator for Box<A> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn declare_output(&mut self, line: u8) -> Result<()> {
        (**self).declare_output(line)
    }

    fn write(&mut self, line: u8, level: Level) -> Result<()> {
        (**self).write(line, level)
    }
}

/// Two-phase setup: global reset, then every mapped line declared as output.
/// Must succeed before the first write.
pub fn prepare_lines<A: PinActuator + ?Sized>(actuator: &mut A, pins: &PinMap) -> Result<()> {
    actuator.reset().context("resetting gpio")?;
    for (target, line) in pins.iter() {
        actuator
            .declare_output(line)
            .with_context(|| format!("declaring {target} (line {line}) as output"))?;
        debug!(%target, line, "line declared as output");
    }
    info!(
        blue = pins.blue,
        green = pins.green,
        buzzer = pins.buzzer,
        "output lines ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_lines_declares_every_target() {
        let mut actuator = SimulatedActuator::new();
        prepare_lines(&mut actuator, &PinMap::default()).unwrap();

        let mut declared = actuator.declared_lines();
        declared.sort_unstable();
        assert_eq!(declared, vec![16, 18, 19]);
        assert!(actuator.log().is_empty());
    }

    #[test]
    fn prepare_lines_resets_previous_claims() {
        let mut actuator = SimulatedActuator::new();
        actuator.declare_output(7).unwrap();
        prepare_lines(&mut actuator, &PinMap::default()).unwrap();

        assert!(!actuator.declared_lines().contains(&7));
    }

    #[test]
    fn boxed_actuator_forwards_calls() {
        let actuator = SimulatedActuator::new();
        let log = actuator.log();
        let mut boxed: Box<dyn PinActuator> = Box::new(actuator);

        prepare_lines(&mut boxed, &PinMap::default()).unwrap();
        boxed.write(19, Level::High).unwrap();

        assert_eq!(log.levels_for(19), vec![Level::High]);
    }
}
