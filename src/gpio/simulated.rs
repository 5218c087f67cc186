use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::info;

use super::{Level, PinActuator};

/// One recorded line write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub line: u8,
    pub level: Level,
    pub at: Instant,
}

/// Shared view of every write a [`SimulatedActuator`] has performed.
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    inner: Arc<Mutex<Vec<PinWrite>>>,
}

impl WriteLog {
    fn lock(&self) -> MutexGuard<'_, Vec<PinWrite>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    fn push(&self, write: PinWrite) {
        self.lock().push(write);
    }

    pub fn writes(&self) -> Vec<PinWrite> {
        self.lock().clone()
    }

    pub fn writes_for(&self, line: u8) -> Vec<PinWrite> {
        self.lock().iter().filter(|w| w.line == line).copied().collect()
    }

    pub fn levels_for(&self, line: u8) -> Vec<Level> {
        self.writes_for(line).into_iter().map(|w| w.level).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// In-memory actuator for hosts without a GPIO header and for tests.
/// Rejects writes to lines that were not declared, like real hardware would.
#[derive(Debug, Default)]
pub struct SimulatedActuator {
    declared: HashMap<u8, Level>,
    log: WriteLog,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the write history; stays valid after the actuator is moved.
    pub fn log(&self) -> WriteLog {
        self.log.clone()
    }

    pub fn declared_lines(&self) -> Vec<u8> {
        self.declared.keys().copied().collect()
    }

    pub fn level(&self, line: u8) -> Option<Level> {
        self.declared.get(&line).copied()
    }
}

impl PinActuator for SimulatedActuator {
    fn reset(&mut self) -> Result<()> {
        self.declared.clear();
        Ok(())
    }

    fn declare_output(&mut self, line: u8) -> Result<()> {
        self.declared.insert(line, Level::Low);
        Ok(())
    }

    fn write(&mut self, line: u8, level: Level) -> Result<()> {
        let Some(current) = self.declared.get_mut(&line) else {
            bail!("line {line} was not declared as an output");
        };
        *current = level;
        self.log.push(PinWrite {
            line,
            level,
            at: Instant::now(),
        });
        info!(target: "gpio", line, %level, "simulated write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_before_declare_fails() {
        let mut actuator = SimulatedActuator::new();
        let err = actuator.write(19, Level::High).unwrap_err();
        assert!(err.to_string().contains("not declared"));
        assert!(actuator.log().is_empty());
    }

    #[test]
    fn writes_are_recorded_in_order() {
        let mut actuator = SimulatedActuator::new();
        actuator.declare_output(19).unwrap();
        actuator.declare_output(16).unwrap();
        actuator.write(19, Level::High).unwrap();
        actuator.write(16, Level::High).unwrap();
        actuator.write(19, Level::Low).unwrap();

        let log = actuator.log();
        assert_eq!(log.len(), 3);
        assert_eq!(log.levels_for(19), vec![Level::High, Level::Low]);
        assert_eq!(log.levels_for(16), vec![Level::High]);
        assert_eq!(actuator.level(19), Some(Level::Low));
        assert_eq!(actuator.level(16), Some(Level::High));
    }

    #[test]
    fn reset_forgets_declarations() {
        let mut actuator = SimulatedActuator::new();
        actuator.declare_output(18).unwrap();
        actuator.reset().unwrap();
        assert!(actuator.declared_lines().is_empty());
        assert!(actuator.write(18, Level::High).is_err());
    }
}
