use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::agent::config::DEFAULT_MAX_DURATION_MS;
use crate::agent::events::AgentEvent;
use crate::commands::frame::{self, PulseCommand};
use crate::commands::timer::{OverlapPolicy, Release, ReleaseTimers};
use crate::gpio::{Level, PinActuator, PinMap, Target};
use crate::transport::TransportEvent;

/// Turns inbound frames into pulses on the output lines.
///
/// The dispatcher owns the actuator and every pin's level. All of its
/// handlers run from [`Dispatcher::run`], one event at a time.
pub struct Dispatcher<A: PinActuator> {
    actuator: A,
    pins: PinMap,
    max_duration: Duration,
    levels: HashMap<Target, Level>,
    timers: ReleaseTimers,
}

impl<A: PinActuator> Dispatcher<A> {
    /// `events` is the sending half of the queue this dispatcher will be run
    /// on; release timers report back through it. The actuator must already
    /// have its lines declared (see [`crate::gpio::prepare_lines`]).
    pub fn new(actuator: A, pins: PinMap, events: mpsc::Sender<AgentEvent>) -> Self {
        Self {
            actuator,
            pins,
            max_duration: Duration::from_millis(DEFAULT_MAX_DURATION_MS),
            levels: Target::ALL.into_iter().map(|t| (t, Level::Low)).collect(),
            timers: ReleaseTimers::new(OverlapPolicy::default(), events),
        }
    }

    pub fn with_policy(mut self, policy: OverlapPolicy) -> Self {
        self.timers.set_policy(policy);
        self
    }

    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = max;
        self
    }

    pub fn level(&self, target: Target) -> Level {
        self.levels.get(&target).copied().unwrap_or(Level::Low)
    }

    pub fn pending_releases(&self) -> usize {
        self.timers.pending()
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Consume events until a shutdown request, then release every line.
    pub async fn run(mut self, mut events: mpsc::Receiver<AgentEvent>) -> Result<()> {
        info!(policy = ?self.timers.policy(), "dispatcher started");
        while let Some(event) = events.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        self.shutdown()
    }

    /// Handle a single event. Returns false once the loop should stop.
    pub fn handle_event(&mut self, event: AgentEvent) -> bool {
        match event {
            AgentEvent::Transport(TransportEvent::Opened) => self.on_open(),
            AgentEvent::Transport(TransportEvent::Frame(text)) => self.on_message(&text),
            AgentEvent::Transport(TransportEvent::Error(err)) => self.on_error(&err),
            AgentEvent::Transport(TransportEvent::Closed(reason)) => self.on_close(reason.as_deref()),
            AgentEvent::Release(release) => self.on_release(release),
            AgentEvent::Shutdown => return false,
        }
        true
    }

    pub fn on_open(&mut self) {
        info!("Connected.");
    }

    pub fn on_error(&mut self, err: &str) {
        error!(error = %err, "transport error");
    }

    pub fn on_close(&mut self, reason: Option<&str>) {
        warn!(
            reason = reason.unwrap_or("none"),
            "connection closed, no further commands will arrive"
        );
    }

    pub fn on_message(&mut self, text: &str) {
        info!(frame = %text, "Received");
        self.handle_frame(text);
    }

    /// Parse one frame and start the pulse it asks for. Unknown frames are
    /// dropped; frames with a bad duration are rejected without touching a pin.
    pub fn handle_frame(&mut self, text: &str) {
        match frame::parse_frame(text, self.max_duration) {
            Ok(Some(cmd)) => self.pulse(cmd),
            Ok(None) => debug!(frame = %text, "no command prefix matched"),
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(frame = %text, error = %reason, "frame rejected");
            }
        }
    }

    fn pulse(&mut self, cmd: PulseCommand) {
        self.set_level(cmd.target, Level::High);
        let generation = self.timers.schedule(cmd.target, cmd.duration);
        debug!(
            pin = %cmd.target,
            duration_ms = cmd.duration.as_millis() as u64,
            generation,
            "pulse started"
        );
    }

    fn on_release(&mut self, release: Release) {
        if !self.timers.expire(release) {
            debug!(pin = %release.target, generation = release.generation, "stale release ignored");
            return;
        }
        self.set_level(release.target, Level::Low);
    }

    fn set_level(&mut self, target: Target, level: Level) {
        let line = self.pins.line(target);
        match self.actuator.write(line, level) {
            Ok(()) => {
                self.levels.insert(target, level);
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(pin = %target, line, %level, error = %reason, "pin write failed");
            }
        }
    }

    /// Cancel pending releases, drive every asserted line low and reset the
    /// actuator.
    pub fn shutdown(mut self) -> Result<()> {
        self.timers.cancel_all();
        for target in Target::ALL {
            if self.level(target).is_high() {
                self.set_level(target, Level::Low);
            }
        }
        self.actuator.reset().context("resetting gpio on shutdown")?;
        info!("dispatcher stopped, lines released");
        Ok(())
    }
}
