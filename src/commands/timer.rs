use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::trace;

use crate::agent::events::AgentEvent;
use crate::gpio::Target;

/// What happens when a pin receives a new command while an earlier pulse is
/// still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// The newest command owns the pin: its release replaces any pending one.
    #[default]
    Latest,
    /// Every command keeps its own release; the earliest expiry turns the pin
    /// off even if a later command asked for longer.
    Independent,
}

/// Expiry notice for one scheduled release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub target: Target,
    pub generation: u64,
}

#[derive(Debug)]
struct Pending {
    target: Target,
    handle: JoinHandle<()>,
}

/// Deferred deassertions. Each timer runs as its own task and reports expiry
/// through the agent's event queue, so releases are handled by the same loop
/// that handles frames.
#[derive(Debug)]
pub struct ReleaseTimers {
    policy: OverlapPolicy,
    events: mpsc::Sender<AgentEvent>,
    next_generation: u64,
    pending: HashMap<u64, Pending>,
}

impl ReleaseTimers {
    pub fn new(policy: OverlapPolicy, events: mpsc::Sender<AgentEvent>) -> Self {
        Self {
            policy,
            events,
            next_generation: 0,
            pending: HashMap::new(),
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: OverlapPolicy) {
        self.policy = policy;
    }

    /// Arm a release for `target` after `after`; returns its generation.
    pub fn schedule(&mut self, target: Target, after: Duration) -> u64 {
        if self.policy == OverlapPolicy::Latest {
            self.cancel(target);
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.events.clone();
        let handle = tokio::spawn(async move {
            sleep(after).await;
            // A closed queue means the agent is shutting down.
            let _ = tx
                .send(AgentEvent::Release(Release { target, generation }))
                .await;
        });
        self.pending.insert(generation, Pending { target, handle });
        trace!(pin = %target, generation, after_ms = after.as_millis() as u64, "release armed");
        generation
    }

    /// Consume an expiry notice. Returns false for releases that were
    /// cancelled after their notice was already queued.
    pub fn expire(&mut self, release: Release) -> bool {
        self.pending.remove(&release.generation).is_some()
    }

    /// Abort every pending release for `target`; returns how many were dropped.
    pub fn cancel(&mut self, target: Target) -> usize {
        let before = self.pending.len();
        self.pending.retain(|generation, p| {
            if p.target == target {
                p.handle.abort();
                trace!(pin = %target, generation, "release cancelled");
                false
            } else {
                true
            }
        });
        before - self.pending.len()
    }

    pub fn cancel_all(&mut self) {
        for (_, p) in self.pending.drain() {
            p.handle.abort();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_for(&self, target: Target) -> usize {
        self.pending.values().filter(|p| p.target == target).count()
    }
}

impl Drop for ReleaseTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_of(event: AgentEvent) -> Release {
        match event {
            AgentEvent::Release(r) => r,
            other => panic!("expected release, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn releases_arrive_in_expiry_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = ReleaseTimers::new(OverlapPolicy::Independent, tx);

        let slow = timers.schedule(Target::BlueLed, Duration::from_millis(300));
        let fast = timers.schedule(Target::Buzzer, Duration::from_millis(100));
        assert_eq!(timers.pending(), 2);

        let first = release_of(rx.recv().await.unwrap());
        let second = release_of(rx.recv().await.unwrap());
        assert_eq!(first.generation, fast);
        assert_eq!(second.generation, slow);
        assert!(timers.expire(first));
        assert!(timers.expire(second));
        assert_eq!(timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_policy_replaces_pending_release() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = ReleaseTimers::new(OverlapPolicy::Latest, tx);

        timers.schedule(Target::GreenLed, Duration::from_millis(100));
        let second = timers.schedule(Target::GreenLed, Duration::from_millis(500));
        assert_eq!(timers.pending_for(Target::GreenLed), 1);

        let only = release_of(rx.recv().await.unwrap());
        assert_eq!(only.generation, second);
        assert!(timers.expire(only));
    }

    #[tokio::test(start_paused = true)]
    async fn independent_policy_keeps_every_release() {
        let (tx, _rx) = mpsc::channel(8);
        let mut timers = ReleaseTimers::new(OverlapPolicy::Independent, tx);

        timers.schedule(Target::GreenLed, Duration::from_millis(100));
        timers.schedule(Target::GreenLed, Duration::from_millis(500));
        assert_eq!(timers.pending_for(Target::GreenLed), 2);
        assert_eq!(timers.pending_for(Target::BlueLed), 0);
    }

    #[tokio::test]
    async fn queued_notice_of_cancelled_release_is_stale() {
        let (tx, _rx) = mpsc::channel(8);
        let mut timers = ReleaseTimers::new(OverlapPolicy::Latest, tx);

        let first = timers.schedule(Target::Buzzer, Duration::from_secs(60));
        timers.schedule(Target::Buzzer, Duration::from_secs(60));

        assert!(!timers.expire(Release {
            target: Target::Buzzer,
            generation: first,
        }));
    }

    #[tokio::test]
    async fn cancel_all_clears_everything() {
        let (tx, _rx) = mpsc::channel(8);
        let mut timers = ReleaseTimers::new(OverlapPolicy::Independent, tx);
        for target in Target::ALL {
            timers.schedule(target, Duration::from_secs(10));
        }
        assert_eq!(timers.cancel(Target::Buzzer), 1);
        timers.cancel_all();
        assert_eq!(timers.pending(), 0);
    }
}
