use crate::commands::timer::Release;
use crate::transport::TransportEvent;

/// Everything the dispatch loop reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Transport(TransportEvent),
    Release(Release),
    Shutdown,
}

impl AgentEvent {
    pub fn frame(text: impl Into<String>) -> Self {
        AgentEvent::Transport(TransportEvent::Frame(text.into()))
    }
}

impl From<TransportEvent> for AgentEvent {
    fn from(event: TransportEvent) -> Self {
        AgentEvent::Transport(event)
    }
}
