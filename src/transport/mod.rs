pub mod websocket;

/// Connection lifecycle and payload notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Opened,
    /// One inbound text frame.
    Frame(String),
    /// Transport-level fault. Frames may or may not keep arriving.
    Error(String),
    /// The peer closed the connection or the stream ended.
    Closed(Option<String>),
}
