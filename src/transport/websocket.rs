use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info};

use super::TransportEvent;
use crate::agent::events::AgentEvent;

async fn forward(events: &mpsc::Sender<AgentEvent>, event: TransportEvent) -> Result<()> {
    events
        .send(event.into())
        .await
        .map_err(|_| anyhow!("event queue closed"))
}

/// Open one connection to `ws_url` and forward its lifecycle and text frames
/// to the dispatch loop. There is no reconnect: when the connection ends a
/// `Closed` event is queued and this returns.
///
/// Only fails if the event queue has gone away.
pub async fn connect_and_stream(ws_url: &str, events: mpsc::Sender<AgentEvent>) -> Result<()> {
    info!(url = %ws_url, "connecting");
    let mut stream = match connect_async(ws_url).await {
        Ok((stream, response)) => {
            debug!(status = %response.status(), "handshake complete");
            stream
        }
        Err(e) => {
            forward(&events, TransportEvent::Error(format!("connect {ws_url}: {e}"))).await?;
            forward(&events, TransportEvent::Closed(None)).await?;
            return Ok(());
        }
    };
    forward(&events, TransportEvent::Opened).await?;

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                forward(&events, TransportEvent::Frame(text.to_string())).await?;
            }
            Ok(Message::Binary(data)) => {
                debug!(len = data.len(), "ignoring binary frame");
            }
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty());
                forward(&events, TransportEvent::Closed(reason)).await?;
                return Ok(());
            }
            // ping/pong are answered by tungstenite itself
            Ok(_) => {}
            Err(e) => {
                let severed = matches!(
                    e,
                    WsError::Io(_) | WsError::ConnectionClosed | WsError::AlreadyClosed
                );
                forward(&events, TransportEvent::Error(e.to_string())).await?;
                if severed {
                    break;
                }
            }
        }
    }

    forward(&events, TransportEvent::Closed(None)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unused_local_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn unreachable_server_reports_error_then_close() {
        let (tx, mut rx) = mpsc::channel(8);
        let url = unused_local_url();
        connect_and_stream(&url, tx).await.unwrap();

        match rx.recv().await.unwrap() {
            AgentEvent::Transport(TransportEvent::Error(msg)) => assert!(msg.contains(&url)),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            rx.recv().await.unwrap(),
            AgentEvent::Transport(TransportEvent::Closed(None))
        );
    }

    #[tokio::test]
    async fn closed_queue_is_an_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(connect_and_stream(&unused_local_url(), tx).await.is_err());
    }
}
