//! WebSocket implementation of the push port.
//!
//! # Connection lifecycle
//!
//! 1. `connect(topic)` opens the socket and sends a subscribe frame
//! 2. `next_event()` reads frames until a delta or heartbeat arrives
//! 3. A close frame or socket error is reported as
//!    [`PushEvent::Disconnected`]; the owner decides when to reconnect

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use super::message::{PushMessage, SubscribeMessage};
use crate::domain::Topic;
use crate::error::ConnectionError;
use crate::port::{PushEvent, PushStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push feed over a WebSocket.
pub struct WebSocketPushStream {
    url: String,
    ws: Option<Socket>,
}

impl WebSocketPushStream {
    #[must_use]
    pub const fn new(url: String) -> Self {
        Self { url, ws: None }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.ws.is_some()
    }

    fn disconnected(&mut self, reason: String) -> Option<PushEvent> {
        self.ws = None;
        Some(PushEvent::Disconnected { reason })
    }
}

#[async_trait]
impl PushStream for WebSocketPushStream {
    async fn connect(&mut self, topic: &Topic) -> Result<(), ConnectionError> {
        if let Some(mut old) = self.ws.take() {
            let _ = old.close(None).await;
        }

        info!(url = %self.url, topic = %topic, "Connecting to push feed");
        let (mut ws, response) = connect_async(self.url.as_str()).await?;
        debug!(status = %response.status(), "WebSocket connected");

        let topic_name = topic.to_string();
        let json = serde_json::to_string(&SubscribeMessage::new(&topic_name))?;
        ws.send(Message::Text(json)).await?;
        info!(topic = %topic, "Subscribed to push feed");

        self.ws = Some(ws);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<PushEvent> {
        loop {
            let ws = self.ws.as_mut()?;
            let Some(frame) = ws.next().await else {
                self.ws = None;
                return None;
            };

            match frame {
                Ok(Message::Text(text)) => {
                    trace!(bytes = text.len(), "Received push frame");
                    match serde_json::from_str::<PushMessage>(&text) {
                        Ok(message) => {
                            if let Some(event) = message.into_event() {
                                return Some(event);
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, bytes = text.len(), "Failed to parse push message");
                        }
                    }
                }
                Ok(Message::Ping(data)) => {
                    trace!("Received WebSocket ping");
                    if ws.send(Message::Pong(data)).await.is_err() {
                        return self.disconnected("failed to send pong".into());
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(frame = ?frame, "Push feed closed by server");
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    return self.disconnected(reason);
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "WebSocket error");
                    return self.disconnected(e.to_string());
                }
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "websocket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn next_event_without_connection_is_none() {
        let mut stream = WebSocketPushStream::new("ws://127.0.0.1:9/ws".into());
        assert!(!stream.is_connected());
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn subscribes_then_relays_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            let subscribe = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text(r#"{"type":"heartbeat"}"#.into())).await.unwrap();
            ws.send(Message::Text("not json".into())).await.unwrap();
            ws.send(Message::Text(
                r#"{"type":"odds_delta","game_id":"g1","bookmaker_key":"dk","market":"h2h","outcomes":[{"name":"Lakers","price":120}]}"#.into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
            subscribe.into_text().unwrap()
        });

        let mut stream = WebSocketPushStream::new(format!("ws://{addr}/ws/odds"));
        stream.connect(&Topic::sport("basketball_nba")).await.unwrap();
        assert!(stream.is_connected());

        assert_eq!(stream.next_event().await, Some(PushEvent::Heartbeat));
        match stream.next_event().await {
            Some(PushEvent::Delta(delta)) => assert_eq!(delta.outcomes[0].price, 120),
            other => panic!("expected delta, got {other:?}"),
        }
        assert!(matches!(
            stream.next_event().await,
            Some(PushEvent::Disconnected { .. })
        ));
        assert!(!stream.is_connected());

        let subscribe = server.await.unwrap();
        assert_eq!(subscribe, r#"{"type":"subscribe","topic":"basketball_nba"}"#);
    }
}
