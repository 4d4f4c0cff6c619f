//! WebSocket implementation of the connection ports.
//!
//! Binary payloads become binary frames and JSON payloads become text
//! frames.  The bridge never sends data back, so the read half only watches
//! for the close (pings are answered by tungstenite itself while reading).

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use aether_core::Payload;

use super::{Connection, Connector, FrameSink, FrameSource, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects with `tokio_tungstenite::connect_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|source| TransportError::Connect {
                url: url.to_string(),
                source,
            })?;
        let (sink, source) = stream.split();
        Ok(Connection {
            sink: Box::new(WsSink(sink)),
            source: Box::new(WsSource(source)),
        })
    }
}

struct WsSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        let message = match payload {
            Payload::Binary(bytes) => Message::Binary(bytes),
            Payload::Text(text) => Message::Text(text),
        };
        self.0.send(message).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.0.close().await {
            debug!("websocket close: {e}");
        }
    }
}

struct WsSource(SplitStream<WsStream>);

#[async_trait]
impl FrameSource for WsSource {
    async fn closed(&mut self) -> Option<TransportError> {
        while let Some(next) = self.0.next().await {
            match next {
                Ok(Message::Close(frame)) => {
                    debug!("bridge closed the connection: {frame:?}");
                    return None;
                }
                Ok(other) => debug!("ignoring {} byte frame from bridge", other.len()),
                Err(e) => return Some(e.into()),
            }
        }
        None
    }
}
