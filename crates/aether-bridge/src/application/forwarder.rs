//! Payload forwarding: one WebSocket payload in, at most one UDP datagram out.
//!
//! ```text
//! 0 messages  → nothing
//! 1 message   → plain OSC message
//! 2+ messages → OSC bundle, time tag "immediately"
//! ```
//!
//! Every payload is forwarded as soon as it arrives.  There is no queue, no
//! retry, and no acknowledgement: a lost datagram is simply superseded by the
//! next frame's values.

use std::sync::Arc;

use aether_core::{ControlMessage, OscError, OscPacket, Payload, PayloadError};
use async_trait::async_trait;
use thiserror::Error;
use tracing::trace;

/// Errors that can occur while forwarding one payload.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The payload was not a valid binary frame or JSON document.
    #[error("malformed payload: {0}")]
    Payload(#[from] PayloadError),

    /// A decoded message could not be expressed as OSC.
    #[error("OSC encoding failed: {0}")]
    Osc(#[from] OscError),

    /// The datagram could not be sent.
    #[error("UDP send failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for encoded OSC datagrams.
#[async_trait]
pub trait OscSink: Send + Sync {
    async fn send_datagram(&self, datagram: &[u8]) -> std::io::Result<()>;
}

/// Encodes a decoded batch as one OSC datagram, or `None` for an empty batch.
///
/// # Errors
///
/// Returns [`OscError::InvalidAddress`] if an address cannot be written as an
/// OSC string.
pub fn to_datagram(messages: Vec<ControlMessage>) -> Result<Option<Vec<u8>>, OscError> {
    OscPacket::for_batch(messages)
        .map(|packet| packet.encode())
        .transpose()
}

/// Decodes payloads and hands the resulting datagrams to an [`OscSink`].
pub struct Forwarder {
    sink: Arc<dyn OscSink>,
}

impl Forwarder {
    pub fn new(sink: Arc<dyn OscSink>) -> Self {
        Self { sink }
    }

    /// Forwards one payload.  Returns the number of control messages sent.
    ///
    /// # Errors
    ///
    /// See [`ForwardError`].  Nothing is sent when an error is returned.
    pub async fn forward(&self, payload: &Payload) -> Result<usize, ForwardError> {
        let messages = payload.decode()?;
        let count = messages.len();
        let Some(datagram) = to_datagram(messages)? else {
            trace!("empty payload; nothing to forward");
            return Ok(0);
        };
        self.sink.send_datagram(&datagram).await?;
        trace!("forwarded {count} message(s) in {} bytes", datagram.len());
        Ok(count)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use aether_core::{encode_frame, WireFormat};

    use super::*;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        datagrams: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl OscSink for RecordingSink {
        async fn send_datagram(&self, datagram: &[u8]) -> std::io::Result<()> {
            self.datagrams.lock().unwrap().push(datagram.to_vec());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl OscSink for FailingSink {
        async fn send_datagram(&self, _datagram: &[u8]) -> std::io::Result<()> {
            Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
        }
    }

    fn forwarder() -> (Forwarder, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (Forwarder::new(sink.clone()), sink)
    }

    fn fader(value: f32) -> ControlMessage {
        ControlMessage::new("/right/0/fader", value)
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_single_message_is_sent_as_plain_message() {
        // Arrange
        let (fwd, sink) = forwarder();
        let payload = Payload::Binary(encode_frame(&[fader(0.5)]).unwrap());

        // Act
        let sent = fwd.forward(&payload).await.unwrap();

        // Assert
        assert_eq!(sent, 1);
        let datagrams = sink.datagrams.lock().unwrap();
        assert_eq!(datagrams.len(), 1);
        assert_eq!(
            OscPacket::decode(&datagrams[0]).unwrap(),
            OscPacket::Message(fader(0.5))
        );
    }

    #[tokio::test]
    async fn test_several_messages_are_sent_as_one_bundle() {
        let (fwd, sink) = forwarder();
        let batch = vec![fader(0.5), ControlMessage::new("/left/6/trigger", 1.0)];
        let payload = Payload::Binary(encode_frame(&batch).unwrap());

        let sent = fwd.forward(&payload).await.unwrap();

        assert_eq!(sent, 2);
        let datagrams = sink.datagrams.lock().unwrap();
        assert_eq!(datagrams.len(), 1);
        assert!(datagrams[0].starts_with(b"#bundle\0"));
        assert_eq!(OscPacket::decode(&datagrams[0]).unwrap(), OscPacket::Bundle(batch));
    }

    #[tokio::test]
    async fn test_json_payload_is_forwarded() {
        let (fwd, sink) = forwarder();
        let payload = Payload::encode(&[fader(0.25)], WireFormat::Json).unwrap();

        fwd.forward(&payload).await.unwrap();

        let datagrams = sink.datagrams.lock().unwrap();
        assert_eq!(
            OscPacket::decode(&datagrams[0]).unwrap(),
            OscPacket::Message(fader(0.25))
        );
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let (fwd, sink) = forwarder();

        let sent = fwd.forward(&Payload::Text("[]".to_string())).await.unwrap();

        assert_eq!(sent, 0);
        assert!(sink.datagrams.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_an_error_and_sends_nothing() {
        let (fwd, sink) = forwarder();

        let result = fwd.forward(&Payload::Binary(vec![200, b'/', b'a'])).await;

        assert!(matches!(result, Err(ForwardError::Payload(_))));
        assert!(sink.datagrams.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_reported() {
        let fwd = Forwarder::new(Arc::new(FailingSink));
        let payload = Payload::Binary(encode_frame(&[fader(0.5)]).unwrap());

        let result = fwd.forward(&payload).await;

        assert!(matches!(result, Err(ForwardError::Io(_))));
    }

    #[test]
    fn test_to_datagram_empty_is_none() {
        assert_eq!(to_datagram(Vec::new()).unwrap(), None);
    }
}
