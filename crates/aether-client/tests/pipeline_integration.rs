//! End-to-end tests for the client: replay → pipeline → transport.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::{watch, RwLock};
use tokio_tungstenite::tungstenite::Message;

use aether_client::application::detection_loop::{
    LoopExit, Pipeline, PipelineConfig, PipelineError, RecognizerError,
};
use aether_client::application::stream_hands::{ControlTransport, HandStreamer, LiveValues};
use aether_client::infrastructure::network::{
    Connection, ConnectionStatus, Connector, FrameSink, FrameSource, TransportClient,
    TransportConfig, TransportError,
};
use aether_client::infrastructure::recognizer::ReplayRecognizer;
use aether_client::infrastructure::ticks::ScriptedTicks;
use aether_core::{
    decode_frame, ControlMessage, Gesture, GestureHandData, Hand, HandFrame, MappingDraft,
    MappingStore, Mode, Payload, StreamingConfig,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingTransport {
    batches: Mutex<Vec<Vec<ControlMessage>>>,
}

impl ControlTransport for RecordingTransport {
    fn connect(&self) {}
    fn disconnect(&self) {}
    fn send(&self, messages: &[ControlMessage]) -> bool {
        self.batches.lock().unwrap().push(messages.to_vec());
        true
    }
    fn is_connected(&self) -> bool {
        true
    }
    fn connection_generation(&self) -> u64 {
        1
    }
}

/// A connector whose every attempt is refused.
#[derive(Default)]
struct RefusingConnector {
    attempts: AtomicU32,
}

#[async_trait]
impl Connector for RefusingConnector {
    async fn connect(&self, _url: &str) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into())
    }
}

/// A connector whose sink holds every frame until the gate opens.
struct GatedConnector {
    gate: watch::Receiver<bool>,
    waiting: Arc<AtomicU32>,
    frames: Arc<Mutex<Vec<Payload>>>,
}

struct GatedSink {
    gate: watch::Receiver<bool>,
    waiting: Arc<AtomicU32>,
    frames: Arc<Mutex<Vec<Payload>>>,
}

struct OpenSource;

#[async_trait]
impl Connector for GatedConnector {
    async fn connect(&self, _url: &str) -> Result<Connection, TransportError> {
        Ok(Connection {
            sink: Box::new(GatedSink {
                gate: self.gate.clone(),
                waiting: Arc::clone(&self.waiting),
                frames: Arc::clone(&self.frames),
            }),
            source: Box::new(OpenSource),
        })
    }
}

#[async_trait]
impl FrameSink for GatedSink {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _ = self.gate.wait_for(|open| *open).await;
        self.frames.lock().unwrap().push(payload);
        Ok(())
    }

    async fn close(&mut self) {}
}

#[async_trait]
impl FrameSource for OpenSource {
    async fn closed(&mut self) -> Option<TransportError> {
        std::future::pending().await
    }
}

/// One recognition line with a single hand whose palm sits at height
/// `palm_y` (image coordinates) and is held upright.
fn hand_line(handedness: &str, gesture: &str, palm_y: f32) -> String {
    let side = if handedness == "Right" { -1.0 } else { 1.0 };
    let mut points = vec![serde_json::json!({"x": 0.5, "y": palm_y}); 21];
    points[0] = serde_json::json!({"x": 0.5, "y": palm_y + 0.1});
    points[9] = serde_json::json!({"x": 0.5, "y": palm_y - 0.1});
    points[5] = serde_json::json!({"x": 0.5 - side * 0.05, "y": palm_y});
    points[17] = serde_json::json!({"x": 0.5 + side * 0.05, "y": palm_y});
    serde_json::json!({
        "hands": [{
            "handedness": handedness,
            "gesture": gesture,
            "score": 0.95,
            "landmarks": points,
        }]
    })
    .to_string()
}

fn empty_line() -> String {
    r#"{"hands":[]}"#.to_string()
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..3000 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached in time");
}

// ── Pipeline over a replay ────────────────────────────────────────────────────

#[tokio::test]
async fn test_replay_drives_fader_and_switch_mappings() {
    // Arrange: a fader on the right palm and a switch on the left thumb.
    let mut store = MappingStore::new();
    let fader = store.add(MappingDraft::new(Hand::Right, Gesture::OpenPalm, Mode::Fader));
    store.add(MappingDraft::new(Hand::Left, Gesture::ThumbUp, Mode::Switch));
    let store = Arc::new(RwLock::new(store));

    // Palm centre at image y 0.6 → height 0.4 → fader 0.5; at 0.5 → 0.75.
    let recognizer = ReplayRecognizer::from_lines([
        hand_line("Right", "Open_Palm", 0.6),
        hand_line("Right", "Open_Palm", 0.6),
        hand_line("Right", "Open_Palm", 0.5),
        hand_line("Left", "Thumb_Up", 0.5),
        hand_line("Left", "Thumb_Up", 0.5),
        empty_line(),
        hand_line("Left", "Thumb_Up", 0.5),
    ]);
    let ticks = ScriptedTicks::evenly(Instant::now(), Duration::from_millis(16), 20);
    let transport = Arc::new(RecordingTransport::default());

    // Act
    let mut pipeline = Pipeline::start(
        Box::new(recognizer),
        Box::new(ticks),
        store,
        transport.clone(),
        PipelineConfig::default(),
    )
    .unwrap();
    let summary = pipeline.join().await.unwrap();

    // Assert
    assert_eq!(summary.exit, LoopExit::Finished);
    assert_eq!(summary.frames, 7);
    let batches = transport.batches.lock().unwrap().clone();
    assert_eq!(
        batches,
        vec![
            vec![ControlMessage::new("/right/0/fader", 0.5)],
            vec![ControlMessage::new("/right/0/fader", 0.75)],
            vec![ControlMessage::new("/left/4/switch", 1.0)],
            vec![ControlMessage::new("/left/4/switch", 0.0)],
        ]
    );
    // Live values are cleared when the loop ends on its own.
    assert!(pipeline.live_values().get(&fader).is_none());
}

#[tokio::test]
async fn test_bad_replay_lines_are_skipped() {
    let mut store = MappingStore::new();
    store.add(MappingDraft::new(Hand::Right, Gesture::Victory, Mode::Trigger));
    let recognizer = ReplayRecognizer::from_lines([
        "{ broken".to_string(),
        hand_line("Right", "Victory", 0.5),
    ]);
    let ticks = ScriptedTicks::evenly(Instant::now(), Duration::from_millis(16), 5);
    let transport = Arc::new(RecordingTransport::default());

    let mut pipeline = Pipeline::start(
        Box::new(recognizer),
        Box::new(ticks),
        Arc::new(RwLock::new(store)),
        transport.clone(),
        PipelineConfig::default(),
    )
    .unwrap();
    let summary = pipeline.join().await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.frames, 1);
    assert_eq!(
        *transport.batches.lock().unwrap(),
        vec![vec![ControlMessage::new("/right/3/trigger", 1.0)]]
    );
}

#[tokio::test]
async fn test_missing_replay_file_fails_start() {
    let transport = Arc::new(RecordingTransport::default());

    let result = Pipeline::start(
        Box::new(ReplayRecognizer::new("/nonexistent/aether/session.jsonl")),
        Box::new(ScriptedTicks::default()),
        Arc::new(RwLock::new(MappingStore::new())),
        transport,
        PipelineConfig::default(),
    );

    assert!(matches!(
        result,
        Err(PipelineError::Recognizer(RecognizerError::Initialization(_)))
    ));
}

// ── Transport reconnection ────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnect_gives_up_after_max_attempts() {
    // Arrange
    let connector = Arc::new(RefusingConnector::default());
    let config = TransportConfig {
        reconnect_interval: Duration::from_millis(1),
        max_reconnect_attempts: 5,
        ..Default::default()
    };
    let client = TransportClient::new(config, connector.clone());

    // Act
    client.connect();

    // Assert: one initial attempt plus five reconnects, then silence.
    eventually(|| connector.attempts.load(Ordering::SeqCst) == 6).await;
    eventually(|| client.snapshot().reconnect_attempts() == 5).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 6);
    assert_eq!(client.current_status(), ConnectionStatus::Disconnected);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_explicit_connect_after_giving_up_starts_over() {
    let connector = Arc::new(RefusingConnector::default());
    let config = TransportConfig {
        reconnect_interval: Duration::from_millis(1),
        max_reconnect_attempts: 1,
        ..Default::default()
    };
    let client = TransportClient::new(config, connector.clone());
    client.connect();
    eventually(|| connector.attempts.load(Ordering::SeqCst) == 2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    client.connect();

    eventually(|| connector.attempts.load(Ordering::SeqCst) == 3).await;
}

#[tokio::test]
async fn test_full_send_queue_does_not_strand_held_fader() {
    // Arrange: a one-frame queue in front of a sink that blocks.
    let (open_gate, gate) = watch::channel(false);
    let connector = Arc::new(GatedConnector {
        gate,
        waiting: Arc::new(AtomicU32::new(0)),
        frames: Arc::new(Mutex::new(Vec::new())),
    });
    let client = Arc::new(TransportClient::new(
        TransportConfig {
            send_queue: 1,
            ..Default::default()
        },
        connector.clone(),
    ));
    client.connect();
    eventually(|| client.is_connected()).await;

    let mut store = MappingStore::new();
    store.add(MappingDraft::new(Hand::Right, Gesture::OpenPalm, Mode::Fader));
    let mut streamer = HandStreamer::new(client.clone(), StreamingConfig::default(), LiveValues::new());
    let palm = |y| HandFrame {
        left: GestureHandData::idle(),
        right: GestureHandData::new(Gesture::OpenPalm, y, 0.5),
    };
    let now = Instant::now();

    // Act: 0.5 is stuck in the sink, 0.75 fills the queue, 1.0 is refused.
    assert_eq!(streamer.process_frame(&palm(0.5), &store, now), 1);
    eventually(|| connector.waiting.load(Ordering::SeqCst) == 1).await;
    assert_eq!(streamer.process_frame(&palm(0.75), &store, now), 1);
    assert_eq!(streamer.process_frame(&palm(1.0), &store, now), 0);
    assert_eq!(streamer.process_frame(&palm(1.0), &store, now), 0);

    open_gate.send(true).unwrap();
    let frames = Arc::clone(&connector.frames);
    eventually(|| frames.lock().unwrap().len() == 2).await;
    for _ in 0..3 {
        streamer.process_frame(&palm(1.0), &store, now);
    }
    eventually(|| frames.lock().unwrap().len() == 3).await;

    // Assert: the held value reaches the receiver exactly once.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let sent: Vec<Vec<ControlMessage>> = frames
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.decode().unwrap())
        .collect();
    assert_eq!(
        sent,
        vec![
            vec![ControlMessage::new("/right/0/fader", 0.5)],
            vec![ControlMessage::new("/right/0/fader", 0.75)],
            vec![ControlMessage::new("/right/0/fader", 1.0)],
        ]
    );
    client.destroy();
}

// ── Real WebSocket ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_websocket_transport_delivers_binary_frames() {
    // Arrange: a one-shot WebSocket server on an ephemeral port.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        loop {
            match ws.next().await {
                Some(Ok(Message::Binary(bytes))) => return bytes,
                Some(Ok(_)) => continue,
                other => panic!("unexpected end of stream: {other:?}"),
            }
        }
    });
    let client = TransportClient::websocket(TransportConfig {
        url: format!("ws://{addr}"),
        ..Default::default()
    });

    // Act
    client.connect();
    eventually(|| client.is_connected()).await;
    client.send(&[
        ControlMessage::new("/right/0/fader", 0.5),
        ControlMessage::new("/right/0/knob", 0.25),
    ]);
    let bytes = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();

    // Assert
    assert_eq!(
        decode_frame(&bytes).unwrap(),
        vec![
            ControlMessage::new("/right/0/fader", 0.5),
            ControlMessage::new("/right/0/knob", 0.25),
        ]
    );
    client.destroy();
}
