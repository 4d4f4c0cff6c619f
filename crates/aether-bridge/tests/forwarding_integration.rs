//! End-to-end tests: WebSocket client → bridge → UDP receiver.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use aether_bridge::application::Forwarder;
use aether_bridge::infrastructure::{serve, UdpOscSink};
use aether_core::{encode_frame, ControlMessage, OscPacket};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

struct Harness {
    ws_addr: SocketAddr,
    receiver: UdpSocket,
    running: Arc<AtomicBool>,
    server: JoinHandle<()>,
}

async fn start_bridge() -> Harness {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let sink = UdpOscSink::bind(receiver.local_addr().unwrap()).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ws_addr = listener.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(serve(
        listener,
        Arc::new(Forwarder::new(Arc::new(sink))),
        Arc::clone(&running),
    ));
    Harness {
        ws_addr,
        receiver,
        running,
        server,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

async fn recv_packet(receiver: &UdpSocket) -> OscPacket {
    let mut buf = [0u8; 2048];
    let (n, _) = timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
        .await
        .expect("no datagram received")
        .unwrap();
    OscPacket::decode(&buf[..n]).unwrap()
}

#[tokio::test]
async fn test_binary_frame_with_one_message_becomes_osc_message() {
    // Arrange
    let h = start_bridge().await;
    let mut ws = connect(h.ws_addr).await;
    let msg = ControlMessage::new("/right/0/fader", 0.5);

    // Act
    ws.send(Message::Binary(encode_frame(&[msg.clone()]).unwrap()))
        .await
        .unwrap();

    // Assert
    assert_eq!(recv_packet(&h.receiver).await, OscPacket::Message(msg));
}

#[tokio::test]
async fn test_binary_frame_with_many_messages_becomes_one_bundle() {
    let h = start_bridge().await;
    let mut ws = connect(h.ws_addr).await;
    let batch = vec![
        ControlMessage::new("/left/1/trigger", 1.0),
        ControlMessage::new("/left/0/knob", 0.3),
        ControlMessage::new("/right/4/switch", 0.0),
    ];

    ws.send(Message::Binary(encode_frame(&batch).unwrap()))
        .await
        .unwrap();

    assert_eq!(recv_packet(&h.receiver).await, OscPacket::Bundle(batch));
}

#[tokio::test]
async fn test_json_text_frames_are_accepted() {
    let h = start_bridge().await;
    let mut ws = connect(h.ws_addr).await;

    ws.send(Message::Text(
        serde_json::json!({"address": "/left/2/fader", "value": 0.75}).to_string(),
    ))
    .await
    .unwrap();
    ws.send(Message::Text(
        serde_json::json!([
            {"address": "/a", "value": 0.1},
            {"address": "/b", "value": 0.2},
        ])
        .to_string(),
    ))
    .await
    .unwrap();

    assert_eq!(
        recv_packet(&h.receiver).await,
        OscPacket::Message(ControlMessage::new("/left/2/fader", 0.75))
    );
    assert_eq!(
        recv_packet(&h.receiver).await,
        OscPacket::Bundle(vec![
            ControlMessage::new("/a", 0.1),
            ControlMessage::new("/b", 0.2),
        ])
    );
}

#[tokio::test]
async fn test_malformed_frame_is_dropped_and_session_survives() {
    // Arrange
    let h = start_bridge().await;
    let mut ws = connect(h.ws_addr).await;

    // Act: a truncated frame, invalid JSON, then a good frame.
    ws.send(Message::Binary(vec![50, b'/', b'x'])).await.unwrap();
    ws.send(Message::Text("{not json".to_string())).await.unwrap();
    let good = ControlMessage::new("/right/6/trigger", 1.0);
    ws.send(Message::Binary(encode_frame(&[good.clone()]).unwrap()))
        .await
        .unwrap();

    // Assert: only the good frame comes out.
    assert_eq!(recv_packet(&h.receiver).await, OscPacket::Message(good));
}

#[tokio::test]
async fn test_clients_are_served_concurrently() {
    let h = start_bridge().await;
    let mut first = connect(h.ws_addr).await;
    let mut second = connect(h.ws_addr).await;

    second
        .send(Message::Binary(
            encode_frame(&[ControlMessage::new("/second", 0.2)]).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(
        recv_packet(&h.receiver).await,
        OscPacket::Message(ControlMessage::new("/second", 0.2))
    );

    first
        .send(Message::Binary(
            encode_frame(&[ControlMessage::new("/first", 0.1)]).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(
        recv_packet(&h.receiver).await,
        OscPacket::Message(ControlMessage::new("/first", 0.1))
    );
}

#[tokio::test]
async fn test_clearing_running_flag_stops_accept_loop() {
    let h = start_bridge().await;

    h.running.store(false, Ordering::Relaxed);

    timeout(Duration::from_secs(2), h.server)
        .await
        .expect("accept loop did not stop")
        .unwrap();
}
