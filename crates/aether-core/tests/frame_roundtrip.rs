//! Integration tests for the aether-core wire formats.
//!
//! These tests drive the public API the way the client and bridge do: the
//! client encodes a batch with `encode_frame` (or `encode_text` in legacy
//! mode), the bridge decodes it and re-encodes it as one OSC datagram.

use aether_core::{
    decode_frame, decode_text, encode_frame, encode_text, ControlMessage, FrameError, OscPacket,
    MAX_ADDRESS_LEN,
};

/// A deterministic batch of `n` messages with varied address lengths.
fn batch(n: usize) -> Vec<ControlMessage> {
    (0..n)
        .map(|i| {
            let address = format!("/{}", "a".repeat(i * 15 % MAX_ADDRESS_LEN));
            ControlMessage::new(address, i as f32 * -0.375 + 0.5)
        })
        .collect()
}

#[test]
fn test_roundtrip_batches_up_to_sixteen_messages() {
    for n in [0, 1, 2, 7, 16] {
        let original = batch(n);

        let bytes = encode_frame(&original).expect("encode must succeed");
        let decoded = decode_frame(&bytes).expect("decode must succeed");

        assert_eq!(decoded, original, "batch of {n}");
    }
}

#[test]
fn test_roundtrip_preserves_special_float_bits() {
    let original = vec![
        ControlMessage::new("/min", f32::MIN_POSITIVE),
        ControlMessage::new("/neg", -0.0),
        ControlMessage::new("/big", f32::MAX),
    ];

    let decoded = decode_frame(&encode_frame(&original).unwrap()).unwrap();

    for (a, b) in original.iter().zip(&decoded) {
        assert_eq!(a.value.to_bits(), b.value.to_bits(), "{}", a.address);
    }
}

#[test]
fn test_truncating_any_byte_rejects_the_frame() {
    let bytes = encode_frame(&batch(3)).unwrap();

    for cut in 1..bytes.len() {
        // Cutting exactly on a message boundary yields a shorter valid frame.
        let result = decode_frame(&bytes[..cut]);
        if let Ok(msgs) = &result {
            assert!(msgs.len() < 3);
            assert_eq!(encode_frame(msgs).unwrap(), &bytes[..cut]);
        } else {
            assert!(matches!(result, Err(FrameError::Truncated { .. })));
        }
    }
}

#[test]
fn test_binary_and_text_payloads_decode_to_same_batch() {
    let original = vec![
        ControlMessage::new("/left/0/fader", 0.25),
        ControlMessage::new("/right/3/knob", 0.75),
    ];

    let from_binary = decode_frame(&encode_frame(&original).unwrap()).unwrap();
    let from_text = decode_text(&encode_text(&original).unwrap()).unwrap();

    assert_eq!(from_binary, from_text);
}

#[test]
fn test_decoded_frame_becomes_one_osc_datagram() {
    let original = batch(4);
    let decoded = decode_frame(&encode_frame(&original).unwrap()).unwrap();

    let packet = OscPacket::for_batch(decoded).expect("non-empty batch");
    let datagram = packet.encode().expect("osc encode must succeed");

    assert!(datagram.starts_with(b"#bundle\0"));
    assert_eq!(OscPacket::decode(&datagram).unwrap(), OscPacket::Bundle(original));
}
