//! Signalling channel tests against a local WebSocket endpoint
//!
//! The channel's contract is asynchronous: open never fails synchronously,
//! queued sends flush once the handshake completes, and close is
//! best-effort and idempotent. These tests pin that behavior with a real
//! socket on the loopback interface.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use turretlink_webrtc::signaling::channel::{ChannelEvent, SignalingChannel};

#[tokio::test]
async fn connect_refused_is_reported_asynchronously() {
    // Bind then drop to get a port with no listener behind it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (_channel, mut events) = SignalingChannel::open(
        format!("ws://127.0.0.1:{}/stream/webrtc", port),
        Duration::from_secs(5),
    );
    match events.recv().await {
        Some(ChannelEvent::Failure(reason)) => {
            assert!(reason.contains("connect failed"), "reason: {}", reason);
        }
        other => panic!("expected a failure event, got {:?}", other),
    }
}

#[tokio::test]
async fn queued_sends_flush_after_open_and_close_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut frames = Vec::new();
        while let Some(Ok(message)) = socket.next().await {
            match message {
                Message::Text(text) => frames.push(text),
                Message::Close(_) => break,
                _ => {}
            }
        }
        frames
    });

    let (channel, mut events) = SignalingChannel::open(
        format!("ws://127.0.0.1:{}/stream/webrtc", port),
        Duration::from_secs(5),
    );

    // Enqueued before the handshake has completed; must not be lost.
    channel.send(r#"{"what":"call","data":"{}"}"#.to_owned());

    assert_eq!(events.recv().await, Some(ChannelEvent::Open));
    channel.close(1000, "done");
    channel.close(1000, "done again");

    let frames = server.await.unwrap();
    assert_eq!(frames, vec![r#"{"what":"call","data":"{}"}"#.to_owned()]);

    match events.recv().await {
        Some(ChannelEvent::Closed { .. }) => {}
        other => panic!("expected a closed event, got {:?}", other),
    }
}

#[tokio::test]
async fn server_frames_are_delivered_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        use futures_util::SinkExt;
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in ["{\"what\":\"message\",\"data\":\"one\"}", "{\"what\":\"message\",\"data\":\"two\"}"] {
            socket.send(Message::Text(frame.to_owned())).await.unwrap();
        }
    });

    let (_channel, mut events) = SignalingChannel::open(
        format!("ws://127.0.0.1:{}/stream/webrtc", port),
        Duration::from_secs(5),
    );

    assert_eq!(events.recv().await, Some(ChannelEvent::Open));
    assert_eq!(
        events.recv().await,
        Some(ChannelEvent::Message(
            "{\"what\":\"message\",\"data\":\"one\"}".to_owned()
        ))
    );
    assert_eq!(
        events.recv().await,
        Some(ChannelEvent::Message(
            "{\"what\":\"message\",\"data\":\"two\"}".to_owned()
        ))
    );
}
