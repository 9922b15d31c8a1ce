//! Connection manager lifecycle tests
//!
//! Exercises the full stack with the real engine: a refused signalling
//! socket must surface exactly one failure notification, and teardown must
//! be idempotent whether or not a connection ever came up.

use std::time::Duration;

use tokio::net::TcpListener;

use turretlink_webrtc::{ConnectionManager, Error, StreamConfig, StreamEvent};

#[tokio::test]
async fn cleanup_without_connect_is_a_no_op() {
    let mut manager = ConnectionManager::new(StreamConfig::default());
    manager.cleanup().await;
    manager.cleanup().await;
}

#[tokio::test]
async fn refused_connection_surfaces_one_failure() {
    // Bind then drop to get a port with no listener behind it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut manager = ConnectionManager::new(
        StreamConfig::default().with_connect_timeout(Duration::from_secs(2)),
    );
    let mut events = manager.connect("127.0.0.1", port).unwrap();

    match events.recv().await {
        Some(StreamEvent::ConnectionFailed(reason)) => {
            assert!(
                reason.contains("signalling transport failed"),
                "reason: {}",
                reason
            );
        }
        other => panic!("expected a failure notification, got {:?}", other),
    }

    manager.cleanup().await;
    manager.cleanup().await;
}

#[tokio::test]
async fn connect_twice_on_one_manager_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut manager = ConnectionManager::new(StreamConfig::default());
    let _events = manager.connect("127.0.0.1", port).unwrap();
    assert!(matches!(
        manager.connect("127.0.0.1", port),
        Err(Error::AlreadyConnected)
    ));
    manager.cleanup().await;
}
