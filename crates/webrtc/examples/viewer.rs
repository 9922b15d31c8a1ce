//! Minimal session viewer
//!
//! Connects to a turret device, negotiates the media session, and logs the
//! lifecycle until the stream is up or the connection fails. Useful for
//! checking a device from the command line before starting the full
//! control station.
//!
//! # Running
//!
//! ```bash
//! cargo run --example viewer -- 192.168.1.50
//! cargo run --example viewer -- 192.168.1.50 9002
//! ```

use std::env;

use anyhow::{bail, Context};
use tracing::info;
use turretlink_webrtc::{ConnectionManager, StreamConfig, StreamEvent, DEFAULT_SIGNALLING_PORT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,turretlink_webrtc=debug")),
        )
        .init();

    let mut args = env::args().skip(1);
    let address = match args.next() {
        Some(address) => address,
        None => bail!("usage: viewer <address> [signalling-port]"),
    };
    let port = match args.next() {
        Some(port) => port.parse().context("signalling port must be a number")?,
        None => DEFAULT_SIGNALLING_PORT,
    };

    let mut manager = ConnectionManager::new(StreamConfig::default());
    let mut events = manager.connect(&address, port)?;
    info!("connecting to {}:{}", address, port);

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::StreamReady(stream) => {
                info!("stream ready: id={} kind={:?}", stream.id, stream.kind);
            }
            StreamEvent::ConnectionFailed(reason) => {
                info!("connection failed: {}", reason);
                break;
            }
        }
    }

    manager.cleanup().await;
    Ok(())
}
