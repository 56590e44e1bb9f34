//! Drive the advertiser channel with JSON messages read from stdin.
//!
//! Run with: cargo run --example channel_session
//!
//! Each line is one encoded call, for example:
//!
//! ```text
//! {"method":"startAdvertising","args":{"uuid":"0000ffe0-0000-1000-8000-00805f9b34fb"}}
//! {"method":"isAdvertisingSupported"}
//! {"method":"stopAdvertising"}
//! ```

use bytes::Bytes;
use smart_attendance_ble::{advertiser_channel, BleAdvertiser, SimulatedBackend};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let advertiser = Arc::new(BleAdvertiser::new(SimulatedBackend::new()));
    let channel = advertiser_channel(advertiser.clone());

    println!("Listening on {}", channel.name());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match channel.handle_message(Bytes::from(line)).await {
            Some(reply) => println!("{}", String::from_utf8_lossy(&reply)),
            None => println!("(not implemented)"),
        }
    }

    advertiser.shutdown().await;
    Ok(())
}
