//! Advertise a service UUID until Ctrl-C.
//!
//! Run with: cargo run --example advertise -- [service-uuid]
//! Add `--features bluez` on Linux to use the real adapter.

use smart_attendance_ble::{BleAdvertiser, PeripheralBackend, Result};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smart_attendance_ble=debug".parse().unwrap()),
        )
        .init();

    let uuid = std::env::args()
        .nth(1)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    #[cfg(all(feature = "bluez", target_os = "linux"))]
    let backend = smart_attendance_ble::BluezBackend::new().await?;
    #[cfg(not(all(feature = "bluez", target_os = "linux")))]
    let backend = smart_attendance_ble::SimulatedBackend::new();

    run(Arc::new(BleAdvertiser::new(backend)), &uuid).await
}

async fn run<B: PeripheralBackend + 'static>(advertiser: Arc<BleAdvertiser<B>>, uuid: &str) -> Result<()> {
    println!("Advertising supported: {}", advertiser.is_advertising_supported().await);

    if !advertiser.start_advertising(uuid).await? {
        println!("Advertising did not start, see log for details");
        return Ok(());
    }

    println!("Advertising {} - press Ctrl-C to stop", uuid);
    let _ = tokio::signal::ctrl_c().await;

    advertiser.shutdown().await;
    println!("Stopped");
    Ok(())
}
