pub mod fixtures;
pub mod mocks;

use imgpress_core::{ImageStatus, PressConfig};
use imgpress_worker::ImageCoordinator;
use std::time::Duration;
use uuid::Uuid;

/// Config with auto-compression switched off so tests drive batches themselves
pub fn manual_config() -> PressConfig {
    PressConfig {
        auto_compress: false,
        ..PressConfig::default()
    }
}

/// Poll until `id` reaches `status`, panicking after a few seconds
pub async fn wait_for_status(coordinator: &ImageCoordinator, id: Uuid, status: ImageStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if coordinator.get(id).map(|r| r.status()) == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("image {} never reached {}", id, status));
}

/// Every record in the coordinator satisfies the status/output invariants
pub fn assert_consistent(coordinator: &ImageCoordinator) {
    for record in coordinator.records() {
        assert!(
            record.is_consistent(),
            "inconsistent record {}: {:?}",
            record.id(),
            record.status()
        );
    }
}
