use std::time::Duration;

use log::{error, info};

use super::backend_client::CaptureBackend;

/// Polls the capture API until it answers or `max_attempts` probes have failed.
///
/// Returns `true` as soon as one probe succeeds. After the last failed probe it returns
/// `false` right away, without sleeping and without probing again.
pub async fn wait_for_backend(
    backend: &dyn CaptureBackend,
    max_attempts: u32,
    poll_interval: Duration,
) -> bool {
    for attempt in 1..=max_attempts {
        match backend.probe().await {
            Ok(()) => {
                info!("Backend is ready!");
                return true;
            }
            Err(e) => {
                info!(
                    "Waiting for backend... ({}/{}): {}",
                    attempt, max_attempts, e
                );
                if attempt < max_attempts {
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    error!("Backend not available after {} attempts", max_attempts);
    false
}
