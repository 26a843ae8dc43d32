use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use super::backend_client::CaptureBackend;
use crate::storage::types::NewAttempt;

/// Ships classified captures to the capture API.
///
/// Delivery is best effort: one request per capture, bounded in time, never retried. A
/// failure only produces a warning and the capture is lost.
pub struct Reporter {
    backend: Arc<dyn CaptureBackend>,
    timeout: Duration,
}

impl Reporter {
    pub fn new(backend: Arc<dyn CaptureBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Delivers one capture. Never fails from the caller's point of view.
    pub async fn report(&self, source_ip: IpAddr, payload: &str) {
        let source_ip = source_ip.to_canonical();
        info!("{} - {}", source_ip, payload);

        let attempt = NewAttempt::new(source_ip.to_string(), Some(payload.to_string()));

        match tokio::time::timeout(self.timeout, self.backend.submit(&attempt)).await {
            Ok(Ok(id)) => info!("Successfully sent data to API for IP: {} (id {})", source_ip, id),
            Ok(Err(e)) => warn!("Dropping capture from {}: {}", source_ip, e),
            Err(_) => warn!(
                "Dropping capture from {}: no answer within {:?}",
                source_ip, self.timeout
            ),
        }
    }
}
