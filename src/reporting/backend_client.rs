use std::time::Duration;

use async_trait::async_trait;
use log::trace;
use reqwest::{Client, StatusCode};

use crate::error_handling::types::ReportError;
use crate::storage::types::NewAttempt;
use crate::web_interface::types::InsertResponse;

/// The capture API as seen from the trap.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Liveness probe; `Ok` only on a success status.
    async fn probe(&self) -> Result<(), ReportError>;

    /// Submits one attempt and returns the identifier assigned by the API.
    async fn submit(&self, attempt: &NewAttempt) -> Result<i64, ReportError>;
}

/// HTTP client for the capture API (reqwest + rustls).
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    probe_timeout: Duration,
}

impl HttpBackend {
    /// Builds a client whose requests are bounded by `request_timeout`; liveness probes use
    /// the shorter `probe_timeout`.
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ReportError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            probe_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn attempts_url(&self) -> String {
        format!("{}/attempts/", self.base_url)
    }
}

#[async_trait]
impl CaptureBackend for HttpBackend {
    async fn probe(&self) -> Result<(), ReportError> {
        let url = format!("{}/", self.base_url);
        trace!("probing {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ReportError::Status(response.status().as_u16()))
        }
    }

    async fn submit(&self, attempt: &NewAttempt) -> Result<i64, ReportError> {
        let response = self
            .client
            .post(self.attempts_url())
            .json(attempt)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(ReportError::Status(response.status().as_u16()));
        }

        let body: InsertResponse = response.json().await?;
        Ok(body.id)
    }
}
